use std::sync::Arc;
use tokio::net::TcpListener;

use crate::users::User;

/// Per-connection FTP state. Created on accept, dropped on disconnect;
/// nothing here is shared between connections.
#[derive(Debug)]
pub struct Session {
    /// Name presented by the last USER command. Kept after login for the
    /// owner column of directory listings.
    pub username: String,
    /// Set on successful PASS; filesystem-touching commands require it.
    pub user: Option<Arc<User>>,
    /// Current working directory in the virtual namespace.
    pub cwd: String,
    /// At most one live passive listener, consumed by the next data command.
    pub pasv_listener: Option<TcpListener>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            username: String::new(),
            user: None,
            cwd: "/".to_string(),
            pasv_listener: None,
        }
    }

    /// The working directory as shown to the client: re-expressed relative
    /// to the user's home, always absolute.
    pub fn display_cwd(&self) -> String {
        let home = match &self.user {
            Some(user) => user.home().to_string(),
            None => return self.cwd.clone(),
        };

        if home == "/" {
            return self.cwd.clone();
        }

        let stripped = self
            .cwd
            .strip_prefix(&home)
            .unwrap_or(&self.cwd)
            .trim_start_matches('/');
        if stripped.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", stripped)
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
