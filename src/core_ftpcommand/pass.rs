use log::{debug, info};
use std::io;

use crate::core_network::connection::FtpConnection;

/// Handles the PASS command: authenticates against the credential store and
/// drops the session into the user's home directory. Failures keep the
/// session alive so the client may retry.
pub async fn handle_pass_command(conn: &mut FtpConnection, arg: &str) -> io::Result<()> {
    if conn.session.username.is_empty() {
        conn.reply(503, "Send USER first").await?;
        return Ok(());
    }

    let username = conn.session.username.clone();
    match conn.ctx.auth.authenticate(&username, arg) {
        Ok(user) => {
            conn.session.cwd = user.home().to_string();
            conn.session.user = Some(user);
            info!("user {} logged in from {}", username, conn.peer);
            conn.reply(230, "Login successful").await
        }
        Err(e) => {
            debug!("login failed for {} from {}: {}", username, conn.peer, e);
            conn.reply(530, "Login incorrect").await
        }
    }
}
