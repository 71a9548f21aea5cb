use anyhow::{bail, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// A configured account. Loaded once at startup and immutable afterwards;
/// shared across engines as `Arc<User>`.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// Filled in from the map key after the configuration is parsed.
    #[serde(skip)]
    pub name: String,
    pub pass: String,
    #[serde(default)]
    pub uid: u32,
    #[serde(default = "default_path")]
    pub path: String,
    /// "ro" or "rw".
    pub permissions: String,
}

fn default_path() -> String {
    "/".to_string()
}

impl User {
    pub fn is_read_only(&self) -> bool {
        self.permissions == "ro"
    }

    pub fn can_write(&self) -> bool {
        self.permissions == "rw"
    }

    /// The user's virtual home, always absolute and never empty.
    pub fn home(&self) -> &str {
        if self.path.is_empty() {
            "/"
        } else {
            &self.path
        }
    }
}

/// Parses the compact CLI user specification:
/// `name:pass:uid:path:perm[,name2:pass2:uid2:path2:perm2...]`.
pub fn parse_user_spec(spec: &str) -> Result<HashMap<String, User>> {
    let mut users = HashMap::new();

    for entry in spec.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let parts: Vec<&str> = entry.split(':').collect();
        if parts.len() != 5 {
            bail!(
                "invalid user format '{}', expected 'name:pass:uid:path:permissions'",
                entry
            );
        }

        let name = parts[0].trim();
        let pass = parts[1].trim();
        let uid = parts[2].trim();
        let path = parts[3].trim();
        let permissions = parts[4].trim();

        if name.is_empty() {
            bail!("username cannot be empty in '{}'", entry);
        }
        if pass.is_empty() {
            bail!("password cannot be empty for user '{}'", name);
        }

        let uid: u32 = uid
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid uid '{}' for user '{}': {}", uid, name, e))?;

        let path = if path.is_empty() {
            "/".to_string()
        } else if !path.starts_with('/') {
            format!("/{}", path)
        } else {
            path.to_string()
        };

        if permissions != "ro" && permissions != "rw" {
            bail!(
                "invalid permissions '{}' for user '{}', must be 'ro' or 'rw'",
                permissions,
                name
            );
        }

        users.insert(
            name.to_string(),
            User {
                name: name.to_string(),
                pass: pass.to_string(),
                uid,
                path,
                permissions: permissions.to_string(),
            },
        );
    }

    Ok(users)
}
