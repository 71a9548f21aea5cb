use log::{debug, error};
use std::io;

use crate::core_auth::{check_permission, Permission};
use crate::core_network::connection::FtpConnection;

/// Handles MKD/XMKD: creates a directory (recursively) through the VFS.
pub async fn handle_mkd_command(conn: &mut FtpConnection, arg: &str) -> io::Result<()> {
    let user = match conn.require_auth().await? {
        Some(user) => user,
        None => return Ok(()),
    };

    if user.is_read_only() {
        conn.reply(550, "Permission denied: read-only user").await?;
        return Ok(());
    }

    let path = conn.resolve_arg(arg);

    if let Err(e) = check_permission(Some(&user), &path, Permission::Write) {
        debug!(
            "MKD permission denied for user {} to {}: {}",
            user.name, path, e
        );
        conn.reply(550, "Permission denied").await?;
        return Ok(());
    }

    match conn.ctx.vfs.mkdir(&user, &path).await {
        Ok(()) => {
            debug!("MKD completed: created {}", path);
            conn.reply(257, &format!("\"{}\" directory created", path))
                .await
        }
        Err(e) => {
            error!("failed to create directory {}: {}", path, e);
            conn.reply(550, "Failed to create directory").await
        }
    }
}
