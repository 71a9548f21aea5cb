use log::{debug, error};
use std::io;

use crate::core_auth::{check_permission, Permission};
use crate::core_network::connection::FtpConnection;

/// Handles DELE: removes a single file through the VFS.
pub async fn handle_dele_command(conn: &mut FtpConnection, arg: &str) -> io::Result<()> {
    let user = match conn.require_auth().await? {
        Some(user) => user,
        None => return Ok(()),
    };

    if user.is_read_only() {
        conn.reply(550, "Permission denied: read-only user").await?;
        return Ok(());
    }

    let path = conn.resolve_arg(arg);

    if let Err(e) = check_permission(Some(&user), &path, Permission::Delete) {
        debug!(
            "DELE permission denied for user {} to {}: {}",
            user.name, path, e
        );
        conn.reply(550, "Permission denied").await?;
        return Ok(());
    }

    match conn.ctx.vfs.delete(&user, &path).await {
        Ok(()) => {
            debug!("DELE completed: deleted {}", path);
            conn.reply(250, "File deleted").await
        }
        Err(e) => {
            error!("failed to delete {}: {}", path, e);
            conn.reply(550, "Failed to delete file").await
        }
    }
}
