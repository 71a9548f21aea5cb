use log::{debug, error};
use std::io;

use crate::core_auth::{check_permission, Permission};
use crate::core_network::connection::FtpConnection;

/// Handles RMD/XRMD: removes a directory. Non-recursive per RFC 959, so a
/// populated directory is refused.
pub async fn handle_rmd_command(conn: &mut FtpConnection, arg: &str) -> io::Result<()> {
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
            "RMD permission denied for user {} to {}: {}",
            user.name, path, e
        );
        conn.reply(550, "Permission denied").await?;
        return Ok(());
    }

    match conn.ctx.vfs.rmdir(&user, &path).await {
        Ok(()) => {
            debug!("RMD completed: removed {}", path);
            conn.reply(250, "Directory removed").await
        }
        Err(e) => {
            error!("failed to remove directory {}: {}", path, e);
            conn.reply(550, "Failed to remove directory").await
        }
    }
}
