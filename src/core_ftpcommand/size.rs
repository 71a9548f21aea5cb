use log::debug;
use std::io;

use crate::core_auth::{check_permission, Permission};
use crate::core_network::connection::FtpConnection;

/// Handles SIZE: reports the byte size of a regular file. Directories fail.
pub async fn handle_size_command(conn: &mut FtpConnection, arg: &str) -> io::Result<()> {
    let user = match conn.require_auth().await? {
        Some(user) => user,
        None => return Ok(()),
    };

    let path = conn.resolve_arg(arg);

    if let Err(e) = check_permission(Some(&user), &path, Permission::Read) {
        debug!(
            "SIZE permission denied for user {} to {}: {}",
            user.name, path, e
        );
        conn.reply(550, "Permission denied").await?;
        return Ok(());
    }

    match conn.ctx.vfs.size(&user, &path).await {
        Ok(size) => conn.reply(213, &size.to_string()).await,
        Err(e) => {
            debug!("SIZE failed for {}: {}", path, e);
            conn.reply(550, "File not found").await
        }
    }
}
