use chrono::{DateTime, Utc};
use log::debug;
use std::io;

use crate::core_auth::{check_permission, Permission};
use crate::core_network::connection::FtpConnection;

/// Handles MDTM: reports a file's modification time as UTC
/// `YYYYMMDDhhmmss`.
pub async fn handle_mdtm_command(conn: &mut FtpConnection, arg: &str) -> io::Result<()> {
    let user = match conn.require_auth().await? {
        Some(user) => user,
        None => return Ok(()),
    };

    if arg.is_empty() {
        conn.reply(501, "No filename given").await?;
        return Ok(());
    }

    let path = conn.resolve_arg(arg);

    if let Err(e) = check_permission(Some(&user), &path, Permission::Read) {
        debug!(
            "MDTM permission denied for user {} to {}: {}",
            user.name, path, e
        );
        conn.reply(550, "Permission denied").await?;
        return Ok(());
    }

    match conn.ctx.vfs.stat(&user, &path).await {
        Ok(entry) => {
            let modify: DateTime<Utc> = entry.mtime.into();
            conn.reply(213, &modify.format("%Y%m%d%H%M%S").to_string())
                .await
        }
        Err(e) => {
            debug!("MDTM failed for {}: {}", path, e);
            conn.reply(550, "File not found").await
        }
    }
}
