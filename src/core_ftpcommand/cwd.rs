use log::debug;
use std::io;

use crate::core_auth::{check_permission, Permission};
use crate::core_network::connection::FtpConnection;

/// Handles CWD: resolves the target against the working directory, checks
/// the permission gate, and verifies the directory by listing it before
/// committing the change.
pub async fn handle_cwd_command(conn: &mut FtpConnection, arg: &str) -> io::Result<()> {
    let user = match conn.require_auth().await? {
        Some(user) => user,
        None => return Ok(()),
    };

    let target = conn.resolve_arg(arg);

    if let Err(e) = check_permission(Some(&user), &target, Permission::List) {
        debug!(
            "CWD permission denied for user {} to {}: {}",
            user.name, target, e
        );
        conn.reply(550, "Permission denied").await?;
        return Ok(());
    }

    match conn.ctx.vfs.list(&user, &target).await {
        Ok(_) => {
            debug!("CWD: user {} changed to {}", user.name, target);
            conn.session.cwd = target;
            conn.reply(250, "Directory successfully changed.").await
        }
        Err(e) => {
            debug!("CWD failed for user {} to {}: {}", user.name, target, e);
            conn.reply(550, "Directory not found or access denied").await
        }
    }
}
