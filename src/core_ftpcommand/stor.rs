use log::{debug, error};
use std::io;
use tokio::io::AsyncWriteExt;

use crate::constants::DATA_TRANSFER_TIMEOUT;
use crate::core_auth::{check_permission, Permission};
use crate::core_network::connection::FtpConnection;
use crate::core_network::pasv::accept_data_connection;

/// Handles STOR: receives a file over the data channel into the VFS.
/// Read-only users are rejected before the 150, so no data connection is
/// ever opened on their behalf.
pub async fn handle_stor_command(conn: &mut FtpConnection, arg: &str) -> io::Result<()> {
    let user = match conn.require_auth().await? {
        Some(user) => user,
        None => return Ok(()),
    };
    if conn.session.pasv_listener.is_none() {
        conn.reply(425, "Use PASV first").await?;
        return Ok(());
    }

    if user.is_read_only() {
        conn.reply(550, "Permission denied: read-only user").await?;
        return Ok(());
    }

    let path = conn.resolve_arg(arg);

    if let Err(e) = check_permission(Some(&user), &path, Permission::Write) {
        debug!(
            "STOR permission denied for user {} to {}: {}",
            user.name, path, e
        );
        conn.reply(550, "Permission denied").await?;
        return Ok(());
    }

    conn.reply(150, "Opening data connection for file upload")
        .await?;

    let listener = match conn.take_pasv_listener().await? {
        Some(listener) => listener,
        None => return Ok(()),
    };

    let mut data = match accept_data_connection(&listener).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("failed to accept data connection for STOR: {}", e);
            conn.reply(425, "Cannot open data connection").await?;
            return Ok(());
        }
    };

    let mut writer = match conn.ctx.vfs.open_write(&user, &path).await {
        Ok(writer) => writer,
        Err(e) => {
            error!("failed to create {}: {}", path, e);
            conn.reply(550, "Failed to store file").await?;
            return Ok(());
        }
    };

    match tokio::time::timeout(DATA_TRANSFER_TIMEOUT, tokio::io::copy(&mut data, &mut writer))
        .await
    {
        Ok(Ok(written)) => {
            writer.flush().await?;
            debug!("STOR completed: wrote {} bytes to {}", written, path);
            conn.reply(226, "Transfer completed").await
        }
        Ok(Err(e)) => {
            error!("failed to write file data to {}: {}", path, e);
            conn.reply(550, "Failed to store file").await
        }
        Err(_) => {
            error!("STOR of {} exceeded the transfer deadline", path);
            conn.reply(426, "Transfer aborted").await
        }
    }
}
