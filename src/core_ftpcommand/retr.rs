use log::{debug, error};
use std::io;
use tokio::io::AsyncWriteExt;

use crate::constants::DATA_TRANSFER_TIMEOUT;
use crate::core_auth::{check_permission, Permission};
use crate::core_network::connection::FtpConnection;
use crate::core_network::pasv::accept_data_connection;

/// Handles RETR: opens the file through the VFS, then streams it to the
/// client over the data channel. The reader is opened before the 150 so an
/// unreadable file fails cleanly without touching the data connection.
pub async fn handle_retr_command(conn: &mut FtpConnection, arg: &str) -> io::Result<()> {
    let user = match conn.require_auth().await? {
        Some(user) => user,
        None => return Ok(()),
    };
    if conn.session.pasv_listener.is_none() {
        conn.reply(425, "Use PASV first").await?;
        return Ok(());
    }

    let path = conn.resolve_arg(arg);

    if let Err(e) = check_permission(Some(&user), &path, Permission::Read) {
        debug!(
            "RETR permission denied for user {} to {}: {}",
            user.name, path, e
        );
        conn.reply(550, "Permission denied").await?;
        return Ok(());
    }

    let mut reader = match conn.ctx.vfs.open_read(&user, &path).await {
        Ok(reader) => reader,
        Err(e) => {
            error!("failed to open {} for reading: {}", path, e);
            conn.reply(550, "File not found").await?;
            return Ok(());
        }
    };

    conn.reply(150, "Opening data connection for file transfer")
        .await?;

    let listener = match conn.take_pasv_listener().await? {
        Some(listener) => listener,
        None => return Ok(()),
    };

    let mut data = match accept_data_connection(&listener).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("failed to accept data connection for RETR: {}", e);
            conn.reply(425, "Cannot open data connection").await?;
            return Ok(());
        }
    };

    match tokio::time::timeout(DATA_TRANSFER_TIMEOUT, tokio::io::copy(&mut reader, &mut data))
        .await
    {
        Ok(Ok(sent)) => {
            data.shutdown().await.ok();
            debug!("RETR completed: sent {} bytes from {}", sent, path);
            conn.reply(226, "Transfer completed").await
        }
        Ok(Err(e)) => {
            error!("failed to send file {}: {}", path, e);
            conn.reply(426, "Transfer aborted").await
        }
        Err(_) => {
            error!("RETR of {} exceeded the transfer deadline", path);
            conn.reply(426, "Transfer aborted").await
        }
    }
}
