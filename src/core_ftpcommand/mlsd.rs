use chrono::{DateTime, Utc};
use log::error;
use std::io;
use tokio::io::AsyncWriteExt;

use crate::core_network::connection::FtpConnection;
use crate::core_network::pasv::accept_data_connection;
use crate::core_vfs::FileEntry;

/// Handles MLSD: the machine-readable listing of the working directory,
/// one `fact=value;...` line per entry over the data channel.
pub async fn handle_mlsd_command(conn: &mut FtpConnection, _arg: &str) -> io::Result<()> {
    let user = match conn.require_auth().await? {
        Some(user) => user,
        None => return Ok(()),
    };
    let listener = match conn.take_pasv_listener().await? {
        Some(listener) => listener,
        None => return Ok(()),
    };

    conn.reply(150, "Opening data connection for MLSD").await?;

    let mut data = match accept_data_connection(&listener).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("failed to accept data connection for MLSD: {}", e);
            conn.reply(425, "Cannot open data connection").await?;
            return Ok(());
        }
    };

    let entries = match conn.ctx.vfs.list(&user, &conn.session.cwd).await {
        Ok(entries) => entries,
        Err(e) => {
            error!("failed to list directory for MLSD: {}", e);
            conn.reply(550, "Failed to list directory").await?;
            return Ok(());
        }
    };

    let mut listing = String::new();
    for entry in &entries {
        listing.push_str(&format_mlsd_entry(entry));
    }

    if let Err(e) = data.write_all(listing.as_bytes()).await {
        error!("failed to send MLSD listing: {}", e);
        conn.reply(426, "Transfer aborted").await?;
        return Ok(());
    }
    data.shutdown().await.ok();

    conn.reply(226, "MLSD completed").await
}

/// Facts emitted: `type` (plus `size` for files) and `modify` in UTC
/// `YYYYMMDDhhmmss`, always in that order.
pub fn format_mlsd_entry(entry: &FileEntry) -> String {
    let modify: DateTime<Utc> = entry.mtime.into();
    let modify = modify.format("%Y%m%d%H%M%S");

    if entry.is_dir {
        format!("type=dir;modify={}; {}\r\n", modify, entry.name)
    } else {
        format!(
            "type=file;size={};modify={}; {}\r\n",
            entry.size, modify, entry.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_entry_carries_size_and_modify() {
        let mtime = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let entry = FileEntry {
            name: "f.bin".to_string(),
            size: 1234,
            mtime: mtime.into(),
            is_dir: false,
        };
        assert_eq!(
            format_mlsd_entry(&entry),
            "type=file;size=1234;modify=20240506070809; f.bin\r\n"
        );
    }

    #[test]
    fn directory_entry_omits_size() {
        let mtime = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 58).unwrap();
        let entry = FileEntry {
            name: "sub".to_string(),
            size: 4096,
            mtime: mtime.into(),
            is_dir: true,
        };
        assert_eq!(
            format_mlsd_entry(&entry),
            "type=dir;modify=20231231235958; sub\r\n"
        );
    }
}
