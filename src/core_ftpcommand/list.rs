use chrono::{DateTime, Datelike, Local};
use log::error;
use std::io;
use tokio::io::AsyncWriteExt;

use crate::core_network::connection::FtpConnection;
use crate::core_network::pasv::accept_data_connection;
use crate::core_vfs::FileEntry;
use crate::users::User;

/// Handles LIST and NLST: streams a UNIX-style long listing of the working
/// directory over the data channel. The path argument is ignored.
pub async fn handle_list_command(conn: &mut FtpConnection, _arg: &str) -> io::Result<()> {
    let user = match conn.require_auth().await? {
        Some(user) => user,
        None => return Ok(()),
    };
    let listener = match conn.take_pasv_listener().await? {
        Some(listener) => listener,
        None => return Ok(()),
    };

    conn.reply(150, "Opening data connection for directory listing")
        .await?;

    let mut data = match accept_data_connection(&listener).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("failed to accept data connection for LIST: {}", e);
            conn.reply(425, "Cannot open data connection").await?;
            return Ok(());
        }
    };

    let entries = match conn.ctx.vfs.list(&user, &conn.session.cwd).await {
        Ok(entries) => entries,
        Err(e) => {
            error!("failed to list directory {}: {}", conn.session.cwd, e);
            conn.reply(550, "Failed to list directory").await?;
            return Ok(());
        }
    };

    let mut listing = String::new();
    for entry in &entries {
        listing.push_str(&format_list_entry(entry, &user, &conn.session.username));
    }

    if let Err(e) = data.write_all(listing.as_bytes()).await {
        error!("failed to send listing: {}", e);
        conn.reply(426, "Transfer aborted").await?;
        return Ok(());
    }
    data.shutdown().await.ok();

    conn.reply(226, "Directory listing completed").await
}

/// One line of the long listing. Modes reflect the user's write policy,
/// directories show the conventional 4096 size and link count 2, and the
/// owner/group columns both carry the authenticated username.
pub fn format_list_entry(entry: &FileEntry, user: &User, username: &str) -> String {
    let perms = if entry.is_dir {
        if user.can_write() {
            "drwxr-xr-x"
        } else {
            "dr-xr-xr-x"
        }
    } else if user.can_write() {
        "-rw-r--r--"
    } else {
        "-r--r--r--"
    };

    let mtime: DateTime<Local> = entry.mtime.into();
    let mod_time = if mtime.year() == Local::now().year() {
        mtime.format("%b %d %H:%M").to_string()
    } else {
        mtime.format("%b %d  %Y").to_string()
    };

    if entry.is_dir {
        format!(
            "{}   2 {} {}     4096 {} {}\r\n",
            perms, username, username, mod_time, entry.name
        )
    } else {
        format!(
            "{}   1 {} {} {:>8} {} {}\r\n",
            perms, username, username, entry.size, mod_time, entry.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::SystemTime;

    fn user(permissions: &str) -> User {
        User {
            name: "alice".to_string(),
            pass: "pw".to_string(),
            uid: 1000,
            path: "/".to_string(),
            permissions: permissions.to_string(),
        }
    }

    fn entry(name: &str, size: u64, is_dir: bool, mtime: SystemTime) -> FileEntry {
        FileEntry {
            name: name.to_string(),
            size,
            mtime,
            is_dir,
        }
    }

    #[test]
    fn file_line_reflects_write_policy() {
        let now = SystemTime::now();
        let line = format_list_entry(&entry("a.txt", 42, false, now), &user("rw"), "alice");
        assert!(line.starts_with("-rw-r--r--   1 alice alice"), "{}", line);
        assert!(line.ends_with("a.txt\r\n"), "{}", line);

        let line = format_list_entry(&entry("a.txt", 42, false, now), &user("ro"), "alice");
        assert!(line.starts_with("-r--r--r--"), "{}", line);
    }

    #[test]
    fn directory_line_uses_fixed_size_and_links() {
        let line = format_list_entry(
            &entry("sub", 9999, true, SystemTime::now()),
            &user("rw"),
            "alice",
        );
        assert!(line.starts_with("drwxr-xr-x   2 alice alice     4096"), "{}", line);
    }

    #[test]
    fn old_files_show_the_year_instead_of_the_time() {
        let old = Local.with_ymd_and_hms(2019, 3, 5, 10, 30, 0).unwrap();
        let line = format_list_entry(
            &entry("old.bin", 1, false, old.into()),
            &user("rw"),
            "alice",
        );
        assert!(line.contains("Mar 05  2019"), "{}", line);
        assert!(!line.contains("10:30"), "{}", line);
    }

    #[test]
    fn current_year_shows_the_time() {
        let now = SystemTime::now();
        let line = format_list_entry(&entry("new.bin", 1, false, now), &user("rw"), "alice");
        let mtime: DateTime<Local> = now.into();
        assert!(line.contains(&mtime.format("%H:%M").to_string()), "{}", line);
    }
}
