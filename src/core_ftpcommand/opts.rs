use std::io;

use crate::core_network::connection::FtpConnection;

/// Handles OPTS. UTF8 is accepted (file names pass through as bytes
/// anyway); everything else is unimplemented.
pub async fn handle_opts_command(conn: &mut FtpConnection, arg: &str) -> io::Result<()> {
    let option = arg
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();

    if option.is_empty() {
        conn.reply(501, "Invalid OPTS command").await
    } else if option == "UTF8" {
        conn.reply(200, "UTF8 set to on").await
    } else {
        conn.reply(502, &format!("OPTS not implemented for {}", option))
            .await
    }
}
