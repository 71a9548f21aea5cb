use std::io;

use crate::core_network::connection::FtpConnection;

/// Active mode is not supported; clients are steered to PASV. A malformed
/// argument still gets the syntax error it deserves.
pub async fn handle_port_command(conn: &mut FtpConnection, arg: &str) -> io::Result<()> {
    if arg.split(',').count() != 6 {
        conn.reply(501, "Invalid PORT command format").await?;
        return Ok(());
    }

    conn.reply(502, "PORT not supported, use PASV").await
}
