use std::io;

use crate::core_network::connection::FtpConnection;

/// Handles TYPE. Transfers are always binary; the argument is accepted and
/// ignored.
pub async fn handle_type_command(conn: &mut FtpConnection, _arg: &str) -> io::Result<()> {
    conn.reply(200, "Type set to binary").await
}
