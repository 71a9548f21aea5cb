use std::io;

use crate::core_network::connection::FtpConnection;

pub async fn handle_noop_command(conn: &mut FtpConnection, _arg: &str) -> io::Result<()> {
    conn.reply(200, "OK").await
}
