use std::io;

use crate::core_network::connection::FtpConnection;

pub async fn handle_quit_command(conn: &mut FtpConnection, _arg: &str) -> io::Result<()> {
    conn.reply(221, "Goodbye").await
}
