use std::io;

use crate::core_network::connection::FtpConnection;

pub async fn handle_syst_command(conn: &mut FtpConnection, _arg: &str) -> io::Result<()> {
    conn.reply(215, "UNIX Type: L8").await
}
