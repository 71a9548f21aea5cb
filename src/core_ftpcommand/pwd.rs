use std::io;

use crate::core_network::connection::FtpConnection;

/// Handles PWD/XPWD: reports the working directory relative to the user's
/// home, so the home prefix never leaks to the client.
pub async fn handle_pwd_command(conn: &mut FtpConnection, _arg: &str) -> io::Result<()> {
    if conn.require_auth().await?.is_none() {
        return Ok(());
    }

    let display = conn.session.display_cwd();
    conn.reply(257, &format!("\"{}\" is current directory", display))
        .await
}
