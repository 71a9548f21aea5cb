use std::io;

use crate::core_network::connection::FtpConnection;

/// Handles the USER command: stashes the presented name and asks for the
/// password. Re-issuing USER on a live session starts a fresh login.
pub async fn handle_user_command(conn: &mut FtpConnection, arg: &str) -> io::Result<()> {
    conn.session.username = arg.to_string();
    conn.reply(331, "Password required").await
}
