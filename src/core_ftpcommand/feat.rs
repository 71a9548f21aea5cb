use std::io;

use crate::core_network::connection::FtpConnection;

/// Handles FEAT: the one multi-line reply in the command set, emitted as raw
/// pre-formatted lines.
pub async fn handle_feat_command(conn: &mut FtpConnection, _arg: &str) -> io::Result<()> {
    let features = [
        "211-Features:",
        " PASV",
        " EPSV",
        " SIZE",
        " MDTM",
        " MLST type*;size*;modify*;",
        " MLSD",
        " UTF8",
        "211 END",
    ];

    for line in features {
        conn.reply_line(line).await?;
    }
    Ok(())
}
