use log::debug;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use crate::constants::FTP_BANNER;
use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::handlers;
use crate::core_vfs::join_virtual;
use crate::server::ServerContext;
use crate::session::Session;
use crate::users::User;

/// One FTP control connection: the socket halves, the per-session state, and
/// the shared server context. Command handlers receive this instead of
/// back-references into the engine.
pub struct FtpConnection {
    pub(crate) reader: BufReader<OwnedReadHalf>,
    pub(crate) writer: OwnedWriteHalf,
    pub(crate) ctx: Arc<ServerContext>,
    pub(crate) session: Session,
    pub(crate) peer: SocketAddr,
    /// Local address of the control socket; feeds the PASV reply.
    pub(crate) local_ip: IpAddr,
}

/// Entry point for one accepted control socket. Runs the command loop to
/// completion and logs the outcome; errors never escape the task.
pub async fn handle_connection(socket: TcpStream, peer: SocketAddr, ctx: Arc<ServerContext>) {
    debug!("new FTP connection from {}", peer);

    let local_ip = socket
        .local_addr()
        .map(|a| a.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    let (read_half, write_half) = socket.into_split();

    let mut conn = FtpConnection {
        reader: BufReader::new(read_half),
        writer: write_half,
        ctx,
        session: Session::new(),
        peer,
        local_ip,
    };

    if let Err(e) = conn.run().await {
        debug!("FTP session {} ended: {}", peer, e);
    }
    debug!("FTP connection closed for {}", peer);
}

impl FtpConnection {
    /// The command loop: read a line, split verb and argument, dispatch.
    /// Returns on EOF, QUIT, or a fatal socket error.
    async fn run(&mut self) -> io::Result<()> {
        self.reply(220, FTP_BANNER).await?;

        let mut line = String::new();
        loop {
            line.clear();
            let n = self.reader.read_line(&mut line).await?;
            if n == 0 {
                break;
            }

            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            debug!("FTP command from {}: {}", self.peer, input);

            let (verb, arg) = match input.split_once(' ') {
                Some((verb, arg)) => (verb.to_ascii_uppercase(), arg.trim().to_string()),
                None => (input.to_ascii_uppercase(), String::new()),
            };

            match FtpCommand::from_verb(&verb) {
                Some(command) => {
                    if !handlers::dispatch(self, command, &arg).await? {
                        break;
                    }
                }
                None => self.reply(502, "Command not implemented").await?,
            }
        }

        Ok(())
    }

    /// Sends a single `NNN text\r\n` reply.
    pub async fn reply(&mut self, code: u16, text: &str) -> io::Result<()> {
        let response = format!("{} {}\r\n", code, text);
        self.writer.write_all(response.as_bytes()).await?;
        debug!("FTP response to {}: {} {}", self.peer, code, text);
        Ok(())
    }

    /// Sends a raw pre-formatted line (multi-line replies such as FEAT).
    pub async fn reply_line(&mut self, raw: &str) -> io::Result<()> {
        self.writer
            .write_all(format!("{}\r\n", raw).as_bytes())
            .await?;
        Ok(())
    }

    /// Resolves a command argument against the working directory into a
    /// cleaned virtual path.
    pub fn resolve_arg(&self, arg: &str) -> String {
        join_virtual(&self.session.cwd, arg)
    }

    /// Returns the authenticated user, or replies 530 and yields `None`.
    pub async fn require_auth(&mut self) -> io::Result<Option<Arc<User>>> {
        match self.session.user.clone() {
            Some(user) => Ok(Some(user)),
            None => {
                self.reply(530, "Not logged in").await?;
                Ok(None)
            }
        }
    }

    /// Consumes the passive listener, or replies 425 and yields `None`.
    /// Data-bearing commands always go through here, so the listener is used
    /// at most once.
    pub async fn take_pasv_listener(&mut self) -> io::Result<Option<TcpListener>> {
        match self.session.pasv_listener.take() {
            Some(listener) => Ok(Some(listener)),
            None => {
                self.reply(425, "Use PASV first").await?;
                Ok(None)
            }
        }
    }
}
