use log::{debug, error};
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::constants::DATA_ACCEPT_TIMEOUT;
use crate::core_network::connection::FtpConnection;

/// Handles PASV: allocates a fresh data listener and advertises it in the
/// `(h1,h2,h3,h4,p1,p2)` form. A previously open listener is superseded.
pub async fn handle_pasv_command(conn: &mut FtpConnection, _arg: &str) -> io::Result<()> {
    let listener = match allocate_data_listener(conn).await {
        Some(listener) => listener,
        None => {
            conn.reply(425, "Cannot open passive connection").await?;
            return Ok(());
        }
    };

    let port = listener.local_addr()?.port();
    let ip = advertised_ipv4(conn);
    let (p1, p2) = (port / 256, port % 256);

    debug!("PASV listener for {} on {}:{}", conn.peer, ip, port);
    conn.session.pasv_listener = Some(listener);

    let octets = ip.octets();
    conn.reply(
        227,
        &format!(
            "Entering Passive Mode ({},{},{},{},{},{})",
            octets[0], octets[1], octets[2], octets[3], p1, p2
        ),
    )
    .await
}

/// Handles EPSV: same listener allocation, extended reply format.
pub async fn handle_epsv_command(conn: &mut FtpConnection, _arg: &str) -> io::Result<()> {
    let listener = match allocate_data_listener(conn).await {
        Some(listener) => listener,
        None => {
            conn.reply(425, "Cannot open passive connection").await?;
            return Ok(());
        }
    };

    let port = listener.local_addr()?.port();
    debug!("EPSV listener for {} on port {}", conn.peer, port);
    conn.session.pasv_listener = Some(listener);

    conn.reply(229, &format!("Entering Extended Passive Mode (|||{}|)", port))
        .await
}

/// Binds the first free port in the configured passive range. Any listener
/// left over from an earlier PASV/EPSV is dropped first so a connection
/// never holds more than one.
async fn allocate_data_listener(conn: &mut FtpConnection) -> Option<TcpListener> {
    conn.session.pasv_listener = None;

    let ftp = &conn.ctx.config.services.ftp;
    for port in ftp.pasv_min_port..=ftp.pasv_max_port {
        match TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => return Some(listener),
            Err(_) => continue,
        }
    }

    error!(
        "failed to create passive listener in range {}-{}",
        ftp.pasv_min_port, ftp.pasv_max_port
    );
    None
}

/// IPv4 address advertised in the PASV reply: the configured address when
/// set, else the control socket's local IPv4, else loopback.
fn advertised_ipv4(conn: &FtpConnection) -> Ipv4Addr {
    if let Some(host) = &conn.ctx.config.services.ftp.advertised_host {
        if let Ok(ip) = host.parse::<Ipv4Addr>() {
            return ip;
        }
        error!("advertised_host '{}' is not an IPv4 address, ignoring", host);
    }

    match conn.local_ip {
        IpAddr::V4(ip) if !ip.is_unspecified() => ip,
        _ => Ipv4Addr::LOCALHOST,
    }
}

/// Waits for the client to connect to the passive listener, bounded by the
/// data-accept deadline.
pub async fn accept_data_connection(listener: &TcpListener) -> io::Result<TcpStream> {
    match timeout(DATA_ACCEPT_TIMEOUT, listener.accept()).await {
        Ok(Ok((stream, addr))) => {
            debug!("accepted data connection from {}", addr);
            Ok(stream)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "timed out waiting for data connection",
        )),
    }
}
