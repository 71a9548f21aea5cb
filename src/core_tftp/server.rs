use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UdpSocket;
use tokio::sync::{watch, Mutex, RwLock};

use crate::constants::{
    TFTP_BLOCK_SIZE, TFTP_MAX_PACKET, TFTP_MAX_RETRIES, TFTP_RETRANSMIT_TIMEOUT,
};
use crate::core_auth::{check_permission, Permission};
use crate::core_tftp::packet::{
    ack_packet, data_packet, error_packet, TftpPacket, ERR_ACCESS_VIOLATION, ERR_DISK_FULL,
    ERR_FILE_NOT_FOUND, ERR_ILLEGAL_OPERATION, ERR_NOT_DEFINED, ERR_UNKNOWN_TID,
};
use crate::core_tftp::transfer::{TransferIo, TransferState};
use crate::server::{ProtocolServer, ServerContext};
use crate::users::User;

type TransferTable = Arc<RwLock<HashMap<SocketAddr, Arc<Mutex<TransferState>>>>>;

/// The TFTP engine: one UDP socket, a table of per-client transfers, and a
/// sweep that retransmits the last packet of any stalled transfer. All
/// transfers run as a single configured identity.
#[derive(Clone)]
pub struct TftpServer {
    socket: Arc<UdpSocket>,
    ctx: Arc<ServerContext>,
    user: Arc<User>,
    transfers: TransferTable,
}

impl TftpServer {
    pub async fn bind(ctx: Arc<ServerContext>) -> Result<TftpServer> {
        let port = ctx.config.services.tftp.port;
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("failed to listen on UDP port {}", port))?;

        let user = resolve_default_user(&ctx)?;
        info!(
            "TFTP server listening on port {}, transfers run as user '{}'",
            socket.local_addr().map(|a| a.port()).unwrap_or(port),
            user.name
        );

        Ok(TftpServer {
            socket: Arc::new(socket),
            ctx,
            user,
            transfers: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut sweep = tokio::time::interval(TFTP_RETRANSMIT_TIMEOUT);
        let mut buf = vec![0u8; TFTP_MAX_PACKET];

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = sweep.tick() => self.retransmit_stalled().await,
                received = self.socket.recv_from(&mut buf) => {
                    match received {
                        Ok((n, peer)) => {
                            let datagram = buf[..n].to_vec();
                            let server = self.clone();
                            tokio::spawn(async move {
                                server.handle_datagram(datagram, peer).await;
                            });
                        }
                        Err(e) => error!("failed to read UDP packet: {}", e),
                    }
                }
            }
        }
    }

    async fn handle_datagram(&self, datagram: Vec<u8>, peer: SocketAddr) {
        let packet = match TftpPacket::parse(&datagram) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("bad TFTP packet from {}: {}", peer, e);
                self.send_error(peer, ERR_ILLEGAL_OPERATION, "Invalid packet")
                    .await;
                return;
            }
        };

        match packet {
            TftpPacket::Rrq { filename, mode } => self.handle_rrq(peer, filename, mode).await,
            TftpPacket::Wrq { filename, mode } => self.handle_wrq(peer, filename, mode).await,
            TftpPacket::Data { block, data } => self.handle_data(peer, block, data).await,
            TftpPacket::Ack { block } => self.handle_ack(peer, block).await,
            TftpPacket::Error { code, message } => {
                debug!("client {} aborted: error {} ({})", peer, code, message);
                self.remove_transfer(peer).await;
            }
        }
    }

    /// RRQ: open the file as the TFTP identity and send block 1. Any
    /// existing transfer for the same client address is replaced.
    async fn handle_rrq(&self, peer: SocketAddr, filename: String, mode: String) {
        debug!("TFTP RRQ from {}: file={}, mode={}", peer, filename, mode);
        if !mode_is_octet(&mode) {
            self.send_error(peer, ERR_ILLEGAL_OPERATION, "Unsupported mode")
                .await;
            return;
        }

        let path = crate::core_vfs::clean_virtual_path(&filename);

        if let Err(e) = check_permission(Some(&self.user), &path, Permission::Read) {
            debug!("TFTP RRQ permission denied for {}: {}", path, e);
            self.send_error(peer, ERR_ACCESS_VIOLATION, "Access denied")
                .await;
            return;
        }

        let file = match self.ctx.vfs.open_read(&self.user, &path).await {
            Ok(file) => file,
            Err(e) => {
                debug!("TFTP RRQ cannot open {}: {}", path, e);
                self.send_error(peer, ERR_FILE_NOT_FOUND, "File not found")
                    .await;
                return;
            }
        };

        self.remove_transfer(peer).await;
        let state = Arc::new(Mutex::new(TransferState::download(
            Arc::clone(&self.user),
            path,
            file,
        )));
        self.transfers.write().await.insert(peer, Arc::clone(&state));

        let mut state = state.lock().await;
        if let Err(e) = self.send_next_block(&mut state, peer).await {
            error!("error reading {}: {}", state.filename, e);
            drop(state);
            self.send_error(peer, ERR_NOT_DEFINED, "Read error").await;
            self.remove_transfer(peer).await;
        }
    }

    /// WRQ: open the destination for writing and ACK block 0 to start the
    /// client sending.
    async fn handle_wrq(&self, peer: SocketAddr, filename: String, mode: String) {
        debug!("TFTP WRQ from {}: file={}, mode={}", peer, filename, mode);
        if !mode_is_octet(&mode) {
            self.send_error(peer, ERR_ILLEGAL_OPERATION, "Unsupported mode")
                .await;
            return;
        }

        if self.user.is_read_only() {
            self.send_error(peer, ERR_ACCESS_VIOLATION, "Read-only access")
                .await;
            return;
        }

        let path = crate::core_vfs::clean_virtual_path(&filename);

        if let Err(e) = check_permission(Some(&self.user), &path, Permission::Write) {
            debug!("TFTP WRQ permission denied for {}: {}", path, e);
            self.send_error(peer, ERR_ACCESS_VIOLATION, "Access denied")
                .await;
            return;
        }

        let file = match self.ctx.vfs.open_write(&self.user, &path).await {
            Ok(file) => file,
            Err(e) => {
                debug!("TFTP WRQ cannot create {}: {}", path, e);
                self.send_error(peer, ERR_ACCESS_VIOLATION, "Cannot create file")
                    .await;
                return;
            }
        };

        self.remove_transfer(peer).await;
        let state = Arc::new(Mutex::new(TransferState::upload(
            Arc::clone(&self.user),
            path,
            file,
        )));

        let ack = ack_packet(0);
        state.lock().await.record_sent(ack.clone());
        self.transfers.write().await.insert(peer, state);

        if let Err(e) = self.socket.send_to(&ack, peer).await {
            error!("failed to send initial ACK to {}: {}", peer, e);
        }
    }

    /// DATA during an upload. The expected block is written and ACKed; the
    /// immediately preceding block is a client retransmit and gets its ACK
    /// again without touching the writer; anything else is ignored.
    async fn handle_data(&self, peer: SocketAddr, block: u16, data: Vec<u8>) {
        let state = match self.lookup_transfer(peer).await {
            Some(state) => state,
            None => {
                self.send_error(peer, ERR_UNKNOWN_TID, "No active upload").await;
                return;
            }
        };

        let mut state = state.lock().await;
        if !state.is_upload() {
            drop(state);
            self.send_error(peer, ERR_UNKNOWN_TID, "No active upload").await;
            return;
        }

        if block == state.expected_block {
            let write_result = match &mut state.io {
                TransferIo::Upload(file) => file.write_all(&data).await,
                TransferIo::Download(_) => {
                    drop(state);
                    self.send_error(peer, ERR_UNKNOWN_TID, "No active upload").await;
                    return;
                }
            };
            if let Err(e) = write_result {
                error!("error writing {}: {}", state.filename, e);
                drop(state);
                self.send_error(peer, ERR_DISK_FULL, "Write error").await;
                self.remove_transfer(peer).await;
                return;
            }

            let ack = ack_packet(block);
            state.record_sent(ack.clone());
            if let Err(e) = self.socket.send_to(&ack, peer).await {
                error!("failed to send ACK to {}: {}", peer, e);
            }

            if data.len() < TFTP_BLOCK_SIZE {
                if let TransferIo::Upload(file) = &mut state.io {
                    file.flush().await.ok();
                }
                debug!("TFTP upload of {} from {} completed", state.filename, peer);
                drop(state);
                self.remove_transfer(peer).await;
            } else {
                state.expected_block = state.expected_block.wrapping_add(1);
            }
        } else if block == state.expected_block.wrapping_sub(1) {
            // Duplicate of the block already written: re-ACK, never re-apply.
            debug!("duplicate DATA block {} from {}, re-sending ACK", block, peer);
            let last = state.last_packet.clone();
            state.touch();
            drop(state);
            self.socket.send_to(&last, peer).await.ok();
        } else {
            debug!(
                "unexpected DATA block from {}: got {}, expected {}",
                peer, block, state.expected_block
            );
        }
    }

    /// ACK during a download: the ACK of the last sent block either finishes
    /// the transfer or triggers the next block.
    async fn handle_ack(&self, peer: SocketAddr, block: u16) {
        let state = match self.lookup_transfer(peer).await {
            Some(state) => state,
            None => {
                self.send_error(peer, ERR_UNKNOWN_TID, "No active download")
                    .await;
                return;
            }
        };

        let mut state = state.lock().await;
        if state.is_upload() {
            drop(state);
            self.send_error(peer, ERR_UNKNOWN_TID, "No active download")
                .await;
            return;
        }

        if block != state.expected_block.wrapping_sub(1) {
            debug!(
                "unexpected ACK from {}: got {}, expected {}",
                peer,
                block,
                state.expected_block.wrapping_sub(1)
            );
            return;
        }

        if state.finished {
            debug!("TFTP download of {} to {} completed", state.filename, peer);
            drop(state);
            self.remove_transfer(peer).await;
            return;
        }

        if let Err(e) = self.send_next_block(&mut state, peer).await {
            error!("error reading {}: {}", state.filename, e);
            drop(state);
            self.send_error(peer, ERR_NOT_DEFINED, "Read error").await;
            self.remove_transfer(peer).await;
        }
    }

    /// Reads the next block from the file and sends it. A short read marks
    /// the transfer finished; it is cleaned up on the final ACK.
    async fn send_next_block(
        &self,
        state: &mut TransferState,
        peer: SocketAddr,
    ) -> std::io::Result<()> {
        let mut buf = [0u8; TFTP_BLOCK_SIZE];
        let mut filled = 0;

        let file = match &mut state.io {
            TransferIo::Download(file) => file,
            TransferIo::Upload(_) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "transfer is not a download",
                ))
            }
        };

        while filled < TFTP_BLOCK_SIZE {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        let packet = data_packet(state.expected_block, &buf[..filled]);
        self.socket.send_to(&packet, peer).await?;
        state.record_sent(packet);

        if filled < TFTP_BLOCK_SIZE {
            state.finished = true;
        }
        state.expected_block = state.expected_block.wrapping_add(1);

        Ok(())
    }

    /// Resends the last packet of every transfer that has gone quiet; drops
    /// transfers that exhausted their retries.
    async fn retransmit_stalled(&self) {
        let peers: Vec<SocketAddr> = self.transfers.read().await.keys().copied().collect();

        for peer in peers {
            let state = match self.lookup_transfer(peer).await {
                Some(state) => state,
                None => continue,
            };

            let mut state = state.lock().await;
            if state.last_activity.elapsed() < TFTP_RETRANSMIT_TIMEOUT {
                continue;
            }

            if state.retries >= TFTP_MAX_RETRIES {
                warn!(
                    "transfer of {} for {} stalled after {} retries, dropping",
                    state.filename, peer, state.retries
                );
                drop(state);
                self.send_error(peer, ERR_NOT_DEFINED, "Transfer timed out")
                    .await;
                self.remove_transfer(peer).await;
                continue;
            }

            state.retries += 1;
            state.last_activity = Instant::now();
            let packet = state.last_packet.clone();
            let attempt = state.retries;
            drop(state);

            debug!("retransmitting to {} (attempt {})", peer, attempt);
            self.socket.send_to(&packet, peer).await.ok();
        }
    }

    async fn lookup_transfer(&self, peer: SocketAddr) -> Option<Arc<Mutex<TransferState>>> {
        self.transfers.read().await.get(&peer).cloned()
    }

    /// Drops a transfer's state; the file handle closes with it.
    async fn remove_transfer(&self, peer: SocketAddr) {
        self.transfers.write().await.remove(&peer);
    }

    async fn send_error(&self, peer: SocketAddr, code: u16, message: &str) {
        let packet = error_packet(code, message);
        if let Err(e) = self.socket.send_to(&packet, peer).await {
            debug!("failed to send TFTP error to {}: {}", peer, e);
        }
    }
}

fn mode_is_octet(mode: &str) -> bool {
    mode == "octet" || mode == "binary"
}

/// The identity TFTP transfers run as: the configured `services.tftp.user`,
/// or the alphabetically first account with a warning so the fallback is
/// never silent.
fn resolve_default_user(ctx: &ServerContext) -> Result<Arc<User>> {
    if let Some(name) = &ctx.config.services.tftp.user {
        return ctx
            .auth
            .lookup(name)
            .ok_or_else(|| anyhow!("tftp user '{}' is not a configured user", name));
    }

    let names = ctx.auth.usernames();
    let first = names
        .first()
        .ok_or_else(|| anyhow!("no users configured for TFTP"))?;
    warn!(
        "no tftp user configured; transfers will run as '{}', set services.tftp.user to silence this",
        first
    );
    ctx.auth
        .lookup(first)
        .ok_or_else(|| anyhow!("no users configured for TFTP"))
}

#[async_trait]
impl ProtocolServer for TftpServer {
    fn name(&self) -> &'static str {
        "TFTP"
    }

    fn port(&self) -> u16 {
        self.socket
            .local_addr()
            .map(|a| a.port())
            .unwrap_or(self.ctx.config.services.tftp.port)
    }

    async fn serve(self: Box<Self>, shutdown: watch::Receiver<bool>) -> Result<()> {
        self.run(shutdown).await;
        Ok(())
    }
}
