use std::sync::Arc;
use std::time::Instant;
use tokio::fs::File;

use crate::users::User;

/// The open file handle of a transfer; exactly one direction per client.
#[derive(Debug)]
pub enum TransferIo {
    /// RRQ: the server reads and sends DATA blocks.
    Download(File),
    /// WRQ: the server receives DATA blocks and writes.
    Upload(File),
}

/// State of one in-flight transfer, keyed by the client's UDP address.
/// Dropping the state closes the file handle.
#[derive(Debug)]
pub struct TransferState {
    pub user: Arc<User>,
    pub filename: String,
    pub io: TransferIo,
    /// Download: the block the server will send next. Upload: the block the
    /// server will accept next. Wraps at u16 for long transfers.
    pub expected_block: u16,
    /// Last packet sent to the client, kept for retransmission.
    pub last_packet: Vec<u8>,
    pub last_activity: Instant,
    pub retries: u8,
    /// Download only: the final short block went out and the transfer ends
    /// on its ACK.
    pub finished: bool,
}

impl TransferState {
    pub fn download(user: Arc<User>, filename: String, file: File) -> Self {
        Self::new(user, filename, TransferIo::Download(file))
    }

    pub fn upload(user: Arc<User>, filename: String, file: File) -> Self {
        Self::new(user, filename, TransferIo::Upload(file))
    }

    fn new(user: Arc<User>, filename: String, io: TransferIo) -> Self {
        Self {
            user,
            filename,
            io,
            expected_block: 1,
            last_packet: Vec::new(),
            last_activity: Instant::now(),
            retries: 0,
            finished: false,
        }
    }

    pub fn is_upload(&self) -> bool {
        matches!(self.io, TransferIo::Upload(_))
    }

    /// Records progress: stores the packet for retransmission and resets
    /// the retry counter.
    pub fn record_sent(&mut self, packet: Vec<u8>) {
        self.last_packet = packet;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.retries = 0;
    }
}
