use std::time::Duration;

/// Greeting sent on the control channel right after accept.
pub const FTP_BANNER: &str = "aioftpd ready";

/// How long a passive listener waits for the client's data connection.
pub const DATA_ACCEPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on a single data-channel transfer.
pub const DATA_TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);

/// TFTP data block payload size, fixed by RFC 1350.
pub const TFTP_BLOCK_SIZE: usize = 512;

/// Largest datagram the server will read: 4-byte header plus one block.
pub const TFTP_MAX_PACKET: usize = 4 + TFTP_BLOCK_SIZE;

/// Silence interval after which the last packet of a transfer is resent.
pub const TFTP_RETRANSMIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Retransmissions before a stalled transfer is dropped.
pub const TFTP_MAX_RETRIES: u8 = 5;

/// Grace period for engines to wind down on shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);
