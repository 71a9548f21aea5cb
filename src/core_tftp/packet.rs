use thiserror::Error;

// RFC 1350 opcodes.
pub const OP_RRQ: u16 = 1;
pub const OP_WRQ: u16 = 2;
pub const OP_DATA: u16 = 3;
pub const OP_ACK: u16 = 4;
pub const OP_ERROR: u16 = 5;

// RFC 1350 error codes.
pub const ERR_NOT_DEFINED: u16 = 0;
pub const ERR_FILE_NOT_FOUND: u16 = 1;
pub const ERR_ACCESS_VIOLATION: u16 = 2;
pub const ERR_DISK_FULL: u16 = 3;
pub const ERR_ILLEGAL_OPERATION: u16 = 4;
pub const ERR_UNKNOWN_TID: u16 = 5;
pub const ERR_FILE_EXISTS: u16 = 6;
pub const ERR_NO_SUCH_USER: u16 = 7;

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("packet too short")]
    TooShort,

    #[error("unsupported opcode {0}")]
    UnknownOpcode(u16),

    #[error("malformed request: {0}")]
    Malformed(&'static str),
}

/// One decoded TFTP datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TftpPacket {
    Rrq { filename: String, mode: String },
    Wrq { filename: String, mode: String },
    Data { block: u16, data: Vec<u8> },
    Ack { block: u16 },
    Error { code: u16, message: String },
}

impl TftpPacket {
    pub fn parse(buf: &[u8]) -> Result<TftpPacket, PacketError> {
        if buf.len() < 2 {
            return Err(PacketError::TooShort);
        }

        let opcode = u16::from_be_bytes([buf[0], buf[1]]);
        match opcode {
            OP_RRQ => {
                let (filename, mode) = parse_request(&buf[2..])?;
                Ok(TftpPacket::Rrq { filename, mode })
            }
            OP_WRQ => {
                let (filename, mode) = parse_request(&buf[2..])?;
                Ok(TftpPacket::Wrq { filename, mode })
            }
            OP_DATA => {
                if buf.len() < 4 {
                    return Err(PacketError::TooShort);
                }
                Ok(TftpPacket::Data {
                    block: u16::from_be_bytes([buf[2], buf[3]]),
                    data: buf[4..].to_vec(),
                })
            }
            OP_ACK => {
                if buf.len() < 4 {
                    return Err(PacketError::TooShort);
                }
                Ok(TftpPacket::Ack {
                    block: u16::from_be_bytes([buf[2], buf[3]]),
                })
            }
            OP_ERROR => {
                if buf.len() < 4 {
                    return Err(PacketError::TooShort);
                }
                let code = u16::from_be_bytes([buf[2], buf[3]]);
                let end = buf[4..]
                    .iter()
                    .position(|&b| b == 0)
                    .map(|i| 4 + i)
                    .unwrap_or(buf.len());
                let message = String::from_utf8_lossy(&buf[4..end]).to_string();
                Ok(TftpPacket::Error { code, message })
            }
            other => Err(PacketError::UnknownOpcode(other)),
        }
    }
}

/// Parses the `filename\0mode\0` body of a RRQ or WRQ. The mode is
/// lowercased; callers decide whether they accept it.
fn parse_request(body: &[u8]) -> Result<(String, String), PacketError> {
    let mut fields = body.split(|&b| b == 0);

    let filename = fields.next().ok_or(PacketError::Malformed("no filename"))?;
    let mode = fields.next().ok_or(PacketError::Malformed("no mode"))?;

    if filename.is_empty() {
        return Err(PacketError::Malformed("empty filename"));
    }

    let filename = String::from_utf8(filename.to_vec())
        .map_err(|_| PacketError::Malformed("filename is not valid UTF-8"))?;
    let mode = String::from_utf8(mode.to_vec())
        .map_err(|_| PacketError::Malformed("mode is not valid UTF-8"))?
        .to_lowercase();

    Ok((filename, mode))
}

pub fn data_packet(block: u16, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(4 + payload.len());
    packet.extend_from_slice(&OP_DATA.to_be_bytes());
    packet.extend_from_slice(&block.to_be_bytes());
    packet.extend_from_slice(payload);
    packet
}

pub fn ack_packet(block: u16) -> Vec<u8> {
    let mut packet = Vec::with_capacity(4);
    packet.extend_from_slice(&OP_ACK.to_be_bytes());
    packet.extend_from_slice(&block.to_be_bytes());
    packet
}

/// Builds an ERROR packet; the message is NUL-terminated on the wire.
pub fn error_packet(code: u16, message: &str) -> Vec<u8> {
    let mut packet = Vec::with_capacity(4 + message.len() + 1);
    packet.extend_from_slice(&OP_ERROR.to_be_bytes());
    packet.extend_from_slice(&code.to_be_bytes());
    packet.extend_from_slice(message.as_bytes());
    packet.push(0);
    packet
}
