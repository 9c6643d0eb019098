// MIT License - Copyright (c) 2026 Peter Wright
// UNP framing: start byte, length, header, payload and XOR checksum

use std::fmt;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::{CodecError, HexDump};
use crate::error::{Result, StackError};

/// First byte of every frame.
pub const START_OF_FRAME: u8 = 0xFE;

/// Largest payload expressible with the 8-bit length prefix.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

wire_enum! {
    /// Upper three bits of `cmd0`.
    pub enum CommandType: u8 {
        Poll = 0,
        Sreq = 1,
        Areq = 2,
        Srsp = 3,
        Res0 = 4,
        Res1 = 5,
        Res2 = 6,
        Res3 = 7,
    }
}

wire_enum! {
    /// Lower five bits of `cmd0`.
    pub enum Subsystem: u8 {
        Res0 = 0,
        Sys = 1,
        Mac = 2,
        Nwk = 3,
        Af = 4,
        Zdo = 5,
        Sapi = 6,
        Util = 7,
        Dbg = 8,
        App = 9,
        Ota = 10,
        Znp = 11,
        Spare12 = 12,
        Ubl = 13,
        Res14 = 14,
        AppCnf = 15,
        Res16 = 16,
        Protobuf = 17,
        Res18 = 18,
        Res19 = 19,
        Res20 = 20,
        Gp = 21,
    }
}

/// One UNP frame. The length prefix and checksum are derived when rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command_type: CommandType,
    pub subsystem: Subsystem,
    pub command: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(command_type: CommandType, subsystem: Subsystem, command: u8, payload: Vec<u8>) -> Self {
        Self {
            command_type,
            subsystem,
            command,
            payload,
        }
    }

    /// The radio answers an unparseable SREQ with `SRSP RES0 0x00 <code>`.
    pub fn error_code(&self) -> Option<ErrorCode> {
        if self.command_type == CommandType::Srsp && self.subsystem == Subsystem::Res0 && self.command == 0 {
            Some(ErrorCode(self.payload.first().copied().unwrap_or(0)))
        } else {
            None
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CommandType={} Subsystem={} Command={} Payload={}",
            self.command_type as u8,
            self.subsystem as u8,
            self.command,
            HexDump(&self.payload)
        )
    }
}

/// Error code carried by a radio error frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode(pub u8);

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            1 => f.write_str("Invalid subsystem"),
            2 => f.write_str("Invalid command ID"),
            3 => f.write_str("Invalid parameter"),
            4 => f.write_str("Invalid length"),
            other => write!(f, "unknown error code: {other}"),
        }
    }
}

/// XOR of every byte.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// `FE len cmd0 cmd1 payload fcs`
pub fn render_frame(frame: &Frame) -> Result<Vec<u8>> {
    if frame.payload.len() > MAX_PAYLOAD {
        return Err(CodecError::LengthOverflow {
            len: frame.payload.len(),
            width: 1,
        }
        .into());
    }
    let cmd0 = (((frame.command_type as u8) << 5) & 0xE0) | ((frame.subsystem as u8) & 0x1F);

    let mut out = Vec::with_capacity(frame.payload.len() + 5);
    out.push(START_OF_FRAME);
    out.push(frame.payload.len() as u8);
    out.push(cmd0);
    out.push(frame.command);
    out.extend_from_slice(&frame.payload);
    out.push(checksum(&out[1..]));
    Ok(out)
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Frame) -> Result<()> {
    let rendered = render_frame(frame)?;
    writer.write_all(&rendered).await?;
    writer.flush().await?;
    Ok(())
}

/// Read exactly one frame.
///
/// A stale byte where the start marker should be is reported as
/// [`StackError::InvalidStartOfFrame`]; this happens when the radio's output
/// has not been consumed for a long time. End of stream surfaces as an I/O
/// error, which is how a closed transport unblocks the reader.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame> {
    let start = reader.read_u8().await?;
    if start != START_OF_FRAME {
        return Err(StackError::InvalidStartOfFrame(start));
    }

    let len = reader.read_u8().await?;
    let cmd0 = reader.read_u8().await?;
    let cmd1 = reader.read_u8().await?;
    let mut payload = vec![0u8; usize::from(len)];
    reader.read_exact(&mut payload).await?;
    let fcs = reader.read_u8().await?;

    let actual = checksum(&[len, cmd0, cmd1]) ^ checksum(&payload);
    if fcs != actual {
        return Err(StackError::ChecksumMismatch { expected: fcs, actual });
    }

    let command_type = CommandType::try_from((cmd0 & 0xE0) >> 5)?;
    let subsystem = Subsystem::try_from(cmd0 & 0x1F)?;

    Ok(Frame {
        command_type,
        subsystem,
        command: cmd1,
        payload,
    })
}
