// MIT License - Copyright (c) 2026 Peter Wright
// Error taxonomy for the ZNP stack

use std::time::Duration;

use crate::codec::CodecError;
use crate::config::FieldDiff;
use crate::unp::{CommandType, ErrorCode, Subsystem};

/// All errors that can occur in the ezstack library.
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid start of frame: {0:#04x}")]
    InvalidStartOfFrame(u8),

    #[error("Invalid checksum. Expected: {expected:#04x}, actual: {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Radio rejected {subsystem:?} command {command:#04x}: {code}")]
    ErrorFrame {
        subsystem: Subsystem,
        command: u8,
        code: ErrorCode,
    },

    #[error("Unexpected response: {details}")]
    UnexpectedResponse { details: String },

    #[error("Unknown async command: subsystem {subsystem:?}, command {command:#04x}")]
    UnknownAsyncCommand { subsystem: Subsystem, command: u8 },

    #[error("Unsupported frame type {command_type:?} from {subsystem:?}")]
    UnsupportedFrame {
        command_type: CommandType,
        subsystem: Subsystem,
    },

    #[error("Sync response without a request in flight: {subsystem:?} {command:#04x}")]
    SrspWithoutRequest { subsystem: Subsystem, command: u8 },

    #[error("Timeout after {0:?} waiting for {1}")]
    Timeout(Duration, &'static str),

    #[error("Transport closed")]
    TransportClosed,

    #[error("Invalid status: {0}")]
    Status(crate::znp::Status),

    #[error("ZCL status: {0}")]
    ZclStatus(crate::zcl::ZclStatus),

    #[error("data confirm: {0}")]
    DataConfirm(crate::znp::Status),

    #[error("Unknown cluster {0:#06x}")]
    UnknownCluster(u16),

    #[error("cluster {cluster} doesn't support local {direction} cmd {command}")]
    UnknownCommand {
        cluster: u16,
        direction: crate::zcl::Direction,
        command: u8,
    },

    #[error("Unsupported global command {0:#04x}")]
    UnknownGlobalCommand(u8),

    #[error("Frame builder: {0}")]
    FrameBuilder(&'static str),

    #[error("Unsupported {kind}: {value}")]
    UnsupportedVariant { kind: &'static str, value: String },

    #[error("Network configuration mismatch, flashing not allowed: {}", render_diff(.0))]
    ConfigMismatch(Vec<FieldDiff>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unsupported channel: {0}")]
    UnsupportedChannel(u8),

    #[error("scan channels must have exactly one bit set, got {0:#010x}")]
    ScanChannels(u32),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Received message from unknown device: {0}")]
    UnknownDevice(String),

    #[error("{step}: {source}")]
    Interrogation {
        step: String,
        #[source]
        source: Box<StackError>,
    },

    #[error("unable to run command [{command}] on cluster [{cluster}]. Status: {status}")]
    CommandRejected {
        command: u8,
        cluster: u16,
        status: crate::zcl::ZclStatus,
    },

    #[error("Network address {network_address} already belongs to {existing}")]
    AddressConflict {
        network_address: String,
        existing: String,
    },

    #[error("{0} channel has no capacity")]
    ChannelFull(&'static str),

    #[error("Node database error: {0}")]
    Database(#[from] serde_json::Error),
}

fn render_diff(diff: &[FieldDiff]) -> String {
    serde_json::to_string(diff).unwrap_or_else(|_| format!("{diff:?}"))
}

impl StackError {
    /// Whether this error is transient and the request should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StackError::Timeout(..)
                | StackError::DataConfirm(_)
                | StackError::Status(_)
                | StackError::ErrorFrame { .. }
                | StackError::UnexpectedResponse { .. }
                | StackError::Codec(_)
        )
    }

    /// Whether the byte stream can no longer be trusted and the stack must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StackError::Io(_)
                | StackError::Serial(_)
                | StackError::InvalidStartOfFrame(_)
                | StackError::ChecksumMismatch { .. }
                | StackError::TransportClosed
                | StackError::ConfigMismatch(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_are_retryable_transport_errors_are_not() {
        assert!(StackError::Timeout(Duration::from_secs(1), "SysResetInd").is_retryable());
        assert!(!StackError::TransportClosed.is_retryable());
        assert!(StackError::TransportClosed.is_fatal());
        assert!(StackError::ChecksumMismatch { expected: 1, actual: 2 }.is_fatal());
        assert!(!StackError::UnknownCluster(6).is_fatal());
    }

    #[test]
    fn test_unknown_command_message_names_all_parts() {
        let err = StackError::UnknownCommand {
            cluster: 6,
            direction: crate::zcl::Direction::ClientToServer,
            command: 0x55,
        };
        assert_eq!(err.to_string(), "cluster 6 doesn't support local ClientToServer cmd 85");
    }

    #[test]
    fn test_codec_error_converts() {
        let err: StackError = CodecError::MissingField.into();
        assert!(matches!(err, StackError::Codec(CodecError::MissingField)));
    }
}
