// MIT License - Copyright (c) 2026 Peter Wright
// Zigbee Cluster Library: frames, global and cluster-specific commands

//! ZCL frame layer.
//!
//! An [`AfIncomingMessage`] carries a ZCL frame in its `data`. [`Zcl`]
//! decodes the frame header and resolves the payload: global commands by
//! command id alone, cluster commands by `(cluster, direction, command id)`.
//! Outbound frames are assembled with [`FrameBuilder`].

pub mod attribute;
pub mod cluster;
pub mod frame;
pub mod global;

use serde::Serialize;

use crate::codec::{self, CodecResult};
use crate::error::{Result, StackError};
use crate::znp::messages::AfIncomingMessage;

pub use attribute::{AttributeValue, ZclDataType};
pub use cluster::{ClusterId, LocalCommand};
pub use frame::{FrameBuilder, FrameControl, TransactionIdProvider};
pub use global::GlobalCommand;

wire_enum! {
    pub enum FrameType: u8 {
        Global = 0,
        Local = 1,
    }
}

wire_enum! {
    pub enum Direction: u8 {
        ClientToServer = 0,
        ServerToClient = 1,
    }
}

wire_enum! {
    pub enum ZclStatus: u8 {
        Success = 0x00,
        Failure = 0x01,
        NotAuthorized = 0x7e,
        MalformedCommand = 0x80,
        UnsupClusterCommand = 0x81,
        UnsupGeneralCommand = 0x82,
        UnsupManuClusterCommand = 0x83,
        UnsupManuGeneralCommand = 0x84,
        InvalidField = 0x85,
        UnsupportedAttribute = 0x86,
        InvalidValue = 0x87,
        ReadOnly = 0x88,
        InsufficientSpace = 0x89,
        DuplicateExists = 0x8a,
        NotFound = 0x8b,
        UnreportableAttribute = 0x8c,
        InvalidDataType = 0x8d,
        InvalidSelector = 0x8e,
        WriteOnly = 0x8f,
        InconsistentStartupState = 0x90,
        DefinedOutOfBand = 0x91,
        Inconsistent = 0x92,
        ActionDenied = 0x93,
        Timeout = 0x94,
        Abort = 0x95,
        InvalidImage = 0x96,
        WaitForData = 0x97,
        NoImageAvailable = 0x98,
        RequireMoreImage = 0x99,
        HardwareFailure = 0xc0,
        SoftwareFailure = 0xc1,
        CalibrationError = 0xc2,
        /// Non-standard; marks a command that has its own response.
        CmdHasRsp = 0xff,
    }
}

impl ZclStatus {
    pub fn is_success(&self) -> bool {
        *self == ZclStatus::Success
    }

    pub fn to_result(self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(StackError::ZclStatus(self))
        }
    }
}

/// A decoded ZCL payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ZclCommand {
    Global(GlobalCommand),
    Local(LocalCommand),
}

impl ZclCommand {
    pub fn id(&self) -> u8 {
        match self {
            ZclCommand::Global(cmd) => cmd.id(),
            ZclCommand::Local(cmd) => cmd.id(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ZclCommand::Global(cmd) => cmd.name(),
            ZclCommand::Local(cmd) => cmd.name(),
        }
    }

    pub fn encode_payload(&self) -> CodecResult<Vec<u8>> {
        match self {
            ZclCommand::Global(cmd) => cmd.encode_payload(),
            ZclCommand::Local(cmd) => cmd.encode_payload(),
        }
    }
}

impl From<GlobalCommand> for ZclCommand {
    fn from(value: GlobalCommand) -> Self {
        ZclCommand::Global(value)
    }
}

impl From<LocalCommand> for ZclCommand {
    fn from(value: LocalCommand) -> Self {
        ZclCommand::Local(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZclFrame {
    pub frame_control: FrameControl,
    pub manufacturer_code: Option<u16>,
    pub transaction_sequence_number: u8,
    pub command_identifier: u8,
    pub command_name: &'static str,
    pub command: ZclCommand,
}

/// An [`AfIncomingMessage`] with its data decoded as a ZCL frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZclIncomingMessage {
    pub group_id: u16,
    pub cluster_id: u16,
    pub src_addr: String,
    pub src_endpoint: u8,
    pub dst_endpoint: u8,
    pub was_broadcast: bool,
    pub link_quality: u8,
    pub security_use: bool,
    pub timestamp: u32,
    pub trans_seq_number: u8,
    pub data: ZclFrame,
}

/// Frame codec plus the transaction sequence counter for outbound frames.
#[derive(Debug, Default)]
pub struct Zcl {
    transaction_ids: TransactionIdProvider,
}

impl Zcl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transaction_ids(transaction_ids: TransactionIdProvider) -> Self {
        Self { transaction_ids }
    }

    pub fn transaction_ids(&self) -> &TransactionIdProvider {
        &self.transaction_ids
    }

    /// Build and encode an outbound frame; returns its sequence number too.
    pub fn encode(&self, builder: FrameBuilder) -> Result<(u8, Vec<u8>)> {
        let frame = builder.build(&self.transaction_ids)?;
        Ok((frame.transaction_sequence_number, frame.to_bytes()?))
    }

    /// Decode a ZCL frame received on `cluster_id`.
    pub fn decode_frame(&self, cluster_id: u16, data: &[u8]) -> Result<ZclFrame> {
        let frame: frame::Frame = codec::decode(data)?;
        let control = frame.frame_control;

        let command = match control.frame_type {
            FrameType::Global => {
                let mut command = GlobalCommand::decode(frame.command_identifier, &frame.payload)?;
                if let Some(cluster) = cluster::find(cluster_id) {
                    command.resolve_names(cluster);
                }
                ZclCommand::Global(command)
            }
            FrameType::Local => ZclCommand::Local(LocalCommand::decode(
                cluster_id,
                control.direction,
                frame.command_identifier,
                &frame.payload,
            )?),
        };

        Ok(ZclFrame {
            frame_control: control,
            manufacturer_code: frame.manufacturer_code,
            transaction_sequence_number: frame.transaction_sequence_number,
            command_identifier: frame.command_identifier,
            command_name: command.name(),
            command,
        })
    }

    pub fn decode_incoming(&self, message: &AfIncomingMessage) -> Result<ZclIncomingMessage> {
        let data = self.decode_frame(message.cluster_id, &message.data)?;
        Ok(ZclIncomingMessage {
            group_id: message.group_id,
            cluster_id: message.cluster_id,
            src_addr: message.src_addr.clone(),
            src_endpoint: message.src_endpoint,
            dst_endpoint: message.dst_endpoint,
            was_broadcast: message.was_broadcast > 0,
            link_quality: message.link_quality,
            security_use: message.security_use > 0,
            timestamp: message.timestamp,
            trans_seq_number: message.trans_seq_number,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zcl::cluster::Off;
    use hex_literal::hex;

    fn incoming(cluster_id: u16, data: &[u8]) -> AfIncomingMessage {
        AfIncomingMessage {
            cluster_id,
            src_addr: "0x1a2b".into(),
            src_endpoint: 1,
            dst_endpoint: 1,
            link_quality: 120,
            data: data.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_report_attributes_on_any_cluster() {
        let zcl = Zcl::new();
        for cluster_id in [0x0006, 0x0402, 0xfc00] {
            let frame = zcl.decode_frame(cluster_id, &hex!("18 21 0a 0000 29 e803")).unwrap();
            assert_eq!(frame.command_name, "ReportAttributes");
            let ZclCommand::Global(GlobalCommand::ReportAttributes(report)) = frame.command else {
                panic!("not a report");
            };
            assert_eq!(report.attribute_reports[0].attribute, AttributeValue::Int16(1000));
        }
    }

    #[test]
    fn test_report_names_resolved_from_cluster() {
        let frame = Zcl::new().decode_frame(0x0006, &hex!("18 01 0a 0000 10 01")).unwrap();
        let ZclCommand::Global(GlobalCommand::ReportAttributes(report)) = frame.command else {
            panic!("not a report");
        };
        assert_eq!(report.attribute_reports[0].attribute_name, "OnOff");
    }

    #[test]
    fn test_on_off_off_command() {
        let msg = Zcl::new().decode_incoming(&incoming(0x0006, &hex!("01 4c 00"))).unwrap();
        assert_eq!(msg.data.command, ZclCommand::Local(LocalCommand::Off(Off {})));
        assert_eq!(msg.data.command_name, "Off");
        assert_eq!(msg.data.transaction_sequence_number, 0x4c);
        assert_eq!(msg.src_addr, "0x1a2b");
        assert_eq!(msg.link_quality, 120);
    }

    #[test]
    fn test_unresolved_local_command() {
        let err = Zcl::new().decode_frame(0x0006, &hex!("01 01 55")).unwrap_err();
        assert_eq!(err.to_string(), "cluster 6 doesn't support local ClientToServer cmd 85");
    }

    #[test]
    fn test_encode_uses_counter() {
        let zcl = Zcl::with_transaction_ids(TransactionIdProvider::starting_at(42));
        let (tsn, bytes) = zcl.encode(FrameBuilder::local(Off {})).unwrap();
        assert_eq!(tsn, 42);
        assert_eq!(bytes, vec![0x01, 42, 0x00]);
        let (tsn, _) = zcl.encode(FrameBuilder::local(Off {})).unwrap();
        assert_eq!(tsn, 43);
    }

    #[test]
    fn test_zcl_status_result() {
        assert!(ZclStatus::Success.to_result().is_ok());
        assert!(matches!(
            ZclStatus::UnsupClusterCommand.to_result(),
            Err(StackError::ZclStatus(ZclStatus::UnsupClusterCommand))
        ));
    }
}
