// MIT License - Copyright (c) 2026 Peter Wright
// ZCL frame header, frame builder and transaction sequence numbers

use std::sync::atomic::{AtomicU8, Ordering};

use crate::codec;
use crate::error::{Result, StackError};

use super::cluster::LocalCommand;
use super::global::GlobalCommand;
use super::{Direction, FrameType, ZclCommand};

wire_struct! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
    pub struct FrameControl {
        bits(u8) {
            pub frame_type: FrameType = 0b0000_0011,
            pub manufacturer_specific: bool = 0b0000_0100,
            pub direction: Direction = 0b0000_1000,
            pub disable_default_response: bool = 0b0001_0000,
            pub reserved: u8 = 0b1110_0000,
        },
    }
}

wire_struct! {
    /// A ZCL frame with its payload still encoded.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Frame {
        pub frame_control: FrameControl,
        pub manufacturer_code: Option<u16> [when (frame_control.manufacturer_specific == 1)],
        pub transaction_sequence_number: u8,
        pub command_identifier: u8,
        pub payload: Vec<u8>,
    }
}

/// Rotating ZCL transaction sequence numbers: 1..=255, then back to 1.
#[derive(Debug)]
pub struct TransactionIdProvider {
    next: AtomicU8,
}

impl TransactionIdProvider {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start the rotation at `first`; zero is never handed out.
    pub fn starting_at(first: u8) -> Self {
        Self {
            next: AtomicU8::new(first.max(1)),
        }
    }

    pub fn next_id(&self) -> u8 {
        let advance = |id: u8| Some(if id == u8::MAX { 1 } else { id + 1 });
        match self.next.fetch_update(Ordering::Relaxed, Ordering::Relaxed, advance) {
            Ok(id) | Err(id) => id,
        }
    }
}

impl Default for TransactionIdProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Assembles an outbound [`Frame`]. Frame type, direction and command id
/// must be set before [`build`](FrameBuilder::build).
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    frame_type: Option<FrameType>,
    direction: Option<Direction>,
    command_id: Option<u8>,
    manufacturer_code: Option<u16>,
    disable_default_response: bool,
    command: Option<ZclCommand>,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Global command sent client to server.
    pub fn global(command: impl Into<GlobalCommand>) -> Self {
        Self::new()
            .frame_type(FrameType::Global)
            .direction(Direction::ClientToServer)
            .command(ZclCommand::Global(command.into()))
    }

    /// Cluster-specific command in its declared direction.
    pub fn local(command: impl Into<LocalCommand>) -> Self {
        Self::new()
            .frame_type(FrameType::Local)
            .command(ZclCommand::Local(command.into()))
    }

    pub fn frame_type(mut self, frame_type: FrameType) -> Self {
        self.frame_type = Some(frame_type);
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn command_id(mut self, command_id: u8) -> Self {
        self.command_id = Some(command_id);
        self
    }

    pub fn manufacturer_code(mut self, code: u16) -> Self {
        self.manufacturer_code = Some(code);
        self
    }

    pub fn disable_default_response(mut self, disable: bool) -> Self {
        self.disable_default_response = disable;
        self
    }

    /// Set the payload. Also fills in the command id, and for cluster
    /// commands the direction, unless they were set explicitly.
    pub fn command(mut self, command: impl Into<ZclCommand>) -> Self {
        let command = command.into();
        self.command_id.get_or_insert(command.id());
        if let ZclCommand::Local(local) = &command {
            self.direction.get_or_insert(local.direction());
        }
        self.command = Some(command);
        self
    }

    pub fn build(self, transaction_ids: &TransactionIdProvider) -> Result<Frame> {
        let frame_type = self.frame_type.ok_or(StackError::FrameBuilder("frame type must be set"))?;
        let command_identifier = self.command_id.ok_or(StackError::FrameBuilder("command id must be set"))?;
        let direction = self.direction.ok_or(StackError::FrameBuilder("direction must be set"))?;

        let payload = match &self.command {
            Some(command) => command.encode_payload()?,
            None => Vec::new(),
        };

        Ok(Frame {
            frame_control: FrameControl {
                frame_type,
                manufacturer_specific: self.manufacturer_code.is_some(),
                direction,
                disable_default_response: self.disable_default_response,
                reserved: 0,
            },
            manufacturer_code: self.manufacturer_code,
            transaction_sequence_number: transaction_ids.next_id(),
            command_identifier,
            payload,
        })
    }
}

impl Frame {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(codec::encode(self)?)
    }
}

/// Sequence number of an encoded frame, read from the header only.
pub fn sequence_number(data: &[u8]) -> Option<u8> {
    codec::decode::<Frame>(data)
        .ok()
        .map(|frame| frame.transaction_sequence_number)
}
