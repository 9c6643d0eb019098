// MIT License - Copyright (c) 2026 Peter Wright
// ZCL commands sent to devices

use tracing::{debug, error};

use crate::device::DeviceAndEndpoint;
use crate::error::{Result, StackError};
use crate::zcl::global::{
    AttributeReportingConfigurationRecord, ConfigureReportingCommand, ReadAttributesCommand, ReadAttributesResponse,
    WriteAttributeRecord, WriteAttributesCommand, WriteAttributesResponse,
};
use crate::zcl::{ClusterId, FrameBuilder, GlobalCommand, LocalCommand, ZclCommand, ZclFrame};
use crate::znp::commands::{AfDataRequest, ZdoBindReq};
use crate::znp::{AddrMode, AfDataRequestOptions};

use super::Stack;

/// Profile-wide commands go to every endpoint.
const BROADCAST_ENDPOINT: u8 = 0xff;
const SOURCE_ENDPOINT: u8 = 1;
const RADIUS: u8 = 15;

impl Stack {
    /// Run a cluster-specific command and check the device's default response.
    pub async fn local_command(&self, destination: &DeviceAndEndpoint, command: impl Into<LocalCommand>) -> Result<()> {
        let command = command.into();
        let cluster_id = u16::from(command.cluster());
        let command_id = command.id();
        debug!(
            "Sending {} to {} endpoint {}",
            command.name(),
            destination.network_address,
            destination.endpoint_id
        );

        let builder = FrameBuilder::local(command).disable_default_response(false);
        let frame = self
            .zcl_request(&destination.network_address, destination.endpoint_id, cluster_id, builder)
            .await?;

        match frame.command {
            ZclCommand::Global(GlobalCommand::DefaultResponse(response)) if response.status.is_success() => Ok(()),
            ZclCommand::Global(GlobalCommand::DefaultResponse(response)) => Err(StackError::CommandRejected {
                command: command_id,
                cluster: cluster_id,
                status: response.status,
            }),
            other => Err(StackError::UnexpectedResponse {
                details: format!("expected DefaultResponse, got {}", other.name()),
            }),
        }
    }

    /// Send a profile-wide command and return the device's reply frame.
    pub async fn global_command(
        &self,
        network_address: &str,
        cluster_id: u16,
        command: impl Into<GlobalCommand>,
    ) -> Result<ZclFrame> {
        let builder = FrameBuilder::global(command).disable_default_response(true);
        self.zcl_request(network_address, BROADCAST_ENDPOINT, cluster_id, builder)
            .await
    }

    pub async fn read_attributes(
        &self,
        network_address: &str,
        cluster_id: u16,
        attribute_ids: Vec<u16>,
    ) -> Result<ReadAttributesResponse> {
        let frame = self
            .global_command(network_address, cluster_id, ReadAttributesCommand { attribute_ids })
            .await?;
        match frame.command {
            ZclCommand::Global(GlobalCommand::ReadAttributesResponse(response)) => Ok(response),
            other => Err(unexpected("ReadAttributesResponse", &other)),
        }
    }

    /// Write attributes; any per-attribute failure fails the call.
    pub async fn write_attributes(
        &self,
        network_address: &str,
        cluster_id: u16,
        write_attribute_records: Vec<WriteAttributeRecord>,
    ) -> Result<WriteAttributesResponse> {
        let frame = self
            .global_command(
                network_address,
                cluster_id,
                WriteAttributesCommand { write_attribute_records },
            )
            .await?;
        match frame.command {
            ZclCommand::Global(GlobalCommand::WriteAttributesResponse(response)) => {
                response
                    .write_attribute_statuses
                    .iter()
                    .try_for_each(|s| s.status.to_result())?;
                Ok(response)
            }
            other => Err(unexpected("WriteAttributesResponse", &other)),
        }
    }

    pub async fn configure_reporting(
        &self,
        network_address: &str,
        cluster_id: u16,
        records: Vec<AttributeReportingConfigurationRecord>,
    ) -> Result<()> {
        let command = ConfigureReportingCommand {
            attribute_reporting_configuration_records: records,
        };
        let frame = self.global_command(network_address, cluster_id, command).await?;
        match frame.command {
            ZclCommand::Global(GlobalCommand::ConfigureReportingResponse(response)) => response.to_result(),
            other => Err(unexpected("ConfigureReportingResponse", &other)),
        }
    }

    /// Ask a device to send `cluster_id` reports from `source_endpoint` to the coordinator.
    pub async fn bind_to_coordinator(
        &self,
        ieee_address: &str,
        source_endpoint: u8,
        cluster_id: ClusterId,
        coordinator_endpoint: u8,
    ) -> Result<()> {
        let device = self
            .db
            .get_device(ieee_address)
            .ok_or_else(|| StackError::DeviceNotFound(ieee_address.to_string()))?;

        self.coordinator
            .bind(ZdoBindReq {
                dst_addr: device.network_address,
                src_address: device.ieee_address,
                src_endpoint: source_endpoint,
                cluster_id: cluster_id.into(),
                dst_addr_mode: AddrMode::Addr64Bit,
                dst_address: self.coordinator.network_configuration().ieee_address.clone(),
                dst_endpoint: coordinator_endpoint,
            })
            .await
    }

    async fn zcl_request(
        &self,
        network_address: &str,
        endpoint: u8,
        cluster_id: u16,
        builder: FrameBuilder,
    ) -> Result<ZclFrame> {
        let zcl = self.coordinator.zcl();
        let (trans_id, data) = zcl.encode(builder)?;

        let response = self
            .coordinator
            .data_request(AfDataRequest {
                dst_addr: network_address.to_string(),
                dst_endpoint: endpoint,
                src_endpoint: SOURCE_ENDPOINT,
                cluster_id,
                trans_id,
                options: AfDataRequestOptions::empty(),
                radius: RADIUS,
                data,
            })
            .await?;

        zcl.decode_frame(response.cluster_id, &response.data).inspect_err(|e| {
            error!("Unsupported data response message: {e}");
        })
    }
}

fn unexpected(expected: &str, actual: &ZclCommand) -> StackError {
    StackError::UnexpectedResponse {
        details: format!("expected {expected}, got {}", actual.name()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::tests::{af_incoming, known_device, start_stack};
    use crate::unp::{CommandType, Subsystem};
    use crate::zcl::cluster::On;
    use crate::zcl::ZclStatus;

    use super::*;

    #[tokio::test]
    async fn test_local_command_accepts_default_response() {
        let (stack, _events, mut radio, _handle) = start_stack(&[known_device()]).await;

        let call = tokio::spawn({
            let stack = Arc::clone(&stack);
            async move { stack.local_command(&DeviceAndEndpoint::new("0x1a2b", 1), On {}).await }
        });

        let sent = radio.expect(Subsystem::Af, 0x01).await;
        // dst 0x1a2b, dst ep 1, src ep 1, cluster 6
        assert_eq!(&sent.payload[..6], &[0x2b, 0x1a, 0x01, 0x01, 0x06, 0x00]);
        let tsn = sent.payload[6];
        // cluster specific, client to server, default response enabled
        assert_eq!(&sent.payload[10..], &[0x01, tsn, 0x01]);

        radio.send(CommandType::Srsp, Subsystem::Af, 0x01, &[0x00]).await;
        radio.send(CommandType::Areq, Subsystem::Af, 0x80, &[0x00, 0x01, tsn]).await;
        radio
            .send(CommandType::Areq, Subsystem::Af, 0x81, &af_incoming(6, &[0x18, tsn, 0x0b, 0x01, 0x00]))
            .await;

        call.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_local_command_rejected_status() {
        let (stack, _events, mut radio, _handle) = start_stack(&[known_device()]).await;

        let call = tokio::spawn({
            let stack = Arc::clone(&stack);
            async move { stack.local_command(&DeviceAndEndpoint::new("0x1a2b", 1), On {}).await }
        });

        let tsn = radio.expect(Subsystem::Af, 0x01).await.payload[6];
        radio.send(CommandType::Srsp, Subsystem::Af, 0x01, &[0x00]).await;
        radio.send(CommandType::Areq, Subsystem::Af, 0x80, &[0x00, 0x01, tsn]).await;
        // unsupported cluster command
        radio
            .send(CommandType::Areq, Subsystem::Af, 0x81, &af_incoming(6, &[0x18, tsn, 0x0b, 0x01, 0x81]))
            .await;

        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            StackError::CommandRejected {
                command: 1,
                cluster: 6,
                status: ZclStatus::UnsupClusterCommand
            }
        ));
    }

    #[tokio::test]
    async fn test_read_attributes_goes_to_all_endpoints() {
        let (stack, _events, mut radio, _handle) = start_stack(&[known_device()]).await;

        let call = tokio::spawn({
            let stack = Arc::clone(&stack);
            async move { stack.read_attributes("0x1a2b", 6, vec![0x0000]).await }
        });

        let sent = radio.expect(Subsystem::Af, 0x01).await;
        assert_eq!(sent.payload[2], BROADCAST_ENDPOINT);
        assert_eq!(sent.payload[8], RADIUS);
        let tsn = sent.payload[6];
        // global, default response disabled, read attributes 0x0000
        assert_eq!(&sent.payload[10..], &[0x10, tsn, 0x00, 0x00, 0x00]);

        radio.send(CommandType::Srsp, Subsystem::Af, 0x01, &[0x00]).await;
        radio.send(CommandType::Areq, Subsystem::Af, 0x80, &[0x00, 0x01, tsn]).await;
        // OnOff attribute 0x0000, success, boolean true
        radio
            .send(
                CommandType::Areq,
                Subsystem::Af,
                0x81,
                &af_incoming(6, &[0x18, tsn, 0x01, 0x00, 0x00, 0x00, 0x10, 0x01]),
            )
            .await;

        let response = call.await.unwrap().unwrap();
        assert_eq!(response.value(0x0000).and_then(|v| v.as_bool()), Some(true));
        assert_eq!(response.read_attribute_statuses[0].attribute_name, "OnOff");
    }

    #[tokio::test]
    async fn test_bind_to_unknown_device() {
        let (stack, _events, _radio, _handle) = start_stack(&[]).await;
        let err = stack
            .bind_to_coordinator("0x00124b0000000001", 1, ClusterId::OnOff, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StackError::DeviceNotFound(_)));
    }
}
