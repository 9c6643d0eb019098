// MIT License - Copyright (c) 2026 Peter Wright
// Global (profile-wide) ZCL commands, identical on every cluster

use serde::Serialize;

use crate::codec::{self, CodecError, CodecResult, Decoder, Encoder, Wire};
use crate::error::{Result, StackError};

use super::attribute::{AttributeValue, ZclDataType};
use super::cluster::Cluster;
use super::ZclStatus;

wire_enum! {
    pub enum ReportDirection: u8 {
        AttributeReported = 0x00,
        AttributeReceived = 0x01,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct ReadAttributesCommand {
        pub attribute_ids: Vec<u16>,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct ReadAttributeStatus {
        pub attribute_name: String [transient],
        pub attribute_id: u16,
        pub status: ZclStatus,
        pub attribute: Option<AttributeValue> [when (status == 0)],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct ReadAttributesResponse {
        pub read_attribute_statuses: Vec<ReadAttributeStatus>,
    }
}

impl ReadAttributesResponse {
    /// Value of a successfully read attribute.
    pub fn value(&self, attribute_id: u16) -> Option<&AttributeValue> {
        self.read_attribute_statuses
            .iter()
            .find(|s| s.attribute_id == attribute_id)
            .and_then(|s| s.attribute.as_ref())
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct WriteAttributeRecord {
        pub attribute_name: String [transient],
        pub attribute_id: u16,
        pub attribute: AttributeValue,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct WriteAttributesCommand {
        pub write_attribute_records: Vec<WriteAttributeRecord>,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct WriteAttributesUndividedCommand {
        pub write_attribute_records: Vec<WriteAttributeRecord>,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct WriteAttributesNoResponseCommand {
        pub write_attribute_records: Vec<WriteAttributeRecord>,
    }
}

wire_struct! {
    /// When every write succeeded the device sends a single bare status.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct WriteAttributeStatus {
        pub status: ZclStatus,
        pub attribute_name: String [transient],
        pub attribute_id: Option<u16> [when (status != 0)],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct WriteAttributesResponse {
        pub write_attribute_statuses: Vec<WriteAttributeStatus>,
    }
}

/// One attribute reporting configuration.
///
/// The reportable change has no tag of its own: its type is
/// `attribute_data_type`, and it is only present for analog types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeReportingConfigurationRecord {
    pub direction: ReportDirection,
    pub attribute_name: String,
    pub attribute_id: u16,
    pub attribute_data_type: Option<ZclDataType>,
    pub minimum_reporting_interval: Option<u16>,
    pub maximum_reporting_interval: Option<u16>,
    pub reportable_change: Option<AttributeValue>,
    pub timeout_period: Option<u16>,
}

impl AttributeReportingConfigurationRecord {
    /// Ask the device to report `attribute_id` within the given bounds.
    pub fn reported(
        attribute_id: u16,
        data_type: ZclDataType,
        minimum_reporting_interval: u16,
        maximum_reporting_interval: u16,
        reportable_change: Option<AttributeValue>,
    ) -> Self {
        Self {
            direction: ReportDirection::AttributeReported,
            attribute_name: String::new(),
            attribute_id,
            attribute_data_type: Some(data_type),
            minimum_reporting_interval: Some(minimum_reporting_interval),
            maximum_reporting_interval: Some(maximum_reporting_interval),
            reportable_change,
            timeout_period: None,
        }
    }

    fn encode_body(&self, enc: &mut Encoder) -> CodecResult<()> {
        self.attribute_id.encode(enc)?;
        match self.direction {
            ReportDirection::AttributeReported => {
                let data_type = self.attribute_data_type.ok_or(CodecError::MissingField)?;
                data_type.encode(enc)?;
                self.minimum_reporting_interval
                    .ok_or(CodecError::MissingField)?
                    .encode(enc)?;
                self.maximum_reporting_interval
                    .ok_or(CodecError::MissingField)?
                    .encode(enc)?;
                if data_type.is_analog() {
                    let change = self.reportable_change.as_ref().ok_or(CodecError::MissingField)?;
                    if change.data_type() != data_type {
                        return Err(CodecError::UnsupportedVariant {
                            kind: "reportable change",
                            value: u8::from(change.data_type()).into(),
                        });
                    }
                    change.encode_value(enc)?;
                }
                Ok(())
            }
            ReportDirection::AttributeReceived => {
                self.timeout_period.ok_or(CodecError::MissingField)?.encode(enc)
            }
        }
    }

    fn decode_body(direction: ReportDirection, dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let attribute_id = u16::decode(dec)?;
        let mut record = Self {
            direction,
            attribute_name: String::new(),
            attribute_id,
            attribute_data_type: None,
            minimum_reporting_interval: None,
            maximum_reporting_interval: None,
            reportable_change: None,
            timeout_period: None,
        };
        match direction {
            ReportDirection::AttributeReported => {
                let data_type = ZclDataType::decode(dec)?;
                record.attribute_data_type = Some(data_type);
                record.minimum_reporting_interval = Some(u16::decode(dec)?);
                record.maximum_reporting_interval = Some(u16::decode(dec)?);
                if data_type.is_analog() {
                    record.reportable_change = Some(AttributeValue::decode_value(data_type, dec)?);
                }
            }
            ReportDirection::AttributeReceived => {
                record.timeout_period = Some(u16::decode(dec)?);
            }
        }
        Ok(record)
    }
}

impl Wire for AttributeReportingConfigurationRecord {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        self.direction.encode(enc)?;
        self.encode_body(enc)
    }

    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let direction = ReportDirection::decode(dec)?;
        Self::decode_body(direction, dec)
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct ConfigureReportingCommand {
        pub attribute_reporting_configuration_records: Vec<AttributeReportingConfigurationRecord>,
    }
}

wire_struct! {
    /// A single bare success status means every record was accepted.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct AttributeStatusRecord {
        pub status: ZclStatus,
        pub direction: Option<ReportDirection> [when (status != 0)],
        pub attribute_name: String [transient],
        pub attribute_id: Option<u16> [when (status != 0)],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct ConfigureReportingResponse {
        pub attribute_status_records: Vec<AttributeStatusRecord>,
    }
}

impl ConfigureReportingResponse {
    /// First failing status, if any.
    pub fn to_result(&self) -> Result<()> {
        self.attribute_status_records
            .iter()
            .try_for_each(|record| record.status.to_result())
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct AttributeRecord {
        pub direction: ReportDirection,
        pub attribute_name: String [transient],
        pub attribute_id: u16,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct ReadReportingConfigurationCommand {
        pub attribute_records: Vec<AttributeRecord>,
    }
}

/// Reporting configuration as returned by the device; the body is absent
/// unless `status` is success.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeReportingConfigurationResponseRecord {
    pub status: ZclStatus,
    pub direction: ReportDirection,
    pub attribute_id: u16,
    pub configuration: Option<AttributeReportingConfigurationRecord>,
}

impl Wire for AttributeReportingConfigurationResponseRecord {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        self.status.encode(enc)?;
        self.direction.encode(enc)?;
        match (&self.configuration, self.status) {
            (Some(config), ZclStatus::Success) => config.encode_body(enc),
            (None, ZclStatus::Success) => Err(CodecError::MissingField),
            _ => self.attribute_id.encode(enc),
        }
    }

    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let status = ZclStatus::decode(dec)?;
        let direction = ReportDirection::decode(dec)?;
        if status != ZclStatus::Success {
            return Ok(Self {
                status,
                direction,
                attribute_id: u16::decode(dec)?,
                configuration: None,
            });
        }
        let config = AttributeReportingConfigurationRecord::decode_body(direction, dec)?;
        Ok(Self {
            status,
            direction,
            attribute_id: config.attribute_id,
            configuration: Some(config),
        })
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct ReadReportingConfigurationResponse {
        pub attribute_reporting_configuration_response_records: Vec<AttributeReportingConfigurationResponseRecord>,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct AttributeReport {
        pub attribute_name: String [transient],
        pub attribute_id: u16,
        pub attribute: AttributeValue,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct ReportAttributesCommand {
        pub attribute_reports: Vec<AttributeReport>,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct DefaultResponseCommand {
        pub command_id: u8,
        pub status: ZclStatus,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct DiscoverAttributesCommand {
        pub start_attribute_id: u16,
        pub maximum_attribute_identifiers: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct AttributeInformation {
        pub attribute_name: String [transient],
        pub attribute_id: u16,
        pub attribute_data_type: ZclDataType,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct DiscoverAttributesResponse {
        pub discovery_complete: bool,
        pub attribute_informations: Vec<AttributeInformation>,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct AttributeSelector {
        pub attribute_name: String [transient],
        pub attribute_id: u16,
        pub selector: Vec<u16> [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct ReadAttributesStructuredCommand {
        pub attribute_selectors: Vec<AttributeSelector>,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct WriteAttributeStructuredRecord {
        pub attribute_name: String [transient],
        pub attribute_id: u16,
        pub selector: Vec<u16> [size 1],
        pub attribute: AttributeValue,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct WriteAttributesStructuredCommand {
        pub write_attribute_structured_records: Vec<WriteAttributeStructuredRecord>,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct WriteAttributeStatusRecord {
        pub status: ZclStatus,
        pub attribute_name: String [transient],
        pub attribute_id: Option<u16> [when (status != 0)],
        pub selector: Option<Vec<u16>> [when (status != 0) size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct WriteAttributesStructuredResponse {
        pub write_attribute_status_records: Vec<WriteAttributeStatusRecord>,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct DiscoverCommandsReceivedCommand {
        pub start_command_id: u8,
        pub maximum_command_identifiers: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct DiscoverCommandsReceivedResponse {
        pub discovery_complete: bool,
        pub command_identifiers: Vec<u8>,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct DiscoverCommandsGeneratedCommand {
        pub start_command_id: u8,
        pub maximum_command_identifiers: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct DiscoverCommandsGeneratedResponse {
        pub discovery_complete: bool,
        pub command_identifiers: Vec<u8>,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct DiscoverAttributesExtendedCommand {
        pub start_attribute_id: u16,
        pub maximum_attribute_identifiers: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct ExtendedAttributeInformation {
        pub attribute_name: String [transient],
        pub attribute_id: u16,
        pub attribute_data_type: ZclDataType,
        bits(u8) {
            pub readable: bool = 0b0000_0001,
            pub writeable: bool = 0b0000_0010,
            pub reportable: bool = 0b0000_0100,
        },
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct DiscoverAttributesExtendedResponse {
        pub discovery_complete: bool,
        pub extended_attribute_informations: Vec<ExtendedAttributeInformation>,
    }
}

macro_rules! global_commands {
    ($( $id:literal => $variant:ident($record:ident) ),+ $(,)?) => {
        /// A profile-wide command, resolved by command id alone.
        #[derive(Debug, Clone, PartialEq, Serialize)]
        #[serde(tag = "command", content = "fields")]
        pub enum GlobalCommand {
            $( $variant($record), )+
        }

        impl GlobalCommand {
            pub fn id(&self) -> u8 {
                match self {
                    $( GlobalCommand::$variant(_) => $id, )+
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $( GlobalCommand::$variant(_) => stringify!($variant), )+
                }
            }

            pub fn decode(command_id: u8, payload: &[u8]) -> Result<Self> {
                match command_id {
                    $( $id => Ok(GlobalCommand::$variant(codec::decode(payload)?)), )+
                    _ => Err(StackError::UnknownGlobalCommand(command_id)),
                }
            }

            pub fn encode_payload(&self) -> CodecResult<Vec<u8>> {
                match self {
                    $( GlobalCommand::$variant(inner) => codec::encode(inner), )+
                }
            }
        }

        $(
            impl From<$record> for GlobalCommand {
                fn from(value: $record) -> Self {
                    GlobalCommand::$variant(value)
                }
            }
        )+
    };
}

global_commands! {
    0x00 => ReadAttributes(ReadAttributesCommand),
    0x01 => ReadAttributesResponse(ReadAttributesResponse),
    0x02 => WriteAttributes(WriteAttributesCommand),
    0x03 => WriteAttributesUndivided(WriteAttributesUndividedCommand),
    0x04 => WriteAttributesResponse(WriteAttributesResponse),
    0x05 => WriteAttributesNoResponse(WriteAttributesNoResponseCommand),
    0x06 => ConfigureReporting(ConfigureReportingCommand),
    0x07 => ConfigureReportingResponse(ConfigureReportingResponse),
    0x08 => ReadReportingConfiguration(ReadReportingConfigurationCommand),
    0x09 => ReadReportingConfigurationResponse(ReadReportingConfigurationResponse),
    0x0a => ReportAttributes(ReportAttributesCommand),
    0x0b => DefaultResponse(DefaultResponseCommand),
    0x0c => DiscoverAttributes(DiscoverAttributesCommand),
    0x0d => DiscoverAttributesResponse(DiscoverAttributesResponse),
    0x0e => ReadAttributesStructured(ReadAttributesStructuredCommand),
    0x0f => WriteAttributesStructured(WriteAttributesStructuredCommand),
    0x10 => WriteAttributesStructuredResponse(WriteAttributesStructuredResponse),
    0x11 => DiscoverCommandsReceived(DiscoverCommandsReceivedCommand),
    0x12 => DiscoverCommandsReceivedResponse(DiscoverCommandsReceivedResponse),
    0x13 => DiscoverCommandsGenerated(DiscoverCommandsGeneratedCommand),
    0x14 => DiscoverCommandsGeneratedResponse(DiscoverCommandsGeneratedResponse),
    0x15 => DiscoverAttributesExtended(DiscoverAttributesExtendedCommand),
    0x16 => DiscoverAttributesExtendedResponse(DiscoverAttributesExtendedResponse),
}

impl GlobalCommand {
    /// Fill in attribute names from the cluster's attribute table.
    pub fn resolve_names(&mut self, cluster: &Cluster) {
        let name = |id: u16| {
            cluster
                .attribute(id)
                .map(|a| a.name.to_string())
                .unwrap_or_default()
        };
        match self {
            GlobalCommand::ReadAttributesResponse(rsp) => {
                for s in &mut rsp.read_attribute_statuses {
                    s.attribute_name = name(s.attribute_id);
                }
            }
            GlobalCommand::ReportAttributes(cmd) => {
                for r in &mut cmd.attribute_reports {
                    r.attribute_name = name(r.attribute_id);
                }
            }
            GlobalCommand::WriteAttributes(WriteAttributesCommand { write_attribute_records })
            | GlobalCommand::WriteAttributesUndivided(WriteAttributesUndividedCommand {
                write_attribute_records,
            })
            | GlobalCommand::WriteAttributesNoResponse(WriteAttributesNoResponseCommand {
                write_attribute_records,
            }) => {
                for r in write_attribute_records {
                    r.attribute_name = name(r.attribute_id);
                }
            }
            GlobalCommand::WriteAttributesResponse(rsp) => {
                for s in &mut rsp.write_attribute_statuses {
                    if let Some(id) = s.attribute_id {
                        s.attribute_name = name(id);
                    }
                }
            }
            GlobalCommand::ConfigureReporting(cmd) => {
                for r in &mut cmd.attribute_reporting_configuration_records {
                    r.attribute_name = name(r.attribute_id);
                }
            }
            GlobalCommand::ConfigureReportingResponse(rsp) => {
                for r in &mut rsp.attribute_status_records {
                    if let Some(id) = r.attribute_id {
                        r.attribute_name = name(id);
                    }
                }
            }
            GlobalCommand::DiscoverAttributesResponse(rsp) => {
                for info in &mut rsp.attribute_informations {
                    info.attribute_name = name(info.attribute_id);
                }
            }
            GlobalCommand::DiscoverAttributesExtendedResponse(rsp) => {
                for info in &mut rsp.extended_attribute_informations {
                    info.attribute_name = name(info.attribute_id);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_report_attributes() {
        let cmd = GlobalCommand::decode(0x0a, &hex!("0000 10 01 0500 42 03 616263")).unwrap();
        let GlobalCommand::ReportAttributes(report) = &cmd else {
            panic!("unexpected command {cmd:?}");
        };
        assert_eq!(cmd.name(), "ReportAttributes");
        assert_eq!(report.attribute_reports.len(), 2);
        assert_eq!(report.attribute_reports[0].attribute, AttributeValue::Boolean(true));
        assert_eq!(report.attribute_reports[1].attribute_id, 5);
        assert_eq!(report.attribute_reports[1].attribute.as_str(), Some("abc"));
    }

    #[test]
    fn test_read_attributes_response_skips_value_on_failure() {
        let rsp: ReadAttributesResponse = codec::decode(&hex!("0400 00 42 02 6869 0700 86")).unwrap();
        assert_eq!(rsp.read_attribute_statuses.len(), 2);
        assert_eq!(rsp.value(4).and_then(AttributeValue::as_str), Some("hi"));
        assert_eq!(rsp.read_attribute_statuses[1].status, ZclStatus::UnsupportedAttribute);
        assert_eq!(rsp.value(7), None);
    }

    #[test]
    fn test_write_response_all_success_is_single_byte() {
        let rsp: WriteAttributesResponse = codec::decode(&[0x00]).unwrap();
        assert_eq!(rsp.write_attribute_statuses.len(), 1);
        assert_eq!(rsp.write_attribute_statuses[0].attribute_id, None);
    }

    #[test]
    fn test_configure_reporting_layout() {
        let cmd = ConfigureReportingCommand {
            attribute_reporting_configuration_records: vec![
                AttributeReportingConfigurationRecord::reported(
                    0x0000,
                    ZclDataType::Int16,
                    10,
                    300,
                    Some(AttributeValue::Int16(50)),
                ),
                AttributeReportingConfigurationRecord::reported(0x0000, ZclDataType::Boolean, 0, 600, None),
            ],
        };
        let bytes = codec::encode(&cmd).unwrap();
        assert_eq!(
            bytes,
            hex!("00 0000 29 0a00 2c01 3200  00 0000 10 0000 5802").to_vec()
        );
        let back: ConfigureReportingCommand = codec::decode(&bytes).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn test_configure_reporting_response_failure() {
        let rsp: ConfigureReportingResponse = codec::decode(&hex!("8c 00 2100")).unwrap();
        let record = &rsp.attribute_status_records[0];
        assert_eq!(record.direction, Some(ReportDirection::AttributeReported));
        assert_eq!(record.attribute_id, Some(0x0021));
        assert!(matches!(
            rsp.to_result(),
            Err(StackError::ZclStatus(ZclStatus::UnreportableAttribute))
        ));
    }

    #[test]
    fn test_read_reporting_configuration_response() {
        let rsp: ReadReportingConfigurationResponse =
            codec::decode(&hex!("00 01 0000 1e00  86 00 0500")).unwrap();
        let records = &rsp.attribute_reporting_configuration_response_records;
        assert_eq!(records[0].configuration.as_ref().and_then(|c| c.timeout_period), Some(30));
        assert_eq!(records[1].status, ZclStatus::UnsupportedAttribute);
        assert_eq!(records[1].attribute_id, 5);
    }

    #[test]
    fn test_discover_extended_access_bits() {
        let rsp: DiscoverAttributesExtendedResponse = codec::decode(&hex!("01 0000 10 05")).unwrap();
        let info = &rsp.extended_attribute_informations[0];
        assert!(rsp.discovery_complete);
        assert!(info.readable && !info.writeable && info.reportable);
    }

    #[test]
    fn test_unknown_global_command() {
        assert!(matches!(
            GlobalCommand::decode(0x17, &[]),
            Err(StackError::UnknownGlobalCommand(0x17))
        ));
    }
}
