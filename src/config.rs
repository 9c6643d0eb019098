// MIT License - Copyright (c) 2026 Peter Wright
// Stack configuration and network parameter comparison

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StackError};

/// Baud rate used when none is configured.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Network parameters persisted in the radio's NV memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfiguration {
    /// Coordinator IEEE address, `0x` prefixed.
    pub ieee_address: String,
    pub pan_id: u16,
    #[serde(with = "ext_pan_id_hex")]
    pub ext_pan_id: u64,
    pub network_key: [u8; 16],
    pub channel: u8,
}

/// One field that differs between the desired and the flashed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub field: &'static str,
    pub expected: String,
    pub actual: String,
}

impl NetworkConfiguration {
    /// Fields where `actual` differs from `self`, in declaration order.
    pub fn diff(&self, actual: &NetworkConfiguration) -> Vec<FieldDiff> {
        let mut diffs = Vec::new();
        compare(&mut diffs, "ieee_address", &self.ieee_address, &actual.ieee_address);
        compare(
            &mut diffs,
            "pan_id",
            format!("{:#06x}", self.pan_id),
            format!("{:#06x}", actual.pan_id),
        );
        compare(
            &mut diffs,
            "ext_pan_id",
            hex::encode(self.ext_pan_id.to_le_bytes()),
            hex::encode(actual.ext_pan_id.to_le_bytes()),
        );
        // keys are compared but never printed
        if self.network_key != actual.network_key {
            diffs.push(FieldDiff {
                field: "network_key",
                expected: "<redacted>".into(),
                actual: "<redacted>".into(),
            });
        }
        compare(&mut diffs, "channel", self.channel.to_string(), actual.channel.to_string());
        diffs
    }

    pub fn matches(&self, actual: &NetworkConfiguration) -> bool {
        self.diff(actual).is_empty()
    }
}

fn compare(diffs: &mut Vec<FieldDiff>, field: &'static str, expected: impl ToString, actual: impl ToString) {
    let (expected, actual) = (expected.to_string(), actual.to_string());
    if expected != actual {
        diffs.push(FieldDiff {
            field,
            expected,
            actual,
        });
    }
}

mod ext_pan_id_hex {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value.to_le_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(text.trim_start_matches("0x")).map_err(D::Error::custom)?;
        let bytes: [u8; 8] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| D::Error::custom(format!("extended PAN id must be 8 bytes, got {}", b.len())))?;
        Ok(u64::from_le_bytes(bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Deadline and retry count for one kind of correlated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub retries: u32,
}

impl RetryPolicy {
    pub const fn new(timeout: Duration, retries: u32) -> Self {
        Self { timeout, retries }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Soft reset until `SysResetInd`.
    pub reset: RetryPolicy,
    /// ZDO descriptor, bind and unbind requests.
    pub zdo: RetryPolicy,
    /// AF data requests until the device answers.
    pub data: RetryPolicy,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            reset: RetryPolicy::new(Duration::from_secs(15), 5),
            zdo: RetryPolicy::new(Duration::from_secs(10), 3),
            data: RetryPolicy::new(Duration::from_secs(10), 3),
        }
    }
}

/// Everything the stack needs to bring up the coordinator.
#[derive(Debug, Clone)]
pub struct StackConfig {
    pub network: NetworkConfiguration,
    pub serial: SerialConfig,
    /// Status LED on the radio.
    pub led: bool,
    /// Open a 120 s join window after startup.
    pub permit_join: bool,
    /// Allow overwriting a radio whose NV configuration differs.
    pub settings_flash: bool,
    pub packet_capture: Option<PathBuf>,
    pub database_path: PathBuf,
    pub timeouts: Timeouts,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfiguration::default(),
            serial: SerialConfig::default(),
            led: true,
            permit_join: false,
            settings_flash: false,
            packet_capture: None,
            database_path: PathBuf::from("nodedb.json"),
            timeouts: Timeouts::default(),
        }
    }
}

impl StackConfig {
    pub fn builder() -> StackConfigBuilder {
        StackConfigBuilder::default()
    }

    /// Check that every required field is filled in.
    pub fn validate(&self) -> Result<()> {
        let network = &self.network;
        let required = |missing: bool, field: &str| {
            if missing {
                Err(StackError::InvalidConfig(format!("required: {field}")))
            } else {
                Ok(())
            }
        };

        required(network.ieee_address.is_empty(), "ieee_address")?;
        required(network.pan_id == 0, "pan_id")?;
        required(network.ext_pan_id == 0, "ext_pan_id")?;
        required(network.channel == 0, "channel")?;
        required(network.network_key == [0; 16], "network_key")?;
        required(self.serial.port.is_empty(), "serial.port")?;

        if !(11..=26).contains(&network.channel) {
            return Err(StackError::UnsupportedChannel(network.channel));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StackConfigBuilder {
    config: StackConfig,
}

impl StackConfigBuilder {
    pub fn network(mut self, network: NetworkConfiguration) -> Self {
        self.config.network = network;
        self
    }

    pub fn serial_port(mut self, port: impl Into<String>) -> Self {
        self.config.serial.port = port.into();
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.serial.baud_rate = baud_rate;
        self
    }

    pub fn led(mut self, enabled: bool) -> Self {
        self.config.led = enabled;
        self
    }

    pub fn permit_join(mut self, permit: bool) -> Self {
        self.config.permit_join = permit;
        self
    }

    pub fn settings_flash(mut self, allow: bool) -> Self {
        self.config.settings_flash = allow;
        self
    }

    pub fn packet_capture(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.packet_capture = Some(path.into());
        self
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.config.timeouts = timeouts;
        self
    }

    pub fn build(self) -> StackConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> NetworkConfiguration {
        NetworkConfiguration {
            ieee_address: "0x00124b0001020304".into(),
            pan_id: 0x1a62,
            ext_pan_id: 0xdddd_dddd_dddd_dddd,
            network_key: [1, 3, 5, 7, 9, 11, 13, 15, 0, 2, 4, 6, 8, 10, 12, 13],
            channel: 11,
        }
    }

    #[test]
    fn test_channel_only_difference_is_reported() {
        let desired = network();
        let flashed = NetworkConfiguration {
            channel: 15,
            ..network()
        };

        let diff = desired.diff(&flashed);
        assert_eq!(
            diff,
            vec![FieldDiff {
                field: "channel",
                expected: "11".into(),
                actual: "15".into(),
            }]
        );
        assert!(!desired.matches(&flashed));
        assert!(desired.matches(&network()));
    }

    #[test]
    fn test_network_key_is_redacted() {
        let flashed = NetworkConfiguration {
            network_key: [0xff; 16],
            ..network()
        };
        let diff = network().diff(&flashed);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].field, "network_key");
        assert_eq!(diff[0].actual, "<redacted>");
    }

    #[test]
    fn test_ext_pan_id_serializes_as_le_hex() {
        let mut config = network();
        config.ext_pan_id = 0x0102_0304_0506_0708;
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["ext_pan_id"], "0807060504030201");

        let back: NetworkConfiguration = serde_json::from_value(json).unwrap();
        assert_eq!(back.ext_pan_id, 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_validate_reports_first_missing_field() {
        let config = StackConfig::builder().build();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid configuration: required: ieee_address");

        let config = StackConfig::builder().network(network()).build();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid configuration: required: serial.port");
    }

    #[test]
    fn test_validate_rejects_channel_out_of_range() {
        let config = StackConfig::builder()
            .network(NetworkConfiguration {
                channel: 27,
                ..network()
            })
            .serial_port("/dev/ttyACM0")
            .build();
        assert!(matches!(config.validate(), Err(StackError::UnsupportedChannel(27))));
    }

    #[test]
    fn test_builder_defaults() {
        let config = StackConfig::builder().serial_port("/dev/ttyACM0").build();
        assert_eq!(config.serial.baud_rate, DEFAULT_BAUD_RATE);
        assert!(config.led);
        assert!(!config.settings_flash);
        assert_eq!(config.timeouts.reset, RetryPolicy::new(Duration::from_secs(15), 5));
    }
}
