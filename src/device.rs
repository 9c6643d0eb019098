// MIT License - Copyright (c) 2026 Peter Wright
// Interrogated device records

use serde::{Deserialize, Serialize};

use crate::error::{Result, StackError};
use crate::znp::LogicalType;

wire_enum! {
    /// Basic cluster power source, without the battery backup bit.
    pub enum PowerSource: u8 {
        Unknown = 0,
        MainsSinglePhase = 1,
        Mains2Phase = 2,
        Battery = 3,
        DcSource = 4,
        EmergencyMainsConstantlyPowered = 5,
        EmergencyMainsAndTransfer = 6,
    }
}

impl Default for PowerSource {
    fn default() -> Self {
        PowerSource::Unknown
    }
}

impl PowerSource {
    const BATTERY_BACKUP: u64 = 0x80;

    /// Interpret the raw attribute value.
    pub fn from_attribute(value: u64) -> Result<Self> {
        let unsupported = || StackError::UnsupportedVariant {
            kind: "power source",
            value: format!("{value:#04x}"),
        };
        let source = u8::try_from(value & !Self::BATTERY_BACKUP).map_err(|_| unsupported())?;
        PowerSource::try_from(source).map_err(|_| unsupported())
    }
}

/// An addressable sub-unit of a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: u8,
    pub profile_id: u16,
    pub device_id: u16,
    pub device_version: u8,
    /// Server clusters: what the endpoint accepts from us.
    pub in_cluster_list: Vec<u16>,
    /// Client clusters: what the endpoint sends to us.
    pub out_cluster_list: Vec<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Permanent 64-bit address, `0x` prefixed.
    pub ieee_address: String,
    /// Short address; changes whenever the device rejoins.
    pub network_address: String,
    pub manufacturer: String,
    pub manufacturer_id: u16,
    pub model: String,
    pub logical_type: LogicalType,
    pub main_powered: bool,
    pub power_source: PowerSource,
    pub endpoints: Vec<Endpoint>,
}

impl Device {
    pub fn endpoint(&self, id: u8) -> Option<&Endpoint> {
        self.endpoints.iter().find(|ep| ep.id == id)
    }

    /// First endpoint whose server side implements `cluster_id`.
    pub fn endpoint_with_cluster(&self, cluster_id: u16) -> Option<&Endpoint> {
        self.endpoints
            .iter()
            .find(|ep| ep.in_cluster_list.contains(&cluster_id))
    }
}

/// Where to send a command: network address plus endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAndEndpoint {
    pub network_address: String,
    pub endpoint_id: u8,
}

impl DeviceAndEndpoint {
    /// Endpoint 1, the only one on simple devices.
    pub const DEFAULT_ENDPOINT: u8 = 1;

    pub fn new(network_address: impl Into<String>, endpoint_id: u8) -> Self {
        Self {
            network_address: network_address.into(),
            endpoint_id,
        }
    }
}

impl From<&Device> for DeviceAndEndpoint {
    fn from(device: &Device) -> Self {
        DeviceAndEndpoint::new(&device.network_address, Self::DEFAULT_ENDPOINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_source_ignores_battery_backup() {
        assert_eq!(PowerSource::from_attribute(0x03).unwrap(), PowerSource::Battery);
        assert_eq!(PowerSource::from_attribute(0x81).unwrap(), PowerSource::MainsSinglePhase);
    }

    #[test]
    fn test_unknown_power_source_is_an_error() {
        let err = PowerSource::from_attribute(0x0f).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported power source: 0x0f");
    }

    #[test]
    fn test_device_round_trips_through_json() {
        let device = Device {
            ieee_address: "0x00158d0001020304".into(),
            network_address: "0x1a2b".into(),
            manufacturer: "IKEA of Sweden".into(),
            model: "TRADFRI bulb E27".into(),
            logical_type: LogicalType::Router,
            main_powered: true,
            power_source: PowerSource::MainsSinglePhase,
            endpoints: vec![Endpoint {
                id: 1,
                profile_id: 0x0104,
                device_id: 0x0100,
                device_version: 1,
                in_cluster_list: vec![0x0000, 0x0006],
                out_cluster_list: vec![0x0019],
            }],
            ..Default::default()
        };
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["logical_type"], "Router");
        assert_eq!(json["power_source"], "MainsSinglePhase");
        let back: Device = serde_json::from_value(json).unwrap();
        assert_eq!(back, device);
        assert_eq!(back.endpoint_with_cluster(0x0006).map(|ep| ep.id), Some(1));
    }
}
