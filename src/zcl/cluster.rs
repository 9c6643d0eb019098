// MIT License - Copyright (c) 2026 Peter Wright
// Cluster library: attribute tables and cluster-specific commands

use std::time::Duration;

use bitflags::bitflags;
use serde::Serialize;

use crate::codec::{self, CodecResult};
use crate::error::{Result, StackError};

use super::attribute::ZclDataType;
use super::Direction;

wire_enum! {
    pub enum ClusterId: u16 {
        Basic = 0x0000,
        PowerConfiguration = 0x0001,
        DeviceTemperatureConfiguration = 0x0002,
        Identify = 0x0003,
        Scenes = 0x0005,
        OnOff = 0x0006,
        LevelControl = 0x0008,
        MultistateInput = 0x0012,
        Ota = 0x0019,
        WindowCovering = 0x0102,
        ColorControl = 0x0300,
        IasZone = 0x0500,
    }
}

/// Attribute ids referenced outside the tables.
pub mod attr {
    pub const BASIC_MANUFACTURER_NAME: u16 = 0x0004;
    pub const BASIC_MODEL_ID: u16 = 0x0005;
    pub const BASIC_POWER_SOURCE: u16 = 0x0007;
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Access: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        const REPORTABLE = 0x04;
        const SCENE = 0x08;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub id: u16,
    pub name: &'static str,
    pub data_type: ZclDataType,
    pub access: Access,
}

#[derive(Debug)]
pub struct Cluster {
    pub id: ClusterId,
    pub name: &'static str,
    pub attributes: &'static [AttributeDescriptor],
}

impl Cluster {
    pub fn attribute(&self, id: u16) -> Option<&'static AttributeDescriptor> {
        self.attributes.iter().find(|a| a.id == id)
    }
}

/// Look up a cluster by raw id.
pub fn find(id: u16) -> Option<&'static Cluster> {
    CLUSTERS.iter().find(|c| u16::from(c.id) == id)
}

/// Zigbee transition times are in units of 100 ms.
pub fn transition_time_from(duration: Duration) -> u16 {
    u16::try_from(duration.as_millis() / 100).unwrap_or(u16::MAX)
}

macro_rules! attributes {
    ($( $id:literal => $name:literal : $ty:ident [$($access:ident)|+] ),* $(,)?) => {
        &[
            $(
                AttributeDescriptor {
                    id: $id,
                    name: $name,
                    data_type: ZclDataType::$ty,
                    access: Access::empty() $(.union(Access::$access))+,
                },
            )*
        ]
    };
}

static CLUSTERS: [Cluster; 12] = [
    Cluster {
        id: ClusterId::Basic,
        name: "Basic",
        attributes: attributes! {
            0x0000 => "ZLibraryVersion": Uint8 [READ],
            0x0001 => "ApplicationVersion": Uint8 [READ],
            0x0002 => "StackVersion": Uint8 [READ],
            0x0003 => "HWVersion": Uint8 [READ],
            0x0004 => "ManufacturerName": CharStr [READ],
            0x0005 => "ModelIdentifier": CharStr [READ],
            0x0006 => "DateCode": CharStr [READ],
            0x0007 => "PowerSource": Enum8 [READ],
            0x0010 => "LocationDescription": CharStr [READ | WRITE],
            0x0011 => "PhysicalEnvironment": Enum8 [READ | WRITE],
            0x0012 => "DeviceEnabled": Boolean [READ | WRITE],
            0x0013 => "AlarmMask": Bitmap8 [READ | WRITE],
            0x0014 => "DisableLocalConfig": Bitmap8 [READ | WRITE],
            0x4000 => "SWBuildID": CharStr [READ],
        },
    },
    Cluster {
        id: ClusterId::PowerConfiguration,
        name: "PowerConfiguration",
        attributes: attributes! {
            0x0000 => "MainsVoltage": Uint16 [READ],
            0x0001 => "MainsFrequency": Uint8 [READ],
            0x0010 => "MainsAlarmMask": Bitmap8 [READ | WRITE],
            0x0011 => "MainsVoltageMinThreshold": Uint16 [READ | WRITE],
            0x0012 => "MainsVoltageMaxThreshold": Uint16 [READ | WRITE],
            0x0013 => "MainsVoltageDwellTripPoint": Uint16 [READ | WRITE],
            0x0020 => "BatteryVoltage": Uint8 [READ],
            0x0021 => "BatteryPercentageRemaining": Uint8 [READ | REPORTABLE],
            0x0030 => "BatteryManufacturer": CharStr [READ | WRITE],
            0x0031 => "BatterySize": Enum8 [READ | WRITE],
            0x0032 => "BatteryAHrRating": Uint16 [READ | WRITE],
            0x0033 => "BatteryQuantity": Uint8 [READ | WRITE],
            0x0034 => "BatteryRatedVoltage": Uint8 [READ | WRITE],
            0x0035 => "BatteryAlarmMask": Bitmap8 [READ | WRITE],
            0x0036 => "BatteryVoltageMinThreshold": Uint8 [READ | WRITE],
            0x0037 => "BatteryVoltageThreshold1": Uint8 [READ | WRITE],
            0x0038 => "BatteryVoltageThreshold2": Uint8 [READ | WRITE],
            0x0039 => "BatteryVoltageThreshold3": Uint8 [READ | WRITE],
            0x003a => "BatteryPercentageMinThreshold": Uint8 [READ | WRITE],
            0x003b => "BatteryPercentageThreshold1": Uint8 [READ | WRITE],
            0x003c => "BatteryPercentageThreshold2": Uint8 [READ | WRITE],
            0x003d => "BatteryPercentageThreshold3": Uint8 [READ | WRITE],
            0x003e => "BatteryAlarmState": Bitmap32 [READ],
        },
    },
    Cluster {
        id: ClusterId::DeviceTemperatureConfiguration,
        name: "DeviceTemperatureConfiguration",
        attributes: attributes! {
            0x0000 => "CurrentTemperature": Int16 [READ],
            0x0001 => "MinTempExperienced": Int16 [READ],
            0x0002 => "MaxTempExperienced": Int16 [READ],
            0x0003 => "OverTempTotalDwell": Int16 [READ],
            0x0010 => "DeviceTempAlarmMask": Bitmap16 [READ | WRITE],
            0x0011 => "LowTempThreshold": Int16 [READ | WRITE],
            0x0012 => "HighTempThreshold": Int16 [READ | WRITE],
            0x0013 => "LowTempDwellTripPoint": Uint24 [READ | WRITE],
            0x0014 => "HighTempDwellTripPoint": Uint24 [READ | WRITE],
        },
    },
    Cluster {
        id: ClusterId::Identify,
        name: "Identify",
        attributes: attributes! {
            0x0000 => "IdentifyTime": Uint16 [READ | WRITE],
        },
    },
    Cluster {
        id: ClusterId::Scenes,
        name: "Scenes",
        attributes: &[],
    },
    Cluster {
        id: ClusterId::OnOff,
        name: "OnOff",
        attributes: attributes! {
            0x0000 => "OnOff": Boolean [READ | REPORTABLE | SCENE],
            0x4000 => "GlobalSceneControl": Boolean [READ],
            0x4001 => "OnTime": Uint16 [READ | WRITE],
            0x4002 => "OffWaitTime": Uint16 [READ | WRITE],
        },
    },
    Cluster {
        id: ClusterId::LevelControl,
        name: "LevelControl",
        attributes: attributes! {
            0x0000 => "CurrentLevel": Uint8 [READ | REPORTABLE],
            0x0001 => "RemainingTime": Uint16 [READ],
            0x0010 => "OnOffTransitionTime": Uint16 [READ | WRITE],
            0x0011 => "OnLevel": Uint8 [READ | WRITE],
            0x0012 => "OnTransitionTime": Uint16 [READ | WRITE],
            0x0013 => "OffTransitionTime": Uint16 [READ | WRITE],
            0x0014 => "DefaultMoveRate": Uint16 [READ | WRITE],
        },
    },
    Cluster {
        id: ClusterId::MultistateInput,
        name: "MultistateInput",
        attributes: attributes! {
            0x000e => "StateText": Array [READ | WRITE],
            0x001c => "Description": CharStr [READ | WRITE],
            0x004a => "NumberOfStates": Uint16 [READ | WRITE],
            0x0051 => "OutOfService": Boolean [READ | WRITE],
            0x0055 => "PresentValue": Uint16 [READ | WRITE],
            0x0067 => "Reliability": Enum8 [READ | WRITE],
            0x006f => "StatusFlags": Bitmap8 [READ],
            0x0100 => "ApplicationType": Uint32 [READ],
        },
    },
    Cluster {
        id: ClusterId::Ota,
        name: "OTA",
        attributes: attributes! {
            0x0000 => "UpgradeServerID": IeeeAddr [READ],
            0x0001 => "FileOffset": Uint32 [READ],
            0x0002 => "CurrentFileVersion": Uint32 [READ],
            0x0003 => "CurrentZigBeeStackVersion": Uint16 [READ],
            0x0004 => "DownloadedFileVersion": Uint32 [READ],
            0x0005 => "DownloadedZigBeeStackVersion": Uint16 [READ],
            0x0006 => "ImageUpgradeStatus": Enum8 [READ],
            0x0007 => "ManufacturerID": Uint16 [READ],
            0x0008 => "ImageTypeID": Uint16 [READ],
            0x0009 => "MinimumBlockPeriod": Uint16 [READ],
            0x000a => "ImageStamp": Uint32 [READ],
        },
    },
    Cluster {
        id: ClusterId::WindowCovering,
        name: "WindowCovering",
        attributes: attributes! {
            0x0008 => "CurrentPositionLiftPercentage": Uint8 [READ | REPORTABLE | SCENE],
            0x0009 => "CurrentPositionTiltPercentage": Uint8 [READ | REPORTABLE | SCENE],
        },
    },
    Cluster {
        id: ClusterId::ColorControl,
        name: "ColorControl",
        attributes: attributes! {
            0x0003 => "CurrentX": Uint16 [READ | REPORTABLE | SCENE],
            0x0004 => "CurrentY": Uint16 [READ | REPORTABLE | SCENE],
            0x0007 => "ColorTemperatureMireds": Uint16 [READ | REPORTABLE],
            0x0008 => "ColorMode": Enum8 [READ],
        },
    },
    Cluster {
        id: ClusterId::IasZone,
        name: "IASZone",
        attributes: attributes! {
            0x0000 => "ZoneState": Enum8 [READ],
            0x0001 => "ZoneType": Enum16 [READ],
            0x0002 => "ZoneStatus": Bitmap16 [READ],
            0x0010 => "IASCIEAddress": IeeeAddr [READ | WRITE],
            0x0011 => "ZoneID": Uint8 [READ],
        },
    },
];

// ---- Identify ----

wire_enum! {
    pub enum EffectId: u8 {
        /// Light is turned on/off once.
        Blink = 0x00,
        /// On/off over 1 second, repeated 15 times.
        Breathe = 0x01,
        /// Green for 1 second; non-colour lights flash twice.
        Okay = 0x02,
        /// Orange for 8 seconds; non-colour lights go bright then dim.
        ChannelChange = 0x0b,
        /// Finish the current sequence, then stop.
        FinishEffect = 0xfe,
        StopEffect = 0xff,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct ResetToFactoryDefaults {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct Identify {
        pub identify_time: u16,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct IdentifyQuery {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct TriggerEffect {
        pub effect: EffectId,
        /// Usually zero.
        pub effect_variant: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct IdentifyQueryResponse {
        pub timeout: u16,
    }
}

// ---- Scenes ----

wire_struct! {
    /// Vendor command sent by IKEA remotes for the arrow buttons.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct ScenesArrowCommand {
        pub data: [u8; 4],
    }
}

impl ScenesArrowCommand {
    pub fn is_left(&self) -> bool {
        self.data[0] == 0x01
    }
}

// ---- OnOff ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct Off {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct On {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct Toggle {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct OffWithEffect {
        pub effect_identifier: u8,
        pub effect_variant: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct OnWithRecallGlobalScene {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct OnWithTimedOff {
        pub on_off_control: u8,
        pub on_time: u16,
        pub off_wait_time: u16,
    }
}

// ---- LevelControl ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct MoveToLevel {
        /// 0x00..=0xfe
        pub level: u8,
        pub transition_time: u16,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct Move {
        pub move_mode: u8,
        pub rate: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct Step {
        pub step_mode: u8,
        pub step_size: u8,
        pub transition_time: u16,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct Stop {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct MoveToLevelWithOnOff {
        pub level: u8,
        pub transition_time: u16,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct MoveWithOnOff {
        pub move_mode: u8,
        pub rate: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct StepWithOnOff {
        pub step_mode: u8,
        pub step_size: u8,
        pub transition_time: u16,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct StopWithOnOff {}
}

// ---- ColorControl ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct MoveToColor {
        pub x: u16,
        pub y: u16,
        pub transition_time: u16,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct MoveToColorTemperature {
        /// Valid range 0x0000..=0xfeff.
        pub color_temperature_mireds: u16,
        pub transition_time: u16,
    }
}

// ---- WindowCovering ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct WindowCoveringUp {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct WindowCoveringDown {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct WindowCoveringStop {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct WindowCoveringGoToLiftPercentage {
        /// 0..=100
        pub value: u8,
    }
}

// ---- IAS Zone ----

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ZoneStatus: u16 {
        const ALARM1 = 0x0001;
        const ALARM2 = 0x0002;
        const TAMPER = 0x0004;
        const BATTERY = 0x0008;
        const SUPERVISION_REPORTS = 0x0010;
        const RESTORE_REPORTS = 0x0020;
        const TROUBLE = 0x0040;
        const AC_MAINS = 0x0080;
        const TEST = 0x0100;
        const BATTERY_DEFECT = 0x0200;
    }
}

wire_bitflags!(ZoneStatus: u16);

impl Serialize for ZoneStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.bits())
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct ZoneStatusChangeNotification {
        pub zone_status: ZoneStatus,
        /// Always zero.
        pub extended_status: u8,
        pub zone_id: u8,
        pub delay: u16,
    }
}

macro_rules! local_commands {
    ($( $cluster:ident { $( $dir:ident $id:literal => $cmd:ident ),* $(,)? } )+) => {
        /// A cluster-specific command, resolved by (cluster, direction, id).
        #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
        #[serde(tag = "command", content = "fields")]
        pub enum LocalCommand {
            $( $( $cmd($cmd), )* )+
        }

        impl LocalCommand {
            pub fn cluster(&self) -> ClusterId {
                match self {
                    $( $( LocalCommand::$cmd(_) => ClusterId::$cluster, )* )+
                }
            }

            pub fn id(&self) -> u8 {
                match self {
                    $( $( LocalCommand::$cmd(_) => $id, )* )+
                }
            }

            pub fn direction(&self) -> Direction {
                match self {
                    $( $( LocalCommand::$cmd(_) => Direction::$dir, )* )+
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $( $( LocalCommand::$cmd(_) => stringify!($cmd), )* )+
                }
            }

            pub fn decode(cluster_id: u16, direction: Direction, command_id: u8, payload: &[u8]) -> Result<Self> {
                let cluster = ClusterId::try_from(cluster_id)
                    .map_err(|_| StackError::UnknownCluster(cluster_id))?;
                match (cluster, direction, command_id) {
                    $( $(
                        (ClusterId::$cluster, Direction::$dir, $id) => {
                            Ok(LocalCommand::$cmd(codec::decode(payload)?))
                        }
                    )* )+
                    _ => Err(StackError::UnknownCommand {
                        cluster: cluster_id,
                        direction,
                        command: command_id,
                    }),
                }
            }

            pub fn encode_payload(&self) -> CodecResult<Vec<u8>> {
                match self {
                    $( $( LocalCommand::$cmd(inner) => codec::encode(inner), )* )+
                }
            }
        }

        $( $(
            impl From<$cmd> for LocalCommand {
                fn from(value: $cmd) -> Self {
                    LocalCommand::$cmd(value)
                }
            }
        )* )+
    };
}

local_commands! {
    Basic {
        ClientToServer 0x00 => ResetToFactoryDefaults,
    }
    Identify {
        ClientToServer 0x00 => Identify,
        ClientToServer 0x01 => IdentifyQuery,
        ClientToServer 0x40 => TriggerEffect,
        ServerToClient 0x00 => IdentifyQueryResponse,
    }
    Scenes {
        ClientToServer 0x07 => ScenesArrowCommand,
    }
    OnOff {
        ClientToServer 0x00 => Off,
        ClientToServer 0x01 => On,
        ClientToServer 0x02 => Toggle,
        ClientToServer 0x40 => OffWithEffect,
        ClientToServer 0x41 => OnWithRecallGlobalScene,
        ClientToServer 0x42 => OnWithTimedOff,
    }
    LevelControl {
        ClientToServer 0x00 => MoveToLevel,
        ClientToServer 0x01 => Move,
        ClientToServer 0x02 => Step,
        ClientToServer 0x03 => Stop,
        ClientToServer 0x04 => MoveToLevelWithOnOff,
        ClientToServer 0x05 => MoveWithOnOff,
        ClientToServer 0x06 => StepWithOnOff,
        ClientToServer 0x07 => StopWithOnOff,
    }
    ColorControl {
        ClientToServer 0x07 => MoveToColor,
        ClientToServer 0x0a => MoveToColorTemperature,
    }
    WindowCovering {
        ClientToServer 0x00 => WindowCoveringUp,
        ClientToServer 0x01 => WindowCoveringDown,
        ClientToServer 0x02 => WindowCoveringStop,
        ClientToServer 0x05 => WindowCoveringGoToLiftPercentage,
    }
    IasZone {
        ServerToClient 0x00 => ZoneStatusChangeNotification,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_off_has_no_payload() {
        let cmd = LocalCommand::decode(0x0006, Direction::ClientToServer, 0x00, &[]).unwrap();
        assert_eq!(cmd, LocalCommand::Off(Off {}));
        assert_eq!(cmd.name(), "Off");
        assert!(cmd.encode_payload().unwrap().is_empty());
    }

    #[test]
    fn test_direction_selects_table() {
        let cmd = LocalCommand::decode(0x0003, Direction::ServerToClient, 0x00, &[0x0a, 0x00]).unwrap();
        assert_eq!(cmd, LocalCommand::IdentifyQueryResponse(IdentifyQueryResponse { timeout: 10 }));

        let cmd = LocalCommand::decode(0x0003, Direction::ClientToServer, 0x00, &[0x0a, 0x00]).unwrap();
        assert_eq!(cmd, LocalCommand::Identify(Identify { identify_time: 10 }));
    }

    #[test]
    fn test_unknown_triple_names_all_parts() {
        let err = LocalCommand::decode(0x0006, Direction::ServerToClient, 0x00, &[]).unwrap_err();
        assert_eq!(err.to_string(), "cluster 6 doesn't support local ServerToClient cmd 0");
    }

    #[test]
    fn test_unknown_cluster() {
        let err = LocalCommand::decode(0x0402, Direction::ClientToServer, 0x00, &[]).unwrap_err();
        assert!(matches!(err, StackError::UnknownCluster(0x0402)));
    }

    #[test]
    fn test_command_metadata() {
        let cmd: LocalCommand = MoveToLevel { level: 0x80, transition_time: 10 }.into();
        assert_eq!(cmd.cluster(), ClusterId::LevelControl);
        assert_eq!(cmd.id(), 0x00);
        assert_eq!(cmd.direction(), Direction::ClientToServer);
        assert_eq!(cmd.encode_payload().unwrap(), vec![0x80, 0x0a, 0x00]);
    }

    #[test]
    fn test_zone_status_notification() {
        let cmd = LocalCommand::decode(0x0500, Direction::ServerToClient, 0x00, &[0x01, 0x00, 0x00, 0x01, 0x00, 0x00])
            .unwrap();
        let LocalCommand::ZoneStatusChangeNotification(n) = cmd else {
            panic!("unexpected command");
        };
        assert!(n.zone_status.contains(ZoneStatus::ALARM1));
        assert_eq!(n.zone_id, 1);
    }

    #[test]
    fn test_attribute_tables() {
        let basic = find(0x0000).unwrap();
        let model = basic.attribute(attr::BASIC_MODEL_ID).unwrap();
        assert_eq!(model.name, "ModelIdentifier");
        assert_eq!(model.data_type, ZclDataType::CharStr);
        assert_eq!(model.access, Access::READ);

        let on_off = find(0x0006).unwrap().attribute(0x0000).unwrap();
        assert_eq!(on_off.access, Access::READ | Access::REPORTABLE | Access::SCENE);
        assert!(find(0xfc00).is_none());
    }

    #[test]
    fn test_transition_time() {
        assert_eq!(transition_time_from(Duration::from_millis(1500)), 15);
        assert_eq!(transition_time_from(Duration::from_secs(100_000)), u16::MAX);
    }
}
