// MIT License - Copyright (c) 2026 Peter Wright
// Outbound ZNP requests and their synchronous responses

use crate::codec::Wire;
use crate::unp::Subsystem;

use super::types::*;

/// A request that can be framed and sent to the radio.
pub trait Request: Wire + Send + 'static {
    const SUBSYSTEM: Subsystem;
    const COMMAND: u8;
    const NAME: &'static str;
}

/// A request answered by exactly one SRSP frame.
pub trait SyncRequest: Request {
    type Response: Wire + Send + 'static;
}

/// A fire-and-forget request.
pub trait AsyncRequest: Request {}

macro_rules! sync_requests {
    ($( $req:ident = $subsystem:ident $command:literal => $rsp:ty ),+ $(,)?) => {
        $(
            impl Request for $req {
                const SUBSYSTEM: Subsystem = Subsystem::$subsystem;
                const COMMAND: u8 = $command;
                const NAME: &'static str = stringify!($req);
            }

            impl SyncRequest for $req {
                type Response = $rsp;
            }
        )+
    };
}

macro_rules! async_requests {
    ($( $req:ident = $subsystem:ident $command:literal ),+ $(,)?) => {
        $(
            impl Request for $req {
                const SUBSYSTEM: Subsystem = Subsystem::$subsystem;
                const COMMAND: u8 = $command;
                const NAME: &'static str = stringify!($req);
            }

            impl AsyncRequest for $req {}
        )+
    };
}

// ---- shared responses ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct StatusResponse {
        pub status: Status,
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct EmptyResponse {}
}

// ---- SYS ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SysResetReq {
        pub reset_type: ResetType,
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SysPing {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SysPingResponse {
        pub capabilities: Capabilities,
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SysVersion {}
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SysVersionResponse {
        pub transport_rev: u8,
        pub product: u8,
        pub major_rel: u8,
        pub minor_rel: u8,
        pub maint_rel: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SysSetExtAddr {
        pub ext_address: String [hex 8],
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SysGetExtAddr {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SysGetExtAddrResponse {
        pub ext_address: String [hex 8],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SysOsalNvRead {
        pub id: u16,
        pub offset: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SysOsalNvReadResponse {
        pub status: Status,
        pub value: Vec<u8> [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SysOsalNvWrite {
        pub id: u16,
        pub offset: u8,
        pub value: Vec<u8> [size 1],
    }
}

wire_struct! {
    /// Radio real-time clock. `utc_time` is seconds since 2000-01-01; when it
    /// is zero the calendar fields are used instead.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SysTime {
        pub utc_time: u32,
        pub hour: u8,
        pub minute: u8,
        pub second: u8,
        pub month: u8,
        pub day: u8,
        pub year: u16,
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SysSetTime {
        pub time: SysTime,
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SysGetTime {}
}

// ---- AF ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct AfRegister {
        pub end_point: u8,
        pub app_prof_id: u16,
        pub app_device_id: u16,
        pub add_dev_ver: u8,
        pub latency_req: Latency,
        pub app_in_cluster_list: Vec<u16> [size 1],
        pub app_out_cluster_list: Vec<u16> [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct AfDataRequest {
        pub dst_addr: String [hex 2],
        pub dst_endpoint: u8,
        pub src_endpoint: u8,
        pub cluster_id: u16,
        pub trans_id: u8,
        pub options: AfDataRequestOptions,
        pub radius: u8,
        pub data: Vec<u8> [size 1],
    }
}

wire_struct! {
    /// Data request addressed by any address mode, with a two-byte length.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct AfDataRequestExt {
        pub dst_addr_mode: AddrMode,
        pub dst_addr: String [hex 8],
        pub dst_endpoint: u8,
        pub dst_pan_id: u16,
        pub src_endpoint: u8,
        pub cluster_id: u16,
        pub trans_id: u8,
        pub options: AfDataRequestOptions,
        pub radius: u8,
        pub data: Vec<u8> [size 2],
    }
}

// ---- ZDO ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoNwkAddrReq {
        pub ieee_address: String [hex 8],
        pub req_type: ReqType,
        pub start_index: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoIeeeAddrReq {
        pub short_addr: String [hex 2],
        pub req_type: ReqType,
        pub start_index: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoNodeDescReq {
        pub dst_addr: String [hex 2],
        pub nwk_addr_of_interest: String [hex 2],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoPowerDescReq {
        pub dst_addr: String [hex 2],
        pub nwk_addr_of_interest: String [hex 2],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoSimpleDescReq {
        pub dst_addr: String [hex 2],
        pub nwk_addr_of_interest: String [hex 2],
        pub endpoint: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoActiveEpReq {
        pub dst_addr: String [hex 2],
        pub nwk_addr_of_interest: String [hex 2],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoBindReq {
        pub dst_addr: String [hex 2],
        pub src_address: String [hex 8],
        pub src_endpoint: u8,
        pub cluster_id: u16,
        pub dst_addr_mode: AddrMode,
        pub dst_address: String [hex 8],
        pub dst_endpoint: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoUnbindReq {
        pub dst_addr: String [hex 2],
        pub src_address: String [hex 8],
        pub src_endpoint: u8,
        pub cluster_id: u16,
        pub dst_addr_mode: AddrMode,
        pub dst_address: String [hex 8],
        pub dst_endpoint: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMgmtLqiReq {
        pub dst_addr: String [hex 2],
        pub start_index: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMgmtRtgReq {
        pub dst_addr: String [hex 2],
        pub start_index: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMgmtBindReq {
        pub dst_addr: String [hex 2],
        pub start_index: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMgmtLeaveReq {
        pub dst_addr: String [hex 2],
        pub device_addr: String [hex 8],
        pub remove_children_rejoin: RemoveChildrenRejoin,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMgmtPermitJoinReq {
        pub addr_mode: AddrMode,
        pub dst_addr: String [hex 2],
        pub duration: u8,
        pub tc_significance: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoStartupFromApp {
        pub start_delay: u16,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoStartupFromAppResponse {
        pub status: StartupFromAppStatus,
    }
}

// ---- SAPI ----

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SapiZbSystemReset {}
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SapiZbStartRequest {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SapiZbPermitJoiningRequest {
        pub destination: String [hex 2],
        pub timeout: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SapiZbReadConfiguration {
        pub config_id: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SapiZbReadConfigurationResponse {
        pub status: Status,
        pub config_id: u8,
        pub value: Vec<u8> [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SapiZbWriteConfiguration {
        pub config_id: u8,
        pub value: Vec<u8> [size 1],
    }
}

// ---- UTIL ----

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct UtilGetDeviceInfo {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UtilGetDeviceInfoResponse {
        pub status: Status,
        pub ieee_addr: String [hex 8],
        pub short_addr: String [hex 2],
        pub device_type: DeviceType,
        pub device_state: DeviceState,
        pub assoc_devices_list: Vec<String> [size 1, hex 2],
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct UtilGetNvInfo {}
}

wire_struct! {
    /// One status bit per block; a set bit means that block failed to read.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct NvInfoStatus {
        bits(u8) {
            pub ieee_address: bool = 0b0000_0001,
            pub scan_channels: bool = 0b0000_0010,
            pub pan_id: bool = 0b0000_0100,
            pub security_level: bool = 0b0000_1000,
            pub pre_config_key: bool = 0b0001_0000,
        },
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct UtilGetNvInfoResponse {
        pub status: NvInfoStatus,
        pub ieee_addr: String [hex 8],
        pub scan_channels: u32 [be],
        pub pan_id: u16,
        pub security_level: u8,
        pub pre_config_key: [u8; 16],
    }
}

impl UtilGetNvInfoResponse {
    pub fn channels(&self) -> Channels {
        Channels::from_bits_retain(self.scan_channels)
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UtilSetPanId {
        pub pan_id: u16,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UtilSetChannels {
        pub channels: Channels,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UtilSetPreCfgKey {
        pub pre_cfg_key: [u8; 16],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UtilCallbackSubCmd {
        pub subsystem_id: SubsystemId,
        pub action: Action,
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct UtilTimeAlive {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UtilTimeAliveResponse {
        pub seconds: u32,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UtilLedControl {
        pub led_id: u8,
        pub mode: LedMode,
    }
}

// ---- APP_CNF ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct AppCnfBdbStartCommissioning {
        pub commissioning_mode: CommissioningMode,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct AppCnfBdbSetChannel {
        pub is_primary: bool,
        pub channel: Channels,
    }
}

sync_requests! {
    SysPing = Sys 0x01 => SysPingResponse,
    SysVersion = Sys 0x02 => SysVersionResponse,
    SysSetExtAddr = Sys 0x03 => StatusResponse,
    SysGetExtAddr = Sys 0x04 => SysGetExtAddrResponse,
    SysOsalNvRead = Sys 0x08 => SysOsalNvReadResponse,
    SysOsalNvWrite = Sys 0x09 => StatusResponse,
    SysSetTime = Sys 0x10 => StatusResponse,
    SysGetTime = Sys 0x11 => SysTime,

    AfRegister = Af 0x00 => StatusResponse,
    AfDataRequest = Af 0x01 => StatusResponse,
    AfDataRequestExt = Af 0x02 => StatusResponse,

    ZdoNwkAddrReq = Zdo 0x00 => StatusResponse,
    ZdoIeeeAddrReq = Zdo 0x01 => StatusResponse,
    ZdoNodeDescReq = Zdo 0x02 => StatusResponse,
    ZdoPowerDescReq = Zdo 0x03 => StatusResponse,
    ZdoSimpleDescReq = Zdo 0x04 => StatusResponse,
    ZdoActiveEpReq = Zdo 0x05 => StatusResponse,
    ZdoBindReq = Zdo 0x21 => StatusResponse,
    ZdoUnbindReq = Zdo 0x22 => StatusResponse,
    ZdoMgmtLqiReq = Zdo 0x31 => StatusResponse,
    ZdoMgmtRtgReq = Zdo 0x32 => StatusResponse,
    ZdoMgmtBindReq = Zdo 0x33 => StatusResponse,
    ZdoMgmtLeaveReq = Zdo 0x34 => StatusResponse,
    ZdoMgmtPermitJoinReq = Zdo 0x36 => StatusResponse,
    ZdoStartupFromApp = Zdo 0x40 => ZdoStartupFromAppResponse,

    SapiZbStartRequest = Sapi 0x00 => EmptyResponse,
    SapiZbReadConfiguration = Sapi 0x04 => SapiZbReadConfigurationResponse,
    SapiZbWriteConfiguration = Sapi 0x05 => StatusResponse,
    SapiZbPermitJoiningRequest = Sapi 0x08 => StatusResponse,

    UtilGetDeviceInfo = Util 0x00 => UtilGetDeviceInfoResponse,
    UtilGetNvInfo = Util 0x01 => UtilGetNvInfoResponse,
    UtilSetPanId = Util 0x02 => StatusResponse,
    UtilSetChannels = Util 0x03 => StatusResponse,
    UtilSetPreCfgKey = Util 0x05 => StatusResponse,
    UtilCallbackSubCmd = Util 0x06 => StatusResponse,
    UtilTimeAlive = Util 0x09 => UtilTimeAliveResponse,
    UtilLedControl = Util 0x0A => StatusResponse,

    AppCnfBdbStartCommissioning = AppCnf 0x05 => StatusResponse,
    AppCnfBdbSetChannel = AppCnf 0x08 => StatusResponse,
}

async_requests! {
    SysResetReq = Sys 0x00,
    SapiZbSystemReset = Sapi 0x09,
}

/// SAPI configuration ids written during network commissioning.
pub mod config_id {
    pub const LOGICAL_TYPE: u8 = 0x87;
    pub const ZDO_DIRECT_CB: u8 = 0x8F;
    pub const SECURITY_MODE: u8 = 0x64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};
    use hex_literal::hex;

    #[test]
    fn test_af_data_request_layout() {
        let req = AfDataRequest {
            dst_addr: "0x1234".to_string(),
            dst_endpoint: 1,
            src_endpoint: 1,
            cluster_id: 0x0006,
            trans_id: 7,
            options: AfDataRequestOptions::empty(),
            radius: 15,
            data: vec![0x01, 0x07, 0x00],
        };
        assert_eq!(
            encode(&req).unwrap(),
            hex!("34 12 01 01 06 00 07 00 0f 03 01 07 00").to_vec()
        );
    }

    #[test]
    fn test_nv_info_channel_is_big_endian() {
        let mut bytes = vec![0x00];
        bytes.extend_from_slice(&hex!("0403020100 4b 12 00"));
        bytes.extend_from_slice(&hex!("00 00 08 00"));
        bytes.extend_from_slice(&hex!("62 1a"));
        bytes.push(0x05);
        bytes.extend_from_slice(&[0xaa; 16]);

        let rsp: UtilGetNvInfoResponse = decode(&bytes).unwrap();
        assert_eq!(rsp.ieee_addr, "0x00124b0001020304");
        assert_eq!(rsp.channels().only_channel().unwrap(), 11);
        assert_eq!(rsp.pan_id, 0x1a62);
        assert_eq!(rsp.pre_config_key, [0xaa; 16]);
        assert!(!rsp.status.ieee_address);
    }

    #[test]
    fn test_device_info_response() {
        let bytes = hex!("00 0403020100 4b 12 00 00 00 01 09 02 01 00 02 00");
        let rsp: UtilGetDeviceInfoResponse = decode(&bytes).unwrap();
        assert_eq!(rsp.short_addr, "0x0000");
        assert_eq!(rsp.device_type, DeviceType::COORDINATOR);
        assert_eq!(rsp.device_state, DeviceState::StartedAsZigbeeCoordinator);
        assert_eq!(rsp.assoc_devices_list, vec!["0x0001".to_string(), "0x0002".to_string()]);
    }

    #[test]
    fn test_set_time_is_flat() {
        let req = SysSetTime {
            time: SysTime {
                utc_time: 0,
                hour: 13,
                minute: 5,
                second: 59,
                month: 10,
                day: 16,
                year: 2026,
            },
        };
        assert_eq!(encode(&req).unwrap(), hex!("00000000 0d 05 3b 0a 10 ea 07").to_vec());
    }

    #[test]
    fn test_request_metadata() {
        assert_eq!(SysOsalNvRead::SUBSYSTEM, Subsystem::Sys);
        assert_eq!(SysOsalNvRead::COMMAND, 0x08);
        assert_eq!(UtilLedControl::NAME, "UtilLedControl");
        assert_eq!(SysResetReq::COMMAND, 0x00);
    }
}
