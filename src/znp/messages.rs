// MIT License - Copyright (c) 2026 Peter Wright
// Asynchronous indications and confirmations sent by the radio

use super::types::*;

// ---- AF ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct AfDataConfirm {
        pub status: Status,
        pub endpoint: u8,
        pub trans_id: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct AfReflectError {
        pub status: Status,
        pub endpoint: u8,
        pub trans_id: u8,
        pub dst_addr_mode: AddrMode,
        pub dst_addr: String [hex 2],
    }
}

wire_struct! {
    /// Application payload received from a remote endpoint.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct AfIncomingMessage {
        pub group_id: u16,
        pub cluster_id: u16,
        pub src_addr: String [hex 2],
        pub src_endpoint: u8,
        pub dst_endpoint: u8,
        pub was_broadcast: u8,
        pub link_quality: u8,
        pub security_use: u8,
        pub timestamp: u32,
        pub trans_seq_number: u8,
        pub data: Vec<u8> [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct AfIncomingMessageExt {
        pub group_id: u16,
        pub cluster_id: u16,
        pub src_addr_mode: AddrMode,
        pub src_addr: String [hex 8],
        pub src_endpoint: u8,
        pub src_pan_id: u16,
        pub dst_endpoint: u8,
        pub was_broadcast: u8,
        pub link_quality: u8,
        pub security_use: u8,
        pub timestamp: u32,
        pub trans_seq_number: u8,
        pub data: Vec<u8> [size 2],
    }
}

// ---- DBG ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct DebugMsg {
        pub string: String [size 1],
    }
}

// ---- SAPI ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SapiZbStartConfirm {
        pub status: Status,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SapiZbBindConfirm {
        pub command_id: u16,
        pub status: Status,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SapiZbAllowBindConfirm {
        pub source: String [hex 2],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SapiZbSendDataConfirm {
        pub handle: u8,
        pub status: Status,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SapiZbFindDeviceConfirm {
        pub search_type: u8,
        pub result: String [hex 2],
        pub search_key: String [hex 8],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SapiZbReceiveDataIndication {
        pub source: String [hex 2],
        pub command_id: u16,
        pub data: Vec<u8> [size 1],
    }
}

// ---- SYS ----

wire_struct! {
    /// Sent by the radio after every reset.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SysResetInd {
        pub reason: ResetReason,
        pub transport_rev: u8,
        pub product: u8,
        pub minor_rel: u8,
        pub hw_rev: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SysOsalTimerExpired {
        pub id: u8,
    }
}

// ---- UTIL ----

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct UtilSyncReq {}
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UtilZclKeyEstablishInd {
        pub task_id: u8,
        pub event: u8,
        pub status: u8,
        pub wait_time: u8,
        pub suite: u16,
    }
}

// ---- ZDO ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoNwkAddrRsp {
        pub status: Status,
        pub ieee_addr: String [hex 8],
        pub nwk_addr: String [hex 2],
        pub start_index: u8,
        pub assoc_dev_list: Vec<String> [size 1, hex 2],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoIeeeAddrRsp {
        pub status: Status,
        pub ieee_addr: String [hex 8],
        pub nwk_addr: String [hex 2],
        pub start_index: u8,
        pub assoc_dev_list: Vec<String> [size 1, hex 2],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoNodeDescRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
        pub nwk_addr_of_interest: String [hex 2],
        bits(u8) {
            pub logical_type: LogicalType = 0b0000_0011,
            pub complex_descriptor_available: bool = 0b0000_1000,
            pub user_descriptor_available: bool = 0b0001_0000,
        },
        bits(u8) {
            pub aps_flags: u8 = 0b0001_1111,
            pub frequency_band: u8 = 0b1110_0000,
        },
        pub mac_capabilities_flags: CapInfo,
        pub manufacturer_code: u16,
        pub max_buffer_size: u8,
        pub max_in_transfer_size: u16,
        pub server_mask: ServerMask,
        pub max_out_transfer_size: u16,
        pub descriptor_capabilities: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoPowerDescRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
        pub nwk_addr: String [hex 2],
        bits(u8) {
            pub current_power_mode: u8 = 0b0000_1111,
            pub available_power_sources: u8 = 0b1111_0000,
        },
        bits(u8) {
            pub current_power_source: u8 = 0b0000_1111,
            pub current_power_source_level: u8 = 0b1111_0000,
        },
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoSimpleDescRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
        pub nwk_addr: String [hex 2],
        pub len: u8,
        pub endpoint: u8,
        pub profile_id: u16,
        pub device_id: u16,
        pub device_version: u8,
        pub in_cluster_list: Vec<u16> [size 1],
        pub out_cluster_list: Vec<u16> [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoActiveEpRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
        pub nwk_addr: String [hex 2],
        pub active_ep_list: Vec<u8> [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMatchDescRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
        pub nwk_addr: String [hex 2],
        pub match_list: Vec<u8> [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoComplexDescRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
        pub nwk_addr: String [hex 2],
        pub complex_descriptor: String [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoUserDescRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
        pub nwk_addr: String [hex 2],
        pub user_descriptor: String [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoUserDescConf {
        pub src_addr: String [hex 2],
        pub status: Status,
        pub nwk_addr: String [hex 2],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoServerDiscRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
        pub server_mask: ServerMask,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoEndDeviceBindRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoBindRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoUnbindRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Network {
        pub pan_id: u64 [bound 8],
        pub logical_channel: u8,
        bits(u8) {
            pub stack_profile: u8 = 0b0000_1111,
            pub zigbee_version: u8 = 0b1111_0000,
        },
        bits(u8) {
            pub beacon_order: u8 = 0b0000_1111,
            pub super_frame_order: u8 = 0b1111_0000,
        },
        pub permit_join: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMgmtNwkDiscRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
        pub network_count: u8,
        pub start_index: u8,
        pub network_list: Vec<Network> [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct NeighborLqi {
        pub extended_pan_id: u64,
        pub extended_address: String [hex 8],
        pub network_address: String [hex 2],
        bits(u8) {
            pub device_type: LqiDeviceType = 0b0000_0011,
            pub rx_on_when_idle: u8 = 0b0000_1100,
            pub relationship: u8 = 0b0011_0000,
        },
        pub permit_joining: u8,
        pub depth: u8,
        pub lqi: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMgmtLqiRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
        pub neighbor_table_entries: u8,
        pub start_index: u8,
        pub neighbor_lqi_list: Vec<NeighborLqi> [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Route {
        pub destination_address: String [hex 2],
        pub route_status: RouteStatus,
        pub next_hop: String [hex 2],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMgmtRtgRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
        pub routing_table_entries: u8,
        pub start_index: u8,
        pub routing_table_list: Vec<Route> [size 1],
    }
}

wire_struct! {
    /// Destination of a binding. Group and short modes carry a short address;
    /// 64-bit mode carries an IEEE address and an endpoint.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct BindAddr {
        pub addr_mode: AddrMode,
        pub short_addr: Option<String> [when (addr_mode != 3) hex 2],
        pub extended_addr: Option<String> [when (addr_mode == 3) hex 8],
        pub dst_endpoint: Option<u8> [when (addr_mode == 3)],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Binding {
        pub src_addr: String [hex 8],
        pub src_endpoint: u8,
        pub cluster_id: u16,
        pub dst_addr: BindAddr,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMgmtBindRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
        pub binding_table_entries: u8,
        pub start_index: u8,
        pub binding_table_list: Vec<Binding> [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMgmtLeaveRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMgmtDirectJoinRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMgmtPermitJoinRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoStateChangeInd {
        pub state: DeviceState,
    }
}

wire_struct! {
    /// A device joined or rejoined the network.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoEndDeviceAnnceInd {
        pub src_addr: String [hex 2],
        pub nwk_addr: String [hex 2],
        pub ieee_addr: String [hex 8],
        pub capabilities: CapInfo,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMatchDescRpsSent {
        pub nwk_addr: String [hex 2],
        pub in_cluster_list: Vec<u16> [size 1],
        pub out_cluster_list: Vec<u16> [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoStatusErrorRsp {
        pub src_addr: String [hex 2],
        pub status: Status,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoSrcRtgInd {
        pub dst_addr: String [hex 2],
        pub relay_list: Vec<String> [size 1, hex 2],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Beacon {
        pub src_addr: String [hex 2],
        pub pan_id: u16,
        pub logical_channel: u8,
        pub permit_joining: u8,
        pub router_capacity: u8,
        pub device_capacity: u8,
        pub protocol_version: u8,
        pub stack_profile: u8,
        pub lqi: u8,
        pub depth: u8,
        pub update_id: u8,
        pub extended_pan_id: u64,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoBeaconNotifyInd {
        pub beacon_list: Vec<Beacon> [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoJoinCnf {
        pub status: Status,
        pub device_address: String [hex 2],
        pub parent_address: String [hex 2],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoNwkDiscoveryCnf {
        pub status: Status,
    }
}

wire_struct! {
    /// A device left the network.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoLeaveInd {
        pub src_addr: String [hex 2],
        pub ext_addr: String [hex 8],
        pub request: u8,
        pub remove: u8,
        pub rejoin: u8,
    }
}

wire_struct! {
    /// Trust center saw a device join.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoTcDevInd {
        pub src_nwk_addr: String [hex 2],
        pub src_ieee_addr: String [hex 8],
        pub parent_nwk_addr: String [hex 2],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoPermitJoinInd {
        pub permit_join_duration: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ZdoMsgCbIncoming {
        pub src_addr: String [hex 2],
        pub was_broadcast: u8,
        pub cluster_id: u16,
        pub security_use: u8,
        pub seq_num: u8,
        pub mac_dst_addr: String [hex 2],
        pub data: Vec<u8>,
    }
}

// ---- APP_CNF ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct AppCnfBdbCommissioningNotification {
        pub commissioning_status: CommissioningStatus,
        pub commissioning_mode: CommissioningMode,
        pub remaining_commissioning_modes: RemainingCommissioningModes,
    }
}

// ---- GP ----

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct GpDataReq {
        pub action: GpAction,
        bits(u8) {
            pub use_gp_tx_queue: bool = 0b0000_0001,
            pub use_csma_or_ca: bool = 0b0000_0010,
            pub use_mac_ack: bool = 0b0000_0100,
            pub gpdf_frame_type_for_tx: u8 = 0b0001_1000,
            pub tx_on_matching_endpoint: bool = 0b0010_0000,
        },
        pub application_id: u8,
        pub src_id: u32,
        pub gpd_ieee_address: String [hex 8],
        pub endpoint: u8,
        pub gpd_command_id: u8,
        pub gpd_asdu: Vec<u8> [size 1],
        pub gpep_handle: u8,
        pub gp_tx_queue_entry_lifetime: u32 [bound 3],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct GpSecRsp {
        pub status: GpStatus,
        pub dgp_stub_handle: u8,
        pub application_id: u8,
        pub src_id: u32,
        pub gpd_ieee_address: String [hex 8],
        pub endpoint: u8,
        pub gpdf_security_level: u8,
        pub gpdf_key_type: u8,
        pub gpd_key: [u8; 16],
        pub gpd_security_frame_counter: u32,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct GpSecReq {
        pub application_id: u8,
        pub src_id: u32,
        pub gpd_ieee_address: String [hex 8],
        pub endpoint: u8,
        pub gpdf_security_level: u8,
        pub gpdf_key_type: u8,
        pub gpd_security_frame_counter: u32,
        pub dgp_stub_handle: u8,
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct GpDataInd {
        pub status: GpDataIndStatus,
        pub rssi: u8,
        pub link_quality: u8,
        pub seq_number: u8,
        pub src_addr_mode: AddrMode,
        pub src_pan_id: u16,
        pub src_address: String [hex 8],
        pub dst_addr_mode: AddrMode,
        pub dst_pan_id: u16,
        pub dst_address: String [hex 8],
        pub gpmpdu: Vec<u8> [size 1],
    }
}

wire_struct! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct GpDataCnf {
        pub status: Status,
        pub gpmpdu_handle: u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};
    use hex_literal::hex;

    #[test]
    fn test_node_descriptor_bit_spans() {
        let bytes = hex!("3412 00 3412 02 40 8e 3710 52 8000 0000 8000 00");
        let rsp: ZdoNodeDescRsp = decode(&bytes).unwrap();
        assert_eq!(rsp.logical_type, LogicalType::EndDevice);
        assert!(!rsp.complex_descriptor_available);
        assert_eq!(rsp.aps_flags, 0);
        assert_eq!(rsp.frequency_band, 0b010);
        assert!(rsp.mac_capabilities_flags.contains(CapInfo::MAIN_POWERED));
        assert_eq!(rsp.manufacturer_code, 0x1037);
        assert_eq!(encode(&rsp).unwrap(), bytes.to_vec());
    }

    #[test]
    fn test_simple_descriptor() {
        let bytes = hex!("3412 00 3412 0e 01 0401 0201 01 02 0000 0600 01 1900");
        let rsp: ZdoSimpleDescRsp = decode(&bytes).unwrap();
        assert_eq!(rsp.src_addr, "0x1234");
        assert_eq!(rsp.profile_id, 0x0104);
        assert_eq!(rsp.device_id, 0x0102);
        assert_eq!(rsp.in_cluster_list, vec![0x0000, 0x0006]);
        assert_eq!(rsp.out_cluster_list, vec![0x0019]);
    }

    #[test]
    fn test_binding_table_address_modes() {
        let bytes = hex!(
            "0000 00 02 00 02"
            "0807060504030201 01 0600 03 1817161514131211 01"
            "0807060504030201 01 0800 01 0300"
        );
        let rsp: ZdoMgmtBindRsp = decode(&bytes).unwrap();
        assert_eq!(rsp.binding_table_list.len(), 2);
        let first = &rsp.binding_table_list[0].dst_addr;
        assert_eq!(first.extended_addr.as_deref(), Some("0x1112131415161718"));
        assert_eq!(first.dst_endpoint, Some(1));
        assert_eq!(first.short_addr, None);
        let second = &rsp.binding_table_list[1].dst_addr;
        assert_eq!(second.addr_mode, AddrMode::Group);
        assert_eq!(second.short_addr.as_deref(), Some("0x0003"));
        assert_eq!(encode(&rsp).unwrap(), bytes.to_vec());
    }

    #[test]
    fn test_gp_lifetime_is_three_bytes() {
        let req = GpDataReq {
            action: GpAction::AddGpdfIntoQueue,
            use_gp_tx_queue: true,
            use_csma_or_ca: false,
            use_mac_ack: true,
            gpdf_frame_type_for_tx: 2,
            tx_on_matching_endpoint: false,
            application_id: 0,
            src_id: 1,
            gpd_ieee_address: "0x0000000000000000".to_string(),
            endpoint: 1,
            gpd_command_id: 0x10,
            gpd_asdu: vec![],
            gpep_handle: 9,
            gp_tx_queue_entry_lifetime: 0x0a0b0c,
        };
        let bytes = encode(&req).unwrap();
        assert_eq!(bytes[1], 0b0001_0101);
        assert_eq!(&bytes[bytes.len() - 3..], &[0x0c, 0x0b, 0x0a]);
        assert_eq!(decode::<GpDataReq>(&bytes).unwrap(), req);
    }
}
