// MIT License - Copyright (c) 2026 Peter Wright
// Enumerations and flag sets carried in ZNP payloads

use bitflags::bitflags;

use crate::error::{Result, StackError};

wire_enum! {
    /// Return value of most ZNP requests and confirmations.
    pub enum Status: u8 {
        Success = 0x00,
        Failure = 0x01,
        InvalidParameter = 0x02,
        ItemCreatedAndInitialized = 0x09,
        InitializationFailed = 0x0a,
        BadLength = 0x0c,
        MemError = 0x10,
        BufferFull = 0x11,
        UnsupportedMode = 0x12,
        MacMemError = 0x13,
        SapiInProgress = 0x20,
        SapiTimeout = 0x21,
        SapiInit = 0x22,
        NotAuthorized = 0x7e,
        MalformedCmd = 0x80,
        UnsupClusterCmd = 0x81,
        ZdpInvalidEp = 0x82,
        ZdpNotActive = 0x83,
        ZdpNotSupported = 0x84,
        ZdpTimeout = 0x85,
        ZdpNoMatch = 0x86,
        ZdpNoEntry = 0x88,
        ZdpNoDescriptor = 0x89,
        ZdpInsufficientSpace = 0x8a,
        ZdpNotPermitted = 0x8b,
        ZdpTableFull = 0x8c,
        ZdpNotAuthorized = 0x8d,
        ZdpBindingTableFull = 0x8e,
        OtaAbort = 0x95,
        OtaImageInvalid = 0x96,
        OtaWaitForData = 0x97,
        OtaNoImageAvailable = 0x98,
        OtaRequireMoreImage = 0x99,
        SecNoKey = 0xa1,
        SecOldFrmCount = 0xa2,
        SecMaxFrmCount = 0xa3,
        SecCcmFail = 0xa4,
        SecFailure = 0xad,
        ApsFail = 0xb1,
        ApsTableFull = 0xb2,
        ApsIllegalRequest = 0xb3,
        ApsInvalidBinding = 0xb4,
        ApsUnsupportedAttrib = 0xb5,
        ApsNotSupported = 0xb6,
        ApsNoAck = 0xb7,
        ApsDuplicateEntry = 0xb8,
        ApsNoBoundDevice = 0xb9,
        ApsNotAllowed = 0xba,
        ApsNotAuthenticated = 0xbb,
        NwkInvalidParam = 0xc1,
        NwkInvalidRequest = 0xc2,
        NwkNotPermitted = 0xc3,
        NwkStartupFailure = 0xc4,
        NwkAlreadyPresent = 0xc5,
        NwkSyncFailure = 0xc6,
        NwkTableFull = 0xc7,
        NwkUnknownDevice = 0xc8,
        NwkUnsupportedAttribute = 0xc9,
        NwkNoNetworks = 0xca,
        NwkLeaveUnconfirmed = 0xcb,
        NwkNoAck = 0xcc,
        NwkNoRoute = 0xcd,
        MacBeaconLoss = 0xe0,
        MacChannelAccessFailure = 0xe1,
        MacDenied = 0xe2,
        MacDisableTrxFailure = 0xe3,
        MacFailedSecurityCheck = 0xe4,
        MacFrameTooLong = 0xe5,
        MacInvalidGts = 0xe6,
        MacInvalidHandle = 0xe7,
        MacInvalidParameter = 0xe8,
        MacNoAck = 0xe9,
        MacNoBeacon = 0xea,
        MacNoData = 0xeb,
        MacNoShortAddr = 0xec,
        MacOutOfCap = 0xed,
        MacPanIdConflict = 0xee,
        MacRealignment = 0xef,
        MacTransactionExpired = 0xf0,
        MacTransactionOverflow = 0xf1,
        MacTxActive = 0xf2,
        MacUnavailableKey = 0xf3,
        MacUnsupportedAttribute = 0xf4,
        MacUnsupported = 0xf5,
        MacSrcMatchInvalidIndex = 0xff,
    }
}

impl Status {
    pub fn is_success(&self) -> bool {
        *self == Status::Success
    }

    /// `Ok(())` for [`Status::Success`], otherwise [`StackError::Status`].
    pub fn to_result(self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(StackError::Status(self))
        }
    }
}

wire_enum! {
    pub enum AddrMode: u8 {
        NotPresent = 0,
        Group = 1,
        Addr16Bit = 2,
        Addr64Bit = 3,
        Broadcast = 15,
    }
}

wire_enum! {
    pub enum Latency: u8 {
        NoLatency = 0,
        FastBeacons = 1,
        SlowBeacons = 2,
    }
}

wire_enum! {
    pub enum LogicalType: u8 {
        Coordinator = 0,
        Router = 1,
        EndDevice = 2,
        Unknown = 0xff,
    }
}

impl Default for LogicalType {
    fn default() -> Self {
        LogicalType::Unknown
    }
}

wire_enum! {
    pub enum DeviceState: u8 {
        InitializedNotStartedAutomatically = 0,
        InitializedNotConnectedToAnything = 1,
        DiscoveringPansToJoin = 2,
        JoiningPan = 3,
        RejoiningPan = 4,
        JoinedButNotAuthenticated = 5,
        StartedAsDeviceAfterAuthentication = 6,
        DeviceJoinedAuthenticatedAndIsRouter = 7,
        StartingAsZigbeeCoordinator = 8,
        StartedAsZigbeeCoordinator = 9,
        DeviceHasLostInformationAboutItsParent = 10,
        DeviceSendingKeepAliveToParent = 11,
        DeviceWaitingBeforeRejoin = 12,
        RejoiningPanInSecureModeScanningAllChannels = 13,
        RejoiningPanInTrustCenterModeScanningCurrentChannel = 14,
        RejoiningPanInTrustCenterModeScanningAllChannels = 15,
    }
}

wire_enum! {
    pub enum ResetReason: u8 {
        PowerUp = 0,
        External = 1,
        WatchDog = 2,
    }
}

wire_enum! {
    pub enum ResetType: u8 {
        Hard = 0,
        Soft = 1,
    }
}

wire_enum! {
    /// Target of a callback subscription.
    pub enum SubsystemId: u16 {
        Sys = 0x0100,
        Mac = 0x0200,
        Nwk = 0x0300,
        Af = 0x0400,
        Zdo = 0x0500,
        Sapi = 0x0600,
        Util = 0x0700,
        Debug = 0x0800,
        App = 0x0900,
        AllSubsystems = 0xffff,
    }
}

wire_enum! {
    pub enum Action: u8 {
        Disable = 0,
        Enable = 1,
    }
}

wire_enum! {
    pub enum LedMode: u8 {
        Off = 0,
        On = 1,
    }
}

wire_enum! {
    pub enum ReqType: u8 {
        SingleDeviceResponse = 0x00,
        AssociatedDevicesResponse = 0x01,
    }
}

wire_enum! {
    pub enum RouteStatus: u8 {
        Active = 0x00,
        DiscoveryUnderway = 0x01,
        DiscoveryFailed = 0x02,
        Inactive = 0x03,
    }
}

wire_enum! {
    pub enum LqiDeviceType: u8 {
        Coordinator = 0x00,
        Router = 0x01,
        EndDevice = 0x02,
        Unknown = 0x03,
    }
}

wire_enum! {
    pub enum StartupFromAppStatus: u8 {
        RestoredNetworkState = 0x00,
        NewNetworkState = 0x01,
        LeaveAndNotStarted = 0x02,
    }
}

wire_enum! {
    pub enum CommissioningMode: u8 {
        Initialization = 0x00,
        TouchLink = 0x01,
        NetworkSteering = 0x02,
        NetworkFormation = 0x04,
        FindingAndBinding = 0x08,
    }
}

wire_enum! {
    pub enum CommissioningStatus: u8 {
        Success = 0x00,
        InProgress = 0x01,
        NoNetwork = 0x02,
        TlTargetFailure = 0x03,
        TlNotAaCapable = 0x04,
        TlNoScanResponse = 0x05,
        TlNotPermitted = 0x06,
        TclkExFailure = 0x07,
        FormationFailure = 0x08,
        FbTargetInProgress = 0x09,
        FbInitiatorInProgress = 0x0a,
        FbNoIdentifyQueryResponse = 0x0b,
        FbBindingTableFull = 0x0c,
        Network = 0x0d,
    }
}

wire_enum! {
    pub enum GpAction: u8 {
        AddGpdfIntoQueue = 0x00,
        RemoveGpdfFromQueue = 0x01,
    }
}

wire_enum! {
    pub enum GpStatus: u8 {
        DropFrame = 0x00,
        Match = 0x01,
        PassUnprocessed = 0x02,
        TxThenDrop = 0x03,
        Error = 0x04,
    }
}

wire_enum! {
    pub enum GpDataIndStatus: u8 {
        SecuritySuccess = 0x00,
        NoSecurity = 0x01,
        CounterFailure = 0x02,
        AuthFailure = 0x03,
        Unprocessed = 0x04,
    }
}

/// Application profiles the coordinator registers an endpoint for.
pub mod profile {
    pub const INDUSTRIAL_PLANT_MONITORING: u16 = 0x0101;
    pub const HOME_AUTOMATION: u16 = 0x0104;
    pub const COMMERCIAL_BUILDING_AUTOMATION: u16 = 0x0105;
    pub const TELECOM_APPLICATIONS: u16 = 0x0107;
    pub const PERSONAL_HOME_AND_HOSPITAL_CARE: u16 = 0x0108;
    pub const ADVANCED_METERING_INITIATIVE: u16 = 0x0109;
}

/// Broadcast to all routers and the coordinator.
pub const BROADCAST_ADDR: &str = "0xffff";
pub const INVALID_NODE_ADDR: &str = "0xfffe";

bitflags! {
    /// Interfaces compiled into the radio firmware, as reported by ping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u16 {
        const SYS   = 0x0001;
        const MAC   = 0x0002;
        const NWK   = 0x0004;
        const AF    = 0x0008;
        const ZDO   = 0x0010;
        const SAPI  = 0x0020;
        const UTIL  = 0x0040;
        const DEBUG = 0x0080;
        const APP   = 0x0100;
        const ZOAD  = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DeviceType: u8 {
        const COORDINATOR = 0x01;
        const ROUTER      = 0x02;
        const END_DEVICE  = 0x04;
    }
}

bitflags! {
    /// MAC capability information announced by a joining device.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CapInfo: u8 {
        const ALTERNATE_PAN_COORDINATOR = 0b0000_0001;
        const ROUTER                    = 0b0000_0010;
        const MAIN_POWERED              = 0b0000_0100;
        const RECEIVER_ON_WHEN_IDLE     = 0b0000_1000;
        const RESERVED1                 = 0b0001_0000;
        const RESERVED2                 = 0b0010_0000;
        const SECURITY                  = 0b0100_0000;
        const ALLOC_ADDR                = 0b1000_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ServerMask: u16 {
        const PRIM_TRUST_CENTER = 0x01;
        const BKUP_TRUST_CENTER = 0x02;
        const PRIM_BIND_TABLE   = 0x04;
        const BKUP_BIND_TABLE   = 0x08;
        const PRIM_DISC_TABLE   = 0x10;
        const BKUP_DISC_TABLE   = 0x20;
        const NETWORK_MANAGER   = 0x40;
    }
}

bitflags! {
    /// Channel mask, one bit per 2.4 GHz channel 11..=26.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Channels: u32 {
        const CHANNEL_11 = 1 << 11;
        const CHANNEL_12 = 1 << 12;
        const CHANNEL_13 = 1 << 13;
        const CHANNEL_14 = 1 << 14;
        const CHANNEL_15 = 1 << 15;
        const CHANNEL_16 = 1 << 16;
        const CHANNEL_17 = 1 << 17;
        const CHANNEL_18 = 1 << 18;
        const CHANNEL_19 = 1 << 19;
        const CHANNEL_20 = 1 << 20;
        const CHANNEL_21 = 1 << 21;
        const CHANNEL_22 = 1 << 22;
        const CHANNEL_23 = 1 << 23;
        const CHANNEL_24 = 1 << 24;
        const CHANNEL_25 = 1 << 25;
        const CHANNEL_26 = 1 << 26;
    }
}

impl Channels {
    /// Mask selecting a single channel.
    pub fn single(channel: u8) -> Result<Self> {
        if !(11..=26).contains(&channel) {
            return Err(StackError::UnsupportedChannel(channel));
        }
        Ok(Channels::from_bits_retain(1 << channel))
    }

    /// The only channel in the mask. Scanning several channels is not supported.
    pub fn only_channel(&self) -> Result<u8> {
        if self.bits().count_ones() != 1 {
            return Err(StackError::ScanChannels(self.bits()));
        }
        Ok(self.bits().trailing_zeros() as u8)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AfDataRequestOptions: u8 {
        const WILDCARD_PROFILE_ID = 0b0000_0010;
        const APS_ACK             = 0b0001_0000;
        const DISCOVER_ROUTE      = 0b0010_0000;
        const APS_SECURITY        = 0b0100_0000;
        const SKIP_ROUTING        = 0b1000_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RemoveChildrenRejoin: u8 {
        const REJOIN          = 0b0000_0001;
        const REMOVE_CHILDREN = 0b0000_0010;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RemainingCommissioningModes: u8 {
        const INITIATOR_TL    = 0x01;
        const NWK_STEERING    = 0x02;
        const NWK_FORMATION   = 0x04;
        const FINDING_BINDING = 0x08;
        const INITIALIZATION  = 0x10;
        const PARENT_LOST     = 0x20;
    }
}

wire_bitflags!(
    Capabilities: u16,
    DeviceType: u8,
    CapInfo: u8,
    ServerMask: u16,
    Channels: u32,
    AfDataRequestOptions: u8,
    RemoveChildrenRejoin: u8,
    RemainingCommissioningModes: u8,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode, CodecError};

    #[test]
    fn test_status_to_result() {
        assert!(Status::Success.to_result().is_ok());
        assert!(matches!(
            Status::NwkNoRoute.to_result(),
            Err(StackError::Status(Status::NwkNoRoute))
        ));
    }

    #[test]
    fn test_unknown_status_is_an_error_not_a_panic() {
        assert_eq!(
            decode::<Status>(&[0x87]).unwrap_err(),
            CodecError::UnsupportedVariant { kind: "Status", value: 0x87 }
        );
    }

    #[test]
    fn test_single_channel_mask() {
        assert_eq!(Channels::single(11).unwrap(), Channels::CHANNEL_11);
        assert_eq!(encode(&Channels::single(15).unwrap()).unwrap(), vec![0x00, 0x80, 0x00, 0x00]);
        assert!(matches!(Channels::single(27), Err(StackError::UnsupportedChannel(27))));
        assert!(matches!(Channels::single(10), Err(StackError::UnsupportedChannel(10))));
    }

    #[test]
    fn test_only_channel() {
        assert_eq!(Channels::CHANNEL_25.only_channel().unwrap(), 25);
        assert!(matches!(
            (Channels::CHANNEL_11 | Channels::CHANNEL_15).only_channel(),
            Err(StackError::ScanChannels(_))
        ));
        assert!(Channels::empty().only_channel().is_err());
    }

    #[test]
    fn test_flags_keep_unknown_bits() {
        let caps: CapInfo = decode(&[0x8e]).unwrap();
        assert!(caps.contains(CapInfo::MAIN_POWERED));
        assert_eq!(encode(&caps).unwrap(), vec![0x8e]);
    }
}
