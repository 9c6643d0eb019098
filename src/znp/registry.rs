// MIT License - Copyright (c) 2026 Peter Wright
// (subsystem, command) lookup table for inbound AREQ frames

use crate::codec;
use crate::error::{Result, StackError};
use crate::unp::Subsystem;

use super::messages::*;

/// An indication type that can be picked out of the async fan-out.
pub trait Indication: Clone + Send + 'static {
    const NAME: &'static str;

    fn from_message(message: &AsyncMessage) -> Option<&Self>;
}

macro_rules! async_registry {
    ($( $subsystem:ident $command:literal => $variant:ident ),+ $(,)?) => {
        /// Every asynchronous message the radio can send.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum AsyncMessage {
            $( $variant($variant), )+
        }

        impl AsyncMessage {
            /// Decode an AREQ payload into the record registered for its key.
            pub fn decode(subsystem: Subsystem, command: u8, payload: &[u8]) -> Result<Self> {
                match (subsystem, command) {
                    $(
                        (Subsystem::$subsystem, $command) => {
                            Ok(AsyncMessage::$variant(codec::decode(payload)?))
                        }
                    )+
                    _ => Err(StackError::UnknownAsyncCommand { subsystem, command }),
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $( AsyncMessage::$variant(_) => stringify!($variant), )+
                }
            }

            /// The key this message is registered under.
            pub fn key(&self) -> (Subsystem, u8) {
                match self {
                    $( AsyncMessage::$variant(_) => (Subsystem::$subsystem, $command), )+
                }
            }
        }

        $(
            impl From<$variant> for AsyncMessage {
                fn from(value: $variant) -> Self {
                    AsyncMessage::$variant(value)
                }
            }

            impl Indication for $variant {
                const NAME: &'static str = stringify!($variant);

                fn from_message(message: &AsyncMessage) -> Option<&Self> {
                    match message {
                        AsyncMessage::$variant(inner) => Some(inner),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            }
        )+
    };
}

async_registry! {
    Af 0x80 => AfDataConfirm,
    Af 0x81 => AfIncomingMessage,
    Af 0x82 => AfIncomingMessageExt,
    Af 0x83 => AfReflectError,

    Dbg 0x00 => DebugMsg,

    Sapi 0x80 => SapiZbStartConfirm,
    Sapi 0x81 => SapiZbBindConfirm,
    Sapi 0x82 => SapiZbAllowBindConfirm,
    Sapi 0x83 => SapiZbSendDataConfirm,
    Sapi 0x85 => SapiZbFindDeviceConfirm,
    Sapi 0x87 => SapiZbReceiveDataIndication,

    Sys 0x80 => SysResetInd,
    Sys 0x81 => SysOsalTimerExpired,

    Util 0xE0 => UtilSyncReq,
    Util 0xE1 => UtilZclKeyEstablishInd,

    Zdo 0x80 => ZdoNwkAddrRsp,
    Zdo 0x81 => ZdoIeeeAddrRsp,
    Zdo 0x82 => ZdoNodeDescRsp,
    Zdo 0x83 => ZdoPowerDescRsp,
    Zdo 0x84 => ZdoSimpleDescRsp,
    Zdo 0x85 => ZdoActiveEpRsp,
    Zdo 0x86 => ZdoMatchDescRsp,
    Zdo 0x87 => ZdoComplexDescRsp,
    Zdo 0x88 => ZdoUserDescRsp,
    Zdo 0x89 => ZdoUserDescConf,
    Zdo 0x8A => ZdoServerDiscRsp,
    Zdo 0xA0 => ZdoEndDeviceBindRsp,
    Zdo 0xA1 => ZdoBindRsp,
    Zdo 0xA2 => ZdoUnbindRsp,
    Zdo 0xB0 => ZdoMgmtNwkDiscRsp,
    Zdo 0xB1 => ZdoMgmtLqiRsp,
    Zdo 0xB2 => ZdoMgmtRtgRsp,
    Zdo 0xB3 => ZdoMgmtBindRsp,
    Zdo 0xB4 => ZdoMgmtLeaveRsp,
    Zdo 0xB5 => ZdoMgmtDirectJoinRsp,
    Zdo 0xB6 => ZdoMgmtPermitJoinRsp,
    Zdo 0xC0 => ZdoStateChangeInd,
    Zdo 0xC1 => ZdoEndDeviceAnnceInd,
    Zdo 0xC2 => ZdoMatchDescRpsSent,
    Zdo 0xC3 => ZdoStatusErrorRsp,
    Zdo 0xC4 => ZdoSrcRtgInd,
    Zdo 0xC5 => ZdoBeaconNotifyInd,
    Zdo 0xC6 => ZdoJoinCnf,
    Zdo 0xC7 => ZdoNwkDiscoveryCnf,
    Zdo 0xC9 => ZdoLeaveInd,
    Zdo 0xCA => ZdoTcDevInd,
    Zdo 0xCB => ZdoPermitJoinInd,
    Zdo 0xFF => ZdoMsgCbIncoming,

    AppCnf 0x80 => AppCnfBdbCommissioningNotification,

    Gp 0x01 => GpDataReq,
    Gp 0x02 => GpSecRsp,
    Gp 0x03 => GpSecReq,
    Gp 0x04 => GpDataInd,
    Gp 0x05 => GpDataCnf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::znp::types::{DeviceState, ResetReason};

    #[test]
    fn test_reset_indication_lookup() {
        let msg = AsyncMessage::decode(Subsystem::Sys, 0x80, &[0x00, 0x02, 0x01, 0x02, 0x00]).unwrap();
        let ind = SysResetInd::from_message(&msg).unwrap();
        assert_eq!(ind.reason, ResetReason::PowerUp);
        assert_eq!(msg.name(), "SysResetInd");
        assert_eq!(msg.key(), (Subsystem::Sys, 0x80));
        assert!(ZdoStateChangeInd::from_message(&msg).is_none());
    }

    #[test]
    fn test_unknown_key() {
        let err = AsyncMessage::decode(Subsystem::Zdo, 0xC8, &[]).unwrap_err();
        assert!(matches!(
            err,
            StackError::UnknownAsyncCommand { subsystem: Subsystem::Zdo, command: 0xC8 }
        ));
    }

    #[test]
    fn test_malformed_payload_is_codec_error() {
        let err = AsyncMessage::decode(Subsystem::Zdo, 0xC1, &[0x01]).unwrap_err();
        assert!(matches!(err, StackError::Codec(_)));
    }

    #[test]
    fn test_state_change() {
        let msg = AsyncMessage::decode(Subsystem::Zdo, 0xC0, &[0x09]).unwrap();
        assert_eq!(
            msg,
            AsyncMessage::ZdoStateChangeInd(ZdoStateChangeInd { state: DeviceState::StartedAsZigbeeCoordinator })
        );
    }
}
