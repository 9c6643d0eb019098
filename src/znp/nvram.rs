// MIT License - Copyright (c) 2026 Peter Wright
// Typed items in the radio's non-volatile memory

use tracing::debug;

use crate::codec::{self, Wire};
use crate::error::Result;

use super::commands::{SysOsalNvRead, SysOsalNvWrite};
use super::types::LogicalType;
use super::Znp;

/// A parameter stored in a fixed NV slot.
pub trait NvItem: Wire {
    const ID: u16;
}

macro_rules! nv_items {
    ($( $(#[$meta:meta])* $name:ident = $id:literal { $field:ident : $ty:ty } ),+ $(,)?) => {
        $(
            wire_struct! {
                $(#[$meta])*
                #[derive(Debug, Clone, PartialEq, Eq)]
                pub struct $name {
                    pub $field: $ty,
                }
            }

            impl NvItem for $name {
                const ID: u16 = $id;
            }
        )+
    };
}

nv_items! {
    StartUpOption = 0x0003 { start_option: u8 },
    NvLogicalType = 0x0087 { logical_type: LogicalType },
    SecurityMode = 0x0064 { enabled: u8 },
    PreCfgKeysEnable = 0x0063 { enabled: u8 },
    PreCfgKey = 0x0062 { network_key: [u8; 16] },
    ZdoDirectCb = 0x008f { enabled: u8 },
    /// Little-endian channel bitmask.
    ChanList = 0x0084 { channels: [u8; 4] },
    PanId = 0x0083 { pan_id: u16 },
    ExtPanId = 0x002d { extended_pan_id: u64 },
    /// Required by Z-Stack releases before 3.x.
    UseDefaultTclk = 0x006d { enabled: u8 },
}

impl Znp {
    /// Read an item from offset zero of its slot.
    pub async fn nv_read<T: NvItem>(&self) -> Result<T> {
        let rsp = self.send_sync(&SysOsalNvRead { id: T::ID, offset: 0 }).await?;
        rsp.status.to_result()?;
        debug!("NV read {:#06x}: {} byte(s)", T::ID, rsp.value.len());
        Ok(codec::decode(&rsp.value)?)
    }

    pub async fn nv_write<T: NvItem>(&self, item: &T) -> Result<()> {
        let value = codec::encode(item)?;
        let rsp = self
            .send_sync(&SysOsalNvWrite {
                id: T::ID,
                offset: 0,
                value,
            })
            .await?;
        rsp.status.to_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;
    use crate::unp::{read_frame, write_frame, CommandType, Frame, Subsystem};
    use crate::znp::Status;
    use tokio::io::{duplex, split};

    #[tokio::test]
    async fn test_nv_read_decodes_value() {
        let (host, radio) = duplex(256);
        let (r, w) = split(host);
        let (mut radio_r, mut radio_w) = split(radio);
        let (znp, _tasks) = Znp::start(r, w);

        let pending = tokio::spawn({
            let znp = znp.clone();
            async move { znp.nv_read::<ExtPanId>().await }
        });

        let request = read_frame(&mut radio_r).await.unwrap();
        assert_eq!(request.payload, vec![0x2d, 0x00, 0x00]);
        let mut payload = vec![0x00, 0x08];
        payload.extend_from_slice(&0xdddd_dddd_dddd_dddd_u64.to_le_bytes());
        write_frame(&mut radio_w, &Frame::new(CommandType::Srsp, Subsystem::Sys, 0x08, payload))
            .await
            .unwrap();

        let item = pending.await.unwrap().unwrap();
        assert_eq!(item.extended_pan_id, 0xdddd_dddd_dddd_dddd);
    }

    #[tokio::test]
    async fn test_nv_write_checks_status() {
        let (host, radio) = duplex(256);
        let (r, w) = split(host);
        let (mut radio_r, mut radio_w) = split(radio);
        let (znp, _tasks) = Znp::start(r, w);

        let pending = tokio::spawn({
            let znp = znp.clone();
            async move { znp.nv_write(&PanId { pan_id: 0x1a62 }).await }
        });

        let request = read_frame(&mut radio_r).await.unwrap();
        assert_eq!(request.payload, vec![0x83, 0x00, 0x00, 0x02, 0x62, 0x1a]);
        write_frame(&mut radio_w, &Frame::new(CommandType::Srsp, Subsystem::Sys, 0x09, vec![0x0a]))
            .await
            .unwrap();

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, StackError::Status(Status::InitializationFailed)));
    }
}
