// MIT License - Copyright (c) 2026 Peter Wright
// Network bring-up: reset, configure, start and register endpoints

use std::time::Duration;

use chrono::{Datelike, Local, Timelike};
use tracing::{debug, error, info, warn};

use crate::config::NetworkConfiguration;
use crate::error::{Result, StackError};
use crate::znp::commands::{
    config_id, AfRegister, SapiZbPermitJoiningRequest, SapiZbStartRequest, SapiZbWriteConfiguration, SysSetExtAddr,
    SysSetTime, SysTime, SysVersion, UtilCallbackSubCmd, UtilGetDeviceInfo, UtilGetNvInfo, UtilLedControl,
    UtilSetChannels, UtilSetPanId, UtilSetPreCfgKey,
};
use crate::znp::nvram::ExtPanId;
use crate::znp::{profile, Action, Channels, Latency, LedMode, LogicalType, Status, SubsystemId};

use super::Coordinator;

/// How long joining stays open when enabled, in seconds.
pub const PERMIT_JOIN_SECONDS: u8 = 120;

/// Endpoint `n` is registered for the `n`th profile.
const PROFILES: [u16; 6] = [
    profile::HOME_AUTOMATION,
    profile::INDUSTRIAL_PLANT_MONITORING,
    profile::COMMERCIAL_BUILDING_AUTOMATION,
    profile::TELECOM_APPLICATIONS,
    profile::PERSONAL_HOME_AND_HOSPITAL_CARE,
    profile::ADVANCED_METERING_INITIATIVE,
];

const APP_DEVICE_ID: u16 = 0x0005;

impl Coordinator {
    /// Bring the radio up as coordinator of the configured network.
    pub async fn run(&self) -> Result<()> {
        self.reset().await?;
        self.set_time().await?;

        let version = self.znp.send_sync(&SysVersion {}).await?;
        info!(
            "starting, firmware v{}.{}.{} (transport v{})",
            version.major_rel, version.minor_rel, version.maint_rel, version.transport_rev
        );

        self.configure_and_reset().await?;

        self.znp
            .send_sync(&UtilCallbackSubCmd {
                subsystem_id: SubsystemId::AllSubsystems,
                action: Action::Enable,
            })
            .await?
            .status
            .to_result()?;
        self.znp.send_sync(&SapiZbStartRequest {}).await?;

        let device_info = self.znp.send_sync(&UtilGetDeviceInfo {}).await?;
        debug!(
            "Device info: status={} ieee={} nwk={} state={:?} associated={:?}",
            device_info.status,
            device_info.ieee_addr,
            device_info.short_addr,
            device_info.device_state,
            device_info.assoc_devices_list
        );
        let _ = self.network_address.set(device_info.short_addr);

        self.set_led(self.config.led).await?;
        self.register_endpoints().await?;

        if self.config.permit_join {
            warn!("permitting joining");
        }
        self.permit_join(self.config.permit_join).await?;

        info!("running");
        Ok(())
    }

    /// Push the local wall-clock time to the radio.
    pub async fn set_time(&self) -> Result<()> {
        let now = Local::now();
        let time = SysTime {
            utc_time: 0,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
            month: now.month() as u8,
            day: now.day() as u8,
            year: now.year() as u16,
        };
        self.znp.send_sync(&SysSetTime { time }).await?.status.to_result()
    }

    /// The network parameters currently persisted on the radio.
    pub async fn read_network_config(&self) -> Result<NetworkConfiguration> {
        let nv_info = self.znp.send_sync(&UtilGetNvInfo {}).await?;
        let ext_pan_id = self.znp.nv_read::<ExtPanId>().await?;
        Ok(NetworkConfiguration {
            ieee_address: nv_info.ieee_addr.clone(),
            pan_id: nv_info.pan_id,
            ext_pan_id: ext_pan_id.extended_pan_id,
            network_key: nv_info.pre_config_key,
            channel: nv_info.channels().only_channel()?,
        })
    }

    /// Flash the configured network parameters if the radio disagrees.
    ///
    /// Flashing only happens with `settings_flash`; otherwise a mismatch is
    /// [`StackError::ConfigMismatch`]. Any failed step aborts the sequence.
    pub async fn configure_and_reset(&self) -> Result<()> {
        let desired = &self.config.network;
        let actual = self.read_network_config().await?;
        let diff = desired.diff(&actual);
        if diff.is_empty() {
            return Ok(());
        }
        if !self.config.settings_flash {
            return Err(StackError::ConfigMismatch(diff));
        }

        error!("mismatching config - flashing");
        for field in &diff {
            info!("{}: {} -> {}", field.field, field.actual, field.expected);
        }

        let znp = &self.znp;
        znp.send_sync(&UtilSetPreCfgKey {
            pre_cfg_key: desired.network_key,
        })
        .await?
        .status
        .to_result()?;
        self.write_configuration(config_id::LOGICAL_TYPE, vec![LogicalType::Coordinator.into()])
            .await?;
        znp.send_sync(&UtilSetPanId { pan_id: desired.pan_id })
            .await?
            .status
            .to_result()?;
        znp.nv_write(&ExtPanId {
            extended_pan_id: desired.ext_pan_id,
        })
        .await?;
        self.write_configuration(config_id::ZDO_DIRECT_CB, vec![1]).await?;
        self.write_configuration(config_id::SECURITY_MODE, vec![1]).await?;
        znp.send_sync(&SysSetExtAddr {
            ext_address: desired.ieee_address.clone(),
        })
        .await?
        .status
        .to_result()?;
        znp.send_sync(&UtilSetChannels {
            channels: Channels::single(desired.channel)?,
        })
        .await?
        .status
        .to_result()?;

        self.reset().await?;
        Ok(())
    }

    /// Open joining for [`PERMIT_JOIN_SECONDS`], or close it.
    pub async fn permit_join(&self, enabled: bool) -> Result<()> {
        let timeout = if enabled { PERMIT_JOIN_SECONDS } else { 0 };
        self.znp
            .send_sync(&SapiZbPermitJoiningRequest {
                destination: self.network_address().to_string(),
                timeout,
            })
            .await?
            .status
            .to_result()?;

        if enabled {
            tokio::spawn(async {
                tokio::time::sleep(Duration::from_secs(u64::from(PERMIT_JOIN_SECONDS))).await;
                info!("join period passed");
            });
        }
        Ok(())
    }

    pub async fn set_led(&self, on: bool) -> Result<()> {
        let mode = if on { LedMode::On } else { LedMode::Off };
        self.znp
            .send_sync(&UtilLedControl { led_id: 1, mode })
            .await?
            .status
            .to_result()
    }

    async fn register_endpoints(&self) -> Result<()> {
        for (endpoint, app_prof_id) in (1u8..).zip(PROFILES) {
            let status = self
                .znp
                .send_sync(&AfRegister {
                    end_point: endpoint,
                    app_prof_id,
                    app_device_id: APP_DEVICE_ID,
                    add_dev_ver: 1,
                    latency_req: Latency::NoLatency,
                    app_in_cluster_list: Vec::new(),
                    app_out_cluster_list: Vec::new(),
                })
                .await?
                .status;
            match status {
                // already registered before a soft reset
                Status::ApsDuplicateEntry => debug!("Endpoint {} already registered", endpoint),
                status => status.to_result()?,
            }
        }
        Ok(())
    }

    async fn write_configuration(&self, config_id: u8, value: Vec<u8>) -> Result<()> {
        self.znp
            .send_sync(&SapiZbWriteConfiguration { config_id, value })
            .await?
            .status
            .to_result()
    }
}
