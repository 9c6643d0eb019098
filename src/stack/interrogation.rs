// MIT License - Copyright (c) 2026 Peter Wright
// Building a device record from ZDO and Basic cluster queries

use std::future::Future;

use tracing::debug;

use crate::device::{Device, Endpoint, PowerSource};
use crate::error::{Result, StackError};
use crate::zcl::cluster::attr::{BASIC_MANUFACTURER_NAME, BASIC_MODEL_ID, BASIC_POWER_SOURCE};
use crate::zcl::ClusterId;
use crate::znp::messages::ZdoEndDeviceAnnceInd;
use crate::znp::CapInfo;

use super::Stack;

impl Stack {
    /// Query everything needed for a [`Device`] record.
    ///
    /// Any failed step aborts the whole interrogation; the next announce
    /// starts over.
    pub(super) async fn interrogate(&self, announce: &ZdoEndDeviceAnnceInd) -> Result<Device> {
        let nwk = announce.nwk_addr.as_str();
        let coordinator = &self.coordinator;

        let basic = step(
            "querying basic metadata",
            self.read_attributes(
                nwk,
                ClusterId::Basic.into(),
                vec![BASIC_MANUFACTURER_NAME, BASIC_MODEL_ID, BASIC_POWER_SOURCE],
            ),
        )
        .await?;
        let text = |id| basic.value(id).and_then(|v| v.as_str()).unwrap_or_default().to_string();
        let manufacturer = text(BASIC_MANUFACTURER_NAME);
        let model = text(BASIC_MODEL_ID);
        let power_source = match basic.value(BASIC_POWER_SOURCE).and_then(|v| v.as_u64()) {
            Some(raw) => PowerSource::from_attribute(raw).map_err(|e| failed("querying basic metadata", e))?,
            None => PowerSource::Unknown,
        };

        let node = step("querying node description", coordinator.node_description(nwk)).await?;
        let active = step("querying active endpoints", coordinator.active_endpoints(nwk)).await?;

        let mut endpoints = Vec::with_capacity(active.active_ep_list.len());
        for &id in &active.active_ep_list {
            let descriptor = step(
                format!("query endpoint {id} description"),
                coordinator.simple_description(nwk, id),
            )
            .await?;
            endpoints.push(Endpoint {
                id: descriptor.endpoint,
                profile_id: descriptor.profile_id,
                device_id: descriptor.device_id,
                device_version: descriptor.device_version,
                in_cluster_list: descriptor.in_cluster_list,
                out_cluster_list: descriptor.out_cluster_list,
            });
        }
        debug!("Interrogated {}: {} endpoint(s)", announce.ieee_addr, endpoints.len());

        Ok(Device {
            ieee_address: announce.ieee_addr.clone(),
            network_address: announce.nwk_addr.clone(),
            manufacturer,
            manufacturer_id: node.manufacturer_code,
            model,
            logical_type: node.logical_type,
            main_powered: announce.capabilities.contains(CapInfo::MAIN_POWERED),
            power_source,
            endpoints,
        })
    }
}

async fn step<T>(name: impl Into<String>, query: impl Future<Output = Result<T>>) -> Result<T> {
    query.await.map_err(|source| failed(name, source))
}

fn failed(step: impl Into<String>, source: StackError) -> StackError {
    StackError::Interrogation {
        step: step.into(),
        source: Box::new(source),
    }
}
