// MIT License - Copyright (c) 2026 Peter Wright
// JSON node database

//! Persistent device list.
//!
//! The file is a single JSON document, `{"devices": [...]}`. Registrations
//! and removals are written through immediately; link quality and last-seen
//! times only mark the database dirty and reach the disk with the next
//! periodic snapshot.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::{Result, StackError};

/// How often dirty state is flushed.
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(30);

/// Volatile per-device state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub link_quality: u8,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    #[serde(flatten)]
    device: Device,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<DeviceState>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    devices: Vec<Record>,
}

#[derive(Debug, Default)]
struct Inner {
    document: Document,
    revision: u64,
}

pub struct NodeDatabase {
    path: PathBuf,
    inner: Mutex<Inner>,
    /// Serializes file writes and remembers the last revision written.
    saved: Mutex<u64>,
}

impl NodeDatabase {
    /// Load the database, creating an empty one if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Creating node database {}", path.display());
                let document = Document::default();
                write_document(&path, &document)?;
                document
            }
            Err(e) => return Err(e.into()),
        };
        debug!("Loaded {} device(s) from {}", document.devices.len(), path.display());

        Ok(Self {
            path,
            inner: Mutex::new(Inner { document, revision: 0 }),
            saved: Mutex::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a new device or update the one with the same IEEE address.
    ///
    /// A new device may not take a network address another device holds.
    pub fn insert_device(&self, device: Device) -> Result<()> {
        {
            let mut inner = self.lock();
            let devices = &mut inner.document.devices;
            match devices.iter_mut().find(|r| r.device.ieee_address == device.ieee_address) {
                Some(record) => record.device = device,
                None => {
                    if let Some(existing) = devices
                        .iter()
                        .find(|r| r.device.network_address == device.network_address)
                    {
                        return Err(StackError::AddressConflict {
                            network_address: device.network_address,
                            existing: existing.device.ieee_address.clone(),
                        });
                    }
                    devices.push(Record { device, state: None });
                }
            }
            inner.revision += 1;
        }
        self.save()?;
        Ok(())
    }

    pub fn get_device(&self, ieee_address: &str) -> Option<Device> {
        self.lock()
            .document
            .devices
            .iter()
            .find(|r| r.device.ieee_address == ieee_address)
            .map(|r| r.device.clone())
    }

    pub fn get_device_by_network_address(&self, network_address: &str) -> Option<Device> {
        self.lock()
            .document
            .devices
            .iter()
            .find(|r| r.device.network_address == network_address)
            .map(|r| r.device.clone())
    }

    /// Remove a device and return its last record.
    pub fn remove_device(&self, ieee_address: &str) -> Result<Device> {
        let removed = {
            let mut inner = self.lock();
            let devices = &mut inner.document.devices;
            let index = devices
                .iter()
                .position(|r| r.device.ieee_address == ieee_address)
                .ok_or_else(|| StackError::DeviceNotFound(ieee_address.to_string()))?;
            let record = devices.remove(index);
            inner.revision += 1;
            record.device
        };
        self.save()?;
        Ok(removed)
    }

    pub fn devices(&self) -> Vec<Device> {
        self.lock().document.devices.iter().map(|r| r.device.clone()).collect()
    }

    pub fn state(&self, ieee_address: &str) -> Option<DeviceState> {
        self.lock()
            .document
            .devices
            .iter()
            .find(|r| r.device.ieee_address == ieee_address)
            .and_then(|r| r.state.clone())
    }

    /// Note that a device was just heard from. Returns false for unknown addresses.
    pub fn record_seen(&self, network_address: &str, link_quality: u8) -> bool {
        let mut inner = self.lock();
        let Some(record) = inner
            .document
            .devices
            .iter_mut()
            .find(|r| r.device.network_address == network_address)
        else {
            return false;
        };
        record.state = Some(DeviceState {
            link_quality,
            last_seen: Utc::now(),
        });
        inner.revision += 1;
        true
    }

    /// Write the document if it changed since the last write.
    /// Returns whether anything was written.
    pub fn save(&self) -> Result<bool> {
        let mut saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);
        let (revision, json) = {
            let inner = self.lock();
            if inner.revision == *saved {
                return Ok(false);
            }
            (inner.revision, serde_json::to_string_pretty(&inner.document)?)
        };
        write_atomically(&self.path, json.as_bytes())?;
        *saved = revision;
        Ok(true)
    }

    /// Flush dirty state every `period` until the task is aborted.
    pub fn spawn_snapshots(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let db = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match db.save() {
                    Ok(true) => debug!("Node database snapshot written"),
                    Ok(false) => {}
                    Err(e) => warn!("Node database snapshot failed: {e}"),
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn write_document(path: &Path, document: &Document) -> Result<()> {
    let json = serde_json::to_string_pretty(document)?;
    write_atomically(path, json.as_bytes())
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ezstack-{}-{}.json", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    fn device(ieee: &str, nwk: &str) -> Device {
        Device {
            ieee_address: ieee.into(),
            network_address: nwk.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_initializes_missing_file() {
        let path = temp_path("init");
        let db = NodeDatabase::open(&path).unwrap();
        assert!(db.devices().is_empty());

        let on_disk: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, json!({ "devices": [] }));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_insert_updates_by_ieee_address() {
        let path = temp_path("update");
        let db = NodeDatabase::open(&path).unwrap();
        db.insert_device(device("0x0000000000000001", "0x1111")).unwrap();
        db.insert_device(device("0x0000000000000001", "0x2222")).unwrap();

        assert_eq!(db.devices().len(), 1);
        assert!(db.get_device_by_network_address("0x1111").is_none());
        assert_eq!(
            db.get_device_by_network_address("0x2222").unwrap().ieee_address,
            "0x0000000000000001"
        );

        let reopened = NodeDatabase::open(&path).unwrap();
        assert_eq!(reopened.get_device("0x0000000000000001").unwrap().network_address, "0x2222");
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_network_address_conflict() {
        let path = temp_path("conflict");
        let db = NodeDatabase::open(&path).unwrap();
        db.insert_device(device("0x0000000000000001", "0x1111")).unwrap();

        let err = db.insert_device(device("0x0000000000000002", "0x1111")).unwrap_err();
        assert!(matches!(err, StackError::AddressConflict { ref existing, .. } if existing == "0x0000000000000001"));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_remove_unknown_device() {
        let path = temp_path("remove");
        let db = NodeDatabase::open(&path).unwrap();
        db.insert_device(device("0x0000000000000001", "0x1111")).unwrap();

        let removed = db.remove_device("0x0000000000000001").unwrap();
        assert_eq!(removed.network_address, "0x1111");
        assert!(matches!(
            db.remove_device("0x0000000000000001"),
            Err(StackError::DeviceNotFound(_))
        ));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_snapshot_only_when_changed() {
        let path = temp_path("snapshot");
        let db = NodeDatabase::open(&path).unwrap();
        db.insert_device(device("0x0000000000000001", "0x1111")).unwrap();
        assert!(!db.save().unwrap());

        assert!(db.record_seen("0x1111", 200));
        assert!(!db.record_seen("0x9999", 200));
        assert!(db.save().unwrap());
        assert!(!db.save().unwrap());

        let on_disk: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["devices"][0]["ieee_address"], "0x0000000000000001");
        assert_eq!(on_disk["devices"][0]["state"]["link_quality"], 200);
        std::fs::remove_file(path).unwrap();
    }
}
