// MIT License - Copyright (c) 2026 Peter Wright
// Zigbee coordinator stack for TI Z-Stack network processors
//
//! # ezstack
//!
//! Drives a TI CC253x/CC26xx radio running Z-Stack in network processor
//! mode (ZNP) over a serial link and acts as the Zigbee coordinator.
//!
//! The layers, bottom up:
//! - [`codec`]: declarative little-endian binary records
//! - [`unp`]: serial frame format
//! - [`znp`]: request/response multiplexer and typed ZNP commands
//! - [`zcl`]: Zigbee Cluster Library frames, global and cluster commands
//! - [`coordinator`]: network bring-up and correlated requests
//! - [`Stack`]: device registration, interrogation and the node database
//!
//! ## Quick Start
//!
//! ```no_run
//! use ezstack::{NetworkConfiguration, Stack, StackConfig};
//! use ezstack::zcl::cluster::Toggle;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StackConfig::builder()
//!         .network(NetworkConfiguration {
//!             ieee_address: "0x00124b0001020304".into(),
//!             pan_id: 0x1a62,
//!             ext_pan_id: 0xdddd_dddd_dddd_dddd,
//!             network_key: [1, 3, 5, 7, 9, 11, 13, 15, 0, 2, 4, 6, 8, 10, 12, 13],
//!             channel: 11,
//!         })
//!         .serial_port("/dev/ttyACM0")
//!         .permit_join(true)
//!         .build();
//!
//!     let (reader, writer) = tokio::io::split(tokio::io::duplex(64).0);
//!     let (stack, mut events, handle) = Stack::start(reader, writer, config).await?;
//!
//!     while let Some(device) = events.registered.recv().await {
//!         println!("Registered {} {}", device.manufacturer, device.model);
//!         stack.local_command(&(&device).into(), Toggle {}).await?;
//!     }
//!
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

#[macro_use]
pub mod codec;

pub mod capture;
pub mod config;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod event;
pub mod nodedb;
pub mod serial;
pub mod stack;
pub mod unp;
pub mod zcl;
pub mod znp;

// Re-exports for convenience
pub use config::{NetworkConfiguration, RetryPolicy, SerialConfig, StackConfig, StackConfigBuilder, Timeouts};
pub use coordinator::Coordinator;
pub use device::{Device, DeviceAndEndpoint, Endpoint, PowerSource};
pub use error::{Result, StackError};
pub use event::{DeviceIncomingMessage, StackEvents};
pub use nodedb::NodeDatabase;
pub use stack::{Stack, StackHandle};
pub use zcl::{ZclFrame, ZclIncomingMessage};
