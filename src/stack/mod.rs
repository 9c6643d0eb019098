// MIT License - Copyright (c) 2026 Peter Wright
// Device lifecycle on top of the coordinator

//! The [`Stack`] ties the multiplexer, the coordinator and the node database
//! together.
//!
//! Device announcements go to a single registration worker, so an
//! interrogation never interleaves with another. Leaves unregister the
//! device, and incoming AF messages from known devices are decoded and
//! forwarded to the caller.

mod interrogation;
mod zcl_commands;

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::capture::run_packet_capture;
use crate::config::StackConfig;
use crate::coordinator::{Coordinator, CoordinatorEvents};
use crate::device::Device;
use crate::error::{Result, StackError};
use crate::event::{event_channels, DeviceIncomingMessage, EventSenders, StackEvents};
use crate::nodedb::{NodeDatabase, SNAPSHOT_INTERVAL};
use crate::znp::messages::{AfIncomingMessage, ZdoEndDeviceAnnceInd};
use crate::znp::Znp;

const REGISTRATION_QUEUE: usize = 100;

pub struct Stack {
    coordinator: Arc<Coordinator>,
    db: Arc<NodeDatabase>,
}

/// Background tasks of a running stack.
pub struct StackHandle {
    znp: Znp,
    db: Arc<NodeDatabase>,
    multiplexer: Option<JoinHandle<Result<()>>>,
    dispatch: JoinHandle<()>,
    background: Vec<JoinHandle<()>>,
}

impl Stack {
    /// Start the multiplexer on `reader`/`writer`, bring the network up and
    /// begin dispatching device events.
    pub async fn start<R, W>(reader: R, writer: W, config: StackConfig) -> Result<(Arc<Self>, StackEvents, StackHandle)>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (stack, events, mut handle) = Self::launch(reader, writer, config)?;

        if let Err(e) = stack.coordinator.run().await {
            error!("Coordinator bring-up failed: {e}");
            if let Err(shutdown_err) = handle.shutdown_ref().await {
                debug!("Shutdown after failed bring-up: {shutdown_err}");
            }
            return Err(e);
        }
        handle.background.push(handle.db.spawn_snapshots(SNAPSHOT_INTERVAL));

        Ok((stack, events, handle))
    }

    /// Wire up every task without touching the radio.
    fn launch<R, W>(reader: R, writer: W, config: StackConfig) -> Result<(Arc<Self>, StackEvents, StackHandle)>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let db = Arc::new(NodeDatabase::open(&config.database_path)?);
        let (znp, tasks) = Znp::start(reader, writer);

        let mut background = Vec::new();
        if let Some(path) = config.packet_capture.clone() {
            // subscribe now so the first frames are captured too
            let frames = znp.inbound_frames();
            background.push(tokio::spawn(async move {
                if let Err(e) = run_packet_capture(&path, frames).await {
                    error!("Packet capture stopped: {e}");
                }
            }));
        }

        let (coordinator, coordinator_events, event_loop) = Coordinator::start(znp.clone(), tasks.errors, config);
        background.push(event_loop);

        let stack = Arc::new(Stack {
            coordinator,
            db: Arc::clone(&db),
        });
        let (senders, events) = event_channels();
        let dispatch = tokio::spawn(Arc::clone(&stack).dispatch(coordinator_events, senders));

        let handle = StackHandle {
            znp,
            db,
            multiplexer: Some(tasks.handle),
            dispatch,
            background,
        };
        Ok((stack, events, handle))
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn db(&self) -> &NodeDatabase {
        &self.db
    }

    pub fn devices(&self) -> Vec<Device> {
        self.db.devices()
    }

    pub fn device(&self, ieee_address: &str) -> Option<Device> {
        self.db.get_device(ieee_address)
    }

    async fn dispatch(self: Arc<Self>, mut events: CoordinatorEvents, senders: EventSenders) {
        let (queue, registrations) = mpsc::channel(REGISTRATION_QUEUE);
        let worker = tokio::spawn(Arc::clone(&self).registration_worker(registrations, senders.clone()));

        loop {
            tokio::select! {
                Some(announce) = events.announce.recv() => {
                    if let Err(e) = EventSenders::publish(&queue, announce, "registration queue") {
                        senders.report(e);
                    }
                }
                Some(leave) = events.leave.recv() => {
                    info!("Unregistering device: [{}]", leave.ext_addr);
                    if let Err(e) = self.unregister_device(&leave.ext_addr, &senders) {
                        senders.report(e);
                    }
                }
                Some(tc) = events.trust_center.recv() => {
                    debug!("device online change: {}", tc.src_ieee_addr);
                }
                Some(incoming) = events.incoming.recv() => {
                    if let Err(e) = self.process_incoming_message(&incoming, &senders) {
                        senders.report(e);
                    }
                }
                Some(err) = events.errors.recv() => {
                    if err.is_fatal() {
                        warn!("Stopping the multiplexer");
                        self.coordinator.znp().shutdown();
                    }
                    senders.report(err);
                }
                else => break,
            }
        }

        drop(queue);
        if let Err(e) = worker.await {
            error!("Registration worker failed: {e}");
        }
        debug!("Stack dispatch stopped");
    }

    async fn registration_worker(
        self: Arc<Self>,
        mut registrations: mpsc::Receiver<ZdoEndDeviceAnnceInd>,
        senders: EventSenders,
    ) {
        while let Some(announce) = registrations.recv().await {
            if let Err(e) = self.register_device(&announce, &senders).await {
                senders.report(e);
            }
        }
    }

    async fn register_device(&self, announce: &ZdoEndDeviceAnnceInd, senders: &EventSenders) -> Result<()> {
        info!("Registering device [{}]", announce.ieee_addr);

        if let Some(mut device) = self.db.get_device(&announce.ieee_addr) {
            debug!(
                "device {} already exists in DB. Updating network address",
                announce.ieee_addr
            );
            device.network_address = announce.nwk_addr.clone();
            self.db.insert_device(device.clone())?;
            return EventSenders::publish(&senders.became_available, device, "device became available");
        }

        let device = self.interrogate(announce).await?;
        self.db.insert_device(device.clone())?;
        info!(
            "Registered new device [{}]. Manufacturer: [{}], Model: [{}], Logical type: [{}]",
            device.ieee_address, device.manufacturer, device.model, device.logical_type
        );
        EventSenders::publish(&senders.registered, device, "device registered")
    }

    fn unregister_device(&self, ieee_address: &str, senders: &EventSenders) -> Result<()> {
        let device = self.db.remove_device(ieee_address)?;
        info!(
            "Unregistered device [{}]. Manufacturer: [{}], Model: [{}], Logical type: [{}]",
            ieee_address, device.manufacturer, device.model, device.logical_type
        );
        EventSenders::publish(&senders.unregistered, device, "device unregistered")
    }

    fn process_incoming_message(&self, incoming: &AfIncomingMessage, senders: &EventSenders) -> Result<()> {
        let message = self.coordinator.zcl().decode_incoming(incoming).inspect_err(|_| {
            debug!("Unsupported incoming message: {:?}", incoming);
        })?;

        let device = self
            .db
            .get_device_by_network_address(&incoming.src_addr)
            .ok_or_else(|| StackError::UnknownDevice(incoming.src_addr.clone()))?;
        self.db.record_seen(&incoming.src_addr, incoming.link_quality);

        EventSenders::publish(
            &senders.incoming,
            DeviceIncomingMessage { device, message },
            "device incoming message",
        )
    }
}

impl StackHandle {
    /// Resolves when the multiplexer stops by itself, e.g. on a serial failure.
    pub async fn stopped(&mut self) -> Result<()> {
        match self.multiplexer.take() {
            Some(multiplexer) => join(multiplexer).await,
            None => Ok(()),
        }
    }

    /// Stop every task and flush the node database.
    pub async fn shutdown(mut self) -> Result<()> {
        self.shutdown_ref().await
    }

    async fn shutdown_ref(&mut self) -> Result<()> {
        self.znp.shutdown();
        let result = self.stopped().await;

        // the coordinator event loop ends once the multiplexer has
        if let Err(e) = (&mut self.dispatch).await {
            debug!("Dispatch task: {e}");
        }
        for task in self.background.drain(..) {
            task.abort();
        }
        self.db.save()?;
        info!("Stack stopped");
        result
    }
}

async fn join(handle: JoinHandle<Result<()>>) -> Result<()> {
    handle.await.map_err(|e| StackError::Io(std::io::Error::other(e)))?
}
