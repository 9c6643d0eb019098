// MIT License - Copyright (c) 2026 Peter Wright
// Channels from the stack to its caller

use tokio::sync::mpsc;

use crate::device::Device;
use crate::error::StackError;
use crate::zcl::ZclIncomingMessage;

/// An application-level message from a known device, e.g. a sensor report.
#[derive(Debug, Clone)]
pub struct DeviceIncomingMessage {
    pub device: Device,
    pub message: ZclIncomingMessage,
}

/// Type alias for a device lifecycle receiver.
pub type DeviceReceiver = mpsc::Receiver<Device>;

/// Type alias for the incoming message receiver.
pub type IncomingReceiver = mpsc::Receiver<DeviceIncomingMessage>;

pub(crate) const REGISTERED_CAPACITY: usize = 10;
pub(crate) const AVAILABLE_CAPACITY: usize = 10;
pub(crate) const UNREGISTERED_CAPACITY: usize = 10;
pub(crate) const INCOMING_CAPACITY: usize = 100;
pub(crate) const ERRORS_CAPACITY: usize = 100;

/// Everything the stack reports. Each channel is bounded; when one is full the
/// event is dropped and a `ChannelFull` error is reported instead.
pub struct StackEvents {
    /// A new device finished interrogation.
    pub registered: DeviceReceiver,
    /// A known device rejoined, possibly with a new network address.
    pub became_available: DeviceReceiver,
    pub unregistered: DeviceReceiver,
    pub incoming: IncomingReceiver,
    /// Per-message and per-device failures; the stack keeps running.
    pub errors: mpsc::Receiver<StackError>,
}

/// Sending halves, owned by the stack's tasks.
#[derive(Clone)]
pub(crate) struct EventSenders {
    pub registered: mpsc::Sender<Device>,
    pub became_available: mpsc::Sender<Device>,
    pub unregistered: mpsc::Sender<Device>,
    pub incoming: mpsc::Sender<DeviceIncomingMessage>,
    pub errors: mpsc::Sender<StackError>,
}

/// Create the stack's channels with their fixed capacities.
pub(crate) fn event_channels() -> (EventSenders, StackEvents) {
    let (registered_tx, registered) = mpsc::channel(REGISTERED_CAPACITY);
    let (available_tx, became_available) = mpsc::channel(AVAILABLE_CAPACITY);
    let (unregistered_tx, unregistered) = mpsc::channel(UNREGISTERED_CAPACITY);
    let (incoming_tx, incoming) = mpsc::channel(INCOMING_CAPACITY);
    let (errors_tx, errors) = mpsc::channel(ERRORS_CAPACITY);

    let senders = EventSenders {
        registered: registered_tx,
        became_available: available_tx,
        unregistered: unregistered_tx,
        incoming: incoming_tx,
        errors: errors_tx,
    };
    let events = StackEvents {
        registered,
        became_available,
        unregistered,
        incoming,
        errors,
    };
    (senders, events)
}

impl EventSenders {
    /// Publish without blocking; a full channel becomes an error.
    pub fn publish<T>(channel: &mpsc::Sender<T>, value: T, name: &'static str) -> Result<(), StackError> {
        match channel.try_send(value) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(StackError::ChannelFull(name)),
            // nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => Ok(()),
        }
    }

    /// Log `err` and queue it for the caller. Returns whether it was queued.
    pub fn report(&self, err: StackError) -> bool {
        tracing::error!("{}", err);
        match self.errors.try_send(err) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(err)) => {
                tracing::warn!("errors channel has no capacity, dropping: {}", err);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_full_channel_is_reported_not_blocking() {
        let (senders, mut events) = event_channels();
        for _ in 0..REGISTERED_CAPACITY {
            EventSenders::publish(&senders.registered, Device::default(), "device registered").unwrap();
        }
        let err = EventSenders::publish(&senders.registered, Device::default(), "device registered").unwrap_err();
        assert_eq!(err.to_string(), "device registered channel has no capacity");

        assert!(senders.report(err));
        assert!(matches!(events.errors.recv().await, Some(StackError::ChannelFull("device registered"))));
    }

    #[tokio::test]
    async fn test_full_errors_channel_drops_newest() {
        let (senders, mut events) = event_channels();
        for _ in 0..ERRORS_CAPACITY {
            assert!(senders.report(StackError::ChannelFull("incoming")));
        }
        assert!(!senders.report(StackError::ChannelFull("device registered")));

        let mut queued = 0;
        while let Ok(err) = events.errors.try_recv() {
            assert!(matches!(err, StackError::ChannelFull("incoming")));
            queued += 1;
        }
        assert_eq!(queued, ERRORS_CAPACITY);
    }
}
