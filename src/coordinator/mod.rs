// MIT License - Copyright (c) 2026 Peter Wright
// Coordinator: network bring-up, correlated requests and async routing

//! Coordinator on top of the ZNP multiplexer.
//!
//! [`Coordinator::start`] subscribes to the async fan-out and spawns the event
//! loop, which feeds the [`Subscriptions`] registry first and then routes
//! device announcements, leaves, trust center indications and incoming AF
//! messages to bounded channels. [`Coordinator::run`] performs bring-up.
//!
//! Every correlated request goes through [`Coordinator::send_and_wait`]: the
//! waiter is registered, the request sent, and the matching indication
//! awaited, retrying transient failures per [`RetryPolicy`].

mod bringup;
mod commands;
pub mod subscription;

use std::future::Future;
use std::sync::{Arc, OnceLock};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::{NetworkConfiguration, RetryPolicy, StackConfig};
use crate::error::{Result, StackError};
use crate::zcl::Zcl;
use crate::znp::messages::{AfIncomingMessage, ZdoEndDeviceAnnceInd, ZdoLeaveInd, ZdoTcDevInd};
use crate::znp::{AsyncMessage, Indication, Znp};

pub use subscription::{Subscription, Subscriptions};

const CHANNEL_CAPACITY: usize = 100;

/// Short address of the coordinator itself.
pub const COORDINATOR_NWK_ADDR: &str = "0x0000";

/// Receiving ends of the coordinator's routes.
pub struct CoordinatorEvents {
    pub announce: mpsc::Receiver<ZdoEndDeviceAnnceInd>,
    pub leave: mpsc::Receiver<ZdoLeaveInd>,
    pub trust_center: mpsc::Receiver<ZdoTcDevInd>,
    pub incoming: mpsc::Receiver<AfIncomingMessage>,
    pub errors: mpsc::Receiver<StackError>,
}

struct Routes {
    announce: mpsc::Sender<ZdoEndDeviceAnnceInd>,
    leave: mpsc::Sender<ZdoLeaveInd>,
    trust_center: mpsc::Sender<ZdoTcDevInd>,
    incoming: mpsc::Sender<AfIncomingMessage>,
    errors: mpsc::Sender<StackError>,
}

pub struct Coordinator {
    znp: Znp,
    config: StackConfig,
    subscriptions: Arc<Subscriptions>,
    zcl: Zcl,
    network_address: OnceLock<String>,
}

impl Coordinator {
    /// Attach to a running multiplexer and start the event loop.
    ///
    /// `znp_errors` is the multiplexer's error channel; the loop forwards it
    /// and stops once it closes, failing any outstanding waiters.
    pub fn start(
        znp: Znp,
        znp_errors: mpsc::Receiver<StackError>,
        config: StackConfig,
    ) -> (Arc<Self>, CoordinatorEvents, JoinHandle<()>) {
        let (announce_tx, announce) = mpsc::channel(CHANNEL_CAPACITY);
        let (leave_tx, leave) = mpsc::channel(CHANNEL_CAPACITY);
        let (trust_center_tx, trust_center) = mpsc::channel(CHANNEL_CAPACITY);
        let (incoming_tx, incoming) = mpsc::channel(CHANNEL_CAPACITY);
        let (errors_tx, errors) = mpsc::channel(CHANNEL_CAPACITY);

        let coordinator = Arc::new(Self {
            subscriptions: Subscriptions::new(),
            zcl: Zcl::new(),
            network_address: OnceLock::new(),
            config,
            znp,
        });

        let routes = Routes {
            announce: announce_tx,
            leave: leave_tx,
            trust_center: trust_center_tx,
            incoming: incoming_tx,
            errors: errors_tx,
        };
        // subscribe before anything is sent
        let messages = coordinator.znp.subscribe();
        let event_loop = tokio::spawn(route_messages(
            messages,
            znp_errors,
            Arc::clone(&coordinator.subscriptions),
            routes,
        ));

        let events = CoordinatorEvents {
            announce,
            leave,
            trust_center,
            incoming,
            errors,
        };
        (coordinator, events, event_loop)
    }

    pub fn znp(&self) -> &Znp {
        &self.znp
    }

    pub fn zcl(&self) -> &Zcl {
        &self.zcl
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub fn network_configuration(&self) -> &NetworkConfiguration {
        &self.config.network
    }

    /// The coordinator's short address, known after bring-up.
    pub fn network_address(&self) -> &str {
        self.network_address
            .get()
            .map(String::as_str)
            .unwrap_or(COORDINATOR_NWK_ADDR)
    }

    /// Register a waiter for `T`, run `send`, then wait for the waiter.
    ///
    /// Each attempt gets a fresh waiter. Transient failures are retried
    /// `policy.retries` times; the last error is returned.
    pub async fn send_and_wait<T, P, S, Fut>(&self, policy: RetryPolicy, filter: P, send: S) -> Result<T>
    where
        T: Indication,
        P: Fn(&T) -> bool + Clone + Send + 'static,
        S: Fn() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let (subscriptions, filter, send) = (&self.subscriptions, &filter, &send);
        retry(policy.retries, move || async move {
            let subscription = subscriptions.register::<T, _>(filter.clone());
            send().await?;
            subscription.wait(policy.timeout).await
        })
        .await
    }
}

/// Run `attempt` until it succeeds, fails permanently, or `retries` extra
/// attempts have been spent.
pub async fn retry<T, F, Fut>(retries: u32, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries_left = retries;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && retries_left > 0 => {
                warn!("{}. Retries left: {}", e, retries_left);
                retries_left -= 1;
            }
            Err(e) => {
                error!("failure: {}", e);
                return Err(e);
            }
        }
    }
}

async fn route_messages(
    mut messages: broadcast::Receiver<AsyncMessage>,
    mut znp_errors: mpsc::Receiver<StackError>,
    subscriptions: Arc<Subscriptions>,
    routes: Routes,
) {
    loop {
        tokio::select! {
            message = messages.recv() => match message {
                Ok(message) => {
                    subscriptions.dispatch(&message);
                    routes.route(message);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event loop fell behind, {} async message(s) dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            err = znp_errors.recv() => match err {
                Some(err) => routes.report(err),
                None => break,
            },
        }
    }
    subscriptions.close();
    debug!("Coordinator event loop stopped");
}

impl Routes {
    fn route(&self, message: AsyncMessage) {
        let name = message.name();
        match message {
            AsyncMessage::ZdoEndDeviceAnnceInd(announce) => self.publish(&self.announce, announce, "device announce"),
            AsyncMessage::ZdoLeaveInd(leave) => self.publish(&self.leave, leave, "device leave"),
            AsyncMessage::ZdoTcDevInd(tc) => self.publish(&self.trust_center, tc, "trust center"),
            AsyncMessage::AfIncomingMessage(incoming) => self.publish(&self.incoming, incoming, "incoming message"),
            // answers to reset, permit join and data requests; the registry handles them
            AsyncMessage::SysResetInd(_)
            | AsyncMessage::ZdoStateChangeInd(_)
            | AsyncMessage::ZdoPermitJoinInd(_)
            | AsyncMessage::ZdoMgmtPermitJoinRsp(_)
            | AsyncMessage::AfDataConfirm(_)
            | AsyncMessage::ZdoSrcRtgInd(_) => {}
            AsyncMessage::ZdoNodeDescRsp(_)
            | AsyncMessage::ZdoActiveEpRsp(_)
            | AsyncMessage::ZdoSimpleDescRsp(_)
            | AsyncMessage::ZdoBindRsp(_)
            | AsyncMessage::ZdoUnbindRsp(_) => {
                debug!("Interrogation response: {}", name);
            }
            other => error!("unexpected message type: {:?}", other),
        }
    }

    fn publish<T>(&self, channel: &mpsc::Sender<T>, value: T, name: &'static str) {
        match channel.try_send(value) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.report(StackError::ChannelFull(name)),
            Err(TrySendError::Closed(_)) => debug!("{} channel closed", name),
        }
    }

    fn report(&self, err: StackError) {
        if let Err(TrySendError::Full(err) | TrySendError::Closed(err)) = self.errors.try_send(err) {
            warn!("Dropping coordinator error: {}", err);
        }
    }
}
