// MIT License - Copyright (c) 2026 Peter Wright
// Request multiplexer: typed requests in, typed async messages out

//! ZNP request multiplexer.
//!
//! [`Znp::start`] takes ownership of the two halves of a byte transport and
//! spawns three tasks:
//!
//! * **serial RX** reads frames and hands them to the inbound task,
//! * **inbound** routes SRSP frames to the outbound task and decodes AREQ
//!   frames into [`AsyncMessage`]s for the broadcast fan-out,
//! * **outbound** writes queued requests in submission order. After writing
//!   a synchronous request it waits for that request's SRSP (or its deadline)
//!   before taking the next item, so at most one SREQ is in flight.
//!
//! A read error stops all three tasks. Requests that are queued or in flight
//! at that point resolve with [`StackError::TransportClosed`].

pub mod commands;
pub mod messages;
pub mod nvram;
pub mod registry;
pub mod types;

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout_at, Duration, Instant};
use tracing::{debug, error, warn};

use crate::codec;
use crate::error::{Result, StackError};
use crate::unp::{self, CommandType, Frame};

pub use commands::{AsyncRequest, Request, SyncRequest};
pub use registry::{AsyncMessage, Indication};
pub use types::*;

/// Time a synchronous request may take from submission to response.
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(5);

const QUEUE_CAPACITY: usize = 32;
const ASYNC_CAPACITY: usize = 64;
const ERRORS_CAPACITY: usize = 100;
const FRAME_LOG_CAPACITY: usize = 100;

enum Outgoing {
    Sync {
        frame: Frame,
        name: &'static str,
        timeout: Duration,
        deadline: Instant,
        reply: oneshot::Sender<Result<Frame>>,
    },
    Async {
        frame: Frame,
    },
}

/// Handle to a running multiplexer. Cheap to clone.
#[derive(Clone)]
pub struct Znp {
    outbound: mpsc::Sender<Outgoing>,
    async_tx: broadcast::Sender<AsyncMessage>,
    frames_tx: broadcast::Sender<Frame>,
    shutdown: Arc<watch::Sender<bool>>,
    sync_timeout: Duration,
}

/// Owner's side of the multiplexer tasks.
pub struct ZnpTasks {
    /// Non-fatal errors: undecodable async frames, stray responses.
    pub errors: mpsc::Receiver<StackError>,
    /// Resolves when all three tasks have stopped, with the first failure.
    pub handle: JoinHandle<Result<()>>,
}

impl Znp {
    pub fn start<R, W>(reader: R, writer: W) -> (Self, ZnpTasks)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::start_with_timeout(reader, writer, SYNC_TIMEOUT)
    }

    pub fn start_with_timeout<R, W>(reader: R, writer: W, sync_timeout: Duration) -> (Self, ZnpTasks)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (srsp_tx, srsp_rx) = mpsc::channel(1);
        let (async_tx, _) = broadcast::channel(ASYNC_CAPACITY);
        let (frames_tx, _) = broadcast::channel(FRAME_LOG_CAPACITY);
        let (errors_tx, errors_rx) = mpsc::channel(ERRORS_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shutdown = Arc::new(shutdown_tx);

        let rx_task = tokio::spawn(serial_rx(
            reader,
            inbound_tx,
            frames_tx.clone(),
            errors_tx.clone(),
            shutdown_rx,
        ));
        let inbound_task = tokio::spawn(inbound(inbound_rx, srsp_tx, async_tx.clone(), errors_tx.clone()));
        let outbound_task = tokio::spawn(outbound(writer, outbound_rx, srsp_rx, errors_tx, shutdown.clone()));

        let handle = tokio::spawn(async move {
            let (rx, inbound, outbound) = tokio::join!(rx_task, inbound_task, outbound_task);
            for result in [rx, inbound, outbound] {
                result.map_err(|e| StackError::Io(std::io::Error::other(e)))??;
            }
            Ok(())
        });

        let znp = Self {
            outbound: outbound_tx,
            async_tx,
            frames_tx,
            shutdown,
            sync_timeout,
        };
        (
            znp,
            ZnpTasks {
                errors: errors_rx,
                handle,
            },
        )
    }

    /// Send a request and wait for its paired response.
    pub async fn send_sync<T: SyncRequest>(&self, request: &T) -> Result<T::Response> {
        let frame = Frame::new(CommandType::Sreq, T::SUBSYSTEM, T::COMMAND, codec::encode(request)?);
        let deadline = Instant::now() + self.sync_timeout;
        let (reply, response) = oneshot::channel();

        self.outbound
            .send(Outgoing::Sync {
                frame,
                name: T::NAME,
                timeout: self.sync_timeout,
                deadline,
                reply,
            })
            .await
            .map_err(|_| StackError::TransportClosed)?;

        let frame = match timeout_at(deadline, response).await {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) => return Err(StackError::TransportClosed),
            Err(_) => return Err(StackError::Timeout(self.sync_timeout, T::NAME)),
        };
        Ok(codec::decode(&frame.payload)?)
    }

    /// Queue a fire-and-forget request.
    pub async fn send_async<T: AsyncRequest>(&self, request: &T) -> Result<()> {
        let frame = Frame::new(CommandType::Areq, T::SUBSYSTEM, T::COMMAND, codec::encode(request)?);
        self.outbound
            .send(Outgoing::Async { frame })
            .await
            .map_err(|_| StackError::TransportClosed)
    }

    /// Receive every async message decoded from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AsyncMessage> {
        self.async_tx.subscribe()
    }

    /// Receive every inbound frame, for packet capture.
    pub fn inbound_frames(&self) -> broadcast::Receiver<Frame> {
        self.frames_tx.subscribe()
    }

    /// Stop all tasks. Outstanding requests fail with `TransportClosed`.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

fn report(errors: &mpsc::Sender<StackError>, err: StackError) {
    warn!("{}", err);
    if let Err(mpsc::error::TrySendError::Full(err)) = errors.try_send(err) {
        warn!("error channel full, dropping: {}", err);
    }
}

async fn serial_rx<R: AsyncRead + Unpin>(
    mut reader: R,
    inbound: mpsc::Sender<Frame>,
    frames: broadcast::Sender<Frame>,
    errors: mpsc::Sender<StackError>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        if *shutdown.borrow() {
            return Ok(());
        }

        let result = tokio::select! {
            _ = shutdown.changed() => return Ok(()),
            result = unp::read_frame(&mut reader) => result,
        };

        match result {
            Ok(frame) => {
                debug!("<- {}", frame);
                let _ = frames.send(frame.clone());
                if inbound.send(frame).await.is_err() {
                    return Ok(());
                }
            }
            Err(e) => {
                error!("Serial read failed: {}", e);
                let _ = errors.try_send(StackError::TransportClosed);
                return Err(e);
            }
        }
    }
}

async fn inbound(
    mut frames: mpsc::Receiver<Frame>,
    srsp: mpsc::Sender<Frame>,
    async_tx: broadcast::Sender<AsyncMessage>,
    errors: mpsc::Sender<StackError>,
) -> Result<()> {
    while let Some(frame) = frames.recv().await {
        match frame.command_type {
            CommandType::Srsp => {
                if srsp.send(frame).await.is_err() {
                    break;
                }
            }
            CommandType::Areq => match AsyncMessage::decode(frame.subsystem, frame.command, &frame.payload) {
                Ok(message) => {
                    debug!("Async message: {}", message.name());
                    if async_tx.send(message).is_err() {
                        debug!("No async subscribers");
                    }
                }
                Err(e) => report(&errors, e),
            },
            other => report(
                &errors,
                StackError::UnsupportedFrame {
                    command_type: other,
                    subsystem: frame.subsystem,
                },
            ),
        }
    }
    Ok(())
}

async fn outbound<W: AsyncWrite + Unpin>(
    writer: W,
    queue: mpsc::Receiver<Outgoing>,
    srsp: mpsc::Receiver<Frame>,
    errors: mpsc::Sender<StackError>,
    shutdown: Arc<watch::Sender<bool>>,
) -> Result<()> {
    let result = outbound_loop(writer, queue, srsp, &errors).await;
    shutdown.send_replace(true);
    result
}

async fn outbound_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut queue: mpsc::Receiver<Outgoing>,
    mut srsp: mpsc::Receiver<Frame>,
    errors: &mpsc::Sender<StackError>,
) -> Result<()> {
    loop {
        let outgoing = tokio::select! {
            next = queue.recv() => match next {
                Some(outgoing) => outgoing,
                None => return Ok(()),
            },
            stray = srsp.recv() => match stray {
                Some(frame) => {
                    report(
                        errors,
                        StackError::SrspWithoutRequest {
                            subsystem: frame.subsystem,
                            command: frame.command,
                        },
                    );
                    continue;
                }
                None => return Ok(()),
            },
        };

        match outgoing {
            Outgoing::Async { frame } => {
                debug!("-> {}", frame);
                unp::write_frame(&mut writer, &frame).await?;
            }
            Outgoing::Sync {
                frame,
                name,
                timeout,
                deadline,
                mut reply,
            } => {
                if Instant::now() >= deadline || reply.is_closed() {
                    let _ = reply.send(Err(StackError::Timeout(timeout, name)));
                    continue;
                }

                debug!("-> {}", frame);
                if let Err(e) = unp::write_frame(&mut writer, &frame).await {
                    let _ = reply.send(Err(StackError::TransportClosed));
                    return Err(e);
                }

                // the next request waits until this one is answered or abandoned
                let outcome = loop {
                    tokio::select! {
                        response = srsp.recv() => match response {
                            Some(response) => match response.error_code() {
                                Some(code) => {
                                    break Some(Err(StackError::ErrorFrame {
                                        subsystem: frame.subsystem,
                                        command: frame.command,
                                        code,
                                    }))
                                }
                                None if response.subsystem == frame.subsystem
                                    && response.command == frame.command =>
                                {
                                    break Some(Ok(response))
                                }
                                // a late answer to an abandoned request
                                None => report(
                                    errors,
                                    StackError::SrspWithoutRequest {
                                        subsystem: response.subsystem,
                                        command: response.command,
                                    },
                                ),
                            },
                            None => break Some(Err(StackError::TransportClosed)),
                        },
                        _ = sleep_until(deadline) => {
                            break Some(Err(StackError::Timeout(timeout, name)))
                        }
                        _ = reply.closed() => break None,
                    }
                };

                if let Some(outcome) = outcome {
                    let _ = reply.send(outcome);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unp::{read_frame, write_frame, Subsystem};
    use crate::znp::commands::{SysPing, SysResetReq};
    use crate::znp::messages::SysResetInd;
    use tokio::io::{duplex, split, DuplexStream, ReadHalf, WriteHalf};

    struct Radio {
        reader: ReadHalf<DuplexStream>,
        writer: WriteHalf<DuplexStream>,
    }

    impl Radio {
        async fn expect_frame(&mut self) -> Frame {
            read_frame(&mut self.reader).await.unwrap()
        }

        async fn send(&mut self, command_type: CommandType, subsystem: Subsystem, command: u8, payload: Vec<u8>) {
            write_frame(&mut self.writer, &Frame::new(command_type, subsystem, command, payload))
                .await
                .unwrap();
        }
    }

    fn setup(sync_timeout: Duration) -> (Znp, ZnpTasks, Radio) {
        let (host, radio) = duplex(1024);
        let (host_reader, host_writer) = split(host);
        let (reader, writer) = split(radio);
        let (znp, tasks) = Znp::start_with_timeout(host_reader, host_writer, sync_timeout);
        (znp, tasks, Radio { reader, writer })
    }

    #[tokio::test]
    async fn test_sync_request_gets_typed_response() {
        let (znp, _tasks, mut radio) = setup(SYNC_TIMEOUT);
        let pending = tokio::spawn({
            let znp = znp.clone();
            async move { znp.send_sync(&SysPing {}).await }
        });

        let request = radio.expect_frame().await;
        assert_eq!(request.command_type, CommandType::Sreq);
        assert_eq!(request.subsystem, Subsystem::Sys);
        assert_eq!(request.command, 0x01);
        radio.send(CommandType::Srsp, Subsystem::Sys, 0x01, vec![0x79, 0x01]).await;

        let response = pending.await.unwrap().unwrap();
        assert!(response.capabilities.contains(Capabilities::SYS | Capabilities::APP));
    }

    #[tokio::test]
    async fn test_second_sync_request_waits_for_first_response() {
        let (znp, _tasks, mut radio) = setup(SYNC_TIMEOUT);
        let first = tokio::spawn({
            let znp = znp.clone();
            async move { znp.send_sync(&SysPing {}).await }
        });
        let second = tokio::spawn({
            let znp = znp.clone();
            async move { znp.send_sync(&SysPing {}).await }
        });

        radio.expect_frame().await;
        let early = tokio::time::timeout(Duration::from_millis(100), read_frame(&mut radio.reader)).await;
        assert!(early.is_err(), "second request was sent before the first was answered");

        radio.send(CommandType::Srsp, Subsystem::Sys, 0x01, vec![0x01, 0x00]).await;
        radio.expect_frame().await;
        radio.send(CommandType::Srsp, Subsystem::Sys, 0x01, vec![0x01, 0x00]).await;

        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_error_frame_fails_request() {
        let (znp, _tasks, mut radio) = setup(SYNC_TIMEOUT);
        let pending = tokio::spawn({
            let znp = znp.clone();
            async move { znp.send_sync(&SysPing {}).await }
        });

        radio.expect_frame().await;
        radio.send(CommandType::Srsp, Subsystem::Res0, 0x00, vec![0x02]).await;

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, StackError::ErrorFrame { subsystem: Subsystem::Sys, command: 0x01, .. }));
    }

    #[tokio::test]
    async fn test_response_to_another_command_is_not_paired() {
        let (znp, mut tasks, mut radio) = setup(SYNC_TIMEOUT);
        let pending = tokio::spawn({
            let znp = znp.clone();
            async move { znp.send_sync(&SysPing {}).await }
        });

        radio.expect_frame().await;
        radio.send(CommandType::Srsp, Subsystem::Zdo, 0x05, vec![0x01, 0x00]).await;
        let err = tasks.errors.recv().await.unwrap();
        assert!(matches!(err, StackError::SrspWithoutRequest { subsystem: Subsystem::Zdo, command: 0x05 }));
        assert!(!pending.is_finished());

        radio.send(CommandType::Srsp, Subsystem::Sys, 0x01, vec![0x79, 0x01]).await;
        let response = pending.await.unwrap().unwrap();
        assert!(response.capabilities.contains(Capabilities::SYS));
    }

    #[tokio::test]
    async fn test_response_to_another_command_times_out() {
        let (znp, _tasks, mut radio) = setup(Duration::from_millis(100));
        let pending = tokio::spawn({
            let znp = znp.clone();
            async move { znp.send_sync(&SysPing {}).await }
        });

        radio.expect_frame().await;
        radio.send(CommandType::Srsp, Subsystem::Zdo, 0x05, vec![0x01, 0x00]).await;
        assert!(matches!(pending.await.unwrap().unwrap_err(), StackError::Timeout(..)));
    }

    #[tokio::test]
    async fn test_unanswered_request_times_out_and_frees_the_slot() {
        let (znp, _tasks, mut radio) = setup(Duration::from_millis(50));
        let err = znp.send_sync(&SysPing {}).await.unwrap_err();
        assert!(matches!(err, StackError::Timeout(..)));
        radio.expect_frame().await;

        let pending = tokio::spawn({
            let znp = znp.clone();
            async move { znp.send_sync(&SysPing {}).await }
        });
        radio.expect_frame().await;
        radio.send(CommandType::Srsp, Subsystem::Sys, 0x01, vec![0x01, 0x00]).await;
        assert!(pending.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_async_messages_are_broadcast() {
        let (znp, _tasks, mut radio) = setup(SYNC_TIMEOUT);
        let mut events = znp.subscribe();

        radio.send(CommandType::Areq, Subsystem::Sys, 0x80, vec![0x00, 0x02, 0x01, 0x02, 0x00]).await;

        let message = events.recv().await.unwrap();
        assert_eq!(SysResetInd::from_message(&message).map(|ind| ind.product), Some(0x01));
    }

    #[tokio::test]
    async fn test_slow_subscriber_loses_oldest_messages() {
        use crate::znp::messages::ZdoPermitJoinInd;
        use tokio::sync::broadcast::error::RecvError;

        let (znp, _tasks, mut radio) = setup(SYNC_TIMEOUT);
        let mut events = znp.subscribe();
        let total = ASYNC_CAPACITY + 6;
        for duration in 0..total {
            radio.send(CommandType::Areq, Subsystem::Zdo, 0xCB, vec![duration as u8]).await;
        }

        // the receive path keeps moving while nobody reads the fan-out
        let pending = tokio::spawn({
            let znp = znp.clone();
            async move { znp.send_sync(&SysPing {}).await }
        });
        radio.expect_frame().await;
        radio.send(CommandType::Srsp, Subsystem::Sys, 0x01, vec![0x01, 0x00]).await;
        assert!(pending.await.unwrap().is_ok());

        assert_eq!(events.recv().await.unwrap_err(), RecvError::Lagged(6));
        let durations: Vec<u8> = std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(|message| ZdoPermitJoinInd::from_message(&message).map(|ind| ind.permit_join_duration))
            .collect();
        assert_eq!(durations.len(), ASYNC_CAPACITY);
        assert_eq!(durations.first(), Some(&6));
        assert_eq!(durations.last(), Some(&(total as u8 - 1)));
    }

    #[tokio::test]
    async fn test_unknown_async_command_is_reported_and_skipped() {
        let (znp, mut tasks, mut radio) = setup(SYNC_TIMEOUT);
        let mut events = znp.subscribe();

        radio.send(CommandType::Areq, Subsystem::Zdo, 0xC8, vec![]).await;
        radio.send(CommandType::Areq, Subsystem::Zdo, 0xCB, vec![0x3c]).await;

        let err = tasks.errors.recv().await.unwrap();
        assert!(matches!(err, StackError::UnknownAsyncCommand { command: 0xC8, .. }));
        assert_eq!(events.recv().await.unwrap().name(), "ZdoPermitJoinInd");
    }

    #[tokio::test]
    async fn test_async_request_is_written() {
        let (znp, _tasks, mut radio) = setup(SYNC_TIMEOUT);
        znp.send_async(&SysResetReq { reset_type: ResetType::Soft }).await.unwrap();
        let frame = radio.expect_frame().await;
        assert_eq!(frame.command_type, CommandType::Areq);
        assert_eq!(frame.payload, vec![0x01]);
    }

    #[tokio::test]
    async fn test_closed_transport_fails_pending_request() {
        let (znp, tasks, mut radio) = setup(SYNC_TIMEOUT);
        let pending = tokio::spawn({
            let znp = znp.clone();
            async move { znp.send_sync(&SysPing {}).await }
        });
        radio.expect_frame().await;
        drop(radio);

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, StackError::TransportClosed));
        assert!(tasks.handle.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_stops_tasks() {
        let (znp, tasks, _radio) = setup(SYNC_TIMEOUT);
        znp.shutdown();
        assert!(tasks.handle.await.unwrap().is_ok());
        assert!(matches!(
            znp.send_sync(&SysPing {}).await.unwrap_err(),
            StackError::TransportClosed
        ));
    }
}
