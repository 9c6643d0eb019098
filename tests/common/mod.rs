// MIT License - Copyright (c) 2026 Peter Wright
// Scripted ZNP radio for end-to-end tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use ezstack::unp::{read_frame, write_frame, CommandType, Frame, Subsystem};
use ezstack::NetworkConfiguration;
use tokio::io::{duplex, split, DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;

pub const COORDINATOR_IEEE: [u8; 8] = [0x04, 0x03, 0x02, 0x01, 0x00, 0x4b, 0x12, 0x00];
pub const DEVICE_IEEE: &str = "0x00158d0001020304";
pub const DEVICE_IEEE_BYTES: [u8; 8] = [0x04, 0x03, 0x02, 0x01, 0x00, 0x8d, 0x15, 0x00];
pub const DEVICE_NWK: [u8; 2] = [0x2b, 0x1a];

pub fn network() -> NetworkConfiguration {
    NetworkConfiguration {
        ieee_address: "0x00124b0001020304".into(),
        pan_id: 0x1a62,
        ext_pan_id: 0xdddd_dddd_dddd_dddd,
        network_key: [0x11; 16],
        channel: 11,
    }
}

pub fn temp_db(name: &str) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let path = std::env::temp_dir().join(format!(
        "ezstack-it-{}-{}-{}.json",
        name,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = std::fs::remove_file(&path);
    path
}

/// The host's side of the link plus a handle on the scripted radio.
pub struct FakeRadio {
    /// Every frame the host wrote, in order.
    pub requests: mpsc::UnboundedReceiver<Frame>,
    inject: mpsc::UnboundedSender<Frame>,
}

pub type HostLink = (ReadHalf<DuplexStream>, WriteHalf<DuplexStream>);

impl FakeRadio {
    /// A radio whose NV memory holds [`network`] on `channel`.
    pub fn start(channel: u8) -> (HostLink, FakeRadio) {
        let (host, radio) = duplex(8192);
        let (requests_tx, requests) = mpsc::unbounded_channel();
        let (inject, injected) = mpsc::unbounded_channel();
        tokio::spawn(serve(radio, channel, requests_tx, injected));
        (split(host), FakeRadio { requests, inject })
    }

    /// Send an unsolicited AREQ to the host.
    pub fn indicate(&self, subsystem: Subsystem, command: u8, payload: Vec<u8>) {
        let _ = self
            .inject
            .send(Frame::new(CommandType::Areq, subsystem, command, payload));
    }

    /// Drain the requests seen so far as (subsystem, command) pairs.
    pub fn seen(&mut self) -> Vec<(Subsystem, u8)> {
        let mut seen = Vec::new();
        while let Ok(frame) = self.requests.try_recv() {
            seen.push((frame.subsystem, frame.command));
        }
        seen
    }
}

pub fn announce() -> Vec<u8> {
    let mut payload = vec![0x00, 0x00, DEVICE_NWK[0], DEVICE_NWK[1]];
    payload.extend_from_slice(&DEVICE_IEEE_BYTES);
    payload.push(0x8e);
    payload
}

/// AF incoming message from the test device, endpoint 1.
pub fn af_incoming(cluster: [u8; 2], zcl: &[u8]) -> Vec<u8> {
    let mut payload = vec![0x00, 0x00, cluster[0], cluster[1], DEVICE_NWK[0], DEVICE_NWK[1]];
    payload.extend_from_slice(&[0x01, 0x01, 0x00, 0x70, 0x00, 0, 0, 0, 0, 0]);
    payload.push(zcl.len() as u8);
    payload.extend_from_slice(zcl);
    payload
}

async fn serve(
    radio: DuplexStream,
    channel: u8,
    requests: mpsc::UnboundedSender<Frame>,
    mut injected: mpsc::UnboundedReceiver<Frame>,
) {
    let (mut reader, mut writer) = split(radio);
    loop {
        let replies = tokio::select! {
            frame = read_frame(&mut reader) => match frame {
                Ok(frame) => {
                    let replies = respond(&frame, channel);
                    let _ = requests.send(frame);
                    replies
                }
                Err(_) => return,
            },
            Some(frame) = injected.recv() => vec![frame],
        };
        for reply in replies {
            if write_frame(&mut writer, &reply).await.is_err() {
                return;
            }
        }
    }
}

fn srsp(subsystem: Subsystem, command: u8, payload: Vec<u8>) -> Frame {
    Frame::new(CommandType::Srsp, subsystem, command, payload)
}

fn areq(subsystem: Subsystem, command: u8, payload: Vec<u8>) -> Frame {
    Frame::new(CommandType::Areq, subsystem, command, payload)
}

fn respond(frame: &Frame, channel: u8) -> Vec<Frame> {
    let ok = || srsp(frame.subsystem, frame.command, vec![0x00]);
    match (frame.subsystem, frame.command) {
        (Subsystem::Sys, 0x00) => vec![areq(Subsystem::Sys, 0x80, vec![0x00, 0x02, 0x01, 0x07, 0x01])],
        (Subsystem::Sys, 0x02) => vec![srsp(Subsystem::Sys, 0x02, vec![0x02, 0x01, 0x02, 0x07, 0x01])],
        (Subsystem::Sys, 0x08) => {
            let mut payload = vec![0x00, 0x08];
            payload.extend_from_slice(&[0xdd; 8]);
            vec![srsp(Subsystem::Sys, 0x08, payload)]
        }
        (Subsystem::Util, 0x01) => {
            let mut payload = vec![0x00];
            payload.extend_from_slice(&COORDINATOR_IEEE);
            payload.extend_from_slice(&(1u32 << channel).to_be_bytes());
            payload.extend_from_slice(&[0x62, 0x1a, 0x05]);
            payload.extend_from_slice(&[0x11; 16]);
            vec![srsp(Subsystem::Util, 0x01, payload)]
        }
        (Subsystem::Util, 0x00) => {
            let mut payload = vec![0x00];
            payload.extend_from_slice(&COORDINATOR_IEEE);
            // short address, coordinator, started as coordinator, no children
            payload.extend_from_slice(&[0x00, 0x00, 0x01, 0x09, 0x00]);
            vec![srsp(Subsystem::Util, 0x00, payload)]
        }
        (Subsystem::Sapi, 0x00) => vec![srsp(Subsystem::Sapi, 0x00, vec![])],
        (Subsystem::Zdo, 0x02) => vec![ok(), areq(Subsystem::Zdo, 0x82, node_descriptor())],
        (Subsystem::Zdo, 0x05) => vec![
            ok(),
            areq(Subsystem::Zdo, 0x85, vec![DEVICE_NWK[0], DEVICE_NWK[1], 0x00, DEVICE_NWK[0], DEVICE_NWK[1], 0x01, 0x01]),
        ],
        (Subsystem::Zdo, 0x04) => vec![ok(), areq(Subsystem::Zdo, 0x84, simple_descriptor())],
        (Subsystem::Zdo, 0x21) => vec![ok(), areq(Subsystem::Zdo, 0xa1, vec![frame.payload[0], frame.payload[1], 0x00])],
        (Subsystem::Af, 0x01) => {
            let mut replies = vec![ok()];
            let trans_id = frame.payload[6];
            replies.push(areq(Subsystem::Af, 0x80, vec![0x00, frame.payload[3], trans_id]));
            if let Some(zcl) = zcl_reply(&frame.payload) {
                replies.push(areq(Subsystem::Af, 0x81, af_incoming([frame.payload[4], frame.payload[5]], &zcl)));
            }
            replies
        }
        _ => vec![ok()],
    }
}

/// What the device answers to the ZCL frame inside an AF data request.
fn zcl_reply(request: &[u8]) -> Option<Vec<u8>> {
    let cluster = u16::from_le_bytes([request[4], request[5]]);
    let zcl = &request[10..];
    let (frame_control, tsn, command) = (zcl[0], zcl[1], zcl[2]);

    if frame_control & 0x03 == 0x01 {
        return Some(vec![0x18, tsn, 0x0b, command, 0x00]);
    }
    match (cluster, command) {
        (0x0000, 0x00) => {
            let mut reply = vec![0x18, tsn, 0x01];
            reply.extend_from_slice(&[0x04, 0x00, 0x00, 0x42, 0x0e]);
            reply.extend_from_slice(b"IKEA of Sweden");
            reply.extend_from_slice(&[0x05, 0x00, 0x00, 0x42, 0x10]);
            reply.extend_from_slice(b"TRADFRI bulb E27");
            reply.extend_from_slice(&[0x07, 0x00, 0x00, 0x30, 0x01]);
            Some(reply)
        }
        // configure reporting: all records accepted
        (_, 0x06) => Some(vec![0x18, tsn, 0x07, 0x00]),
        _ => None,
    }
}

fn node_descriptor() -> Vec<u8> {
    vec![
        DEVICE_NWK[0], DEVICE_NWK[1], 0x00, DEVICE_NWK[0], DEVICE_NWK[1],
        0x01, 0x40, 0x8e, 0x7c, 0x11, 0x52, 0x80, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00,
    ]
}

fn simple_descriptor() -> Vec<u8> {
    vec![
        DEVICE_NWK[0], DEVICE_NWK[1], 0x00, DEVICE_NWK[0], DEVICE_NWK[1],
        0x0e, 0x01, 0x04, 0x01, 0x00, 0x01, 0x01,
        0x02, 0x00, 0x00, 0x06, 0x00,
        0x01, 0x19, 0x00,
    ]
}
