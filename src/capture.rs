// MIT License - Copyright (c) 2026 Peter Wright
// Text log of inbound UNP frames

use std::path::Path;

use chrono::{Local, SecondsFormat};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use crate::error::Result;
use crate::unp::Frame;

/// One capture line, without the trailing newline.
pub fn format_line(timestamp: &str, frame: &Frame) -> String {
    format!("{timestamp} {frame}")
}

/// Append every frame received on `frames` to `path` until the multiplexer stops.
pub async fn run_packet_capture(path: &Path, frames: broadcast::Receiver<Frame>) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path).await?;
    info!("Capturing inbound frames to {}", path.display());
    write_frames(file, frames).await
}

async fn write_frames<W: AsyncWrite + Unpin>(mut out: W, mut frames: broadcast::Receiver<Frame>) -> Result<()> {
    loop {
        match frames.recv().await {
            Ok(frame) => {
                let timestamp = Local::now().to_rfc3339_opts(SecondsFormat::Nanos, false);
                let line = format_line(&timestamp, &frame);
                out.write_all(line.as_bytes()).await?;
                out.write_all(b"\n").await?;
                out.flush().await?;
            }
            Err(RecvError::Lagged(skipped)) => warn!("Packet capture missed {} frame(s)", skipped),
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}
