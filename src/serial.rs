// MIT License - Copyright (c) 2026 Peter Wright
// Serial port setup for the radio

use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::info;

use crate::config::SerialConfig;
use crate::error::Result;

/// Open the radio's port, 8N1, with RTS asserted.
///
/// The ZNP bootloader holds the application until it sees RTS.
pub fn open(serial: &SerialConfig) -> Result<SerialStream> {
    info!("Opening {} at {} baud", serial.port, serial.baud_rate);
    let mut port = tokio_serial::new(&serial.port, serial.baud_rate).open_native_async()?;
    port.write_request_to_send(true)?;
    Ok(port)
}
