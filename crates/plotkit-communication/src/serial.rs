//! Serial transport
//!
//! Connects to a plotter controller over a USB or Bluetooth serial
//! link. Writes happen on the caller's thread; a background reader
//! thread assembles incoming bytes into lines and forwards them as
//! [`TransportEvent`] values.

use crate::transport::{Transport, TransportEvent};
use plotkit_core::{Error, Result};
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Information about an available serial port.
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name, for example `/dev/ttyUSB0` or `COM3`.
    pub port_name: String,
    /// Human-readable description.
    pub description: String,
    /// Manufacturer name if the port reports one.
    pub manufacturer: Option<String>,
}

/// List serial ports that look like plotter controllers.
///
/// Filters to the device patterns plotter boards show up under:
/// `COM*` on Windows, `/dev/ttyUSB*`, `/dev/ttyACM*`, and `/dev/rfcomm*`
/// on Linux, `/dev/cu.usbserial-*` and `/dev/cu.usbmodem*` on macOS.
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Failed to enumerate serial ports: {}", e);
        Error::connection(format!("failed to enumerate ports: {e}"))
    })?;

    Ok(ports
        .iter()
        .filter(|port| is_plotter_port(&port.port_name))
        .map(|port| {
            let (description, manufacturer) = match &port.port_type {
                serialport::SerialPortType::UsbPort(usb) => (
                    format!(
                        "USB {} {}",
                        usb.manufacturer.as_deref().unwrap_or("Device"),
                        usb.product.as_deref().unwrap_or("Serial Port")
                    ),
                    usb.manufacturer.clone(),
                ),
                serialport::SerialPortType::BluetoothPort => {
                    ("Bluetooth Serial".to_string(), None)
                }
                _ => ("Serial Port".to_string(), None),
            };
            SerialPortInfo {
                port_name: port.port_name.clone(),
                description,
                manufacturer,
            }
        })
        .collect())
}

fn is_plotter_port(port_name: &str) -> bool {
    if port_name.starts_with("COM") && port_name[3..].chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    if port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
        || port_name.starts_with("/dev/rfcomm")
    {
        return true;
    }
    if port_name.starts_with("/dev/cu.usbserial-") || port_name.starts_with("/dev/cu.usbmodem") {
        return true;
    }
    false
}

/// Serial link to a plotter controller.
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    writer: Option<Box<dyn serialport::SerialPort>>,
    connected: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl SerialTransport {
    /// Create a transport for the given port. No I/O happens until
    /// [`Transport::connect`].
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            writer: None,
            connected: Arc::new(AtomicBool::new(false)),
            reader: None,
        }
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self, events: UnboundedSender<TransportEvent>) -> Result<()> {
        // Short read timeout so the reader thread can notice a
        // requested disconnect.
        let port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(Duration::from_millis(10))
            .open()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", self.port_name, e);
                Error::connection(format!("failed to open port {}: {e}", self.port_name))
            })?;

        let reader_port = port
            .try_clone()
            .map_err(|e| Error::connection(format!("failed to clone port handle: {e}")))?;

        self.connected.store(true, Ordering::SeqCst);
        let _ = events.send(TransportEvent::ConnectionChanged(true));

        let connected = Arc::clone(&self.connected);
        let port_name = self.port_name.clone();
        self.reader = Some(std::thread::spawn(move || {
            read_loop(reader_port, events, connected, port_name);
        }));

        self.writer = Some(port);
        tracing::info!(port = %self.port_name, baud = self.baud_rate, "serial port opened");
        Ok(())
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::connection("serial port is not open"))?;
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush())
            .map_err(|e| {
                self.connected.store(false, Ordering::SeqCst);
                Error::connection(format!("serial write failed: {e}"))
            })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn disconnect(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        self.writer = None;
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        tracing::info!(port = %self.port_name, "serial port closed");
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Assemble incoming bytes into lines until the link drops or a
/// disconnect is requested. Both `\r` and `\n` terminate a line; empty
/// fragments between terminators are dropped.
fn read_loop(
    mut port: Box<dyn serialport::SerialPort>,
    events: UnboundedSender<TransportEvent>,
    connected: Arc<AtomicBool>,
    port_name: String,
) {
    let mut buf = [0u8; 512];
    let mut pending = String::new();

    while connected.load(Ordering::SeqCst) {
        match port.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => {
                pending.push_str(&String::from_utf8_lossy(&buf[..n]));
                while let Some(pos) = pending.find(['\n', '\r']) {
                    let line = pending[..pos].to_string();
                    pending.drain(..=pos);
                    if !line.is_empty() {
                        tracing::trace!(%line, "serial line received");
                        if events.send(TransportEvent::LineReceived(line)).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => {
                tracing::warn!(port = %port_name, "serial read failed: {}", e);
                connected.store(false, Ordering::SeqCst);
                let _ = events.send(TransportEvent::ConnectionChanged(false));
                return;
            }
        }
    }
}
