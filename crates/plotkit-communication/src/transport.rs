//! Device transports
//!
//! A [`Transport`] carries complete text lines to the device and feeds
//! received lines back through a channel as [`TransportEvent`] values.
//! The trait is line oriented on both sides; framing (newline handling,
//! byte buffering) is the transport's problem, never the streamer's.

use parking_lot::Mutex;
use plotkit_core::{Error, Result};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// An event produced by a transport's receive side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A complete line arrived from the device, already trimmed of the
    /// line terminator.
    LineReceived(String),
    /// The link came up (`true`) or dropped (`false`).
    ConnectionChanged(bool),
}

/// A line-oriented link to a plotter controller.
///
/// Implementations push received lines and connection changes into the
/// channel handed to [`Transport::connect`]. Sending is synchronous;
/// a transport that cannot deliver a line returns an error rather than
/// buffering indefinitely.
pub trait Transport: Send {
    /// Open the link and register the event channel.
    fn connect(&mut self, events: UnboundedSender<TransportEvent>) -> Result<()>;

    /// Transmit one line. The transport appends its own terminator.
    fn send_line(&mut self, line: &str) -> Result<()>;

    /// Whether the link is currently up.
    fn is_connected(&self) -> bool;

    /// Close the link. Idempotent.
    fn disconnect(&mut self);
}

#[derive(Default)]
struct NoOpShared {
    connected: bool,
    fail_sends: bool,
    sent: Vec<String>,
    events: Option<UnboundedSender<TransportEvent>>,
}

/// In-memory transport used by tests and dry runs. Records every line
/// it is asked to send and lets a [`NoOpController`] play the device's
/// side of the conversation.
#[derive(Default)]
pub struct NoOpTransport {
    shared: Arc<Mutex<NoOpShared>>,
}

/// Handle that stays usable after the transport is boxed away: inspect
/// sent lines, inject responses, and drop the link.
#[derive(Clone)]
pub struct NoOpController {
    shared: Arc<Mutex<NoOpShared>>,
}

impl NoOpTransport {
    /// Create a disconnected no-op transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller handle for driving the device side.
    pub fn controller(&self) -> NoOpController {
        NoOpController {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl NoOpController {
    /// Lines the transport has been asked to send, in order.
    pub fn sent_lines(&self) -> Vec<String> {
        self.shared.lock().sent.clone()
    }

    /// Inject a line as if the device had sent it.
    pub fn inject_line(&self, line: &str) {
        let shared = self.shared.lock();
        if let Some(events) = &shared.events {
            let _ = events.send(TransportEvent::LineReceived(line.to_string()));
        }
    }

    /// Make every subsequent send fail with a connection error.
    pub fn fail_sends(&self, fail: bool) {
        self.shared.lock().fail_sends = fail;
    }

    /// Simulate the link dropping.
    pub fn drop_link(&self) {
        let mut shared = self.shared.lock();
        shared.connected = false;
        if let Some(events) = &shared.events {
            let _ = events.send(TransportEvent::ConnectionChanged(false));
        }
    }
}

impl Transport for NoOpTransport {
    fn connect(&mut self, events: UnboundedSender<TransportEvent>) -> Result<()> {
        let mut shared = self.shared.lock();
        shared.connected = true;
        let _ = events.send(TransportEvent::ConnectionChanged(true));
        shared.events = Some(events);
        Ok(())
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        let mut shared = self.shared.lock();
        if !shared.connected {
            return Err(Error::connection("transport is not connected"));
        }
        if shared.fail_sends {
            return Err(Error::connection("simulated send failure"));
        }
        shared.sent.push(line.to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }

    fn disconnect(&mut self) {
        let mut shared = self.shared.lock();
        shared.connected = false;
        shared.events = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_noop_records_sent_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = NoOpTransport::new();
        let controller = transport.controller();
        transport.connect(tx).unwrap();
        transport.send_line("G21").unwrap();
        transport.send_line("G90").unwrap();

        assert_eq!(controller.sent_lines(), vec!["G21", "G90"]);
        assert_eq!(
            rx.try_recv().unwrap(),
            TransportEvent::ConnectionChanged(true)
        );
    }

    #[test]
    fn test_noop_rejects_send_when_disconnected() {
        let mut transport = NoOpTransport::new();
        assert!(transport.send_line("G21").is_err());
    }

    #[test]
    fn test_injected_lines_arrive_as_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = NoOpTransport::new();
        let controller = transport.controller();
        transport.connect(tx).unwrap();
        let _ = rx.try_recv(); // connection event

        controller.inject_line("ok");
        assert_eq!(
            rx.try_recv().unwrap(),
            TransportEvent::LineReceived("ok".to_string())
        );
    }
}
