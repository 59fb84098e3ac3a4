//! # PlotKit Communication
//!
//! Device transports and the ack-paced command streamer. A
//! [`Transport`] moves complete text lines between the host and the
//! plotter controller; the [`CommandStreamer`] paces a prepared job
//! over it, one command in flight, tolerating device errors, garbled
//! acknowledgments, and silent drops.

pub mod serial;
pub mod streamer;
pub mod transport;

pub use serial::{list_ports, SerialPortInfo, SerialTransport};
pub use streamer::{
    is_ack_token, is_error_response, CommandStreamer, SessionProgress, StreamState, StreamerConfig,
};
pub use transport::{NoOpController, NoOpTransport, Transport, TransportEvent};
