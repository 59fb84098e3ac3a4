//! Ack-paced command streamer
//!
//! Streams a prepared list of wire lines to the device one command at
//! a time, waiting for an acknowledgment before sending the next. The
//! streamer degrades and continues: a device error or an ack timeout
//! counts the command as processed and moves on, so one bad line never
//! wedges a long job.
//!
//! The state machine is driven by [`CommandStreamer::tick`], which is
//! synchronous and takes the current instant so behavior under timeouts
//! is deterministic. [`CommandStreamer::run`] is the production driver
//! that ticks on an interval until the session reaches a terminal
//! state.

use crate::transport::{Transport, TransportEvent};
use plotkit_core::{Error, Result};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Lifecycle of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No session active.
    Idle,
    /// Session accepted, prologue being sent.
    Initializing,
    /// Ready to send the next command.
    Sending,
    /// One command in flight, waiting for its acknowledgment.
    AwaitingAck,
    /// Session suspended by the operator; position is preserved.
    Paused,
    /// All commands processed.
    Completed,
    /// Session aborted by the operator or by a lost connection.
    Stopped,
    /// The transport failed while sending.
    Error,
}

impl StreamState {
    /// Whether the session has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Error)
    }

    /// Whether a session is in progress (including paused).
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Initializing | Self::Sending | Self::AwaitingAck | Self::Paused
        )
    }
}

/// Streamer tuning parameters.
#[derive(Debug, Clone)]
pub struct StreamerConfig {
    /// How long to wait for an acknowledgment before giving up on the
    /// in-flight command and moving on.
    pub ack_timeout: Duration,
    /// Poll interval of the async driver.
    pub tick_interval: Duration,
    /// Minimum gap between one command being accounted for and the
    /// next send, for controllers that need breathing room.
    pub inter_command_delay: Duration,
    /// Lines sent before the job body when a session starts,
    /// unacknowledged. Defaults to the machine init sequence: unlock,
    /// millimeter units, absolute positioning, zero the work origin,
    /// a settling dwell, motors on, pen up.
    pub prologue: Vec<String>,
    /// Lines sent after the last command is accounted for, best
    /// effort and unacknowledged. Defaults to a motion-sync dwell and
    /// motors off.
    pub trailer: Vec<String>,
    /// Lines sent on stop, ahead of anything else. Defaults to pen up
    /// and motors off.
    pub stop_sequence: Vec<String>,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(30),
            tick_interval: Duration::from_millis(20),
            inter_command_delay: Duration::ZERO,
            prologue: vec![
                "$X".to_string(),
                "G21".to_string(),
                "G90".to_string(),
                "G92 X0 Y0 Z0".to_string(),
                "G4 P0.5".to_string(),
                "M17".to_string(),
                "G0 Z5.00".to_string(),
            ],
            trailer: vec!["G4 P0".to_string(), "M18".to_string()],
            stop_sequence: vec!["G0 Z5.00".to_string(), "M18".to_string()],
        }
    }
}

/// Whether a trimmed device line acknowledges the in-flight command.
///
/// Controllers in the wild answer with `ok`, and noisy Bluetooth links
/// are known to mangle that into `ook` or bare `k`. Matching is
/// case-insensitive and exact after trimming.
pub fn is_ack_token(line: &str) -> bool {
    let token = line.trim();
    token.eq_ignore_ascii_case("ok")
        || token.eq_ignore_ascii_case("ook")
        || token.eq_ignore_ascii_case("k")
}

/// Whether a trimmed device line reports a command error.
pub fn is_error_response(line: &str) -> bool {
    let token = line.trim();
    token.starts_with("Error:") || token.eq_ignore_ascii_case("error")
}

/// Progress counters for one streaming session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionProgress {
    /// Total lines in the job, comments included.
    pub total: usize,
    /// Lines transmitted to the device.
    pub sent: usize,
    /// Lines accounted for: acked, errored, timed out, or comment.
    pub processed: usize,
    /// Device error responses observed.
    pub errors: usize,
    /// Acknowledgments that never arrived.
    pub timeouts: usize,
}

/// Streams wire lines to a device with one command in flight.
pub struct CommandStreamer {
    transport: Box<dyn Transport>,
    config: StreamerConfig,
    events_tx: UnboundedSender<TransportEvent>,
    events_rx: UnboundedReceiver<TransportEvent>,
    state: StreamState,
    queue: Vec<String>,
    current_index: usize,
    progress: SessionProgress,
    waiting_for_ack: bool,
    last_send: Option<Instant>,
    last_advance: Option<Instant>,
    log: Vec<String>,
}

impl CommandStreamer {
    /// Create a streamer over the given transport.
    pub fn new(transport: Box<dyn Transport>, config: StreamerConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            config,
            events_tx,
            events_rx,
            state: StreamState::Idle,
            queue: Vec::new(),
            current_index: 0,
            progress: SessionProgress::default(),
            waiting_for_ack: false,
            last_send: None,
            last_advance: None,
            log: Vec::new(),
        }
    }

    /// Open the transport.
    pub fn connect(&mut self) -> Result<()> {
        self.transport.connect(self.events_tx.clone())
    }

    /// Close the transport. An active session becomes [`StreamState::Stopped`].
    pub fn disconnect(&mut self) {
        if self.state.is_active() {
            self.state = StreamState::Stopped;
        }
        self.transport.disconnect();
    }

    /// Current session state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Progress counters for the current or last session.
    pub fn progress(&self) -> SessionProgress {
        self.progress
    }

    /// Session log of comments and device responses.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Begin streaming a job.
    ///
    /// Rejected while a session is active; stop or finish the current
    /// one first. The prologue goes out immediately, unacknowledged,
    /// then the session enters the ack-paced send loop.
    pub fn start(&mut self, lines: Vec<String>) -> Result<()> {
        if self.state.is_active() {
            return Err(Error::session("a streaming session is already active"));
        }
        if !self.transport.is_connected() {
            return Err(Error::connection("transport is not connected"));
        }
        if lines.is_empty() {
            return Err(Error::session("job is empty"));
        }

        self.queue = lines;
        self.current_index = 0;
        self.progress = SessionProgress {
            total: self.queue.len(),
            ..Default::default()
        };
        self.waiting_for_ack = false;
        self.last_send = None;
        self.last_advance = None;
        self.log.clear();
        self.state = StreamState::Initializing;

        tracing::info!(total = self.progress.total, "streaming session started");

        for line in self.config.prologue.clone() {
            if let Err(e) = self.transport.send_line(&line) {
                tracing::error!("prologue send failed: {}", e);
                self.state = StreamState::Error;
                return Err(e);
            }
        }

        self.state = StreamState::Sending;
        Ok(())
    }

    /// Suspend sending. The in-flight command and queue position are
    /// preserved; resume picks up exactly where the session paused.
    pub fn pause(&mut self) {
        if matches!(self.state, StreamState::Sending | StreamState::AwaitingAck) {
            tracing::info!(index = self.current_index, "session paused");
            self.state = StreamState::Paused;
        }
    }

    /// Resume a paused session. The ack timer restarts so time spent
    /// paused never counts against the in-flight command.
    pub fn resume(&mut self) {
        if self.state == StreamState::Paused {
            tracing::info!(index = self.current_index, "session resumed");
            self.state = if self.waiting_for_ack {
                self.last_send = Some(Instant::now());
                StreamState::AwaitingAck
            } else {
                StreamState::Sending
            };
        }
    }

    /// Abort the session: halt motion via the stop sequence and clear
    /// the queue.
    pub fn stop(&mut self) {
        if !self.state.is_active() {
            return;
        }
        tracing::warn!(
            processed = self.progress.processed,
            total = self.progress.total,
            "session stopped"
        );
        for line in self.config.stop_sequence.clone() {
            if let Err(e) = self.transport.send_line(&line) {
                tracing::error!("stop sequence send failed: {}", e);
                break;
            }
        }
        self.queue.clear();
        self.waiting_for_ack = false;
        self.state = StreamState::Stopped;
    }

    /// Advance the state machine: consume pending transport events,
    /// then send or time out as the state allows.
    pub fn tick(&mut self, now: Instant) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event, now);
        }

        match self.state {
            StreamState::Sending => self.send_next(now),
            StreamState::AwaitingAck => self.check_timeout(now),
            _ => {}
        }
    }

    /// Drive the streamer until the session reaches a terminal state.
    pub async fn run(&mut self) -> StreamState {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        loop {
            interval.tick().await;
            self.tick(Instant::now());
            if self.state.is_terminal() {
                return self.state;
            }
        }
    }

    fn handle_event(&mut self, event: TransportEvent, now: Instant) {
        match event {
            TransportEvent::LineReceived(line) => self.handle_line(&line, now),
            TransportEvent::ConnectionChanged(true) => {
                tracing::debug!("transport connected");
            }
            TransportEvent::ConnectionChanged(false) => {
                tracing::warn!("transport disconnected");
                if self.state.is_active() {
                    self.queue.clear();
                    self.waiting_for_ack = false;
                    self.state = StreamState::Stopped;
                }
            }
        }
    }

    fn handle_line(&mut self, line: &str, now: Instant) {
        if is_ack_token(line) {
            if self.waiting_for_ack {
                self.waiting_for_ack = false;
                self.progress.processed += 1;
                self.advance(now);
            } else {
                tracing::debug!(%line, "unsolicited ack ignored");
            }
        } else if is_error_response(line) {
            self.log.push(line.to_string());
            if self.waiting_for_ack {
                tracing::warn!(index = self.current_index, %line, "device rejected command");
                self.waiting_for_ack = false;
                self.progress.errors += 1;
                self.progress.processed += 1;
                self.advance(now);
            }
        } else {
            // Status reports and other chatter are kept for the
            // operator but do not pace the stream.
            tracing::debug!(%line, "device message");
            self.log.push(line.to_string());
        }
    }

    /// Move past the command at `current_index` and complete the
    /// session if it was the last one.
    fn advance(&mut self, now: Instant) {
        self.current_index += 1;
        self.last_advance = Some(now);
        if self.current_index >= self.queue.len() {
            if matches!(
                self.state,
                StreamState::Sending | StreamState::AwaitingAck | StreamState::Paused
            ) {
                for line in self.config.trailer.clone() {
                    if let Err(e) = self.transport.send_line(&line) {
                        tracing::warn!("trailer send failed: {}", e);
                        break;
                    }
                }
                tracing::info!(
                    processed = self.progress.processed,
                    errors = self.progress.errors,
                    timeouts = self.progress.timeouts,
                    "streaming session completed"
                );
                self.state = StreamState::Completed;
            }
        } else if self.state == StreamState::AwaitingAck {
            self.state = StreamState::Sending;
        }
    }

    fn send_next(&mut self, now: Instant) {
        // Comments and blank lines are logged and skipped without
        // touching the wire; controllers have nothing to ack for them.
        while self.current_index < self.queue.len() {
            let line = self.queue[self.current_index].trim().to_string();
            if line.is_empty() || line.starts_with(';') {
                if !line.is_empty() {
                    self.log.push(line);
                }
                self.progress.processed += 1;
                self.advance(now);
                if self.state != StreamState::Sending {
                    return;
                }
                continue;
            }

            // Hold the transmission until the inter-command gap has
            // passed; the next tick will retry.
            if let Some(advanced_at) = self.last_advance {
                if now.duration_since(advanced_at) < self.config.inter_command_delay {
                    return;
                }
            }

            match self.transport.send_line(&line) {
                Ok(()) => {
                    self.progress.sent += 1;
                    self.waiting_for_ack = true;
                    self.last_send = Some(now);
                    self.state = StreamState::AwaitingAck;
                }
                Err(e) => {
                    tracing::error!(index = self.current_index, "send failed: {}", e);
                    self.state = StreamState::Error;
                }
            }
            return;
        }
    }

    fn check_timeout(&mut self, now: Instant) {
        let Some(sent_at) = self.last_send else {
            return;
        };
        if now.duration_since(sent_at) >= self.config.ack_timeout {
            tracing::warn!(
                index = self.current_index,
                timeout_s = self.config.ack_timeout.as_secs(),
                "no acknowledgment, moving on"
            );
            self.waiting_for_ack = false;
            self.progress.timeouts += 1;
            self.progress.processed += 1;
            self.advance(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_tokens() {
        assert!(is_ack_token("ok"));
        assert!(is_ack_token("OK"));
        assert!(is_ack_token(" ok \r"));
        assert!(is_ack_token("ook"));
        assert!(is_ack_token("k"));
        assert!(!is_ack_token("okay"));
        assert!(!is_ack_token(""));
        assert!(!is_ack_token("o"));
    }

    #[test]
    fn test_error_responses() {
        assert!(is_error_response("Error:20"));
        assert!(is_error_response("error"));
        assert!(is_error_response("ERROR"));
        assert!(!is_error_response("Erroneous"));
        assert!(!is_error_response("ok"));
    }

    #[test]
    fn test_terminal_and_active_states() {
        assert!(StreamState::Completed.is_terminal());
        assert!(StreamState::Stopped.is_terminal());
        assert!(StreamState::Error.is_terminal());
        assert!(!StreamState::Paused.is_terminal());
        assert!(StreamState::Paused.is_active());
        assert!(!StreamState::Idle.is_active());
    }
}
