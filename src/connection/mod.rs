//! Connection lifecycle and transport abstraction.
//!
//! The [`Connection`] owns one duplex link at a time: dial, handshake,
//! poll inbound envelopes into the dispatcher, start uploads the
//! dispatcher requests. There is no automatic reconnect - a transport
//! failure leaves the connection [`LinkState::Disconnected`] until the
//! caller explicitly calls [`Connection::connect`] again.
//!
//! The transport is injectable: `ws` provides the tungstenite client,
//! tests use a recording double.

pub mod ws;

use thiserror::Error;

use crate::config::SyncConfig;
use crate::dispatch;
use crate::document::Document;
use crate::protocol::{Handshake, OutboundEnvelope, parse_inbound};
use crate::upload::{self, ChunkSource};

// =============================================================================
// Transport
// =============================================================================

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed by peer")]
    Closed,

    #[error("not connected")]
    NotConnected,

    #[error("frame encoding failed")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Ws(#[from] Box<tungstenite::Error>),

    #[error("transport IO error")]
    Io(#[from] std::io::Error),
}

/// One duplex frame transport.
///
/// `recv` is a non-blocking poll: `Ok(None)` means no frame pending.
pub trait Transport {
    fn send_text(&mut self, text: &str) -> Result<(), TransportError>;
    fn send_binary(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
    fn recv(&mut self) -> Result<Option<String>, TransportError>;
}

/// Factory re-run on every (re)connect.
pub type DialFn = Box<dyn Fn() -> Result<Box<dyn Transport>, TransportError> + Send>;

/// Visible connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    Disconnected,
}

// =============================================================================
// Connection
// =============================================================================

/// Owns the duplex connection lifecycle.
pub struct Connection {
    dial: DialFn,
    handshake: Handshake,
    transport: Option<Box<dyn Transport>>,
}

impl Connection {
    /// Create a disconnected connection; call [`connect`](Self::connect)
    /// to dial.
    pub fn new(dial: DialFn, handshake: Handshake) -> Self {
        Self {
            dial,
            handshake,
            transport: None,
        }
    }

    pub fn state(&self) -> LinkState {
        if self.transport.is_some() {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        }
    }

    /// Dial and send the handshake frame. Re-runs the full connect
    /// sequence when called after a failure.
    pub fn connect(&mut self) -> Result<(), TransportError> {
        self.transport = None;
        let mut transport = (self.dial)()?;
        transport.send_text(&serde_json::to_string(&self.handshake)?)?;
        self.transport = Some(transport);
        crate::debug!("ws"; "handshake sent: {}", self.handshake.path);
        Ok(())
    }

    /// Send one outbound envelope.
    pub fn send(&mut self, envelope: &OutboundEnvelope) -> Result<(), TransportError> {
        let Some(mut transport) = self.transport.take() else {
            return Err(TransportError::NotConnected);
        };
        let frame = serde_json::to_string(envelope)?;
        transport.send_text(&frame)?;
        self.transport = Some(transport);
        Ok(())
    }

    /// Poll for one inbound message and apply it to the document.
    ///
    /// Returns `Ok(true)` when a message was consumed. A frame that does
    /// not parse as an envelope is dropped whole - no partial
    /// application. Transport failures leave the connection
    /// disconnected.
    pub fn poll(
        &mut self,
        doc: &mut dyn Document,
        config: &SyncConfig,
    ) -> Result<bool, TransportError> {
        let Some(mut transport) = self.transport.take() else {
            return Ok(false);
        };

        let text = match transport.recv() {
            Ok(Some(text)) => text,
            Ok(None) => {
                self.transport = Some(transport);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let parsed = match parse_inbound(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                crate::debug!("sync"; "dropping malformed envelope: {}", e);
                self.transport = Some(transport);
                return Ok(true);
            }
        };

        let result = dispatch::handle(doc, &parsed, config);
        crate::debug!("sync"; "applied {} of {} directives", result.applied(), result.outcomes.len());

        for job in &result.uploads {
            let mut source = match upload::FileSource::open(&job.path) {
                Ok(source) => source,
                Err(e) => {
                    crate::log!("upload"; "cannot open `{}`: {}", job.path.display(), e);
                    continue;
                }
            };
            match upload::run(transport.as_mut(), job, &mut source) {
                Ok(stats) => {
                    crate::debug!("upload"; "`{}`: {} chunks, {} bytes", source.name(), stats.chunks, stats.bytes);
                }
                Err(upload::UploadError::Transport(e)) => return Err(e),
                Err(e) => {
                    // Read or encode failure aborts this file only
                    crate::log!("upload"; "aborted `{}`: {}", source.name(), e);
                }
            }
        }

        self.transport = Some(transport);
        Ok(true)
    }
}

// =============================================================================
// Test Double
// =============================================================================

#[cfg(test)]
pub mod testing {
    use super::{Transport, TransportError};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// One recorded outbound frame.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Frame {
        Text(String),
        Binary(Vec<u8>),
    }

    /// Recording transport; clones share the same frame log and inbound
    /// queue, so a test can keep a handle after the connection takes
    /// ownership.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingTransport {
        sent: Arc<Mutex<Vec<Frame>>>,
        inbound: Arc<Mutex<VecDeque<String>>>,
        broken: Arc<AtomicBool>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_inbound(&self, text: &str) {
            self.inbound.lock().push_back(text.to_string());
        }

        /// Simulate a transport-level failure on the next operation.
        pub fn break_link(&self) {
            self.broken.store(true, Ordering::SeqCst);
        }

        pub fn sent(&self) -> Vec<Frame> {
            self.sent.lock().clone()
        }

        pub fn sent_texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .iter()
                .filter_map(|f| match f {
                    Frame::Text(t) => Some(t.clone()),
                    Frame::Binary(_) => None,
                })
                .collect()
        }

        fn check(&self) -> Result<(), TransportError> {
            if self.broken.load(Ordering::SeqCst) {
                Err(TransportError::Closed)
            } else {
                Ok(())
            }
        }
    }

    impl Transport for RecordingTransport {
        fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
            self.check()?;
            self.sent.lock().push(Frame::Text(text.to_string()));
            Ok(())
        }

        fn send_binary(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            self.check()?;
            self.sent.lock().push(Frame::Binary(bytes.to_vec()));
            Ok(())
        }

        fn recv(&mut self) -> Result<Option<String>, TransportError> {
            self.check()?;
            Ok(self.inbound.lock().pop_front())
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
