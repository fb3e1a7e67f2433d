//! Diagnostic output channels.
//!
//! The compilation core never prints directly; it hands text to a
//! [`Router`] on a named logical channel, the same separation the original
//! draws between the compiler and its output router. The default router
//! forwards to the [`log`] facade; tests substitute a [`RecordingRouter`] so
//! assertions can inspect diagnostic text without capturing stdout.

/// Which of the standard output channels a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Fatal and semantic errors.
    Error,
    /// Non-fatal conditions (overflow, deprecated syntax).
    Warning,
    /// Ordinary user-facing output (construct echoes, `(printout)`).
    Display,
    /// Execution tracing, off by default.
    Trace,
}

/// Destination for compiler diagnostics, keyed by [`Channel`] and an
/// arbitrary logical name identifying the source (e.g. the file being
/// loaded).
pub trait Router {
    fn emit(&mut self, channel: Channel, logical_name: &str, text: &str);
}

/// Forwards every message to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRouter;

impl Router for LogRouter {
    fn emit(&mut self, channel: Channel, logical_name: &str, text: &str) {
        match channel {
            Channel::Error => log::error!("[{logical_name}] {text}"),
            Channel::Warning => log::warn!("[{logical_name}] {text}"),
            Channel::Display => log::info!("[{logical_name}] {text}"),
            Channel::Trace => log::trace!("[{logical_name}] {text}"),
        }
    }
}

/// Accumulates every emitted message in order, for tests that want to
/// assert on diagnostic text.
#[derive(Debug, Default)]
pub struct RecordingRouter {
    pub messages: Vec<(Channel, String, String)>,
}

impl RecordingRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages emitted on a given channel, in order.
    pub fn on(&self, channel: Channel) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|(c, _, _)| *c == channel)
            .map(|(_, _, text)| text.as_str())
            .collect()
    }
}

impl Router for RecordingRouter {
    fn emit(&mut self, channel: Channel, logical_name: &str, text: &str) {
        self.messages
            .push((channel, logical_name.to_string(), text.to_string()));
    }
}
