//! Per-process session state.
//!
//! The worker serves exactly one logical session for its lifetime, so this
//! state lives next to the journals in the server context rather than being
//! keyed by connection.

use serde_json::Value;

/// Push-history gate.
///
/// A history read arms the gate; the next push that passes it disarms it
/// again, whatever the push outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushGate {
    /// No history read since the last push attempt
    #[default]
    Unchecked,
    /// History was read; one push may proceed
    Checked,
}

impl PushGate {
    /// Record a history read. Always leaves the gate `Checked`.
    pub fn mark_checked(&mut self) {
        *self = PushGate::Checked;
    }

    /// Try to pass the gate for one push attempt.
    ///
    /// Returns `true` and resets to `Unchecked` when the gate was `Checked`.
    /// Returns `false` and leaves the gate `Unchecked` otherwise.
    pub fn admit_push(&mut self) -> bool {
        match self {
            PushGate::Checked => {
                *self = PushGate::Unchecked;
                true
            }
            PushGate::Unchecked => false,
        }
    }

    /// Whether a push would currently be admitted.
    pub fn is_checked(&self) -> bool {
        matches!(self, PushGate::Checked)
    }
}

/// State negotiated with the one client of this process.
#[derive(Debug, Default)]
pub struct Session {
    initialized: bool,
    client_capabilities: Option<Value>,
    /// Push-history gate
    pub gate: PushGate,
}

impl Session {
    /// Fresh, uninitialized session with an `Unchecked` gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the session initialized.
    ///
    /// Only the first call stores `capabilities`; returns whether this was it.
    pub fn initialize(&mut self, capabilities: &Value) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        self.client_capabilities = Some(capabilities.clone());
        true
    }

    /// Whether `initialize` has been handled.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Capabilities the client advertised on its first `initialize`.
    pub fn client_capabilities(&self) -> Option<&Value> {
        self.client_capabilities.as_ref()
    }
}
