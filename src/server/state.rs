//! Lifecycle phases, events, and the single mutable server-state record.

use crate::content::templates::ServedContent;
use crate::error::ServerError;
use crate::http::listener::ListenerHandle;
use crate::settings::{BindAddress, StreamSettings};
use bytes::Bytes;

/// Lifecycle stage of the server instance.
///
/// Legal transitions: `Created → Init → Configured → Running`, with
/// `Error` reachable from anywhere and `Init` reachable again through
/// stop. Everything else is a contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Actor exists but has not loaded its assets yet.
    Created,
    /// Assets and base templates are loaded; waiting for settings.
    Init,
    /// Content is derived; ready to start.
    Configured,
    /// Listener is bound and serving.
    Running,
    /// A reported failure stopped normal operation.
    Error,
}

/// Tagged event consumed by the actor, one at a time, in arrival order.
#[derive(Debug)]
pub(crate) enum ServerEvent {
    /// Load assets and templates. Enqueued once at actor creation.
    Init,
    /// Re-derive served content from new settings.
    Configure(StreamSettings),
    /// Bind the listener and begin serving.
    Start(BindAddress),
    /// Tear the listener down and return to `Init`.
    Stop,
    /// Failure funneled in from the listener or request-handling layer.
    Failure(ServerError),
    /// Terminal: release everything and halt the actor.
    Destroy,
}

/// The one mutable record behind the whole server. Owned and written by
/// the actor task exclusively; nothing else ever touches it.
pub(crate) struct ServerState {
    pub(crate) phase: Phase,
    /// Loaded once at init, immutable afterwards.
    pub(crate) favicon: Bytes,
    pub(crate) logo: Bytes,
    /// Base templates with locale strings already substituted.
    pub(crate) base_index: String,
    pub(crate) base_pin: String,
    pub(crate) wrong_pin_text: String,
    /// Derived artifacts of the most recent accepted configure.
    pub(crate) content: Option<ServedContent>,
    /// Live listener; cleared by stop even on partial failure.
    pub(crate) listener: Option<ListenerHandle>,
}

impl ServerState {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Created,
            favicon: Bytes::new(),
            logo: Bytes::new(),
            base_index: String::new(),
            base_pin: String::new(),
            wrong_pin_text: String::new(),
            content: None,
            listener: None,
        }
    }

    /// Guard a transition: reject-and-report instead of panicking when an
    /// event arrives in a phase that does not allow it.
    pub(crate) fn require_phase(
        &self,
        allowed: &[Phase],
        event: &'static str,
    ) -> Result<(), ServerError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(ServerError::IllegalTransition {
                phase: self.phase,
                event,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_phase_accepts_listed_phases() {
        let mut state = ServerState::new();
        state.phase = Phase::Configured;
        assert!(state
            .require_phase(&[Phase::Init, Phase::Configured], "configure")
            .is_ok());
    }

    #[test]
    fn require_phase_rejects_with_phase_and_event() {
        let state = ServerState::new();
        let err = state.require_phase(&[Phase::Configured], "start").unwrap_err();
        assert_eq!(
            err,
            ServerError::IllegalTransition {
                phase: Phase::Created,
                event: "start",
            }
        );
        assert!(err.is_fatal());
    }
}
