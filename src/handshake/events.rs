//! Events for the handshake state machine.
//!
//! This modules is private and restricted to the
//! [`handshake`](crate::handshake) scope. The public interface of the
//! handshake is provided by [`handshake`](crate::handshake).
//!
//! ```ignore
//! use super::events::*;
//! ```
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use super::state_machine::HandshakeParams;
use crate::Error;

// =============================================================================
// Crate-Public Interface
// =============================================================================

// ModeSetEvent ================================================================

/// Event fired to trigger a transition to `ModeSetState`, once `runmod=2` was
/// sent from the `IdleState` and the display had time to switch its runtime
/// mode.
#[derive(Debug)]
pub(crate) struct ModeSetEvent {
    pub params: HandshakeParams,
}

// NegotiateBaudEvent ==========================================================

/// Event fired to trigger a transition to `BaudNegotiatingState` when sleep
/// and dimming are confirmed disabled.
#[derive(Debug)]
pub(crate) struct NegotiateBaudEvent {
    pub params: HandshakeParams,
}

// ReadyEvent ==================================================================

/// Event fired when the display acknowledged the upload request with `0x05`.
/// It triggers a transition to the terminal `ReadyState`.
#[derive(Debug)]
pub(crate) struct ReadyEvent {
    pub params: HandshakeParams,
}

// FailedEvent =================================================================

/// Event fired from any non terminal state when the handshake cannot continue.
/// It triggers a transition to the terminal `FailedState`.
#[derive(Debug)]
pub(crate) struct FailedEvent {
    pub params: HandshakeParams,
    /// Why the handshake stopped, reported back to the session.
    pub reason: Error,
}

// Events enum =================================================================

/// Events that can be triggered within the handshake state machine.
///
/// Each possible value holds an `event`, which in turn holds the data for the
/// state transition.
#[derive(Debug)]
pub(crate) enum Event {
    ModeSet(ModeSetEvent),
    NegotiateBaud(NegotiateBaudEvent),
    Ready(ReadyEvent),
    Failed(FailedEvent),
}
