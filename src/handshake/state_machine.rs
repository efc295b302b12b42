//! Handshake state machine.
//!
//! Before a Nextion display accepts firmware data, it has to be in runtime
//! mode 2, awake, and told the image size and the baud rate the upload will
//! run at. The handshake is strictly linear, it never goes back to a previous
//! state:
//!
//! ```text
//!      START
//!        |
//!        v
//!   .---------.  runmod=2
//!   |  Idle   |-----------.
//!   '---------'           |
//!                         v
//!                   .-----------.  get/set sleep, dim   .--------.
//!                   |  ModeSet  |---------------------->| Failed |
//!                   '-----------'       rejected        '--------'
//!                         |                                 ^
//!                   ok    v                                 |
//!              .-----------------.   no 0x05 within 800ms   |
//!              | BaudNegotiating |--------------------------'
//!              '-----------------'
//!                         |  0x05
//!                         v
//!                    .---------.
//!                    |  Ready  |
//!                    '---------'
//! ```

use super::events::*;
use super::states::*;
use crate::{transport::Transport, Error};

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// What the display needs to know to prepare for the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HandshakeParams {
    /// Size of the firmware image in bytes, `None` when unknown.
    pub file_size: Option<u64>,
    pub upload_baud_rate: u32,
}
impl HandshakeParams {
    /// The size argument of `whmi-wri`. An unknown size is sent as `-1`.
    pub fn file_size_arg(&self) -> String {
        match self.file_size {
            Some(size) => size.to_string(),
            None => "-1".into(),
        }
    }
}

/// Represents the handshake state machine. Use the `factory()` function to get
/// an instance then run it by calling its `run()` method.
pub(crate) struct Handshake {
    sm: HandshakeStates,
}
impl Handshake {
    /// Steps the state machine until it reaches `Ready` or `Failed`. On
    /// success, returns the baud rate the link now runs at.
    pub fn run(mut self, link: &mut dyn Transport) -> Result<u32, Error> {
        loop {
            self.sm = match self.sm {
                HandshakeStates::Ready(sm) => return Ok(sm.state.baud_rate),
                HandshakeStates::Failed(sm) => return Err(sm.state.reason),
                running => running.step(link),
            };
        }
    }
}

/// Factory function for the handshake state machine, which always starts in
/// the `Idle` state.
pub(crate) fn factory(params: HandshakeParams) -> Handshake {
    Handshake {
        sm: HandshakeStates::Idle(HandshakeSM::new(params)),
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// The raw state machine. The generic state holder keeps the parameters shared
/// by all states next to the data of the current one.
#[derive(Debug)]
struct HandshakeSM<S> {
    params: HandshakeParams,
    state: S,
}
impl<S: Runnable> HandshakeSM<S> {
    fn run(&mut self, link: &mut dyn Transport) -> Event {
        self.state.run(link, &self.params)
    }
}

impl HandshakeSM<IdleState> {
    fn new(params: HandshakeParams) -> Self {
        HandshakeSM {
            params,
            state: IdleState {},
        }
    }
}

enum HandshakeStates {
    Idle(HandshakeSM<IdleState>),
    ModeSet(HandshakeSM<ModeSetState>),
    BaudNegotiating(HandshakeSM<BaudNegotiatingState>),
    Ready(HandshakeSM<ReadyState>),
    Failed(HandshakeSM<FailedState>),
}
impl HandshakeStates {
    /// Runs the current state and transitions on the event it returns. Only
    /// transitions with a `From` implementation compile.
    fn step(self, link: &mut dyn Transport) -> Self {
        match self {
            HandshakeStates::Idle(mut sm) => match sm.run(link) {
                Event::ModeSet(ev) => HandshakeStates::ModeSet(ev.into()),
                Event::Failed(ev) => HandshakeStates::Failed(ev.into()),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            HandshakeStates::ModeSet(mut sm) => match sm.run(link) {
                Event::NegotiateBaud(ev) => HandshakeStates::BaudNegotiating(ev.into()),
                Event::Failed(ev) => HandshakeStates::Failed(ev.into()),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            HandshakeStates::BaudNegotiating(mut sm) => match sm.run(link) {
                Event::Ready(ev) => HandshakeStates::Ready(ev.into()),
                Event::Failed(ev) => HandshakeStates::Failed(ev.into()),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            HandshakeStates::Ready(_) | HandshakeStates::Failed(_) => {
                unreachable!("terminal handshake states are not stepped")
            }
        }
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<ModeSetEvent> for HandshakeSM<ModeSetState> {
    fn from(event: ModeSetEvent) -> HandshakeSM<ModeSetState> {
        HandshakeSM {
            params: event.params,
            state: ModeSetState {},
        }
    }
}

impl From<NegotiateBaudEvent> for HandshakeSM<BaudNegotiatingState> {
    fn from(event: NegotiateBaudEvent) -> HandshakeSM<BaudNegotiatingState> {
        HandshakeSM {
            params: event.params,
            state: BaudNegotiatingState {},
        }
    }
}

impl From<ReadyEvent> for HandshakeSM<ReadyState> {
    fn from(event: ReadyEvent) -> HandshakeSM<ReadyState> {
        HandshakeSM {
            params: event.params,
            state: ReadyState {
                baud_rate: event.params.upload_baud_rate,
            },
        }
    }
}

impl From<FailedEvent> for HandshakeSM<FailedState> {
    fn from(event: FailedEvent) -> HandshakeSM<FailedState> {
        HandshakeSM {
            params: event.params,
            state: FailedState {
                reason: event.reason,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::mock::{numeric, MockTransport, Op};
    use pretty_assertions::assert_eq;

    fn params() -> HandshakeParams {
        HandshakeParams {
            file_size: Some(10_000),
            upload_baud_rate: 115_200,
        }
    }

    #[test]
    fn reaches_ready_on_ack() {
        let mut link = MockTransport::cooperative(9600);
        let baud = factory(params()).run(&mut link).unwrap();

        assert_eq!(baud, 115_200);
        assert_eq!(
            link.commands(),
            vec!["runmod=2", "get sleep", "get dim", "00", "whmi-wri 10000,115200,0"]
        );
    }

    #[test]
    fn flushes_before_switching_baud() {
        let mut link = MockTransport::cooperative(9600);
        factory(params()).run(&mut link).unwrap();

        let whmi = link
            .ops
            .iter()
            .position(|op| matches!(op, Op::Command(c) if c.starts_with("whmi-wri")))
            .unwrap();
        assert_eq!(link.ops[whmi + 1], Op::Flush);
        assert_eq!(link.ops[whmi + 2], Op::Baud(115_200));
        assert_eq!(link.baud_rate(), 115_200);
    }

    #[test]
    fn settles_around_runmod() {
        let mut link = MockTransport::cooperative(9600);
        factory(params()).run(&mut link).unwrap();

        assert_eq!(link.ops[0], Op::Pause(Duration::from_millis(100)));
        assert_eq!(link.ops[1], Op::Command("runmod=2".into()));
        assert_eq!(link.ops[2], Op::Pause(Duration::from_millis(60)));
    }

    #[test]
    fn wakes_and_brightens_display() {
        let mut link = MockTransport::new(9600)
            .reply("get sleep", &numeric(1))
            .reply("get dim", &numeric(20))
            .reply("whmi-wri", &[0x05]);
        factory(params()).run(&mut link).unwrap();

        assert_eq!(
            link.commands(),
            vec![
                "runmod=2",
                "get sleep",
                "sleep=0",
                "get dim",
                "dim=100",
                "00",
                "whmi-wri 10000,115200,0"
            ]
        );
    }

    #[test]
    fn unknown_size_is_sent_as_minus_one() {
        let mut link = MockTransport::cooperative(9600);
        let params = HandshakeParams {
            file_size: None,
            upload_baud_rate: 921_600,
        };
        factory(params).run(&mut link).unwrap();

        assert!(link
            .commands()
            .contains(&"whmi-wri -1,921600,0".to_string()));
    }

    #[test]
    fn silent_display_fails_sleep_and_dim() {
        let mut link = MockTransport::new(9600);
        let err = factory(params()).run(&mut link).unwrap_err();

        assert!(matches!(err, Error::SleepAndDim));
        assert_eq!(err.to_string(), "handling sleep and dim settings failed");
        assert_eq!(link.commands(), vec!["runmod=2", "get sleep"]);
    }

    #[test]
    fn rejected_wake_up_fails_sleep_and_dim() {
        let mut link = MockTransport::new(9600)
            .reply("get sleep", &numeric(1))
            .reply("sleep=0", &[0x1C, 0xFF, 0xFF, 0xFF]);
        let err = factory(params()).run(&mut link).unwrap_err();

        assert!(matches!(err, Error::SleepAndDim));
        assert_eq!(link.commands(), vec!["runmod=2", "get sleep", "sleep=0"]);
    }

    #[test]
    fn missing_ack_fails_preparation() {
        let mut link = MockTransport::new(9600)
            .reply("get sleep", &numeric(0))
            .reply("get dim", &numeric(100));
        let err = factory(params()).run(&mut link).unwrap_err();

        assert!(matches!(err, Error::PrepareFailed));
        assert_eq!(err.to_string(), "preparation for firmware update failed");
    }

    #[test]
    fn wrong_ack_fails_preparation() {
        let mut link = MockTransport::new(9600)
            .reply("get sleep", &numeric(0))
            .reply("get dim", &numeric(100))
            .reply("whmi-wri", &[0x1A, 0xFF, 0xFF, 0xFF]);
        let err = factory(params()).run(&mut link).unwrap_err();

        assert!(matches!(err, Error::PrepareFailed));
    }

    #[test]
    fn probe_response_is_ignored() {
        let mut link = MockTransport::cooperative(9600).reply("00", &[0x1A, 0xFF, 0xFF, 0xFF]);
        assert_eq!(factory(params()).run(&mut link).unwrap(), 115_200);
    }
}
