//! States for the handshake state machine.
//!
//! This modules is private and restricted to the
//! [`handshake`](crate::handshake) scope. The public interface of the
//! handshake is provided by [`handshake`](crate::handshake).
//!
//! ```ignore
//! use super::states::*;
//! ```
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use std::{io, time::Duration};

use log::{debug, info};

use super::events::*;
use super::state_machine::HandshakeParams;
use crate::command::{
    contains_ready, ends_with_terminator, error_return, numeric_return, recv_response,
    send_command, send_flush,
};
use crate::{transport::Transport, Error};

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Trait adding the ability for a state to be `run` after a transition into it.
pub(crate) trait Runnable {
    /// Do the work of the state over `link` and request the transition to the
    /// next state by returning the matching `event`.
    fn run(&mut self, link: &mut dyn Transport, params: &HandshakeParams) -> Event;
}

// Idle State ==================================================================

/// The initial state. Puts the display in runtime mode 2, which is required
/// before it accepts `whmi-wri`.
///
///  * **[`ModeSetEvent`] => [`ModeSetState`]** once the command was sent,
///  * **[`FailedEvent`] => [`FailedState`]** if the link fails.
#[derive(Debug)]
pub(crate) struct IdleState {}
impl Runnable for IdleState {
    fn run(&mut self, link: &mut dyn Transport, params: &HandshakeParams) -> Event {
        info!("=> Idle");

        link.pause(MODE_SETTLE_BEFORE);
        if let Err(e) = send_command(link, "runmod=2") {
            return failed(params, e.into());
        }
        link.pause(MODE_SETTLE_AFTER);

        Event::ModeSet(ModeSetEvent { params: *params })
    }
}

// ModeSet State ===============================================================

/// Makes sure the display will not fall asleep or dim out in the middle of
/// the upload.
///
///  * **[`NegotiateBaudEvent`] => [`BaudNegotiatingState`]** when sleep is off
///    and brightness is at full,
///  * **[`FailedEvent`] => [`FailedState`]** when the display does not answer
///    the queries or rejects one of the commands.
#[derive(Debug)]
pub(crate) struct ModeSetState {}
impl Runnable for ModeSetState {
    fn run(&mut self, link: &mut dyn Transport, params: &HandshakeParams) -> Event {
        info!("=> ModeSet");

        match disable_sleep_and_dim(link) {
            Ok(true) => Event::NegotiateBaud(NegotiateBaudEvent { params: *params }),
            Ok(false) => failed(params, Error::SleepAndDim),
            Err(e) => failed(params, e.into()),
        }
    }
}

// BaudNegotiating State =======================================================

/// Requests the firmware update and moves the host side of the link to the
/// upload baud rate.
///
///  * **[`ReadyEvent`] => [`ReadyState`]** when the display answers `0x05`,
///  * **[`FailedEvent`] => [`FailedState`]** otherwise.
#[derive(Debug)]
pub(crate) struct BaudNegotiatingState {}
impl Runnable for BaudNegotiatingState {
    fn run(&mut self, link: &mut dyn Transport, params: &HandshakeParams) -> Event {
        info!("=> BaudNegotiating");

        match request_firmware_update(link, params) {
            Ok(true) => {
                info!("preparation for firmware update done");
                Event::Ready(ReadyEvent { params: *params })
            }
            Ok(false) => failed(params, Error::PrepareFailed),
            Err(e) => failed(params, e.into()),
        }
    }
}

// Ready State =================================================================

/// Terminal state: the display waits for the first packet.
#[derive(Debug)]
pub(crate) struct ReadyState {
    pub baud_rate: u32,
}

// Failed State ================================================================

/// Terminal state: the upload must not go ahead.
#[derive(Debug)]
pub(crate) struct FailedState {
    pub reason: Error,
}

// =============================================================================
// Private stuff
// =============================================================================

const MODE_SETTLE_BEFORE: Duration = Duration::from_millis(100);
const MODE_SETTLE_AFTER: Duration = Duration::from_millis(60);
const SETTINGS_TIMEOUT: Duration = Duration::from_millis(500);
/// The display normally answers within 400 ms.
const PREPARE_TIMEOUT: Duration = Duration::from_millis(800);
const FULL_BRIGHTNESS: u32 = 100;

fn failed(params: &HandshakeParams, reason: Error) -> Event {
    info!("{}", reason);
    Event::Failed(FailedEvent {
        params: *params,
        reason,
    })
}

/// Wake the display up if sleep is active (`sleep=0`) and bring it to full
/// brightness if `dim` is below 100. Returns `false` when a query gets no
/// numeric return or an assignment is rejected.
fn disable_sleep_and_dim(link: &mut dyn Transport) -> io::Result<bool> {
    let sleep = match query(link, "get sleep")? {
        Some(value) => value,
        None => return Ok(false),
    };
    if sleep != 0 && !assign(link, "sleep=0")? {
        return Ok(false);
    }

    let dim = match query(link, "get dim")? {
        Some(value) => value,
        None => return Ok(false),
    };
    if dim < FULL_BRIGHTNESS && !assign(link, &format!("dim={}", FULL_BRIGHTNESS))? {
        return Ok(false);
    }

    Ok(true)
}

/// Send a `get` instruction and decode its numeric return.
fn query(link: &mut dyn Transport, text: &str) -> io::Result<Option<u32>> {
    send_command(link, text)?;
    let response = recv_response(link, SETTINGS_TIMEOUT, ends_with_terminator)?;
    let value = numeric_return(&response);
    match value {
        Some(v) => debug!("`{}` = {}", text, v),
        None => info!("no numeric answer to `{}`", text),
    }
    Ok(value)
}

/// Send an assignment. Silence counts as success, only an explicit error
/// return is a failure.
///
/// At the default `bkcmd=2` the display only answers instructions that
/// failed, so a successful `sleep=0` or `dim=100` produces no bytes at all.
fn assign(link: &mut dyn Transport, text: &str) -> io::Result<bool> {
    send_command(link, text)?;
    let response = recv_response(link, SETTINGS_TIMEOUT, ends_with_terminator)?;
    match error_return(&response) {
        Some(code) => {
            info!("`{}` rejected with code {:#04x}", text, code);
            Ok(false)
        }
        None => Ok(true),
    }
}

fn request_firmware_update(link: &mut dyn Transport, params: &HandshakeParams) -> io::Result<bool> {
    // Whatever comes back here is not meaningful, the wait just gives the
    // display time to settle.
    send_command(link, "00")?;
    recv_response(link, PREPARE_TIMEOUT, contains_ready)?;

    let command = format!(
        "whmi-wri {},{},0",
        params.file_size_arg(),
        params.upload_baud_rate
    );
    send_command(link, &command)?;

    // The display switches baud rate as soon as it parses `whmi-wri`, and so
    // does the host below. Anything still buffered would go out at the new
    // rate, so drain it at the old one first.
    send_flush(link)?;
    info!("changing upload baud rate to {}", params.upload_baud_rate);
    link.set_baud_rate(params.upload_baud_rate)?;

    let response = recv_response(link, PREPARE_TIMEOUT, contains_ready)?;
    Ok(contains_ready(&response))
}
