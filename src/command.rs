//! Nextion instruction set framing.
//!
//! Every instruction sent to the display is ASCII text followed by three
//! `0xFF` bytes. Responses are read raw: the upload protocol only relies on
//! the single `0x05` byte the display sends when it is ready for more data,
//! plus the numeric and error return frames used while preparing the display.

use std::time::{Duration, Instant};

use hexplay::HexViewBuilder;
use log::{debug, log_enabled, trace, Level::Debug};

use crate::transport::Transport;

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Appended to every instruction.
pub const TERMINATOR: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Sent by the display when it accepted the upload request or a full packet.
pub const READY: u8 = 0x05;

/// First byte of a numeric return frame (`get` results).
const NUMERIC_RETURN: u8 = 0x71;

/// Return codes the display sends back when it could not execute an
/// instruction (invalid instruction, variable, operation, assignment...).
const ERROR_RETURNS: [u8; 12] = [
    0x00, 0x02, 0x03, 0x04, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x1F, 0x20, 0x23,
];

/// Write `text` and the terminator to the link. The caller flushes if the
/// bytes must be on the wire before the next step.
pub(crate) fn send_command(link: &mut dyn Transport, text: &str) -> std::io::Result<()> {
    trace!(
        "-> {:?} (~{} ms at {} baud)",
        text,
        transmission_time_ms(link.baud_rate(), text),
        link.baud_rate()
    );
    let mut frame = Vec::with_capacity(text.len() + TERMINATOR.len());
    frame.extend_from_slice(text.as_bytes());
    frame.extend_from_slice(&TERMINATOR);
    link.write_all(&frame)
}

/// Block until everything written so far has physically left the host.
///
/// A baud rate switch takes effect immediately and would otherwise garble
/// output still sitting in the transmit buffer.
pub(crate) fn send_flush(link: &mut dyn Transport) -> std::io::Result<()> {
    link.flush()
}

/// Collect response bytes for at most `timeout`.
///
/// Reading stops early when no more bytes arrive or when `stop` returns
/// `true` for what has been received so far.
pub(crate) fn recv_response(
    link: &mut dyn Transport,
    timeout: Duration,
    stop: fn(&[u8]) -> bool,
) -> std::io::Result<Vec<u8>> {
    let started = Instant::now();
    let mut response = Vec::new();
    let mut left = timeout;

    loop {
        let chunk = link.read_available(left)?;
        if chunk.is_empty() {
            break;
        }
        response.extend_from_slice(&chunk);
        if stop(&response) {
            break;
        }
        left = match timeout.checked_sub(started.elapsed()) {
            Some(left) if left > Duration::from_millis(0) => left,
            _ => break,
        };
    }

    debug!("<- {} bytes", response.len());
    if log_enabled!(Debug) && !response.is_empty() {
        let view = HexViewBuilder::new(&response)
            .address_offset(0)
            .row_width(16)
            .finish();
        debug!("\n{}", view);
    }
    Ok(response)
}

/// `true` when the ready byte appears anywhere in `response`.
///
/// This is plain byte containment: a `0x05` inside unrelated data looks
/// exactly like a real acknowledgment.
pub(crate) fn contains_ready(response: &[u8]) -> bool {
    response.contains(&READY)
}

/// `true` once `response` ends with a complete terminator.
pub(crate) fn ends_with_terminator(response: &[u8]) -> bool {
    response.ends_with(&TERMINATOR)
}

/// Decode the first numeric return frame (`0x71 b0 b1 b2 b3 FF FF FF`) found
/// in `response`.
pub(crate) fn numeric_return(response: &[u8]) -> Option<u32> {
    response.windows(8).find_map(|frame| {
        if frame[0] == NUMERIC_RETURN && frame[5..] == TERMINATOR {
            Some(u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]))
        } else {
            None
        }
    })
}

/// The failure code, if `response` starts with an error return frame.
pub(crate) fn error_return(response: &[u8]) -> Option<u8> {
    match response {
        [code, 0xFF, 0xFF, 0xFF, ..] if ERROR_RETURNS.contains(code) => Some(*code),
        _ => None,
    }
}

/// Estimated time in milliseconds to transmit `message` and its terminator
/// at `baud_rate`, assuming 10 bits per byte (8 data, 1 start, 1 stop).
///
/// At 9600 baud a byte takes 1041 us, so a 10 character message (13 bytes on
/// the wire) takes 13 ms.
pub fn transmission_time_ms(baud_rate: u32, message: &str) -> u32 {
    if baud_rate == 0 {
        return u32::MAX;
    }
    let byte_us = 10_000_000 / u64::from(baud_rate);
    let bytes = (message.len() + TERMINATOR.len()) as u64;
    let total_ms = bytes * byte_us / 1000;
    if total_ms > u64::from(u32::MAX) {
        u32::MAX
    } else {
        total_ms as u32
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{numeric, MockTransport, Op};
    use pretty_assertions::assert_eq;

    #[test]
    fn command_is_terminated() {
        let mut link = MockTransport::new(9600);
        send_command(&mut link, "runmod=2").unwrap();
        assert_eq!(link.commands(), vec!["runmod=2".to_string()]);
        assert_eq!(link.data.len(), 0);
    }

    #[test]
    fn flush_reaches_the_link() {
        let mut link = MockTransport::new(9600);
        send_flush(&mut link).unwrap();
        assert_eq!(link.ops, vec![Op::Flush]);
    }

    #[test]
    fn recv_stops_on_ready() {
        let mut link = MockTransport::new(9600);
        link.then_read(&[0x1A, 0x05]).then_read(&[0x05]);
        let response = recv_response(&mut link, Duration::from_millis(800), contains_ready).unwrap();
        assert_eq!(response, vec![0x1A, 0x05]);
        assert_eq!(link.timeouts(), 0);
    }

    #[test]
    fn recv_accumulates_until_silence() {
        let mut link = MockTransport::new(9600);
        link.then_read(&[0x71, 0x01]).then_read(&[0, 0, 0]);
        let response = recv_response(&mut link, Duration::from_millis(500), contains_ready).unwrap();
        assert_eq!(response, vec![0x71, 0x01, 0, 0, 0]);
        assert_eq!(link.timeouts(), 1);
    }

    #[test]
    fn recv_empty_on_timeout() {
        let mut link = MockTransport::new(9600);
        let response = recv_response(&mut link, Duration::from_millis(500), contains_ready).unwrap();
        assert!(response.is_empty());
        assert_eq!(link.ops, vec![Op::Timeout(Duration::from_millis(500))]);
    }

    #[test]
    fn ready_is_plain_containment() {
        assert!(contains_ready(&[0x05]));
        assert!(contains_ready(b"abc\x05def"));
        assert!(!contains_ready(&[]));
        assert!(!contains_ready(&[0x1A, 0xFF, 0xFF, 0xFF]));
    }

    #[test]
    fn numeric_frames() {
        assert_eq!(numeric_return(&numeric(0)), Some(0));
        assert_eq!(numeric_return(&numeric(100)), Some(100));
        let mut noisy = vec![0x1A, 0xFF, 0xFF, 0xFF];
        noisy.extend(numeric(30));
        assert_eq!(numeric_return(&noisy), Some(30));
        assert_eq!(numeric_return(&[0x71, 0, 0, 0]), None);
        assert_eq!(numeric_return(&[]), None);
    }

    #[test]
    fn error_frames() {
        assert_eq!(error_return(&[0x1A, 0xFF, 0xFF, 0xFF]), Some(0x1A));
        assert_eq!(error_return(&[0x01, 0xFF, 0xFF, 0xFF]), None);
        assert_eq!(error_return(&numeric(0)), None);
        assert_eq!(error_return(&[0x1C]), None);
    }

    #[test]
    fn terminator_detection() {
        assert!(ends_with_terminator(&numeric(1)));
        assert!(!ends_with_terminator(&[0x71, 0xFF, 0xFF]));
    }

    #[test]
    fn transmission_time_at_9600() {
        assert_eq!(transmission_time_ms(9600, "0123456789"), 13);
        assert_eq!(transmission_time_ms(9600, ""), 3);
        assert_eq!(transmission_time_ms(0, "rest"), u32::MAX);
    }

    #[test]
    fn transmission_time_is_monotonic() {
        let bauds = [2400, 9600, 19200, 57600, 115_200, 512_000, 921_600];
        let messages: Vec<String> = (0..200).map(|n| "x".repeat(n)).collect();

        for baud in bauds.iter() {
            for pair in messages.windows(2) {
                assert!(
                    transmission_time_ms(*baud, &pair[0]) <= transmission_time_ms(*baud, &pair[1])
                );
            }
        }
        for message in messages.iter() {
            for pair in bauds.windows(2) {
                assert!(
                    transmission_time_ms(pair[0], message) >= transmission_time_ms(pair[1], message)
                );
            }
        }
    }
}
