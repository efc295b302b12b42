//! Packet flow control.
//!
//! The display takes firmware data in packets of 4096 bytes and answers
//! `0x05` after each one, once it has written the packet to its flash. The
//! host must not send the next packet before that.

use std::time::Duration;

use log::{debug, error, trace};

use crate::command::{contains_ready, recv_response};
use crate::{transport::Transport, Error};

/// Bytes the display accepts before it must acknowledge.
pub(crate) const PACKET_SIZE: usize = 4096;

const ACK_TIMEOUT: Duration = Duration::from_millis(500);
const MAX_ACK_RETRIES: u32 = 8;

/// Writes firmware bytes and keeps count of how far into the current packet
/// the display is.
#[derive(Debug, Default)]
pub(crate) struct PacketWriter {
    sent: usize,
}

impl PacketWriter {
    /// Bytes sent since the last acknowledgment, never more than
    /// [`PACKET_SIZE`].
    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn reset(&mut self) {
        self.sent = 0;
    }

    /// Write all of `bytes`, stopping at every packet boundary until the
    /// display acknowledges. Nothing past a boundary is written before the
    /// acknowledgment.
    pub fn write(&mut self, link: &mut dyn Transport, mut bytes: &[u8]) -> Result<(), Error> {
        loop {
            if self.sent == PACKET_SIZE {
                self.await_ready(link)?;
            }
            if bytes.is_empty() {
                return Ok(());
            }

            let n = (PACKET_SIZE - self.sent).min(bytes.len());
            link.write_all(&bytes[..n])?;
            self.sent += n;
            bytes = &bytes[n..];
            trace!("{} bytes written, {} in current packet", n, self.sent);
        }
    }

    fn await_ready(&mut self, link: &mut dyn Transport) -> Result<(), Error> {
        let mut retries = 0;
        loop {
            let response = recv_response(link, ACK_TIMEOUT, contains_ready)?;
            if contains_ready(&response) {
                self.sent = 0;
                return Ok(());
            }
            if retries >= MAX_ACK_RETRIES {
                error!("no packet acknowledgment after {} retries", retries);
                return Err(Error::ConnectionLost);
            }
            retries += 1;
            debug!("packet acknowledgment timeout ({}/{})", retries, MAX_ACK_RETRIES);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
