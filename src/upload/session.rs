//! One firmware upload, from handshake to reset.

use std::{convert::TryFrom, fmt, time::Duration};

use log::{debug, error, info};

use super::packets::PacketWriter;
use super::source::ByteSource;
use crate::command::{send_command, transmission_time_ms};
use crate::handshake::{self as hsm, HandshakeParams};
use crate::{transport::Transport, Error};

/// Largest chunk pulled from a [`ByteSource`] at once.
const STREAM_CHUNK_SIZE: usize = 2048;
/// How long to wait before polling a source that had nothing available.
const IDLE_POLL_DELAY: Duration = Duration::from_millis(1);
/// Time the display needs after the last packet to finish flashing.
const FLASH_SETTLE_DELAY: Duration = Duration::from_millis(1600);

/// Drives a single firmware upload over `link`.
///
/// The session owns all upload state. Every operation that fails records the
/// failure as the [status message](UploadSession::status_message) before
/// returning the error; nothing is retried at the session level, a failed
/// upload has to start over with a new session.
pub struct UploadSession<T: Transport> {
    link: T,
    normal_baud_rate: u32,
    upload_baud_rate: u32,
    /// `None` when the firmware size is not known up front.
    remaining: Option<u64>,
    packets: PacketWriter,
    status: String,
    progress: Option<Box<dyn FnMut()>>,
}

impl<T: Transport> UploadSession<T> {
    /// Start a session over `link`, which must run at the display's normal
    /// baud rate.
    pub fn new(link: T, upload_baud_rate: u32) -> Self {
        UploadSession {
            normal_baud_rate: link.baud_rate(),
            link,
            upload_baud_rate,
            remaining: None,
            packets: PacketWriter::default(),
            status: String::new(),
            progress: None,
        }
    }

    /// Record the firmware size (`None` if unknown) and run the handshake.
    pub fn prepare_upload(&mut self, file_size: Option<u64>) -> Result<(), Error> {
        self.remaining = file_size;
        self.connect()
    }

    /// Bring the display into firmware update mode at the upload baud rate.
    ///
    /// On failure the link is back at the normal baud rate, so the session
    /// can connect again.
    pub fn connect(&mut self) -> Result<(), Error> {
        info!("serial tests & connect");
        let params = HandshakeParams {
            file_size: self.remaining,
            upload_baud_rate: self.upload_baud_rate,
        };
        let result = hsm::factory(params).run(&mut self.link).map(|baud_rate| {
            debug!("link running at {} baud", baud_rate);
        });
        if result.is_err() && self.link.baud_rate() != self.normal_baud_rate {
            info!("restoring baud rate {}", self.normal_baud_rate);
            if let Err(e) = self.link.set_baud_rate(self.normal_baud_rate) {
                error!("failed to restore baud rate: {}", e);
            }
        }
        self.record(result)
    }

    /// Upload `bytes` as they are.
    ///
    /// Callers feeding the firmware through several calls must cut it into
    /// chunks of 4096 bytes, except for the last one. When the firmware size
    /// is known, a buffer going past it is rejected before anything is
    /// written.
    pub fn upload(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if let Some(remaining) = self.remaining {
            let len = bytes.len() as u64;
            if len > remaining {
                let result = Err(Error::SizeExceeded {
                    excess: len - remaining,
                });
                return self.record(result);
            }
        }
        let result = self.packets.write(&mut self.link, bytes);
        if result.is_ok() {
            self.consume(bytes.len());
        }
        self.record(result)
    }

    /// Upload everything `source` provides, up to the size given to
    /// [`prepare_upload`](UploadSession::prepare_upload).
    ///
    /// The progress callback is called after each chunk of at most 2048
    /// bytes.
    pub fn upload_from<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> Result<(), Error> {
        let result = self.stream(source);
        self.record(result)
    }

    /// Let the display finish flashing, return the link to the normal baud
    /// rate and restart the display.
    pub fn end(&mut self) -> Result<(), Error> {
        self.link.pause(FLASH_SETTLE_DELAY);
        let result = self
            .link
            .set_baud_rate(self.normal_baud_rate)
            .and_then(|_| self.soft_reset_link());
        self.packets.reset();
        self.record(result.map_err(Error::from))?;

        self.status = "upload ok".into();
        info!("{}", self.status);
        Ok(())
    }

    /// Restart the display. No answer is expected.
    pub fn soft_reset(&mut self) -> Result<(), Error> {
        let result = self.soft_reset_link().map_err(Error::from);
        self.record(result)
    }

    /// Register `callback`, invoked after each chunk uploaded by
    /// [`upload_from`](UploadSession::upload_from). It runs on the upload
    /// loop, so it should return quickly.
    pub fn set_progress_callback<F: FnMut() + 'static>(&mut self, callback: F) {
        self.progress = Some(Box::new(callback));
    }

    /// Estimated time to send `message` at the link's current baud rate.
    pub fn calculate_transmission_time_ms(&self, message: &str) -> u32 {
        let ms = transmission_time_ms(self.link.baud_rate(), message);
        debug!("calculated transmission time: {} ms", ms);
        ms
    }

    /// What happened last: `"upload ok"` or the display text of the last
    /// error.
    pub fn status_message(&self) -> &str {
        &self.status
    }

    /// Firmware bytes still to be sent, `None` when the size is unknown.
    pub fn remaining_bytes(&self) -> Option<u64> {
        self.remaining
    }

    /// Bytes sent since the display last acknowledged a packet.
    pub fn sent_packet_count(&self) -> usize {
        self.packets.sent()
    }

    pub fn upload_baud_rate(&self) -> u32 {
        self.upload_baud_rate
    }

    pub fn normal_baud_rate(&self) -> u32 {
        self.normal_baud_rate
    }

    pub fn get_ref(&self) -> &T {
        &self.link
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.link
    }

    pub fn into_inner(self) -> T {
        self.link
    }

    fn stream<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> Result<(), Error> {
        let mut buf = [0u8; STREAM_CHUNK_SIZE];

        while self.remaining != Some(0) {
            let available = source.available()?;
            if available == 0 {
                if source.is_exhausted() {
                    return match self.remaining {
                        None => Ok(()),
                        Some(remaining) => Err(Error::SourceExhausted { remaining }),
                    };
                }
                self.link.pause(IDLE_POLL_DELAY);
                continue;
            }

            let mut want = available.min(buf.len());
            if let Some(remaining) = self.remaining {
                want = want.min(usize::try_from(remaining).unwrap_or(usize::MAX));
            }
            let n = source.read_bytes(&mut buf[..want])?;

            self.packets.write(&mut self.link, &buf[..n])?;
            if let Some(callback) = self.progress.as_mut() {
                callback();
            }
            self.consume(n);
        }
        Ok(())
    }

    fn consume(&mut self, n: usize) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(n as u64);
        }
    }

    fn soft_reset_link(&mut self) -> std::io::Result<()> {
        send_command(&mut self.link, "rest")
    }

    fn record<R>(&mut self, result: Result<R, Error>) -> Result<R, Error> {
        if let Err(ref e) = result {
            self.status = e.to_string();
            info!("{}", self.status);
        }
        result
    }
}

impl<T: Transport + fmt::Debug> fmt::Debug for UploadSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession")
            .field("link", &self.link)
            .field("normal_baud_rate", &self.normal_baud_rate)
            .field("upload_baud_rate", &self.upload_baud_rate)
            .field("remaining", &self.remaining)
            .field("packets", &self.packets)
            .field("status", &self.status)
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
