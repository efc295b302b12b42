//! The serial link to the display.
//!
//! Everything the protocol needs from the serial port goes through the
//! [`Transport`] trait so that the handshake and the upload can run against
//! a real port ([`SerialLink`]) or a scripted one in tests.

use std::{
    fmt,
    io::{self, Read, Write},
    thread,
    time::Duration,
};

use serialport::SerialPort;

#[cfg(test)]
pub(crate) mod mock;

// =============================================================================
// Public Interface
// =============================================================================

/// A byte-oriented duplex serial channel with a switchable baud rate.
pub trait Transport {
    /// Queue `bytes` for transmission. Does not wait for them to leave the
    /// wire, see [`flush`](Transport::flush).
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Block until the outbound buffer is fully drained.
    fn flush(&mut self) -> io::Result<()>;

    /// Wait up to `timeout` for incoming data and return whatever is
    /// available. An empty vector means the window expired with nothing read.
    fn read_available(&mut self, timeout: Duration) -> io::Result<Vec<u8>>;

    /// Switch the host side of the link to `baud_rate`. The switch is not
    /// queued behind pending output, flush first if that matters.
    fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()>;

    /// The baud rate the host side of the link currently runs at.
    fn baud_rate(&self) -> u32;

    /// Give the display (and the host scheduler) some time.
    fn pause(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// A [`Transport`] over an open [`serialport`] port.
///
/// The baud rate is cached so that it can be queried without touching the
/// device.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    baud_rate: u32,
}

impl SerialLink {
    pub fn new(port: Box<dyn SerialPort>, baud_rate: u32) -> Self {
        SerialLink { port, baud_rate }
    }

    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl Transport for SerialLink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        Write::write_all(&mut self.port, bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.port)
    }

    fn read_available(&mut self, timeout: Duration) -> io::Result<Vec<u8>> {
        self.port.set_timeout(timeout)?;

        let mut buf = vec![0; READ_CHUNK_SIZE];
        let n = match self.port.read(&mut buf) {
            Ok(n) => n,
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => 0,
            Err(e) => return Err(e),
        };
        buf.truncate(n);

        // Drain whatever else arrived in the meantime without blocking again.
        if n > 0 {
            let pending = self.port.bytes_to_read()? as usize;
            if pending > 0 {
                let mut rest = vec![0; pending];
                self.port.read_exact(&mut rest)?;
                buf.extend_from_slice(&rest);
            }
        }
        Ok(buf)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()> {
        self.port.set_baud_rate(baud_rate)?;
        self.baud_rate = baud_rate;
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let port = &self.port;
        f.debug_tuple("SerialLink")
            .field(&port.name())
            .field(&self.baud_rate)
            .field(&port.data_bits())
            .field(&port.stop_bits())
            .field(&port.parity())
            .field(&port.flow_control())
            .finish()
    }
}

// =============================================================================
// Private stuff
// =============================================================================

const READ_CHUNK_SIZE: usize = 256;
