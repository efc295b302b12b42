//! Where the firmware bytes come from.

use std::io::{self, Read};

/// A pull-based supply of firmware bytes.
pub trait ByteSource {
    /// How many bytes can be read right now without blocking. Zero does not
    /// mean the source is done, check [`is_exhausted`](ByteSource::is_exhausted).
    fn available(&mut self) -> io::Result<usize>;

    /// Copy up to `buf.len()` bytes into `buf` and return how many were copied.
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// `true` once no more bytes will ever become available.
    fn is_exhausted(&self) -> bool;
}

/// A [`ByteSource`] over bytes already in memory.
#[derive(Debug)]
pub struct BufferSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BufferSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BufferSource { data, pos: 0 }
    }
}

impl ByteSource for BufferSource<'_> {
    fn available(&mut self) -> io::Result<usize> {
        Ok(self.data.len() - self.pos)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn is_exhausted(&self) -> bool {
        self.pos == self.data.len()
    }
}

/// A [`ByteSource`] over any [`Read`] implementation (file, socket, stdin...).
///
/// Data is pulled from the reader into an internal buffer whenever the
/// buffered bytes have all been consumed. A read returning `0` marks the end.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    buf: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        ReaderSource::with_capacity(DEFAULT_CAPACITY, reader)
    }

    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        ReaderSource {
            reader,
            buf: vec![0; capacity.max(1)],
            start: 0,
            end: 0,
            eof: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn available(&mut self) -> io::Result<usize> {
        if self.start == self.end && !self.eof {
            self.start = 0;
            self.end = 0;
            match self.reader.read(&mut self.buf) {
                Ok(0) => self.eof = true,
                Ok(n) => self.end = n,
                // Nothing right now, ask again on the next poll.
                Err(ref e)
                    if e.kind() == io::ErrorKind::Interrupted
                        || e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e),
            }
        }
        Ok(self.end - self.start)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.end - self.start);
        buf[..n].copy_from_slice(&self.buf[self.start..self.start + n]);
        self.start += n;
        Ok(n)
    }

    fn is_exhausted(&self) -> bool {
        self.eof && self.start == self.end
    }
}

const DEFAULT_CAPACITY: usize = 2048;

// =============================================================================
// Unit Tests
// =============================================================================
