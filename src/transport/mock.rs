//! A scripted [`Transport`] for unit tests.
//!
//! Writes ending with the command terminator are recorded as commands and may
//! trigger a canned reply; anything else is recorded as firmware data. Reads
//! first return pending replies, then scripted reads, then time out. Writes
//! and reads can be made to fail to simulate an unplugged link.

use std::{collections::VecDeque, io, time::Duration};

use super::Transport;

const TERMINATOR: [u8; 3] = [0xFF; 3];

/// One observable interaction with the mock, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Op {
    Command(String),
    Data(usize),
    Flush,
    Baud(u32),
    Pause(Duration),
    Read(usize),
    Timeout(Duration),
}

#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    pub ops: Vec<Op>,
    pub data: Vec<u8>,
    baud_rate: u32,
    replies: Vec<(String, Vec<u8>)>,
    pending: Vec<u8>,
    scripted: VecDeque<Vec<u8>>,
    ack_every: Option<usize>,
    writes_left: Option<usize>,
    fail_read: bool,
}

impl MockTransport {
    pub fn new(baud_rate: u32) -> Self {
        MockTransport {
            baud_rate,
            ..Default::default()
        }
    }

    /// A display that answers the sleep/dim queries (sleep off, full
    /// brightness) and accepts the firmware update request.
    pub fn cooperative(baud_rate: u32) -> Self {
        MockTransport::new(baud_rate)
            .reply("get sleep", &numeric(0))
            .reply("get dim", &numeric(100))
            .reply("whmi-wri", &[0x05])
    }

    /// Queue `bytes` for reading every time a command starting with `prefix`
    /// is written.
    pub fn reply(mut self, prefix: &str, bytes: &[u8]) -> Self {
        self.replies.push((prefix.into(), bytes.to_vec()));
        self
    }

    /// Answer `0x05` every time another `packet` bytes of data were written,
    /// like the display does.
    pub fn acking(mut self, packet: usize) -> Self {
        self.ack_every = Some(packet);
        self
    }

    /// Queue the result of one future read once pending replies are drained.
    /// An empty vector scripts a timeout.
    pub fn then_read(&mut self, bytes: &[u8]) -> &mut Self {
        self.scripted.push_back(bytes.to_vec());
        self
    }

    /// Let `n` more writes through, then fail every write with `BrokenPipe`.
    pub fn fail_writes_after(&mut self, n: usize) -> &mut Self {
        self.writes_left = Some(n);
        self
    }

    /// Fail the next read with `BrokenPipe`.
    pub fn fail_next_read(&mut self) -> &mut Self {
        self.fail_read = true;
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Command(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn timeouts(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::Timeout(_)))
            .count()
    }

    pub fn paused(&self) -> Duration {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Pause(d) => Some(*d),
                _ => None,
            })
            .sum()
    }
}

impl Transport for MockTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self.writes_left.as_mut() {
            Some(0) => return Err(broken_pipe()),
            Some(left) => *left -= 1,
            None => {}
        }
        let text = bytes
            .strip_suffix(&TERMINATOR)
            .filter(|t| t.iter().all(u8::is_ascii))
            .map(|t| String::from_utf8_lossy(t).into_owned());
        match text {
            Some(command) => {
                if let Some((_, reply)) = self
                    .replies
                    .iter()
                    .find(|(prefix, _)| command.starts_with(prefix.as_str()))
                {
                    self.pending.extend_from_slice(reply);
                }
                self.ops.push(Op::Command(command));
            }
            None => {
                let before = self.data.len();
                self.data.extend_from_slice(bytes);
                if let Some(packet) = self.ack_every {
                    for _ in before / packet..self.data.len() / packet {
                        self.pending.push(0x05);
                    }
                }
                self.ops.push(Op::Data(bytes.len()));
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.ops.push(Op::Flush);
        Ok(())
    }

    fn read_available(&mut self, timeout: Duration) -> io::Result<Vec<u8>> {
        if std::mem::take(&mut self.fail_read) {
            return Err(broken_pipe());
        }
        let bytes = if !self.pending.is_empty() {
            std::mem::take(&mut self.pending)
        } else {
            self.scripted.pop_front().unwrap_or_default()
        };
        if bytes.is_empty() {
            self.ops.push(Op::Timeout(timeout));
        } else {
            self.ops.push(Op::Read(bytes.len()));
        }
        Ok(bytes)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()> {
        self.baud_rate = baud_rate;
        self.ops.push(Op::Baud(baud_rate));
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn pause(&mut self, duration: Duration) {
        self.ops.push(Op::Pause(duration));
    }
}

fn broken_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "mock link unplugged")
}

/// A Nextion numeric return frame carrying `value`.
pub(crate) fn numeric(value: u32) -> Vec<u8> {
    let mut frame = vec![0x71];
    frame.extend_from_slice(&value.to_le_bytes());
    frame.extend_from_slice(&TERMINATOR);
    frame
}
