//! Errors reported by the upload session.
//!
//! The `Display` text of each variant doubles as the session status message,
//! see [`UploadSession::status_message`](crate::UploadSession::status_message).

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("IO error while using serial port: {0}")]
    Io(#[from] io::Error),
    #[error("failed to open serial port: {0}")]
    Serial(#[from] serialport::Error),
    /// The display did not answer the sleep/dim queries, or rejected the
    /// commands disabling them.
    #[error("handling sleep and dim settings failed")]
    SleepAndDim,
    /// No `0x05` came back after `whmi-wri`.
    #[error("preparation for firmware update failed")]
    PrepareFailed,
    /// The packet acknowledgment never arrived, even after all retries.
    #[error("serial connection lost")]
    ConnectionLost,
    #[error("firmware source ended with {remaining} bytes still expected")]
    SourceExhausted { remaining: u64 },
    #[error("firmware data goes {excess} bytes past the announced size")]
    SizeExceeded { excess: u64 },
}
