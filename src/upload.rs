//! Firmware upload over an open link.
//!
//! **Example** - Uploading a `.tft` file:
//! ```no_run
//! use std::fs::File;
//! use nexupload::{ReaderSource, SerialLink, UploadSession};
//!
//! # fn main() -> Result<(), nexupload::Error> {
//! let port = serialport::new("/dev/ttyUSB0", 9600).open()?;
//! let file = File::open("display.tft")?;
//! let size = file.metadata()?.len();
//!
//! let mut session = UploadSession::new(SerialLink::new(port, 9600), 115_200);
//! session.prepare_upload(Some(size))?;
//! session.upload_from(&mut ReaderSource::new(file))?;
//! session.end()?;
//! # Ok(())
//! # }
//! ```

mod packets;
mod session;
mod source;

pub use session::UploadSession;
pub use source::{BufferSource, ByteSource, ReaderSource};
