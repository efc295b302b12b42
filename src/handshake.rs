//! Handshake bringing the display into firmware update mode.
//!
//! **Example** - Running the handshake over an open link:
//! ```ignore
//! use crate::handshake::{self as hsm, HandshakeParams};
//!
//! let params = HandshakeParams {
//!     file_size: Some(1_234_567),
//!     upload_baud_rate: 115_200,
//! };
//! let mut handshake = hsm::factory(params);
//! handshake.run(&mut link)?;
//! ```

mod events;
mod state_machine;
mod states;

pub(crate) use state_machine::{factory, HandshakeParams};
