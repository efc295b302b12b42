//! Nexupload pushes a firmware image (`.tft` file) to a Nextion display over
//! its serial connection, the same way the Nextion Editor does it.
//!
//! An upload goes through three phases:
//!
//! * a **handshake** that puts the display in the right runtime mode, makes
//!   sure it will not sleep or dim out during the transfer, and asks it to
//!   switch to the upload baud rate (`whmi-wri`),
//! * the **transfer** itself, in packets of 4096 bytes, each of which the
//!   display acknowledges with a single `0x05` byte once it is flashed,
//! * a **finalization** that gives the display time to finish and restarts
//!   it.
//!
//! The handshake is implemented as a state machine in terms of **states** and
//! **transitions** between them:
//!
//! * Can only be in one state at any time.
//! * Each state can have its own associated data if needed, and all states
//!   share the handshake parameters.
//! * Transitions between states are triggered via typed **events**.
//! * Only explicitly defined transitions are permitted, and as many errors as
//!   possible are detected at **compile-time**.
//! * Transitioning from one state to another consumes the original state.
//!
//! Transitions leverage `rust`'s `From` and `Into` pattern: each target state
//! implements `From` for the event that leads to it, and any transition
//! without such an implementation is a compile-time error.
//!
//! The serial port and the firmware source are abstracted behind the
//! [`Transport`] and [`ByteSource`] traits, so that the protocol can run over
//! any link and read the image from a file, a network stream or memory.

mod command;
mod error;
mod handshake;
mod settings;
mod transport;
mod upload;
mod utils;

pub use command::transmission_time_ms;
pub use error::Error;
pub use settings::{Settings, SettingsBuilder};
pub use transport::{SerialLink, Transport};
pub use upload::{BufferSource, ByteSource, ReaderSource, UploadSession};
pub use utils::{open_and_setup_port, select_port};
