//! Serialmon is a tiny serial monitor for development boards: it opens a serial
//! port, prints whatever the device sends as text, and keeps going until
//! Ctrl-C.
//!
//! The line settings are fixed at 115200 baud, 8 data bits, no parity, one stop
//! bit and no flow control, which is what most microcontroller log consoles
//! use. Output is written to the terminal exactly as received: there is no line
//! framing, no timestamps and no prefixes, and partial lines show up as soon as
//! they arrive.
//!
//! The pieces are:
//!
//! * [`SerialSession`], the open port, behind the [`PortSession`] trait so the
//!   poll loop can be exercised without hardware.
//! * [`Monitor`], the poll loop. It reads what is available, decodes it as
//!   UTF-8 (invalid sequences become `U+FFFD`, characters split across two
//!   reads are kept whole), writes and flushes it, then pauses for the poll
//!   interval.
//! * [`listen`], which wraps the poll loop with the banner, the final newline
//!   and the exit status.
//! * [`CancellationToken`], raised by the Ctrl-C handler and checked by the
//!   poll loop before every read and during every pause.
//! * [`Settings`], the immutable configuration built once at startup with the
//!   [`SettingsBuilder`].

#[macro_use]
mod macros;

mod error;
mod lifecycle;
mod monitor;
mod settings;
mod utils;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use lifecycle::{listen, EXIT_CONNECTION_FAILED, EXIT_FAULT, EXIT_OK};
pub use monitor::{Monitor, PollStats};
pub use settings::{
    DataBits, FlowControl, Parity, Settings, SettingsBuilder, StopBits, DEFAULT_BAUD_RATE,
    DEFAULT_POLL_INTERVAL, DEFAULT_READ_TIMEOUT,
};
pub use utils::{CancellationToken, PortSession, SerialSession};
