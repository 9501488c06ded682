//! Helpers around the serial port: session, text decoding and cancellation.

mod cancel;
mod decode;
mod ports;

pub use cancel::CancellationToken;
pub(crate) use decode::Utf8Decoder;
pub use ports::{PortSession, SerialSession};
