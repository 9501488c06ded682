//! Errors reported by the serial monitor.

use std::io;

use thiserror::Error;

/// Everything that can stop the monitor.
///
/// Malformed text never shows up here: undecodable bytes are replaced while
/// decoding and are not an error.
#[derive(Debug, Error)]
pub enum Error {
    /// The port could not be opened or configured (missing device, busy,
    /// permission denied, invalid settings...).
    #[error("could not open port {path}: {source}")]
    Connection {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// The driver reported a fault on an already open port.
    #[error("serial port fault: {0}")]
    Port(#[source] serialport::Error),

    /// Reading from the port or writing the decoded text failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn connection_error_names_the_port() {
    let err = Error::Connection {
        path: "/dev/ttyUSB7".into(),
        source: serialport::Error::new(serialport::ErrorKind::NoDevice, "No such device"),
    };
    assert_eq!(
        err.to_string(),
        "could not open port /dev/ttyUSB7: No such device"
    );
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn io_error_converts() {
    let err: Error = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed").into();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(err.to_string(), "i/o error: pipe closed");
}
