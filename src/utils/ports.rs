//! Serial port session: opening the device and reading what it sent.

use std::{
    cmp, fmt,
    io::{self, Read},
};

use log::{debug, info, trace};
use serialport::SerialPort;

use crate::{Error, Result, Settings};

//==============================================================================
// Public Interface
//==============================================================================

/// A source of raw bytes polled by the [`Monitor`](crate::Monitor).
pub trait PortSession {
    /// Return the bytes that are available right now, possibly none.
    ///
    /// Must not wait for a full line or a fixed length. "Nothing arrived yet"
    /// is an empty vector; an `Err` means the session is no longer usable.
    fn read_available(&mut self) -> Result<Vec<u8>>;
}
impl<P: PortSession + ?Sized> PortSession for &mut P {
    fn read_available(&mut self) -> Result<Vec<u8>> {
        (**self).read_available()
    }
}

/// An open serial port configured from [`Settings`].
pub struct SerialSession {
    port: Box<dyn SerialPort>,
}
impl SerialSession {
    /// Open the port named in `settings` and apply the line settings.
    ///
    /// Not retried: any failure is reported as [`Error::Connection`].
    pub fn open(settings: &Settings) -> Result<Self> {
        let path = settings.path.clone().unwrap_or_default();
        open_and_setup_port(&path, settings)
            .map(|port| SerialSession { port })
            .map_err(|source| Error::Connection { path, source })
    }
}
impl PortSession for SerialSession {
    fn read_available(&mut self) -> Result<Vec<u8>> {
        // Only ask for what the driver already buffered so the read returns
        // right away; the port timeout bounds it otherwise.
        let available = self.port.bytes_to_read().map_err(Error::Port)?;
        trace!("Bytes available to read: {}", available);
        if available == 0 {
            return Ok(Vec::new());
        }

        let mut serial_buf: Vec<u8> = vec![0; cmp::min(available, MAX_READ_CHUNK) as usize];
        match self.port.read(serial_buf.as_mut_slice()) {
            Ok(t) => {
                serial_buf.truncate(t);
                Ok(serial_buf)
            }
            Err(ref e) if is_no_data(e) => {
                trace!("read returned no data: {}", e);
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}
impl fmt::Debug for SerialSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_fmt_serialport!(self.port, f).finish()
    }
}

//==============================================================================
// Private stuff
//==============================================================================

/// Upper bound for a single read, whatever the driver reports as available.
const MAX_READ_CHUNK: u32 = 4096;

fn open_and_setup_port(
    path: &str,
    settings: &Settings,
) -> std::result::Result<Box<dyn SerialPort>, serialport::Error> {
    if path.is_empty() {
        return Err(serialport::Error::new(
            serialport::ErrorKind::InvalidInput,
            "no serial port was specified",
        ));
    }

    debug!("Opening {}", path);
    let port = serialport::new(path, settings.baud_rate)
        .data_bits(settings.data_bits)
        .stop_bits(settings.stop_bits)
        .parity(settings.parity)
        .flow_control(settings.flow_control)
        .timeout(settings.read_timeout)
        .open()?;

    // Read back for the logs only; a failing getter does not fail the open.
    info!(
        "Connected to {} at {:?} baud",
        port.name().unwrap_or_else(|| path.to_owned()),
        port.baud_rate().ok()
    );
    debug!("data_bits    : {:?}", port.data_bits());
    debug!("stop_bits    : {:?}", port.stop_bits());
    debug!("parity       : {:?}", port.parity());
    debug!("flow control : {:?}", port.flow_control());
    debug!("read timeout : {:?}", port.timeout());

    Ok(port)
}

/// Read outcomes that just mean nothing arrived within the timeout.
fn is_no_data(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn missing_path_is_a_connection_error() {
    let settings = crate::SettingsBuilder::new().finalize();
    match SerialSession::open(&settings) {
        Err(Error::Connection { path, source }) => {
            assert!(path.is_empty());
            assert_eq!(source.kind(), serialport::ErrorKind::InvalidInput);
        }
        other => panic!("expected a connection error, got {:?}", other),
    }
}

#[cfg(unix)]
#[test]
fn unknown_device_is_a_connection_error() {
    let settings = crate::SettingsBuilder::new()
        .path("/dev/serialmon-no-such-device")
        .finalize();
    let err = SerialSession::open(&settings).unwrap_err();
    assert!(matches!(err, Error::Connection { .. }));
    let description = err.to_string();
    assert!(description.contains("/dev/serialmon-no-such-device"));
    assert!(description.len() > "could not open port /dev/serialmon-no-such-device: ".len());
}

#[test]
fn borrowed_session_reads_through() {
    let mut session = crate::testing::ScriptedSession::new(vec![Ok(b"ok".to_vec())]);
    let mut borrowed = &mut session;
    assert_eq!(borrowed.read_available().unwrap(), b"ok".to_vec());
    assert_eq!(session.reads, 1);
}

#[test]
fn timeouts_and_interrupts_mean_no_data() {
    assert!(is_no_data(&io::Error::from(io::ErrorKind::TimedOut)));
    assert!(is_no_data(&io::Error::from(io::ErrorKind::WouldBlock)));
    assert!(is_no_data(&io::Error::from(io::ErrorKind::Interrupted)));
    assert!(!is_no_data(&io::Error::from(io::ErrorKind::BrokenPipe)));
}
