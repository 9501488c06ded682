//! Settings for the serial port session and the poll loop.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values. The line format is fixed at 115200
//! baud, 8N1 without flow control; only the port path and the timings can be
//! changed, the latter so tests can run the loop faster.

use std::time::Duration;

pub use serialport::{DataBits, FlowControl, Parity, StopBits};

// =============================================================================
// Public Interface
// =============================================================================

/// Default baud rate in symbols-per-second.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default upper bound for a single read on the serial port.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Default pause between two consecutive polls of the serial port.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Groups all settings related to the serial port session and the poll loop,
/// and acts as a
/// [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// for the settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// The port name, usually the device path.
    pub path: Option<String>,
    /// The baud rate in symbols-per-second.
    pub baud_rate: u32,
    /// Number of bits used to represent a character sent on the line.
    pub data_bits: DataBits,
    /// The type of signalling to use for controlling data transfer.
    pub flow_control: FlowControl,
    /// The type of parity to use for error checking.
    pub parity: Parity,
    /// Number of bits to use to signal the end of a character.
    pub stop_bits: StopBits,
    /// How long a single read may block waiting for data.
    pub read_timeout: Duration,
    /// How long the poll loop waits after each read attempt.
    pub poll_interval: Duration,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set.
///
/// **Example**
///
/// ```
/// use serialmon::SettingsBuilder;
///
/// let settings = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
/// assert_eq!(settings.baud_rate, 115_200);
/// ```
pub struct SettingsBuilder {
    settings: Settings,
}
impl SettingsBuilder {
    /// Start building the settings using default values and no path for the
    /// port.
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings {
                path: None,
                baud_rate: DEFAULT_BAUD_RATE,
                data_bits: DataBits::Eight,
                flow_control: FlowControl::None,
                parity: Parity::None,
                stop_bits: StopBits::One,
                read_timeout: DEFAULT_READ_TIMEOUT,
                poll_interval: DEFAULT_POLL_INTERVAL,
                _private_use_builder: (),
            },
        }
    }

    /// Set the path to the serial port
    pub fn path<'a>(mut self, path: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.path = Some(path.into().into_owned());
        self
    }

    /// Set the upper bound for a single read on the port
    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.settings.read_timeout = read_timeout;
        self
    }

    /// Set the pause between two consecutive polls
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.settings.poll_interval = poll_interval;
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}
impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        Settings {
            path: None,
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            read_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(10),
            _private_use_builder: (),
        }
    )
}

#[test]
fn default_builder_matches_new() {
    assert_eq!(
        SettingsBuilder::default().finalize(),
        SettingsBuilder::new().finalize()
    );
}

#[test]
fn path() {
    let settings = SettingsBuilder::new().path("/dev/ttyACM0").finalize();
    assert_eq!(settings.path.unwrap(), "/dev/ttyACM0");
}

#[test]
fn path_from_owned_string() {
    let port = String::from("COM4");
    let settings = SettingsBuilder::new().path(port).finalize();
    assert_eq!(settings.path.as_deref(), Some("COM4"));
}

#[test]
fn timings() {
    let settings = SettingsBuilder::new()
        .read_timeout(Duration::from_millis(5))
        .poll_interval(Duration::from_millis(1))
        .finalize();
    assert_eq!(settings.read_timeout, Duration::from_millis(5));
    assert_eq!(settings.poll_interval, Duration::from_millis(1));
}
