//! The poll loop: read whatever the device sent, print it, pause, repeat.
//!
//! **Example** - Monitoring a port until Ctrl-C:
//! ```no_run
//! use serialmon::{CancellationToken, Monitor, SerialSession, SettingsBuilder};
//!
//! let settings = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
//! let session = SerialSession::open(&settings)?;
//!
//! let cancel = CancellationToken::new();
//! let handler = cancel.clone();
//! ctrlc::set_handler(move || handler.cancel()).unwrap();
//!
//! let stats = Monitor::new(session, std::io::stdout(), &settings).run(&cancel)?;
//! println!("\n{:?}", stats);
//! # Ok::<(), serialmon::Error>(())
//! ```

use std::{io::Write, time::Duration};

use hexplay::HexViewBuilder;
use log::{debug, log_enabled, trace, Level::Debug};

use crate::{
    utils::{CancellationToken, PortSession, Utf8Decoder},
    Result, Settings,
};

// =============================================================================
// Public Interface
// =============================================================================

/// Counters accumulated by the poll loop.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct PollStats {
    /// Read attempts, with or without data.
    pub polls: u64,
    /// Pauses that ran for the whole poll interval.
    pub waits: u64,
    /// Raw bytes received from the port.
    pub bytes: u64,
}

/// Drives a [`PortSession`], writing the decoded text to `out`.
///
/// The text is written exactly as received: no line framing, no prefixes, no
/// added line terminators. Every write is flushed right away.
pub struct Monitor<S, W> {
    session: S,
    out: W,
    decoder: Utf8Decoder,
    poll_interval: Duration,
    stats: PollStats,
}
impl<S: PortSession, W: Write> Monitor<S, W> {
    pub fn new(session: S, out: W, settings: &Settings) -> Self {
        Monitor {
            session,
            out,
            decoder: Utf8Decoder::new(),
            poll_interval: settings.poll_interval,
            stats: PollStats::default(),
        }
    }

    /// Poll until `cancel` is raised or the session fails.
    ///
    /// The token is checked before every read, so no read happens once it is
    /// raised, and the pause between polls ends as soon as it is. Errors from
    /// the session or from `out` are returned as is; nothing is retried.
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<PollStats> {
        while !cancel.is_cancelled() {
            self.poll_once()?;
            if cancel.wait_timeout(self.poll_interval) {
                break;
            }
            self.stats.waits += 1;
        }
        debug!(
            "Poll loop stopped after {} polls, {} bytes received",
            self.stats.polls, self.stats.bytes
        );
        Ok(self.stats)
    }

    /// A single read attempt; returns the number of bytes received.
    fn poll_once(&mut self) -> Result<usize> {
        self.stats.polls += 1;
        let serial_buf = self.session.read_available()?;
        if serial_buf.is_empty() {
            return Ok(0);
        }
        trace!("Received {} bytes", serial_buf.len());
        self.stats.bytes += serial_buf.len() as u64;

        // Dump the received data in a hex table for debugging
        if log_enabled!(Debug) {
            let view = HexViewBuilder::new(&serial_buf)
                .address_offset(0)
                .row_width(16)
                .finish();
            debug!("\n{}", view);
        }

        let text = self.decoder.decode(&serial_buf);
        if !text.is_empty() {
            self.out.write_all(text.as_bytes())?;
            self.out.flush()?;
        }
        Ok(serial_buf.len())
    }

    #[cfg(test)]
    fn stats(&self) -> PollStats {
        self.stats
    }

    #[cfg(test)]
    fn into_parts(self) -> (S, W) {
        (self.session, self.out)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
use crate::testing::ScriptedSession;
#[cfg(test)]
use pretty_assertions::assert_eq;

#[cfg(test)]
fn fast_settings() -> Settings {
    crate::SettingsBuilder::new()
        .poll_interval(Duration::from_millis(10))
        .finalize()
}

#[cfg(test)]
fn output_of<S>(monitor: Monitor<S, Vec<u8>>) -> String {
    String::from_utf8(monitor.out).unwrap()
}

#[test]
fn prints_received_bytes_verbatim() {
    let session = ScriptedSession::new(vec![Ok(b"hello\n".to_vec())]);
    let mut monitor = Monitor::new(session, Vec::new(), &fast_settings());

    assert_eq!(monitor.poll_once().unwrap(), 6);
    assert_eq!(monitor.poll_once().unwrap(), 0);
    assert_eq!(output_of(monitor), "hello\n");
}

#[test]
fn partial_lines_are_not_terminated() {
    let session = ScriptedSession::new(vec![
        Ok(b"boot: ".to_vec()),
        Ok(Vec::new()),
        Ok(b"ok".to_vec()),
        Ok(b"\r\nready".to_vec()),
    ]);
    let mut monitor = Monitor::new(session, Vec::new(), &fast_settings());
    for _ in 0..4 {
        monitor.poll_once().unwrap();
    }
    assert_eq!(output_of(monitor), "boot: ok\r\nready");
}

#[test]
fn invalid_bytes_are_replaced_not_fatal() {
    let session = ScriptedSession::new(vec![Ok(b"ab\x80cd".to_vec())]);
    let mut monitor = Monitor::new(session, Vec::new(), &fast_settings());
    monitor.poll_once().unwrap();
    assert_eq!(output_of(monitor), "ab\u{FFFD}cd");
}

#[test]
fn split_character_is_printed_once_complete() {
    let session = ScriptedSession::new(vec![Ok(b"25 \xc2".to_vec()), Ok(b"\xb0C".to_vec())]);
    let mut monitor = Monitor::new(session, Vec::new(), &fast_settings());
    monitor.poll_once().unwrap();
    monitor.poll_once().unwrap();
    assert_eq!(monitor.stats().bytes, 6);
    assert_eq!(output_of(monitor), "25 \u{00B0}C");
}

#[test]
fn run_stops_after_cancel_without_further_reads() {
    let cancel = CancellationToken::new();
    let session = ScriptedSession::new(vec![Ok(b"hello\n".to_vec())]).cancel_after(1, &cancel);
    let mut monitor = Monitor::new(session, Vec::new(), &fast_settings());

    let stats = monitor.run(&cancel).unwrap();
    assert_eq!(
        stats,
        PollStats {
            polls: 1,
            waits: 0,
            bytes: 6
        }
    );
    let (session, out) = monitor.into_parts();
    assert_eq!(session.reads, 1);
    assert_eq!(String::from_utf8(out).unwrap(), "hello\n");
}

#[test]
fn run_does_not_read_when_cancelled_up_front() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let session = ScriptedSession::new(vec![Ok(b"never".to_vec())]);
    let mut monitor = Monitor::new(session, Vec::new(), &fast_settings());

    assert_eq!(monitor.run(&cancel).unwrap(), PollStats::default());
    let (session, out) = monitor.into_parts();
    assert_eq!(session.reads, 0);
    assert!(out.is_empty());
}

#[test]
fn idle_polls_wait_the_full_interval() {
    use std::time::Instant;

    const POLLS: usize = 5;
    let settings = fast_settings();
    let cancel = CancellationToken::new();
    let session = ScriptedSession::new(Vec::new()).cancel_after(POLLS, &cancel);
    let mut monitor = Monitor::new(session, Vec::new(), &settings);

    let started = Instant::now();
    let stats = monitor.run(&cancel).unwrap();
    let elapsed = started.elapsed();

    // Every poll but the one that saw the cancellation is followed by a full
    // pause.
    assert_eq!(stats.polls, POLLS as u64);
    assert_eq!(stats.waits, POLLS as u64 - 1);
    assert_eq!(stats.bytes, 0);
    assert!(elapsed >= settings.poll_interval * (POLLS as u32 - 1));
    assert!(output_of(monitor).is_empty());
}

#[test]
fn cancel_from_another_thread_ends_the_pause() {
    use std::{thread, time::Instant};

    let settings = crate::SettingsBuilder::new()
        .poll_interval(Duration::from_secs(60))
        .finalize();
    let cancel = CancellationToken::new();
    let remote = cancel.clone();
    let mut monitor = Monitor::new(ScriptedSession::new(Vec::new()), Vec::new(), &settings);

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        remote.cancel();
    });
    let started = Instant::now();
    let stats = monitor.run(&cancel).unwrap();
    canceller.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(stats.polls, 1);
    assert_eq!(stats.waits, 0);
}

#[test]
fn session_fault_ends_the_loop() {
    use std::io;

    let cancel = CancellationToken::new();
    let session = ScriptedSession::new(vec![
        Ok(b"last words".to_vec()),
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged").into()),
        Ok(b"unreachable".to_vec()),
    ]);
    let mut monitor = Monitor::new(session, Vec::new(), &fast_settings());

    let err = monitor.run(&cancel).unwrap_err();
    assert!(matches!(err, crate::Error::Io(_)));
    let (session, out) = monitor.into_parts();
    assert_eq!(session.reads, 2);
    assert_eq!(String::from_utf8(out).unwrap(), "last words");
}
