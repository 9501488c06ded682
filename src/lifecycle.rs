//! What happens once the port is open: announce it, run the poll loop until
//! Ctrl-C or a fault, and turn the outcome into an exit status.

use std::io::{self, Write};

use console::style;
use log::debug;

use crate::{CancellationToken, Error, Monitor, PortSession, Settings};

// =============================================================================
// Public Interface
// =============================================================================

/// Help was shown, or the monitor was stopped with Ctrl-C.
pub const EXIT_OK: i32 = 0;
/// The port could not be opened.
pub const EXIT_CONNECTION_FAILED: i32 = 1;
/// The monitor stopped on an unrecoverable fault.
pub const EXIT_FAULT: i32 = 2;

/// Print the banner, stream the session to `out` until `cancel` is raised and
/// return the process exit status.
///
/// On cancellation a single newline ends whatever partial line the device left
/// behind. Faults are reported on `errors`; when `out` itself is gone (broken
/// pipe) nothing more is written to it.
pub fn listen<S, W, E>(
    port: &str,
    session: S,
    mut out: W,
    mut errors: E,
    settings: &Settings,
    cancel: &CancellationToken,
) -> i32
where
    S: PortSession,
    W: Write,
    E: Write,
{
    // One write for the whole line, the terminal sees it in one piece.
    let banner = format!(
        "Listening on {}. Press Ctrl-C to exit.\n",
        style(port).cyan()
    );
    if let Err(err) = out.write_all(banner.as_bytes()).and_then(|_| out.flush()) {
        return fault(&mut errors, err.into());
    }

    let result = Monitor::new(session, &mut out, settings).run(cancel);
    let err = match result {
        Ok(stats) => {
            debug!("{:?}", stats);
            match writeln!(out).and_then(|_| out.flush()) {
                Ok(()) => return EXIT_OK,
                Err(err) => err.into(),
            }
        }
        Err(err) => {
            if !is_broken_pipe(&err) {
                // Best effort, the fault is what gets reported.
                let _ = writeln!(out).and_then(|_| out.flush());
            }
            err
        }
    };
    fault(&mut errors, err)
}

// =============================================================================
// Private stuff
// =============================================================================

fn fault<E: Write>(errors: &mut E, err: Error) -> i32 {
    let _ = writeln!(errors, "{}: {}", style("error").red().for_stderr(), err);
    EXIT_FAULT
}

fn is_broken_pipe(err: &Error) -> bool {
    matches!(err, Error::Io(e) if e.kind() == io::ErrorKind::BrokenPipe)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
use crate::testing::{ClosingPipe, ScriptedSession};
#[cfg(test)]
use pretty_assertions::assert_eq;

#[cfg(test)]
fn plain(bytes: &[u8]) -> String {
    console::strip_ansi_codes(&String::from_utf8_lossy(bytes)).into_owned()
}

#[cfg(test)]
fn quick_settings() -> Settings {
    crate::SettingsBuilder::new()
        .poll_interval(std::time::Duration::from_millis(1))
        .finalize()
}

#[test]
fn cancel_ends_with_one_newline_and_success() {
    let cancel = CancellationToken::new();
    let session = ScriptedSession::new(vec![Ok(b"booting".to_vec())]).cancel_after(1, &cancel);
    let mut out = Vec::new();
    let mut errors = Vec::new();

    let status = listen(
        "/dev/ttyUSB0",
        session,
        &mut out,
        &mut errors,
        &quick_settings(),
        &cancel,
    );

    assert_eq!(status, EXIT_OK);
    assert_eq!(
        plain(&out),
        "Listening on /dev/ttyUSB0. Press Ctrl-C to exit.\nbooting\n"
    );
    assert!(errors.is_empty());
}

#[test]
fn cancel_before_any_read_prints_banner_and_newline() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut out = Vec::new();

    let status = listen(
        "COM3",
        ScriptedSession::new(vec![Ok(b"never".to_vec())]),
        &mut out,
        io::sink(),
        &quick_settings(),
        &cancel,
    );

    assert_eq!(status, EXIT_OK);
    assert_eq!(plain(&out), "Listening on COM3. Press Ctrl-C to exit.\n\n");
}

#[test]
fn session_fault_is_reported_with_fault_status() {
    let cancel = CancellationToken::new();
    let session = ScriptedSession::new(vec![
        Ok(b"partial".to_vec()),
        Err(Error::Port(serialport::Error::new(
            serialport::ErrorKind::NoDevice,
            "device removed",
        ))),
    ]);
    let mut out = Vec::new();
    let mut errors = Vec::new();

    let status = listen(
        "/dev/ttyACM0",
        session,
        &mut out,
        &mut errors,
        &quick_settings(),
        &cancel,
    );

    assert_eq!(status, EXIT_FAULT);
    assert!(plain(&out).ends_with("partial\n"));
    assert_eq!(plain(&errors), "error: serial port fault: device removed\n");
}

#[test]
fn closed_stdout_exits_with_fault_without_writing_again() {
    let cancel = CancellationToken::new();
    let session = ScriptedSession::new(vec![Ok(b"one".to_vec()), Ok(b"two".to_vec())]);
    // Only the banner gets through.
    let mut out = ClosingPipe::accepting(1);
    let mut errors = Vec::new();

    let status = listen(
        "/dev/pts/1",
        session,
        &mut out,
        &mut errors,
        &quick_settings(),
        &cancel,
    );

    assert_eq!(status, EXIT_FAULT);
    assert_eq!(
        plain(&out.written),
        "Listening on /dev/pts/1. Press Ctrl-C to exit.\n"
    );
    // The failed write of "one" and nothing after it.
    assert_eq!(out.refused, 1);
    assert!(plain(&errors).starts_with("error: i/o error: "));
}

#[test]
fn closed_stdout_before_banner_is_a_fault() {
    let cancel = CancellationToken::new();
    let mut session = ScriptedSession::new(Vec::new());
    let mut errors = Vec::new();

    let status = listen(
        "/dev/ttyS0",
        &mut session,
        ClosingPipe::accepting(0),
        &mut errors,
        &quick_settings(),
        &cancel,
    );

    assert_eq!(status, EXIT_FAULT);
    assert_eq!(session.reads, 0);
    assert!(!errors.is_empty());
}
