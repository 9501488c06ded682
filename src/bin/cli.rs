//! Serialmon command line interface.

use std::{
    env,
    ffi::OsString,
    io::{self, Write},
    process,
};

use clap::{crate_authors, crate_description, crate_name, App, AppSettings::*, Arg};
use console::style;
use log::{debug, trace, LevelFilter};
use simplelog::*;

use serialmon::{
    self as sm, CancellationToken, SerialSession, SettingsBuilder, EXIT_CONNECTION_FAILED,
    EXIT_FAULT,
};

/// Environment variable selecting the log level (`off` to `trace`).
const LOG_ENV: &str = "SERIALMON_LOG";

fn main() {
    init_logging(env::var(LOG_ENV).ok().as_deref());

    // The handler only raises the token; the poll loop notices it before the
    // next read or during its pause.
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || handler_token.cancel()) {
        report(format_args!("could not install the Ctrl-C handler: {}", err));
        process::exit(EXIT_FAULT);
    }

    let matches = app().get_matches_from(with_implicit_help(env::args_os().collect()));
    trace!("{:#?}", matches);

    // `PORT` is required, clap has already exited if it is missing.
    let port = matches.value_of("PORT").unwrap_or_default();
    let settings = SettingsBuilder::new().path(port).finalize();

    let session = match SerialSession::open(&settings) {
        Ok(session) => session,
        Err(err) => {
            report(format_args!("{}", err));
            process::exit(EXIT_CONNECTION_FAILED);
        }
    };
    debug!("{:?}", session);

    let status = sm::listen(
        port,
        session,
        io::stdout(),
        io::stderr(),
        &settings,
        &cancel,
    );
    debug!("exit code: {}", status);
    process::exit(status);
}

/// Print an error on stdout; a closed stdout is not worth a panic.
fn report(message: std::fmt::Arguments<'_>) {
    let _ = writeln!(io::stdout(), "{}: {}", style("error").red(), message);
}

fn app() -> App<'static, 'static> {
    App::new(crate_name!())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Opens the serial port at 115200 baud, 8 data bits, no parity, one \
            stop bit, and prints everything the device sends as UTF-8 text, \
            exactly as received. Bytes that are not valid UTF-8 are shown as \
            the replacement character.\n\
            \n\
            Press Ctrl-C to exit. Set SERIALMON_LOG to `info`, `debug` or \
            `trace` for diagnostics on stderr.\
            ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(DisableVersion)
        .arg(
            Arg::with_name("PORT")
                .help("Serial port")
                .long_help(
                    "Serial port to listen on, e.g. `/dev/ttyUSB0` on Linux, \
                     `/dev/cu.usbserial-0001` on macOS or `COM3` on Windows.",
                )
                .required(true)
                .index(1),
        )
}

/// Running without any argument shows the help instead of an error.
fn with_implicit_help(mut args: Vec<OsString>) -> Vec<OsString> {
    if args.len() < 2 {
        args.push("--help".into());
    }
    args
}

fn log_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|level| level.trim().parse().ok())
        .unwrap_or(LevelFilter::Warn)
}

fn init_logging(value: Option<&str>) {
    // Logs go to stderr, stdout carries the device output only.
    if let Err(err) = TermLogger::init(
        log_level(value),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        let _ = writeln!(io::stderr(), "logging disabled: {}", err);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
fn args(list: &[&str]) -> Vec<OsString> {
    list.iter().map(OsString::from).collect()
}

#[test]
fn no_arguments_shows_help() {
    let err = app()
        .get_matches_from_safe(with_implicit_help(args(&["serialmon"])))
        .unwrap_err();
    assert_eq!(err.kind, clap::ErrorKind::HelpDisplayed);
    assert!(err.message.contains("PORT"));
    assert!(err.message.contains("Serial port"));
}

#[test]
fn explicit_help_flags() {
    for flag in &["-h", "--help"] {
        let err = app()
            .get_matches_from_safe(with_implicit_help(args(&["serialmon", *flag])))
            .unwrap_err();
        assert_eq!(err.kind, clap::ErrorKind::HelpDisplayed);
    }
}

#[test]
fn port_is_the_single_positional() {
    let matches = app()
        .get_matches_from_safe(with_implicit_help(args(&["serialmon", "/dev/ttyACM0"])))
        .unwrap();
    assert_eq!(matches.value_of("PORT"), Some("/dev/ttyACM0"));
}

#[test]
fn extra_arguments_are_rejected() {
    let err = app()
        .get_matches_from_safe(args(&["serialmon", "/dev/ttyACM0", "/dev/ttyACM1"]))
        .unwrap_err();
    assert_ne!(err.kind, clap::ErrorKind::HelpDisplayed);
}

#[test]
fn implicit_help_leaves_real_arguments_alone() {
    assert_eq!(
        with_implicit_help(args(&["serialmon", "COM3"])),
        args(&["serialmon", "COM3"])
    );
    assert_eq!(
        with_implicit_help(args(&["serialmon"])),
        args(&["serialmon", "--help"])
    );
}

#[test]
fn log_level_defaults_to_warn() {
    assert_eq!(log_level(None), LevelFilter::Warn);
    assert_eq!(log_level(Some("verbose please")), LevelFilter::Warn);
    assert_eq!(log_level(Some("debug")), LevelFilter::Debug);
    assert_eq!(log_level(Some(" TRACE ")), LevelFilter::Trace);
    assert_eq!(log_level(Some("off")), LevelFilter::Off);
}
