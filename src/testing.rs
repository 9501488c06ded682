//! Stand-ins for the serial port and the terminal used by the unit tests.

use std::{collections::VecDeque, io};

use crate::{CancellationToken, PortSession, Result};

/// Replays scripted reads; once the script runs out it yields no data.
pub(crate) struct ScriptedSession {
    script: VecDeque<Result<Vec<u8>>>,
    pub(crate) reads: usize,
    /// Raised right after the given read (1-based) returns.
    cancel_after: Option<(usize, CancellationToken)>,
}
impl ScriptedSession {
    pub(crate) fn new(chunks: Vec<Result<Vec<u8>>>) -> Self {
        ScriptedSession {
            script: chunks.into_iter().collect(),
            reads: 0,
            cancel_after: None,
        }
    }

    pub(crate) fn cancel_after(mut self, reads: usize, token: &CancellationToken) -> Self {
        self.cancel_after = Some((reads, token.clone()));
        self
    }
}
impl PortSession for ScriptedSession {
    fn read_available(&mut self) -> Result<Vec<u8>> {
        self.reads += 1;
        let next = self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()));
        if let Some((after, token)) = &self.cancel_after {
            if self.reads == *after {
                token.cancel();
            }
        }
        next
    }
}

/// A terminal whose reader goes away after `accepted` writes: every later
/// write fails with `BrokenPipe`.
#[derive(Default)]
pub(crate) struct ClosingPipe {
    pub(crate) written: Vec<u8>,
    accepted: usize,
    pub(crate) refused: usize,
}
impl ClosingPipe {
    pub(crate) fn accepting(accepted: usize) -> Self {
        ClosingPipe {
            accepted,
            ..Default::default()
        }
    }
}
impl io::Write for ClosingPipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.accepted == 0 {
            self.refused += 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"));
        }
        self.accepted -= 1;
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
