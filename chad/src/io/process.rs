//! Child processes with a deadline and bounded captured output.

use std::io::{self, Read};
use std::process::{ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Bytes kept from one output stream plus the count that did not fit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Captured {
    pub bytes: Vec<u8>,
    pub dropped: usize,
}

impl Captured {
    /// Lossy UTF-8 text, with a notice appended when bytes were dropped.
    pub fn lossy(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.dropped > 0 {
            text.push_str(&format!("\n[truncated {} bytes]\n", self.dropped));
        }
        text
    }

    fn drain(mut reader: impl Read, limit: usize) -> io::Result<Self> {
        let mut captured = Self::default();
        let mut chunk = [0u8; 8192];
        loop {
            let read = reader.read(&mut chunk)?;
            if read == 0 {
                return Ok(captured);
            }
            let room = limit.saturating_sub(captured.bytes.len()).min(read);
            captured.bytes.extend_from_slice(&chunk[..room]);
            captured.dropped += read - room;
        }
    }
}

/// Exit status and captured output of a finished child.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Captured,
    pub stderr: Captured,
    /// The child was killed because it outlived its deadline.
    pub timed_out: bool,
}

impl CommandOutput {
    /// Exit code, or `-1` when the child was killed by a signal.
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    pub fn stdout_lossy(&self) -> String {
        self.stdout.lossy()
    }

    pub fn stderr_lossy(&self) -> String {
        self.stderr.lossy()
    }
}

/// Both pipes of a running child, drained on background threads so a chatty
/// child never blocks on a full pipe.
struct Readers {
    stdout: JoinHandle<io::Result<Captured>>,
    stderr: JoinHandle<io::Result<Captured>>,
}

impl Readers {
    fn spawn(stdout: ChildStdout, stderr: ChildStderr, limit: usize) -> Self {
        Self {
            stdout: thread::spawn(move || Captured::drain(stdout, limit)),
            stderr: thread::spawn(move || Captured::drain(stderr, limit)),
        }
    }

    fn finish(self) -> Result<(Captured, Captured)> {
        let collect = |handle: JoinHandle<io::Result<Captured>>, name: &str| {
            handle
                .join()
                .map_err(|_| anyhow!("{name} reader thread panicked"))?
                .with_context(|| format!("read child {name}"))
        };
        Ok((collect(self.stdout, "stdout")?, collect(self.stderr, "stderr")?))
    }
}

/// Run `cmd` with stdin closed, killing it once `timeout` elapses.
///
/// At most `output_limit_bytes` of each stream are kept; the rest is counted
/// in [`Captured::dropped`].
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("spawn command")?;
    debug!(pid = child.id(), "child started");

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(anyhow!("child output was not piped"));
    };
    let readers = Readers::spawn(stdout, stderr, output_limit_bytes);

    let (status, timed_out) = match child.wait_timeout(timeout).context("wait for child")? {
        Some(status) => (status, false),
        None => {
            warn!(timeout_secs = timeout.as_secs(), "child outlived its deadline, killing");
            child.kill().context("kill child")?;
            (child.wait().context("reap killed child")?, true)
        }
    };

    let (stdout, stderr) = readers.finish()?;
    if stdout.dropped > 0 || stderr.dropped > 0 {
        warn!(
            stdout_dropped = stdout.dropped,
            stderr_dropped = stderr.dropped,
            "child output exceeded limit"
        );
    }
    debug!(exit_code = ?status.code(), timed_out, "child finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        timed_out,
    })
}
