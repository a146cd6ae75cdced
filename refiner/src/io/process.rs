//! Runs the generator command: prompt on stdin, definition on stdout.
//!
//! Stdin is fed and both output streams are drained on their own threads, so
//! a child that ignores its input or floods stdout cannot outlive the timeout.

use std::io::{Read, Write};
use std::process::{ChildStdin, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

const READ_CHUNK: usize = 8192;

/// Bounds applied to one child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessLimits {
    pub timeout: Duration,
    /// Bytes kept per output stream; the excess is counted, not stored.
    pub output_limit_bytes: usize,
}

/// One captured output stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub bytes: Vec<u8>,
    pub dropped: usize,
}

impl Captured {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Captured,
    pub stderr: Captured,
    pub timed_out: bool,
}

/// Spawn `cmd`, write `input` to its stdin and wait at most `limits.timeout`.
///
/// A child still running at the deadline is killed and reported with
/// `timed_out` set; that is not an error.
#[instrument(skip_all, fields(timeout_secs = limits.timeout.as_secs(), input_bytes = input.len()))]
pub fn run_with_input(mut cmd: Command, input: &[u8], limits: ProcessLimits) -> Result<ProcessOutput> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().context("spawn generator command")?;
    debug!(pid = child.id(), "generator command started");

    let stdin = child.stdin.take().ok_or_else(|| anyhow!("stdin was not piped"))?;
    let stdout = child.stdout.take().ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child.stderr.take().ok_or_else(|| anyhow!("stderr was not piped"))?;

    let writer = feed(stdin, input.to_vec());
    let stdout = capture(stdout, limits.output_limit_bytes);
    let stderr = capture(stderr, limits.output_limit_bytes);

    let (status, timed_out) = match child.wait_timeout(limits.timeout).context("wait for generator command")? {
        Some(status) => (status, false),
        None => {
            warn!(timeout_secs = limits.timeout.as_secs(), "generator command timed out, killing");
            child.kill().context("kill generator command")?;
            (child.wait().context("reap generator command")?, true)
        }
    };

    if writer.join().is_err() {
        warn!("stdin writer thread panicked");
    }
    let stdout = join_capture(stdout).context("collect stdout")?;
    let stderr = join_capture(stderr).context("collect stderr")?;
    if stdout.dropped > 0 || stderr.dropped > 0 {
        warn!(stdout_dropped = stdout.dropped, stderr_dropped = stderr.dropped, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "generator command finished");
    Ok(ProcessOutput {
        status,
        stdout,
        stderr,
        timed_out,
    })
}

fn feed(mut stdin: ChildStdin, input: Vec<u8>) -> JoinHandle<()> {
    thread::spawn(move || {
        // Closing stdin on drop signals end of prompt.
        if let Err(err) = stdin.write_all(&input) {
            warn!(err = %err, "child closed stdin before reading the prompt");
        }
    })
}

fn capture<R: Read + Send + 'static>(mut reader: R, limit: usize) -> JoinHandle<Result<Captured>> {
    thread::spawn(move || {
        let mut captured = Captured::default();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = reader.read(&mut chunk).context("read output")?;
            if n == 0 {
                return Ok(captured);
            }
            let keep = n.min(limit.saturating_sub(captured.bytes.len()));
            captured.bytes.extend_from_slice(&chunk[..keep]);
            captured.dropped += n - keep;
        }
    })
}

fn join_capture(handle: JoinHandle<Result<Captured>>) -> Result<Captured> {
    handle
        .join()
        .map_err(|_| anyhow!("output reader thread panicked"))?
}
