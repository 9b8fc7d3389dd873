//! Process runner: one external process per call, both streams captured, bounded by a timeout.
//!
//! run(&InvocationRequest, max_timeout) -> ExecutionOutcome
//!
//! The runner never fails. Spawn errors, non-zero exits and timeouts are all
//! encoded in the returned `ExecutionOutcome`; rendering lives in `render`.

pub mod render;

use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::Instant;

/// Time a killed process gets to exit and close its pipes before we stop waiting.
pub const KILL_GRACE: Duration = Duration::from_secs(2);

/// Time open pipes get to reach EOF once the process itself has exited.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const READ_CHUNK: usize = 8192;

/// Bytes kept per stream. A capped stream decodes to more than
/// `CHARACTER_LIMIT` chars, so rendering truncates it exactly as it would the
/// full output; the rest is read and discarded.
pub const RETAIN_BYTES: usize = render::CHARACTER_LIMIT * 4 + 4;

/* ---- Data Structures ---- */

/// A single, fully resolved process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    /// Program name or path (never passed through a shell)
    pub binary: String,
    /// Positional argument vector, order preserved
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl InvocationRequest {
    pub fn new(binary: impl Into<String>, argv: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            argv,
            cwd: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// How the process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// Program-chosen exit code.
    Code(i32),
    /// No exit code (terminated by a signal, or never observed after a kill).
    NoCode,
    /// The process could not be started at all.
    SpawnFailed,
}

impl ExitState {
    /// Reported in place of an exit code when spawning failed.
    pub const SPAWN_FAILED_CODE: i32 = -1;

    /// Wire representation: the exit code, `-1` for spawn failure, `None` otherwise.
    pub fn code(&self) -> Option<i32> {
        match self {
            ExitState::Code(c) => Some(*c),
            ExitState::NoCode => None,
            ExitState::SpawnFailed => Some(Self::SPAWN_FAILED_CODE),
        }
    }
}

/// Everything captured from one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit: ExitState,
    /// True when the timer fired and the process was killed; `exit` is then `NoCode`.
    pub timed_out: bool,
}

impl ExecutionOutcome {
    fn spawn_failed(binary: &str, err: &io::Error) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!("Error: failed to start '{binary}': {err}"),
            exit: ExitState::SpawnFailed,
            timed_out: false,
        }
    }
}

/* ---- Runner ---- */

/// Spawn `request.binary` and capture its output until exit or timeout.
///
/// The effective timeout is `request.timeout` capped at `max_timeout`.
/// stdout and stderr are drained concurrently from one select loop, each into
/// its own buffer. When the timer wins, the child is killed and whatever has
/// been read so far is returned once the child exits (or `KILL_GRACE` passes).
pub async fn run(request: &InvocationRequest, max_timeout: Duration) -> ExecutionOutcome {
    let limit = request.timeout.min(max_timeout);

    let mut cmd = Command::new(&request.binary);
    cmd.args(&request.argv)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &request.cwd {
        cmd.current_dir(dir);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(binary = %request.binary, error = %e, "spawn failed");
            return ExecutionOutcome::spawn_failed(&request.binary, &e);
        }
    };

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let mut stdout_buf: Vec<u8> = Vec::new();
    let mut stderr_buf: Vec<u8> = Vec::new();
    let mut exit: Option<ExitState> = None;
    let mut timed_out = false;

    let deadline = tokio::time::sleep(limit);
    tokio::pin!(deadline);

    loop {
        if exit.is_some() && stdout_pipe.is_none() && stderr_pipe.is_none() {
            break;
        }

        tokio::select! {
            open = read_chunk(&mut stdout_pipe, &mut stdout_buf), if stdout_pipe.is_some() => {
                if !open {
                    stdout_pipe = None;
                }
            }
            open = read_chunk(&mut stderr_pipe, &mut stderr_buf), if stderr_pipe.is_some() => {
                if !open {
                    stderr_pipe = None;
                }
            }
            waited = child.wait(), if exit.is_none() => {
                exit = Some(match waited {
                    Ok(status) => status.code().map_or(ExitState::NoCode, ExitState::Code),
                    Err(e) => {
                        append_line(&mut stderr_buf, &format!("Error: failed to wait for process: {e}"));
                        ExitState::NoCode
                    }
                });
                if !timed_out {
                    // Exited on its own: stop the timer, give lingering pipes a moment to close.
                    let drain_until = Instant::now() + DRAIN_GRACE;
                    if drain_until < deadline.deadline() {
                        deadline.as_mut().reset(drain_until);
                    }
                }
            }
            () = &mut deadline => {
                if timed_out || exit.is_some() {
                    break;
                }
                timed_out = true;
                tracing::warn!(binary = %request.binary, limit_secs = limit.as_secs_f64(), "timeout fired, killing process");
                if let Err(e) = child.start_kill() {
                    tracing::debug!(error = %e, "kill request failed");
                }
                deadline.as_mut().reset(Instant::now() + KILL_GRACE);
            }
        }
    }

    ExecutionOutcome {
        stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
        exit: if timed_out {
            ExitState::NoCode
        } else {
            exit.unwrap_or(ExitState::NoCode)
        },
        timed_out,
    }
}

/// Read one chunk from `pipe` into `buf`, keeping at most `RETAIN_BYTES`.
/// Returns false on EOF or read error. A closed (`None`) pipe never resolves.
async fn read_chunk<R: AsyncRead + Unpin>(pipe: &mut Option<R>, buf: &mut Vec<u8>) -> bool {
    let Some(reader) = pipe.as_mut() else {
        return std::future::pending::<bool>().await;
    };
    let mut chunk = [0u8; READ_CHUNK];
    match reader.read(&mut chunk).await {
        Ok(0) => false,
        Ok(n) => {
            let keep = n.min(RETAIN_BYTES.saturating_sub(buf.len()));
            buf.extend_from_slice(&chunk[..keep]);
            true
        }
        Err(e) => {
            tracing::debug!(error = %e, "pipe read failed");
            false
        }
    }
}

fn append_line(buf: &mut Vec<u8>, line: &str) {
    if !buf.is_empty() && !buf.ends_with(b"\n") {
        buf.push(b'\n');
    }
    buf.extend_from_slice(line.as_bytes());
}

/* ---- Tests ---- */
