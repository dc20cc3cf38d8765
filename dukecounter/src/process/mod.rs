//! Subprocess invocation for the external engines.
//!
//! Output from both pipes is forwarded line by line to an [`OutputSink`]
//! while the child runs. With an idle limit, a child that writes nothing for
//! that long is killed together with everything it started.

mod lines;
mod sink;

pub use sink::{CollectingSink, ConsoleSink, NullSink, OutputSink, OutputStream};

use crate::errors::{StageError, StageFailure};
use lines::LineSplitter;
use std::ffi::{OsStr, OsString};
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

const CHUNK_SIZE: usize = 8 * 1024;

/// Stand-in deadline for a disabled idle limit.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
}

impl Invocation {
    /// Creates an invocation of `program` with no arguments.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// The program name, for messages.
    #[must_use]
    pub fn program(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Shell-like rendering, for logs.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The child leads a new process group so it can be killed with its
    /// descendants.
    fn command(&self) -> Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        Command::from(cmd)
    }
}

/// What a successful run looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Exit status of the child.
    pub status: ExitStatus,
    /// Wall-clock time from spawn to exit.
    pub elapsed: Duration,
    /// Number of output lines forwarded.
    pub lines: usize,
}

/// One child pipe and its pending partial line.
struct Pipe<R> {
    reader: Option<R>,
    chunk: Vec<u8>,
    lines: LineSplitter,
}

impl<R: AsyncRead + Unpin> Pipe<R> {
    fn new(reader: Option<R>) -> Self {
        Self {
            reader,
            chunk: vec![0; CHUNK_SIZE],
            lines: LineSplitter::default(),
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Reads whatever is available. Cancel safe: a dropped call loses no
    /// data.
    async fn read(&mut self) -> io::Result<usize> {
        match self.reader.as_mut() {
            Some(reader) => reader.read(&mut self.chunk).await,
            None => Ok(0),
        }
    }

    fn split(&mut self, n: usize) -> Vec<String> {
        self.lines.push(&self.chunk[..n])
    }

    fn close(&mut self) -> Vec<String> {
        self.reader = None;
        self.lines.finish().into_iter().collect()
    }
}

enum Event {
    Read(OutputStream, io::Result<usize>),
    Idle,
}

/// Kills the child's process group when dropped, unless disarmed.
struct GroupGuard {
    leader: Option<u32>,
}

impl GroupGuard {
    fn kill(&mut self) {
        if let Some(leader) = self.leader.take() {
            signal_group(leader);
        }
    }

    fn disarm(&mut self) {
        self.leader = None;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn signal_group(leader: u32) {
    let result = std::process::Command::new("kill")
        .arg("-KILL")
        .arg("--")
        .arg(format!("-{leader}"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = result {
        debug!(leader, error = %e, "Failed to signal process group");
    }
}

#[cfg(not(unix))]
fn signal_group(_leader: u32) {}

async fn kill(child: &mut Child, group: &mut GroupGuard, stage: &str) {
    group.kill();
    if let Err(e) = child.kill().await {
        warn!(stage, error = %e, "Failed to kill subprocess");
    }
}

fn deadline(limit: Duration) -> tokio::time::Instant {
    let now = tokio::time::Instant::now();
    now.checked_add(limit).unwrap_or(now + FAR_FUTURE)
}

/// Runs `invocation` to completion, forwarding its output to `sink`.
///
/// `idle_timeout` bounds the time between consecutive reads that return any
/// bytes, terminated or not, and the time between the pipes closing and the
/// child exiting. `None` waits indefinitely.
///
/// # Errors
///
/// Returns a [`StageError`] for `stage` if the child cannot be spawned,
/// exits unsuccessfully, or is killed by the idle limit.
pub async fn run_streaming(
    stage: &str,
    invocation: &Invocation,
    idle_timeout: Option<Duration>,
    sink: &mut dyn OutputSink,
) -> Result<RunOutcome, StageError> {
    let program = invocation.program();
    let fail = |failure| StageError::new(stage, failure);

    info!(stage, command = %invocation.display(), "Launching subprocess");
    let start = Instant::now();

    let mut child = invocation
        .command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| {
            fail(StageFailure::Launch {
                program: program.clone(),
                source,
            })
        })?;
    let mut group = GroupGuard { leader: child.id() };

    let mut stdout = Pipe::new(child.stdout.take());
    let mut stderr = Pipe::new(child.stderr.take());
    let mut lines = 0usize;

    let limit = idle_timeout.unwrap_or(FAR_FUTURE);
    let idle = tokio::time::sleep_until(deadline(limit));
    tokio::pin!(idle);

    let timed_out = || {
        StageError::new(
            stage,
            StageFailure::IdleTimeout {
                program: program.clone(),
                idle: limit,
            },
        )
    };
    let lost = |source| {
        StageError::new(
            stage,
            StageFailure::Wait {
                program: program.clone(),
                source,
            },
        )
    };

    while stdout.is_open() || stderr.is_open() {
        let (out_open, err_open) = (stdout.is_open(), stderr.is_open());
        let event = tokio::select! {
            read = stdout.read(), if out_open => Event::Read(OutputStream::Stdout, read),
            read = stderr.read(), if err_open => Event::Read(OutputStream::Stderr, read),
            () = &mut idle, if idle_timeout.is_some() => Event::Idle,
        };

        let (stream, n) = match event {
            Event::Read(stream, Ok(n)) => (stream, n),
            Event::Read(_, Err(e)) => {
                kill(&mut child, &mut group, stage).await;
                return Err(lost(e));
            }
            Event::Idle => {
                warn!(stage, idle = ?limit, "No output from subprocess; killing it");
                kill(&mut child, &mut group, stage).await;
                return Err(timed_out());
            }
        };

        if n > 0 && idle_timeout.is_some() {
            idle.as_mut().reset(deadline(limit));
        }
        let batch = match (stream, n) {
            (OutputStream::Stdout, 0) => stdout.close(),
            (OutputStream::Stderr, 0) => stderr.close(),
            (OutputStream::Stdout, n) => stdout.split(n),
            (OutputStream::Stderr, n) => stderr.split(n),
        };
        for line in batch {
            lines += 1;
            sink.line(stream, &line);
        }
    }

    if idle_timeout.is_some() {
        idle.as_mut().reset(deadline(limit));
    }
    let waited = tokio::select! {
        status = child.wait() => Some(status),
        () = &mut idle, if idle_timeout.is_some() => None,
    };
    let status = match waited {
        Some(status) => status.map_err(lost)?,
        None => {
            warn!(stage, "Subprocess closed its output but did not exit; killing it");
            kill(&mut child, &mut group, stage).await;
            return Err(timed_out());
        }
    };
    group.disarm();

    let elapsed = start.elapsed();
    debug!(
        stage,
        %status,
        lines,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "Subprocess exited"
    );

    if !status.success() {
        return Err(fail(StageFailure::ExitStatus {
            program,
            code: status.code(),
        }));
    }

    Ok(RunOutcome {
        status,
        elapsed,
        lines,
    })
}
