use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// How often the runner wakes up to check the deadline and cancel flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Time between SIGTERM and SIGKILL when stopping a process group.
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// How long to keep reading buffered output after the child has exited.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// A command to run: program, arguments, extra environment and an optional
/// deadline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Invocation {
    /// Program name or path
    pub program: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Environment variables added on top of the inherited environment
    pub env: Vec<(String, String)>,
    /// Maximum wall-clock time before the process group is terminated
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Create an invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Build an invocation from an argv vector (`argv[0]` is the program).
    ///
    /// Returns `None` for an empty vector.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).args(args.iter().cloned()))
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set or clear the deadline.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The full argv, program first.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The process exited with this code
    Code(i32),
    /// The process was killed by this signal
    Signaled(i32),
    /// The deadline passed and the process group was terminated
    TimedOut,
    /// The cancel token was tripped and the process group was terminated
    Cancelled,
}

impl Exit {
    /// Whether the process exited with code 0.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Code(0))
    }

    /// The exit code, if the process exited on its own.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Code(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit code {code}"),
            Self::Signaled(signal) => write!(f, "killed by signal {signal}"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

/// Output of [`capture`], split by stream.
#[derive(Debug, Clone)]
pub struct Captured {
    /// How the command ended
    pub exit: Exit,
    /// Standard output lines, in order
    pub stdout: Vec<String>,
    /// Standard error lines, in order
    pub stderr: Vec<String>,
}

impl Captured {
    /// Standard error joined with newlines.
    pub fn stderr_text(&self) -> String {
        self.stderr.join("\n")
    }
}

/// How the child's output pipes are wired
#[derive(Clone, Copy)]
enum Pipes {
    /// One pipe per stream, read on separate threads
    Split,
    /// stdout and stderr share one pipe, so lines keep their write order
    Merged,
}

/// Run a command, calling `on_line` for every line of stdout or stderr as it
/// arrives.
///
/// The two pipes are read independently, so the order between a stdout line
/// and a stderr line is not guaranteed. Use [`stream`] for one ordered stream.
///
/// Returns once the command has exited, or after the deadline passes or the
/// token is cancelled (in which case the whole process group is terminated).
pub fn run(
    inv: &Invocation,
    cancel: &CancelToken,
    on_line: &mut dyn FnMut(Stream, &str),
) -> Result<Exit> {
    pump(inv, cancel, Pipes::Split, on_line)
}

fn pump(
    inv: &Invocation,
    cancel: &CancelToken,
    pipes: Pipes,
    on_line: &mut dyn FnMut(Stream, &str),
) -> Result<Exit> {
    let mut command = Command::new(&inv.program);
    command.args(&inv.args).stdin(Stdio::null());
    let merged = match pipes {
        Pipes::Split => {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
            None
        }
        Pipes::Merged => {
            let (reader, writer) = std::io::pipe().map_err(|e| io_error(inv, e))?;
            let writer_err = writer.try_clone().map_err(|e| io_error(inv, e))?;
            command.stdout(writer).stderr(writer_err);
            Some(reader)
        }
    };
    for (key, value) in &inv.env {
        command.env(key, value);
    }

    // Own process group so a deadline can stop helpers the command forks.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    log::debug!("Running: {inv}");
    let mut child = command.spawn().map_err(|source| Error::Spawn {
        program: inv.program.clone(),
        source,
    })?;
    // Closes the parent's copies of the merged pipe's write end.
    drop(command);

    let (tx, rx) = mpsc::channel();
    if let Some(reader) = merged {
        spawn_reader(reader, Stream::Stdout, tx.clone());
    }
    if let Some(stdout) = child.stdout.take() {
        spawn_reader(stdout, Stream::Stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader(stderr, Stream::Stderr, tx.clone());
    }
    drop(tx);

    let deadline = inv.timeout.map(|timeout| Instant::now() + timeout);

    let mut exited: Option<ExitStatus> = None;
    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok((stream, line)) => on_line(stream, &line),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if let Some(status) = child.try_wait().map_err(|e| io_error(inv, e))? {
                    exited = Some(status);
                    break;
                }
            }
        }

        if let Some(exit) = stop_reason(deadline, cancel) {
            log::warn!("Stopping {inv}: {exit}");
            terminate(&mut child);
            return Ok(exit);
        }
    }

    match exited {
        Some(status) => {
            // A forked helper may still hold the pipes open; take what is
            // already buffered and move on.
            drain(&rx, on_line);
            Ok(exit_from(status))
        }
        None => wait(&mut child, inv, deadline, cancel),
    }
}

/// Run a command with stdout and stderr on one pipe, so lines arrive in the
/// order the command wrote them.
pub fn stream(
    inv: &Invocation,
    cancel: &CancelToken,
    on_line: &mut dyn FnMut(&str),
) -> Result<Exit> {
    pump(inv, cancel, Pipes::Merged, &mut |_, line| on_line(line))
}

/// Run a command and collect its output, keeping stdout and stderr apart.
pub fn capture(inv: &Invocation, cancel: &CancelToken) -> Result<Captured> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let exit = run(inv, cancel, &mut |stream, line| match stream {
        Stream::Stdout => stdout.push(line.to_string()),
        Stream::Stderr => stderr.push(line.to_string()),
    })?;

    Ok(Captured {
        exit,
        stdout,
        stderr,
    })
}

fn spawn_reader<R: Read + Send + 'static>(
    reader: R,
    stream: Stream,
    tx: Sender<(Stream, String)>,
) {
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\n', '\r'])
                        .to_string();
                    if tx.send((stream, line)).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

fn drain(rx: &Receiver<(Stream, String)>, on_line: &mut dyn FnMut(Stream, &str)) {
    while let Ok((stream, line)) = rx.recv_timeout(DRAIN_GRACE) {
        on_line(stream, &line);
    }
}

fn wait(
    child: &mut Child,
    inv: &Invocation,
    deadline: Option<Instant>,
    cancel: &CancelToken,
) -> Result<Exit> {
    loop {
        if let Some(status) = child.try_wait().map_err(|e| io_error(inv, e))? {
            return Ok(exit_from(status));
        }
        if let Some(exit) = stop_reason(deadline, cancel) {
            log::warn!("Stopping {inv}: {exit}");
            terminate(child);
            return Ok(exit);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn stop_reason(deadline: Option<Instant>, cancel: &CancelToken) -> Option<Exit> {
    if cancel.is_cancelled() {
        return Some(Exit::Cancelled);
    }
    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
        return Some(Exit::TimedOut);
    }
    None
}

fn exit_from(status: ExitStatus) -> Exit {
    if let Some(code) = status.code() {
        return Exit::Code(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Exit::Signaled(signal);
        }
    }

    Exit::Code(-1)
}

fn io_error(inv: &Invocation, source: std::io::Error) -> Error {
    Error::Io {
        program: inv.program.clone(),
        source,
    }
}

/// SIGTERM the child's process group, then SIGKILL if it is still around
/// after the grace period.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        let pgid = child.id() as i32;
        signal_group(pgid, libc::SIGTERM);

        let until = Instant::now() + TERMINATE_GRACE;
        while Instant::now() < until {
            if matches!(child.try_wait(), Ok(Some(_))) {
                return;
            }
            thread::sleep(POLL_INTERVAL);
        }

        signal_group(pgid, libc::SIGKILL);
    }

    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn signal_group(pgid: i32, signal: libc::c_int) {
    // SAFETY: kill(2) only delivers a signal; no memory is shared with libc.
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc != 0 {
        // Setuid children (pkexec, sudo) refuse signals from the invoking user.
        log::debug!(
            "kill(-{pgid}, {signal}) failed: {}",
            std::io::Error::last_os_error()
        );
    }
}
