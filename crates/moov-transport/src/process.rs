use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Interval between exit checks while waiting on the engine.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How to launch the engine.
///
/// Standard input and standard output are always piped; standard error is
/// inherited so engine diagnostics land wherever the caller's go.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    current_dir: Option<PathBuf>,
}

impl EngineCommand {
    /// Launch `program` with no arguments.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    /// Set an environment variable for the engine.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Run the engine in `dir`.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// The executable that will be launched.
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments passed to the executable.
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Spawn the engine and take ownership of both pipe ends.
    pub fn spawn(&self) -> Result<EnginePipes> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| TransportError::Spawn {
            program: PathBuf::from(&self.program),
            source,
        })?;

        let stdin = child.stdin.take().ok_or(TransportError::MissingPipe("stdin"));
        let stdout = child
            .stdout
            .take()
            .ok_or(TransportError::MissingPipe("stdout"));
        let (stdin, stdout) = match (stdin, stdout) {
            (Ok(stdin), Ok(stdout)) => (stdin, stdout),
            (Err(err), _) | (_, Err(err)) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(err);
            }
        };

        info!(
            pid = child.id(),
            program = %Path::new(&self.program).display(),
            "engine spawned"
        );

        Ok(EnginePipes {
            process: EngineProcess {
                child,
                exit_status: None,
            },
            stdin,
            stdout,
        })
    }
}

/// A freshly spawned engine and the two pipe ends connected to it.
#[derive(Debug)]
pub struct EnginePipes {
    /// Process handle for liveness and termination.
    pub process: EngineProcess,
    /// Write end: commands flow into the engine here.
    pub stdin: ChildStdin,
    /// Read end: replies and events arrive here.
    pub stdout: ChildStdout,
}

/// Exclusive handle on a running engine process.
#[derive(Debug)]
pub struct EngineProcess {
    child: Child,
    exit_status: Option<ExitStatus>,
}

impl EngineProcess {
    /// Operating system process id.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Exit status, if the process has already been observed to exit.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Check for exit without blocking. Reaps the child when it has exited.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        if let Some(status) = self.exit_status {
            return Ok(Some(status));
        }
        let status = self.child.try_wait()?;
        if let Some(status) = status {
            info!(pid = self.child.id(), %status, "engine exited");
            self.exit_status = Some(status);
        }
        Ok(status)
    }

    /// Wait up to `timeout` for the process to exit.
    ///
    /// Returns `Ok(None)` if it is still running when the timeout elapses.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<ExitStatus>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(Some(status));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            std::thread::sleep(EXIT_POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Ask the engine to exit (SIGTERM on Unix, hard kill elsewhere).
    #[cfg(unix)]
    pub fn terminate(&mut self) -> Result<()> {
        if self.try_wait()?.is_some() {
            return Ok(());
        }
        let pid = libc::pid_t::try_from(self.child.id())
            .map_err(|_| std::io::Error::other("engine pid out of range"))?;
        debug!(pid, "sending SIGTERM to engine");

        // SAFETY: `pid` belongs to a child we spawned and have not reaped yet,
        // so the id cannot have been recycled for another process.
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            Ok(())
        } else {
            Err(err.into())
        }
    }

    /// Ask the engine to exit (SIGTERM on Unix, hard kill elsewhere).
    #[cfg(not(unix))]
    pub fn terminate(&mut self) -> Result<()> {
        self.kill()
    }

    /// Forcefully kill the engine.
    pub fn kill(&mut self) -> Result<()> {
        if self.try_wait()?.is_some() {
            return Ok(());
        }
        debug!(pid = self.child.id(), "killing engine");
        match self.child.kill() {
            Ok(()) => Ok(()),
            // Already exited between the check and the kill.
            Err(err) if err.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
