use std::time::Duration;

use crate::error::Result;
use crate::process::EngineProcess;

/// Supervision handle on the engine process.
///
/// The client only needs liveness and shutdown from the process; the pipe
/// ends are handed over separately. Implemented by [`EngineProcess`], and by
/// test doubles that stand in for a real child.
pub trait EngineHandle: Send {
    /// Operating system process id, if there is one.
    fn id(&self) -> Option<u32>;

    /// Whether the process has exited. Never blocks.
    fn has_exited(&mut self) -> Result<bool>;

    /// Wait up to `timeout` for exit. Returns `true` once exited.
    fn wait_timeout(&mut self, timeout: Duration) -> Result<bool>;

    /// Politely ask the process to exit.
    fn terminate(&mut self) -> Result<()>;

    /// Forcefully stop the process.
    fn kill(&mut self) -> Result<()>;
}

impl EngineHandle for EngineProcess {
    fn id(&self) -> Option<u32> {
        Some(EngineProcess::id(self))
    }

    fn has_exited(&mut self) -> Result<bool> {
        Ok(self.try_wait()?.is_some())
    }

    fn wait_timeout(&mut self, timeout: Duration) -> Result<bool> {
        Ok(EngineProcess::wait_timeout(self, timeout)?.is_some())
    }

    fn terminate(&mut self) -> Result<()> {
        EngineProcess::terminate(self)
    }

    fn kill(&mut self) -> Result<()> {
        EngineProcess::kill(self)
    }
}

impl std::fmt::Debug for dyn EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("pid", &self.id())
            .finish()
    }
}
