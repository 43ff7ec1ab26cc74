use std::ffi::OsStr;

use moov_transport::{EngineCommand, EnginePipes};
use tracing::debug;

use crate::client::{Client, ClientConfig};
use crate::error::Result;

/// Start the engine and connect a client to its stdin/stdout.
pub fn spawn<I, S>(program: impl AsRef<OsStr>, args: I) -> Result<Client>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    spawn_with_config(
        &EngineCommand::new(program).args(args),
        ClientConfig::default(),
    )
}

/// Start the engine described by `command` with explicit client configuration.
pub fn spawn_with_config(command: &EngineCommand, config: ClientConfig) -> Result<Client> {
    let EnginePipes {
        process,
        stdin,
        stdout,
    } = command.spawn()?;
    let pid = process.id();

    let client = Client::from_parts(stdout, stdin, Some(Box::new(process)), config)?;
    debug!(pid, "client connected to engine");
    Ok(client)
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::error::ClientError;

    fn wait_until_dead(client: &Client) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while client.alive() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn missing_program_is_transport_error() {
        let err = spawn("/definitely/not/an/engine", std::iter::empty::<&str>()).unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[test]
    fn engine_exit_is_observed() {
        let client = spawn("sh", ["-c", "exit 0"]).unwrap();
        assert!(client.pid().is_some());

        wait_until_dead(&client);
        assert!(!client.alive());
        client.close().unwrap();
        client.close().unwrap();
    }

    #[test]
    fn stubborn_engine_is_terminated_on_close() {
        let config = ClientConfig {
            shutdown_timeout: Duration::from_millis(100),
            ..ClientConfig::default()
        };
        let client =
            spawn_with_config(&EngineCommand::new("sleep").arg("30"), config).unwrap();
        assert!(client.alive());

        let started = Instant::now();
        client.close().unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!client.alive());
        assert!(matches!(
            client.set_paused(false),
            Err(ClientError::EngineUnavailable)
        ));
    }
}
