use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use moov_client::ClientConfig;
use moov_transport::EngineCommand;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod bridge;
pub mod status;
pub mod stub_engine;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Relay chat lines from stdin to the engine and print what it reports.
    Bridge(BridgeArgs),
    /// Print one status snapshot from a freshly started engine.
    Status(StatusArgs),
    /// Run an in-memory engine on stdin/stdout (for tests and demos).
    StubEngine(StubEngineArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Bridge(args) => bridge::run(args, format),
        Command::Status(args) => status::run(args, format),
        Command::StubEngine(args) => stub_engine::run(args),
        Command::Version(args) => version::run(args),
    }
}

/// How to start and supervise the engine.
#[derive(Args, Debug)]
pub struct EngineArgs {
    /// Engine executable.
    #[arg(long, env = "MOOV_ENGINE", value_name = "PATH")]
    pub engine: PathBuf,
    /// Extra argument for the engine (repeatable).
    #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,
    /// Give up on a status request after this long (e.g. 5s, 500ms).
    #[arg(long, value_name = "DURATION")]
    pub status_timeout: Option<String>,
    /// Grace period for each step of engine shutdown.
    #[arg(long, value_name = "DURATION", default_value = "5s")]
    pub shutdown_timeout: String,
}

impl EngineArgs {
    pub fn command(&self) -> EngineCommand {
        EngineCommand::new(&self.engine).args(&self.engine_args)
    }

    pub fn client_config(&self) -> CliResult<ClientConfig> {
        let status_timeout = self
            .status_timeout
            .as_deref()
            .map(parse_duration)
            .transpose()?;
        Ok(ClientConfig {
            status_timeout,
            shutdown_timeout: parse_duration(&self.shutdown_timeout)?,
            ..ClientConfig::default()
        })
    }
}

#[derive(Args, Debug)]
pub struct BridgeArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
    /// Media to append to the playlist once the engine is up.
    pub media: Vec<String>,
    /// Overlay text colour as RGB hex (e.g. ffffff).
    #[arg(long, value_name = "RGB", default_value = "ffffff", value_parser = parse_color)]
    pub fg: u32,
    /// Overlay background colour as RGB hex.
    #[arg(long, value_name = "RGB", default_value = "000000", value_parser = parse_color)]
    pub bg: u32,
    /// How often to check the engine for events while stdin is idle.
    #[arg(long, value_name = "DURATION", default_value = "100ms")]
    pub poll_interval: String,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
    /// Media to append before asking for status.
    pub media: Vec<String>,
}

#[derive(Args, Debug)]
pub struct StubEngineArgs {
    /// Initial playlist.
    pub media: Vec<String>,
    /// Echo overlay messages back as user events.
    #[arg(long)]
    pub echo_messages: bool,
    /// Start paused.
    #[arg(long)]
    pub paused: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

fn parse_color(input: &str) -> Result<u32, String> {
    let hex = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix('#'))
        .unwrap_or(input);
    let value =
        u32::from_str_radix(hex, 16).map_err(|_| format!("invalid colour: {input}"))?;
    if value > 0x00FF_FFFF {
        return Err(format!("colour out of range: {input}"));
    }
    Ok(value)
}
