use moov_client::spawn_with_config;
use tracing::warn;

use crate::cmd::StatusArgs;
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_status, OutputFormat};

pub fn run(args: StatusArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.engine.client_config()?;
    let client = spawn_with_config(&args.engine.command(), config)
        .map_err(|err| client_error("failed to start engine", err))?;

    let snapshot = args
        .media
        .iter()
        .try_for_each(|path| client.append(path))
        .and_then(|()| client.status());

    if let Err(err) = client.close() {
        warn!(error = %err, "engine shutdown failed");
    }

    let status = snapshot.map_err(|err| client_error("status request failed", err))?;
    print_status(&status, format);
    Ok(SUCCESS)
}
