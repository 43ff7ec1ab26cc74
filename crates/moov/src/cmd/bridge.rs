use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use moov::chat::{parse_line, ChatLine};
use moov_client::{spawn_with_config, Client, ClientError};
use tracing::{debug, info, warn};

use crate::cmd::{parse_duration, BridgeArgs};
use crate::exit::{client_error, io_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_event, print_status, print_update, OutputFormat};

pub fn run(args: BridgeArgs, format: OutputFormat) -> CliResult<i32> {
    let poll_interval = parse_duration(&args.poll_interval)?;
    let config = args.engine.client_config()?;
    let client = spawn_with_config(&args.engine.command(), config)
        .map_err(|err| client_error("failed to start engine", err))?;

    let outcome = relay(&client, &args, poll_interval, format);
    if let Err(err) = client.close() {
        warn!(error = %err, "engine shutdown failed");
    }
    outcome
}

fn relay(
    client: &Client,
    args: &BridgeArgs,
    poll_interval: Duration,
    format: OutputFormat,
) -> CliResult<i32> {
    for path in &args.media {
        client
            .append(path)
            .map_err(|err| client_error("failed to queue media", err))?;
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    let lines = spawn_stdin_reader()?;

    while running.load(Ordering::SeqCst) {
        match lines.recv_timeout(poll_interval) {
            Ok(line) => handle_line(client, &line, args, format)?,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("stdin closed");
                return finish(client, format);
            }
        }
        print_pending(client, format);

        if !client.alive() {
            warn!("engine exited");
            return Ok(FAILURE);
        }
    }

    info!("interrupted");
    print_pending(client, format);
    Ok(SUCCESS)
}

/// One status round trip flushes everything the engine emitted before it.
fn finish(client: &Client, format: OutputFormat) -> CliResult<i32> {
    let code = match client.status() {
        Ok(_) => SUCCESS,
        Err(ClientError::EngineUnavailable | ClientError::Disconnected) => {
            warn!("engine gone before final status");
            FAILURE
        }
        Err(err) => return Err(client_error("final status failed", err)),
    };
    print_pending(client, format);
    Ok(code)
}

fn handle_line(
    client: &Client,
    line: &str,
    args: &BridgeArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let parsed = match parse_line(line) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(error = %err, "ignoring chat command");
            return Ok(());
        }
    };

    let result = match &parsed {
        ChatLine::Command { alias, command } => {
            debug!(alias = alias.as_deref(), ?command, "chat command");
            command.execute(client)
        }
        ChatLine::Message { text, .. } if text.is_empty() => Ok(None),
        ChatLine::Message { .. } => {
            let text = parsed.overlay_text().unwrap_or_default();
            client.put_message(&text, args.fg, args.bg).map(|()| None)
        }
    };

    match result {
        Ok(Some(status)) => {
            print_pending(client, format);
            print_status(&status, format);
            Ok(())
        }
        Ok(None) => Ok(()),
        // Reported by the liveness check in the main loop.
        Err(ClientError::EngineUnavailable | ClientError::Disconnected) => Ok(()),
        Err(err) => Err(client_error("chat command failed", err)),
    }
}

fn print_pending(client: &Client, format: OutputFormat) {
    for update in client.drain_updates() {
        print_update(&update, format);
    }
    for event in client.drain_events() {
        print_event(&event, format);
    }
}

/// Lines arrive over a channel so the loop can poll the engine while stdin is idle.
fn spawn_stdin_reader() -> CliResult<Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("moov-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!(error = %err, "stdin read failed");
                        break;
                    }
                };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .map_err(|err| io_error("failed to start stdin reader", err))?;
    Ok(rx)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
