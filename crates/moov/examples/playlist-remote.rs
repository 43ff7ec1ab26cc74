//! Drive an engine from code: queue media, step through it, print what it reports.
//!
//! Run against the bundled stub engine:
//!   cargo build --features cli
//!   cargo run --example playlist-remote -- target/debug/moov stub-engine --echo-messages

use std::time::Duration;

use moov::client::{spawn_with_config, ClientConfig};
use moov::transport::EngineCommand;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let program = argv.next().ok_or("usage: playlist-remote <engine> [args...]")?;
    let command = EngineCommand::new(program).args(argv);

    let config = ClientConfig {
        status_timeout: Some(Duration::from_secs(5)),
        ..ClientConfig::default()
    };
    let client = spawn_with_config(&command, config)?;

    for path in ["intro.mkv", "feature.mkv", "credits.mkv"] {
        client.append(path)?;
    }
    client.put_message("remote attached", 0x00FF_FFFF, 0x0000_0000)?;

    while let Some(position) = client.next()? {
        eprintln!("moved to entry {}", position + 1);
    }
    let target = client.relative_seek(90.0)?;
    eprintln!("seeked to {target}s");

    let status = client.status()?;
    eprintln!(
        "[{}/{}] paused={} time={}",
        status.playlist_position + 1,
        status.playlist_count,
        status.paused,
        status.time_seconds
    );

    for update in client.drain_updates() {
        eprintln!("update: {update:?}");
    }
    for event in client.drain_events() {
        eprintln!("event: {}", event.text);
    }

    client.close()?;
    Ok(())
}
