use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use moov_client::{ControlUpdate, StatusReply, UserEvent};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct Record<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: String,
    #[serde(flatten)]
    body: &'a T,
}

fn print_json<T: Serialize>(kind: &'static str, body: &T) {
    let record = Record {
        kind,
        timestamp: now_unix_seconds(),
        body,
    };
    println!(
        "{}",
        serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: Vec<&str>, row: Vec<String>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header)
        .add_row(row);
    println!("{table}");
}

/// One-line status summary: `moov: [2/5] playing 0:01:30`.
///
/// The playlist position is shown 1-based.
pub fn status_line(status: &StatusReply) -> String {
    format!(
        "moov: [{}/{}] {} {}",
        status.playlist_position.saturating_add(1),
        status.playlist_count,
        if status.paused { "paused" } else { "playing" },
        clock(status.time_seconds)
    )
}

/// `H:MM:SS`, rounded to the nearest second; negative and non-finite times read as zero.
fn clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

pub fn print_status(status: &StatusReply, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json("status", status),
        OutputFormat::Table => print_table(
            vec!["REQUEST", "POSITION", "COUNT", "TIME", "STATE"],
            vec![
                status.request_id.to_string(),
                status.playlist_position.to_string(),
                status.playlist_count.to_string(),
                clock(status.time_seconds),
                if status.paused { "paused" } else { "playing" }.to_string(),
            ],
        ),
        // Chat adapters relay every `MSG` line, status included.
        OutputFormat::Pretty => println!("MSG {}", status_line(status)),
    }
}

pub fn print_update(update: &ControlUpdate, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json("control_update", update),
        OutputFormat::Table => print_table(
            vec!["POSITION", "TIME", "STATE"],
            vec![
                update.playlist_position.to_string(),
                clock(update.time_seconds),
                if update.paused { "paused" } else { "playing" }.to_string(),
            ],
        ),
        OutputFormat::Pretty => println!(
            "UPDATE position={} time={:.3} paused={}",
            update.playlist_position, update.time_seconds, update.paused
        ),
    }
}

pub fn print_event(event: &UserEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json("user_event", event),
        OutputFormat::Table => print_table(vec!["TEXT"], vec![event.text.clone()]),
        OutputFormat::Pretty => println!("MSG {}", single_line(&event.text)),
    }
}

/// Line-oriented consumers split on newlines, so keep each message on one.
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
