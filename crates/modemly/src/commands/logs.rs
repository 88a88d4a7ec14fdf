//! Event log command handler.

use tabled::Tabled;
use tracing::{debug, warn};

use modemly_config::Config;
use modemly_core::parse::parse_event_log;
use modemly_core::{EventLogEntry, IngestionCursor, Resource, reconcile};

use crate::cli::{GlobalOpts, LogsArgs};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Message")]
    message: String,
}

fn log_row(entry: &EventLogEntry, color: bool) -> LogRow {
    LogRow {
        time: entry.device_time.map_or_else(
            || entry.device_time_raw.clone(),
            |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        level: output::severity_label(&entry.severity, color),
        message: entry.message.clone(),
    }
}

fn plain_line(entry: &EventLogEntry) -> String {
    format!(
        "{}\t{}\t{}",
        entry.device_time_raw, entry.severity, entry.message
    )
}

/// Case-insensitive match against message or severity label.
fn matches(entry: &EventLogEntry, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    entry.message.to_lowercase().contains(&needle)
        || entry.severity.to_string().to_lowercase().contains(&needle)
}

/// Deduplicate and order oldest first. An empty cursor treats every
/// entry as new, so the reconciler's ordering applies unchanged.
fn chronological(entries: Vec<EventLogEntry>, window: usize) -> Vec<EventLogEntry> {
    reconcile(&IngestionCursor::new(window), entries).to_persist
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: &LogsArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let (collector, fetcher) = super::connect(config)?;
    let payload = fetcher.fetch(Resource::EventLog).await?;

    let parsed = parse_event_log(&payload.body, collector.timezone, payload.collected_at);
    if parsed.is_unavailable() {
        warn!("modem returned an empty event log");
    }
    for skipped in parsed.skipped() {
        debug!(row = skipped.index, raw = %skipped.raw, error = %skipped.error, "skipped log row");
    }

    let mut entries = chronological(parsed.into_records(), collector.window);
    if let Some(ref needle) = args.grep {
        entries.retain(|e| matches(e, needle));
    }

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &entries,
        |e| log_row(e, color),
        plain_line,
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
