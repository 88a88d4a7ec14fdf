//! Collector command handler.

use std::time::Duration;

use serde::Serialize;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use modemly_config::Config;
use modemly_core::{
    Batch, Collector, CollectorConfig, CursorStore, CycleReport, MemorySink, Resource,
};

use crate::cli::{GlobalOpts, IngestArgs};
use crate::error::CliError;
use crate::output;

// ── Report view ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct ReportView<'a> {
    started_at: String,
    events_fetched: usize,
    events_written: usize,
    signals_written: usize,
    rows_skipped: usize,
    unavailable: Vec<String>,
    continuity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch: Option<&'a Batch>,
}

impl<'a> ReportView<'a> {
    fn new(report: &CycleReport, batch: Option<&'a Batch>) -> Self {
        Self {
            started_at: report.started_at.to_rfc3339(),
            events_fetched: report.events_fetched,
            events_written: report.events_written,
            signals_written: report.signals_written,
            rows_skipped: report.rows_skipped,
            unavailable: report.unavailable.iter().map(Resource::to_string).collect(),
            continuity: report.continuity.map(|c| c.to_string()),
            batch,
        }
    }
}

fn detail(view: &ReportView<'_>) -> String {
    let mut lines = vec![
        format!("Started:      {}", view.started_at),
        format!(
            "Events:       {} new of {} fetched",
            view.events_written, view.events_fetched
        ),
        format!("Signals:      {}", view.signals_written),
        format!("Rows skipped: {}", view.rows_skipped),
    ];
    if let Some(ref continuity) = view.continuity {
        lines.push(format!("Log:          {continuity}"));
    }
    if !view.unavailable.is_empty() {
        lines.push(format!("Unavailable:  {}", view.unavailable.join(", ")));
    }
    if let Some(batch) = view.batch {
        for event in &batch.events {
            lines.push(format!(
                "  [{}] {} {}",
                event.device_time_raw, event.severity, event.message
            ));
        }
    }
    lines.join("\n")
}

fn print_report(report: &CycleReport, batch: Option<&Batch>, global: &GlobalOpts) {
    let view = ReportView::new(report, batch);
    let out = output::render_single(&global.output, &view, detail);
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: &IngestArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let mut collector_config = config.to_collector_config()?;
    if let Some(secs) = args.interval {
        collector_config.interval = Duration::from_secs(secs);
    }

    if args.dry_run {
        return dry_run(&collector_config, global).await;
    }

    let sink = config.build_sink()?;
    let store = CursorStore::new(config.cursor_path());
    let mut collector = Collector::new(&collector_config, sink)?.with_cursor_store(store)?;

    if args.once {
        let report = collector.run_cycle().await?;
        print_report(&report, None, global);
        return Ok(());
    }

    info!(
        host = %collector_config.url,
        interval_secs = collector_config.interval.as_secs(),
        "starting collector"
    );
    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));
    collector.run(cancel).await?;
    Ok(())
}

/// One cycle into memory with a fresh cursor; prints what would be written.
async fn dry_run(config: &CollectorConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let sink = MemorySink::new();
    let mut collector = Collector::new(config, sink.clone())?;
    let report = collector.run_cycle().await?;
    let batch = Batch {
        signals: sink.signals(),
        events: sink.events(),
    };
    print_report(&report, Some(&batch), global);
    Ok(())
}

/// Cancel `token` on Ctrl-C or SIGTERM. The cycle in flight finishes first.
async fn cancel_on_shutdown(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C, stopping after the current cycle"),
        () = terminate => info!("received SIGTERM, stopping after the current cycle"),
    }
    token.cancel();
}
