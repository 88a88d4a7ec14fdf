mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::ffi::OsStr;
use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::cli::{Cli, Command, GlobalOpts, LogFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // `ingest` is a daemon: its cycle summaries are the point, so it
    // starts one level more verbose.
    let base = u8::from(matches!(cli.command, Command::Ingest(_)));
    let _guard = init_tracing(&cli.global, base.saturating_add(cli.global.verbose));

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Install the global subscriber. The returned guard flushes the log
/// file writer on drop and must live until exit.
fn init_tracing(global: &GlobalOpts, verbosity: u8) -> Option<WorkerGuard> {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (writer, guard) = match &global.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file = path.file_name().unwrap_or(OsStr::new("modemly.log"));
            let (non_blocking, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(writer);
    match global.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.with_ansi(global.log_file.is_none()).init(),
    }
    guard
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need the modem
        Command::Config(args) => commands::config_cmd::handle(&args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "modemly", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let config = config::load(&cli.global)?;
            tracing::debug!(command = ?cmd, host = %config.modem.host, "dispatching command");
            commands::dispatch(cmd, &config, &cli.global).await
        }
    }
}
