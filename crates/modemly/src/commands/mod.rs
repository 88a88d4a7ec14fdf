//! Command dispatch: bridges CLI args -> core collection -> output formatting.

pub mod config_cmd;
pub mod dump;
pub mod ingest;
pub mod levels;
pub mod logs;

use std::sync::Arc;

use modemly_api::HnapClient;
use modemly_config::Config;
use modemly_core::{CollectorConfig, CoreError, Fetcher, SessionManager};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a modem-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Ingest(args) => ingest::handle(&args, config, global).await,
        Command::Levels => levels::handle(config, global).await,
        Command::Logs(args) => logs::handle(&args, config, global).await,
        Command::Dump => dump::handle(config, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// Resolved collector settings plus a fetcher sharing one session.
pub(crate) fn connect(config: &Config) -> Result<(CollectorConfig, Fetcher), CliError> {
    let collector = config.to_collector_config()?;
    let client = HnapClient::new(collector.url.clone(), &collector.transport())
        .map_err(CoreError::Client)?;
    let session = SessionManager::new(client, &collector.username, collector.password.clone());
    let fetcher = Fetcher::new(Arc::new(session), collector.retry);
    Ok((collector, fetcher))
}
