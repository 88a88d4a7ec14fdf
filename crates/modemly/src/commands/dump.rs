//! Raw HNAP dump, for debugging firmware quirks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use modemly_api::Action;
use modemly_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Dump {
    collected_at: DateTime<Utc>,
    responses: Map<String, Value>,
}

pub async fn handle(config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let (_, fetcher) = super::connect(config)?;
    let session = fetcher.session();
    let valid = session.ensure_session().await?;

    let responses = session
        .client()
        .get_multiple(&Action::STATUS, &valid.session)
        .await?;
    let dump = Dump {
        collected_at: Utc::now(),
        responses,
    };

    // No table for free-form responses; table and plain get pretty JSON.
    let out = output::render_single(&global.output, &dump, output::render_json_pretty);
    output::print_output(&out, global.quiet);
    Ok(())
}
