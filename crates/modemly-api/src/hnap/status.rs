// HNAP status actions
//
// Read-only diagnostics: the event log and the channel tables. Each
// returns the device's raw `^`-delimited string; interpretation belongs
// to `modemly-core`'s parser.

use serde_json::{Map, Value};
use tracing::debug;

use crate::auth::HnapSession;
use crate::error::Error;
use crate::hnap::client::HnapClient;
use crate::hnap::models::{Action, find_str};

impl HnapClient {
    /// Fetch the raw table string carried by a status action.
    ///
    /// Tries each of the action's known payload field names, so a
    /// firmware that renamed the field still resolves.
    async fn status_table(&self, action: Action, session: &HnapSession) -> Result<String, Error> {
        let response = self
            .call(action, Value::Object(Map::new()), Some(session))
            .await?;

        let fields = action.payload_fields();
        fields
            .iter()
            .find_map(|field| find_str(&response, field))
            .map(str::to_owned)
            .ok_or_else(|| Error::MissingField {
                action: action.to_string(),
                field: fields.first().copied().unwrap_or("payload").to_owned(),
            })
    }

    /// `GetMotoStatusLog` → `MotoStatusLogList`
    pub async fn get_status_log(&self, session: &HnapSession) -> Result<String, Error> {
        debug!("fetching event log");
        self.status_table(Action::GetMotoStatusLog, session).await
    }

    /// `GetMotoStatusDownstreamChannelInfo` → `MotoConnDownstreamChannel`
    pub async fn get_downstream_channels(&self, session: &HnapSession) -> Result<String, Error> {
        debug!("fetching downstream channels");
        self.status_table(Action::GetMotoStatusDownstreamChannelInfo, session)
            .await
    }

    /// `GetMotoStatusUpstreamChannelInfo` → `MotoConnUpstreamChannel`
    pub async fn get_upstream_channels(&self, session: &HnapSession) -> Result<String, Error> {
        debug!("fetching upstream channels");
        self.status_table(Action::GetMotoStatusUpstreamChannelInfo, session)
            .await
    }

    /// Batch several actions through `GetMultipleHNAPs`.
    ///
    /// Returns loosely-typed JSON keyed by `<Action>Response` because the
    /// field set varies by firmware.
    pub async fn get_multiple(
        &self,
        actions: &[Action],
        session: &HnapSession,
    ) -> Result<Map<String, Value>, Error> {
        let params: Map<String, Value> = actions
            .iter()
            .map(|action| (action.as_str().to_owned(), Value::String(String::new())))
            .collect();
        debug!(count = actions.len(), "fetching multiple HNAP actions");
        self.call(Action::GetMultipleHNAPs, Value::Object(params), Some(session))
            .await
    }
}
