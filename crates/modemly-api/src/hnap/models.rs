// HNAP action catalogue and response envelope helpers.
//
// Field names are versioned by firmware. Lookups go through
// `find_field`, which matches case-insensitively so minor drift in
// capitalisation across firmware builds does not break parsing.

use serde_json::{Map, Value};

/// The HNAP actions this client knows how to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Login,
    GetHomeConnection,
    GetHomeAddress,
    GetMotoStatusSoftware,
    GetMotoStatusLog,
    GetMotoLagStatus,
    GetMotoStatusConnectionInfo,
    GetMotoStatusDownstreamChannelInfo,
    GetMotoStatusStartupSequence,
    GetMotoStatusUpstreamChannelInfo,
    GetMultipleHNAPs,
}

impl Action {
    /// Every read-only status action, in the order `dump` reports them.
    pub const STATUS: [Self; 9] = [
        Self::GetHomeConnection,
        Self::GetHomeAddress,
        Self::GetMotoStatusSoftware,
        Self::GetMotoStatusLog,
        Self::GetMotoLagStatus,
        Self::GetMotoStatusConnectionInfo,
        Self::GetMotoStatusDownstreamChannelInfo,
        Self::GetMotoStatusStartupSequence,
        Self::GetMotoStatusUpstreamChannelInfo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::GetHomeConnection => "GetHomeConnection",
            Self::GetHomeAddress => "GetHomeAddress",
            Self::GetMotoStatusSoftware => "GetMotoStatusSoftware",
            Self::GetMotoStatusLog => "GetMotoStatusLog",
            Self::GetMotoLagStatus => "GetMotoLagStatus",
            Self::GetMotoStatusConnectionInfo => "GetMotoStatusConnectionInfo",
            Self::GetMotoStatusDownstreamChannelInfo => "GetMotoStatusDownstreamChannelInfo",
            Self::GetMotoStatusStartupSequence => "GetMotoStatusStartupSequence",
            Self::GetMotoStatusUpstreamChannelInfo => "GetMotoStatusUpstreamChannelInfo",
            Self::GetMultipleHNAPs => "GetMultipleHNAPs",
        }
    }

    /// Candidate payload fields carrying the `^`-delimited table for the
    /// status actions that have one. Newer names first.
    pub fn payload_fields(self) -> &'static [&'static str] {
        match self {
            Self::GetMotoStatusLog => &["MotoStatusLogList", "MotoStatusLog"],
            Self::GetMotoStatusDownstreamChannelInfo => {
                &["MotoConnDownstreamChannel", "MotoDownstreamChannel"]
            }
            Self::GetMotoStatusUpstreamChannelInfo => {
                &["MotoConnUpstreamChannel", "MotoUpstreamChannel"]
            }
            _ => &[],
        }
    }

    /// `<Action>Response`
    pub fn response_key(self) -> String {
        format!("{}Response", self.as_str())
    }

    /// `<Action>Result`
    pub fn result_key(self) -> String {
        format!("{}Result", self.as_str())
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive field lookup on a JSON object.
pub fn find_field<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    object.get(name).or_else(|| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

/// Case-insensitive field removal, for unwrapping envelopes by value.
pub(crate) fn take_field(object: &mut Map<String, Value>, name: &str) -> Option<Value> {
    if let Some(value) = object.remove(name) {
        return Some(value);
    }
    let key = object
        .keys()
        .find(|key| key.eq_ignore_ascii_case(name))
        .cloned()?;
    object.remove(&key)
}

/// Case-insensitive string field lookup.
pub fn find_str<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    find_field(object, name).and_then(Value::as_str)
}

/// Outcome of an `<Action>Result` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ActionResult {
    Ok,
    Unauthenticated,
    Failed(String),
}

impl ActionResult {
    pub(crate) fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OK" | "SUCCESS" | "" => Self::Ok,
            "UN-AUTH" | "UNAUTH" | "UNAUTHORIZED" => Self::Unauthenticated,
            _ => Self::Failed(raw.trim().to_owned()),
        }
    }
}
