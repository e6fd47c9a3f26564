use shared::error::ReportParseError;
use thiserror::Error;

pub const TRANSPORT_FAILURE_MESSAGE: &str = "Unable to reach the report service";
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate report";
pub const MALFORMED_RESPONSE_MESSAGE: &str = "The report service returned a malformed response";
pub const IN_FLIGHT_MESSAGE: &str = "A report is already being generated";

#[derive(Debug, Error)]
pub enum SubmitError {
    /// The request never produced a response.
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("report service responded with status {status}")]
    Service { status: u16, detail: Option<String> },
    /// A success status whose body is not a report tree.
    #[error("malformed report response: {0}")]
    MalformedResponse(#[from] ReportParseError),
    #[error("a submission is already in flight")]
    AlreadyInFlight,
}

impl SubmitError {
    /// The single line shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => TRANSPORT_FAILURE_MESSAGE.to_string(),
            Self::Service {
                detail: Some(detail),
                ..
            } => detail.clone(),
            Self::Service { detail: None, .. } => GENERIC_FAILURE_MESSAGE.to_string(),
            Self::MalformedResponse(_) => MALFORMED_RESPONSE_MESSAGE.to_string(),
            Self::AlreadyInFlight => IN_FLIGHT_MESSAGE.to_string(),
        }
    }
}

impl From<reqwest::Error> for SubmitError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum TransportConfigError {
    #[error("invalid report service url '{url}': {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("report service url '{0}' must use http or https")]
    UnsupportedScheme(String),
    #[error("report service url '{0}' must not carry a query or fragment")]
    QueryOrFragment(String),
}
