use thiserror::Error;

/// Failure of a single controller action.
///
/// None of these are fatal to the controller; the user may retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Transport(String),
    #[error("{}", server_message(.status, .message))]
    Server { status: u16, message: Option<String> },
    #[error("Session expired. Please set your API key again.")]
    SessionExpired,
    #[error("No token received from server")]
    NoTokenReceived,
    #[error("API key not set. Please set your API key.")]
    NotAuthenticated,
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("request superseded by a newer action")]
    Superseded,
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    /// Whether this failure should drop the session and return to setup.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::NotAuthenticated)
    }
}

fn server_message(status: &u16, message: &Option<String>) -> String {
    match message.as_deref().filter(|m| !m.trim().is_empty()) {
        Some(message) => message.to_string(),
        None => format!("HTTP error! status: {status}"),
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::MalformedResponse(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}
