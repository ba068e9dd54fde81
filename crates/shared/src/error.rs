use serde::{Deserialize, Serialize};

/// Body returned by the backend alongside a non-2xx status.
///
/// Every field is optional; a body that fails to parse is treated as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

impl ServerErrorBody {
    pub fn from_bytes(raw: &[u8]) -> Self {
        serde_json::from_slice(raw).unwrap_or_default()
    }

    /// The server's message as sent, unless it is blank.
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .filter(|message| !message.trim().is_empty())
    }
}
