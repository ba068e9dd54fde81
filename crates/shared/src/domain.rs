use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

macro_rules! uuid_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

uuid_newtype!(SessionUuid);
uuid_newtype!(UserUuid);

/// Opaque bearer credential issued by the key exchange endpoint.
///
/// The value is wiped from memory on drop and never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(Zeroizing<String>);

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Which request field carries the user identifier on key exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierField {
    #[default]
    UserId,
    UserName,
}

impl IdentifierField {
    pub fn label(self) -> &'static str {
        match self {
            Self::UserId => "User ID",
            Self::UserName => "User Name",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user_id" | "id" => Some(Self::UserId),
            "user_name" | "name" => Some(Self::UserName),
            _ => None,
        }
    }
}

/// Identifier and API key as typed into the setup form.
///
/// Both values are trimmed on construction. The key is zeroized on drop.
pub struct Credentials {
    pub identifier: String,
    api_key: Zeroizing<String>,
}

impl Credentials {
    pub fn new(identifier: &str, api_key: &str) -> Self {
        Self {
            identifier: identifier.trim().to_string(),
            api_key: Zeroizing::new(api_key.trim().to_string()),
        }
    }

    pub fn api_key(&self) -> &str {
        self.api_key.as_str()
    }

    pub fn is_complete(&self) -> bool {
        !self.identifier.is_empty() && !self.api_key.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text)
    }

    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }
}
