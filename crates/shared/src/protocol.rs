use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{AuthToken, IdentifierField, SessionUuid, UserUuid};

pub const SET_API_KEY_PATH: &str = "/api/front/set-api-key";
pub const HANDLE_CHAT_PATH: &str = "/mcp/handle-chat";
/// Header carrying the bearer token on chat requests. Not `Authorization`.
pub const TOKEN_HEADER: &str = "token";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserIdentifier {
    UserId(String),
    UserName(String),
}

impl UserIdentifier {
    pub fn new(field: IdentifierField, value: impl Into<String>) -> Self {
        match field {
            IdentifierField::UserId => Self::UserId(value.into()),
            IdentifierField::UserName => Self::UserName(value.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SetApiKeyRequest<'a> {
    #[serde(flatten)]
    pub identifier: UserIdentifier,
    pub api_key: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub prompt: String,
    pub model: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_uuid: Option<SessionUuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_uuid: Option<UserUuid>,
}

/// Chat response after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    pub session_uuid: Option<SessionUuid>,
    pub user_uuid: Option<UserUuid>,
}

/// Which response layouts the client accepts from the backend.
///
/// `Strict` is the fixed contract: `{"token": ..}` for key exchange and
/// `{"data": {"response", "session_uuid", "user_uuid"}}` for chat. `Legacy`
/// also accepts every layout older backends produced and goes away once they
/// are retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShapes {
    Strict,
    #[default]
    Legacy,
}

impl ResponseShapes {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "legacy" => Some(Self::Legacy),
            _ => None,
        }
    }
}

const STRICT_TOKEN_PATHS: &[&[&str]] = &[&["token"]];
const LEGACY_TOKEN_PATHS: &[&[&str]] = &[
    &["token"],
    &["data", "token"],
    &["accessToken"],
    &["access_token"],
];

const STRICT_REPLY_PATHS: &[&[&str]] = &[&["data", "response"]];
const LEGACY_REPLY_PATHS: &[&[&str]] = &[&["data", "response"], &["response"], &["message"]];

pub fn normalize_key_exchange(body: &Value, shapes: ResponseShapes) -> Option<AuthToken> {
    let paths = match shapes {
        ResponseShapes::Strict => STRICT_TOKEN_PATHS,
        ResponseShapes::Legacy => LEGACY_TOKEN_PATHS,
    };
    paths
        .iter()
        .find_map(|path| lookup(body, path).and_then(token_text))
        .map(AuthToken::new)
}

/// Extracts the reply text and any conversation identifiers.
///
/// Under `Legacy` this never fails: a body with no known reply field is shown
/// as its raw JSON text. Under `Strict` a missing `data.response` yields `None`.
pub fn normalize_chat_reply(body: &Value, shapes: ResponseShapes) -> Option<ChatReply> {
    let paths = match shapes {
        ResponseShapes::Strict => STRICT_REPLY_PATHS,
        ResponseShapes::Legacy => LEGACY_REPLY_PATHS,
    };
    let text = paths
        .iter()
        .find_map(|path| lookup(body, path).and_then(truthy_text));
    let text = match (text, shapes) {
        (Some(text), _) => text,
        (None, ResponseShapes::Legacy) => body.to_string(),
        (None, ResponseShapes::Strict) => return None,
    };

    Some(ChatReply {
        text,
        session_uuid: lookup(body, &["data", "session_uuid"])
            .and_then(id_text)
            .map(SessionUuid),
        user_uuid: lookup(body, &["data", "user_uuid"])
            .and_then(id_text)
            .map(UserUuid),
    })
}

fn lookup<'a>(body: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(body, |value, key| value.get(*key))
}

fn token_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) if number.as_f64() != Some(0.0) => Some(number.to_string()),
        _ => None,
    }
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

// Falsy values (null, false, 0, "") count as absent so the next candidate is tried.
fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
