use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use shared::{
    domain::{AuthToken, Credentials, IdentifierField},
    error::ServerErrorBody,
    protocol::{
        normalize_chat_reply, normalize_key_exchange, ChatReply, ChatRequest, ResponseShapes,
        SetApiKeyRequest, UserIdentifier, HANDLE_CHAT_PATH, SET_API_KEY_PATH, TOKEN_HEADER,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{error::ClientError, ChatBackend};

/// `ChatBackend` speaking JSON over HTTP to a single base origin.
pub struct HttpChatBackend {
    http: Client,
    set_api_key_url: Url,
    chat_url: Url,
    shapes: ResponseShapes,
}

impl HttpChatBackend {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        shapes: ResponseShapes,
    ) -> Result<Self, ClientError> {
        let base = Url::parse(base_url)
            .map_err(|err| ClientError::InvalidBaseUrl(format!("{base_url}: {err}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl(format!(
                "{base_url}: scheme must be http or https"
            )));
        }
        let join = |path: &str| {
            base.join(path)
                .map_err(|err| ClientError::InvalidBaseUrl(format!("{base_url}: {err}")))
        };

        Ok(Self {
            http: Client::builder().timeout(request_timeout).build()?,
            set_api_key_url: join(SET_API_KEY_PATH)?,
            chat_url: join(HANDLE_CHAT_PATH)?,
            shapes,
        })
    }

    pub fn chat_url(&self) -> &Url {
        &self.chat_url
    }

    pub fn set_api_key_url(&self) -> &Url {
        &self.set_api_key_url
    }
}

async fn server_error(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let raw = response.bytes().await.unwrap_or_default();
    let body = ServerErrorBody::from_bytes(&raw);
    ClientError::Server {
        status,
        message: body.message().map(str::to_string),
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn exchange_key(
        &self,
        credentials: &Credentials,
        field: IdentifierField,
    ) -> Result<AuthToken, ClientError> {
        let response = self
            .http
            .post(self.set_api_key_url.clone())
            .json(&SetApiKeyRequest {
                identifier: UserIdentifier::new(field, credentials.identifier.as_str()),
                api_key: credentials.api_key(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let err = server_error(response).await;
            warn!(error = %err, "set-api-key rejected");
            return Err(err);
        }

        let body: Value = response.json().await?;
        normalize_key_exchange(&body, self.shapes).ok_or_else(|| {
            let fields = body
                .as_object()
                .map(|map| map.keys().cloned().collect::<Vec<_>>().join(","))
                .unwrap_or_default();
            warn!(%fields, "set-api-key response carried no token");
            ClientError::NoTokenReceived
        })
    }

    async fn handle_chat(
        &self,
        token: &AuthToken,
        request: &ChatRequest,
    ) -> Result<ChatReply, ClientError> {
        let response = self
            .http
            .post(self.chat_url.clone())
            .header(TOKEN_HEADER, token.expose())
            .json(request)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::SessionExpired);
        }
        if !response.status().is_success() {
            let err = server_error(response).await;
            warn!(error = %err, "handle-chat failed");
            return Err(err);
        }

        let body: Value = response.json().await?;
        debug!(
            has_session = body.pointer("/data/session_uuid").is_some(),
            "handle-chat reply received"
        );
        normalize_chat_reply(&body, self.shapes)
            .ok_or_else(|| ClientError::MalformedResponse("missing data.response".to_string()))
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
