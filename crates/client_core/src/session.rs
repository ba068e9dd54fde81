use shared::{
    domain::{AuthToken, SessionUuid, UserUuid},
    protocol::{ChatReply, ChatRequest},
};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    /// Token held, no conversation identifiers assigned yet.
    Authenticated,
    InSession,
}

/// Client-side authentication and conversation state for one controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub auth_token: Option<AuthToken>,
    pub session_uuid: Option<SessionUuid>,
    pub user_uuid: Option<UserUuid>,
}

impl SessionState {
    /// Installs a freshly exchanged token. Any prior conversation is invalid
    /// under the new key, so both identifiers are dropped.
    pub fn authenticate(&mut self, token: AuthToken) {
        self.auth_token = Some(token);
        self.session_uuid = None;
        self.user_uuid = None;
    }

    /// Keeps the first identifiers the server assigns; later values are ignored
    /// until the conversation is cleared.
    pub fn record_identifiers(&mut self, reply: &ChatReply) {
        if self.session_uuid.is_none() {
            self.session_uuid = reply.session_uuid.clone();
        }
        if self.user_uuid.is_none() {
            self.user_uuid = reply.user_uuid.clone();
        }
    }

    pub fn clear(&mut self) {
        self.auth_token = None;
        self.clear_conversation();
    }

    pub fn clear_conversation(&mut self) {
        self.session_uuid = None;
        self.user_uuid = None;
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.auth_token, &self.session_uuid, &self.user_uuid) {
            (None, _, _) => SessionPhase::Unauthenticated,
            (Some(_), None, None) => SessionPhase::Authenticated,
            (Some(_), _, _) => SessionPhase::InSession,
        }
    }

    /// Builds the chat body together with the token it must be sent under.
    pub fn chat_request(
        &self,
        prompt: &str,
        model: &str,
        provider: &str,
    ) -> Result<(AuthToken, ChatRequest), ClientError> {
        let token = self
            .auth_token
            .clone()
            .ok_or(ClientError::NotAuthenticated)?;
        Ok((
            token,
            ChatRequest {
                prompt: prompt.to_string(),
                model: model.to_string(),
                provider: provider.to_string(),
                session_uuid: self.session_uuid.clone(),
                user_uuid: self.user_uuid.clone(),
            },
        ))
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
