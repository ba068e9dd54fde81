use async_trait::async_trait;
use shared::{
    domain::{AuthToken, ChatMessage, Credentials, IdentifierField},
    protocol::{ChatReply, ChatRequest},
};

pub mod controller;
pub mod error;
pub mod http;
pub mod session;
pub mod settings;
pub mod view;

pub use controller::ChatSessionController;
pub use error::ClientError;
pub use http::HttpChatBackend;
pub use session::{SessionPhase, SessionState};
pub use settings::ControllerSettings;
pub use view::{ChatView, InputField, Pane};

/// The two backend calls the controller depends on.
///
/// Implementations normalize whatever the server returns before handing it
/// back, so the controller only ever sees `AuthToken` and `ChatReply`.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn exchange_key(
        &self,
        credentials: &Credentials,
        field: IdentifierField,
    ) -> Result<AuthToken, ClientError>;

    async fn handle_chat(
        &self,
        token: &AuthToken,
        request: &ChatRequest,
    ) -> Result<ChatReply, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    PaneChanged(Pane),
    SetupError(Option<String>),
    MessageAppended(ChatMessage),
    LoadingChanged(bool),
    ConversationStarted,
    /// `automatic` is set when the reset came from an expired or missing token.
    SessionReset {
        automatic: bool,
    },
}
