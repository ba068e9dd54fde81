use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Weak,
};

use shared::domain::{ChatMessage, Credentials};
use tokio::{
    sync::{broadcast, Mutex, MutexGuard},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    error::ClientError,
    session::{SessionPhase, SessionState},
    settings::ControllerSettings,
    view::{ChatView, InputField, Pane},
    ChatBackend, ControllerEvent,
};

pub const KEY_ACCEPTED_MESSAGE: &str = "API Key set successfully! You can start chatting now.";

struct ControllerState {
    session: SessionState,
    view: ChatView,
    /// Bumped whenever the session or conversation is replaced. Replies produced
    /// under an older epoch are dropped.
    epoch: u64,
    /// Bumped when a token is installed or the user signs out. A delayed reset
    /// armed under an older generation is stale and does nothing.
    auth_generation: u64,
}

struct PendingReset {
    id: u64,
    task: JoinHandle<()>,
}

/// Drives key exchange and chat turns for one page-equivalent session.
///
/// Sends are serialized: a second `send_message` waits for the first reply to
/// be applied, so replies land in request order.
pub struct ChatSessionController {
    backend: Arc<dyn ChatBackend>,
    settings: ControllerSettings,
    inner: Mutex<ControllerState>,
    send_gate: Mutex<()>,
    pending_reset: Mutex<Option<PendingReset>>,
    reset_ids: AtomicU64,
    events: broadcast::Sender<ControllerEvent>,
}

impl ChatSessionController {
    pub fn new(backend: Arc<dyn ChatBackend>, settings: ControllerSettings) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            backend,
            settings,
            inner: Mutex::new(ControllerState {
                session: SessionState::default(),
                view: ChatView::default(),
                epoch: 0,
                auth_generation: 0,
            }),
            send_gate: Mutex::new(()),
            pending_reset: Mutex::new(None),
            reset_ids: AtomicU64::new(0),
            events,
        })
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn session(&self) -> SessionState {
        self.inner.lock().await.session.clone()
    }

    pub async fn view(&self) -> ChatView {
        self.inner.lock().await.view.clone()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.lock().await.session.phase()
    }

    pub async fn has_pending_reset(&self) -> bool {
        self.pending_reset.lock().await.is_some()
    }

    /// Mirrors what the user typed into one of the form fields.
    pub async fn set_input(&self, field: InputField, value: &str) {
        let mut state = self.inner.lock().await;
        let input = state.view.input_mut(field);
        input.clear();
        input.push_str(value);
    }

    fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }

    fn append(&self, view: &mut ChatView, message: ChatMessage) {
        view.push(message.clone());
        self.emit(ControllerEvent::MessageAppended(message));
    }

    fn set_loading(&self, view: &mut ChatView, loading: bool) {
        if view.loading != loading {
            view.loading = loading;
            self.emit(ControllerEvent::LoadingChanged(loading));
        }
    }

    fn set_setup_error(&self, view: &mut ChatView, error: Option<String>) {
        if view.setup_error != error {
            view.setup_error = error.clone();
            self.emit(ControllerEvent::SetupError(error));
        }
    }

    /// Exchanges the API key for a bearer token and opens the chat pane.
    ///
    /// Empty fields are rejected locally without touching the network. On
    /// failure the controller stays on the setup pane with `setup_error` set.
    pub async fn submit_credentials(
        &self,
        identifier: &str,
        api_key: &str,
    ) -> Result<(), ClientError> {
        let credentials = Credentials::new(identifier, api_key);
        let generation = {
            let mut state = self.inner.lock().await;
            if !credentials.is_complete() {
                let message = format!(
                    "Please enter both {} and API Key",
                    self.settings.identifier_field.label()
                );
                self.set_setup_error(&mut state.view, Some(message.clone()));
                return Err(ClientError::Validation(message));
            }
            self.set_setup_error(&mut state.view, None);
            state.auth_generation
        };
        self.cancel_pending_reset().await;

        let result = self
            .backend
            .exchange_key(&credentials, self.settings.identifier_field)
            .await;
        drop(credentials);

        let mut state = self.inner.lock().await;
        state.view.api_key_input.clear();
        if state.auth_generation != generation {
            debug!("discarding key exchange result after sign-out");
            return Err(ClientError::Superseded);
        }

        match result {
            Ok(token) => {
                // A send made while the exchange was in flight may have armed a
                // reset against the token-less state.
                self.cancel_pending_reset().await;
                state.session.authenticate(token);
                state.epoch += 1;
                state.auth_generation += 1;
                state.view.pane = Pane::Chat;
                self.emit(ControllerEvent::PaneChanged(Pane::Chat));
                self.append(&mut state.view, ChatMessage::bot(KEY_ACCEPTED_MESSAGE));
                info!(field = ?self.settings.identifier_field, "api key accepted");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "api key setup failed");
                self.set_setup_error(
                    &mut state.view,
                    Some(format!("Failed to set API key: {err}")),
                );
                Err(err)
            }
        }
    }

    /// Drops every piece of session state and returns to an empty setup pane.
    pub async fn reset_session(&self) {
        self.cancel_pending_reset().await;
        let mut state = self.inner.lock().await;
        state.auth_generation += 1;
        self.reset_locked(&mut state, false);
    }

    fn reset_locked(&self, state: &mut ControllerState, automatic: bool) {
        self.set_loading(&mut state.view, false);
        state.session.clear();
        state.view.reset();
        state.epoch += 1;
        self.emit(ControllerEvent::SessionReset { automatic });
        info!(automatic, "session reset");
    }

    /// Forgets the conversation identifiers and transcript but keeps the token.
    pub async fn start_new_conversation(&self) {
        let mut state = self.inner.lock().await;
        state.session.clear_conversation();
        self.set_loading(&mut state.view, false);
        state.view.clear_messages();
        state.epoch += 1;
        self.emit(ControllerEvent::ConversationStarted);
        debug!("new conversation started");
    }

    /// Sends one chat turn.
    ///
    /// Returns `Ok(None)` for blank input and for replies that arrive after the
    /// session was replaced. Auth failures schedule a delayed reset.
    pub async fn send_message(
        self: &Arc<Self>,
        text: &str,
    ) -> Result<Option<ChatMessage>, ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        // Rejected up front so a token-less send never queues behind a turn
        // that is still waiting on the server.
        {
            let state = self.inner.lock().await;
            if state.session.phase() == SessionPhase::Unauthenticated {
                return Err(self
                    .reject_send(state, ClientError::NotAuthenticated)
                    .await);
            }
        }

        let _gate = self.send_gate.lock().await;
        let (epoch, token, request) = {
            let mut state = self.inner.lock().await;
            let prepared = state.session.chat_request(
                text,
                &self.settings.model,
                &self.settings.provider,
            );
            match prepared {
                Ok((token, request)) => {
                    state.view.message_input.clear();
                    self.append(&mut state.view, ChatMessage::user(text));
                    if self.settings.show_loading_indicator {
                        self.set_loading(&mut state.view, true);
                    }
                    (state.epoch, token, request)
                }
                Err(err) => return Err(self.reject_send(state, err).await),
            }
        };

        let result = self.backend.handle_chat(&token, &request).await;

        let mut state = self.inner.lock().await;
        if state.epoch != epoch {
            debug!("discarding chat reply from a replaced session");
            return Ok(None);
        }
        self.set_loading(&mut state.view, false);

        match result {
            Ok(reply) => {
                state.session.record_identifiers(&reply);
                let message = ChatMessage::bot(reply.text);
                self.append(&mut state.view, message.clone());
                Ok(Some(message))
            }
            Err(err) => {
                self.append(&mut state.view, ChatMessage::bot(format!("Error: {err}")));
                if err.requires_reauth() {
                    warn!(error = %err, "chat rejected; scheduling reset");
                    let generation = state.auth_generation;
                    drop(state);
                    self.schedule_reset(generation).await;
                }
                Err(err)
            }
        }
    }

    async fn reject_send(
        self: &Arc<Self>,
        mut state: MutexGuard<'_, ControllerState>,
        err: ClientError,
    ) -> ClientError {
        self.append(&mut state.view, ChatMessage::bot(format!("Error: {err}")));
        let generation = state.auth_generation;
        drop(state);
        self.schedule_reset(generation).await;
        err
    }

    /// Arms a full reset after `reset_delay`, replacing any reset already armed.
    ///
    /// The reset only fires if no token was installed and nobody signed out
    /// since `generation` was read.
    async fn schedule_reset(self: &Arc<Self>, generation: u64) {
        let id = self.reset_ids.fetch_add(1, Ordering::Relaxed);
        let delay = self.settings.reset_delay;
        let controller: Weak<Self> = Arc::downgrade(self);

        // The slot stays locked until the new entry is stored so the task
        // cannot observe the previous id.
        let mut slot = self.pending_reset.lock().await;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(controller) = controller.upgrade() else {
                return;
            };
            {
                let mut slot = controller.pending_reset.lock().await;
                if slot.as_ref().map(|pending| pending.id) != Some(id) {
                    return;
                }
                slot.take();
            }
            let mut state = controller.inner.lock().await;
            if state.auth_generation != generation {
                debug!("skipping delayed reset armed before re-authentication");
                return;
            }
            controller.reset_locked(&mut state, true);
        });

        if let Some(previous) = slot.replace(PendingReset { id, task }) {
            previous.task.abort();
            debug!("pending reset superseded");
        }
    }

    async fn cancel_pending_reset(&self) {
        if let Some(pending) = self.pending_reset.lock().await.take() {
            pending.task.abort();
            debug!("pending reset cancelled");
        }
    }
}

impl Drop for ChatSessionController {
    fn drop(&mut self) {
        if let Some(pending) = self.pending_reset.get_mut().take() {
            pending.task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
