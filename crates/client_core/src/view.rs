//! Render-agnostic model of the two-pane chat page.

use shared::domain::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pane {
    #[default]
    Setup,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Identifier,
    ApiKey,
    Message,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatView {
    pub pane: Pane,
    pub setup_error: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub loading: bool,
    pub identifier_input: String,
    /// Holds the typed key only until the next exchange attempt.
    pub api_key_input: String,
    pub message_input: String,
}

impl ChatView {
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn input(&self, field: InputField) -> &str {
        match field {
            InputField::Identifier => &self.identifier_input,
            InputField::ApiKey => &self.api_key_input,
            InputField::Message => &self.message_input,
        }
    }

    pub fn input_mut(&mut self, field: InputField) -> &mut String {
        match field {
            InputField::Identifier => &mut self.identifier_input,
            InputField::ApiKey => &mut self.api_key_input,
            InputField::Message => &mut self.message_input,
        }
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.loading = false;
    }

    /// Back to an empty setup form.
    pub fn reset(&mut self) {
        self.pane = Pane::Setup;
        self.setup_error = None;
        self.clear_messages();
        self.identifier_input.clear();
        self.api_key_input.clear();
        self.message_input.clear();
    }
}
