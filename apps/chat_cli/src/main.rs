use std::{io::Write, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{ChatSessionController, ControllerEvent, HttpChatBackend, InputField, Pane};
use shared::domain::Sender;
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(name = "chat-cli", about = "Terminal client for the MCP chat backend")]
struct Args {
    /// Path to a TOML settings file (defaults to ./chat_client.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    provider: Option<String>,
    /// Prefill the user identifier on the setup prompt.
    #[arg(long)]
    user: Option<String>,
    #[arg(long, env = "CHAT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum ChatCommand<'a> {
    Send(&'a str),
    NewConversation,
    Reset,
    Quit,
}

fn parse_chat_line(line: &str) -> ChatCommand<'_> {
    match line.trim() {
        "/new" => ChatCommand::NewConversation,
        "/reset" => ChatCommand::Reset,
        "/quit" | "/exit" => ChatCommand::Quit,
        _ => ChatCommand::Send(line),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SetupStep {
    Identifier,
    ApiKey { identifier: String },
}

/// Feeds one setup-pane line into the form and returns the credentials to
/// submit once both are known. A key given on the command line is used for the
/// first identifier entered, then the key is prompted for as usual.
fn advance_setup(
    step: SetupStep,
    line: String,
    preset_key: &mut Option<String>,
) -> (SetupStep, Option<(String, String)>) {
    match step {
        SetupStep::Identifier => match preset_key.take() {
            Some(api_key) => (SetupStep::Identifier, Some((line, api_key))),
            None => (SetupStep::ApiKey { identifier: line }, None),
        },
        SetupStep::ApiKey { identifier } => (SetupStep::Identifier, Some((identifier, line))),
    }
}

fn render_event(event: &ControllerEvent, identifier_label: &str) -> Option<String> {
    match event {
        ControllerEvent::MessageAppended(message) if message.sender == Sender::Bot => {
            Some(format!("bot> {}", message.text))
        }
        ControllerEvent::MessageAppended(_) => None,
        ControllerEvent::LoadingChanged(true) => Some("bot is typing...".to_string()),
        ControllerEvent::LoadingChanged(false) => None,
        ControllerEvent::SetupError(Some(error)) => Some(format!("error: {error}")),
        ControllerEvent::SetupError(None) => None,
        ControllerEvent::PaneChanged(Pane::Chat) => Some(
            "Type a message, /new for a new conversation, /reset to sign out, /quit to exit."
                .to_string(),
        ),
        ControllerEvent::PaneChanged(Pane::Setup) => None,
        ControllerEvent::ConversationStarted => Some("Started a new conversation.".to_string()),
        ControllerEvent::SessionReset { automatic: true } => Some(format!(
            "Session cleared. Enter your {identifier_label} to sign in again."
        )),
        ControllerEvent::SessionReset { automatic: false } => Some("Signed out.".to_string()),
    }
}

async fn render_events(
    mut events: broadcast::Receiver<ControllerEvent>,
    identifier_label: &'static str,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(line) = render_event(&event, identifier_label) {
                    println!("{line}");
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "renderer fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

async fn run_repl(
    controller: Arc<ChatSessionController>,
    user: Option<String>,
    api_key: Option<String>,
) -> Result<()> {
    let label = controller.settings().identifier_field.label();
    let mut preset_key = None;
    let mut step = match (user, api_key) {
        (Some(user), Some(api_key)) => {
            controller.set_input(InputField::Identifier, &user).await;
            if let Err(err) = controller.submit_credentials(&user, &api_key).await {
                debug!(error = %err, "sign-in from command line failed");
            }
            SetupStep::ApiKey { identifier: user }
        }
        (Some(user), None) => {
            controller.set_input(InputField::Identifier, &user).await;
            SetupStep::ApiKey { identifier: user }
        }
        (None, api_key) => {
            preset_key = api_key;
            SetupStep::Identifier
        }
    };

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        let pane = controller.view().await.pane;
        match (pane, &step) {
            (Pane::Chat, _) => prompt("you> "),
            (Pane::Setup, SetupStep::Identifier) => prompt(&format!("{label}: ")),
            (Pane::Setup, SetupStep::ApiKey { .. }) => prompt("API Key: "),
        }

        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };

        // Re-read: an automatic reset may have fired while waiting for input.
        match controller.view().await.pane {
            Pane::Setup => {
                if line.trim() == "/quit" {
                    break;
                }
                let field = match step {
                    SetupStep::Identifier => InputField::Identifier,
                    SetupStep::ApiKey { .. } => InputField::ApiKey,
                };
                controller.set_input(field, &line).await;
                let (next, submit) = advance_setup(step, line, &mut preset_key);
                step = next;
                if let Some((identifier, api_key)) = submit {
                    if let Err(err) = controller.submit_credentials(&identifier, &api_key).await {
                        debug!(error = %err, "sign-in failed");
                    }
                }
            }
            Pane::Chat => {
                step = SetupStep::Identifier;
                match parse_chat_line(&line) {
                    ChatCommand::Quit => break,
                    ChatCommand::NewConversation => controller.start_new_conversation().await,
                    ChatCommand::Reset => controller.reset_session().await,
                    ChatCommand::Send(text) => {
                        controller.set_input(InputField::Message, text).await;
                        if let Err(err) = controller.send_message(text).await {
                            debug!(error = %err, "send failed");
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(v) = args.base_url {
        settings.base_url = v;
    }
    if let Some(v) = args.model {
        settings.model = v;
    }
    if let Some(v) = args.provider {
        settings.provider = v;
    }

    let backend = HttpChatBackend::new(
        &settings.base_url,
        settings.request_timeout(),
        settings.response_shapes,
    )
    .context("failed to configure chat backend")?;
    let controller = ChatSessionController::new(Arc::new(backend), settings.controller_settings());

    let label = controller.settings().identifier_field.label();
    let renderer = tokio::spawn(render_events(controller.subscribe_events(), label));
    println!("Chat backend: {}", settings.base_url);

    let result = run_repl(Arc::clone(&controller), args.user, args.api_key).await;
    renderer.abort();
    result
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
