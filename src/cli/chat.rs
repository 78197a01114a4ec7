//! Interactive chat command handler.
//!
//! A rustyline loop around the conversation controller. Plain input is a
//! question for the assistant; `/`-prefixed input is a local command. One
//! file can be staged with `/attach` and rides along with the next question.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use cbot::config::Config;
use cbot::controller::{Controller, ResponseSink, TurnOutcome};
use cbot::credentials::{resolve_api_key, CredentialStore};
use cbot::mcp::McpStore;
use cbot::persona;
use cbot::providers::{GeminiProvider, ModelVariant};
use cbot::session::Attachment;

/// Sink that streams increments straight to the terminal.
struct StdoutSink;

impl ResponseSink for StdoutSink {
    fn on_delta(&self, chunk: &str) {
        print!("{}", chunk);
        let _ = std::io::stdout().flush();
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Run the interactive chat.
pub(crate) async fn cmd_chat(model: Option<String>) -> Result<()> {
    let config = Config::load().with_context(|| "Failed to load configuration")?;
    let variant = match model {
        Some(raw) => raw.parse::<ModelVariant>()?,
        None => config.model,
    };

    let credentials = CredentialStore::open_default();
    let api_key = match resolve_api_key(&config, &credentials) {
        Some(key) => key,
        None => prompt_for_key(&credentials)?,
    };

    let provider = match GeminiProvider::new(&api_key) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            eprintln!("{}", persona::SESSION_INIT_ERROR);
            return Err(e.into());
        }
    };

    let controller = Controller::new(
        provider,
        variant,
        McpStore::open_default(),
        config.mcp.auto_learn,
    );

    println!(
        "cbot {} — model {} — /help for commands",
        env!("CARGO_PKG_VERSION"),
        controller.variant()
    );
    print_last_model_message(&controller);

    let mut editor = DefaultEditor::new().with_context(|| "Failed to initialize line editor")?;
    let mut pending: Option<Attachment> = None;

    loop {
        let prompt = if pending.is_some() {
            "você (+anexo)> "
        } else {
            "você> "
        };
        match editor.readline(prompt) {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                if let Some(command) = line.strip_prefix('/') {
                    match handle_command(command, &controller, &mut pending).await {
                        Flow::Quit => break,
                        Flow::Continue => continue,
                    }
                }
                send(&controller, &line, pending.take()).await;
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    println!("Até à próxima!");
    Ok(())
}

/// First run: ask for the key (hidden echo) and persist it.
fn prompt_for_key(store: &CredentialStore) -> Result<String> {
    println!("No API key configured. Paste a Google AI Studio key to continue.");
    let key = rpassword::prompt_password("Gemini API key: ")
        .with_context(|| "Failed to read key from terminal")?;
    let key = key.trim().to_string();
    if key.is_empty() {
        anyhow::bail!("The key cannot be empty");
    }
    store
        .save(&key)
        .with_context(|| "Failed to write credential file")?;
    println!("API key saved; it will be reused on the next start.");
    Ok(key)
}

/// Submit one question and render the outcome.
async fn send(controller: &Controller, text: &str, attachment: Option<Attachment>) {
    print!("assistente> ");
    let _ = std::io::stdout().flush();

    match controller.submit(text, attachment, &StdoutSink).await {
        TurnOutcome::Answered | TurnOutcome::Ignored => println!(),
        TurnOutcome::CacheHit => {
            if let Some(message) = controller.messages().last() {
                println!("[MCP] {}", message.text);
            }
        }
        TurnOutcome::Failed => {
            println!();
            if let Some(message) = controller.messages().last() {
                eprintln!("{}", message.text);
            }
        }
    }
}

/// Handle a `/command` line.
async fn handle_command(
    command: &str,
    controller: &Controller,
    pending: &mut Option<Attachment>,
) -> Flow {
    let mut words = command.split_whitespace();
    match words.next().unwrap_or_default() {
        "quit" | "exit" | "sair" => return Flow::Quit,
        "help" => {
            println!("/model flash|pro   switch the model variant (resets the conversation)");
            println!("/attach <path>     stage a file to send with the next question");
            println!("/mcp               show the cached questions");
            println!("/quit              leave (also /sair, Ctrl-D)");
        }
        "model" => match words.next().map(str::parse::<ModelVariant>) {
            Some(Ok(variant)) => {
                controller.switch_model(variant);
                print_last_model_message(controller);
            }
            Some(Err(e)) => eprintln!("{}", e),
            None => println!("Current model: {} (use /model flash|pro)", controller.variant()),
        },
        "attach" => {
            let path = words.collect::<Vec<_>>().join(" ");
            if path.is_empty() {
                eprintln!("Usage: /attach <path>");
                return Flow::Continue;
            }
            match Attachment::read(Path::new(&path)).await {
                Ok(attachment) => {
                    println!(
                        "Staged {} ({}) for the next question.",
                        attachment.file_name, attachment.mime_type
                    );
                    *pending = Some(attachment);
                }
                Err(e) => eprintln!("{}", e),
            }
        }
        "mcp" => {
            let entries = McpStore::open_default().load();
            if entries.is_empty() {
                println!("The MCP cache is empty. Add entries with `cbot mcp add`.");
            } else {
                println!("{} cached questions:", entries.len());
                for entry in &entries {
                    println!("- {}", entry.question);
                }
            }
        }
        other => eprintln!("Unknown command '/{}' (try /help)", other),
    }
    Flow::Continue
}

/// Print the newest model-authored message (greeting, session start).
fn print_last_model_message(controller: &Controller) {
    if let Some(message) = controller.messages().last() {
        println!("assistente> {}", message.text);
    }
}
