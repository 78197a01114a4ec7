//! Conversation controller: cache-or-remote decision, streaming updates,
//! and the displayed message list.
//!
//! The controller is presentation-agnostic. It owns the message list and the
//! session, forwards streaming increments to an injected [`ResponseSink`],
//! and reports every submission as a tagged [`TurnOutcome`] — rendering
//! decisions stay in the CLI layer.
//!
//! Per-turn state machine: idle → awaiting-response → (cache-hit-resolved |
//! streaming | error), back to idle. At most one turn is in flight; anything
//! submitted meanwhile is ignored.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::mcp::{McpEntry, McpStore};
use crate::persona;
use crate::providers::{ChatProvider, ModelVariant, Part, StreamEvent};
use crate::session::{Attachment, ChatSession};

// ── Messages ─────────────────────────────────────────────────────────────────

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// Where a model-authored answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The local knowledge cache.
    Mcp,
    /// The remote model.
    Gemini,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mcp => f.write_str("MCP"),
            Self::Gemini => f.write_str("Gemini API"),
        }
    }
}

/// One entry in the displayed conversation.
///
/// Streaming mutates `text` in place; nothing else changes after creation.
/// The list is cleared only by a model switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub file_name: Option<String>,
    pub is_error: bool,
    pub source: Option<Source>,
}

impl Message {
    fn user(text: impl Into<String>, file_name: Option<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            file_name,
            is_error: false,
            source: None,
        }
    }

    fn model(text: impl Into<String>, source: Source) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
            file_name: None,
            is_error: false,
            source: Some(source),
        }
    }
}

// ── Sink and outcome ─────────────────────────────────────────────────────────

/// Receiver for streaming increments, injected by the presentation layer.
pub trait ResponseSink: Send + Sync {
    /// Called once per increment, in arrival order.
    fn on_delta(&self, chunk: &str);
}

/// Sink that discards increments (tests, non-interactive callers).
pub struct NoopSink;

impl ResponseSink for NoopSink {
    fn on_delta(&self, _chunk: &str) {}
}

/// What a submission turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Empty input, or another turn was already in flight. Nothing changed.
    Ignored,
    /// Answered from the cache; no remote call was made.
    CacheHit,
    /// Streamed a remote answer to completion.
    Answered,
    /// The remote call failed; the error is displayed in the conversation.
    Failed,
}

// ── Controller ───────────────────────────────────────────────────────────────

/// Releases the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The conversation controller.
///
/// Interior mutability throughout (`&self` API, as with the session): the
/// message list sits behind a mutex that is never held across an await, and
/// the single-in-flight invariant is an atomic flag so concurrent callers
/// race on one `swap`.
pub struct Controller {
    provider: Arc<dyn ChatProvider>,
    mcp: McpStore,
    auto_learn: bool,
    session: Mutex<ChatSession>,
    messages: Mutex<Vec<Message>>,
    in_flight: AtomicBool,
}

impl Controller {
    /// Build a controller and open the initial session.
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        variant: ModelVariant,
        mcp: McpStore,
        auto_learn: bool,
    ) -> Self {
        let session = ChatSession::new(
            Arc::clone(&provider),
            variant,
            persona::SYSTEM_INSTRUCTION,
        );
        Self {
            provider,
            mcp,
            auto_learn,
            session: Mutex::new(session),
            messages: Mutex::new(vec![Message::model(persona::GREETING, Source::Gemini)]),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Snapshot of the displayed conversation.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().expect("message list lock poisoned").clone()
    }

    /// Variant of the current session.
    pub fn variant(&self) -> ModelVariant {
        self.session
            .lock()
            .expect("session lock poisoned")
            .variant()
    }

    /// Switch the model variant.
    ///
    /// Tears down the session, opens a fresh one, and resets the displayed
    /// conversation to a single session-start greeting — no prior turns are
    /// carried into the new session's context. An in-flight turn is not
    /// aborted; its results are simply no longer displayed.
    pub fn switch_model(&self, variant: ModelVariant) {
        debug!(model = variant.model_id(), "Switching model variant");
        let fresh = ChatSession::new(
            Arc::clone(&self.provider),
            variant,
            persona::SYSTEM_INSTRUCTION,
        );
        *self.session.lock().expect("session lock poisoned") = fresh;

        let mut messages = self.messages.lock().expect("message list lock poisoned");
        messages.clear();
        messages.push(Message::model(
            persona::session_started(variant),
            Source::Gemini,
        ));
    }

    /// Submit one user turn.
    ///
    /// See the module docs for the transition rules. Increments go to
    /// `sink` in arrival order; the placeholder message grows
    /// monotonically with the accumulated text.
    pub async fn submit(
        &self,
        text: &str,
        attachment: Option<Attachment>,
        sink: &dyn ResponseSink,
    ) -> TurnOutcome {
        if text.trim().is_empty() && attachment.is_none() {
            return TurnOutcome::Ignored;
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("Submission ignored: a turn is already in flight");
            return TurnOutcome::Ignored;
        }
        let _guard = InFlightGuard(&self.in_flight);

        self.push(Message::user(
            text,
            attachment.as_ref().map(|a| a.file_name.clone()),
        ));

        // The cache has no attachment dimension, so any attachment bypasses
        // it unconditionally.
        if attachment.is_none() {
            if let Some(answer) = self.mcp.find(text) {
                debug!("MCP cache hit");
                self.push(Message::model(answer, Source::Mcp));
                return TurnOutcome::CacheHit;
            }
        }

        let placeholder = self.push(Message::model("", Source::Gemini));

        let mut parts = vec![Part::text(text)];
        if let Some(attachment) = &attachment {
            parts.push(attachment.to_part());
        }

        // Clone the session handle out of the lock; a concurrent model
        // switch replaces the slot but this turn keeps streaming into the
        // old session, whose output is no longer displayed.
        let session = self.session.lock().expect("session lock poisoned").clone();

        let mut rx = match session.send_streaming(parts).await {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Failed to open stream: {}", e);
                self.fail_placeholder(placeholder);
                return TurnOutcome::Failed;
            }
        };

        let mut full = String::new();
        loop {
            match rx.recv().await {
                Some(StreamEvent::Delta(chunk)) => {
                    full.push_str(&chunk);
                    self.set_placeholder_text(placeholder, &full);
                    sink.on_delta(&chunk);
                }
                Some(StreamEvent::Done) => break,
                Some(StreamEvent::Error(message)) => {
                    warn!("Stream failed: {}", message);
                    self.fail_placeholder(placeholder);
                    return TurnOutcome::Failed;
                }
                None => {
                    warn!("Stream closed without a terminal event");
                    self.fail_placeholder(placeholder);
                    return TurnOutcome::Failed;
                }
            }
        }

        // Remote answers to plain questions feed the cache; answers that
        // depended on an attachment would be wrong under a text-only key.
        if attachment.is_none() && self.auto_learn {
            self.mcp.append(McpEntry::new(text, full));
        }

        TurnOutcome::Answered
    }

    /// Append a message, returning its index.
    fn push(&self, message: Message) -> usize {
        let mut messages = self.messages.lock().expect("message list lock poisoned");
        messages.push(message);
        messages.len() - 1
    }

    /// Overwrite the placeholder's text with the accumulated total.
    ///
    /// A model switch may have cleared the list; a stale index then falls
    /// outside it and the update is dropped, which is exactly the
    /// "discard interest" semantics a torn-down turn gets.
    fn set_placeholder_text(&self, index: usize, text: &str) {
        let mut messages = self.messages.lock().expect("message list lock poisoned");
        if let Some(message) = messages.get_mut(index) {
            message.text = text.to_string();
        }
    }

    /// Turn the placeholder into the localized error state.
    fn fail_placeholder(&self, index: usize) {
        let mut messages = self.messages.lock().expect("message list lock poisoned");
        if let Some(message) = messages.get_mut(index) {
            message.text = persona::SEND_ERROR.to_string();
            message.is_error = true;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
