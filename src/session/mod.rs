//! Stateful chat session over a streaming provider.
//!
//! A session is fixed to one model variant and one system instruction for
//! its lifetime; switching variants means building a new session. The
//! session owns the turn history and replays it on every call — the provider
//! itself is stateless.

pub mod attachment;

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::Result;
use crate::providers::{ChatProvider, Content, ModelVariant, Part, StreamEvent};

pub use attachment::Attachment;

/// Capacity of the per-turn forwarding channel.
const TURN_CHANNEL_CAPACITY: usize = 256;

/// A stateful conversation with the remote model.
///
/// Cloning yields another handle to the *same* session — the history is
/// shared. The controller relies on this to let an in-flight turn finish
/// against a session that has already been replaced.
#[derive(Clone)]
pub struct ChatSession {
    provider: Arc<dyn ChatProvider>,
    variant: ModelVariant,
    system_instruction: String,
    history: Arc<Mutex<Vec<Content>>>,
}

impl ChatSession {
    /// Open a session on `provider` with a fixed variant and instruction.
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        variant: ModelVariant,
        system_instruction: &str,
    ) -> Self {
        debug!(
            provider = provider.name(),
            model = variant.model_id(),
            "Opening chat session"
        );
        Self {
            provider,
            variant,
            system_instruction: system_instruction.to_string(),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The variant this session is pinned to.
    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Number of turns (user + model) committed to history.
    pub fn history_len(&self) -> usize {
        self.history.lock().expect("session history lock poisoned").len()
    }

    /// Send one turn and stream the reply.
    ///
    /// The returned channel yields `Delta`s in arrival order followed by a
    /// terminal `Done` or `Error`. The (user, model) turn pair is committed
    /// to history only when the stream completes — a failed turn leaves the
    /// session exactly as it was, so the next submission is unaffected.
    ///
    /// Dropping the receiver abandons the turn: remaining events are
    /// discarded and nothing is committed.
    pub async fn send_streaming(&self, parts: Vec<Part>) -> Result<mpsc::Receiver<StreamEvent>> {
        let user_turn = Content::user(parts);
        let mut contents = {
            let history = self.history.lock().expect("session history lock poisoned");
            history.clone()
        };
        contents.push(user_turn.clone());

        let mut inner = self
            .provider
            .stream_generate(self.variant, &self.system_instruction, contents)
            .await?;

        let (tx, rx) = mpsc::channel(TURN_CHANNEL_CAPACITY);
        let history = Arc::clone(&self.history);
        tokio::spawn(async move {
            let mut accumulated = String::new();
            while let Some(event) = inner.recv().await {
                match event {
                    StreamEvent::Delta(chunk) => {
                        accumulated.push_str(&chunk);
                        if tx.send(StreamEvent::Delta(chunk)).await.is_err() {
                            return;
                        }
                    }
                    StreamEvent::Done => {
                        {
                            let mut history =
                                history.lock().expect("session history lock poisoned");
                            history.push(user_turn);
                            history.push(Content::model(accumulated));
                        }
                        let _ = tx.send(StreamEvent::Done).await;
                        return;
                    }
                    StreamEvent::Error(message) => {
                        let _ = tx.send(StreamEvent::Error(message)).await;
                        return;
                    }
                }
            }
            // Producer dropped without a terminal event — surface as failure
            // rather than leaving the consumer waiting on a silent close.
            let _ = tx
                .send(StreamEvent::Error("stream ended unexpectedly".into()))
                .await;
        });

        Ok(rx)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Scripted provider: replays a fixed event sequence and records every
    /// request's contents.
    struct ScriptedProvider {
        script: Vec<StreamEvent>,
        requests: Mutex<Vec<Vec<Content>>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<StreamEvent>) -> Self {
            Self {
                script,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn stream_generate(
            &self,
            _variant: ModelVariant,
            _system_instruction: &str,
            contents: Vec<Content>,
        ) -> Result<mpsc::Receiver<StreamEvent>> {
            self.requests.lock().unwrap().push(contents);
            let (tx, rx) = mpsc::channel(16);
            let script = self.script.clone();
            tokio::spawn(async move {
                for event in script {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            });
            Ok(rx)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    async fn drain(mut rx: mpsc::Receiver<StreamEvent>) -> (String, Option<StreamEvent>) {
        let mut text = String::new();
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Delta(chunk) => text.push_str(&chunk),
                terminal => return (text, Some(terminal)),
            }
        }
        (text, None)
    }

    #[tokio::test]
    async fn test_deltas_arrive_in_order_and_history_commits() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            StreamEvent::Delta("O prazo ".into()),
            StreamEvent::Delta("é dia 20.".into()),
            StreamEvent::Done,
        ]));
        let session = ChatSession::new(provider, ModelVariant::Flash, "sys");

        let rx = session
            .send_streaming(vec![Part::text("prazo IVA")])
            .await
            .unwrap();
        let (text, terminal) = drain(rx).await;

        assert_eq!(text, "O prazo é dia 20.");
        assert_eq!(terminal, Some(StreamEvent::Done));
        assert_eq!(session.history_len(), 2);
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_history_untouched() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            StreamEvent::Delta("parcial".into()),
            StreamEvent::Error("quota".into()),
        ]));
        let session = ChatSession::new(provider, ModelVariant::Flash, "sys");

        let rx = session.send_streaming(vec![Part::text("q")]).await.unwrap();
        let (_, terminal) = drain(rx).await;

        assert!(matches!(terminal, Some(StreamEvent::Error(_))));
        assert_eq!(session.history_len(), 0);
    }

    #[tokio::test]
    async fn test_second_turn_replays_history() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            StreamEvent::Delta("resposta".into()),
            StreamEvent::Done,
        ]));
        let session = ChatSession::new(Arc::clone(&provider) as Arc<dyn ChatProvider>, ModelVariant::Pro, "sys");

        let rx = session.send_streaming(vec![Part::text("um")]).await.unwrap();
        drain(rx).await;
        let rx = session.send_streaming(vec![Part::text("dois")]).await.unwrap();
        drain(rx).await;

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].len(), 1);
        // Second request: prior user turn + prior model turn + new user turn
        assert_eq!(requests[1].len(), 3);
        assert_eq!(requests[1][1], Content::model("resposta"));
    }

    #[tokio::test]
    async fn test_silent_close_surfaces_as_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![StreamEvent::Delta("x".into())]));
        let session = ChatSession::new(provider, ModelVariant::Flash, "sys");

        let rx = session.send_streaming(vec![Part::text("q")]).await.unwrap();
        let (_, terminal) = drain(rx).await;

        assert!(matches!(terminal, Some(StreamEvent::Error(_))));
        assert_eq!(session.history_len(), 0);
    }
}
