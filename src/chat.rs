//! Chat send cycle: user message, placeholder, request, reconcile.
//!
//! Each send moves through `Idle -> Sent -> AwaitingReply -> Resolved | Failed`
//! and back to idle. Sends are independent: any number may be awaiting a reply
//! at once, each keyed by the id of its own placeholder.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::api::{ChatApi, ChatRequest};
use crate::error::ApiError;
use crate::transcript::{Author, MessageId, Transcript};
use crate::tui::AppEvent;

pub const NO_REPLY_TEXT: &str = "no reply received";
pub const NETWORK_ERROR_TEXT: &str = "❌ Network error, please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Idle,
    Sent,
    AwaitingReply,
    Resolved,
    Failed,
}

/// Completion of one chat request, delivered back to the main loop.
#[derive(Debug)]
pub struct ChatReply {
    pub placeholder: MessageId,
    pub outcome: Result<String, ApiError>,
}

pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    events: UnboundedSender<AppEvent>,
    in_flight: HashMap<MessageId, SendPhase>,
}

impl ChatSession {
    pub fn new(api: Arc<dyn ChatApi>, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            api,
            events,
            in_flight: HashMap::new(),
        }
    }

    /// Starts a send. Returns the placeholder id, or `None` for blank input.
    pub fn send(&mut self, transcript: &mut Transcript, text: &str) -> Option<MessageId> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        transcript.append(text, Author::User);
        debug!(phase = ?SendPhase::Sent, chars = text.chars().count(), "chat send");

        let placeholder = transcript.append_placeholder();
        self.in_flight.insert(placeholder, SendPhase::AwaitingReply);

        let request = ChatRequest::new(text, Utc::now());
        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            // The inner task isolates panics so the placeholder is always settled.
            let outcome = match tokio::spawn(async move { api.chat(&request).await }).await {
                Ok(outcome) => outcome,
                Err(err) => Err(ApiError::transport(format!("chat task failed: {err}"))),
            };
            debug!(
                ok = outcome.is_ok(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "chat request settled"
            );
            let _ = events.send(AppEvent::Chat(ChatReply {
                placeholder,
                outcome,
            }));
        });

        Some(placeholder)
    }

    /// Applies a completed request: retracts its placeholder, then appends the
    /// reply or an error message.
    pub fn resolve(&mut self, transcript: &mut Transcript, reply: ChatReply) -> SendPhase {
        self.in_flight.remove(&reply.placeholder);
        transcript.remove(reply.placeholder);

        match reply.outcome {
            Ok(body) => {
                transcript.append(body, Author::Assistant);
                info!("chat reply received");
                SendPhase::Resolved
            }
            Err(err) => {
                warn!(%err, "chat request failed");
                transcript.append(failure_text(&err), Author::Assistant);
                SendPhase::Failed
            }
        }
    }

    pub fn phase(&self, placeholder: MessageId) -> SendPhase {
        self.in_flight
            .get(&placeholder)
            .copied()
            .unwrap_or(SendPhase::Idle)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

/// Inline assistant text for a failed send.
pub fn failure_text(err: &ApiError) -> String {
    match err {
        ApiError::Transport(_) => NETWORK_ERROR_TEXT.to_string(),
        ApiError::Rejected { .. } => {
            format!("❌ Error: {}", err.reason().unwrap_or(NO_REPLY_TEXT))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{next_event, ScriptedApi};
    use tokio::sync::mpsc;

    fn session(api: Arc<ScriptedApi>) -> (ChatSession, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChatSession::new(api, tx), rx)
    }

    async fn settle(
        session: &mut ChatSession,
        transcript: &mut Transcript,
        rx: &mut mpsc::UnboundedReceiver<AppEvent>,
    ) -> SendPhase {
        match next_event(rx).await {
            AppEvent::Chat(reply) => session.resolve(transcript, reply),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    fn bodies(transcript: &Transcript) -> Vec<(Author, String)> {
        transcript
            .iter()
            .map(|m| (m.author, m.body.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let api = Arc::new(ScriptedApi::new());
        let (mut session, _rx) = session(api.clone());
        let mut transcript = Transcript::new();

        assert_eq!(session.send(&mut transcript, ""), None);
        assert_eq!(session.send(&mut transcript, "   \n\t"), None);

        assert!(transcript.is_empty());
        assert_eq!(api.chat_calls(), 0);
    }

    #[tokio::test]
    async fn test_successful_reply_replaces_placeholder() {
        let api = Arc::new(ScriptedApi::new());
        api.push_chat(Ok("Hi there".into()));
        let (mut session, mut rx) = session(api.clone());
        let mut transcript = Transcript::new();

        let placeholder = session.send(&mut transcript, "Hello").unwrap();
        assert_eq!(session.phase(placeholder), SendPhase::AwaitingReply);
        assert_eq!(transcript.pending_count(), 1);

        let phase = settle(&mut session, &mut transcript, &mut rx).await;

        assert_eq!(phase, SendPhase::Resolved);
        assert_eq!(session.phase(placeholder), SendPhase::Idle);
        assert_eq!(
            bodies(&transcript),
            vec![
                (Author::User, "Hello".to_string()),
                (Author::Assistant, "Hi there".to_string()),
            ]
        );
        assert_eq!(transcript.pending_count(), 0);
        assert_eq!(api.chat_messages(), vec!["Hello".to_string()]);
    }

    #[tokio::test]
    async fn test_input_is_trimmed_before_send() {
        let api = Arc::new(ScriptedApi::new());
        api.push_chat(Ok("ok".into()));
        let (mut session, mut rx) = session(api.clone());
        let mut transcript = Transcript::new();

        session.send(&mut transcript, "  Hello  ");
        settle(&mut session, &mut transcript, &mut rx).await;

        assert_eq!(transcript.iter().next().unwrap().body, "Hello");
        assert_eq!(api.chat_messages(), vec!["Hello".to_string()]);
    }

    #[tokio::test]
    async fn test_transport_failure_appends_network_error() {
        let api = Arc::new(ScriptedApi::new());
        api.push_chat(Err(ApiError::transport("connection reset")));
        let (mut session, mut rx) = session(api);
        let mut transcript = Transcript::new();

        session.send(&mut transcript, "Hello");
        let phase = settle(&mut session, &mut transcript, &mut rx).await;

        assert_eq!(phase, SendPhase::Failed);
        assert_eq!(
            bodies(&transcript),
            vec![
                (Author::User, "Hello".to_string()),
                (Author::Assistant, NETWORK_ERROR_TEXT.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_rejection_uses_server_reason_or_fallback() {
        let api = Arc::new(ScriptedApi::new());
        api.push_chat(Err(ApiError::rejected(Some("quota exceeded".into()))));
        api.push_chat(Err(ApiError::rejected(None)));
        let (mut session, mut rx) = session(api);
        let mut transcript = Transcript::new();

        session.send(&mut transcript, "first");
        settle(&mut session, &mut transcript, &mut rx).await;
        session.send(&mut transcript, "second");
        settle(&mut session, &mut transcript, &mut rx).await;

        let replies: Vec<String> = transcript
            .iter()
            .filter(|m| m.author == Author::Assistant)
            .map(|m| m.body.clone())
            .collect();
        assert_eq!(
            replies,
            vec![
                "❌ Error: quota exceeded".to_string(),
                "❌ Error: no reply received".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_panicking_request_still_retracts_placeholder() {
        let api = Arc::new(ScriptedApi::new());
        // Empty chat script makes the fake panic.
        let (mut session, mut rx) = session(api);
        let mut transcript = Transcript::new();

        session.send(&mut transcript, "Hello");
        let phase = settle(&mut session, &mut transcript, &mut rx).await;

        assert_eq!(phase, SendPhase::Failed);
        assert_eq!(transcript.pending_count(), 0);
        assert_eq!(transcript.len(), 2);
        assert_eq!(session.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_sends_track_own_placeholders() {
        let api = Arc::new(ScriptedApi::new());
        api.push_chat(Ok("reply".into()));
        api.push_chat(Ok("reply".into()));
        let (mut session, mut rx) = session(api);
        let mut transcript = Transcript::new();

        let first = session.send(&mut transcript, "one").unwrap();
        let second = session.send(&mut transcript, "two").unwrap();
        assert_ne!(first, second);
        assert_eq!(session.in_flight(), 2);
        assert_eq!(transcript.pending_count(), 2);

        settle(&mut session, &mut transcript, &mut rx).await;
        assert_eq!(session.in_flight(), 1);
        assert_eq!(transcript.pending_count(), 1);

        settle(&mut session, &mut transcript, &mut rx).await;
        assert_eq!(session.in_flight(), 0);
        assert_eq!(transcript.pending_count(), 0);

        let users: Vec<&str> = transcript
            .iter()
            .filter(|m| m.author == Author::User)
            .map(|m| m.body.as_str())
            .collect();
        assert_eq!(users, vec!["one", "two"]);
        assert_eq!(transcript.len(), 4);
    }

    #[test]
    fn test_failure_text_variants() {
        assert_eq!(
            failure_text(&ApiError::transport("dns")),
            NETWORK_ERROR_TEXT
        );
        assert_eq!(
            failure_text(&ApiError::rejected(Some("bad model".into()))),
            "❌ Error: bad model"
        );
    }
}
