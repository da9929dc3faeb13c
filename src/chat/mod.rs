//! Health chat session.
//!
//! A [`ChatSession`] keeps the in-memory transcript and sends the full
//! conversation plus a fixed system instruction on every turn. Rate-limit
//! errors are retried with bounded exponential backoff; every outcome ends
//! as a message in the transcript, never as an error to the caller.

pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::llm::{GenerateRequest, LanguageModel, Turn};

pub use retry::{RetryPolicy, Sleeper, TokioSleeper};

pub const HEALTH_SYSTEM_PROMPT: &str = "You are a compassionate and knowledgeable health information assistant specializing in reproductive health, menstrual cycle wellness, and overall health for people with ovaries and uteruses.

You provide:
- Evidence-based information about menstrual cycles, period symptoms, and reproductive health
- Supportive guidance on managing period pain, PMS, hormonal changes, and emotional wellness
- General health information related to periodcare, cycle tracking, and preventive wellness
- Inclusive language that respects all gender identities

IMPORTANT SAFETY GUIDELINES:
- Always recommend consulting a healthcare provider for serious symptoms or medical concerns
- Provide health information only, not medical diagnoses or prescriptions
- Be empathetic and non-judgmental about all health topics
- If asked about severe symptoms (heavy bleeding, severe pain, signs of infection), strongly recommend seeking immediate medical care
- Acknowledge the limits of your knowledge and when professional medical advice is needed

Be friendly, supportive, and use conversational language.";

pub const GREETING: &str = "Hi! I'm here to help answer questions about menstrual health, cycle wellness, and reproductive health. Feel free to ask me anything! 💬";

pub const QUOTA_EXHAUSTED_MESSAGE: &str = "Sorry! The free tier API quota is exhausted. Please try again in a few hours, or upgrade to a paid plan at https://ai.google.dev/pricing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// What a message is, beyond who sent it. Only `Conversation` messages are
/// replayed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Greeting,
    Conversation,
    Retrying,
    QuotaExhausted,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
}

impl ChatMessage {
    fn new(sender: Sender, kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatState {
    #[default]
    Idle,
    AwaitingResponse,
    /// Waiting `delay` before the next attempt.
    Retrying { attempts_left: u32, delay: Duration },
}

/// Status line shown while backing off.
pub fn retry_message(delay: Duration, attempts_left: u32) -> String {
    let secs = delay.as_millis().div_ceil(1000);
    format!("⏳ API quota exceeded. Retrying in {secs}s... ({attempts_left} attempts left)")
}

pub struct ChatSession {
    model: Arc<dyn LanguageModel>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    messages: Vec<ChatMessage>,
    state: watch::Sender<ChatState>,
}

impl ChatSession {
    /// New session with the greeting already in the transcript.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self::with_retry(model, RetryPolicy::default(), Arc::new(TokioSleeper))
    }

    pub fn with_retry(
        model: Arc<dyn LanguageModel>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let (state, _) = watch::channel(ChatState::Idle);
        Self {
            model,
            sleeper,
            policy,
            messages: vec![ChatMessage::new(Sender::Assistant, MessageKind::Greeting, GREETING)],
            state,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> ChatState {
        *self.state.borrow()
    }

    /// Follow state transitions while a turn is in flight.
    pub fn watch_state(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    /// Prior turns replayed to the model: user messages and model replies.
    fn history(&self) -> Vec<Turn> {
        self.messages
            .iter()
            .filter(|m| m.kind == MessageKind::Conversation)
            .map(|m| match m.sender {
                Sender::User => Turn::user(&m.text),
                Sender::Assistant => Turn::model(&m.text),
            })
            .collect()
    }

    fn push(&mut self, sender: Sender, kind: MessageKind, text: impl Into<String>) {
        self.messages.push(ChatMessage::new(sender, kind, text));
    }

    /// Submit one user message and run the turn to completion. Returns the
    /// messages appended by this turn, starting with the user's. Blank input
    /// is ignored.
    pub async fn send(&mut self, text: &str) -> &[ChatMessage] {
        let start = self.messages.len();
        if text.trim().is_empty() {
            return &self.messages[start..];
        }

        let request = GenerateRequest::new(text)
            .with_system_instruction(HEALTH_SYSTEM_PROMPT)
            .with_history(self.history());
        self.push(Sender::User, MessageKind::Conversation, text);

        let mut attempts_left = self.policy.max_retries;
        let mut delay = self.policy.initial_delay;
        loop {
            self.state.send_replace(ChatState::AwaitingResponse);
            match self.model.generate(&request).await {
                Ok(reply) => {
                    self.push(Sender::Assistant, MessageKind::Conversation, reply);
                    break;
                }
                Err(e) if e.is_rate_limited() => {
                    if attempts_left == 0 {
                        tracing::warn!(error = %e, "chat quota exhausted after retries");
                        self.push(
                            Sender::Assistant,
                            MessageKind::QuotaExhausted,
                            QUOTA_EXHAUSTED_MESSAGE,
                        );
                        break;
                    }
                    tracing::info!(
                        attempts_left,
                        delay_ms = delay.as_millis() as u64,
                        "chat rate limited, backing off"
                    );
                    let status = retry_message(delay, attempts_left);
                    self.push(Sender::Assistant, MessageKind::Retrying, status);
                    self.state.send_replace(ChatState::Retrying { attempts_left, delay });
                    self.sleeper.sleep(delay).await;
                    attempts_left -= 1;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => {
                    tracing::error!(error = %e, "chat request failed");
                    self.push(Sender::Assistant, MessageKind::Error, format!("Error: {e}"));
                    break;
                }
            }
        }

        self.state.send_replace(ChatState::Idle);
        &self.messages[start..]
    }
}
