#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{broadcast, Notify, Semaphore};

use flowfriend::chat::Sleeper;
use flowfriend::db;
use flowfriend::llm::{GenerateRequest, LanguageModel, LlmError};
use flowfriend::tracking::identity;
use flowfriend::tracking::{
    Entry, EntryChange, EntrySource, EntryStore, Flow, Mood, Pain, Sleep, Source,
};

/// A fresh in-memory store with one signed-in user.
pub fn test_store() -> (EntryStore, String) {
    let conn = db::open_memory_database().unwrap();
    let user_id = identity::sign_in_anonymously(&conn).unwrap();
    (EntryStore::new(conn), user_id)
}

/// Create another user in the same store.
pub async fn add_user(store: &EntryStore) -> String {
    store.with_conn(|conn| identity::issue_identity(conn)).await.unwrap()
}

/// An entry dated `date` (midnight UTC), everything but flow unrecorded.
pub fn entry_on(date: &str, flow: Flow) -> Entry {
    let recorded_at = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc();
    Entry {
        id: format!("entry-{date}"),
        user_id: "test-user".into(),
        flow,
        mood: Mood::NotRecorded,
        pain: Pain::NotRecorded,
        sleep: Sleep::NotRecorded,
        recorded_at,
        source: Source::Manual,
        device_timestamp: None,
        created_at: Utc::now(),
    }
}

/// What Gemini returns once the free tier is spent.
pub fn rate_limited() -> LlmError {
    LlmError::Api {
        status: 429,
        message: "You exceeded your current quota, please check your plan and billing details.".into(),
    }
}

type Responder = dyn Fn(&GenerateRequest) -> Result<String, LlmError> + Send + Sync;

/// Model double: answers through a closure and records every request.
pub struct FakeModel {
    respond: Box<Responder>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl FakeModel {
    pub fn new(
        respond: impl Fn(&GenerateRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Replies in order; once the script runs out every call is empty.
    pub fn scripted(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
        let replies = Mutex::new(VecDeque::from(replies));
        Self::new(move |_| {
            replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyResponse))
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.respond)(request)
    }

    fn name(&self) -> &str {
        "fake-model"
    }
}

/// Sleeper that returns immediately and remembers what it was asked.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

/// Wraps a store so every read blocks until the test releases it.
pub struct GatedSource {
    inner: EntryStore,
    pub entered: Notify,
    release: Semaphore,
    pub completed: AtomicBool,
}

impl GatedSource {
    pub fn new(inner: EntryStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            entered: Notify::new(),
            release: Semaphore::new(0),
            completed: AtomicBool::new(false),
        })
    }

    /// Let one pending read through.
    pub fn release_one(&self) {
        self.release.add_permits(1);
    }
}

#[async_trait]
impl EntrySource for GatedSource {
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<Entry>> {
        self.entered.notify_one();
        let permit = self.release.acquire().await?;
        permit.forget();
        let entries = self.inner.recent(user_id, limit).await;
        self.completed.store(true, Ordering::SeqCst);
        entries
    }

    fn changes(&self) -> broadcast::Receiver<EntryChange> {
        self.inner.changes()
    }
}

/// A source whose reads always fail.
pub struct FailingSource {
    changes: broadcast::Sender<EntryChange>,
}

impl FailingSource {
    pub fn new() -> Arc<Self> {
        let (changes, _) = broadcast::channel(4);
        Arc::new(Self { changes })
    }
}

#[async_trait]
impl EntrySource for FailingSource {
    async fn recent(&self, _user_id: &str, _limit: usize) -> Result<Vec<Entry>> {
        bail!("database is locked")
    }

    fn changes(&self) -> broadcast::Receiver<EntryChange> {
        self.changes.subscribe()
    }
}

/// Wait for the next change notification, failing the test after a second.
pub async fn next_change(rx: &mut broadcast::Receiver<EntryChange>) -> EntryChange {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for an entry change")
        .unwrap()
}
