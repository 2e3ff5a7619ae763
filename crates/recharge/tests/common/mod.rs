//! In-memory mail store and credit store for the recharge tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use database::{credit, user, Database};
use mail_bridge::{
    FetchRange, MailConnector, MailError, MailEvent, MailTransport, MailboxStatus, RawMessage,
    SearchQuery,
};

pub const TRIGGER: &str = "recharge 5 credits";

pub fn message(from: &str, subject: &str) -> Vec<u8> {
    format!(
        "From: {}\r\nSubject: {}\r\n\r\n",
        from, subject
    )
    .into_bytes()
}

struct StoredMessage {
    bytes: Vec<u8>,
    seen: bool,
}

#[derive(Default)]
struct MailboxState {
    messages: Vec<StoredMessage>,
    /// Each IDLE wake-up delivers the next batch.
    arrivals: VecDeque<Vec<Vec<u8>>>,
    failing_fetches: usize,
    failing_searches: usize,
    /// IDLE calls (with nothing to deliver) that drop the connection.
    hang_ups: usize,
    refused_connects: usize,
    connects: usize,
    fetches: Vec<FetchRange>,
    seen_writes: Vec<Vec<u32>>,
}

impl MailboxState {
    fn subject_of(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes)
            .lines()
            .find_map(|line| line.strip_prefix("Subject:"))
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

/// Shared handle to a scripted mailbox.
#[derive(Clone, Default)]
pub struct FakeMailbox {
    state: Arc<Mutex<MailboxState>>,
}

impl FakeMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a message in the mailbox now; returns its sequence number.
    pub fn deliver(&self, from: &str, subject: &str) -> u32 {
        self.deliver_raw(message(from, subject))
    }

    pub fn deliver_raw(&self, bytes: Vec<u8>) -> u32 {
        let mut state = self.state.lock().unwrap();
        state.messages.push(StoredMessage { bytes, seen: false });
        state.messages.len() as u32
    }

    /// Queue messages that arrive during a later IDLE.
    pub fn arrive_later(&self, batch: &[(&str, &str)]) {
        let batch = batch.iter().map(|(from, subject)| message(from, subject)).collect();
        self.state.lock().unwrap().arrivals.push_back(batch);
    }

    pub fn fail_next_fetches(&self, count: usize) {
        self.state.lock().unwrap().failing_fetches = count;
    }

    pub fn fail_next_searches(&self, count: usize) {
        self.state.lock().unwrap().failing_searches = count;
    }

    pub fn hang_up_when_quiet(&self, count: usize) {
        self.state.lock().unwrap().hang_ups = count;
    }

    pub fn refuse_connects(&self, count: usize) {
        self.state.lock().unwrap().refused_connects = count;
    }

    pub fn is_seen(&self, seq: u32) -> bool {
        self.state.lock().unwrap().messages[seq as usize - 1].seen
    }

    pub fn seen_writes(&self) -> Vec<Vec<u32>> {
        self.state.lock().unwrap().seen_writes.clone()
    }

    pub fn fetches(&self) -> Vec<FetchRange> {
        self.state.lock().unwrap().fetches.clone()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn len(&self) -> u32 {
        self.state.lock().unwrap().messages.len() as u32
    }

    pub fn transport(&self) -> FakeTransport {
        FakeTransport {
            mailbox: self.clone(),
        }
    }
}

pub struct FakeTransport {
    mailbox: FakeMailbox,
}

#[async_trait]
impl MailTransport for FakeTransport {
    async fn open_mailbox(&mut self, name: &str, read_only: bool) -> Result<MailboxStatus, MailError> {
        Ok(MailboxStatus {
            name: name.to_string(),
            exists: self.mailbox.len(),
            read_only,
        })
    }

    async fn search(&mut self, query: &SearchQuery) -> Result<Vec<u32>, MailError> {
        let mut state = self.mailbox.state.lock().unwrap();
        if state.failing_searches > 0 {
            state.failing_searches -= 1;
            return Err(MailError::Mailbox("SEARCH rejected".to_string()));
        }

        let needle = query.subject.as_deref().unwrap_or_default().to_lowercase();
        Ok(state
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| !(query.unseen && m.seen))
            .filter(|(_, m)| MailboxState::subject_of(&m.bytes).to_lowercase().contains(&needle))
            .map(|(i, _)| i as u32 + 1)
            .collect())
    }

    async fn fetch_headers(&mut self, range: &FetchRange) -> Result<Vec<RawMessage>, MailError> {
        let mut state = self.mailbox.state.lock().unwrap();
        state.fetches.push(range.clone());
        if state.failing_fetches > 0 {
            state.failing_fetches -= 1;
            return Err(MailError::Mailbox("FETCH rejected".to_string()));
        }

        let ids: Vec<u32> = match range {
            FetchRange::Ids(ids) => ids.clone(),
            FetchRange::Span { start, end } => (*start..=*end).collect(),
            FetchRange::From(start) => (*start..=state.messages.len() as u32).collect(),
        };

        Ok(ids
            .into_iter()
            .filter_map(|seq| {
                state
                    .messages
                    .get(seq as usize - 1)
                    .map(|m| RawMessage::new(seq, m.bytes.clone()))
            })
            .collect())
    }

    async fn mark_seen(&mut self, ids: &[u32]) -> Result<(), MailError> {
        let mut state = self.mailbox.state.lock().unwrap();
        state.seen_writes.push(ids.to_vec());
        for seq in ids {
            if let Some(m) = state.messages.get_mut(*seq as usize - 1) {
                m.seen = true;
            }
        }
        Ok(())
    }

    async fn wait_for_mail(&mut self, timeout: Duration) -> Result<Vec<MailEvent>, MailError> {
        let arrived = {
            let mut state = self.mailbox.state.lock().unwrap();
            match state.arrivals.pop_front() {
                Some(batch) => {
                    for bytes in batch {
                        state.messages.push(StoredMessage { bytes, seen: false });
                    }
                    Some(state.messages.len() as u32)
                }
                None if state.hang_ups > 0 => {
                    state.hang_ups -= 1;
                    return Err(MailError::Connection("connection reset".to_string()));
                }
                None => None,
            }
        };

        match arrived {
            Some(exists) => Ok(vec![MailEvent::Exists(exists)]),
            None => {
                tokio::time::sleep(timeout).await;
                Ok(Vec::new())
            }
        }
    }

    async fn logout(&mut self) -> Result<(), MailError> {
        Ok(())
    }
}

#[async_trait]
impl MailConnector for FakeMailbox {
    type Transport = FakeTransport;

    async fn connect(&self) -> Result<FakeTransport, MailError> {
        let mut state = self.state.lock().unwrap();
        if state.refused_connects > 0 {
            state.refused_connects -= 1;
            return Err(MailError::Connection("connection refused".to_string()));
        }
        state.connects += 1;
        Ok(self.transport())
    }
}

pub async fn test_db() -> Database {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();
    db
}

pub async fn add_user(db: &Database, email: &str, credits: i64) {
    user::create_user(db.pool(), email, credits).await.unwrap();
}

pub async fn credits_of(db: &Database, email: &str) -> i64 {
    credit::current_credits(db.pool(), email)
        .await
        .unwrap()
        .unwrap()
}
