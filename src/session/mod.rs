use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{event, Level};

use crate::auth::{get_json, put_json, Message, SessionStore};
use crate::core::types::SessionId;
use crate::util::random::FromRandom;

pub const MESSAGES_KEY: &str = "messages";
pub const ACCOUNT_KEY: &str = "uid";

/// Queues a message for the next page the browser loads.
pub fn push_message(session: &mut dyn SessionStore, message: Message) {
    let mut messages: Vec<Message> = get_json(session, MESSAGES_KEY).unwrap_or_default();
    messages.push(message);
    if let Err(e) = put_json(session, MESSAGES_KEY, &messages) {
        event!(Level::WARN, error = %e, "Dropping session message");
    }
}

pub fn take_messages(session: &mut dyn SessionStore) -> Vec<Message> {
    let messages = get_json(session, MESSAGES_KEY).unwrap_or_default();
    session.remove(MESSAGES_KEY);
    messages
}

/// Values of one browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySession {
    values: HashMap<String, String>,
}

impl MemorySession {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }
}

/// A session checked out for the duration of one request.
#[derive(Debug)]
pub struct SessionHandle {
    pub id: SessionId,
    /// True when the browser did not present a known session.
    pub fresh: bool,
    data: MemorySession,
}

impl SessionStore for SessionHandle {
    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key)
    }

    fn set(&mut self, key: &str, value: String) {
        self.data.set(key, value)
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        self.data.remove(key)
    }
}

#[derive(Debug)]
struct Entry {
    data: MemorySession,
    last_seen: Instant,
}

/// In-memory sessions keyed by the session cookie. Sessions idle for longer
/// than the ttl are dropped.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<SessionId, Entry>>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            ttl,
        }
    }

    pub fn load(&self, id: Option<SessionId>) -> SessionHandle {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let known = id.and_then(|id| {
            sessions
                .get(&id)
                .filter(|entry| entry.last_seen.elapsed() < self.ttl)
                .map(|entry| (id, entry.data.clone()))
        });

        match known {
            Some((id, data)) => SessionHandle {
                id,
                fresh: false,
                data,
            },
            None => SessionHandle {
                id: SessionId::from_random(),
                fresh: true,
                data: MemorySession::default(),
            },
        }
    }

    pub fn save(&self, handle: &SessionHandle) {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(
            handle.id.clone(),
            Entry {
                data: handle.data.clone(),
                last_seen: Instant::now(),
            },
        );
    }

    /// Moves the session data to a new id. The old id stops working.
    pub fn regenerate(&self, handle: &mut SessionHandle) {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(&handle.id);
        handle.id = SessionId::from_random();
        handle.fresh = true;
    }

    pub fn clean_up(&self) -> usize {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, entry| entry.last_seen.elapsed() < ttl);
        before - sessions.len()
    }

    pub async fn start_clean_up_worker(&self, every: Duration) {
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;
            let dropped = self.clean_up();
            if dropped > 0 {
                event!(Level::DEBUG, dropped, "Expired idle sessions");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
