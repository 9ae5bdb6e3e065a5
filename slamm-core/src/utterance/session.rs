//! One utterance buffer per conversation.
//!
//! A session is locked for the full duration of a request, so segments of one
//! utterance are appended and flushed strictly one request at a time while
//! unrelated sessions proceed in parallel.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use super::buffer::UtteranceBuffer;

pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug)]
pub struct Session {
    pub buffer: UtteranceBuffer,
    last_activity: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            buffer: UtteranceBuffer::new(),
            last_activity: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.last_activity.elapsed() >= ttl)
    }
}

/// Exclusive access to one session for the lifetime of a request.
pub type SessionGuard = OwnedMutexGuard<Session>;

/// Keyed store of in-flight utterances.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Mutex<Session>>>,
    /// Idle time after which a partial utterance is abandoned. `None` keeps it forever.
    ttl: Option<Duration>,
}

impl SessionRegistry {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Lock the session `id`, creating it if needed.
    ///
    /// A partial utterance that sat idle past the TTL is discarded before the
    /// guard is handed out.
    pub async fn acquire(&self, id: &str) -> SessionGuard {
        loop {
            let slot = self
                .sessions
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Session::new())))
                .clone();

            let mut guard = slot.clone().lock_owned().await;

            // The sweeper or a reset may have evicted this slot while we waited.
            let current = self.sessions.get(id).map(|s| Arc::ptr_eq(&s, &slot));
            if current != Some(true) {
                continue;
            }

            if guard.is_expired(self.ttl) && !guard.buffer.is_empty() {
                warn!(
                    session = id,
                    words = guard.buffer.len(),
                    "Discarding expired partial utterance"
                );
                guard.buffer.reset();
            }
            guard.last_activity = Instant::now();
            return guard;
        }
    }

    /// Drop session `id` and anything it had buffered. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        let Some(slot) = self.sessions.get(id).map(|s| s.clone()) else {
            return false;
        };
        // Wait for any in-flight request on this session to finish first.
        let _guard = slot.clone().lock_owned().await;
        self.sessions
            .remove_if(id, |_, s| Arc::ptr_eq(s, &slot))
            .is_some()
    }

    /// Evict idle sessions. Sessions busy with a request are skipped.
    pub fn sweep(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|id, slot| match slot.try_lock() {
            Ok(session) if session.is_expired(self.ttl) => {
                if !session.buffer.is_empty() {
                    warn!(
                        session = %id,
                        words = session.buffer.len(),
                        "Abandoned utterance expired"
                    );
                }
                false
            }
            _ => true,
        });
        before.saturating_sub(self.sessions.len())
    }

    /// Run [`sweep`](Self::sweep) every `interval` until the registry is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let evicted = registry.sweep();
                if evicted > 0 {
                    info!(evicted, remaining = registry.len(), "Swept idle sessions");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}
