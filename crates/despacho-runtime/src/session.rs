//! Per-session serialization and bounded conversation history.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use despacho_core::SessionId;
use despacho_llm::Message;
use tokio::sync::{Mutex, MutexGuard};

/// Default number of messages kept per session.
pub const DEFAULT_HISTORY_LIMIT: usize = 40;

/// Default time a session may stay untouched before its state is dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(3600);

/// A place in the history held for a message that is not written yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation(u64);

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    message: Option<Message>,
}

/// Bounded message history of one session, oldest evicted first.
///
/// A message can be given its position before its content is known with
/// [`reserve`](Self::reserve); unfilled positions are skipped when reading.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    entries: VecDeque<Entry>,
    next_seq: u64,
    limit: usize,
}

impl ConversationHistory {
    /// Create an empty history keeping at most `limit` messages (minimum 1).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            next_seq: 0,
            limit: limit.max(1),
        }
    }

    fn push_entry(&mut self, message: Option<Message>) -> Reservation {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.entries.push_back(Entry { seq, message });
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        Reservation(seq)
    }

    /// Append a message, evicting the oldest beyond the limit.
    pub fn push(&mut self, message: Message) {
        self.push_entry(Some(message));
    }

    /// Hold the next position for a message written later.
    pub fn reserve(&mut self) -> Reservation {
        self.push_entry(None)
    }

    /// Write a reserved message. Returns `false` if the position was
    /// evicted in the meantime.
    pub fn fill(&mut self, reservation: Reservation, message: Message) -> bool {
        match self.entries.iter_mut().find(|e| e.seq == reservation.0) {
            Some(entry) => {
                entry.message = Some(message);
                true
            },
            None => false,
        }
    }

    /// Snapshot of the written messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.entries
            .iter()
            .filter_map(|e| e.message.clone())
            .collect()
    }

    /// Number of positions held, reserved ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of messages kept.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// State shared by every turn of one session.
#[derive(Debug)]
pub(crate) struct SessionSlot {
    turn: Mutex<()>,
    history: Mutex<ConversationHistory>,
    /// Milliseconds since the table's epoch at last use.
    touched_ms: AtomicU64,
}

impl SessionSlot {
    fn new(history_limit: usize, now_ms: u64) -> Self {
        Self {
            turn: Mutex::new(()),
            history: Mutex::new(ConversationHistory::new(history_limit)),
            touched_ms: AtomicU64::new(now_ms),
        }
    }

    /// Serialize turns: held for the whole turn except external delivery.
    pub(crate) async fn lock_turn(&self) -> MutexGuard<'_, ()> {
        self.turn.lock().await
    }

    pub(crate) async fn record(&self, message: Message) {
        self.history.lock().await.push(message);
    }

    /// Hold the position of a reply that is produced after the turn lock is
    /// released, so later turns are recorded behind it.
    pub(crate) async fn reserve(&self) -> Reservation {
        self.history.lock().await.reserve()
    }

    pub(crate) async fn fill(&self, reservation: Reservation, message: Message) {
        if !self.history.lock().await.fill(reservation, message) {
            tracing::debug!("Reserved reply fell out of the history window");
        }
    }

    pub(crate) async fn messages(&self) -> Vec<Message> {
        self.history.lock().await.messages()
    }
}

/// Sessions known to the controller.
#[derive(Debug)]
pub(crate) struct SessionTable {
    slots: DashMap<SessionId, Arc<SessionSlot>>,
    history_limit: usize,
    epoch: Instant,
    last_sweep_ms: AtomicU64,
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl SessionTable {
    pub(crate) fn new(history_limit: usize) -> Self {
        Self {
            slots: DashMap::new(),
            history_limit,
            epoch: Instant::now(),
            last_sweep_ms: AtomicU64::new(0),
        }
    }

    fn now_ms(&self) -> u64 {
        as_millis(self.epoch.elapsed())
    }

    /// The session's slot, created on first use.
    pub(crate) fn slot(&self, session_id: &SessionId) -> Arc<SessionSlot> {
        let now = self.now_ms();
        let slot = self
            .slots
            .entry(session_id.clone())
            .or_insert_with(|| Arc::new(SessionSlot::new(self.history_limit, now)))
            .clone();
        slot.touched_ms.store(now, Ordering::Relaxed);
        slot
    }

    /// Drop sessions untouched for `max_idle`. Sessions with a turn in
    /// progress, and those `keep` selects, stay. Returns how many went.
    pub(crate) fn evict_idle(&self, max_idle: Duration, keep: impl Fn(&SessionId) -> bool) -> usize {
        let now = self.now_ms();
        let max_idle = as_millis(max_idle);
        let before = self.slots.len();
        self.slots.retain(|id, slot| {
            let idle = now.saturating_sub(slot.touched_ms.load(Ordering::Relaxed));
            Arc::strong_count(slot) > 1 || idle < max_idle || keep(id)
        });
        self.last_sweep_ms.store(now, Ordering::Relaxed);
        before.saturating_sub(self.slots.len())
    }

    /// Whether `interval` has passed since the last eviction sweep.
    pub(crate) fn sweep_due(&self, interval: Duration) -> bool {
        let since = self
            .now_ms()
            .saturating_sub(self.last_sweep_ms.load(Ordering::Relaxed));
        since >= as_millis(interval)
    }

    pub(crate) fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = ConversationHistory::new(3);
        for i in 0..5 {
            history.push(Message::user(format!("m{i}")));
        }
        let contents: Vec<_> = history.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_zero_limit_keeps_one() {
        let mut history = ConversationHistory::new(0);
        history.push(Message::user("a"));
        history.push(Message::user("b"));
        assert_eq!(history.limit(), 1);
        assert_eq!(history.messages()[0].content, "b");
    }

    #[tokio::test]
    async fn test_slots_are_per_session() {
        let table = SessionTable::new(10);
        let a = table.slot(&SessionId::new("a"));
        let a_again = table.slot(&SessionId::new("a"));
        let b = table.slot(&SessionId::new("b"));

        assert!(Arc::ptr_eq(&a, &a_again));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 2);

        a.record(Message::user("hello")).await;
        assert_eq!(a_again.messages().await.len(), 1);
        assert!(b.messages().await.is_empty());
    }

    #[test]
    fn test_reserved_position_keeps_order() {
        let mut history = ConversationHistory::new(10);
        history.push(Message::user("yes"));
        let reply = history.reserve();
        history.push(Message::user("next question"));

        // Unfilled positions are invisible.
        assert_eq!(history.messages().len(), 2);

        assert!(history.fill(reply, Message::assistant("sent")));
        let contents: Vec<_> = history.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["yes", "sent", "next question"]);
    }

    #[test]
    fn test_fill_after_eviction_is_dropped() {
        let mut history = ConversationHistory::new(2);
        let reply = history.reserve();
        history.push(Message::user("a"));
        history.push(Message::user("b"));
        assert!(!history.fill(reply, Message::assistant("late")));
        assert_eq!(history.messages().len(), 2);
    }

    #[test]
    fn test_evict_idle_spares_busy_and_kept_sessions() {
        let table = SessionTable::new(10);
        let busy = table.slot(&SessionId::new("busy"));
        table.slot(&SessionId::new("kept"));
        table.slot(&SessionId::new("idle"));

        let evicted = table.evict_idle(Duration::ZERO, |id| id.as_str() == "kept");

        assert_eq!(evicted, 1);
        assert_eq!(table.len(), 2);
        assert!(table.slots.contains_key(&SessionId::new("busy")));
        assert!(!table.slots.contains_key(&SessionId::new("idle")));
        drop(busy);
    }

    #[test]
    fn test_recent_sessions_are_not_evicted() {
        let table = SessionTable::new(10);
        table.slot(&SessionId::new("fresh"));
        assert_eq!(table.evict_idle(Duration::from_secs(60), |_| false), 0);
        assert!(!table.sweep_due(Duration::from_secs(60)));
        assert!(table.sweep_due(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_turn_lock_is_exclusive() {
        let table = SessionTable::new(10);
        let slot = table.slot(&SessionId::new("a"));
        let guard = slot.lock_turn().await;
        assert!(slot.turn.try_lock().is_err());
        drop(guard);
        assert!(slot.turn.try_lock().is_ok());
    }
}
