//! The versioned draft store.
//!
//! # Layout
//!
//! Everything lives in one namespace so that each transition is a single
//! atomic batch:
//!
//! | Key | Value |
//! |---|---|
//! | `draft/{uuid}` | [`DraftRecord`]: status, latest revision, timestamps, delivery |
//! | `draft/{uuid}/rev/{n:06}` | [`DraftRevision`] `n` |
//! | `session/{hex(session)}/{uuid}` | creation timestamp (session index) |
//!
//! Nothing is ever deleted. Reads always go to the backend; the store keeps
//! no payload in memory, so the payload returned by
//! [`finalize`](DraftStore::finalize) is whatever the latest committed
//! revision holds.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use dashmap::DashMap;
use despacho_core::{ActionPayload, DraftId, SessionId, Timestamp};
use despacho_storage::{KvStore, MemoryKvStore, ScopedKvStore, StorageError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::draft::{DeliveryState, Draft, DraftRecord, DraftRevision, DraftStatus, RevisionReason};
use crate::error::{DraftError, DraftResult};

fn record_key(id: DraftId) -> String {
    format!("draft/{}", id.0)
}

fn revision_key(id: DraftId, revision: u32) -> String {
    format!("draft/{}/rev/{revision:06}", id.0)
}

/// Session ids are caller-chosen strings, so they are hex-encoded to keep
/// one session's prefix from matching another's.
fn session_prefix(session_id: &SessionId) -> String {
    let mut out = String::from("session/");
    for byte in session_id.as_str().bytes() {
        let _ = write!(out, "{byte:02x}");
    }
    out.push('/');
    out
}

/// Held for the length of one transition. The map entry goes away with the
/// last holder, so the lock table only tracks drafts with work in progress.
struct DraftLock<'a> {
    locks: &'a DashMap<DraftId, Arc<Mutex<()>>>,
    id: DraftId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DraftLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Runs under the shard lock, so a concurrent `lock` either sees the
        // entry gone or has already bumped the count.
        self.locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Versioned, append-only draft persistence.
///
/// Transitions on the same draft are serialized by a per-draft lock; different
/// drafts proceed independently.
///
/// ```
/// use despacho_drafts::DraftStore;
///
/// let store = DraftStore::in_memory().unwrap();
/// assert_eq!(store.namespace(), "drafts");
/// ```
pub struct DraftStore {
    kv: ScopedKvStore,
    locks: DashMap<DraftId, Arc<Mutex<()>>>,
}

impl DraftStore {
    /// Namespace used in the backing store.
    pub const NAMESPACE: &'static str = "drafts";

    /// Create a store on top of any key-value backend.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the namespace cannot be bound.
    pub fn new(backend: Arc<dyn KvStore>) -> DraftResult<Self> {
        Ok(Self {
            kv: ScopedKvStore::new(backend, Self::NAMESPACE)?,
            locks: DashMap::new(),
        })
    }

    /// Create a store backed by a fresh [`MemoryKvStore`].
    ///
    /// # Errors
    ///
    /// Returns a storage error if the namespace cannot be bound.
    pub fn in_memory() -> DraftResult<Self> {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    /// The namespace drafts are kept in.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.kv.namespace()
    }

    async fn lock(&self, id: DraftId) -> DraftLock<'_> {
        let lock = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        DraftLock {
            locks: &self.locks,
            id,
            guard: Some(lock.lock_owned().await),
        }
    }

    async fn load_record(&self, id: DraftId) -> DraftResult<DraftRecord> {
        self.kv
            .get_json::<DraftRecord>(&record_key(id))
            .await?
            .ok_or(DraftError::NotFound(id))
    }

    async fn load_revision(&self, id: DraftId, revision: u32) -> DraftResult<DraftRevision> {
        self.kv
            .get_json::<DraftRevision>(&revision_key(id, revision))
            .await?
            .ok_or(DraftError::MissingRevision {
                draft_id: id,
                revision,
            })
    }

    /// Create a new draft at revision 1 with status `pending`.
    ///
    /// The action kind is taken from the payload.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::Storage`] if the write fails.
    pub async fn create(&self, session_id: &SessionId, payload: ActionPayload) -> DraftResult<Draft> {
        let id = DraftId::new();
        let now = Timestamp::now();
        let record = DraftRecord {
            id,
            session_id: session_id.clone(),
            kind: payload.kind(),
            status: DraftStatus::Pending,
            latest_revision: 1,
            created_at: now,
            updated_at: now,
            finalized_at: None,
            cancelled_at: None,
            delivery: DeliveryState::NotAttempted,
            attempts: 0,
        };
        let revision = DraftRevision {
            revision: 1,
            payload,
            reason: RevisionReason::Initial,
            created_at: now,
        };
        let index_key = format!("{}{}", session_prefix(session_id), id.0);

        self.kv
            .batch()
            .put_json(&revision_key(id, 1), &revision)?
            .put_json(&record_key(id), &record)?
            .put_json(&index_key, &now)?
            .commit()
            .await?;

        info!(
            draft_id = %id,
            session_id = %session_id,
            kind = %record.kind,
            "Draft created"
        );
        Ok(record.into_draft(revision))
    }

    /// Append a revision with a new payload.
    ///
    /// # Errors
    ///
    /// - [`DraftError::NotFound`] if the draft does not exist
    /// - [`DraftError::InvalidState`] if the draft is `sent` or `cancelled`
    /// - [`DraftError::KindMismatch`] if the payload is of another kind
    pub async fn revise(
        &self,
        draft_id: DraftId,
        payload: ActionPayload,
        reason: RevisionReason,
    ) -> DraftResult<Draft> {
        let _lock = self.lock(draft_id).await;

        let mut record = self.load_record(draft_id).await?;
        if record.status != DraftStatus::Pending {
            return Err(DraftError::InvalidState {
                draft_id,
                status: record.status,
                operation: "revise",
            });
        }
        if payload.kind() != record.kind {
            return Err(DraftError::KindMismatch {
                draft_id,
                expected: record.kind,
                found: payload.kind(),
            });
        }

        let next = record.latest_revision.checked_add(1).ok_or_else(|| {
            StorageError::Internal(format!("revision counter exhausted for {draft_id}"))
        })?;
        let now = Timestamp::now();
        let revision = DraftRevision {
            revision: next,
            payload,
            reason,
            created_at: now,
        };
        record.latest_revision = next;
        record.updated_at = now;

        self.kv
            .batch()
            .put_json(&revision_key(draft_id, next), &revision)?
            .put_json(&record_key(draft_id), &record)?
            .commit()
            .await?;

        info!(
            draft_id = %draft_id,
            revision = next,
            reason = %revision.reason,
            "Draft revised"
        );
        Ok(record.into_draft(revision))
    }

    /// Read the draft with its highest revision.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::NotFound`] if the draft does not exist.
    pub async fn get_latest(&self, draft_id: DraftId) -> DraftResult<Draft> {
        let record = self.load_record(draft_id).await?;
        let revision = self.load_revision(draft_id, record.latest_revision).await?;
        debug!(draft_id = %draft_id, revision = revision.revision, "Loaded latest revision");
        Ok(record.into_draft(revision))
    }

    /// Mark the draft `sent` and return it with its latest committed revision.
    ///
    /// # Errors
    ///
    /// - [`DraftError::AlreadyFinalized`] if the draft is already `sent`
    /// - [`DraftError::InvalidState`] if the draft is `cancelled`
    /// - [`DraftError::NotFound`] if the draft does not exist
    pub async fn finalize(&self, draft_id: DraftId) -> DraftResult<Draft> {
        let _lock = self.lock(draft_id).await;

        let mut record = self.load_record(draft_id).await?;
        match record.status {
            DraftStatus::Sent => {
                return Err(DraftError::AlreadyFinalized {
                    draft_id,
                    finalized_at: record.finalized_at,
                });
            },
            DraftStatus::Cancelled => {
                return Err(DraftError::InvalidState {
                    draft_id,
                    status: record.status,
                    operation: "finalize",
                });
            },
            DraftStatus::Pending => {},
        }

        let revision = self.load_revision(draft_id, record.latest_revision).await?;
        let now = Timestamp::now();
        record.status = DraftStatus::Sent;
        record.finalized_at = Some(now);
        record.updated_at = now;
        self.kv.put_json(&record_key(draft_id), &record).await?;

        info!(draft_id = %draft_id, revision = revision.revision, "Draft finalized");
        Ok(record.into_draft(revision))
    }

    /// Cancel a pending draft. Sent and already-cancelled drafts are returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::NotFound`] if the draft does not exist.
    pub async fn cancel(&self, draft_id: DraftId) -> DraftResult<Draft> {
        let _lock = self.lock(draft_id).await;

        let mut record = self.load_record(draft_id).await?;
        let revision = self.load_revision(draft_id, record.latest_revision).await?;
        if record.status != DraftStatus::Pending {
            debug!(draft_id = %draft_id, status = %record.status, "Cancel is a no-op");
            return Ok(record.into_draft(revision));
        }

        let now = Timestamp::now();
        record.status = DraftStatus::Cancelled;
        record.cancelled_at = Some(now);
        record.updated_at = now;
        self.kv.put_json(&record_key(draft_id), &record).await?;

        info!(draft_id = %draft_id, revision = revision.revision, "Draft cancelled");
        Ok(record.into_draft(revision))
    }

    /// Read one revision. Returns `None` if the draft has no such revision.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::NotFound`] if the draft does not exist.
    pub async fn revision(&self, draft_id: DraftId, revision: u32) -> DraftResult<Option<DraftRevision>> {
        let record = self.load_record(draft_id).await?;
        if revision == 0 || revision > record.latest_revision {
            return Ok(None);
        }
        self.load_revision(draft_id, revision).await.map(Some)
    }

    /// All revisions of a draft, oldest first.
    ///
    /// # Errors
    ///
    /// - [`DraftError::NotFound`] if the draft does not exist
    /// - [`DraftError::MissingRevision`] if the stored sequence has a gap
    pub async fn history(&self, draft_id: DraftId) -> DraftResult<Vec<DraftRevision>> {
        let record = self.load_record(draft_id).await?;
        let mut revisions = Vec::new();
        for n in 1..=record.latest_revision {
            revisions.push(self.load_revision(draft_id, n).await?);
        }
        Ok(revisions)
    }

    /// Every draft owned by a session, in any status, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::Storage`] if the backend fails.
    pub async fn list_for_session(&self, session_id: &SessionId) -> DraftResult<Vec<Draft>> {
        let prefix = session_prefix(session_id);
        let keys = self.kv.list_keys(&prefix).await?;

        let mut drafts = Vec::with_capacity(keys.len());
        for key in &keys {
            let Some(id) = key
                .strip_prefix(&prefix)
                .and_then(|raw| raw.parse::<DraftId>().ok())
            else {
                tracing::warn!(key = %key, "Skipping malformed session index entry");
                continue;
            };
            drafts.push(self.get_latest(id).await?);
        }
        drafts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(drafts)
    }

    /// Record a successful delivery for a sent draft.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::InvalidState`] unless the draft is `sent`.
    pub async fn record_delivered(&self, draft_id: DraftId, receipt: impl Into<String>) -> DraftResult<Draft> {
        let state = DeliveryState::Delivered {
            receipt: receipt.into(),
            at: Timestamp::now(),
        };
        self.update_delivery(draft_id, state).await
    }

    /// Record a failed delivery attempt for a sent draft. Status stays `sent`.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::InvalidState`] unless the draft is `sent`.
    pub async fn record_failed(&self, draft_id: DraftId, error: impl Into<String>) -> DraftResult<Draft> {
        let state = DeliveryState::Failed {
            error: error.into(),
            at: Timestamp::now(),
        };
        self.update_delivery(draft_id, state).await
    }

    async fn update_delivery(&self, draft_id: DraftId, state: DeliveryState) -> DraftResult<Draft> {
        let _lock = self.lock(draft_id).await;

        let mut record = self.load_record(draft_id).await?;
        if record.status != DraftStatus::Sent {
            return Err(DraftError::InvalidState {
                draft_id,
                status: record.status,
                operation: "record delivery for",
            });
        }
        let revision = self.load_revision(draft_id, record.latest_revision).await?;
        record.delivery = state;
        record.attempts = record.attempts.saturating_add(1);
        record.updated_at = Timestamp::now();
        self.kv.put_json(&record_key(draft_id), &record).await?;

        debug!(draft_id = %draft_id, attempts = record.attempts, "Delivery recorded");
        Ok(record.into_draft(revision))
    }
}

impl fmt::Debug for DraftStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DraftStore")
            .field("namespace", &self.kv.namespace())
            .field("locked_drafts", &self.locks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use despacho_core::{DuimpDraft, EmailDraft, FieldCorrection, PayloadField};

    fn email(subject: &str) -> ActionPayload {
        ActionPayload::Email(EmailDraft::new(["x@y.com"], subject).with_body("Hello"))
    }

    fn session() -> SessionId {
        SessionId::new("s1")
    }

    #[tokio::test]
    async fn test_create_starts_pending_at_revision_one() {
        let store = DraftStore::in_memory().unwrap();
        let draft = store.create(&session(), email("Meeting")).await.unwrap();
        assert_eq!(draft.revision, 1);
        assert_eq!(draft.status, DraftStatus::Pending);
        assert_eq!(draft.reason, RevisionReason::Initial);
        assert_eq!(draft.delivery, DeliveryState::NotAttempted);

        let latest = store.get_latest(draft.id).await.unwrap();
        assert_eq!(latest, draft);
    }

    #[tokio::test]
    async fn test_revisions_have_no_gaps() {
        let store = DraftStore::in_memory().unwrap();
        let draft = store.create(&session(), email("v1")).await.unwrap();
        for n in 2..=6u32 {
            let revised = store
                .revise(
                    draft.id,
                    email(&format!("v{n}")),
                    RevisionReason::Revised {
                        instruction: "improve it".into(),
                    },
                )
                .await
                .unwrap();
            assert_eq!(revised.revision, n);
            assert!(revised.is_pending());
        }

        let history = store.history(draft.id).await.unwrap();
        let numbers: Vec<u32> = history.iter().map(|r| r.revision).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(history[0].payload, email("v1"));
        assert_eq!(store.get_latest(draft.id).await.unwrap().payload, email("v6"));
        assert_eq!(
            store.revision(draft.id, 3).await.unwrap().unwrap().payload,
            email("v3")
        );
        assert!(store.revision(draft.id, 7).await.unwrap().is_none());
        assert!(store.revision(draft.id, 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_revisions_stay_contiguous() {
        let store = Arc::new(DraftStore::in_memory().unwrap());
        let draft = store.create(&session(), email("v1")).await.unwrap();

        let tasks = (0..16).map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .revise(
                        draft.id,
                        email(&format!("parallel {i}")),
                        RevisionReason::Revised {
                            instruction: format!("edit {i}"),
                        },
                    )
                    .await
                    .unwrap()
                    .revision
            })
        });
        let mut seen: Vec<u32> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (2..=17).collect::<Vec<_>>());
        assert_eq!(store.history(draft.id).await.unwrap().len(), 17);
        assert!(store.locks.is_empty());
    }

    #[tokio::test]
    async fn test_lock_table_is_emptied_after_transitions() {
        let store = DraftStore::in_memory().unwrap();
        for subject in ["a", "b", "c"] {
            let draft = store.create(&session(), email(subject)).await.unwrap();
            store
                .revise(
                    draft.id,
                    email(&format!("{subject} v2")),
                    RevisionReason::Revised {
                        instruction: "shorter".into(),
                    },
                )
                .await
                .unwrap();
            store.finalize(draft.id).await.unwrap();
            store.record_failed(draft.id, "smtp timeout").await.unwrap();
            store.cancel(draft.id).await.unwrap();
        }
        // Failed transitions release their entry too.
        assert!(store.finalize(DraftId::new()).await.is_err());

        assert!(store.locks.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_draft_is_not_found() {
        let store = DraftStore::in_memory().unwrap();
        let id = DraftId::new();
        assert!(matches!(
            store.revise(id, email("x"), RevisionReason::Initial).await,
            Err(DraftError::NotFound(missing)) if missing == id
        ));
        assert!(matches!(store.get_latest(id).await, Err(DraftError::NotFound(_))));
        assert!(matches!(store.finalize(id).await, Err(DraftError::NotFound(_))));
        assert!(matches!(store.cancel(id).await, Err(DraftError::NotFound(_))));
        assert!(matches!(store.history(id).await, Err(DraftError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_finalize_is_at_most_once() {
        let store = DraftStore::in_memory().unwrap();
        let draft = store.create(&session(), email("Meeting")).await.unwrap();

        let sent = store.finalize(draft.id).await.unwrap();
        assert!(sent.is_sent());
        assert!(sent.finalized_at.is_some());

        let err = store.finalize(draft.id).await.unwrap_err();
        assert!(matches!(
            err,
            DraftError::AlreadyFinalized { finalized_at, .. } if finalized_at == sent.finalized_at
        ));
        assert!(!err.is_invariant_violation());
    }

    #[tokio::test]
    async fn test_finalize_reads_latest_revision() {
        let store = DraftStore::in_memory().unwrap();
        let draft = store.create(&session(), email("Meeting")).await.unwrap();
        let corrected = draft
            .payload
            .apply_correction(&FieldCorrection::new(PayloadField::EmailRecipient, "z@y.com"))
            .unwrap();
        store
            .revise(
                draft.id,
                corrected.clone(),
                RevisionReason::Corrected {
                    field: PayloadField::EmailRecipient,
                },
            )
            .await
            .unwrap();

        let sent = store.finalize(draft.id).await.unwrap();
        assert_eq!(sent.revision, 2);
        assert_eq!(sent.payload, corrected);
    }

    #[tokio::test]
    async fn test_sent_draft_rejects_revision() {
        let store = DraftStore::in_memory().unwrap();
        let draft = store.create(&session(), email("Meeting")).await.unwrap();
        store.finalize(draft.id).await.unwrap();

        let err = store
            .revise(draft.id, email("late"), RevisionReason::Initial)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DraftError::InvalidState {
                status: DraftStatus::Sent,
                ..
            }
        ));
        assert!(err.is_invariant_violation());
    }

    #[tokio::test]
    async fn test_cancelled_draft_never_sent() {
        let store = DraftStore::in_memory().unwrap();
        let draft = store.create(&session(), email("Meeting")).await.unwrap();
        let cancelled = store.cancel(draft.id).await.unwrap();
        assert_eq!(cancelled.status, DraftStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        assert!(matches!(
            store.finalize(draft.id).await,
            Err(DraftError::InvalidState {
                status: DraftStatus::Cancelled,
                operation: "finalize",
                ..
            })
        ));
        assert!(matches!(
            store.revise(draft.id, email("x"), RevisionReason::Initial).await,
            Err(DraftError::InvalidState { .. })
        ));
        // Cancelling twice is harmless.
        assert_eq!(store.cancel(draft.id).await.unwrap().status, DraftStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_after_send_is_noop() {
        let store = DraftStore::in_memory().unwrap();
        let draft = store.create(&session(), email("Meeting")).await.unwrap();
        let sent = store.finalize(draft.id).await.unwrap();

        let after = store.cancel(draft.id).await.unwrap();
        assert_eq!(after, sent);
    }

    #[tokio::test]
    async fn test_revision_cannot_change_kind() {
        let store = DraftStore::in_memory().unwrap();
        let draft = store.create(&session(), email("Meeting")).await.unwrap();
        let duimp = ActionPayload::Duimp(DuimpDraft::new("12345678000195"));
        assert!(matches!(
            store.revise(draft.id, duimp, RevisionReason::Initial).await,
            Err(DraftError::KindMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_for_session_newest_first_and_isolated() {
        let store = DraftStore::in_memory().unwrap();
        let a = SessionId::new("a");
        let nested = SessionId::new("a/b");

        let first = store.create(&a, email("first")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = store.create(&a, email("second")).await.unwrap();
        store.finalize(first.id).await.unwrap();
        let other = store.create(&nested, email("other")).await.unwrap();

        let listed: Vec<DraftId> = store
            .list_for_session(&a)
            .await
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(listed, vec![second.id, first.id]);

        let nested_listed = store.list_for_session(&nested).await.unwrap();
        assert_eq!(nested_listed.len(), 1);
        assert_eq!(nested_listed[0].id, other.id);

        assert!(store.list_for_session(&SessionId::new("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_bookkeeping() {
        let store = DraftStore::in_memory().unwrap();
        let draft = store.create(&session(), email("Meeting")).await.unwrap();

        assert!(matches!(
            store.record_failed(draft.id, "boom").await,
            Err(DraftError::InvalidState {
                status: DraftStatus::Pending,
                ..
            })
        ));

        store.finalize(draft.id).await.unwrap();
        let failed = store.record_failed(draft.id, "relay timeout").await.unwrap();
        assert!(failed.is_sent());
        assert_eq!(failed.attempts, 1);
        assert!(matches!(failed.delivery, DeliveryState::Failed { ref error, .. } if error == "relay timeout"));

        let delivered = store.record_delivered(draft.id, "msg-42").await.unwrap();
        assert_eq!(delivered.attempts, 2);
        assert!(delivered.delivery.is_delivered());
        assert!(delivered.summary_line().contains("delivered (msg-42)"));
    }

    #[tokio::test]
    async fn test_state_is_read_from_backend() {
        let backend: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let writer = DraftStore::new(Arc::clone(&backend)).unwrap();
        let reader = DraftStore::new(backend).unwrap();

        let draft = writer.create(&session(), email("v1")).await.unwrap();
        writer
            .revise(
                draft.id,
                email("v2"),
                RevisionReason::Revised {
                    instruction: "shorter".into(),
                },
            )
            .await
            .unwrap();

        let seen = reader.get_latest(draft.id).await.unwrap();
        assert_eq!(seen.revision, 2);
        assert_eq!(seen.payload, email("v2"));
        assert!(seen.preview().contains("rev 2"));
    }
}
