// ABOUTME: Submission table - per-key sequence counters, live submissions and execution locks.
// ABOUTME: All inserts, increments and removals happen under one short critical section.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ProcessorError;

/// Execution lock for one active key.
///
/// Serializes operation runs for the key. Lives exactly as long as the table
/// entry; a key that goes inactive and comes back gets a new slot.
#[derive(Debug, Default)]
pub(crate) struct KeySlot {
    exclusive: tokio::sync::Mutex<()>,
}

impl KeySlot {
    /// The per-key execution lock.
    pub(crate) fn exclusive(&self) -> &tokio::sync::Mutex<()> {
        &self.exclusive
    }
}

/// Bookkeeping for one active key.
#[derive(Default)]
struct Entry {
    slot: Arc<KeySlot>,
    /// Last sequence number handed out.
    issued: u64,
    /// Highest sequence number that was allowed to run.
    claimed: u64,
    /// Submissions that are still queued, waiting, or running.
    live: BTreeSet<u64>,
}

struct TableState<K> {
    entries: HashMap<K, Entry>,
    closed: bool,
}

impl<K: Eq + Hash> TableState<K> {
    /// The entry for `key` if it still belongs to `slot`.
    fn entry_for(&mut self, key: &K, slot: &Arc<KeySlot>) -> Option<&mut Entry> {
        self.entries
            .get_mut(key)
            .filter(|entry| Arc::ptr_eq(&entry.slot, slot))
    }
}

/// Mapping from key to its active slot, owned by one processor.
///
/// A key is present iff at least one submission for it is queued, waiting
/// for the key's lock, or running.
pub(crate) struct SubmissionTable<K> {
    state: Mutex<TableState<K>>,
}

impl<K> SubmissionTable<K>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(TableState {
                entries: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// Count a new submission for `key`.
    ///
    /// Creates the entry if the key is not active. The returned ticket keeps
    /// the submission live until it is dropped, whatever path it takes.
    /// Fails with `ProcessorError::Closed` once the table has been closed.
    pub(crate) fn register(self: &Arc<Self>, key: K) -> Result<Ticket<K>, ProcessorError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ProcessorError::Closed);
        }

        let entry = state.entries.entry(key.clone()).or_default();
        entry.issued += 1;
        let seq = entry.issued;
        entry.live.insert(seq);
        let slot = Arc::clone(&entry.slot);
        drop(state);

        Ok(Ticket {
            table: Arc::clone(self),
            key,
            slot,
            seq,
        })
    }

    /// Decide whether `seq` may run now.
    ///
    /// A submission runs iff nothing newer has run and no newer submission is
    /// still live. Must be called while holding the slot's execution lock.
    fn claim(&self, key: &K, slot: &Arc<KeySlot>, seq: u64) -> bool {
        let mut state = self.state.lock();
        let Some(entry) = state.entry_for(key, slot) else {
            return false;
        };
        if seq <= entry.claimed || entry.live.range(seq + 1..).next().is_some() {
            return false;
        }
        entry.claimed = seq;
        true
    }

    /// Retire `seq`, removing the key once nothing for it is live.
    ///
    /// Returns true if the entry was removed.
    fn retire(&self, key: &K, slot: &Arc<KeySlot>, seq: u64) -> bool {
        let mut state = self.state.lock();
        let Some(entry) = state.entry_for(key, slot) else {
            return false;
        };
        entry.live.remove(&seq);
        if !entry.live.is_empty() {
            return false;
        }
        state.entries.remove(key);
        true
    }

    /// Refuse all further registrations. Returns false if already closed.
    pub(crate) fn close(&self) -> bool {
        let mut state = self.state.lock();
        !std::mem::replace(&mut state.closed, true)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of active keys.
    pub(crate) fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.state.lock().entries.contains_key(key)
    }
}

/// One counted submission.
///
/// Dropping the ticket retires the submission: after a skip, after a run
/// (ok, error or panic), when a waiting caller is cancelled, or when the
/// task holding it is dropped unrun.
pub(crate) struct Ticket<K>
where
    K: Eq + Hash + Clone,
{
    table: Arc<SubmissionTable<K>>,
    key: K,
    slot: Arc<KeySlot>,
    seq: u64,
}

impl<K> Ticket<K>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn key(&self) -> &K {
        &self.key
    }

    pub(crate) fn slot(&self) -> &Arc<KeySlot> {
        &self.slot
    }

    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    /// See [`SubmissionTable::claim`].
    pub(crate) fn claim(&self) -> bool {
        self.table.claim(&self.key, &self.slot, self.seq)
    }
}

impl<K> Drop for Ticket<K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        if self.table.retire(&self.key, &self.slot, self.seq) {
            tracing::trace!(seq = self.seq, "coalesce.release");
        }
    }
}
