//! Double-submit suppression for post + action pairs

use crate::domain::PostId;
use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationAction {
    React,
    Save,
    Comment,
    Create,
    Update,
    Delete,
}

impl MutationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::React => "reaction",
            Self::Save => "save",
            Self::Comment => "comment",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// `None` post id covers actions without a post yet (create)
type PairKey = (Option<PostId>, MutationAction);

#[derive(Default)]
struct Registry {
    next_generation: u64,
    pending: HashMap<PairKey, u64>,
}

/// Tracks which post + action pairs have a request outstanding.
///
/// A pair admits one request at a time. Cancelling a pair invalidates its
/// ticket, so a late response for it is discarded.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(
        &self,
        post_id: Option<&PostId>,
        action: MutationAction,
    ) -> SyncResult<InFlightTicket> {
        let key = (post_id.cloned(), action);
        let mut registry = self.inner.lock();
        if registry.pending.contains_key(&key) {
            return Err(SyncError::InFlight(action.as_str()));
        }

        registry.next_generation += 1;
        let generation = registry.next_generation;
        registry.pending.insert(key.clone(), generation);

        Ok(InFlightTicket {
            registry: self.clone(),
            key,
            generation,
        })
    }

    pub fn is_pending(&self, post_id: Option<&PostId>, action: MutationAction) -> bool {
        self.inner
            .lock()
            .pending
            .contains_key(&(post_id.cloned(), action))
    }

    /// Forget the outstanding request for a pair. Returns true if one existed.
    pub fn cancel(&self, post_id: Option<&PostId>, action: MutationAction) -> bool {
        self.inner
            .lock()
            .pending
            .remove(&(post_id.cloned(), action))
            .is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }
}

/// Proof that a request owns its pair. Released on drop.
pub struct InFlightTicket {
    registry: InFlightRegistry,
    key: PairKey,
    generation: u64,
}

impl InFlightTicket {
    /// False once the pair was cancelled or re-issued
    pub fn is_current(&self) -> bool {
        self.registry.inner.lock().pending.get(&self.key) == Some(&self.generation)
    }
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        let mut registry = self.registry.inner.lock();
        if registry.pending.get(&self.key) == Some(&self.generation) {
            registry.pending.remove(&self.key);
        }
    }
}
