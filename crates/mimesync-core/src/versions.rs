use std::sync::{PoisonError, RwLock};

use crate::{SourceId, VersionMap};

/// Last-seen version token (`ETag` or `Last-Modified`) for every source.
#[derive(Debug)]
pub struct VersionStore {
    tokens: RwLock<VersionMap>,
}

impl VersionStore {
    /// A store with every known source present and no token recorded.
    #[must_use]
    pub fn new() -> Self {
        let tokens = SourceId::ALL.into_iter().map(|id| (id, None)).collect();
        Self {
            tokens: RwLock::new(tokens),
        }
    }

    /// Restore from a persisted snapshot; sources missing from it stay absent.
    #[must_use]
    pub fn from_snapshot(snapshot: &VersionMap) -> Self {
        let store = Self::new();
        {
            let mut tokens = store.tokens.write().unwrap_or_else(PoisonError::into_inner);
            for (id, token) in snapshot {
                tokens.insert(*id, token.clone());
            }
        }
        store
    }

    /// Recorded token for `id`.
    #[must_use]
    pub fn get(&self, id: SourceId) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .flatten()
    }

    /// Record a token; returns whether it differs from the previous one.
    ///
    /// Call only after the feed this token belongs to has been merged.
    pub fn set(&self, id: SourceId, token: Option<String>) -> bool {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        let previous = tokens.insert(id, token.clone()).flatten();
        previous != token
    }

    /// Copy of every recorded token.
    #[must_use]
    pub fn snapshot(&self) -> VersionMap {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for VersionStore {
    fn default() -> Self {
        Self::new()
    }
}
