//! Versioned corpus snapshots.
//!
//! The chunk corpus is built once per document load and read by many
//! concurrent queries. Rather than ambient global state, the store is an
//! explicit owned handle with a copy-on-write discipline:
//!
//! ```text
//! publish(chunks) ── builds index ──> Arc<Corpus> (version K+1)
//!                                        │ swap under write lock
//! snapshot() ──> Arc<Corpus> (version K) ┘
//! ```
//!
//! A query grabs a snapshot once and keeps that `Arc` for its entire
//! scoring/selection pass. A rebuild in the meantime publishes a new
//! version; it never mutates the snapshot in-flight readers hold.

use std::sync::{Arc, PoisonError, RwLock};

use crate::score::CorpusIndex;
use crate::Chunk;

/// An immutable chunk corpus plus its precomputed term index.
#[derive(Debug, Default)]
pub struct Corpus {
    version: u64,
    chunks: Vec<Chunk>,
    index: CorpusIndex,
}

impl Corpus {
    /// Monotonic version of this snapshot. Version 0 is the empty corpus a
    /// fresh store starts with.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The chunks, in document order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The precomputed term statistics for scoring.
    #[must_use]
    pub fn index(&self) -> &CorpusIndex {
        &self.index
    }

    /// Number of chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the corpus holds no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Owner of the current corpus snapshot.
///
/// Cheap to share (`Arc<CorpusStore>`); all methods take `&self`.
#[derive(Debug, Default)]
pub struct CorpusStore {
    current: RwLock<Arc<Corpus>>,
}

impl CorpusStore {
    /// Create a store holding the empty corpus (version 0).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot. Hold the `Arc` for the duration of one query.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Corpus> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Build and publish a new corpus version from freshly chunked content.
    ///
    /// In-flight queries keep whatever snapshot they already hold; new
    /// queries see the new version.
    pub fn publish(&self, chunks: Vec<Chunk>) -> Arc<Corpus> {
        let index = CorpusIndex::build(&chunks);
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(Corpus {
            version: guard.version + 1,
            chunks,
            index,
        });
        *guard = next.clone();
        tracing::info!(
            version = next.version,
            chunks = next.len(),
            "published corpus snapshot"
        );
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            token_count: text.len().div_ceil(4),
            heading: None,
            paragraphs: 0..1,
            index,
            is_sentence_chunk: false,
        }
    }

    #[test]
    fn fresh_store_is_empty_at_version_zero() {
        let store = CorpusStore::new();
        let snap = store.snapshot();
        assert_eq!(snap.version(), 0);
        assert!(snap.is_empty());
    }

    #[test]
    fn publish_bumps_the_version() {
        let store = CorpusStore::new();
        let v1 = store.publish(vec![chunk(0, "alpha")]);
        assert_eq!(v1.version(), 1);
        let v2 = store.publish(vec![chunk(0, "beta"), chunk(1, "gamma")]);
        assert_eq!(v2.version(), 2);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn old_snapshots_survive_a_republish() {
        let store = CorpusStore::new();
        store.publish(vec![chunk(0, "old content")]);
        let held = store.snapshot();

        store.publish(vec![chunk(0, "new"), chunk(1, "content")]);

        // The held snapshot is unchanged; the store moved on.
        assert_eq!(held.version(), 1);
        assert_eq!(held.len(), 1);
        assert_eq!(held.chunks()[0].text, "old content");
        assert_eq!(store.snapshot().version(), 2);
    }

    #[test]
    fn snapshots_are_shared_not_copied() {
        let store = CorpusStore::new();
        store.publish(vec![chunk(0, "shared")]);
        let a = store.snapshot();
        let b = store.snapshot();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
