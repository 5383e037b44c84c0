//! The end-to-end retrieval pipeline.
//!
//! One parameterized pipeline replaces what would otherwise be scattered
//! glue: Tokenizer -> Structure Extractor -> Chunker -> Scorer -> Selector,
//! each stage behind its own narrow seam so any one can be swapped without
//! touching callers.
//!
//! ```text
//! load_document(text)           retrieve(query, window)
//!   structure + chunk              snapshot (version K, held throughout)
//!   publish snapshot K+1           score chunks x query   (rayon)
//!                                  select under budget
//!                                  SelectionResult
//! ```
//!
//! The pipeline performs no I/O and never blocks: document fetching and the
//! model call are the caller's business.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::chunker::DocumentChunker;
use crate::error::Result;
use crate::select::{chunk_cap, select_with_rng, SelectionResult, TokenBudget};
use crate::store::{Corpus, CorpusStore};
use crate::token::{BpeCounter, HeuristicCounter, TokenCounter};
use crate::{score, Error};

/// Configuration for a [`Retriever`].
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Maximum tokens per chunk. Default 2000.
    pub max_chunk_tokens: usize,
    /// Share of the context window given to retrieved context. Default 0.65.
    pub budget_fraction: f64,
    /// Tiktoken model or encoding name for exact counting; `None` uses the
    /// 4-chars-per-token heuristic. An unknown name degrades to the
    /// heuristic rather than failing.
    pub encoding: Option<String>,
    /// Seed for the no-match fallback sample. Fixed so reruns reproduce.
    pub fallback_seed: u64,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: 2_000,
            budget_fraction: TokenBudget::DEFAULT_FRACTION,
            encoding: None,
            fallback_seed: 0,
        }
    }
}

/// Chunks a reference document and answers queries with budget-fitted,
/// relevance-ranked context.
///
/// Cheap to share behind an `Arc`; `load_document` and `retrieve` both take
/// `&self` and may run concurrently.
///
/// ## Example
///
/// ```rust
/// use quarry::{Retriever, RetrieverConfig};
///
/// let retriever = Retriever::new(RetrieverConfig::default()).unwrap();
/// retriever.load_document("## Setup\nInstall the tool.\n\n## Usage\nRun the tool with --flag.");
///
/// let result = retriever.retrieve("how do I run the tool", 8_000);
/// assert!(!result.is_empty());
/// assert_eq!(result.headings()[0], "Usage");
/// ```
pub struct Retriever {
    counter: Arc<dyn TokenCounter>,
    store: CorpusStore,
    max_chunk_tokens: usize,
    budget: TokenBudget,
    fallback_seed: u64,
}

impl Retriever {
    /// Build a retriever from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidChunkSize`] or
    /// [`Error::InvalidBudgetFraction`] for out-of-range settings. A missing
    /// exact tokenizer is not an error; it degrades to the heuristic.
    pub fn new(config: RetrieverConfig) -> Result<Self> {
        if config.max_chunk_tokens == 0 {
            return Err(Error::InvalidChunkSize(0));
        }
        let budget = TokenBudget::new(0).with_fraction(config.budget_fraction)?;
        let counter: Arc<dyn TokenCounter> = match &config.encoding {
            Some(name) => BpeCounter::or_heuristic(name),
            None => Arc::new(HeuristicCounter),
        };
        Ok(Self {
            counter,
            store: CorpusStore::new(),
            max_chunk_tokens: config.max_chunk_tokens,
            budget,
            fallback_seed: config.fallback_seed,
        })
    }

    /// Chunk `text` and publish it as the new corpus snapshot.
    ///
    /// Queries already in flight keep the snapshot they started with. An
    /// empty document publishes an empty corpus (not an error).
    pub fn load_document(&self, text: &str) -> Arc<Corpus> {
        let chunker = DocumentChunker::new(self.counter.as_ref(), self.max_chunk_tokens);
        let chunks = chunker.chunk(text);
        tracing::info!(bytes = text.len(), chunks = chunks.len(), "loaded document");
        self.store.publish(chunks)
    }

    /// The current corpus snapshot.
    #[must_use]
    pub fn corpus(&self) -> Arc<Corpus> {
        self.store.snapshot()
    }

    /// Retrieve the most relevant context for `query` within
    /// `context_window` tokens.
    ///
    /// The token budget is the configured fraction of the window minus the
    /// query's own tokens. Callers whose prompt preamble consumes further
    /// tokens should use [`retrieve_with_reserved`](Self::retrieve_with_reserved).
    #[must_use]
    pub fn retrieve(&self, query: &str, context_window: usize) -> SelectionResult {
        self.retrieve_with_reserved(query, context_window, 0)
    }

    /// [`retrieve`](Self::retrieve), additionally reserving
    /// `reserved_tokens` for the caller's instructional preamble.
    #[must_use]
    pub fn retrieve_with_reserved(
        &self,
        query: &str,
        context_window: usize,
        reserved_tokens: usize,
    ) -> SelectionResult {
        let corpus = self.store.snapshot();
        if corpus.is_empty() {
            tracing::debug!("retrieve against empty corpus");
            return SelectionResult::default();
        }

        let query_tokens = self.counter.count(query);
        let budget = self
            .budget
            .at_window(context_window)
            .reserve(query_tokens + reserved_tokens);
        let cap = chunk_cap(query_tokens);

        let scored = score::score(query, corpus.chunks(), corpus.index());
        let mut rng = StdRng::seed_from_u64(self.fallback_seed);
        let result = select_with_rng(&scored, budget.target(), cap, &mut rng);

        tracing::debug!(
            corpus_version = corpus.version(),
            budget = budget.target(),
            cap,
            selected = result.selected.len(),
            total_tokens = result.total_tokens,
            fallback = result.fallback,
            "retrieved context"
        );
        result
    }
}
