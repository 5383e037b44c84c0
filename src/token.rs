//! Token counting.
//!
//! Chunk sizes and selection budgets are measured in language-model tokens,
//! so counting has to be cheap: it runs once per paragraph, sentence, and
//! chunk during chunking, and once per chunk during scoring.
//!
//! Two strategies:
//!
//! - [`BpeCounter`]: exact subword counts from a named tiktoken vocabulary
//!   (`cl100k_base`, `o200k_base`, or a model name like `gpt-4`).
//! - [`HeuristicCounter`]: `ceil(len / 4)`, the classic 4-chars-per-token
//!   approximation. Never fails, costs nothing.
//!
//! Counting itself can never fail. If the exact tokenizer is unavailable at
//! configuration time, [`BpeCounter::or_heuristic`] silently hands back the
//! heuristic and the pipeline carries on.

use std::collections::HashMap;
use std::sync::Arc;

use tiktoken_rs::{cl100k_base, get_bpe_from_model, o200k_base, CoreBPE};

use crate::error::{Error, Result};

/// A deterministic token counting strategy.
///
/// Implementations must be pure: the same text always yields the same count,
/// and the input is never mutated.
pub trait TokenCounter: Send + Sync {
    /// Count the tokens in `text`. Returns 0 for empty input.
    fn count(&self, text: &str) -> usize;
}

/// Character-length heuristic: `ceil(len / 4)`.
///
/// Within ~15% of real BPE counts on English prose, and free.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicCounter;

impl TokenCounter for HeuristicCounter {
    fn count(&self, text: &str) -> usize {
        text.len().div_ceil(4)
    }
}

/// Exact subword counter backed by a tiktoken BPE vocabulary.
pub struct BpeCounter {
    bpe: CoreBPE,
}

impl BpeCounter {
    /// Load a BPE vocabulary by model or encoding name (case-insensitive).
    ///
    /// Model names (`gpt-4`, `gpt-3.5-turbo`) are tried first, then encoding
    /// names (`cl100k_base`, `o200k_base`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedEncoding`] if the name is unknown or the
    /// vocabulary fails to load.
    pub fn new(model_or_encoding: &str) -> Result<Self> {
        let lower = model_or_encoding.to_ascii_lowercase();
        let bpe = match get_bpe_from_model(&lower) {
            Ok(b) => b,
            Err(_) => match lower.as_str() {
                "o200k_base" => o200k_base()
                    .map_err(|_| Error::UnsupportedEncoding(model_or_encoding.to_string()))?,
                "cl100k_base" => cl100k_base()
                    .map_err(|_| Error::UnsupportedEncoding(model_or_encoding.to_string()))?,
                _ => return Err(Error::UnsupportedEncoding(model_or_encoding.to_string())),
            },
        };
        Ok(Self { bpe })
    }

    /// Load a BPE vocabulary, degrading to [`HeuristicCounter`] on failure.
    ///
    /// This is the configuration-error policy: a missing tokenizer is never
    /// fatal to a request.
    pub fn or_heuristic(model_or_encoding: &str) -> Arc<dyn TokenCounter> {
        match Self::new(model_or_encoding) {
            Ok(counter) => Arc::new(counter),
            Err(err) => {
                tracing::warn!(%err, "exact tokenizer unavailable, using heuristic");
                Arc::new(HeuristicCounter)
            }
        }
    }
}

impl TokenCounter for BpeCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

impl std::fmt::Debug for BpeCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BpeCounter").finish_non_exhaustive()
    }
}

/// Per-pass memoization over a [`TokenCounter`].
///
/// Chunking asks for the same paragraph's count several times while deciding
/// where to close a chunk; this caches counts for the lifetime of one
/// chunking or scoring pass. Not shared across passes.
pub struct TokenCountCache<'a> {
    counter: &'a dyn TokenCounter,
    cache: HashMap<String, usize>,
}

impl<'a> TokenCountCache<'a> {
    /// Wrap a counter for one pass.
    pub fn new(counter: &'a dyn TokenCounter) -> Self {
        Self {
            counter,
            cache: HashMap::new(),
        }
    }

    /// Count `text`, consulting the cache first.
    pub fn count(&mut self, text: &str) -> usize {
        if let Some(&n) = self.cache.get(text) {
            return n;
        }
        let n = self.counter.count(text);
        self.cache.insert(text.to_string(), n);
        n
    }
}
