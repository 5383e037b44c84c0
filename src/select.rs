//! Budgeted greedy chunk selection.
//!
//! Takes scored chunks and picks the best subset that fits a token budget.
//! Greedy by design: sort by score, take from the top until the budget or
//! the chunk cap is hit. Not globally optimal (this is not knapsack), but
//! deterministic and predictable, which matters more for prompt assembly.
//!
//! ## The two escape hatches
//!
//! Selection must never return nothing when it could return something:
//!
//! 1. If the single best candidate alone exceeds the budget, it is selected
//!    anyway, alone. A too-big answer beats no answer.
//! 2. If no candidate scores above zero, a bounded sample of at most 2
//!    chunks is returned (scores 0, `fallback` set) so the caller always
//!    has some context. The sample is drawn from a seeded RNG and emitted
//!    in document order, so tests and reruns see identical output.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::score::ScoredChunk;
use crate::Chunk;

/// Fallback sample size when nothing matches the query.
const FALLBACK_CHUNKS: usize = 2;

/// Seed for [`select`]'s internal fallback RNG. Callers who want a
/// different stream use [`select_with_rng`].
const DEFAULT_FALLBACK_SEED: u64 = 0;

/// Token budget derived from a model context window.
///
/// The budget for retrieved context is a fraction of the window (default
/// 65%), minus whatever the query and instructional preamble already
/// consume. The remainder of the window is headroom for the model's
/// completion.
///
/// ## Example
///
/// ```rust
/// use quarry::TokenBudget;
///
/// let budget = TokenBudget::new(10_000).reserve(500);
/// assert_eq!(budget.target(), 6_000); // 65% of 10k, minus 500
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenBudget {
    context_window: usize,
    fraction: f64,
    reserved: usize,
}

impl TokenBudget {
    /// Default share of the context window given to retrieved context.
    pub const DEFAULT_FRACTION: f64 = 0.65;

    /// Create a budget over a model context window, at the default fraction.
    #[must_use]
    pub const fn new(context_window: usize) -> Self {
        Self {
            context_window,
            fraction: Self::DEFAULT_FRACTION,
            reserved: 0,
        }
    }

    /// Use a custom fraction of the window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBudgetFraction`] unless `0 < fraction <= 1`.
    pub fn with_fraction(self, fraction: f64) -> Result<Self> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(Error::InvalidBudgetFraction(fraction));
        }
        Ok(Self { fraction, ..self })
    }

    /// Rebind this budget (same fraction and reservations) to a different
    /// context window.
    #[must_use]
    pub const fn at_window(self, context_window: usize) -> Self {
        Self {
            context_window,
            ..self
        }
    }

    /// Reserve tokens already spent on the query and preamble.
    #[must_use]
    pub const fn reserve(self, tokens: usize) -> Self {
        Self {
            reserved: self.reserved + tokens,
            ..self
        }
    }

    /// The target token budget for selected chunks.
    #[must_use]
    pub fn target(&self) -> usize {
        let share = (self.context_window as f64 * self.fraction) as usize;
        share.saturating_sub(self.reserved)
    }
}

/// Dynamic cap on selected chunk count, from query complexity.
///
/// A terse query ("what is X") is answered by one or two focused chunks;
/// a long multi-part question benefits from broader context. Monotonic and
/// saturating: 2 chunks at zero query tokens, +1 per 8 tokens, capped at 8.
#[must_use]
pub fn chunk_cap(query_tokens: usize) -> usize {
    (2 + query_tokens / 8).min(8)
}

/// A chunk chosen by selection, owned by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedChunk {
    /// The selected chunk (copied out of the corpus snapshot).
    pub chunk: Chunk,
    /// The relevance score it was selected with (0 on the fallback path).
    pub score: f64,
}

/// The outcome of one query's selection pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionResult {
    /// Selected chunks, highest score first (document order within ties and
    /// on the fallback path).
    pub selected: Vec<SelectedChunk>,
    /// Realized token total across `selected`.
    pub total_tokens: usize,
    /// True when nothing matched and the bounded random sample was used.
    /// This is the structured "no relevant content" signal.
    pub fallback: bool,
}

impl SelectionResult {
    /// Whether nothing at all was selected (empty corpus).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Distinct section headings of the selected chunks, in selection
    /// order. Feeds the caller's "sources used" citation list.
    #[must_use]
    pub fn headings(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for sel in &self.selected {
            if let Some(h) = sel.chunk.heading.as_deref() {
                if !seen.contains(&h) {
                    seen.push(h);
                }
            }
        }
        seen
    }

    /// Selected chunk texts joined with blank lines, ready to embed in a
    /// prompt.
    #[must_use]
    pub fn context_text(&self) -> String {
        self.selected
            .iter()
            .map(|s| s.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Select top-ranked chunks under `budget` tokens, at most `max_chunks`.
///
/// Uses a fixed-seed RNG for the no-match fallback; identical inputs always
/// produce byte-identical output.
#[must_use]
pub fn select(scored: &[ScoredChunk<'_>], budget: usize, max_chunks: usize) -> SelectionResult {
    let mut rng = StdRng::seed_from_u64(DEFAULT_FALLBACK_SEED);
    select_with_rng(scored, budget, max_chunks, &mut rng)
}

/// [`select`] with an injected randomness source for the fallback path.
pub fn select_with_rng<R: Rng>(
    scored: &[ScoredChunk<'_>],
    budget: usize,
    max_chunks: usize,
    rng: &mut R,
) -> SelectionResult {
    // Stable sort: ties keep original document order, so selection is
    // deterministic for identical inputs.
    let mut ranked: Vec<&ScoredChunk<'_>> = scored.iter().collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut selected = Vec::new();
    let mut total_tokens = 0;

    for cand in ranked {
        if cand.score <= 0.0 {
            break; // sorted descending: everything after is scoreless too
        }
        if selected.len() >= max_chunks {
            break;
        }
        if total_tokens + cand.chunk.token_count > budget {
            if selected.is_empty() {
                // Degenerate budget: the best candidate alone doesn't fit.
                // Select it anyway so a positive match is never dropped.
                total_tokens += cand.chunk.token_count;
                selected.push(SelectedChunk {
                    chunk: cand.chunk.clone(),
                    score: cand.score,
                });
            }
            break;
        }
        total_tokens += cand.chunk.token_count;
        selected.push(SelectedChunk {
            chunk: cand.chunk.clone(),
            score: cand.score,
        });
    }

    if !selected.is_empty() {
        return SelectionResult {
            selected,
            total_tokens,
            fallback: false,
        };
    }

    // No positive-score candidate anywhere: hand back a bounded sample so
    // the caller gets some context rather than none.
    let mut indices: Vec<usize> = (0..scored.len()).collect();
    indices.shuffle(rng);
    indices.truncate(FALLBACK_CHUNKS);
    indices.sort_unstable();

    let selected: Vec<SelectedChunk> = indices
        .into_iter()
        .map(|i| SelectedChunk {
            chunk: scored[i].chunk.clone(),
            score: 0.0,
        })
        .collect();
    let total_tokens = selected.iter().map(|s| s.chunk.token_count).sum();

    tracing::debug!(
        sampled = selected.len(),
        "no positive-score candidates, using fallback sample"
    );
    SelectionResult {
        fallback: !selected.is_empty(),
        selected,
        total_tokens,
    }
}
