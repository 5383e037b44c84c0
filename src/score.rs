//! Multi-signal lexical relevance scoring.
//!
//! Scores a query against every chunk with five independent signals, summed
//! with fixed weights:
//!
//! | Signal | What it rewards | Weight |
//! |--------|-----------------|--------|
//! | Keyword | Whole-word hits for query words longer than 3 chars | 1.0 |
//! | TF-IDF | Terms frequent here but rare across the corpus | 2.0 |
//! | Fuzzy | Near-miss terms (typos, inflections), Jaro-Winkler > 0.85 | 1.5 |
//! | Phrase | Literal occurrences of the whole query | 3.0 |
//! | Heading | Query words appearing in the section heading (+5 each) | 2.0 |
//!
//! Purely lexical by design: no embeddings, no model calls, no I/O. The
//! trade is recall on paraphrases for zero latency and full determinism —
//! identical inputs produce bit-identical scores. That determinism is why
//! per-chunk term tables iterate in sorted order: floating-point addition
//! is order-sensitive, and `HashMap` iteration order is not stable.
//!
//! Scoring a query against N chunks is an embarrassingly parallel map; it
//! fans out over rayon with the corpus index read-only throughout.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;

use crate::Chunk;

const KEYWORD_WEIGHT: f64 = 1.0;
const TFIDF_WEIGHT: f64 = 2.0;
const FUZZY_WEIGHT: f64 = 1.5;
const PHRASE_WEIGHT: f64 = 3.0;
const HEADING_WEIGHT: f64 = 2.0;

/// Per query word found in the heading, before `HEADING_WEIGHT`.
const HEADING_BONUS: f64 = 5.0;
/// Query words at or under this length are too common to signal anything.
const KEYWORD_MIN_LEN: usize = 4;
/// Fuzzy matching below this length drowns in false positives.
const FUZZY_MIN_LEN: usize = 4;
/// Jaro-Winkler similarity floor; only the excess above it scores.
const FUZZY_THRESHOLD: f64 = 0.85;

/// A chunk paired with its relevance score for one query.
///
/// Borrows the chunk from the corpus snapshot; lives only for the duration
/// of one query's selection pass.
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    /// The scored chunk.
    pub chunk: &'a Chunk,
    /// Non-negative composite relevance score.
    pub score: f64,
}

/// Precomputed term statistics over a chunk corpus.
///
/// Built once per document load, read-only for every query against that
/// snapshot. Term tables are sorted maps so scoring iterates them in a
/// stable order.
#[derive(Debug, Default)]
pub struct CorpusIndex {
    /// Term -> occurrence count, one table per chunk (parallel to the
    /// chunk sequence).
    term_freqs: Vec<BTreeMap<String, u32>>,
    /// Term -> number of chunks containing it.
    doc_freqs: HashMap<String, usize>,
    total_docs: usize,
}

impl CorpusIndex {
    /// Build the index for a chunk corpus.
    pub fn build(chunks: &[Chunk]) -> Self {
        let term_freqs: Vec<BTreeMap<String, u32>> = chunks
            .par_iter()
            .map(|chunk| {
                let mut freqs = BTreeMap::new();
                for term in terms(&chunk.text) {
                    *freqs.entry(term).or_insert(0) += 1;
                }
                freqs
            })
            .collect();

        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        for freqs in &term_freqs {
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
        }

        Self {
            doc_freqs,
            total_docs: chunks.len(),
            term_freqs,
        }
    }

    /// Number of chunks the index was built over.
    pub fn len(&self) -> usize {
        self.total_docs
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.total_docs == 0
    }

    /// `ln(N / df)`, 0 for terms present everywhere or nowhere.
    fn idf(&self, term: &str) -> f64 {
        let df = self.doc_freqs.get(term).copied().unwrap_or(0);
        if df == 0 {
            return 0.0;
        }
        (self.total_docs as f64 / df as f64).ln().max(0.0)
    }
}

/// Score every chunk against `query`.
///
/// Returns one entry per chunk, in chunk order. Scores are always >= 0; an
/// empty or stop-word-only query scores everything 0, which downstream
/// selection turns into the fallback path.
pub fn score<'a>(query: &str, chunks: &'a [Chunk], index: &CorpusIndex) -> Vec<ScoredChunk<'a>> {
    debug_assert_eq!(chunks.len(), index.term_freqs.len());

    let query_lower = query.trim().to_lowercase();
    let query_terms = terms(&query_lower).collect::<Vec<_>>();

    let scored: Vec<ScoredChunk<'a>> = chunks
        .par_iter()
        .zip(index.term_freqs.par_iter())
        .map(|(chunk, freqs)| ScoredChunk {
            chunk,
            score: score_one(&query_lower, &query_terms, chunk, freqs, index),
        })
        .collect();

    tracing::debug!(
        chunks = chunks.len(),
        max_score = scored.iter().map(|s| s.score).fold(0.0, f64::max),
        "scored query against corpus"
    );
    scored
}

fn score_one(
    query_lower: &str,
    query_terms: &[String],
    chunk: &Chunk,
    freqs: &BTreeMap<String, u32>,
    index: &CorpusIndex,
) -> f64 {
    let mut keyword = 0.0;
    let mut tfidf = 0.0;
    let mut fuzzy = 0.0;

    for term in query_terms {
        let tf = f64::from(freqs.get(term).copied().unwrap_or(0));

        if term.len() >= KEYWORD_MIN_LEN {
            keyword += tf;
        }
        if tf > 0.0 {
            tfidf += tf * index.idf(term);
        }

        if term.len() >= FUZZY_MIN_LEN {
            for candidate in freqs.keys().filter(|t| t.len() >= FUZZY_MIN_LEN) {
                let sim = strsim::jaro_winkler(term, candidate);
                if sim > FUZZY_THRESHOLD {
                    fuzzy += sim - FUZZY_THRESHOLD;
                }
            }
        }
    }

    let phrase = if query_lower.is_empty() {
        0.0
    } else {
        chunk.text.to_lowercase().matches(query_lower).count() as f64
    };

    let heading = chunk.heading.as_deref().map_or(0.0, |heading| {
        let heading_terms: Vec<String> = terms(&heading.to_lowercase()).collect();
        query_terms
            .iter()
            .filter(|t| t.len() >= KEYWORD_MIN_LEN && heading_terms.contains(t))
            .count() as f64
            * HEADING_BONUS
    });

    KEYWORD_WEIGHT * keyword
        + TFIDF_WEIGHT * tfidf
        + FUZZY_WEIGHT * fuzzy
        + PHRASE_WEIGHT * phrase
        + HEADING_WEIGHT * heading
}

/// Lowercased alphanumeric terms of `text`, in occurrence order.
fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, text: &str, heading: Option<&str>) -> Chunk {
        Chunk {
            text: text.to_string(),
            token_count: text.len().div_ceil(4),
            heading: heading.map(str::to_string),
            paragraphs: 0..1,
            index,
            is_sentence_chunk: false,
        }
    }

    fn score_all<'a>(query: &str, chunks: &'a [Chunk]) -> Vec<ScoredChunk<'a>> {
        let index = CorpusIndex::build(chunks);
        score(query, chunks, &index)
    }

    #[test]
    fn keyword_hits_raise_the_score() {
        let chunks = vec![
            chunk(0, "installation requires a license key", None),
            chunk(1, "unrelated prose about gardening", None),
        ];
        let scored = score_all("installation license", &chunks);
        assert!(scored[0].score > scored[1].score);
    }

    #[test]
    fn short_query_words_do_not_count_as_keywords() {
        let chunks = vec![chunk(0, "the cat sat on the mat", None)];
        // Every query word is <= 3 chars, and none are rare enough for
        // TF-IDF to matter in a single-chunk corpus (idf = ln(1/2) -> 0).
        let scored = score_all("the cat sat", &chunks);
        assert!(scored[0].score < 1.0e-9 + 3.0 * PHRASE_WEIGHT);
    }

    #[test]
    fn exact_phrase_outranks_scattered_words() {
        let chunks = vec![
            chunk(0, "to start the server run the tool from a shell", None),
            chunk(1, "the tool can run but you must start it and never the server", None),
        ];
        let scored = score_all("run the tool", &chunks);
        // Same words in both; only chunk 0 has the literal phrase.
        assert!(scored[0].score > scored[1].score);
    }

    #[test]
    fn heading_match_adds_a_bonus() {
        let chunks = vec![
            chunk(0, "do the thing with the settings", Some("Configuration")),
            chunk(1, "do the thing with the settings", None),
        ];
        let scored = score_all("configuration thing", &chunks);
        assert!(scored[0].score >= scored[1].score + HEADING_WEIGHT * HEADING_BONUS);
    }

    #[test]
    fn fuzzy_matching_catches_near_misses() {
        let chunks = vec![
            chunk(0, "the configuraton file lives in etc", None),
            chunk(1, "completely different words here entirely", None),
        ];
        // "configuration" vs misspelled "configuraton" only matches fuzzily.
        let scored = score_all("configuration", &chunks);
        assert!(scored[0].score > scored[1].score);
        assert!(scored[0].score > 0.0);
    }

    #[test]
    fn tfidf_prefers_rare_terms() {
        let chunks = vec![
            chunk(0, "widget widget widget common", None),
            chunk(1, "common common common common", None),
            chunk(2, "common words only here too", None),
        ];
        let scored = score_all("widget", &chunks);
        assert!(scored[0].score > scored[1].score);
        assert!(scored[0].score > scored[2].score);
    }

    #[test]
    fn scores_are_deterministic() {
        let chunks = vec![
            chunk(0, "alpha beta gamma delta epsilon", None),
            chunk(1, "gamma delta epsilon zeta eta", Some("Greek Letters")),
        ];
        let a = score_all("gamma epsilon letters", &chunks);
        let b = score_all("gamma epsilon letters", &chunks);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.score.to_bits(), y.score.to_bits());
        }
    }

    #[test]
    fn empty_query_scores_zero() {
        let chunks = vec![chunk(0, "some text", None)];
        let scored = score_all("", &chunks);
        assert_eq!(scored[0].score, 0.0);
    }

    #[test]
    fn empty_corpus_scores_nothing() {
        let scored = score_all("anything", &[]);
        assert!(scored.is_empty());
    }

    #[test]
    fn results_are_parallel_to_input_order() {
        let chunks: Vec<Chunk> = (0..16)
            .map(|i| chunk(i, &format!("chunk number {i} body text"), None))
            .collect();
        let scored = score_all("body", &chunks);
        for (i, s) in scored.iter().enumerate() {
            assert_eq!(s.chunk.index, i);
        }
    }
}
