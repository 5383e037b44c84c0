//! # quarry
//!
//! Lexical context retrieval for retrieval-augmented generation (RAG)
//! prompts: carve a reference document into section-tagged chunks, rank
//! them against a query, and fit the best of them into a token budget.
//!
//! ## The Problem
//!
//! A documentation corpus is hundreds of thousands of tokens; a prompt gets
//! a slice of a context window. Shipping the whole document is impossible,
//! shipping the wrong fragment is worse. Picking the right fragments means
//! answering three questions well:
//!
//! - **Where to cut?** Mid-sentence chunks are garbage; chunks that span
//!   two topics match everything and answer nothing.
//! - **What's relevant?** "How do I run the tool" should find the Usage
//!   section, not every paragraph containing "the".
//! - **How much fits?** The budget depends on the model's window, the
//!   query, and the preamble around it.
//!
//! ## The Pipeline
//!
//! ```text
//! document ──> Structure Extractor ──> Chunker ──> CorpusStore (version K)
//!                (headings)          (sections >          │ snapshot
//!                                     paragraphs >        ▼
//! query ───────────────────────────> Relevance Scorer ──> Budgeted Selector
//!                                    (5 lexical signals)  (greedy, capped)
//!                                                         │
//!                                                         ▼
//!                                                   SelectionResult
//! ```
//!
//! Scoring is purely lexical — keyword frequency, TF-IDF, Jaro-Winkler
//! fuzzy matching, exact-phrase and heading bonuses — no embeddings, no
//! network, fully deterministic. That makes retrieval cheap enough to run
//! per keystroke and reproducible enough to test bit-for-bit.
//!
//! ## Quick Start
//!
//! ```rust
//! use quarry::{Retriever, RetrieverConfig};
//!
//! let retriever = Retriever::new(RetrieverConfig::default()).unwrap();
//! retriever.load_document(
//!     "## Setup\nInstall the tool.\n\n## Usage\nRun the tool with --flag.",
//! );
//!
//! let result = retriever.retrieve("how do I run the tool", 8_000);
//! for sel in &result.selected {
//!     println!("[{:?}] {}", sel.chunk.heading, sel.chunk.text);
//! }
//! // Section headings double as a "sources used" list; the best match
//! // comes first:
//! assert_eq!(result.headings()[0], "Usage");
//! ```
//!
//! Individual stages are usable on their own when you need finer control:
//!
//! ```rust
//! use quarry::{score, CorpusIndex, DocumentChunker, HeuristicCounter};
//!
//! let counter = HeuristicCounter;
//! let chunks = DocumentChunker::new(&counter, 512).chunk("Some document text.");
//! let index = CorpusIndex::build(&chunks);
//! let scored = score("document", &chunks, &index);
//! assert!(scored[0].score > 0.0);
//! ```
//!
//! ## Guarantees
//!
//! - **Lossless**: chunking never drops content. An atomic unit larger
//!   than the size limit is emitted oversized, not truncated.
//! - **Deterministic**: identical inputs produce identical chunks, scores,
//!   and selections — the no-match fallback sample included (seeded RNG).
//! - **Never fails at query time**: empty documents, empty queries, and
//!   zero-match corpora degrade to structured empty or fallback results.
//!   A missing exact tokenizer degrades to a length heuristic.
//! - **Snapshot-consistent**: a query runs against one immutable corpus
//!   version end to end, even if the document is reloaded mid-flight.
//!
//! ## Concurrency
//!
//! Chunking runs once per document load. Scoring fans out over rayon and
//! touches only read-only state; the corpus is published as an immutable
//! versioned snapshot ([`CorpusStore`]), so any number of queries can run
//! concurrently with each other and with reloads.

mod chunk;
mod chunker;
mod error;
mod retriever;
mod score;
mod select;
mod store;
mod structure;
mod token;

pub use chunk::Chunk;
pub use chunker::DocumentChunker;
pub use error::{Error, Result};
pub use retriever::{Retriever, RetrieverConfig};
pub use score::{score, CorpusIndex, ScoredChunk};
pub use select::{
    chunk_cap, select, select_with_rng, SelectedChunk, SelectionResult, TokenBudget,
};
pub use store::{Corpus, CorpusStore};
pub use structure::{extract_structure, Heading};
pub use token::{BpeCounter, HeuristicCounter, TokenCountCache, TokenCounter};
