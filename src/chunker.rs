//! Section-aware document chunking.
//!
//! Splits a document into bounded-size chunks while respecting, in order of
//! preference: section boundaries, paragraph boundaries, sentence
//! boundaries. Never mid-word, and never dropping content.
//!
//! ## The Algorithm
//!
//! ```text
//! 1. Detect headings, carve the document into sections.
//!    (No headings? Cut coarse pseudo-sections of ~25k tokens at
//!    paragraph boundaries instead.)
//! 2. Split each section into paragraphs on blank lines.
//! 3. Greedily pack consecutive paragraphs into a chunk while the packed
//!    text stays within max_chunk_tokens; overflow closes the chunk.
//! 4. A single paragraph that alone exceeds the limit falls back to
//!    sentence-level packing (UAX #29 sentence bounds). Those chunks are
//!    tagged is_sentence_chunk.
//! 5. Emit chunks in document order, each carrying its section heading and
//!    paragraph range.
//! ```
//!
//! A single sentence larger than the limit is emitted as one oversized
//! chunk: the limit bends before content is lost.
//!
//! ## Why sections first?
//!
//! Retrieval quality lives and dies on chunk coherence. A chunk that
//! straddles "## Setup" and "## Usage" matches queries about both and
//! answers neither. Cutting at headings first means every chunk belongs to
//! exactly one topic, and the heading rides along as a relevance signal.

use unicode_segmentation::UnicodeSegmentation;

use crate::structure::extract_structure;
use crate::token::{TokenCountCache, TokenCounter};
use crate::Chunk;

/// Pseudo-section size for documents with no detectable headings.
const COARSE_SECTION_TOKENS: usize = 25_000;

/// Separator used when joining paragraphs back into chunk text.
const PARAGRAPH_JOIN: &str = "\n\n";

/// Section-aware chunker with a token-count size limit.
///
/// ## Example
///
/// ```rust
/// use quarry::{DocumentChunker, HeuristicCounter};
///
/// let counter = HeuristicCounter;
/// let chunker = DocumentChunker::new(&counter, 50);
/// let chunks = chunker.chunk("## Setup\nInstall the tool.\n\n## Usage\nRun it.");
///
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[0].heading.as_deref(), Some("Setup"));
/// assert_eq!(chunks[1].heading.as_deref(), Some("Usage"));
/// ```
pub struct DocumentChunker<'a> {
    counter: &'a dyn TokenCounter,
    max_chunk_tokens: usize,
}

/// A heading-delimited region of the document, pre-split into paragraphs.
struct Section {
    heading: Option<String>,
    paragraphs: Vec<String>,
}

impl<'a> DocumentChunker<'a> {
    /// Create a chunker.
    ///
    /// # Panics
    ///
    /// Panics if `max_chunk_tokens == 0`.
    #[must_use]
    pub fn new(counter: &'a dyn TokenCounter, max_chunk_tokens: usize) -> Self {
        assert!(max_chunk_tokens > 0, "max_chunk_tokens must be > 0");
        Self {
            counter,
            max_chunk_tokens,
        }
    }

    /// Split `text` into ordered, metadata-tagged chunks.
    ///
    /// An empty (or whitespace-only) document yields zero chunks.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return vec![];
        }

        let mut cache = TokenCountCache::new(self.counter);
        let sections = self.sections(text, &mut cache);

        let mut chunks = Vec::new();
        for section in &sections {
            self.chunk_section(section, &mut cache, &mut chunks);
        }

        tracing::debug!(
            sections = sections.len(),
            chunks = chunks.len(),
            "chunked document"
        );
        chunks
    }

    /// Partition the document into sections.
    fn sections(&self, text: &str, cache: &mut TokenCountCache<'_>) -> Vec<Section> {
        let headings = extract_structure(text);
        let lines: Vec<&str> = text.lines().collect();

        if headings.is_empty() {
            return coarse_sections(&lines, cache);
        }

        let mut sections = Vec::with_capacity(headings.len() + 1);

        // Preamble before the first heading belongs to an unheaded section.
        if headings[0].line > 0 {
            let paragraphs = split_paragraphs(&lines[..headings[0].line]);
            if !paragraphs.is_empty() {
                sections.push(Section {
                    heading: None,
                    paragraphs,
                });
            }
        }

        for (i, heading) in headings.iter().enumerate() {
            let end = headings
                .get(i + 1)
                .map_or(lines.len(), |next| next.line);
            let paragraphs = split_paragraphs(&lines[heading.line..end]);
            if !paragraphs.is_empty() {
                sections.push(Section {
                    heading: Some(heading.text.clone()),
                    paragraphs,
                });
            }
        }

        sections
    }

    /// Pack one section's paragraphs into chunks, appending to `out`.
    fn chunk_section(
        &self,
        section: &Section,
        cache: &mut TokenCountCache<'_>,
        out: &mut Vec<Chunk>,
    ) {
        let mut current = String::new();
        let mut current_tokens = 0;
        let mut range_start = 0;

        for (para_idx, paragraph) in section.paragraphs.iter().enumerate() {
            // An oversized paragraph can't be packed; flush what we have and
            // hand it to the sentence-level packer.
            if cache.count(paragraph) > self.max_chunk_tokens {
                if !current.is_empty() {
                    push_chunk(
                        out,
                        std::mem::take(&mut current),
                        current_tokens,
                        section.heading.clone(),
                        range_start..para_idx,
                        false,
                    );
                }
                self.chunk_sentences(paragraph, para_idx, section, cache, out);
                range_start = para_idx + 1;
                current_tokens = 0;
                continue;
            }

            let candidate = if current.is_empty() {
                paragraph.clone()
            } else {
                format!("{current}{PARAGRAPH_JOIN}{paragraph}")
            };
            let candidate_tokens = cache.count(&candidate);

            if candidate_tokens <= self.max_chunk_tokens {
                current = candidate;
                current_tokens = candidate_tokens;
            } else {
                push_chunk(
                    out,
                    std::mem::take(&mut current),
                    current_tokens,
                    section.heading.clone(),
                    range_start..para_idx,
                    false,
                );
                current_tokens = cache.count(paragraph);
                current = paragraph.clone();
                range_start = para_idx;
            }
        }

        if !current.is_empty() {
            push_chunk(
                out,
                current,
                current_tokens,
                section.heading.clone(),
                range_start..section.paragraphs.len(),
                false,
            );
        }
    }

    /// Sentence-level packing for a paragraph that alone exceeds the limit.
    fn chunk_sentences(
        &self,
        paragraph: &str,
        para_idx: usize,
        section: &Section,
        cache: &mut TokenCountCache<'_>,
        out: &mut Vec<Chunk>,
    ) {
        let sentences: Vec<&str> = paragraph
            .split_sentence_bounds()
            .filter(|s| !s.trim().is_empty())
            .collect();

        let mut current = String::new();
        let mut current_tokens = 0;

        for sentence in sentences {
            let candidate = if current.is_empty() {
                sentence.trim_start().to_string()
            } else {
                format!("{current}{sentence}")
            };
            let candidate_tokens = cache.count(&candidate);

            if candidate_tokens <= self.max_chunk_tokens || current.is_empty() {
                // A lone sentence over the limit is emitted as-is: the size
                // bound yields before content does.
                current = candidate;
                current_tokens = candidate_tokens;
                if current_tokens > self.max_chunk_tokens {
                    push_chunk(
                        out,
                        std::mem::take(&mut current),
                        current_tokens,
                        section.heading.clone(),
                        para_idx..para_idx + 1,
                        true,
                    );
                    current_tokens = 0;
                }
            } else {
                push_chunk(
                    out,
                    std::mem::take(&mut current),
                    current_tokens,
                    section.heading.clone(),
                    para_idx..para_idx + 1,
                    true,
                );
                current = sentence.trim_start().to_string();
                current_tokens = cache.count(&current);
            }
        }

        if !current.is_empty() {
            push_chunk(
                out,
                current,
                current_tokens,
                section.heading.clone(),
                para_idx..para_idx + 1,
                true,
            );
        }
    }
}

/// Append a chunk, assigning the next document-wide index.
fn push_chunk(
    out: &mut Vec<Chunk>,
    text: String,
    token_count: usize,
    heading: Option<String>,
    paragraphs: std::ops::Range<usize>,
    is_sentence_chunk: bool,
) {
    let index = out.len();
    out.push(Chunk {
        text,
        token_count,
        heading,
        paragraphs,
        index,
        is_sentence_chunk,
    });
}

/// Group consecutive non-blank lines into paragraphs, discarding empties.
fn split_paragraphs(lines: &[&str]) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in lines {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs
}

/// Headingless fallback: cut unheaded pseudo-sections of roughly
/// [`COARSE_SECTION_TOKENS`] at paragraph boundaries.
fn coarse_sections(lines: &[&str], cache: &mut TokenCountCache<'_>) -> Vec<Section> {
    let paragraphs = split_paragraphs(lines);
    if paragraphs.is_empty() {
        return vec![];
    }

    let mut sections = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_tokens = 0;

    for paragraph in paragraphs {
        let tokens = cache.count(&paragraph);
        if current_tokens + tokens > COARSE_SECTION_TOKENS && !current.is_empty() {
            sections.push(Section {
                heading: None,
                paragraphs: std::mem::take(&mut current),
            });
            current_tokens = 0;
        }
        current_tokens += tokens;
        current.push(paragraph);
    }
    if !current.is_empty() {
        sections.push(Section {
            heading: None,
            paragraphs: current,
        });
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeuristicCounter;

    fn chunker(counter: &HeuristicCounter, max: usize) -> DocumentChunker<'_> {
        DocumentChunker::new(counter, max)
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let counter = HeuristicCounter;
        assert!(chunker(&counter, 50).chunk("").is_empty());
        assert!(chunker(&counter, 50).chunk("  \n\n  \t").is_empty());
    }

    #[test]
    #[should_panic(expected = "max_chunk_tokens")]
    fn zero_chunk_size_panics() {
        let counter = HeuristicCounter;
        let _ = DocumentChunker::new(&counter, 0);
    }

    #[test]
    fn sections_become_separate_chunks() {
        let counter = HeuristicCounter;
        let text = "## Setup\nInstall the tool.\n\n## Usage\nRun the tool with --flag.";
        let chunks = chunker(&counter, 50).chunk(text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].heading.as_deref(), Some("Setup"));
        assert_eq!(chunks[1].heading.as_deref(), Some("Usage"));
        assert!(chunks[0].text.contains("Install"));
        assert!(chunks[1].text.contains("--flag"));
    }

    #[test]
    fn preamble_before_first_heading_is_unheaded() {
        let counter = HeuristicCounter;
        let text = "intro text before any heading\n\n## First\nbody";
        let chunks = chunker(&counter, 100).chunk(text);

        assert_eq!(chunks[0].heading, None);
        assert!(chunks[0].text.contains("intro"));
        assert_eq!(chunks[1].heading.as_deref(), Some("First"));
    }

    #[test]
    fn paragraphs_pack_greedily_under_the_limit() {
        let counter = HeuristicCounter;
        // Each paragraph is ~6 tokens; limit 20 fits three per chunk at most.
        let text = "## Sec\naaaa bbbb cccc dddd.\n\naaaa bbbb cccc dddd.\n\naaaa bbbb cccc dddd.\n\naaaa bbbb cccc dddd.";
        let chunks = chunker(&counter, 20).chunk(text);

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.token_count <= 20);
        }
        // Ranges tile the section's paragraph list without gaps.
        assert_eq!(chunks[0].paragraphs.start, 0);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].paragraphs.end, pair[1].paragraphs.start);
        }
    }

    #[test]
    fn oversized_paragraph_splits_into_sentences() {
        let counter = HeuristicCounter;
        let sentence = "This sentence is about twelve tokens long give or take a few. ";
        let paragraph = sentence.repeat(10);
        let chunks = chunker(&counter, 30).chunk(&paragraph);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.is_sentence_chunk);
        }
    }

    #[test]
    fn oversized_single_sentence_is_emitted_whole() {
        let counter = HeuristicCounter;
        let sentence = format!("{} end.", "word ".repeat(200));
        let chunks = chunker(&counter, 10).chunk(&sentence);

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_sentence_chunk);
        assert!(chunks[0].token_count > 10);
    }

    #[test]
    fn no_paragraph_breaks_falls_through_to_sentences() {
        let counter = HeuristicCounter;
        let text = "First sentence here. Second sentence here. Third sentence here. Fourth sentence here.";
        let chunks = chunker(&counter, 10).chunk(text);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.is_sentence_chunk));
    }

    #[test]
    fn chunk_indices_are_monotonic() {
        let counter = HeuristicCounter;
        let text = "## A\none two three four five six seven.\n\n## B\neight nine ten eleven twelve.";
        let chunks = chunker(&counter, 8).chunk(text);

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn chunking_is_idempotent() {
        let counter = HeuristicCounter;
        let text = "## Setup\nInstall the tool.\n\nMore setup prose here.\n\n## Usage\nRun the tool.";
        let c = chunker(&counter, 15);
        assert_eq!(c.chunk(text), c.chunk(text));
    }

    #[test]
    fn coverage_is_lossless_modulo_whitespace() {
        let counter = HeuristicCounter;
        let text = "## One\nalpha beta gamma.\n\ndelta epsilon zeta.\n\n## Two\neta theta iota.";
        let chunks = chunker(&counter, 10).chunk(text);

        let rebuilt: String = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        for word in ["alpha", "delta", "zeta", "theta", "##"] {
            assert!(rebuilt.contains(word), "lost {word:?}");
        }
    }

    #[test]
    fn headingless_document_still_chunks() {
        let counter = HeuristicCounter;
        let text = "plain paragraph one.\n\nplain paragraph two.\n\nplain paragraph three.";
        let chunks = chunker(&counter, 8).chunk(text);

        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.heading.is_none()));
    }
}
