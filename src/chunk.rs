//! The Chunk type: a document fragment with section metadata.

/// A bounded fragment of the source document, tagged with the section it was
/// carved from.
///
/// Chunks are produced once per document load and read many times across
/// queries, so they own their text and are never mutated after creation.
///
/// ## Metadata
///
/// - `heading`: the owning section's heading, if the section had one. Used
///   for the heading-bonus relevance signal and for "sources used" citation
///   lists.
/// - `paragraphs`: the half-open range of paragraph indices (within the
///   section) this chunk covers. For sentence-level chunks the range covers
///   the single oversized paragraph the sentences came from.
/// - `index`: zero-based position in the document-wide chunk sequence.
///   Monotonically increasing; ties in relevance are broken by it so
///   selection stays deterministic.
///
/// ## Size invariant
///
/// `token_count <= max_chunk_tokens` for every chunk, except those marked
/// [`is_sentence_chunk`](Self::is_sentence_chunk) that wrap a single atomic
/// unit larger than the limit. Content is never dropped to enforce the
/// limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text.
    pub text: String,
    /// Token count of `text`, per the pipeline's configured counter.
    pub token_count: usize,
    /// Heading of the owning section, if any.
    pub heading: Option<String>,
    /// Paragraph-index range within the owning section (half-open).
    pub paragraphs: std::ops::Range<usize>,
    /// Zero-based index in the document-wide chunk sequence.
    pub index: usize,
    /// True if this chunk was produced by sentence-level splitting of an
    /// oversized paragraph.
    pub is_sentence_chunk: bool,
}

impl Chunk {
    /// The length of this chunk's text in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether this chunk is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl std::fmt::Display for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunk {{ index: {}, tokens: {}, heading: {:?} }}",
            self.index, self.token_count, self.heading
        )
    }
}
