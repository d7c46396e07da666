//! Numbered context blocks handed to the chat model

use std::fmt;

use crate::types::RankedDoc;

/// Appended to a snippet that was cut
pub const ELLIPSIS: &str = "...";

/// Separator between blocks
const BLOCK_SEPARATOR: &str = "\n\n";

/// One numbered, truncated document rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBlock {
    /// 1-based position in the context
    pub index: usize,
    /// Document id
    pub id: String,
    /// Possibly truncated document text
    pub snippet: String,
}

impl ContextBlock {
    pub fn new(index: usize, doc: &RankedDoc, max_chars: usize) -> Self {
        Self {
            index,
            id: doc.id.clone(),
            snippet: truncate_snippet(doc.text(), max_chars),
        }
    }
}

impl fmt::Display for ContextBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ({})\n{}", self.index, self.id, self.snippet)
    }
}

/// Keep the first `max_chars` characters, marking the cut with an ellipsis
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// One block per document, numbered from 1 in the given order
pub fn build_blocks(docs: &[RankedDoc], max_chars: usize) -> Vec<ContextBlock> {
    docs.iter()
        .enumerate()
        .map(|(i, doc)| ContextBlock::new(i + 1, doc, max_chars))
        .collect()
}

/// Blocks joined by a blank line
pub fn render_context(blocks: &[ContextBlock]) -> String {
    blocks
        .iter()
        .map(ContextBlock::to_string)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}
