//! Prompt context assembly.

use super::types::SearchResult;
use crate::config::ContextConfig;
use tracing::debug;

/// Appended to every passage, cut or not.
pub const TRUNCATION_MARKER: &str = "...";

/// Starts the line that names the document a passage came from.
pub const SOURCE_PREFIX: &str = "[source: ";

/// Concatenates the best retrieved passages into a bounded context string.
///
/// Only the first `max_documents` results are used and each passage is cut to
/// `max_chars_per_document` characters and followed by [`TRUNCATION_MARKER`].
/// Every passage is preceded by a line naming its source document:
///
/// ```text
/// [source: faq_020]
/// Refer a friend and get discounts....
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    max_documents: usize,
    max_chars_per_document: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::from_config(&ContextConfig::default())
    }
}

impl ContextAssembler {
    pub fn new(max_documents: usize, max_chars_per_document: usize) -> Self {
        Self {
            max_documents,
            max_chars_per_document,
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.max_documents, config.max_chars_per_document)
    }

    /// Builds the context string. An empty result gives an empty string.
    pub fn assemble(&self, results: &[SearchResult]) -> String {
        let mut context = String::new();

        for result in results.iter().take(self.max_documents) {
            if !context.is_empty() {
                context.push('\n');
            }
            context.push_str(SOURCE_PREFIX);
            context.push_str(&result.document.id);
            context.push_str("]\n");
            context.push_str(&truncate_chars(&result.document.text, self.max_chars_per_document));
            context.push('\n');
        }

        debug!(
            documents = results.len().min(self.max_documents),
            chars = context.chars().count(),
            "Assembled context"
        );
        context
    }

    /// Upper bound, in characters, of any context this assembler produces
    /// when no document id is longer than `max_id_chars`.
    pub fn max_len(&self, max_id_chars: usize) -> usize {
        let separator = SOURCE_PREFIX.chars().count() + max_id_chars + "]\n".len() + "\n".len();
        let per_document = self.max_chars_per_document + TRUNCATION_MARKER.len() + "\n".len();
        self.max_documents * (per_document + separator)
    }
}

/// Cuts `text` to at most `max_chars` characters and appends the marker.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    let end = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(byte_index, _)| byte_index);
    format!("{}{}", &text[..end], TRUNCATION_MARKER)
}
