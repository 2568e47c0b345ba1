//! Document parsing and serialization.
//!
//! One codec is currently supported: markdown documents with a YAML header
//! block and `[[target]]` cross-references ([`md`]). Shared helpers here
//! cover the display-form link markup and the content normalization used by
//! echo suppression.

pub mod md;

pub use md::{parse_document, serialize_node};

/// Managed document extension. Files without it are ignored by the watcher.
pub const DOC_EXTENSION: &str = "md";

/// Display-form delimiters substituted for `[[...]]` markup in stored
/// content. These are never re-parsed as references, so serialization can
/// regenerate the link list purely from a node's edges.
pub const DISPLAY_OPEN: char = '⟦';
pub const DISPLAY_CLOSE: char = '⟧';

/// Strip the managed document extension from a path segment, if present.
/// Id and reference normalization both route through this, so the extension
/// they recognize has a single definition.
pub fn strip_doc_extension(segment: &str) -> &str {
    segment
        .strip_suffix(DOC_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .unwrap_or(segment)
}

/// Remove display-form link delimiters, leaving the reference text behind.
pub fn strip_display_markers(text: &str) -> String {
    text.chars()
        .filter(|c| *c != DISPLAY_OPEN && *c != DISPLAY_CLOSE)
        .collect()
}

/// Normalize document text for echo-fingerprint comparison.
///
/// Whitespace and link markup are the only parts allowed to differ between
/// what was written and what a re-read of the same file parses back, so both
/// are dropped before comparing.
pub fn normalize_for_echo(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !c.is_whitespace()
                && *c != DISPLAY_OPEN
                && *c != DISPLAY_CLOSE
                && *c != '['
                && *c != ']'
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_ignores_whitespace_and_link_markup() {
        let written = "# Title\n\nsee ⟦topic⟧ for more\n";
        let reread = "# Title\nsee [[topic]] for more";
        assert_eq!(normalize_for_echo(written), normalize_for_echo(reread));
    }

    #[test]
    fn strip_display_markers_keeps_reference_text() {
        assert_eq!(strip_display_markers("see ⟦notes/topic⟧"), "see notes/topic");
    }

    #[test]
    fn strip_doc_extension_only_removes_the_managed_suffix() {
        assert_eq!(strip_doc_extension("topic.md"), "topic");
        assert_eq!(strip_doc_extension("topic"), "topic");
        assert_eq!(strip_doc_extension("topic.txt"), "topic.txt");
        assert_eq!(strip_doc_extension("topicmd"), "topicmd");
    }
}
