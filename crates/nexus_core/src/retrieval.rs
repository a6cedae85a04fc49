//! crates/nexus_core/src/retrieval.rs
//!
//! The keyword-based retrieval engine backing the document-retrieval tool.
//!
//! Deterministic and synchronous: a case-insensitive literal substring match
//! over the current snapshot, no relevance ordering beyond the snapshot's
//! natural order.

use crate::domain::Document;

/// Maximum number of matched documents folded into one context blob.
pub const MAX_CONTEXT_DOCUMENTS: usize = 3;

/// Fixed payload returned when no document matches the query.
pub const NO_RESULTS_SENTINEL: &str =
    "No relevant documents were found in the private document store.";

/// Builds the tool-result context blob for a free-text query.
///
/// A document matches when the query is a case-insensitive substring of its
/// title or its content. The first [`MAX_CONTEXT_DOCUMENTS`] matches are
/// rendered as `## title` + content blocks joined by blank lines. The output
/// is inert data: it is only ever substituted into the next request context
/// as a tool-result value.
///
/// An empty (or whitespace-only) query matches nothing. Without this guard
/// the substring check would accept every document, since `""` is a substring
/// of any string.
pub fn retrieve_document_context(documents: &[Document], query: &str) -> String {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return NO_RESULTS_SENTINEL.to_string();
    }

    let blocks: Vec<String> = documents
        .iter()
        .filter(|doc| {
            doc.title.to_lowercase().contains(&needle)
                || doc.content.to_lowercase().contains(&needle)
        })
        .take(MAX_CONTEXT_DOCUMENTS)
        .map(|doc| format!("## {}\n{}", doc.title, doc.content))
        .collect();

    if blocks.is_empty() {
        NO_RESULTS_SENTINEL.to_string()
    } else {
        blocks.join("\n\n")
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn doc(title: &str, content: &str) -> Document {
        Document {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn matches_title_and_content_in_original_order() {
        let docs = vec![
            doc("Q4 Goals", "Ship the beta."),
            doc("Notes", "mentions Q4 budget"),
            doc("Unrelated", "none"),
        ];
        let context = retrieve_document_context(&docs, "Q4");
        assert_eq!(
            context,
            "## Q4 Goals\nShip the beta.\n\n## Notes\nmentions Q4 budget"
        );
    }

    #[test]
    fn match_is_case_insensitive() {
        let docs = vec![doc("Roadmap", "The LAUNCH plan for March.")];
        let context = retrieve_document_context(&docs, "launch");
        assert!(context.contains("## Roadmap"));
    }

    #[test]
    fn no_matches_returns_sentinel() {
        let docs = vec![doc("Roadmap", "launch plan")];
        assert_eq!(
            retrieve_document_context(&docs, "quarterly audit"),
            NO_RESULTS_SENTINEL
        );
    }

    #[test]
    fn empty_store_returns_sentinel() {
        assert_eq!(retrieve_document_context(&[], "anything"), NO_RESULTS_SENTINEL);
    }

    #[test]
    fn empty_query_matches_nothing_even_with_documents_present() {
        let docs = vec![
            doc("Q4 Goals", "Ship the beta."),
            doc("Notes", "mentions Q4 budget"),
        ];
        assert_eq!(retrieve_document_context(&docs, ""), NO_RESULTS_SENTINEL);
        assert_eq!(retrieve_document_context(&docs, "  \t "), NO_RESULTS_SENTINEL);
    }

    #[test]
    fn caps_at_three_documents() {
        let docs: Vec<Document> = (0..5)
            .map(|i| doc(&format!("Plan {i}"), "shared keyword"))
            .collect();
        let context = retrieve_document_context(&docs, "shared keyword");
        assert_eq!(context.matches("## Plan").count(), 3);
        assert!(context.contains("## Plan 0"));
        assert!(context.contains("## Plan 2"));
        assert!(!context.contains("## Plan 3"));
    }

    #[test]
    fn same_snapshot_yields_identical_result() {
        let docs = vec![doc("Q4 Goals", "budget"), doc("Notes", "none")];
        let first = retrieve_document_context(&docs, "budget");
        let second = retrieve_document_context(&docs, "budget");
        assert_eq!(first, second);
    }
}
