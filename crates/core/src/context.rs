use crate::error::QueryError;
use crate::traits::TextStore;

/// What to do when a requested document is not in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingDocumentPolicy {
    /// Leave the document out of the context without complaint.
    #[default]
    Skip,
    /// Fail the query, naming every document that did not resolve.
    Reject,
}

pub fn source_header(document_id: &str) -> String {
    format!("\n\n--- From {document_id} ---\n\n")
}

/// Concatenates the stored text of `document_ids`, in the order given, each
/// block introduced by a header naming its source. Unknown ids contribute
/// nothing, so an empty result means nothing resolved.
pub fn assemble_context<S>(store: &S, document_ids: &[String]) -> String
where
    S: TextStore + ?Sized,
{
    let mut combined = String::new();
    for document_id in document_ids {
        if let Some(text) = store.get(document_id) {
            combined.push_str(&source_header(document_id));
            combined.push_str(&text);
        }
    }
    combined
}

/// Like [`assemble_context`], but applies `policy` to ids missing from the
/// store and maps an empty result to [`QueryError::NoDocumentsResolved`].
pub fn resolve_context<S>(
    store: &S,
    document_ids: &[String],
    policy: MissingDocumentPolicy,
) -> Result<String, QueryError>
where
    S: TextStore + ?Sized,
{
    if policy == MissingDocumentPolicy::Reject {
        let missing = document_ids
            .iter()
            .filter(|document_id| !store.contains(document_id))
            .cloned()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(QueryError::MissingDocuments(missing));
        }
    }

    let combined = assemble_context(store, document_ids);
    if combined.is_empty() {
        return Err(QueryError::NoDocumentsResolved);
    }
    Ok(combined)
}

pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Based on the following documents, answer the question:\n\n{context}\n\nUser Question: {question}"
    )
}
