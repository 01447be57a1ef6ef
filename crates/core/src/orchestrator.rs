use crate::context::{build_prompt, resolve_context, MissingDocumentPolicy};
use crate::traits::{LanguageModel, TextStore};
use crate::{DocumentQuery, QueryError};
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// Answers questions scoped to stored documents by grounding the language
/// model on their text.
pub struct QueryCoordinator<S, L>
where
    S: TextStore,
    L: LanguageModel,
{
    store: S,
    llm: L,
    policy: MissingDocumentPolicy,
    llm_timeout: Duration,
}

impl<S, L> QueryCoordinator<S, L>
where
    S: TextStore,
    L: LanguageModel,
{
    pub fn new(store: S, llm: L) -> Self {
        Self {
            store,
            llm,
            policy: MissingDocumentPolicy::default(),
            llm_timeout: DEFAULT_LLM_TIMEOUT,
        }
    }

    pub fn with_policy(mut self, policy: MissingDocumentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_llm_timeout(mut self, llm_timeout: Duration) -> Self {
        self.llm_timeout = llm_timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the model's answer verbatim. The model is not called when no
    /// requested document resolves.
    pub async fn answer(&self, query: &DocumentQuery) -> Result<String, QueryError> {
        if query.file_names.is_empty() {
            return Err(QueryError::InvalidArgument(
                "no files provided for querying".to_string(),
            ));
        }
        if query.question.trim().is_empty() {
            return Err(QueryError::InvalidArgument("question is empty".to_string()));
        }

        let context = resolve_context(&self.store, &query.file_names, self.policy)?;
        let prompt = build_prompt(&context, &query.question);

        info!(
            documents = query.file_names.len(),
            context_chars = context.len(),
            "asking language model"
        );

        match tokio::time::timeout(self.llm_timeout, self.llm.complete(&prompt)).await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(error)) => {
                warn!(%error, "language model call failed");
                Err(error)
            }
            Err(_) => {
                warn!(secs = self.llm_timeout.as_secs(), "language model call timed out");
                Err(QueryError::Upstream(format!(
                    "no response within {}s",
                    self.llm_timeout.as_secs()
                )))
            }
        }
    }
}
