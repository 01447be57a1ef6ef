use crate::{IngestError, PageImage, QueryError};
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Render every page of `pdf` into `work_dir`, returning the images in
    /// ascending page order. An empty result is an error, never `Ok(vec![])`.
    async fn rasterize(&self, pdf: &Path, work_dir: &Path) -> Result<Vec<PageImage>, IngestError>;
}

#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, page: &PageImage) -> Result<String, IngestError>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, QueryError>;
}

/// Document id to canonical text. Writes replace whole entries.
pub trait TextStore: Send + Sync {
    fn put(&self, document_id: &str, text: String);

    fn get(&self, document_id: &str) -> Option<String>;

    fn contains(&self, document_id: &str) -> bool {
        self.get(document_id).is_some()
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn document_ids(&self) -> Vec<String>;
}
