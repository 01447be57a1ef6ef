pub mod context;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod rasterizer;
pub mod recognizer;
pub mod store;
pub mod traits;

pub use context::{assemble_context, build_prompt, resolve_context, MissingDocumentPolicy};
pub use error::{IngestError, QueryError};
pub use extractor::{join_page_texts, DocumentExtractor};
pub use ingest::{discover_pdf_files, ingest_batch, load_uploads};
pub use models::{
    DocumentQuery, DocumentUpload, ExtractionOptions, GenerationConfig, PageImage, PageText,
    RecognitionParams, SkippedDocument, UploadReport,
};
pub use orchestrator::QueryCoordinator;
pub use providers::gemini::{DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
pub use providers::GeminiClient;
pub use rasterizer::PdftoppmRasterizer;
pub use recognizer::TesseractRecognizer;
pub use store::InMemoryTextStore;
pub use traits::{LanguageModel, Rasterizer, Recognizer, TextStore};
