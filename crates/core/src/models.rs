use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Raw bytes of one uploaded PDF, keyed by its original file name.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub number: u32,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub const ALPHANUMERIC_WHITELIST: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Fixed recognition configuration handed to the OCR engine for every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionParams {
    pub language: String,
    pub char_whitelist: String,
    /// Page segmentation mode. 6 assumes a single uniform block of text.
    pub page_segmentation_mode: u8,
    /// OCR engine mode. 1 selects the LSTM neural network engine.
    pub engine_mode: u8,
}

impl Default for RecognitionParams {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            char_whitelist: ALPHANUMERIC_WHITELIST.to_string(),
            page_segmentation_mode: 6,
            engine_mode: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    pub max_batch_size: usize,
    pub rasterize_timeout: Duration,
    pub recognize_page_timeout: Duration,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            max_batch_size: 15,
            rasterize_timeout: Duration::from_secs(300),
            recognize_page_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedDocument {
    pub file_name: String,
    pub reason: String,
}

/// Outcome of one upload batch. `stored` lists, in submission order, the
/// documents whose text is now in the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadReport {
    pub stored: Vec<String>,
    pub skipped: Vec<SkippedDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentQuery {
    pub question: String,
    pub file_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        }
    }
}
