use crate::extractor::DocumentExtractor;
use crate::traits::{Rasterizer, Recognizer, TextStore};
use crate::{DocumentUpload, IngestError, SkippedDocument, UploadReport};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Reads local files into uploads keyed by their file name.
pub fn load_uploads(paths: &[PathBuf]) -> Result<Vec<DocumentUpload>, IngestError> {
    paths
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?;
            let bytes = fs::read(path)?;
            Ok(DocumentUpload::new(name, bytes))
        })
        .collect()
}

/// Extracts each upload in turn and commits successes to `store`.
///
/// Only an empty or oversized batch is an error. A document that fails any
/// stage, or recognizes to no text at all, is logged and listed in
/// `skipped`; it never reaches the store, and documents stored before it
/// stay stored.
pub async fn ingest_batch<R, C, S>(
    extractor: &DocumentExtractor<R, C>,
    store: &S,
    uploads: &[DocumentUpload],
) -> Result<UploadReport, IngestError>
where
    R: Rasterizer,
    C: Recognizer,
    S: TextStore + ?Sized,
{
    if uploads.is_empty() {
        return Err(IngestError::InvalidArgument("no files uploaded".to_string()));
    }

    let max_batch_size = extractor.options().max_batch_size;
    if uploads.len() > max_batch_size {
        return Err(IngestError::InvalidArgument(format!(
            "{} files uploaded, at most {max_batch_size} are accepted per batch",
            uploads.len()
        )));
    }

    let mut report = UploadReport::default();

    for upload in uploads {
        match extractor.extract(upload).await {
            Ok(text) if text.is_empty() => {
                warn!(file_name = %upload.file_name, "no text recognized, document dropped");
                report.skipped.push(SkippedDocument {
                    file_name: upload.file_name.clone(),
                    reason: "no text recognized".to_string(),
                });
            }
            Ok(text) => {
                info!(file_name = %upload.file_name, chars = text.len(), "document stored");
                store.put(&upload.file_name, text);
                report.stored.push(upload.file_name.clone());
            }
            Err(error) => {
                warn!(file_name = %upload.file_name, %error, "extraction failed, document dropped");
                report.skipped.push(SkippedDocument {
                    file_name: upload.file_name.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    Ok(report)
}
