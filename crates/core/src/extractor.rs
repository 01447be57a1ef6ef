use crate::error::IngestError;
use crate::models::{DocumentUpload, ExtractionOptions, PageText};
use crate::traits::{Rasterizer, Recognizer};
use std::future::Future;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

const INPUT_FILE_NAME: &str = "input.pdf";
const PAGES_DIR_NAME: &str = "pages";

/// Turns one uploaded PDF into its canonical text: rasterize, recognize every
/// page in order, join. Any stage failure fails the whole document.
pub struct DocumentExtractor<R, C>
where
    R: Rasterizer,
    C: Recognizer,
{
    rasterizer: R,
    recognizer: C,
    options: ExtractionOptions,
}

impl<R, C> DocumentExtractor<R, C>
where
    R: Rasterizer,
    C: Recognizer,
{
    pub fn new(rasterizer: R, recognizer: C, options: ExtractionOptions) -> Self {
        Self {
            rasterizer,
            recognizer,
            options,
        }
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    pub async fn extract(&self, upload: &DocumentUpload) -> Result<String, IngestError> {
        // Input file and page images live in this directory only; dropping it
        // on any return path removes everything.
        let scope = tempfile::Builder::new().prefix("scanqa-").tempdir()?;
        let text = self.extract_in(&scope, upload).await?;

        let scope_path = scope.path().to_path_buf();
        if let Err(error) = scope.close() {
            warn!(path = %scope_path.display(), %error, "failed to remove working directory");
        }

        Ok(text)
    }

    async fn extract_in(&self, scope: &TempDir, upload: &DocumentUpload) -> Result<String, IngestError> {
        let input = scope.path().join(INPUT_FILE_NAME);
        tokio::fs::write(&input, &upload.bytes).await?;

        let pages_dir = scope.path().join(PAGES_DIR_NAME);
        tokio::fs::create_dir(&pages_dir).await?;

        info!(file_name = %upload.file_name, bytes = upload.bytes.len(), "converting pdf to images");
        let images = with_deadline(
            "rasterization",
            self.options.rasterize_timeout,
            self.rasterizer.rasterize(&input, &pages_dir),
        )
        .await?;

        if images.is_empty() {
            return Err(IngestError::Conversion(format!(
                "no images generated from {}",
                upload.file_name
            )));
        }

        info!(file_name = %upload.file_name, pages = images.len(), "running ocr");
        let mut pages = Vec::with_capacity(images.len());
        for image in &images {
            let text = with_deadline(
                "page recognition",
                self.options.recognize_page_timeout,
                self.recognizer.recognize(image),
            )
            .await?;

            debug!(file_name = %upload.file_name, page = image.number, chars = text.len(), "page done");
            pages.push(PageText {
                number: image.number,
                text,
            });
        }

        Ok(join_page_texts(&pages))
    }
}

/// Canonical form of a document: every page followed by a newline, in the
/// given order, with the whole result trimmed.
pub fn join_page_texts(pages: &[PageText]) -> String {
    let mut combined = String::new();
    for page in pages {
        combined.push_str(&page.text);
        combined.push('\n');
    }
    combined.trim().to_string()
}

async fn with_deadline<T, F>(stage: &'static str, limit: Duration, work: F) -> Result<T, IngestError>
where
    F: Future<Output = Result<T, IngestError>>,
{
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => Err(IngestError::DeadlineExceeded { stage, limit }),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{join_page_texts, DocumentExtractor};
    use crate::error::IngestError;
    use crate::models::{DocumentUpload, ExtractionOptions, PageImage, PageText};
    use crate::traits::{Rasterizer, Recognizer};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Writes one fake image per page and remembers the directory it used.
    /// Documents whose bytes start with `corrupt` produce no pages.
    #[derive(Default)]
    pub(crate) struct FakeRasterizer {
        pub work_dirs: Mutex<Vec<PathBuf>>,
        pub delay: Option<Duration>,
    }

    #[async_trait]
    impl Rasterizer for FakeRasterizer {
        async fn rasterize(&self, pdf: &Path, work_dir: &Path) -> Result<Vec<PageImage>, IngestError> {
            self.work_dirs
                .lock()
                .expect("lock")
                .push(work_dir.to_path_buf());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let body = std::fs::read_to_string(pdf)?;
            if body.starts_with("corrupt") {
                return Err(IngestError::Conversion("no images generated".to_string()));
            }

            // Body format: "<doc>:<pages>", e.g. "a:2".
            let (name, count) = body.split_once(':').unwrap_or((body.as_str(), "1"));
            let count = count.trim().parse::<u32>().unwrap_or(1);

            // Written in reverse to make sure callers rely on the returned order.
            let mut pages = Vec::new();
            for number in (1..=count).rev() {
                let path = work_dir.join(format!("page-{number}.png"));
                std::fs::write(&path, format!("{name}|{number}"))?;
                pages.push(PageImage { number, path });
            }
            pages.sort_by_key(|page| page.number);
            Ok(pages)
        }
    }

    /// Reads the fake image back as "<doc> page <n>". Images for `bad` docs
    /// fail on page 2.
    #[derive(Default)]
    pub(crate) struct FakeRecognizer {
        pub calls: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl Recognizer for FakeRecognizer {
        async fn recognize(&self, page: &PageImage) -> Result<String, IngestError> {
            self.calls.lock().expect("lock").push(page.number);
            let body = std::fs::read_to_string(&page.path)?;
            let (name, number) = body.split_once('|').unwrap_or((body.as_str(), "?"));

            if name == "bad" && page.number == 2 {
                return Err(IngestError::Recognition {
                    page: page.number,
                    reason: "engine crashed".to_string(),
                });
            }
            if name == "blank" {
                return Ok("  \n".to_string());
            }

            Ok(format!("{name} page {number}"))
        }
    }

    fn extractor() -> DocumentExtractor<FakeRasterizer, FakeRecognizer> {
        DocumentExtractor::new(
            FakeRasterizer::default(),
            FakeRecognizer::default(),
            ExtractionOptions::default(),
        )
    }

    #[test]
    fn pages_are_joined_with_newlines_and_trimmed() {
        let pages = vec![
            PageText {
                number: 1,
                text: "\n  First page\n".to_string(),
            },
            PageText {
                number: 2,
                text: "Second page  ".to_string(),
            },
        ];

        assert_eq!(join_page_texts(&pages), "First page\n\nSecond page");
        assert_eq!(join_page_texts(&[]), "");
    }

    #[tokio::test]
    async fn multi_page_document_is_recognized_in_page_order() -> Result<(), IngestError> {
        let extractor = extractor();
        let text = extractor
            .extract(&DocumentUpload::new("b.pdf", "b:3"))
            .await?;

        assert_eq!(text, "b page 1\nb page 2\nb page 3");
        assert_eq!(*extractor.recognizer.calls.lock().expect("lock"), vec![1, 2, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn working_directory_is_removed_on_success() -> Result<(), IngestError> {
        let extractor = extractor();
        extractor.extract(&DocumentUpload::new("a.pdf", "a:2")).await?;

        let dirs = extractor.rasterizer.work_dirs.lock().expect("lock").clone();
        assert_eq!(dirs.len(), 1);
        assert!(!dirs[0].exists());
        assert!(!dirs[0].parent().map(Path::exists).unwrap_or(false));
        Ok(())
    }

    #[tokio::test]
    async fn conversion_failure_fails_document_and_cleans_up() {
        let extractor = extractor();
        let result = extractor
            .extract(&DocumentUpload::new("broken.pdf", "corrupt"))
            .await;

        assert!(matches!(result, Err(IngestError::Conversion(_))));
        let dirs = extractor.rasterizer.work_dirs.lock().expect("lock").clone();
        assert!(!dirs[0].exists());
        assert!(extractor.recognizer.calls.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn recognition_failure_on_any_page_fails_whole_document() {
        let extractor = extractor();
        let result = extractor.extract(&DocumentUpload::new("bad.pdf", "bad:3")).await;

        assert!(matches!(result, Err(IngestError::Recognition { page: 2, .. })));
        // Page 3 is never attempted once page 2 fails.
        assert_eq!(*extractor.recognizer.calls.lock().expect("lock"), vec![1, 2]);
        let dirs = extractor.rasterizer.work_dirs.lock().expect("lock").clone();
        assert!(!dirs[0].exists());
    }

    #[tokio::test]
    async fn slow_rasterization_hits_deadline_and_cleans_up() {
        let extractor = DocumentExtractor::new(
            FakeRasterizer {
                delay: Some(Duration::from_secs(30)),
                ..FakeRasterizer::default()
            },
            FakeRecognizer::default(),
            ExtractionOptions {
                rasterize_timeout: Duration::from_millis(20),
                ..ExtractionOptions::default()
            },
        );

        let result = extractor.extract(&DocumentUpload::new("slow.pdf", "a:1")).await;

        match result {
            Err(IngestError::DeadlineExceeded { stage, limit }) => {
                assert_eq!(stage, "rasterization");
                assert_eq!(limit, Duration::from_millis(20));
            }
            other => panic!("expected deadline error, got {other:?}"),
        }
        let dirs = extractor.rasterizer.work_dirs.lock().expect("lock").clone();
        assert!(!dirs[0].exists());
    }
}
