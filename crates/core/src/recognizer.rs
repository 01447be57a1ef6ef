use crate::error::IngestError;
use crate::models::{PageImage, RecognitionParams};
use crate::rasterizer::command_available;
use crate::traits::Recognizer;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Runs the `tesseract` binary once per page and reads the text from stdout.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    pub program: PathBuf,
    pub params: RecognitionParams,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("tesseract"),
            params: RecognitionParams::default(),
        }
    }
}

impl TesseractRecognizer {
    pub fn new(params: RecognitionParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub async fn is_available(&self) -> bool {
        command_available(&self.program, "--version").await
    }
}

pub fn tesseract_args(page: &PageImage, params: &RecognitionParams) -> Vec<OsString> {
    vec![
        page.path.clone().into_os_string(),
        "stdout".into(),
        "-l".into(),
        params.language.clone().into(),
        "--oem".into(),
        params.engine_mode.to_string().into(),
        "--psm".into(),
        params.page_segmentation_mode.to_string().into(),
        "-c".into(),
        format!("tessedit_char_whitelist={}", params.char_whitelist).into(),
    ]
}

#[async_trait]
impl Recognizer for TesseractRecognizer {
    async fn recognize(&self, page: &PageImage) -> Result<String, IngestError> {
        let output = Command::new(&self.program)
            .args(tesseract_args(page, &self.params))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| {
                if error.kind() == std::io::ErrorKind::NotFound {
                    IngestError::MissingTool(format!(
                        "{} (install tesseract-ocr)",
                        self.program.display()
                    ))
                } else {
                    IngestError::Recognition {
                        page: page.number,
                        reason: format!("failed to run tesseract: {error}"),
                    }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::Recognition {
                page: page.number,
                reason: format!("tesseract exited with {}: {}", output.status, stderr.trim()),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(page = page.number, chars = text.len(), "recognized page");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::{tesseract_args, TesseractRecognizer};
    use crate::error::IngestError;
    use crate::models::{PageImage, RecognitionParams};
    use crate::traits::Recognizer;
    use std::path::PathBuf;

    #[test]
    fn args_pin_engine_segmentation_and_whitelist() {
        let page = PageImage {
            number: 3,
            path: PathBuf::from("/tmp/work/page-3.png"),
        };
        let args = tesseract_args(&page, &RecognitionParams::default())
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>();

        assert_eq!(args[0], "/tmp/work/page-3.png");
        assert_eq!(args[1], "stdout");
        assert_eq!(&args[2..8], &["-l", "eng", "--oem", "1", "--psm", "6"]);
        assert_eq!(args[8], "-c");
        assert_eq!(
            args[9],
            "tessedit_char_whitelist=ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789"
        );
    }

    #[tokio::test]
    async fn missing_binary_fails_instead_of_returning_empty_text() {
        let recognizer = TesseractRecognizer {
            program: PathBuf::from("tesseract-does-not-exist"),
            params: RecognitionParams::default(),
        };
        let page = PageImage {
            number: 1,
            path: PathBuf::from("page-1.png"),
        };

        let result = recognizer.recognize(&page).await;
        assert!(matches!(result, Err(IngestError::MissingTool(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_exit_is_a_recognition_error_for_that_page() {
        let recognizer = TesseractRecognizer {
            program: PathBuf::from("false"),
            params: RecognitionParams::default(),
        };
        let page = PageImage {
            number: 4,
            path: PathBuf::from("page-4.png"),
        };

        match recognizer.recognize(&page).await {
            Err(IngestError::Recognition { page, reason }) => {
                assert_eq!(page, 4);
                assert!(reason.starts_with("tesseract exited with"));
            }
            other => panic!("expected recognition error, got {other:?}"),
        }
    }
}
