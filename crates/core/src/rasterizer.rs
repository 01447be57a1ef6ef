use crate::error::IngestError;
use crate::models::PageImage;
use crate::traits::Rasterizer;
use async_trait::async_trait;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

const PAGE_PREFIX: &str = "page";

/// Renders pages with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    pub program: PathBuf,
    pub dpi: u32,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pdftoppm"),
            dpi: 300,
        }
    }
}

impl PdftoppmRasterizer {
    pub fn with_dpi(dpi: u32) -> Self {
        Self {
            dpi,
            ..Self::default()
        }
    }

    pub async fn is_available(&self) -> bool {
        command_available(&self.program, "-v").await
    }

    pub fn args(&self, pdf: &Path, work_dir: &Path) -> Vec<OsString> {
        vec![
            "-png".into(),
            "-r".into(),
            self.dpi.to_string().into(),
            pdf.as_os_str().to_os_string(),
            work_dir.join(PAGE_PREFIX).into_os_string(),
        ]
    }
}

#[async_trait]
impl Rasterizer for PdftoppmRasterizer {
    async fn rasterize(&self, pdf: &Path, work_dir: &Path) -> Result<Vec<PageImage>, IngestError> {
        let output = Command::new(&self.program)
            .args(self.args(pdf, work_dir))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| {
                if error.kind() == std::io::ErrorKind::NotFound {
                    IngestError::MissingTool(format!(
                        "{} (install poppler-utils)",
                        self.program.display()
                    ))
                } else {
                    IngestError::Conversion(format!("failed to run pdftoppm: {error}"))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::Conversion(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let pages = collect_page_images(work_dir)?;
        if pages.is_empty() {
            return Err(IngestError::Conversion(format!(
                "no page images generated from {}",
                pdf.display()
            )));
        }

        debug!(pdf = %pdf.display(), pages = pages.len(), "rasterized pdf");
        Ok(pages)
    }
}

/// Lists `page-<n>.png` files in `dir` ordered by page number. pdftoppm pads
/// the number to the width of the page count, so lexical order is not enough.
pub fn collect_page_images(dir: &Path) -> Result<Vec<PageImage>, IngestError> {
    let pattern = Regex::new(&format!(r"^{PAGE_PREFIX}-(\d+)\.png$"))?;
    let mut pages = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        let number = pattern
            .captures(name)
            .and_then(|capture| capture.get(1))
            .and_then(|digits| digits.as_str().parse::<u32>().ok());

        if let Some(number) = number {
            pages.push(PageImage {
                number,
                path: entry.path(),
            });
        }
    }

    pages.sort_by_key(|page| page.number);
    Ok(pages)
}

pub(crate) async fn command_available(program: &Path, version_flag: &str) -> bool {
    Command::new(program)
        .arg(version_flag)
        .output()
        .await
        .is_ok()
}
