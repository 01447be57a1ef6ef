use anyhow::{anyhow, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use scanqa_core::{
    discover_pdf_files, ingest_batch, load_uploads, DocumentExtractor, DocumentQuery,
    ExtractionOptions, GeminiClient, InMemoryTextStore, MissingDocumentPolicy, PdftoppmRasterizer,
    QueryCoordinator, QueryError, Rasterizer, RecognitionParams, Recognizer, TesseractRecognizer,
    TextStore, UploadReport, DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "scanqa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    gemini_model: String,

    /// Generative Language API base URL
    #[arg(long, default_value = DEFAULT_GEMINI_ENDPOINT)]
    gemini_endpoint: String,

    /// Render resolution for page images
    #[arg(long, default_value = "300")]
    dpi: u32,

    /// Tesseract language code
    #[arg(long, default_value = "eng")]
    language: String,

    /// Maximum number of PDFs accepted in one upload batch
    #[arg(long, default_value = "15")]
    max_batch: usize,

    /// Deadline for rasterizing one PDF and for recognizing one page
    #[arg(long, default_value = "300")]
    stage_timeout_secs: u64,

    /// Deadline for one language model call
    #[arg(long, default_value = "120")]
    llm_timeout_secs: u64,
}

#[derive(Args)]
struct DocumentArgs {
    /// PDF file to upload. Repeatable.
    #[arg(long = "file")]
    files: Vec<PathBuf>,

    /// Folder searched recursively for PDFs.
    #[arg(long)]
    folder: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// OCR the PDFs and print the recognized text of each stored document.
    Extract {
        #[command(flatten)]
        documents: DocumentArgs,
        /// Print the upload report as JSON instead of the text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// OCR the PDFs, then answer one question grounded on them.
    Ask {
        #[command(flatten)]
        documents: DocumentArgs,
        /// Question to answer.
        #[arg(long)]
        question: String,
        /// Restrict the answer to these file names. Defaults to every stored document.
        #[arg(long)]
        scope: Vec<String>,
        /// Fail when any scoped file name has no stored text.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// OCR the PDFs, then answer questions read line by line from stdin.
    Chat {
        #[command(flatten)]
        documents: DocumentArgs,
        /// Restrict answers to these file names. Defaults to every stored document.
        #[arg(long)]
        scope: Vec<String>,
        /// Fail when any scoped file name has no stored text.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "scanqa boot"
    );

    let stage_timeout = Duration::from_secs(cli.stage_timeout_secs);
    let options = ExtractionOptions {
        max_batch_size: cli.max_batch,
        rasterize_timeout: stage_timeout,
        recognize_page_timeout: stage_timeout,
    };

    let rasterizer = PdftoppmRasterizer::with_dpi(cli.dpi);
    let recognizer = TesseractRecognizer::new(RecognitionParams {
        language: cli.language.clone(),
        ..RecognitionParams::default()
    });

    if !rasterizer.is_available().await || !recognizer.is_available().await {
        warn!("pdftoppm (poppler-utils) and tesseract-ocr are required; documents will fail to extract");
    }

    let extractor = DocumentExtractor::new(rasterizer, recognizer, options);
    let store = Arc::new(InMemoryTextStore::new());

    match &cli.command {
        Command::Extract { documents, json } => {
            let report = upload(&extractor, &store, documents).await?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for name in &report.stored {
                    println!("--- {name} ---");
                    println!("{}", store.get(name).unwrap_or_default());
                }
            }
        }
        Command::Ask {
            documents,
            question,
            scope,
            strict,
        } => {
            let report = upload(&extractor, &store, documents).await?;
            let file_names = scoped_names(scope, &report).map_err(query_failure)?;
            let coordinator = coordinator(&cli, Arc::clone(&store), *strict)?;

            let query = DocumentQuery {
                question: question.clone(),
                file_names,
            };

            let answer = coordinator.answer(&query).await.map_err(query_failure)?;
            println!("{answer}");
        }
        Command::Chat {
            documents,
            scope,
            strict,
        } => {
            let report = upload(&extractor, &store, documents).await?;
            let file_names = scoped_names(scope, &report).map_err(query_failure)?;
            let coordinator = coordinator(&cli, Arc::clone(&store), *strict)?;

            println!(
                "{} document(s) ready. Ask a question per line, Ctrl-D to quit.",
                store.len()
            );

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }

                let query = DocumentQuery {
                    question: question.to_string(),
                    file_names: file_names.clone(),
                };

                match coordinator.answer(&query).await {
                    Ok(answer) => println!("{answer}"),
                    Err(error) => eprintln!("error: {}", query_failure(error)),
                }
            }
        }
    }

    Ok(())
}

async fn upload<R, C>(
    extractor: &DocumentExtractor<R, C>,
    store: &Arc<InMemoryTextStore>,
    documents: &DocumentArgs,
) -> anyhow::Result<UploadReport>
where
    R: Rasterizer,
    C: Recognizer,
{
    let mut paths = documents.files.clone();
    if let Some(folder) = &documents.folder {
        paths.extend(discover_pdf_files(folder));
    }

    if paths.is_empty() {
        bail!("no files uploaded: pass --file or --folder");
    }

    let uploads = load_uploads(&paths).map_err(|error| anyhow!(error.to_string()))?;
    let report = ingest_batch(extractor, store, &uploads)
        .await
        .map_err(|error| anyhow!(error.to_string()))?;

    if !report.skipped.is_empty() {
        warn!("skipped_files={}", report.skipped.len());
        for skipped in &report.skipped {
            warn!(file_name = %skipped.file_name, reason = %skipped.reason, "skipped pdf");
        }
    }

    info!(stored = report.stored.len(), "upload finished");
    Ok(report)
}

fn coordinator(
    cli: &Cli,
    store: Arc<InMemoryTextStore>,
    strict: bool,
) -> anyhow::Result<QueryCoordinator<Arc<InMemoryTextStore>, GeminiClient>> {
    let api_key = cli
        .gemini_api_key
        .as_deref()
        .ok_or_else(|| anyhow!("GEMINI_API_KEY is not set"))?;

    let llm = GeminiClient::new(&cli.gemini_endpoint, cli.gemini_model.as_str(), api_key)
        .map_err(|error| anyhow!(error.to_string()))?;

    let policy = if strict {
        MissingDocumentPolicy::Reject
    } else {
        MissingDocumentPolicy::Skip
    };

    Ok(QueryCoordinator::new(store, llm)
        .with_policy(policy)
        .with_llm_timeout(Duration::from_secs(cli.llm_timeout_secs)))
}

/// Explicit `--scope` wins; otherwise every document stored by this run.
/// Nothing stored and nothing named means there is nothing to ground on.
fn scoped_names(scope: &[String], report: &UploadReport) -> Result<Vec<String>, QueryError> {
    if !scope.is_empty() {
        return Ok(scope.to_vec());
    }
    if report.stored.is_empty() {
        return Err(QueryError::NoDocumentsResolved);
    }
    Ok(report.stored.clone())
}

fn query_failure(error: QueryError) -> anyhow::Error {
    match error {
        QueryError::NoDocumentsResolved => anyhow!("No relevant documents found."),
        other => anyhow!(other.to_string()),
    }
}
