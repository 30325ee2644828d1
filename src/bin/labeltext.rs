//! CLI binary for labeltext.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints the extracted text.

use anyhow::{Context, Result};
use clap::Parser;
use labeltext::{ExtractedPayload, ExtractionConfig, Extractor, UploadedDocument};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract label text from a PDF (stdout)
  labeltext label.pdf

  # A scanned PDF, remote OCR enabled
  GOOGLE_VISION_API_KEY=... labeltext scan.pdf

  # Local OCR only, Italian labels
  labeltext --lang it scan.pdf

  # Structured JSON with the attempt trail and timings
  labeltext --json label.pdf > out.json

  # Override the declared MIME type for an extensionless upload
  labeltext --mime image/jpeg photo_from_upload

ENVIRONMENT VARIABLES:
  GOOGLE_VISION_API_KEY   API key for the remote Vision OCR service.
                          Unset: the remote engine is skipped and OCR falls
                          straight through to local tesseract.

EXTERNAL TOOLS:
  pdftoppm (poppler-utils)  first-page rasterisation of scanned PDFs
  tesseract                 local OCR fallback (with ita/eng/fra traineddata)

  Both are only needed for PDFs without a usable text layer; text-layer
  PDFs and image uploads work without them.
"#;

/// Extract machine-readable text from label documents (PDF or image).
#[derive(Parser, Debug)]
#[command(
    name = "labeltext",
    version,
    about = "Extract machine-readable text from label documents (PDF or image)",
    long_about = "Extract text from an uploaded label document. PDFs with a usable text \
layer are read directly; scanned PDFs are rasterised and OCR'd (remote Vision service \
first, local tesseract as fallback). Image uploads are passed through unchanged.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path of the document to extract (PDF, PNG, JPEG, WebP, GIF, TIFF, BMP).
    input: PathBuf,

    /// Declared MIME type; guessed from the file extension when omitted.
    #[arg(long)]
    mime: Option<String>,

    /// Rasterisation DPI for scanned PDFs (72–600).
    #[arg(long, env = "LABELTEXT_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// ISO-639-1 OCR language hints, in preference order (repeatable).
    #[arg(long = "lang", env = "LABELTEXT_LANGS", value_delimiter = ',',
          default_values_t = ["it".to_string(), "en".to_string(), "fr".to_string()])]
    langs: Vec<String>,

    /// API key for the remote Vision OCR engine.
    #[arg(long, env = "GOOGLE_VISION_API_KEY", hide_env_values = true)]
    vision_api_key: Option<String>,

    /// Rasterisation timeout in seconds.
    #[arg(long, env = "LABELTEXT_RASTER_TIMEOUT", default_value_t = 30)]
    raster_timeout: u64,

    /// Per-OCR-engine call timeout in seconds.
    #[arg(long, env = "LABELTEXT_OCR_TIMEOUT", default_value_t = 30)]
    ocr_timeout: u64,

    /// Output structured JSON (ExtractionOutput) instead of plain text.
    #[arg(long, env = "LABELTEXT_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LABELTEXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the extracted text.
    #[arg(short, long, env = "LABELTEXT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .language_hints(cli.langs.clone())
        .raster_timeout_secs(cli.raster_timeout)
        .ocr_timeout_secs(cli.ocr_timeout);
    if let Some(ref key) = cli.vision_api_key {
        builder = builder.vision_api_key(key.clone());
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Load the upload ──────────────────────────────────────────────────
    let bytes = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let mime = cli
        .mime
        .clone()
        .unwrap_or_else(|| guess_mime(&cli.input).to_string());
    let filename = cli
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.input.display().to_string());
    let doc = UploadedDocument::new(bytes, mime, filename);

    // ── Run extraction ───────────────────────────────────────────────────
    let extractor = Extractor::new(config)?;
    let output = extractor.extract(&doc).await.context("Extraction failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    match &output.payload {
        ExtractedPayload::Text { text, .. } => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
        ExtractedPayload::Image { bytes, mime_type } => {
            // Plain-text mode has nothing to print for an image upload.
            eprintln!(
                "{} image upload ({mime_type}, {} bytes) passed through; use --json to inspect",
                green("✔"),
                bytes.len()
            );
        }
    }

    if !cli.quiet {
        let winner = output
            .attempts
            .iter()
            .find(|a| a.accepted)
            .map(|a| a.stage.as_str())
            .unwrap_or("passthrough");
        eprintln!(
            "{} {}  {}  {}",
            green("✔"),
            bold(winner),
            dim(&format!("{} attempts", output.attempts.len())),
            dim(&format!("{}ms", output.stats.total_ms)),
        );
    }

    Ok(())
}

/// Best-effort MIME guess from the file extension; classification inside
/// the library sniffs magic bytes anyway, so a wrong guess is harmless.
fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}
