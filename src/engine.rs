//! Recognize stage: the OCR engine seam.
//!
//! The pipeline consumes recognition through the [`TextRecognizer`] trait.
//! [`TesseractEngine`] is the production implementation: it stages the
//! decoded frame as a scratch PNG and shells out to the `tesseract` CLI in
//! stdout mode. Tests install deterministic recognizers instead; nothing in
//! the test suite requires the binary.

use std::process::Command;

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the recognize stage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RecognizeError {
    #[error("failed to stage frame for recognition: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("failed to encode frame for recognition: {0}")]
    Encode(#[source] image::ImageError),

    #[error("failed to invoke OCR engine: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("OCR engine failed: {detail}")]
    Engine { detail: String },
}

/// Text-recognition collaborator consumed by the item pipeline.
pub trait TextRecognizer: Send + Sync {
    /// Engine identifier for logs (e.g. `"tesseract"`).
    fn name(&self) -> &'static str;

    /// Extract raw (possibly multi-line) text from a decoded image.
    fn recognize(&self, image: &DynamicImage) -> Result<String, RecognizeError>;
}

/// Recognize stage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Executable to invoke. Resolved via `PATH` unless absolute.
    #[serde(default = "default_command")]
    pub command: String,

    /// Language model passed as `-l <language>`.
    #[serde(default = "default_language")]
    pub language: String,

    /// Extra arguments appended verbatim (e.g. `["--psm", "6"]`).
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            language: default_language(),
            extra_args: Vec::new(),
        }
    }
}

fn default_command() -> String {
    "tesseract".to_string()
}

fn default_language() -> String {
    "eng".to_string()
}

/// OCR engine backed by the `tesseract` command-line binary.
///
/// Each call stages the frame in a scratch temp file that is deleted when
/// the call returns, on success and on every error path.
pub struct TesseractEngine {
    command: String,
    language: String,
    extra_args: Vec<String>,
}

impl TesseractEngine {
    pub fn new(cfg: &EngineConfig) -> Self {
        Self {
            command: cfg.command.clone(),
            language: cfg.language.clone(),
            extra_args: cfg.extra_args.clone(),
        }
    }
}

impl TextRecognizer for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, RecognizeError> {
        let frame = tempfile::Builder::new()
            .prefix("textlift-frame-")
            .suffix(".png")
            .tempfile()
            .map_err(RecognizeError::Scratch)?;
        image
            .save_with_format(frame.path(), ImageFormat::Png)
            .map_err(RecognizeError::Encode)?;

        let output = Command::new(&self.command)
            .arg(frame.path())
            .arg("stdout")
            .args(["-l", &self.language])
            .args(&self.extra_args)
            .output()
            .map_err(RecognizeError::Spawn)?;

        if !output.status.success() {
            let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RecognizeError::Engine { detail });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!(engine = self.name(), chars = text.len(), "recognize_complete");
        Ok(text)
    }
}
