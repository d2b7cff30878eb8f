//! Core of the textlift batch OCR service.
//!
//! This crate stitches the item pipeline together — fetch, decode, recognize,
//! normalize — so callers can process one image reference or a validated
//! batch with a single API entry point. Failures are isolated per item: one
//! unreachable URL or truncated file never aborts its siblings, and every
//! result carries a correlation id derived before the first fallible step.
//!
//! The networked fetcher and the OCR engine sit behind the [`ImageFetcher`]
//! and [`TextRecognizer`] seams; the HTTP surface lives in [`server`] behind
//! the `server` cargo feature.

pub mod batch;
pub mod config;
pub mod decode;
pub mod engine;
pub mod fetch;
pub mod metrics;
pub mod normalize;
pub mod reference;
#[cfg(feature = "server")]
pub mod server;

pub use batch::{BatchError, BatchRequest, run_batch};
pub use config::ServiceConfig;
pub use decode::{DecodeError, decode_image};
pub use engine::{EngineConfig, RecognizeError, TesseractEngine, TextRecognizer};
pub use fetch::{FetchConfig, FetchError, HttpFetcher, ImageFetcher};
pub use image::DynamicImage;
pub use metrics::{PipelineMetrics, set_pipeline_metrics};
pub use normalize::flatten_lines;
pub use reference::derive_id;

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur while processing one item through the pipeline.
///
/// Display is transparent: the caller-visible per-item message is the
/// underlying stage error's message, with no extra framing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ItemError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Recognize(#[from] RecognizeError),
}

impl ItemError {
    /// Stage label for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            ItemError::Fetch(_) => "fetch",
            ItemError::Decode(_) => "decode",
            ItemError::Recognize(_) => "recognize",
        }
    }
}

/// Errors produced by the single-item upload flow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UploadError {
    /// The declared filename is empty or whitespace-only. Checked before any
    /// storage is touched.
    #[error("missing filename")]
    MissingFilename,

    #[error("failed to store upload: {0}")]
    Storage(#[source] std::io::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Recognize(#[from] RecognizeError),
}

/// Per-item outcome, tagged with the item's correlation id.
///
/// Exactly one of `text`/`error` is present; the untagged representation
/// keeps the wire forms at `{"id", "text"}` and `{"id", "error"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemResult {
    Success { id: String, text: String },
    Failure { id: String, error: String },
}

impl ItemResult {
    pub fn success(id: impl Into<String>, text: impl Into<String>) -> Self {
        ItemResult::Success {
            id: id.into(),
            text: text.into(),
        }
    }

    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        ItemResult::Failure {
            id: id.into(),
            error: error.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ItemResult::Success { id, .. } | ItemResult::Failure { id, .. } => id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ItemResult::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ItemResult::Failure { .. })
    }
}

struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics::metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_fetch(self, result: Result<(), &FetchError>) {
        self.recorder.record_fetch(self.start.elapsed(), result);
    }

    fn record_decode(self, result: Result<(), &DecodeError>) {
        self.recorder.record_decode(self.start.elapsed(), result);
    }

    fn record_recognize(self, result: Result<(), &RecognizeError>) {
        self.recorder.record_recognize(self.start.elapsed(), result);
    }
}

/// The item pipeline: a fetcher and a recognizer behind their seams.
///
/// Shared across requests via `Arc`; holds no per-item state, so concurrent
/// items within a batch never contend on it.
pub struct Pipeline {
    fetcher: Arc<dyn ImageFetcher>,
    recognizer: Arc<dyn TextRecognizer>,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            fetcher,
            recognizer,
        }
    }

    /// Build the production pipeline: HTTP fetcher plus tesseract engine.
    pub fn from_config(cfg: &ServiceConfig) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(&cfg.fetch)?;
        let recognizer = TesseractEngine::new(&cfg.engine);
        Ok(Self::new(Arc::new(fetcher), Arc::new(recognizer)))
    }

    /// Name of the recognizer backing this pipeline.
    pub fn recognizer_name(&self) -> &'static str {
        self.recognizer.name()
    }

    /// Process one reference end-to-end, deriving its correlation id.
    ///
    /// Never returns an error: every failure is folded into
    /// [`ItemResult::Failure`] carrying the id derived before the fetch, so
    /// even a dead host produces an addressable result.
    pub async fn process_reference(&self, reference: &str) -> ItemResult {
        let id = derive_id(reference);
        self.process_reference_with_id(reference, id).await
    }

    /// Process one reference with a caller-supplied correlation id.
    pub async fn process_reference_with_id(&self, reference: &str, id: String) -> ItemResult {
        let start = Instant::now();
        match self.run_stages(reference).await {
            Ok(text) => {
                let elapsed_micros = start.elapsed().as_micros();
                tracing::info!(
                    reference,
                    id = %id,
                    chars = text.len(),
                    elapsed_micros,
                    "item_success"
                );
                ItemResult::Success { id, text }
            }
            Err(err) => {
                let elapsed_micros = start.elapsed().as_micros();
                tracing::warn!(
                    reference,
                    id = %id,
                    stage = err.stage(),
                    error = %err,
                    elapsed_micros,
                    "item_failure"
                );
                ItemResult::Failure {
                    id,
                    error: err.to_string(),
                }
            }
        }
    }

    async fn run_stages(&self, reference: &str) -> Result<String, ItemError> {
        let span = MetricsSpan::start();
        let bytes = match self.fetcher.fetch(reference).await {
            Ok(bytes) => {
                if let Some(span) = span {
                    span.record_fetch(Ok(()));
                }
                bytes
            }
            Err(err) => {
                if let Some(span) = span {
                    span.record_fetch(Err(&err));
                }
                return Err(err.into());
            }
        };

        let span = MetricsSpan::start();
        let image = match decode_image(&bytes) {
            Ok(image) => {
                if let Some(span) = span {
                    span.record_decode(Ok(()));
                }
                image
            }
            Err(err) => {
                if let Some(span) = span {
                    span.record_decode(Err(&err));
                }
                return Err(err.into());
            }
        };

        let span = MetricsSpan::start();
        let text = match self.recognizer.recognize(&image) {
            Ok(text) => {
                if let Some(span) = span {
                    span.record_recognize(Ok(()));
                }
                text
            }
            Err(err) => {
                if let Some(span) = span {
                    span.record_recognize(Err(&err));
                }
                return Err(err.into());
            }
        };

        Ok(flatten_lines(&text))
    }

    /// Process one already-resident image from a direct upload.
    ///
    /// The bytes pass through a scoped storage slot that is deleted when
    /// this function returns, on the success path and on every early error
    /// return alike. No correlation id is attached; the single-item contract
    /// returns bare text or a bare error.
    pub fn process_upload(
        &self,
        bytes: &[u8],
        original_filename: &str,
    ) -> Result<String, UploadError> {
        if original_filename.trim().is_empty() {
            return Err(UploadError::MissingFilename);
        }

        // The slot drop-deletes, which covers every exit path below
        // including the early `?` returns.
        let slot = upload_slot(bytes).map_err(UploadError::Storage)?;
        let resident = std::fs::read(slot.path()).map_err(UploadError::Storage)?;

        let image = decode_image(&resident)?;
        let text = self.recognizer.recognize(&image)?;
        let text = flatten_lines(&text);

        tracing::info!(
            filename = original_filename,
            chars = text.len(),
            "upload_success"
        );
        Ok(text)
    }
}

/// Stage upload bytes in a named temp file, the scoped storage slot.
fn upload_slot(bytes: &[u8]) -> Result<NamedTempFile, std::io::Error> {
    let mut slot = tempfile::Builder::new()
        .prefix("textlift-upload-")
        .tempfile()?;
    slot.write_all(bytes)?;
    slot.flush()?;
    Ok(slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::RwLock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn png_bytes() -> Vec<u8> {
        let frame = image::RgbImage::from_pixel(6, 4, image::Rgb([255, 255, 255]));
        let mut buf = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(frame)
            .write_to(&mut buf, image::ImageFormat::Png)
            .expect("png encode");
        buf.into_inner()
    }

    /// Serves prepared byte blobs by reference; anything else fails the
    /// fetch stage. Counts calls so tests can assert zero pipeline work.
    struct MapFetcher {
        responses: HashMap<String, Vec<u8>>,
        calls: AtomicUsize,
    }

    impl MapFetcher {
        fn new(responses: HashMap<String, Vec<u8>>) -> Self {
            Self {
                responses,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ImageFetcher for MapFetcher {
        async fn fetch(&self, reference: &str) -> Result<Bytes, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(reference) {
                Some(bytes) => Ok(Bytes::from(bytes.clone())),
                None => Err(FetchError::TooLarge { size: 0, limit: 0 }),
            }
        }
    }

    struct FixedRecognizer {
        text: &'static str,
        calls: AtomicUsize,
    }

    impl FixedRecognizer {
        fn new(text: &'static str) -> Self {
            Self {
                text,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TextRecognizer for FixedRecognizer {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn recognize(&self, _image: &DynamicImage) -> Result<String, RecognizeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.to_string())
        }
    }

    struct FailingRecognizer;

    impl TextRecognizer for FailingRecognizer {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn recognize(&self, _image: &DynamicImage) -> Result<String, RecognizeError> {
            Err(RecognizeError::Engine {
                detail: "synthetic engine failure".to_string(),
            })
        }
    }

    fn pipeline_with(
        responses: HashMap<String, Vec<u8>>,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Pipeline {
        Pipeline::new(Arc::new(MapFetcher::new(responses)), recognizer)
    }

    #[tokio::test]
    async fn success_normalizes_text_and_tags_derived_id() {
        let reference = "http://example.com/scans/invoice.png";
        let responses = HashMap::from([(reference.to_string(), png_bytes())]);
        let pipeline = pipeline_with(responses, Arc::new(FixedRecognizer::new("TOTAL\n42.00\n")));

        let result = pipeline.process_reference(reference).await;
        assert_eq!(result, ItemResult::success("invoice", "TOTAL 42.00 "));
    }

    #[tokio::test]
    async fn fetch_failure_still_carries_the_derived_id() {
        let pipeline = pipeline_with(HashMap::new(), Arc::new(FixedRecognizer::new("unused")));

        let result = pipeline
            .process_reference("http://dead.example.com/missing.jpg")
            .await;

        assert!(result.is_failure());
        assert_eq!(result.id(), "missing");
    }

    #[tokio::test]
    async fn undecodable_bytes_fail_at_the_decode_stage() {
        let reference = "http://example.com/broken.png";
        let responses = HashMap::from([(reference.to_string(), b"not an image".to_vec())]);
        let pipeline = pipeline_with(responses, Arc::new(FixedRecognizer::new("unused")));

        let result = pipeline.process_reference(reference).await;
        match result {
            ItemResult::Failure { id, error } => {
                assert_eq!(id, "broken");
                assert!(error.contains("failed to decode image"), "error: {error}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recognizer_failure_is_contained_in_the_result() {
        let reference = "http://example.com/scan.png";
        let responses = HashMap::from([(reference.to_string(), png_bytes())]);
        let pipeline = pipeline_with(responses, Arc::new(FailingRecognizer));

        let result = pipeline.process_reference(reference).await;
        match result {
            ItemResult::Failure { id, error } => {
                assert_eq!(id, "scan");
                assert!(error.contains("synthetic engine failure"), "error: {error}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn caller_supplied_id_overrides_derivation() {
        let reference = "http://example.com/scan.png";
        let responses = HashMap::from([(reference.to_string(), png_bytes())]);
        let pipeline = pipeline_with(responses, Arc::new(FixedRecognizer::new("ok")));

        let result = pipeline
            .process_reference_with_id(reference, "ticket-9".to_string())
            .await;
        assert_eq!(result, ItemResult::success("ticket-9", "ok"));
    }

    #[test]
    fn upload_recognizes_resident_bytes() {
        let pipeline = pipeline_with(HashMap::new(), Arc::new(FixedRecognizer::new("LINE\nTWO")));

        let text = pipeline
            .process_upload(&png_bytes(), "receipt.png")
            .expect("upload should succeed");
        assert_eq!(text, "LINE TWO");
    }

    #[test]
    fn blank_filename_is_rejected_before_any_work() {
        let recognizer = Arc::new(FixedRecognizer::new("unused"));
        let pipeline = pipeline_with(HashMap::new(), recognizer.clone());

        let result = pipeline.process_upload(&png_bytes(), "   ");
        assert!(matches!(result, Err(UploadError::MissingFilename)));
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn upload_decode_failure_is_typed() {
        let pipeline = pipeline_with(HashMap::new(), Arc::new(FixedRecognizer::new("unused")));

        let result = pipeline.process_upload(b"junk", "junk.png");
        assert!(matches!(result, Err(UploadError::Decode(_))));
    }

    #[test]
    fn upload_recognize_failure_propagates_typed() {
        let pipeline = pipeline_with(HashMap::new(), Arc::new(FailingRecognizer));

        let result = pipeline.process_upload(&png_bytes(), "scan.png");
        assert!(matches!(result, Err(UploadError::Recognize(_))));
    }

    #[test]
    fn storage_slot_is_deleted_when_released() {
        let slot = upload_slot(b"payload").expect("slot should be created");
        let path = slot.path().to_path_buf();
        assert!(path.exists());

        drop(slot);
        assert!(!path.exists());
    }

    #[test]
    fn item_result_wire_shapes_are_flat() {
        let success = serde_json::to_value(ItemResult::success("image1", "hello")).unwrap();
        assert_eq!(success, json!({ "id": "image1", "text": "hello" }));

        let failure = serde_json::to_value(ItemResult::failure("image2", "boom")).unwrap();
        assert_eq!(failure, json!({ "id": "image2", "error": "boom" }));

        let parsed: ItemResult = serde_json::from_value(failure).unwrap();
        assert!(parsed.is_failure());
        assert_eq!(parsed.id(), "image2");
    }

    #[derive(Default)]
    struct CountingMetrics {
        events: RwLock<Vec<&'static str>>,
    }

    impl CountingMetrics {
        fn snapshot(&self) -> Vec<&'static str> {
            self.events.read().unwrap().clone()
        }
    }

    impl PipelineMetrics for CountingMetrics {
        fn record_fetch(&self, _latency: Duration, result: Result<(), &FetchError>) {
            let label = if result.is_ok() { "fetch_ok" } else { "fetch_err" };
            self.events.write().unwrap().push(label);
        }

        fn record_decode(&self, _latency: Duration, result: Result<(), &DecodeError>) {
            let label = if result.is_ok() { "decode_ok" } else { "decode_err" };
            self.events.write().unwrap().push(label);
        }

        fn record_recognize(&self, _latency: Duration, result: Result<(), &RecognizeError>) {
            let label = if result.is_ok() {
                "recognize_ok"
            } else {
                "recognize_err"
            };
            self.events.write().unwrap().push(label);
        }
    }

    #[tokio::test]
    async fn metrics_recorder_sees_stage_outcomes() {
        let metrics = Arc::new(CountingMetrics::default());
        set_pipeline_metrics(Some(metrics.clone()));

        let reference = "http://example.com/metered.png";
        let responses = HashMap::from([(reference.to_string(), png_bytes())]);
        let pipeline = pipeline_with(responses, Arc::new(FixedRecognizer::new("ok")));

        let result = pipeline.process_reference(reference).await;
        assert!(result.is_success());

        let events = metrics.snapshot();
        assert!(events.contains(&"fetch_ok"));
        assert!(events.contains(&"decode_ok"));
        assert!(events.contains(&"recognize_ok"));

        set_pipeline_metrics(None);
    }
}
