//! Batch validation and orchestration.
//!
//! A batch is validated as a set before any pipeline work begins; once
//! accepted, every reference runs its own isolated pipeline and the results
//! come back index-aligned with the input. Whole-batch errors and per-item
//! failures are different tiers and never mix: a rejected batch processes
//! zero items, and a failing item never aborts its siblings.

use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use thiserror::Error;

use crate::{ItemResult, Pipeline};

/// Whole-batch validation failure.
///
/// Display strings are the wire messages returned to callers, so they are
/// fixed per variant rather than free-form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BatchError {
    /// The request body has no reference list field at all.
    #[error("missing image list")]
    MissingImageList,

    /// The field is present but is not a list made only of strings.
    #[error("must be a list of strings")]
    NotAListOfStrings,

    /// The list exceeds the configured maximum cardinality.
    #[error("maximum number of items allowed is {0}")]
    TooManyItems(usize),
}

/// A validated batch of image references.
///
/// Constructible only through [`BatchRequest::from_value`], so holding one
/// proves shape and cardinality were already checked. Immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    references: Vec<String>,
}

impl BatchRequest {
    /// Request body field carrying the reference list.
    pub const FIELD: &'static str = "image_urls";

    /// Validate a raw JSON body into a batch.
    ///
    /// Rules are checked in order and the first violation wins:
    ///
    /// 1. the `image_urls` field must be present,
    /// 2. it must be a list containing only strings,
    /// 3. it must not exceed `max_items` entries.
    ///
    /// An empty list is valid and yields an empty batch. Validation runs on
    /// the raw [`Value`] rather than a deserialized struct so rules 1 and 2
    /// stay distinguishable.
    pub fn from_value(body: &Value, max_items: usize) -> Result<Self, BatchError> {
        let field = body.get(Self::FIELD).ok_or(BatchError::MissingImageList)?;
        let entries = field.as_array().ok_or(BatchError::NotAListOfStrings)?;

        let mut references = Vec::with_capacity(entries.len());
        for entry in entries {
            let reference = entry.as_str().ok_or(BatchError::NotAListOfStrings)?;
            references.push(reference.to_string());
        }

        if references.len() > max_items {
            return Err(BatchError::TooManyItems(max_items));
        }

        Ok(Self { references })
    }

    pub fn references(&self) -> &[String] {
        &self.references
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

/// Run the item pipeline over every reference in the batch.
///
/// References are fanned out concurrently up to the batch size, which is
/// already bounded by validation. Results are collected with their input
/// index and sorted back into input order, so `output[i]` always corresponds
/// to `references()[i]` regardless of completion order. Duplicate references
/// are processed and reported independently.
pub async fn run_batch(pipeline: &Pipeline, request: &BatchRequest) -> Vec<ItemResult> {
    let start = Instant::now();
    let concurrency = request.len().max(1);

    // Each async block must own its reference; borrowing from the request
    // here trips the Handler bound's higher-ranked lifetime check.
    let mut indexed: Vec<(usize, ItemResult)> = stream::iter(
        request
            .references()
            .to_vec()
            .into_iter()
            .enumerate()
            .map(|(idx, reference)| async move {
                (idx, pipeline.process_reference(&reference).await)
            }),
    )
    .buffer_unordered(concurrency)
    .collect()
    .await;

    indexed.sort_by_key(|(idx, _)| *idx);
    let results: Vec<ItemResult> = indexed.into_iter().map(|(_, result)| result).collect();

    let failures = results.iter().filter(|result| result.is_failure()).count();
    let elapsed_micros = start.elapsed().as_micros();
    tracing::info!(
        batch_size = results.len(),
        failures,
        elapsed_micros,
        "batch_complete"
    );

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_a_list_of_strings() {
        let body = json!({ "image_urls": ["http://example.com/a.jpg", "b.png"] });
        let batch = BatchRequest::from_value(&body, 8).expect("batch should validate");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.references()[1], "b.png");
    }

    #[test]
    fn empty_list_is_a_valid_batch() {
        let body = json!({ "image_urls": [] });
        let batch = BatchRequest::from_value(&body, 8).expect("empty batch is valid");
        assert!(batch.is_empty());
    }

    #[test]
    fn missing_field_is_rejected_first() {
        let body = json!({});
        let err = BatchRequest::from_value(&body, 8).unwrap_err();
        assert_eq!(err, BatchError::MissingImageList);
        assert_eq!(err.to_string(), "missing image list");
    }

    #[test]
    fn non_object_body_counts_as_missing_field() {
        let body = json!(["http://example.com/a.jpg"]);
        let err = BatchRequest::from_value(&body, 8).unwrap_err();
        assert_eq!(err, BatchError::MissingImageList);
    }

    #[test]
    fn scalar_field_is_not_a_list() {
        let body = json!({ "image_urls": "http://example.com/a.jpg" });
        let err = BatchRequest::from_value(&body, 8).unwrap_err();
        assert_eq!(err, BatchError::NotAListOfStrings);
        assert_eq!(err.to_string(), "must be a list of strings");
    }

    #[test]
    fn mixed_type_entries_are_rejected() {
        let cases = [
            json!({ "image_urls": ["ok.jpg", 7] }),
            json!({ "image_urls": [null] }),
            json!({ "image_urls": [["nested.jpg"]] }),
            json!({ "image_urls": null }),
        ];

        for body in cases {
            let err = BatchRequest::from_value(&body, 8).unwrap_err();
            assert_eq!(err, BatchError::NotAListOfStrings, "body: {body}");
        }
    }

    #[test]
    fn nine_items_exceed_the_cap() {
        let urls: Vec<String> = (1..=9)
            .map(|n| format!("http://example.com/image{n}.jpg"))
            .collect();
        let body = json!({ "image_urls": urls });

        let err = BatchRequest::from_value(&body, 8).unwrap_err();
        assert_eq!(err, BatchError::TooManyItems(8));
        assert_eq!(err.to_string(), "maximum number of items allowed is 8");
    }

    #[test]
    fn eight_items_fit_exactly() {
        let urls: Vec<String> = (1..=8)
            .map(|n| format!("http://example.com/image{n}.jpg"))
            .collect();
        let body = json!({ "image_urls": urls });

        let batch = BatchRequest::from_value(&body, 8).expect("cap is inclusive");
        assert_eq!(batch.len(), 8);
    }

    #[test]
    fn type_violation_wins_over_cardinality() {
        // Nine entries, one of them a number: rule 2 fires before rule 3.
        let mut urls: Vec<Value> = (1..=8)
            .map(|n| Value::String(format!("http://example.com/image{n}.jpg")))
            .collect();
        urls.push(json!(42));
        let body = json!({ "image_urls": urls });

        let err = BatchRequest::from_value(&body, 8).unwrap_err();
        assert_eq!(err, BatchError::NotAListOfStrings);
    }

    #[test]
    fn duplicate_references_are_kept() {
        let body = json!({ "image_urls": ["dup.jpg", "dup.jpg"] });
        let batch = BatchRequest::from_value(&body, 8).expect("duplicates are allowed");
        assert_eq!(batch.references(), ["dup.jpg", "dup.jpg"]);
    }
}
