// Metrics hooks for the item pipeline.
//
// Callers install a global `PipelineMetrics` implementation via
// [`set_pipeline_metrics`], then every `Pipeline` reports per-stage latency
// and outcome for each item it processes. This keeps instrumentation
// decoupled from any specific metrics backend.
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

use crate::decode::DecodeError;
use crate::engine::RecognizeError;
use crate::fetch::FetchError;

/// Metrics observer for pipeline stages.
///
/// `latency` is the wall-clock duration of the stage; `result` carries the
/// stage error by reference on failure so observers can label by kind
/// without taking ownership.
pub trait PipelineMetrics: Send + Sync {
    fn record_fetch(&self, latency: Duration, result: Result<(), &FetchError>);
    fn record_decode(&self, latency: Duration, result: Result<(), &DecodeError>);
    fn record_recognize(&self, latency: Duration, result: Result<(), &RecognizeError>);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global pipeline metrics recorder.
///
/// Typically called once during service startup so all `Pipeline` instances
/// share the same metrics backend.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let lock = metrics_lock();
    let mut guard = lock.write().expect("pipeline metrics lock poisoned");
    *guard = recorder;
}
