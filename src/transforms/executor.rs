//! Per-request execution of a compiled pipeline.
//!
//! Execution never fails: every check that can fail ran when the pipeline
//! was built.

use crate::transforms::pipeline::CompiledTransformPipeline;
use crate::transforms::state::{RequestState, ResponseState};

/// Run the request steps, in order, against `state`.
pub fn apply_request_transforms(pipeline: &CompiledTransformPipeline, state: &mut RequestState) {
    for transform in pipeline.request_transforms() {
        transform.apply(state);
        tracing::trace!(kind = transform.kind(), path = %state.path, "Applied request transform");
    }
}

/// Run the response steps, in order, against `state`.
pub fn apply_response_transforms(pipeline: &CompiledTransformPipeline, state: &mut ResponseState) {
    for transform in pipeline.response_transforms() {
        transform.apply(state);
        tracing::trace!(kind = transform.kind(), status = %state.status, "Applied response transform");
    }
}
