//! The compiled, immutable transform pipeline of one route.

use std::sync::Arc;

use crate::transforms::transform::{RequestTransform, ResponseTransform};

/// Pipeline-wide forwarding switches set by declarative entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Copy inbound request headers to the upstream request.
    pub copy_request_headers: bool,
    /// Forward the inbound `Host` header instead of the destination's.
    pub use_original_host: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            copy_request_headers: true,
            use_original_host: false,
        }
    }
}

/// One switch, as produced by a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOption {
    CopyRequestHeaders(bool),
    UseOriginalHost(bool),
}

impl PipelineOptions {
    pub(crate) fn set(&mut self, option: PipelineOption) {
        match option {
            PipelineOption::CopyRequestHeaders(v) => self.copy_request_headers = v,
            PipelineOption::UseOriginalHost(v) => self.use_original_host = v,
        }
    }
}

/// Frozen request and response steps in declared order.
///
/// Cloning shares the step lists; the pipeline is never mutated after the
/// builder context is frozen, so any number of requests may read it at once.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTransformPipeline {
    request: Arc<[RequestTransform]>,
    response: Arc<[ResponseTransform]>,
    options: PipelineOptions,
}

impl CompiledTransformPipeline {
    pub(crate) fn new(
        request: Vec<RequestTransform>,
        response: Vec<ResponseTransform>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            request: request.into(),
            response: response.into(),
            options,
        }
    }

    /// A pipeline that forwards everything unchanged.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), PipelineOptions::default())
    }

    pub fn request_transforms(&self) -> &[RequestTransform] {
        &self.request
    }

    pub fn response_transforms(&self) -> &[ResponseTransform] {
        &self.response
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    pub fn is_empty(&self) -> bool {
        self.request.is_empty() && self.response.is_empty()
    }
}

impl Default for CompiledTransformPipeline {
    fn default() -> Self {
        Self::empty()
    }
}
