//! Build-time accumulator for one route's transforms.
//!
//! # Responsibilities
//! - Collect request and response steps in the order entries are declared
//! - Collect entry errors instead of aborting the build
//! - Expose ambient route information (route id, captured parameters,
//!   catch-all) to factories
//!
//! # Design Decisions
//! - `freeze` consumes the context: once a pipeline exists nothing can be
//!   appended to it
//! - A context with any recorded error never yields a pipeline

use std::sync::Arc;

use crate::transforms::error::{TransformBuildError, TransformError};
use crate::transforms::pipeline::{CompiledTransformPipeline, PipelineOptions};
use crate::transforms::template::TemplateBinder;
use crate::transforms::transform::{RequestTransform, ResponseTransform, Transform};

/// What the route's path pattern captures, as seen by transform factories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteShape {
    parameters: Vec<String>,
    catch_all: bool,
}

impl RouteShape {
    pub fn new(parameters: Vec<String>, catch_all: bool) -> Self {
        Self {
            parameters,
            catch_all,
        }
    }

    /// Names of the route values produced by matching.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Whether the pattern ends in a `{**name}` segment.
    pub fn uses_catch_all(&self) -> bool {
        self.catch_all
    }
}

/// Observable lifecycle of a context. The frozen state is the
/// `CompiledTransformPipeline` returned by `freeze`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Empty,
    Accumulating,
}

/// Mutable, single-owner builder for one route.
#[derive(Debug)]
pub struct TransformBuilderContext {
    route_id: String,
    shape: RouteShape,
    binder: Arc<TemplateBinder>,
    entry_index: usize,
    options: PipelineOptions,
    request_transforms: Vec<RequestTransform>,
    response_transforms: Vec<ResponseTransform>,
    errors: Vec<TransformBuildError>,
}

impl TransformBuilderContext {
    pub fn new(route_id: impl Into<String>, shape: RouteShape, binder: Arc<TemplateBinder>) -> Self {
        Self {
            route_id: route_id.into(),
            shape,
            binder,
            entry_index: 0,
            options: PipelineOptions::default(),
            request_transforms: Vec::new(),
            response_transforms: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn shape(&self) -> &RouteShape {
        &self.shape
    }

    pub fn binder(&self) -> &Arc<TemplateBinder> {
        &self.binder
    }

    pub fn state(&self) -> BuilderState {
        if self.request_transforms.is_empty()
            && self.response_transforms.is_empty()
            && self.options == PipelineOptions::default()
            && self.errors.is_empty()
        {
            BuilderState::Empty
        } else {
            BuilderState::Accumulating
        }
    }

    pub fn request_transforms(&self) -> &[RequestTransform] {
        &self.request_transforms
    }

    pub fn response_transforms(&self) -> &[ResponseTransform] {
        &self.response_transforms
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    pub fn errors(&self) -> &[TransformBuildError] {
        &self.errors
    }

    /// Mark the position of the entry being built, for error attribution.
    pub fn begin_entry(&mut self, index: usize) {
        self.entry_index = index;
    }

    /// Append a validated transform to the list it belongs to.
    pub fn push(&mut self, transform: Transform) -> &mut Self {
        match transform {
            Transform::Request(t) => self.request_transforms.push(t),
            Transform::Response(t) => self.response_transforms.push(t),
            Transform::Option(option) => self.options.set(option),
        }
        self
    }

    pub fn add_request_transform(&mut self, transform: RequestTransform) -> &mut Self {
        self.push(Transform::Request(transform))
    }

    pub fn add_response_transform(&mut self, transform: ResponseTransform) -> &mut Self {
        self.push(Transform::Response(transform))
    }

    /// Record an error against the current entry; building carries on.
    pub fn report(&mut self, error: TransformError) {
        tracing::debug!(
            route = %self.route_id,
            index = self.entry_index,
            error = %error,
            "Rejected transform entry"
        );
        self.errors.push(TransformBuildError {
            route: self.route_id.clone(),
            index: self.entry_index,
            error,
        });
    }

    /// Finish the build. Any recorded error withholds the pipeline.
    pub fn freeze(self) -> Result<CompiledTransformPipeline, Vec<TransformBuildError>> {
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        Ok(CompiledTransformPipeline::new(
            self.request_transforms,
            self.response_transforms,
            self.options,
        ))
    }
}
