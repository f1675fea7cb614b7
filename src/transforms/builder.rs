//! Turns a route's declarative transform entries into a compiled pipeline.
//!
//! # Responsibilities
//! - Dispatch every entry to the first factory that recognizes it
//! - Record unrecognized entries as errors
//! - Keep one route's failures from leaking into another's build
//!
//! # Data Flow
//! ```text
//! [TransformEntry] → factory.build(ctx) → TransformBuilderContext → freeze()
//!                                                                     ↓
//!                                      CompiledTransformPipeline | errors
//! ```

use std::sync::Arc;

use crate::config::schema::{TransformEntry, TransformSettings};
use crate::transforms::context::{RouteShape, TransformBuilderContext};
use crate::transforms::error::{TransformBuildError, TransformError};
use crate::transforms::factory::TransformFactory;
use crate::transforms::header::HeaderTransformFactory;
use crate::transforms::path::PathTransformFactory;
use crate::transforms::pipeline::CompiledTransformPipeline;
use crate::transforms::query::QueryTransformFactory;
use crate::transforms::template::{BindPolicy, TemplateBinder};

/// Registry of transform factories. Shared read-only across route builds.
pub struct TransformBuilder {
    binder: Arc<TemplateBinder>,
    factories: Vec<Box<dyn TransformFactory>>,
}

impl TransformBuilder {
    /// A builder with the built-in path, header and query factories.
    pub fn new(binder: Arc<TemplateBinder>) -> Self {
        let factories: Vec<Box<dyn TransformFactory>> = vec![
            Box::new(PathTransformFactory::new(binder.clone())),
            Box::new(HeaderTransformFactory),
            Box::new(QueryTransformFactory),
        ];
        Self { binder, factories }
    }

    pub fn from_settings(settings: &TransformSettings) -> Self {
        let policy = if settings.require_route_values {
            BindPolicy::RequireAll
        } else {
            BindPolicy::Lenient
        };
        Self::new(Arc::new(TemplateBinder::new(policy)))
    }

    /// Register an extra factory. Later factories are consulted last.
    pub fn with_factory(mut self, factory: impl TransformFactory + 'static) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    pub fn binder(&self) -> &Arc<TemplateBinder> {
        &self.binder
    }

    pub fn create_context(&self, route_id: &str, shape: RouteShape) -> TransformBuilderContext {
        TransformBuilderContext::new(route_id, shape, self.binder.clone())
    }

    /// Build one route's pipeline. Every entry is visited even after a
    /// failure so that all errors are reported together.
    pub fn build(
        &self,
        route_id: &str,
        shape: RouteShape,
        entries: &[TransformEntry],
    ) -> Result<CompiledTransformPipeline, Vec<TransformBuildError>> {
        let mut ctx = self.create_context(route_id, shape);

        for (index, entry) in entries.iter().enumerate() {
            ctx.begin_entry(index);
            let handled = self.factories.iter().any(|factory| factory.build(&mut ctx, entry));
            if !handled {
                ctx.report(TransformError::Unrecognized {
                    keys: entry.describe_keys(),
                });
            }
        }

        let result = ctx.freeze();
        match &result {
            Ok(pipeline) => tracing::debug!(
                route = %route_id,
                request_transforms = pipeline.request_transforms().len(),
                response_transforms = pipeline.response_transforms().len(),
                "Built transform pipeline"
            ),
            Err(errors) => tracing::debug!(
                route = %route_id,
                errors = errors.len(),
                "Transform pipeline build failed"
            ),
        }
        result
    }
}

impl Default for TransformBuilder {
    fn default() -> Self {
        Self::new(Arc::default())
    }
}
