//! Request and response transform subsystem.
//!
//! # Data Flow
//! ```text
//! Build (startup and every reload, per route):
//!     [TransformEntry] + RouteShape
//!     → builder.rs (dispatch each entry to a factory)
//!     → factory.rs / path.rs / header.rs / query.rs (validate, construct)
//!     → context.rs (accumulate in order, collect errors)
//!     → pipeline.rs (frozen CompiledTransformPipeline)
//!
//! Execute (per request):
//!     RequestState  → executor.rs (request steps in order)  → upstream
//!     ResponseState → executor.rs (response steps in order) → client
//! ```
//!
//! # Design Decisions
//! - Transforms form a closed set of enum variants; factories are the
//!   extension point for new entry kinds
//! - Every failure is a build-time failure; executing a pipeline cannot fail
//! - Route templates are parsed once and bound through a shared
//!   `TemplateBinder`
//! - Declarative entries and the `add_*` context helpers produce identical
//!   transforms

pub mod builder;
pub mod context;
pub mod error;
pub mod executor;
pub mod factory;
pub mod header;
pub mod path;
pub mod pipeline;
pub mod query;
pub mod state;
pub mod template;
pub mod transform;

pub use builder::TransformBuilder;
pub use context::{BuilderState, RouteShape, TransformBuilderContext};
pub use error::{TransformBuildError, TransformError};
pub use executor::{apply_request_transforms, apply_response_transforms};
pub use factory::TransformFactory;
pub use header::ResponseCondition;
pub use path::{PathRouteValuesTransform, PathString, PathStringTransform, PathTransformMode};
pub use pipeline::{CompiledTransformPipeline, PipelineOption, PipelineOptions};
pub use query::QueryValueSource;
pub use state::{QueryString, RequestState, ResponseState, RouteValues};
pub use template::{BindPolicy, RouteTemplate, TemplateBinder, TemplateError};
pub use transform::{RequestTransform, ResponseTransform, Transform, ValueMode};
