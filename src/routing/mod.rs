//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (snapshot lookup, priority order)
//!     → matcher.rs (host + path pattern, capture route values)
//!     → Return: matched route + RouteValues, or NoMatch
//!
//! Route Compilation (startup and every reload):
//!     RouteConfig[]
//!     → Parse path pattern, destination
//!     → Build transform pipeline from the pattern's shape
//!     → Sort by priority
//!     → Publish as immutable RouteSnapshot
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable; reload swaps them atomically
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by priority, then declaration)

pub mod matcher;
pub mod router;

pub use matcher::{HostMatcher, PathPattern, RoutePatternError};
pub use router::{CompiledRoute, RouteBuildError, RouteMatch, RouteSnapshot, RouteTable};
