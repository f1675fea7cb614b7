//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, trace layers)
//!     → routing (route snapshot lookup, route values)
//!     → request.rs (RequestState, request transforms, upstream request)
//!     → hyper-util client → destination
//!     → response.rs (response transforms, relay)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::HttpServer;
