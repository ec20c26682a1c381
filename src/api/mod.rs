//! API layer
//!
//! HTTP handlers for:
//! - HTML pages
//! - JSON status endpoints
//! - Metrics (Prometheus)

pub mod metrics;
mod pages;
mod status;

pub use metrics::metrics_router;
pub use pages::pages_router;
pub use status::status_router;
