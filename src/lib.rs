//! flowmap - map-layer dashboards for e-commerce activity data
//!
//! flowmap turns raw transaction and geolocation tables into per-city
//! activity aggregates and renders them as declarative map-layer
//! specifications (point and arc layers in the deck.gl JSON idiom), plus a
//! self-contained dashboard page with summary metrics.
//!
//! # Architecture
//!
//! - [`reader`] - loads the five input CSVs and aggregates them into
//!   [`ActivityData`], or generates synthetic demo data when the real
//!   datasets are absent
//! - [`map`] - typed layer descriptors and the two builders (geographic
//!   distribution, shipping flows)
//! - [`writer`] - the rendering boundary: a [`Writer`](writer::Writer)
//!   turns a [`MapSpec`](map::MapSpec) plus its backing frames into output
//!   for an external rendering runtime
//! - [`page`] - assembles the dashboard HTML (view selector, legend,
//!   headline metrics, ranked lists) around the embedded map spec
//! - [`cache`] - an explicit memoization handle for the load step
//!
//! # Example
//!
//! ```rust,ignore
//! use flowmap::reader::{load_with_fallback, LoadSource};
//! use flowmap::{map, page};
//!
//! let outcome = load_with_fallback("data", 42)?;
//! let html = page::render_page(&outcome.data, page::DashboardView::Distribution, &outcome.source)?;
//! ```

pub mod cache;
pub mod map;
pub mod page;
pub mod reader;
pub mod writer;

// Re-export the tabular currency so downstream code does not need to name
// polars directly for the common cases.
pub use polars::prelude::DataFrame;

pub use cache::LoadCache;
pub use map::{Layer, MapSpec, Rgba, Tooltip, ViewState};
pub use reader::{ActivityData, LoadOutcome, LoadSource};
pub use writer::{DeckGlWriter, Writer};

/// Crate version, surfaced by the CLI and the REST API.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors produced by flowmap operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FlowmapError {
    /// A required input dataset is missing, or loading/merging it failed.
    /// Callers are expected to fall back to demo data wholesale; there is no
    /// partial recovery.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// A map could not be built from the available data (e.g. an empty flow
    /// table). Surfaced to users as an error state, never as a blank map.
    #[error("map unavailable: {0}")]
    MapUnavailable(String),

    /// A layer spec referenced data or columns that do not exist, or output
    /// serialization failed.
    #[error("writer error: {0}")]
    WriterError(String),

    /// Broken internal invariant (poisoned lock, malformed frame).
    #[error("internal error: {0}")]
    InternalError(String),
}

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FlowmapError>;

impl From<polars::prelude::PolarsError> for FlowmapError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        FlowmapError::DataUnavailable(err.to_string())
    }
}
