//! Output writers for map specifications
//!
//! A [`Writer`] turns a [`MapSpec`](crate::map::MapSpec) plus the data map
//! backing its layers into something an external rendering runtime can
//! consume. [`DeckGlWriter`] emits deck.gl-style JSON with row data inlined;
//! other targets would implement the same trait.

use std::collections::HashMap;

use polars::prelude::DataFrame;

use crate::map::MapSpec;
use crate::Result;

pub mod deckgl;

pub use deckgl::DeckGlWriter;

/// Trait for map-spec output formats.
pub trait Writer {
    type Output;

    /// Check that every layer's data key resolves and its required columns
    /// exist, without producing output.
    fn validate(&self, spec: &MapSpec, data: &HashMap<String, DataFrame>) -> Result<()>;

    /// Produce the output document for `spec` backed by `data`.
    fn write(&self, spec: &MapSpec, data: &HashMap<String, DataFrame>) -> Result<Self::Output>;
}
