//! Map-layer descriptors
//!
//! Types describing what the rendering collaborator should draw: layer
//! descriptors (point and arc), camera state and per-layer tooltips. The
//! builders here only construct descriptors - turning them into pixels is
//! the job of the deck.gl runtime fed by a [`Writer`](crate::writer::Writer).
//!
//! Every layer names the data-map key of its backing frame and the `[lng,
//! lat]` columns to read positions from; a writer validates those references
//! before emitting output.

pub mod distribution;
pub mod flows;

pub use distribution::distribution_map;
pub use flows::flow_map;

use serde::Serialize;

/// Geographic centroid of Brazil, the dashboard's home view.
pub const BRAZIL_CENTER: (f64, f64) = (-14.235, -51.9253);

/// Base map style handed to the rendering runtime.
pub const MAP_STYLE_LIGHT: &str = "light";

/// RGBA color as deck.gl expects it (0–255 per channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgba(pub [u8; 4]);

/// Customer points and arc destinations.
pub const CUSTOMER_BLUE: Rgba = Rgba([49, 130, 246, 200]);
/// Seller points and arc origins.
pub const SELLER_RED: Rgba = Rgba([239, 68, 68, 200]);
/// Arc endpoint colors run slightly more transparent than points.
pub const ARC_SOURCE_RED: Rgba = Rgba([239, 68, 68, 180]);
pub const ARC_TARGET_BLUE: Rgba = Rgba([49, 130, 246, 180]);

/// Camera parameters for the initial view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewState {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

impl ViewState {
    /// Moderate zoom, no tilt - the geographic distribution view.
    pub fn distribution() -> Self {
        Self {
            latitude: BRAZIL_CENTER.0,
            longitude: BRAZIL_CENTER.1,
            zoom: 4.5,
            pitch: 0.0,
            bearing: 0.0,
        }
    }

    /// Tighter zoom with a 45° tilt so arcs read as arcs.
    pub fn flows() -> Self {
        Self {
            latitude: BRAZIL_CENTER.0,
            longitude: BRAZIL_CENTER.1,
            zoom: 4.2,
            pitch: 45.0,
            bearing: 0.0,
        }
    }
}

/// Hover tooltip for one layer.
///
/// Each layer carries its own template so customer and seller points keep
/// distinct field sets; nothing interpolates fields that may be missing on
/// the hovered row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    /// HTML template; `{column}` placeholders are substituted per row.
    pub html: String,
}

impl Tooltip {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

/// A single drawable layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Layer {
    /// Point layer: one circle per row.
    Scatterplot {
        id: String,
        /// Key of the backing frame in the writer's data map.
        data_key: String,
        /// `[lng, lat]` column names.
        position: [String; 2],
        fill_color: Rgba,
        /// Circle radius in meters, clamped to the pixel bounds below.
        radius_m: f64,
        radius_min_pixels: u32,
        radius_max_pixels: u32,
        tooltip: Tooltip,
    },
    /// Arc layer: one origin→destination arc per row.
    Arc {
        id: String,
        data_key: String,
        /// `[lng, lat]` column names of the arc origin.
        source_position: [String; 2],
        /// `[lng, lat]` column names of the arc destination.
        target_position: [String; 2],
        source_color: Rgba,
        target_color: Rgba,
        width: f64,
        width_scale: f64,
        width_min_pixels: u32,
        width_max_pixels: u32,
        tooltip: Tooltip,
    },
}

impl Layer {
    pub fn id(&self) -> &str {
        match self {
            Layer::Scatterplot { id, .. } | Layer::Arc { id, .. } => id,
        }
    }

    pub fn data_key(&self) -> &str {
        match self {
            Layer::Scatterplot { data_key, .. } | Layer::Arc { data_key, .. } => data_key,
        }
    }

    /// Columns a writer must find in the backing frame.
    pub fn required_columns(&self) -> Vec<&str> {
        match self {
            Layer::Scatterplot { position, .. } => position.iter().map(String::as_str).collect(),
            Layer::Arc {
                source_position,
                target_position,
                ..
            } => source_position
                .iter()
                .chain(target_position.iter())
                .map(String::as_str)
                .collect(),
        }
    }

    pub fn tooltip(&self) -> &Tooltip {
        match self {
            Layer::Scatterplot { tooltip, .. } | Layer::Arc { tooltip, .. } => tooltip,
        }
    }
}

/// A complete map description: style, camera and layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSpec {
    pub map_style: String,
    pub view: ViewState,
    pub layers: Vec<Layer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_states_share_the_brazil_center() {
        let d = ViewState::distribution();
        let f = ViewState::flows();
        assert_eq!((d.latitude, d.longitude), BRAZIL_CENTER);
        assert_eq!((f.latitude, f.longitude), BRAZIL_CENTER);
        assert_eq!(d.pitch, 0.0);
        assert_eq!(f.pitch, 45.0);
        assert!(f.zoom < d.zoom);
    }

    #[test]
    fn arc_layers_require_both_endpoint_columns() {
        let layer = Layer::Arc {
            id: "shipping".to_string(),
            data_key: "flows".to_string(),
            source_position: ["seller_lng".to_string(), "seller_lat".to_string()],
            target_position: ["customer_lng".to_string(), "customer_lat".to_string()],
            source_color: ARC_SOURCE_RED,
            target_color: ARC_TARGET_BLUE,
            width: 2.0,
            width_scale: 0.001,
            width_min_pixels: 1,
            width_max_pixels: 4,
            tooltip: Tooltip::new("<b>Shipping</b>"),
        };
        assert_eq!(
            layer.required_columns(),
            ["seller_lng", "seller_lat", "customer_lng", "customer_lat"]
        );
    }
}
