//! Geographic distribution builder
//!
//! Emits one point layer per non-empty aggregate: customers smaller and
//! blue, sellers larger and red, each pickable with its own city/state/count
//! tooltip.

use polars::prelude::DataFrame;

use super::{Layer, MapSpec, Tooltip, ViewState, CUSTOMER_BLUE, MAP_STYLE_LIGHT, SELLER_RED};
use crate::reader::{CUSTOMERS_KEY, SELLERS_KEY};

const CUSTOMER_RADIUS_M: f64 = 5000.0;
const SELLER_RADIUS_M: f64 = 8000.0;

/// Build the distribution map from the two per-city aggregates.
///
/// An empty aggregate contributes no layer, so a dataset with customers but
/// no sellers renders a single blue layer rather than an empty red one.
pub fn distribution_map(customers: &DataFrame, sellers: &DataFrame) -> MapSpec {
    let mut layers = Vec::with_capacity(2);

    if customers.height() > 0 {
        layers.push(Layer::Scatterplot {
            id: "customers".to_string(),
            data_key: CUSTOMERS_KEY.to_string(),
            position: ["lng".to_string(), "lat".to_string()],
            fill_color: CUSTOMER_BLUE,
            radius_m: CUSTOMER_RADIUS_M,
            radius_min_pixels: 3,
            radius_max_pixels: 20,
            tooltip: Tooltip::new(
                "<b>Customers</b><br/>\
                 <b>City:</b> {city}<br/>\
                 <b>State:</b> {state}<br/>\
                 <b>Count:</b> {customers}",
            ),
        });
    }

    if sellers.height() > 0 {
        layers.push(Layer::Scatterplot {
            id: "sellers".to_string(),
            data_key: SELLERS_KEY.to_string(),
            position: ["lng".to_string(), "lat".to_string()],
            fill_color: SELLER_RED,
            radius_m: SELLER_RADIUS_M,
            radius_min_pixels: 4,
            radius_max_pixels: 25,
            tooltip: Tooltip::new(
                "<b>Sellers</b><br/>\
                 <b>City:</b> {city}<br/>\
                 <b>State:</b> {state}<br/>\
                 <b>Count:</b> {sellers}",
            ),
        });
    }

    MapSpec {
        map_style: MAP_STYLE_LIGHT.to_string(),
        view: ViewState::distribution(),
        layers,
    }
}
