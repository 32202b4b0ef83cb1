//! Shipping-flows builder
//!
//! Emits one arc layer over the sampled flow table, seller-red origin to
//! customer-blue destination. An empty flow table produces no spec at all;
//! callers surface that as an error state instead of drawing a blank map.

use polars::prelude::DataFrame;

use super::{Layer, MapSpec, Tooltip, ViewState, ARC_SOURCE_RED, ARC_TARGET_BLUE, MAP_STYLE_LIGHT};
use crate::reader::FLOWS_KEY;

const ARC_WIDTH: f64 = 2.0;
const ARC_WIDTH_SCALE: f64 = 0.001;

/// Build the flow map, or `None` when there are no flow rows to draw.
pub fn flow_map(flows: &DataFrame) -> Option<MapSpec> {
    if flows.height() == 0 {
        return None;
    }

    Some(MapSpec {
        map_style: MAP_STYLE_LIGHT.to_string(),
        view: ViewState::flows(),
        layers: vec![Layer::Arc {
            id: "shipping".to_string(),
            data_key: FLOWS_KEY.to_string(),
            source_position: ["seller_lng".to_string(), "seller_lat".to_string()],
            target_position: ["customer_lng".to_string(), "customer_lat".to_string()],
            source_color: ARC_SOURCE_RED,
            target_color: ARC_TARGET_BLUE,
            width: ARC_WIDTH,
            width_scale: ARC_WIDTH_SCALE,
            width_min_pixels: 1,
            width_max_pixels: 4,
            tooltip: Tooltip::new(
                "<b>Shipping Flow</b><br/>\
                 From: Seller<br/>\
                 To: Customer",
            ),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn flow_frame(n: usize) -> DataFrame {
        let v: Vec<f64> = (0..n).map(|i| i as f64).collect();
        df!(
            "seller_lat" => v.clone(),
            "seller_lng" => v.clone(),
            "customer_lat" => v.clone(),
            "customer_lng" => v,
        )
        .unwrap()
    }

    #[test]
    fn empty_flows_build_no_map() {
        assert!(flow_map(&flow_frame(0)).is_none());
    }

    #[test]
    fn non_empty_flows_build_a_single_arc_layer() {
        let spec = flow_map(&flow_frame(3)).unwrap();
        assert_eq!(spec.layers.len(), 1);
        assert_eq!(spec.layers[0].id(), "shipping");
        assert_eq!(spec.layers[0].data_key(), FLOWS_KEY);
        assert_eq!(spec.view, ViewState::flows());
    }
}
