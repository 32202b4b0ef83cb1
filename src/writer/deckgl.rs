//! deck.gl JSON writer
//!
//! Converts a [`MapSpec`] and its backing DataFrames into a deck.gl
//! JSON-converter document: `mapStyle`, `initialViewState` and a `layers`
//! array whose entries carry an `@@type`, inline row data, accessor strings
//! (`@@=[lng, lat]`) and a per-layer tooltip block for the page runtime.
//!
//! Row data is inlined column-wise from Polars values, the same way the
//! query surfaces serialize frames.

use std::collections::HashMap;

use polars::prelude::{AnyValue, Column, DataFrame};
use serde_json::{json, Map, Value};

use crate::map::{Layer, MapSpec, Tooltip};
use crate::writer::Writer;
use crate::{FlowmapError, Result};

/// Fixed tooltip chrome shared by all layers.
const TOOLTIP_BACKGROUND: &str = "#333D4B";
const TOOLTIP_FONT_SIZE: &str = "12px";

/// deck.gl JSON writer.
pub struct DeckGlWriter;

impl DeckGlWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DeckGlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for DeckGlWriter {
    type Output = String;

    fn validate(&self, spec: &MapSpec, data: &HashMap<String, DataFrame>) -> Result<()> {
        for layer in &spec.layers {
            let df = data.get(layer.data_key()).ok_or_else(|| {
                FlowmapError::WriterError(format!(
                    "missing data source '{}' for layer '{}'",
                    layer.data_key(),
                    layer.id()
                ))
            })?;
            for column in layer.required_columns() {
                if df.column(column).is_err() {
                    return Err(FlowmapError::WriterError(format!(
                        "layer '{}' references column '{}' which does not exist in '{}'",
                        layer.id(),
                        column,
                        layer.data_key()
                    )));
                }
            }
        }
        Ok(())
    }

    fn write(&self, spec: &MapSpec, data: &HashMap<String, DataFrame>) -> Result<String> {
        self.validate(spec, data)?;

        let mut layers = Vec::with_capacity(spec.layers.len());
        for layer in &spec.layers {
            // validate() has already resolved every key.
            let df = &data[layer.data_key()];
            layers.push(layer_to_json(layer, df)?);
        }

        let doc = json!({
            "mapStyle": spec.map_style,
            "initialViewState": spec.view,
            "layers": layers,
        });

        serde_json::to_string_pretty(&doc)
            .map_err(|e| FlowmapError::WriterError(format!("failed to serialize map JSON: {}", e)))
    }
}

fn layer_to_json(layer: &Layer, df: &DataFrame) -> Result<Value> {
    let rows = frame_rows(df)?;
    let value = match layer {
        Layer::Scatterplot {
            id,
            position,
            fill_color,
            radius_m,
            radius_min_pixels,
            radius_max_pixels,
            tooltip,
            ..
        } => json!({
            "@@type": "ScatterplotLayer",
            "id": id,
            "data": rows,
            "getPosition": accessor(position),
            "getFillColor": fill_color,
            "getRadius": radius_m,
            "radiusMinPixels": radius_min_pixels,
            "radiusMaxPixels": radius_max_pixels,
            "pickable": true,
            "tooltip": tooltip_json(tooltip),
        }),
        Layer::Arc {
            id,
            source_position,
            target_position,
            source_color,
            target_color,
            width,
            width_scale,
            width_min_pixels,
            width_max_pixels,
            tooltip,
            ..
        } => json!({
            "@@type": "ArcLayer",
            "id": id,
            "data": rows,
            "getSourcePosition": accessor(source_position),
            "getTargetPosition": accessor(target_position),
            "getSourceColor": source_color,
            "getTargetColor": target_color,
            "getWidth": width,
            "widthScale": width_scale,
            "widthMinPixels": width_min_pixels,
            "widthMaxPixels": width_max_pixels,
            "pickable": true,
            "autoHighlight": true,
            "tooltip": tooltip_json(tooltip),
        }),
    };
    Ok(value)
}

fn accessor(position: &[String; 2]) -> String {
    format!("@@=[{}, {}]", position[0], position[1])
}

fn tooltip_json(tooltip: &Tooltip) -> Value {
    json!({
        "html": tooltip.html,
        "style": {
            "backgroundColor": TOOLTIP_BACKGROUND,
            "color": "white",
            "fontSize": TOOLTIP_FONT_SIZE,
        },
    })
}

/// Convert a frame into inline row objects.
fn frame_rows(df: &DataFrame) -> Result<Vec<Value>> {
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let col_refs: Vec<&Column> = columns
        .iter()
        .map(|name| df.column(name))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| FlowmapError::WriterError(format!("failed to get columns: {}", e)))?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let mut row = Map::new();
        for (name, column) in columns.iter().zip(&col_refs) {
            row.insert(name.clone(), column_value_to_json(column, i));
        }
        rows.push(Value::Object(row));
    }
    Ok(rows)
}

/// Convert a single value from a Polars column to JSON.
fn column_value_to_json(column: &Column, idx: usize) -> Value {
    let any_value = match column.get(idx) {
        Ok(v) => v,
        Err(_) => return Value::Null,
    };

    match any_value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::Int8(v) => Value::Number(v.into()),
        AnyValue::Int16(v) => Value::Number(v.into()),
        AnyValue::Int32(v) => Value::Number(v.into()),
        AnyValue::Int64(v) => Value::Number(v.into()),
        AnyValue::UInt8(v) => Value::Number(v.into()),
        AnyValue::UInt16(v) => Value::Number(v.into()),
        AnyValue::UInt32(v) => Value::Number(v.into()),
        AnyValue::UInt64(v) => Value::Number(v.into()),
        AnyValue::Float32(v) => serde_json::Number::from_f64(v as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        AnyValue::Float64(v) => serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        other => {
            tracing::debug!("converting unsupported value to string: {:?}", other);
            Value::String(format!("{}", other))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{distribution_map, flow_map};
    use crate::reader::{DemoReader, CUSTOMERS_KEY};
    use polars::prelude::*;

    fn demo_data() -> crate::reader::ActivityData {
        DemoReader::new().load().unwrap()
    }

    #[test]
    fn distribution_spec_has_two_scatterplot_layers() {
        let data = demo_data();
        let spec = distribution_map(&data.customers, &data.sellers);
        let json_str = DeckGlWriter::new().write(&spec, &data.layer_data()).unwrap();
        let doc: Value = serde_json::from_str(&json_str).unwrap();

        assert_eq!(doc["mapStyle"], "light");
        assert_eq!(doc["initialViewState"]["latitude"], -14.235);
        assert_eq!(doc["initialViewState"]["pitch"], 0.0);

        let layers = doc["layers"].as_array().unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0]["@@type"], "ScatterplotLayer");
        assert_eq!(layers[0]["id"], "customers");
        assert_eq!(layers[0]["getPosition"], "@@=[lng, lat]");
        assert_eq!(layers[0]["data"].as_array().unwrap().len(), 15);
        assert_eq!(layers[0]["getFillColor"], json!([49, 130, 246, 200]));
        assert_eq!(layers[1]["id"], "sellers");

        // Row objects carry the aggregate columns verbatim.
        let first = &layers[0]["data"][0];
        assert!(first["city"].is_string());
        assert!(first["customers"].is_number());
    }

    #[test]
    fn flow_spec_is_an_arc_layer_with_endpoint_accessors() {
        let flows = df!(
            "seller_lat" => &[-23.5505],
            "seller_lng" => &[-46.6333],
            "customer_lat" => &[-22.9068],
            "customer_lng" => &[-43.1729],
        )
        .unwrap();
        let spec = flow_map(&flows).unwrap();
        let data = HashMap::from([(crate::reader::FLOWS_KEY.to_string(), flows)]);
        let json_str = DeckGlWriter::new().write(&spec, &data).unwrap();
        let doc: Value = serde_json::from_str(&json_str).unwrap();

        let layer = &doc["layers"][0];
        assert_eq!(layer["@@type"], "ArcLayer");
        assert_eq!(layer["getSourcePosition"], "@@=[seller_lng, seller_lat]");
        assert_eq!(layer["getTargetPosition"], "@@=[customer_lng, customer_lat]");
        assert_eq!(doc["initialViewState"]["pitch"], 45.0);
        assert_eq!(layer["data"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn missing_data_key_is_a_writer_error() {
        let data = demo_data();
        let spec = distribution_map(&data.customers, &data.sellers);
        let err = DeckGlWriter::new().write(&spec, &HashMap::new()).unwrap_err();
        assert!(matches!(err, FlowmapError::WriterError(_)));
        assert!(err.to_string().contains("missing data source"));
    }

    #[test]
    fn missing_column_is_a_writer_error() {
        let data = demo_data();
        let spec = distribution_map(&data.customers, &data.sellers);
        let bad = df!("nope" => &[1i64]).unwrap();
        let mut map = data.layer_data();
        map.insert(CUSTOMERS_KEY.to_string(), bad);

        let err = DeckGlWriter::new().write(&spec, &map).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
