//! Data loading and aggregation for flowmap
//!
//! The reader module produces [`ActivityData`] - three Polars DataFrames
//! (per-city customer aggregate, per-city seller aggregate, sampled shipping
//! flows) with a fixed column schema shared by both sources:
//!
//! - [`files::FileReader`] builds the aggregates from the five raw CSV
//!   datasets (customers, sellers, orders, order items, geolocation)
//! - [`demo::DemoReader`] generates synthetic aggregates from a fixed
//!   15-city table
//!
//! Loading is all-or-nothing: `FileReader::load` fails with
//! [`FlowmapError::DataUnavailable`] when any input is missing or any merge
//! step fails, and [`load_with_fallback`] is the single place where that
//! failure is converted into a wholesale substitution of demo data. There is
//! no partial recovery (real customers with synthetic sellers never happens).

use std::collections::HashMap;
use std::path::Path;

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::{FlowmapError, Result};

pub mod demo;
pub mod files;

pub use demo::DemoReader;
pub use files::FileReader;

/// Default seed for flow sampling and demo-data generation.
pub const DEFAULT_SEED: u64 = 42;

/// Maximum flow rows kept from real data (rendering cap, not a data limit).
pub const FLOW_SAMPLE_CAP: usize = 1000;

/// Maximum flow rows kept from demo data.
pub const DEMO_FLOW_CAP: usize = 50;

/// Column schema of the customer aggregate.
pub const CUSTOMER_COLUMNS: [&str; 5] = ["state", "city", "lat", "lng", "customers"];

/// Column schema of the seller aggregate.
pub const SELLER_COLUMNS: [&str; 5] = ["state", "city", "lat", "lng", "sellers"];

/// Column schema of the shipping-flow table.
pub const FLOW_COLUMNS: [&str; 4] = ["seller_lat", "seller_lng", "customer_lat", "customer_lng"];

/// Data-map keys under which the aggregates are handed to writers.
pub const CUSTOMERS_KEY: &str = "customers";
pub const SELLERS_KEY: &str = "sellers";
pub const FLOWS_KEY: &str = "flows";

// ============================================================================
// ActivityData
// ============================================================================

/// The three aggregates every surface of the crate consumes.
///
/// All frames are recomputed in full on every load; nothing is mutated in
/// place. Cloning is cheap (Polars columns are reference counted).
#[derive(Debug, Clone)]
pub struct ActivityData {
    /// Per-city customer aggregate, columns [`CUSTOMER_COLUMNS`].
    pub customers: DataFrame,
    /// Per-city seller aggregate, columns [`SELLER_COLUMNS`].
    pub sellers: DataFrame,
    /// Sampled seller→customer coordinate pairs, columns [`FLOW_COLUMNS`].
    pub flows: DataFrame,
}

/// One row of a ranked city list.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RankedCity {
    pub city: String,
    pub state: String,
    pub count: i64,
}

impl ActivityData {
    /// Total customers across all cities.
    pub fn total_customers(&self) -> Result<i64> {
        column_sum(&self.customers, "customers")
    }

    /// Total sellers across all cities.
    pub fn total_sellers(&self) -> Result<i64> {
        column_sum(&self.sellers, "sellers")
    }

    /// The city with the highest customer count, if any rows exist.
    pub fn busiest_city(&self) -> Result<Option<RankedCity>> {
        Ok(self.top_by_customers(1)?.into_iter().next())
    }

    /// Top `n` cities by customer count, descending.
    pub fn top_by_customers(&self, n: usize) -> Result<Vec<RankedCity>> {
        ranked_cities(&self.customers, "customers", n)
    }

    /// Top `n` cities by seller count, descending.
    pub fn top_by_sellers(&self, n: usize) -> Result<Vec<RankedCity>> {
        ranked_cities(&self.sellers, "sellers", n)
    }

    /// The data map handed to a [`Writer`](crate::writer::Writer), keyed by
    /// [`CUSTOMERS_KEY`], [`SELLERS_KEY`] and [`FLOWS_KEY`].
    pub fn layer_data(&self) -> HashMap<String, DataFrame> {
        HashMap::from([
            (CUSTOMERS_KEY.to_string(), self.customers.clone()),
            (SELLERS_KEY.to_string(), self.sellers.clone()),
            (FLOWS_KEY.to_string(), self.flows.clone()),
        ])
    }
}

// ============================================================================
// Fallback policy
// ============================================================================

/// Where a load's data actually came from.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadSource {
    /// The five input CSVs were present and aggregated successfully.
    Files,
    /// Loading the real data failed; demo data was substituted.
    Demo {
        /// Why the real data could not be used (shown to the user).
        reason: String,
    },
}

/// Result of a load attempt plus where the data came from.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub data: ActivityData,
    pub source: LoadSource,
}

/// Load the real datasets from `data_dir`, substituting demo data on any
/// [`FlowmapError::DataUnavailable`].
///
/// This is the caller-side fallback policy: the file reader itself never
/// swaps data. The substitution is logged as a warning and reported in the
/// returned [`LoadSource`] so surfaces can tell the user.
pub fn load_with_fallback(data_dir: impl AsRef<Path>, seed: u64) -> Result<LoadOutcome> {
    match FileReader::new(data_dir.as_ref()).with_seed(seed).load() {
        Ok(data) => Ok(LoadOutcome {
            data,
            source: LoadSource::Files,
        }),
        Err(FlowmapError::DataUnavailable(reason)) => {
            tracing::warn!(reason = %reason, "falling back to demo data");
            let data = DemoReader::new().with_seed(seed).load()?;
            Ok(LoadOutcome {
                data,
                source: LoadSource::Demo { reason },
            })
        }
        Err(other) => Err(other),
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Uniformly sample `cap` rows from `df` with a seeded RNG.
///
/// Frames at or below the cap are returned unchanged. Sampling is without
/// replacement and deterministic for a given seed; the surviving rows keep
/// their original relative order.
pub fn sample_rows(df: &DataFrame, cap: usize, seed: u64) -> Result<DataFrame> {
    if df.height() <= cap {
        return Ok(df.clone());
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<IdxSize> = rand::seq::index::sample(&mut rng, df.height(), cap)
        .into_iter()
        .map(|i| i as IdxSize)
        .collect();
    indices.sort_unstable();
    let indices = IdxCa::from_vec("sample_idx".into(), indices);
    df.take(&indices)
        .map_err(|e| FlowmapError::InternalError(format!("row sampling failed: {}", e)))
}

fn column_sum(df: &DataFrame, name: &str) -> Result<i64> {
    let out = df
        .clone()
        .lazy()
        .select([col(name).sum()])
        .collect()
        .map_err(|e| FlowmapError::InternalError(format!("summing '{}' failed: {}", name, e)))?;
    let value = out
        .column(name)
        .and_then(|c| c.get(0))
        .map_err(|e| FlowmapError::InternalError(format!("summing '{}' failed: {}", name, e)))?;
    any_to_i64(&value)
        .ok_or_else(|| FlowmapError::InternalError(format!("column '{}' is not numeric", name)))
}

fn ranked_cities(df: &DataFrame, count_col: &str, n: usize) -> Result<Vec<RankedCity>> {
    let sorted = df
        .sort(
            [count_col],
            SortMultipleOptions::default().with_order_descending(true),
        )
        .map_err(|e| {
            FlowmapError::InternalError(format!("sorting by '{}' failed: {}", count_col, e))
        })?;
    let top = sorted.head(Some(n));

    let cities = top.column("city").map_err(internal)?;
    let states = top.column("state").map_err(internal)?;
    let counts = top.column(count_col).map_err(internal)?;

    let mut rows = Vec::with_capacity(top.height());
    for i in 0..top.height() {
        let city = any_to_string(&cities.get(i).map_err(internal)?)
            .ok_or_else(|| FlowmapError::InternalError("city column is not text".to_string()))?;
        let state = any_to_string(&states.get(i).map_err(internal)?)
            .ok_or_else(|| FlowmapError::InternalError("state column is not text".to_string()))?;
        let count = any_to_i64(&counts.get(i).map_err(internal)?).ok_or_else(|| {
            FlowmapError::InternalError(format!("column '{}' is not numeric", count_col))
        })?;
        rows.push(RankedCity { city, state, count });
    }
    Ok(rows)
}

fn internal(err: PolarsError) -> FlowmapError {
    FlowmapError::InternalError(err.to_string())
}

pub(crate) fn any_to_i64(value: &AnyValue) -> Option<i64> {
    match value {
        AnyValue::Int8(v) => Some(*v as i64),
        AnyValue::Int16(v) => Some(*v as i64),
        AnyValue::Int32(v) => Some(*v as i64),
        AnyValue::Int64(v) => Some(*v),
        AnyValue::UInt8(v) => Some(*v as i64),
        AnyValue::UInt16(v) => Some(*v as i64),
        AnyValue::UInt32(v) => Some(*v as i64),
        AnyValue::UInt64(v) => Some(*v as i64),
        _ => None,
    }
}

pub(crate) fn any_to_string(value: &AnyValue) -> Option<String> {
    match value {
        AnyValue::String(s) => Some(s.to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn numbered_frame(n: usize) -> DataFrame {
        let ids: Vec<i64> = (0..n as i64).collect();
        df!("id" => ids).unwrap()
    }

    #[test]
    fn sample_keeps_small_frames_unchanged() {
        let df = numbered_frame(10);
        let out = sample_rows(&df, 10, DEFAULT_SEED).unwrap();
        assert!(out.equals(&df));

        let out = sample_rows(&df, 50, DEFAULT_SEED).unwrap();
        assert!(out.equals(&df));
    }

    #[test]
    fn sample_caps_large_frames_exactly() {
        let df = numbered_frame(2500);
        let out = sample_rows(&df, 1000, DEFAULT_SEED).unwrap();
        assert_eq!(out.height(), 1000);
    }

    #[test]
    fn sample_is_deterministic_for_a_seed() {
        let df = numbered_frame(500);
        let a = sample_rows(&df, 100, 7).unwrap();
        let b = sample_rows(&df, 100, 7).unwrap();
        assert!(a.equals(&b));
    }

    proptest! {
        #[test]
        fn sample_height_is_min_of_input_and_cap(height in 0usize..400, cap in 1usize..200) {
            let df = numbered_frame(height);
            let out = sample_rows(&df, cap, DEFAULT_SEED).unwrap();
            prop_assert_eq!(out.height(), height.min(cap));
        }
    }

    #[test]
    fn metrics_over_hand_built_aggregates() {
        let customers = df!(
            "state" => &["SP", "RJ"],
            "city" => &["São Paulo", "Rio de Janeiro"],
            "lat" => &[-23.5505, -22.9068],
            "lng" => &[-46.6333, -43.1729],
            "customers" => &[120i64, 80],
        )
        .unwrap();
        let sellers = df!(
            "state" => &["SP"],
            "city" => &["São Paulo"],
            "lat" => &[-23.5505],
            "lng" => &[-46.6333],
            "sellers" => &[30i64],
        )
        .unwrap();
        let flows = df!(
            "seller_lat" => Vec::<f64>::new(),
            "seller_lng" => Vec::<f64>::new(),
            "customer_lat" => Vec::<f64>::new(),
            "customer_lng" => Vec::<f64>::new(),
        )
        .unwrap();

        let data = ActivityData {
            customers,
            sellers,
            flows,
        };
        assert_eq!(data.total_customers().unwrap(), 200);
        assert_eq!(data.total_sellers().unwrap(), 30);

        let busiest = data.busiest_city().unwrap().unwrap();
        assert_eq!(busiest.city, "São Paulo");
        assert_eq!(busiest.count, 120);

        let top = data.top_by_customers(5).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].city, "São Paulo");
        assert_eq!(top[1].city, "Rio de Janeiro");
    }

    #[test]
    fn fallback_substitutes_demo_data_for_a_missing_directory() {
        let outcome = load_with_fallback("/definitely/not/a/data/dir", DEFAULT_SEED).unwrap();
        match outcome.source {
            LoadSource::Demo { ref reason } => assert!(reason.contains("missing input file")),
            LoadSource::Files => panic!("expected demo fallback"),
        }
        assert_eq!(outcome.data.customers.height(), 15);
        assert_eq!(outcome.data.total_customers().unwrap(), 55_468);
        assert_eq!(outcome.data.total_sellers().unwrap(), 9_355);
    }

    #[test]
    fn aggregate_counts_are_never_negative() {
        let data = DemoReader::new().load().unwrap();
        for city in data.top_by_customers(usize::MAX).unwrap() {
            assert!(city.count >= 0);
        }
        for city in data.top_by_sellers(usize::MAX).unwrap() {
            assert!(city.count >= 0);
        }
    }

    #[test]
    fn layer_data_exposes_all_three_frames() {
        let data = DemoReader::new().load().unwrap();
        let map = data.layer_data();
        assert!(map.contains_key(CUSTOMERS_KEY));
        assert!(map.contains_key(SELLERS_KEY));
        assert!(map.contains_key(FLOWS_KEY));
    }
}
