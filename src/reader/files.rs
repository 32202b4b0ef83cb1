//! File-backed reader: five CSVs → per-city aggregates
//!
//! Expects a data directory containing the five fixed-name datasets and
//! produces [`ActivityData`] via Polars lazy joins:
//!
//! 1. average all geolocation samples per zip prefix into centroids
//! 2. left-join customers and sellers to the centroids on zip prefix
//! 3. inner-join orders → order items → customers → sellers, one row per
//!    fulfilled line item with both endpoint coordinates
//! 4. group by (state, city) per side: unique-id count + first non-null
//!    coordinate; rows whose zip prefix has no geolocation sample are dropped
//! 5. project the endpoint coordinates as the flow table and sample it down
//!    to the cap
//!
//! Any missing file or failed step yields [`FlowmapError::DataUnavailable`];
//! the fallback decision belongs to the caller (see
//! [`load_with_fallback`](super::load_with_fallback)).

use std::fs::File;
use std::path::PathBuf;

use polars::prelude::*;

use super::{sample_rows, ActivityData, DEFAULT_SEED, FLOW_SAMPLE_CAP};
use crate::{FlowmapError, Result};

/// Fixed input file names.
pub const CUSTOMERS_FILE: &str = "olist_customers_dataset.csv";
pub const SELLERS_FILE: &str = "olist_sellers_dataset.csv";
pub const ORDERS_FILE: &str = "olist_orders_dataset.csv";
pub const ORDER_ITEMS_FILE: &str = "olist_order_items_dataset.csv";
pub const GEOLOCATION_FILE: &str = "olist_geolocation_dataset.csv";

/// Loads and aggregates the five raw datasets from a directory.
#[derive(Debug, Clone)]
pub struct FileReader {
    data_dir: PathBuf,
    seed: u64,
    flow_cap: usize,
}

impl FileReader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            seed: DEFAULT_SEED,
            flow_cap: FLOW_SAMPLE_CAP,
        }
    }

    /// Inject the seed used for flow downsampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Override the flow-row cap (default [`FLOW_SAMPLE_CAP`]).
    pub fn with_flow_cap(mut self, cap: usize) -> Self {
        self.flow_cap = cap;
        self
    }

    /// Load all five datasets and aggregate them.
    pub fn load(&self) -> Result<ActivityData> {
        let customers = self.read_csv(CUSTOMERS_FILE)?;
        let sellers = self.read_csv(SELLERS_FILE)?;
        let orders = self.read_csv(ORDERS_FILE)?;
        let items = self.read_csv(ORDER_ITEMS_FILE)?;
        let geolocation = self.read_csv(GEOLOCATION_FILE)?;
        self.aggregate(customers, sellers, orders, items, geolocation)
    }

    fn read_csv(&self, name: &str) -> Result<DataFrame> {
        let path = self.data_dir.join(name);
        if !path.exists() {
            return Err(FlowmapError::DataUnavailable(format!(
                "missing input file: {}",
                path.display()
            )));
        }
        let file = File::open(&path).map_err(|e| {
            FlowmapError::DataUnavailable(format!("failed to open {}: {}", path.display(), e))
        })?;
        CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| FlowmapError::DataUnavailable(format!("failed to parse {}: {}", name, e)))
    }

    fn aggregate(
        &self,
        customers: DataFrame,
        sellers: DataFrame,
        orders: DataFrame,
        items: DataFrame,
        geolocation: DataFrame,
    ) -> Result<ActivityData> {
        // One centroid per zip prefix: the mean of all samples sharing it.
        let centroids = geolocation
            .lazy()
            .group_by([col("geolocation_zip_code_prefix")])
            .agg([
                col("geolocation_lat").mean().alias("lat"),
                col("geolocation_lng").mean().alias("lng"),
            ]);

        let customers_geo = customers
            .lazy()
            .select([
                col("customer_id"),
                col("customer_state"),
                col("customer_city"),
                col("customer_zip_code_prefix"),
            ])
            .join(
                centroids.clone().select([
                    col("geolocation_zip_code_prefix"),
                    col("lat").alias("customer_lat"),
                    col("lng").alias("customer_lng"),
                ]),
                [col("customer_zip_code_prefix")],
                [col("geolocation_zip_code_prefix")],
                JoinArgs::new(JoinType::Left),
            );

        let sellers_geo = sellers
            .lazy()
            .select([
                col("seller_id"),
                col("seller_state"),
                col("seller_city"),
                col("seller_zip_code_prefix"),
            ])
            .join(
                centroids.select([
                    col("geolocation_zip_code_prefix"),
                    col("lat").alias("seller_lat"),
                    col("lng").alias("seller_lng"),
                ]),
                [col("seller_zip_code_prefix")],
                [col("geolocation_zip_code_prefix")],
                JoinArgs::new(JoinType::Left),
            );

        // One row per fulfilled line item with both endpoints' coordinates.
        let merged = orders
            .lazy()
            .select([col("order_id"), col("customer_id")])
            .join(
                items.lazy().select([col("order_id"), col("seller_id")]),
                [col("order_id")],
                [col("order_id")],
                JoinArgs::new(JoinType::Inner),
            )
            .join(
                customers_geo,
                [col("customer_id")],
                [col("customer_id")],
                JoinArgs::new(JoinType::Inner),
            )
            .join(
                sellers_geo,
                [col("seller_id")],
                [col("seller_id")],
                JoinArgs::new(JoinType::Inner),
            )
            .collect()?;

        let customers_agg = city_aggregate(
            &merged,
            "customer_state",
            "customer_city",
            "customer_id",
            "customer_lat",
            "customer_lng",
            "customers",
        )?;
        let sellers_agg = city_aggregate(
            &merged,
            "seller_state",
            "seller_city",
            "seller_id",
            "seller_lat",
            "seller_lng",
            "sellers",
        )?;

        let flows = merged
            .lazy()
            .select([
                col("seller_lat"),
                col("seller_lng"),
                col("customer_lat"),
                col("customer_lng"),
            ])
            .drop_nulls(None)
            .collect()?;
        let flows = sample_rows(&flows, self.flow_cap, self.seed)?;

        Ok(ActivityData {
            customers: customers_agg,
            sellers: sellers_agg,
            flows,
        })
    }
}

/// Group one side of the merged table by (state, city): unique-id count plus
/// the first non-null coordinate, dropping cities with no usable coordinate.
fn city_aggregate(
    merged: &DataFrame,
    state_col: &str,
    city_col: &str,
    id_col: &str,
    lat_col: &str,
    lng_col: &str,
    count_col: &str,
) -> Result<DataFrame> {
    merged
        .clone()
        .lazy()
        .group_by([col(state_col), col(city_col)])
        .agg([
            col(id_col).n_unique().cast(DataType::Int64).alias(count_col),
            col(lat_col).drop_nulls().first().alias("lat"),
            col(lng_col).drop_nulls().first().alias("lng"),
        ])
        .select([
            col(state_col).alias("state"),
            col(city_col).alias("city"),
            col("lat"),
            col("lng"),
            col(count_col),
        ])
        .drop_nulls(Some(cols(["lat", "lng"])))
        .collect()
        .map_err(Into::into)
}
