//! Synthetic demo data
//!
//! Produces [`ActivityData`] with the same column schema as the file reader,
//! from a fixed table of 15 major Brazilian cities with hand-assigned
//! customer/seller counts. Used by the caller-side fallback when the real
//! datasets are absent, and by the `--demo` flags on the binaries.
//!
//! Flow edges are generated per ordered pair of distinct cities with
//! probability `origin sellers / 10,000` - larger seller hubs emit
//! proportionally more outgoing edges. This is a plausibility heuristic,
//! not a calibrated model. The RNG is seeded, so a fixed seed reproduces
//! the exact edge set.

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{sample_rows, ActivityData, DEFAULT_SEED, DEMO_FLOW_CAP};
use crate::Result;

/// One static reference row of the demo city table.
#[derive(Debug, Clone, Copy)]
pub struct CityRecord {
    pub city: &'static str,
    pub state: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub customers: i64,
    pub sellers: i64,
}

/// The fixed demo city table. Customer counts sum to 55,468 and seller
/// counts to 9,355.
pub const CITIES: [CityRecord; 15] = [
    CityRecord { city: "São Paulo", state: "SP", lat: -23.5505, lng: -46.6333, customers: 13238, sellers: 2421 },
    CityRecord { city: "Rio de Janeiro", state: "RJ", lat: -22.9068, lng: -43.1729, customers: 8567, sellers: 1834 },
    CityRecord { city: "Belo Horizonte", state: "MG", lat: -19.9167, lng: -43.9345, customers: 5234, sellers: 892 },
    CityRecord { city: "Brasília", state: "DF", lat: -15.8267, lng: -47.9218, customers: 4123, sellers: 634 },
    CityRecord { city: "Salvador", state: "BA", lat: -12.9714, lng: -38.5014, customers: 3567, sellers: 523 },
    CityRecord { city: "Fortaleza", state: "CE", lat: -3.7319, lng: -38.5267, customers: 3234, sellers: 445 },
    CityRecord { city: "Curitiba", state: "PR", lat: -25.4284, lng: -49.2733, customers: 2891, sellers: 467 },
    CityRecord { city: "Recife", state: "PE", lat: -8.0476, lng: -34.8770, customers: 2567, sellers: 378 },
    CityRecord { city: "Porto Alegre", state: "RS", lat: -30.0346, lng: -51.2177, customers: 2345, sellers: 412 },
    CityRecord { city: "Manaus", state: "AM", lat: -3.1190, lng: -60.0217, customers: 1987, sellers: 234 },
    CityRecord { city: "Belém", state: "PA", lat: -1.4554, lng: -48.5044, customers: 1765, sellers: 198 },
    CityRecord { city: "Campinas", state: "SP", lat: -22.9099, lng: -47.0626, customers: 1654, sellers: 287 },
    CityRecord { city: "Florianópolis", state: "SC", lat: -27.5954, lng: -48.5480, customers: 1543, sellers: 256 },
    CityRecord { city: "Ribeirão Preto", state: "SP", lat: -21.1775, lng: -47.8100, customers: 1432, sellers: 198 },
    CityRecord { city: "Goiânia", state: "GO", lat: -16.6868, lng: -49.2648, customers: 1321, sellers: 176 },
];

/// Generates synthetic [`ActivityData`] from [`CITIES`].
#[derive(Debug, Clone)]
pub struct DemoReader {
    seed: u64,
    flow_cap: usize,
}

impl DemoReader {
    pub fn new() -> Self {
        Self {
            seed: DEFAULT_SEED,
            flow_cap: DEMO_FLOW_CAP,
        }
    }

    /// Inject the RNG seed used for edge generation and downsampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Override the flow-edge cap (default [`DEMO_FLOW_CAP`]).
    pub fn with_flow_cap(mut self, cap: usize) -> Self {
        self.flow_cap = cap;
        self
    }

    /// Build the three demo frames.
    pub fn load(&self) -> Result<ActivityData> {
        let customers = df!(
            "state" => CITIES.iter().map(|c| c.state).collect::<Vec<_>>(),
            "city" => CITIES.iter().map(|c| c.city).collect::<Vec<_>>(),
            "lat" => CITIES.iter().map(|c| c.lat).collect::<Vec<_>>(),
            "lng" => CITIES.iter().map(|c| c.lng).collect::<Vec<_>>(),
            "customers" => CITIES.iter().map(|c| c.customers).collect::<Vec<_>>(),
        )?;
        let sellers = df!(
            "state" => CITIES.iter().map(|c| c.state).collect::<Vec<_>>(),
            "city" => CITIES.iter().map(|c| c.city).collect::<Vec<_>>(),
            "lat" => CITIES.iter().map(|c| c.lat).collect::<Vec<_>>(),
            "lng" => CITIES.iter().map(|c| c.lng).collect::<Vec<_>>(),
            "sellers" => CITIES.iter().map(|c| c.sellers).collect::<Vec<_>>(),
        )?;
        let flows = self.flow_edges()?;

        Ok(ActivityData {
            customers,
            sellers,
            flows,
        })
    }

    fn flow_edges(&self) -> Result<DataFrame> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut seller_lat = Vec::new();
        let mut seller_lng = Vec::new();
        let mut customer_lat = Vec::new();
        let mut customer_lng = Vec::new();

        for (i, origin) in CITIES.iter().enumerate() {
            for (j, dest) in CITIES.iter().enumerate() {
                if i == j {
                    continue;
                }
                let probability = origin.sellers as f64 / 10_000.0;
                if rng.gen::<f64>() < probability {
                    seller_lat.push(origin.lat);
                    seller_lng.push(origin.lng);
                    customer_lat.push(dest.lat);
                    customer_lng.push(dest.lng);
                }
            }
        }

        let flows = df!(
            "seller_lat" => seller_lat,
            "seller_lng" => seller_lng,
            "customer_lat" => customer_lat,
            "customer_lng" => customer_lng,
        )?;
        sample_rows(&flows, self.flow_cap, self.seed)
    }
}

impl Default for DemoReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{CUSTOMER_COLUMNS, FLOW_COLUMNS, SELLER_COLUMNS};

    #[test]
    fn city_totals_are_pinned() {
        let data = DemoReader::new().load().unwrap();
        assert_eq!(data.customers.height(), 15);
        assert_eq!(data.sellers.height(), 15);
        assert_eq!(data.total_customers().unwrap(), 55_468);
        assert_eq!(data.total_sellers().unwrap(), 9_355);
    }

    #[test]
    fn frames_match_the_shared_schema() {
        let data = DemoReader::new().load().unwrap();
        let names = |df: &DataFrame| {
            df.get_column_names()
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&data.customers), CUSTOMER_COLUMNS);
        assert_eq!(names(&data.sellers), SELLER_COLUMNS);
        assert_eq!(names(&data.flows), FLOW_COLUMNS);
    }

    #[test]
    fn edge_generation_is_deterministic_for_a_seed() {
        let a = DemoReader::new().with_seed(7).load().unwrap();
        let b = DemoReader::new().with_seed(7).load().unwrap();
        assert!(a.flows.equals(&b.flows));
    }

    #[test]
    fn edges_respect_the_cap_and_pair_bound() {
        // 15 cities → at most 210 ordered pairs before downsampling.
        let data = DemoReader::new().load().unwrap();
        assert!(data.flows.height() <= DEMO_FLOW_CAP);

        let uncapped = DemoReader::new().with_flow_cap(usize::MAX).load().unwrap();
        assert!(uncapped.flows.height() <= 15 * 14);
    }

    #[test]
    fn busiest_city_is_the_primary_hub() {
        let data = DemoReader::new().load().unwrap();
        let hub = data.busiest_city().unwrap().unwrap();
        assert_eq!(hub.city, "São Paulo");
        assert_eq!(hub.state, "SP");
    }
}
