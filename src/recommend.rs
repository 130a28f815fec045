//! Top-N restaurant queries over the combined table. Each call re-reads the file.

use std::path::{Path, PathBuf};

use log::{debug, error, info};
use serde::Serialize;

use crate::error::DataError;
use crate::record::{load_records, Recommendation, RestaurantRecord};
use crate::utils::{contains_ignore_case, DEFAULT_LIMIT};

pub const DEFAULT_MIN_RATING: f64 = 4.0;

/// `location` is matched against `address`. Empty strings match every row.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub location: String,
    pub cuisine: String,
    pub min_rating: f64,
}

impl Filter {
    pub fn new(location: impl Into<String>, cuisine: impl Into<String>, min_rating: f64) -> Self {
        Self {
            location: location.into(),
            cuisine: cuisine.into(),
            min_rating,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.location.is_empty() && self.cuisine.is_empty()
    }

    pub fn matches(&self, record: &RestaurantRecord) -> bool {
        contains_ignore_case(&record.address, &self.location)
            && contains_ignore_case(&record.cuisine_type, &self.cuisine)
            && record.rating >= self.min_rating
    }
}

pub fn top_n(records: &[RestaurantRecord], limit: usize) -> Vec<Recommendation> {
    rank(records.iter(), limit)
}

pub fn filtered_top_n(records: &[RestaurantRecord], filter: &Filter, limit: usize) -> Vec<Recommendation> {
    rank(records.iter().filter(|r| filter.matches(r)), limit)
}

fn rank<'a>(records: impl Iterator<Item = &'a RestaurantRecord>, limit: usize) -> Vec<Recommendation> {
    let mut ranked: Vec<&RestaurantRecord> = records.collect();
    // sort_by is stable, which keeps equal ratings in table order
    ranked.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    ranked.into_iter().take(limit).map(Recommendation::from).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    Top,
    Filtered,
}

#[derive(Debug)]
pub struct QueryOutcome {
    pub mode: QueryMode,
    pub results: Vec<Recommendation>,
    pub error: Option<DataError>,
}

impl QueryOutcome {
    fn ok(mode: QueryMode, results: Vec<Recommendation>) -> Self {
        Self {
            mode,
            results,
            error: None,
        }
    }

    fn failed(mode: QueryMode, err: DataError) -> Self {
        error!("Query failed: {}", err);
        Self {
            mode,
            results: Vec::new(),
            error: Some(err),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub rating: f64,
}

pub fn heat_points(records: &[RestaurantRecord]) -> Vec<HeatPoint> {
    records
        .iter()
        .filter_map(|r| {
            r.coordinates().map(|(latitude, longitude)| HeatPoint {
                latitude,
                longitude,
                rating: r.rating,
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct QueryService {
    data_path: PathBuf,
}

impl QueryService {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn load(&self) -> Result<Vec<RestaurantRecord>, DataError> {
        let records = load_records(&self.data_path)?;
        debug!("Loaded {} records from {}", records.len(), self.data_path.display());
        Ok(records)
    }

    pub fn top(&self, limit: usize) -> QueryOutcome {
        match self.load() {
            Ok(records) => QueryOutcome::ok(QueryMode::Top, top_n(&records, limit)),
            Err(e) => QueryOutcome::failed(QueryMode::Top, e),
        }
    }

    /// Blank text filters mean the unfiltered top-N, without the rating bound.
    pub fn recommend(&self, filter: &Filter, limit: usize) -> QueryOutcome {
        if filter.is_blank() {
            info!("No location or cuisine given, returning top {} overall", limit);
            return self.top(limit);
        }
        info!(
            "Searching location='{}' cuisine='{}' min_rating={} limit={}",
            filter.location, filter.cuisine, filter.min_rating, limit
        );
        match self.load() {
            Ok(records) => {
                let results = filtered_top_n(&records, filter, limit);
                if results.is_empty() {
                    info!("No restaurants matched the filters");
                }
                QueryOutcome::ok(QueryMode::Filtered, results)
            }
            Err(e) => QueryOutcome::failed(QueryMode::Filtered, e),
        }
    }

    pub fn recommend_with(&self, location: &str, cuisine: &str, min_rating: f64, limit: Option<usize>) -> QueryOutcome {
        self.recommend(
            &Filter::new(location, cuisine, min_rating),
            limit.unwrap_or(DEFAULT_LIMIT),
        )
    }

    pub fn heatmap(&self) -> Result<Vec<HeatPoint>, DataError> {
        Ok(heat_points(&self.load()?))
    }
}
