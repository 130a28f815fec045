use std::fs::File;
use std::io;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DataError;

/// Columns a combined table must expose for queries to run.
pub const REQUIRED_COLUMNS: [&str; 4] = ["name", "address", "cuisine_type", "rating"];

/// Unparseable numeric cells read as `None`, and as `0.0` for `rating`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RestaurantRecord {
    #[serde(default)]
    pub restaurant_id: Option<String>,
    #[serde(default)]
    pub business_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub cuisine_type: String,
    #[serde(default, deserialize_with = "rating_or_zero")]
    pub rating: f64,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub review_count: Option<u64>,
}

impl RestaurantRecord {
    // restaurant CSV rows carry restaurant_id, Yelp rows business_id
    pub fn id(&self) -> Option<&str> {
        self.restaurant_id
            .as_deref()
            .or(self.business_id.as_deref())
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }
}

fn rating_or_zero<'de, D>(de: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let rating: Option<f64> = csv::invalid_option(de)?;
    Ok(rating.filter(|r| r.is_finite()).unwrap_or(0.0))
}

/// A query result as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub city: String,
    pub cuisine_type: String,
    pub rating: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl From<&RestaurantRecord> for Recommendation {
    fn from(record: &RestaurantRecord) -> Self {
        Self {
            id: record.id().map(str::to_string),
            name: record.name.clone(),
            address: record.address.clone(),
            city: record.city.clone(),
            cuisine_type: record.cuisine_type.clone(),
            rating: record.rating,
            latitude: record.latitude,
            longitude: record.longitude,
        }
    }
}

pub fn load_records(path: &Path) -> Result<Vec<RestaurantRecord>, DataError> {
    let unavailable = |reason: String| DataError::DataUnavailable {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => unavailable("file not found; run build_dataset first".to_string()),
        _ => unavailable(e.to_string()),
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader.headers().map_err(|e| unavailable(e.to_string()))?;
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(DataError::schema("combined table", column));
        }
    }

    reader
        .deserialize::<RestaurantRecord>()
        .enumerate()
        .map(|(i, row)| row.map_err(|e| unavailable(format!("row {}: {e}", i + 1))))
        .collect()
}
