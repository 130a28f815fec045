//! Process configuration, read once from the environment at startup.
//!
//! Values are parsed before the logger exists, so problems are kept in
//! `warnings` and emitted by `log_summary`.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{info, warn, LevelFilter};

use crate::table::JoinPolicy;
use crate::utils::mask_api_key;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const COMBINED_FILE_NAME: &str = "final_combined_cleaned_data.csv";
pub const DEFAULT_YELP_NROWS: usize = 1000;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub bind_address: String,
    pub log_dir: PathBuf,
    pub log_level: LevelFilter,
    pub requests_per_second: u64,
    pub burst_size: u32,
    pub google_maps_api_key: Option<String>,
    pub warnings: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let data_path = lookup("COMBINED_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| Path::new(&data_dir).join(COMBINED_FILE_NAME));
        let mut warnings = Vec::new();

        Self {
            data_path,
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:9999".to_string()),
            log_dir: lookup("LOG_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("logs")),
            log_level: parse_or(&lookup, "LOG_LEVEL", LevelFilter::Info, &mut warnings),
            requests_per_second: parse_or(&lookup, "RATE_LIMIT_PER_SECOND", 5, &mut warnings),
            burst_size: parse_or(&lookup, "RATE_LIMIT_BURST", 10, &mut warnings),
            google_maps_api_key: lookup("GOOGLE_MAPS_API_KEY").filter(|k| !k.trim().is_empty()),
            warnings,
        }
    }

    pub fn log_summary(&self) {
        for warning in &self.warnings {
            warn!("{}", warning);
        }
        info!("Combined table: {}", self.data_path.display());
        info!("Bind address: {}", self.bind_address);
        info!(
            "Rate limit: {} req/s, burst {}",
            self.requests_per_second, self.burst_size
        );
        match &self.google_maps_api_key {
            Some(key) => info!("Google Maps API key: {}", mask_api_key(key)),
            None => warn!("GOOGLE_MAPS_API_KEY not set; map endpoints will be unavailable"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub business_file: PathBuf,
    pub review_file: PathBuf,
    pub checkin_file: PathBuf,
    pub tip_file: PathBuf,
    pub restaurant_file: PathBuf,
    pub fast_food_file: PathBuf,
    pub output_path: PathBuf,
    output_override: Option<PathBuf>,
    /// Cap on lines read from each Yelp JSON file.
    pub nrows: usize,
    pub join_policy: JoinPolicy,
    pub log_dir: PathBuf,
    pub log_level: LevelFilter,
    pub warnings: Vec<String>,
}

impl BuildConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));
        let mut warnings = Vec::new();
        let join_policy = match lookup("YELP_JOIN").as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("left") => JoinPolicy::Left,
            Some("inner") | None => JoinPolicy::Inner,
            Some(other) => {
                warnings.push(format!("Unknown YELP_JOIN value '{}', using inner join", other));
                JoinPolicy::Inner
            }
        };

        let mut config = Self {
            business_file: PathBuf::new(),
            review_file: PathBuf::new(),
            checkin_file: PathBuf::new(),
            tip_file: PathBuf::new(),
            restaurant_file: PathBuf::new(),
            fast_food_file: PathBuf::new(),
            output_path: PathBuf::new(),
            output_override: lookup("COMBINED_DATA_PATH").map(PathBuf::from),
            nrows: parse_or(&lookup, "YELP_NROWS", DEFAULT_YELP_NROWS, &mut warnings),
            join_policy,
            log_dir: lookup("LOG_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("logs")),
            log_level: parse_or(&lookup, "LOG_LEVEL", LevelFilter::Info, &mut warnings),
            warnings,
        };
        config.relocate(&data_dir);
        config
    }

    /// Point every source file at `data_dir`. The output follows unless
    /// `COMBINED_DATA_PATH` named it explicitly.
    pub fn relocate(&mut self, data_dir: &Path) {
        self.business_file = data_dir.join("yelp_academic_dataset_business.json");
        self.review_file = data_dir.join("yelp_academic_dataset_review.json");
        self.checkin_file = data_dir.join("yelp_academic_dataset_checkin.json");
        self.tip_file = data_dir.join("yelp_academic_dataset_tip.json");
        self.restaurant_file = data_dir.join("restaurants.csv");
        self.fast_food_file = data_dir.join("american_fast_food.csv");
        self.output_path = self
            .output_override
            .clone()
            .unwrap_or_else(|| data_dir.join(COMBINED_FILE_NAME));
    }

    pub fn log_summary(&self) {
        for warning in &self.warnings {
            warn!("{}", warning);
        }
        info!("Output: {}", self.output_path.display());
        info!("Yelp row cap: {}", self.nrows);
    }
}

fn parse_or<T: FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    warnings: &mut Vec<String>,
) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warnings.push(format!("Ignoring invalid {} value '{}'", key, raw));
            default
        }),
        None => default,
    }
}
