//! Offline construction of the combined restaurant table.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::BuildConfig;
use crate::error::DataError;
use crate::table::{JoinPolicy, Table};

pub const YELP_KEY: &str = "business_id";

pub const CANONICAL_COLUMNS: [&str; 5] = ["name", "address", "city", "cuisine_type", "rating"];

const RESTAURANT_COLUMNS: [(&str, &str); 9] = [
    ("Restaurant ID", "restaurant_id"),
    ("Restaurant Name", "name"),
    ("City", "city"),
    ("Address", "address"),
    ("Latitude", "latitude"),
    ("Longitude", "longitude"),
    ("cuisine_type", "cuisine_type"),
    ("rating", "rating"),
    ("Votes", "review_count"),
];

const FAST_FOOD_COLUMNS: [&str; 8] = [
    "name",
    "categories",
    "address",
    "city",
    "state",
    "latitude",
    "longitude",
    "rating",
];

const FAST_FOOD_RENAMES: [(&str, &str); 3] = [
    ("name", "restaurant_name"),
    ("categories", "cuisine_type"),
    ("address", "location"),
];

const CANONICAL_ALIASES: [(&str, &str); 2] = [("name", "restaurant_name"), ("address", "location")];

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub yelp_rows: usize,
    pub restaurant_rows: usize,
    pub fast_food_rows: usize,
    pub dropped_rows: usize,
    pub total_rows: usize,
    pub output_path: PathBuf,
    pub elapsed: Duration,
}

pub fn load_json_source(path: &Path, nrows: usize) -> Result<Table, DataError> {
    info!("Loading up to {} records from {}", nrows, path.display());
    Table::from_json_lines(path, nrows)
}

pub fn normalize_yelp_business(business: &mut Table) {
    business.rename(&[("categories", "cuisine_type"), ("stars", "rating")]);
}

/// Join business → review → checkin → tip on `business_id`.
pub fn merge_yelp_tables(
    business: &Table,
    review: &Table,
    checkin: &Table,
    tip: &Table,
    policy: JoinPolicy,
) -> Result<Table, DataError> {
    let mut merged = business.clone();
    for (label, right) in [("review", review), ("checkin", checkin), ("tip", tip)] {
        if !right.has_column(YELP_KEY) {
            return Err(DataError::schema(format!("yelp {label} table"), YELP_KEY));
        }
        let before = distinct_keys(&merged);
        merged = merged.join(right, YELP_KEY, policy)?;
        let after = distinct_keys(&merged);
        let lost = before.saturating_sub(after);
        if lost > 0 {
            warn!(
                "Joining yelp {} data dropped {} of {} businesses without {} records",
                label, lost, before, label
            );
        }
        debug!("After joining {}: {} rows", label, merged.len());
    }
    Ok(merged)
}

fn distinct_keys(table: &Table) -> usize {
    table
        .column_values(YELP_KEY)
        .map(|keys| keys.into_iter().collect::<HashSet<_>>().len())
        .unwrap_or_default()
}

pub fn load_and_merge_yelp_data(config: &BuildConfig) -> Result<Table, DataError> {
    let mut business = load_json_source(&config.business_file, config.nrows)?;
    if !business.has_column(YELP_KEY) {
        return Err(DataError::schema("yelp business table", YELP_KEY));
    }
    normalize_yelp_business(&mut business);
    let review = load_json_source(&config.review_file, config.nrows)?;
    let checkin = load_json_source(&config.checkin_file, config.nrows)?;
    let tip = load_json_source(&config.tip_file, config.nrows)?;

    merge_yelp_tables(&business, &review, &checkin, &tip, config.join_policy)
}

pub fn normalize_restaurant_data(restaurants: &Table) -> Result<Table, DataError> {
    for (source, _) in RESTAURANT_COLUMNS {
        if !restaurants.has_column(source) {
            return Err(DataError::schema("restaurant csv", source));
        }
    }
    let sources: Vec<&str> = RESTAURANT_COLUMNS.iter().map(|(source, _)| *source).collect();
    let mut normalized = restaurants.select(&sources);
    normalized.rename(&RESTAURANT_COLUMNS);
    Ok(normalized)
}

pub fn load_restaurant_data(path: &Path) -> Result<Table, DataError> {
    info!("Loading restaurant data from {}", path.display());
    normalize_restaurant_data(&Table::read_csv(path)?)
}

// province wins over state; neither means "Unknown"
pub fn normalize_fast_food_data(mut fast_food: Table) -> Table {
    debug!("Fast food columns: {:?}", fast_food.columns());

    if let Some(province) = fast_food.column_index("province") {
        fast_food.set_column("state", |_, row| row[province].clone());
    } else if !fast_food.has_column("state") {
        fast_food.set_column("state", |_, _| "Unknown".to_string());
    }
    if !fast_food.has_column("rating") {
        fast_food.set_column("rating", |_, _| "0".to_string());
    }

    let mut normalized = fast_food.select(&FAST_FOOD_COLUMNS);
    normalized.rename(&FAST_FOOD_RENAMES);
    normalized
}

pub fn load_fast_food_data(path: &Path) -> Result<Table, DataError> {
    info!("Loading fast food data from {}", path.display());
    Ok(normalize_fast_food_data(Table::read_csv(path)?))
}

/// Returns the combined table and the number of nameless rows dropped.
pub fn combine_tables(yelp: &Table, restaurants: &Table, fast_food: &Table) -> (Table, usize) {
    let mut combined = Table::concat(&[yelp.clone(), restaurants.clone(), fast_food.clone()]);

    for column in CANONICAL_COLUMNS {
        if !combined.has_column(column) {
            combined.set_column(column, |_, _| String::new());
        }
    }

    for (canonical, alias) in CANONICAL_ALIASES {
        let (Some(target), Some(source)) = (combined.column_index(canonical), combined.column_index(alias)) else {
            continue;
        };
        combined.set_column(canonical, |_, row| {
            if row[target].trim().is_empty() {
                row[source].clone()
            } else {
                row[target].clone()
            }
        });
    }

    if let Some(rating) = combined.column_index("rating") {
        let mut defaulted = 0usize;
        combined.set_column("rating", |_, row| {
            let cell = row[rating].trim();
            if cell.parse::<f64>().is_ok_and(f64::is_finite) {
                cell.to_string()
            } else {
                defaulted += 1;
                "0".to_string()
            }
        });
        if defaulted > 0 {
            debug!("Defaulted {} missing or non-numeric ratings to 0", defaulted);
        }
    }

    let before = combined.len();
    if let Some(name) = combined.column_index("name") {
        combined.retain_rows(|row| !row[name].trim().is_empty());
    }
    let dropped = before - combined.len();
    if dropped > 0 {
        warn!("Dropped {} rows without a restaurant name", dropped);
    }
    (combined, dropped)
}

pub fn build_combined_dataset(config: &BuildConfig) -> Result<BuildReport, DataError> {
    let started = Instant::now();

    info!("Processing Yelp datasets...");
    let yelp = load_and_merge_yelp_data(config)?;

    info!("Processing restaurant dataset...");
    let restaurants = load_restaurant_data(&config.restaurant_file)?;

    info!("Processing fast food dataset...");
    let fast_food = load_fast_food_data(&config.fast_food_file)?;

    info!("Combining datasets and saving final data...");
    let (combined, dropped_rows) = combine_tables(&yelp, &restaurants, &fast_food);
    combined.write_csv(&config.output_path)?;

    Ok(BuildReport {
        yelp_rows: yelp.len(),
        restaurant_rows: restaurants.len(),
        fast_food_rows: fast_food.len(),
        dropped_rows,
        total_rows: combined.len(),
        output_path: config.output_path.clone(),
        elapsed: started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restaurant_csv_is_renamed_and_trimmed() {
        let raw = Table::from_rows(
            &[
                "Restaurant ID", "Restaurant Name", "Country Code", "City", "Address",
                "Latitude", "Longitude", "cuisine_type", "rating", "Votes",
            ],
            &[&["7", "Bistro", "1", "Paris", "1 Rue", "48.8", "2.3", "French", "4.4", "120"]],
        );

        let normalized = normalize_restaurant_data(&raw).unwrap();

        assert_eq!(
            normalized.columns(),
            [
                "restaurant_id", "name", "city", "address", "latitude",
                "longitude", "cuisine_type", "rating", "review_count",
            ]
        );
        assert_eq!(normalized.get(0, "review_count"), Some("120"));
        assert!(!normalized.has_column("Country Code"));
    }

    #[test]
    fn restaurant_csv_without_votes_is_a_schema_error() {
        let raw = Table::from_rows(
            &[
                "Restaurant ID", "Restaurant Name", "City", "Address",
                "Latitude", "Longitude", "cuisine_type", "rating",
            ],
            &[],
        );
        match normalize_restaurant_data(&raw) {
            Err(DataError::Schema { column, .. }) => assert_eq!(column, "Votes"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn fast_food_without_rating_defaults_to_zero() {
        let raw = Table::from_rows(
            &["id", "name", "categories", "address", "city", "province", "postalCode"],
            &[
                &["1", "Burger Barn", "Fast Food", "12 Elm St", "Austin", "TX", "78701"],
                &["2", "Taco Hut", "Mexican", "9 Oak Ave", "Dallas", "TX", "75201"],
            ],
        );

        let normalized = normalize_fast_food_data(raw);

        assert_eq!(
            normalized.columns(),
            ["restaurant_name", "cuisine_type", "location", "city", "state", "rating"]
        );
        assert_eq!(normalized.column_values("rating").unwrap(), ["0", "0"]);
        assert_eq!(normalized.column_values("state").unwrap(), ["TX", "TX"]);
    }

    #[test]
    fn fast_food_without_state_or_province_is_unknown() {
        let raw = Table::from_rows(&["name", "rating"], &[&["Sub Shop", "3.5"]]);
        let normalized = normalize_fast_food_data(raw);
        assert_eq!(normalized.get(0, "state"), Some("Unknown"));
        assert_eq!(normalized.get(0, "rating"), Some("3.5"));
    }

    #[test]
    fn fast_food_row_with_extra_fields_aborts_load() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("american_fast_food.csv");
        std::fs::write(&path, "name,city\nBurger Barn,Austin,EXTRA,MORE\n").unwrap();

        assert!(matches!(
            load_fast_food_data(&path),
            Err(DataError::SourceRead { .. })
        ));
    }

    #[test]
    fn fast_food_keeps_existing_state_when_no_province() {
        let raw = Table::from_rows(&["name", "state"], &[&["Sub Shop", "OH"]]);
        let normalized = normalize_fast_food_data(raw);
        assert_eq!(normalized.get(0, "state"), Some("OH"));
    }

    #[test]
    fn yelp_merge_drops_business_without_tip() {
        let mut business = Table::from_rows(
            &["business_id", "name", "stars", "categories"],
            &[&["a", "Alpha", "4.5", "Italian"], &["b", "Beta", "4.0", "Thai"]],
        );
        normalize_yelp_business(&mut business);
        let review = Table::from_rows(&["business_id", "stars", "text"], &[&["a", "5", "great"], &["b", "3", "ok"]]);
        let checkin = Table::from_rows(&["business_id", "date"], &[&["a", "2020"], &["b", "2021"]]);
        let tip = Table::from_rows(&["business_id", "text"], &[&["a", "try the pasta"]]);

        let inner = merge_yelp_tables(&business, &review, &checkin, &tip, JoinPolicy::Inner).unwrap();
        assert_eq!(inner.column_values("name").unwrap(), ["Alpha"]);
        assert_eq!(inner.get(0, "rating"), Some("4.5"));
        assert_eq!(inner.get(0, "cuisine_type"), Some("Italian"));
        assert_eq!(inner.get(0, "text_x"), Some("great"));
        assert_eq!(inner.get(0, "text_y"), Some("try the pasta"));

        let left = merge_yelp_tables(&business, &review, &checkin, &tip, JoinPolicy::Left).unwrap();
        assert_eq!(left.column_values("name").unwrap(), ["Alpha", "Beta"]);
    }

    #[test]
    fn yelp_merge_requires_business_id_everywhere() {
        let business = Table::from_rows(&["business_id"], &[&["a"]]);
        let review = Table::from_rows(&["review_id"], &[&["r"]]);
        let checkin = Table::from_rows(&["business_id"], &[&["a"]]);
        assert!(matches!(
            merge_yelp_tables(&business, &review, &checkin, &checkin, JoinPolicy::Inner),
            Err(DataError::Schema { .. })
        ));
    }

    #[test]
    fn combine_backfills_aliases_and_defaults_ratings() {
        let yelp = Table::from_rows(
            &["business_id", "name", "address", "cuisine_type", "rating"],
            &[&["y1", "Yelp Place", "5 Pine St", "Thai", "4.5"]],
        );
        let restaurants = Table::from_rows(
            &["restaurant_id", "name", "city", "address", "cuisine_type", "rating"],
            &[&["7", "Bistro", "Paris", "1 Rue", "French", "NEW"]],
        );
        let fast_food = Table::from_rows(
            &["restaurant_name", "cuisine_type", "location", "rating"],
            &[&["Burger Barn", "Fast Food", "12 Elm St", "0"], &["", "Fast Food", "1 Nowhere", "0"]],
        );

        let (combined, dropped) = combine_tables(&yelp, &restaurants, &fast_food);

        assert_eq!(dropped, 1);
        assert_eq!(combined.len(), 3);
        assert_eq!(combined.column_values("name").unwrap(), ["Yelp Place", "Bistro", "Burger Barn"]);
        assert_eq!(combined.get(2, "address"), Some("12 Elm St"));
        assert_eq!(combined.get(1, "rating"), Some("0"));
        for column in CANONICAL_COLUMNS {
            assert!(combined.has_column(column), "missing {column}");
        }
    }
}
