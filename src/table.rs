//! Flat string table used by the dataset builder. Empty cells are absent values.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, info, warn};
use serde_json::Value;

use crate::error::DataError;

pub type Row = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    #[default]
    Inner,
    // keep unmatched left rows with empty right-hand cells
    Left,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: &[&str], rows: &[&[&str]]) -> Self {
        let mut table = Self::new(columns.iter().copied());
        for row in rows {
            table.push_row(row.iter().map(|cell| cell.to_string()).collect());
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, mut row: Row) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    pub fn column_values(&self, column: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Appends the column if it does not exist.
    pub fn set_column(&mut self, column: &str, mut value_for_row: impl FnMut(usize, &Row) -> String) {
        let idx = match self.column_index(column) {
            Some(idx) => idx,
            None => {
                self.columns.push(column.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
                self.columns.len() - 1
            }
        };
        for (i, row) in self.rows.iter_mut().enumerate() {
            let value = value_for_row(i, row);
            row[idx] = value;
        }
    }

    pub fn select(&self, columns: &[&str]) -> Table {
        let picked: Vec<(usize, &str)> = columns
            .iter()
            .filter_map(|name| self.column_index(name).map(|idx| (idx, *name)))
            .collect();
        let mut out = Table::new(picked.iter().map(|(_, name)| *name));
        for row in &self.rows {
            out.rows
                .push(picked.iter().map(|(idx, _)| row[*idx].clone()).collect());
        }
        out
    }

    pub fn rename(&mut self, mapping: &[(&str, &str)]) {
        for column in &mut self.columns {
            if let Some((_, to)) = mapping.iter().find(|(from, _)| from == column) {
                *column = to.to_string();
            }
        }
    }

    pub fn retain_rows(&mut self, mut keep: impl FnMut(&Row) -> bool) {
        self.rows.retain(|row| keep(row));
    }

    /// Row-wise union, columns in first-seen order.
    pub fn concat(tables: &[Table]) -> Table {
        let mut columns: Vec<String> = Vec::new();
        for table in tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut out = Table::new(columns.iter().cloned());
        for table in tables {
            let positions: Vec<usize> = table
                .columns
                .iter()
                .map(|c| out.column_index(c).unwrap_or_default())
                .collect();
            for row in &table.rows {
                let mut merged = vec![String::new(); columns.len()];
                for (cell, &pos) in row.iter().zip(&positions) {
                    merged[pos] = cell.clone();
                }
                out.rows.push(merged);
            }
        }
        out
    }

    // overlapping non-key columns get _x/_y suffixes; empty keys never match
    pub fn join(&self, right: &Table, key: &str, policy: JoinPolicy) -> Result<Table, DataError> {
        let left_key = self
            .column_index(key)
            .ok_or_else(|| DataError::schema("left side of join", key))?;
        let right_key = right
            .column_index(key)
            .ok_or_else(|| DataError::schema("right side of join", key))?;

        let left_names: HashSet<&str> = self
            .columns
            .iter()
            .filter(|c| *c != key)
            .map(String::as_str)
            .collect();
        let overlap: HashSet<&str> = right
            .columns
            .iter()
            .filter(|c| *c != key && left_names.contains(c.as_str()))
            .map(String::as_str)
            .collect();

        let mut columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if overlap.contains(c.as_str()) {
                    format!("{c}_x")
                } else {
                    c.clone()
                }
            })
            .collect();
        let right_columns: Vec<usize> = (0..right.columns.len())
            .filter(|&i| i != right_key)
            .collect();
        for &i in &right_columns {
            let c = &right.columns[i];
            if overlap.contains(c.as_str()) {
                columns.push(format!("{c}_y"));
            } else {
                columns.push(c.clone());
            }
        }

        let mut by_key: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, row) in right.rows.iter().enumerate() {
            let k = row[right_key].as_str();
            if !k.is_empty() {
                by_key.entry(k).or_default().push(i);
            }
        }

        let mut out = Table {
            columns,
            rows: Vec::new(),
        };
        for left_row in &self.rows {
            let k = left_row[left_key].as_str();
            match by_key.get(k) {
                Some(partners) if !k.is_empty() => {
                    for &r in partners {
                        let mut row = left_row.clone();
                        row.extend(right_columns.iter().map(|&i| right.rows[r][i].clone()));
                        out.rows.push(row);
                    }
                }
                _ => {
                    if policy == JoinPolicy::Left {
                        let mut row = left_row.clone();
                        row.resize(out.columns.len(), String::new());
                        out.rows.push(row);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Reads at most `nrows` lines. Blank lines are skipped but still count.
    pub fn from_json_lines(path: &Path, nrows: usize) -> Result<Table, DataError> {
        let file = File::open(path).map_err(|e| DataError::source_read(path, e))?;
        let reader = BufReader::new(file);

        let mut objects = Vec::new();
        let mut columns: Vec<String> = Vec::new();
        for (line_no, line) in reader.lines().take(nrows).enumerate() {
            let line = line.map_err(|e| DataError::source_read(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(&line).map_err(|e| {
                DataError::source_read(path, format!("line {}: {e}", line_no + 1))
            })?;
            let Value::Object(object) = value else {
                return Err(DataError::source_read(
                    path,
                    format!("line {}: expected a JSON object", line_no + 1),
                ));
            };
            for key in object.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
            objects.push(object);
        }

        let mut table = Table::new(columns.iter().cloned());
        for object in objects {
            let row = columns
                .iter()
                .map(|c| object.get(c).map(json_cell).unwrap_or_default())
                .collect();
            table.rows.push(row);
        }
        debug!(
            "Loaded {} records with {} columns from {}",
            table.len(),
            table.columns.len(),
            path.display()
        );
        Ok(table)
    }

    /// Short records are padded. A record with more fields than the header is an error.
    pub fn read_csv(path: &Path) -> Result<Table, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| DataError::source_read(path, e))?;
        let headers = reader
            .headers()
            .map_err(|e| DataError::source_read(path, e))?
            .clone();
        let mut table = Table::new(headers.iter());
        for record in reader.records() {
            let record = record.map_err(|e| DataError::source_read(path, e))?;
            if record.len() > headers.len() {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                return Err(DataError::source_read(
                    path,
                    format!("line {line}: expected {} fields, found {}", headers.len(), record.len()),
                ));
            }
            table.push_row(record.iter().map(str::to_string).collect());
        }
        debug!(
            "Loaded {} rows with columns {:?} from {}",
            table.len(),
            table.columns,
            path.display()
        );
        Ok(table)
    }

    /// Writes to `<path>.tmp` and renames it over `path`.
    pub fn write_csv(&self, path: &Path) -> Result<(), DataError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DataError::write(path, e))?;
        }
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = Path::new(&tmp_name);

        if let Err(e) = self.write_and_replace(tmp_path, path) {
            if tmp_path.exists() {
                if let Err(cleanup) = fs::remove_file(tmp_path) {
                    warn!("Could not remove {}: {}", tmp_path.display(), cleanup);
                }
            }
            return Err(DataError::write(path, e));
        }
        info!("Wrote {} rows to {}", self.len(), path.display());
        Ok(())
    }

    fn write_and_replace(&self, tmp_path: &Path, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let mut writer = csv::Writer::from_path(tmp_path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        drop(writer);
        fs::rename(tmp_path, path)?;
        Ok(())
    }
}

fn json_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn json_lines_respects_row_cap_and_flattens_cells() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("business.json");
        fs::write(
            &path,
            concat!(
                "{\"business_id\":\"a\",\"stars\":4.5,\"attributes\":{\"WiFi\":\"free\"},\"hours\":null}\n",
                "\n",
                "{\"business_id\":\"b\",\"stars\":3,\"is_open\":true}\n",
                "{\"business_id\":\"c\",\"stars\":2}\n",
            ),
        )
        .unwrap();

        let table = Table::from_json_lines(&path, 3).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.columns(),
            ["business_id", "stars", "attributes", "hours", "is_open"]
        );
        assert_eq!(table.get(0, "attributes"), Some("{\"WiFi\":\"free\"}"));
        assert_eq!(table.get(0, "hours"), Some(""));
        assert_eq!(table.get(1, "is_open"), Some("true"));
        assert_eq!(table.get(1, "stars"), Some("3"));
    }

    #[test]
    fn json_lines_aborts_on_first_corrupt_line() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("review.json");
        fs::write(&path, "{\"business_id\":\"a\"}\n{not json\n{\"business_id\":\"b\"}\n").unwrap();

        let err = Table::from_json_lines(&path, 10).unwrap_err();
        match err {
            DataError::SourceRead { reason, .. } => assert!(reason.contains("line 2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn json_lines_rejects_non_object_lines() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("tip.json");
        fs::write(&path, "[1, 2, 3]\n").unwrap();

        assert!(matches!(
            Table::from_json_lines(&path, 10),
            Err(DataError::SourceRead { .. })
        ));
    }

    #[test]
    fn json_lines_missing_file_is_source_read_error() {
        let temp = tempdir().unwrap();
        let err = Table::from_json_lines(&temp.path().join("absent.json"), 10).unwrap_err();
        assert_eq!(err.kind(), "source_read");
    }

    #[test]
    fn inner_join_drops_unmatched_and_suffixes_overlap() {
        let left = Table::from_rows(
            &["business_id", "name", "stars"],
            &[&["a", "Alpha", "4"], &["b", "Beta", "3"]],
        );
        let right = Table::from_rows(
            &["review_id", "business_id", "stars"],
            &[&["r1", "a", "5"], &["r2", "a", "1"], &["r3", "z", "2"]],
        );

        let joined = left.join(&right, "business_id", JoinPolicy::Inner).unwrap();

        assert_eq!(
            joined.columns(),
            ["business_id", "name", "stars_x", "review_id", "stars_y"]
        );
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.column_values("review_id").unwrap(), ["r1", "r2"]);
        assert_eq!(joined.column_values("stars_x").unwrap(), ["4", "4"]);
    }

    #[test]
    fn left_join_keeps_unmatched_rows() {
        let left = Table::from_rows(&["business_id", "name"], &[&["a", "Alpha"], &["b", "Beta"]]);
        let right = Table::from_rows(&["business_id", "date"], &[&["a", "2020-01-01"]]);

        let joined = left.join(&right, "business_id", JoinPolicy::Left).unwrap();

        assert_eq!(joined.len(), 2);
        assert_eq!(joined.get(1, "name"), Some("Beta"));
        assert_eq!(joined.get(1, "date"), Some(""));
    }

    #[test]
    fn join_requires_key_on_both_sides() {
        let left = Table::from_rows(&["business_id"], &[&["a"]]);
        let right = Table::from_rows(&["id"], &[&["a"]]);
        assert!(matches!(
            left.join(&right, "business_id", JoinPolicy::Inner),
            Err(DataError::Schema { .. })
        ));
    }

    #[test]
    fn concat_unions_columns_in_first_seen_order() {
        let a = Table::from_rows(&["name", "rating"], &[&["A", "4.5"]]);
        let b = Table::from_rows(&["restaurant_name", "rating", "state"], &[&["B", "0", "Unknown"]]);

        let combined = Table::concat(&[a, b]);

        assert_eq!(combined.columns(), ["name", "rating", "restaurant_name", "state"]);
        assert_eq!(combined.rows()[0], ["A", "4.5", "", ""]);
        assert_eq!(combined.rows()[1], ["", "0", "B", "Unknown"]);
    }

    #[test]
    fn select_skips_absent_columns_and_rename_maps_names() {
        let table = Table::from_rows(&["name", "categories", "x"], &[&["A", "Burgers", "1"]]);
        let mut picked = table.select(&["name", "categories", "rating"]);
        picked.rename(&[("name", "restaurant_name"), ("categories", "cuisine_type")]);

        assert_eq!(picked.columns(), ["restaurant_name", "cuisine_type"]);
        assert_eq!(picked.rows()[0], ["A", "Burgers"]);
    }

    #[test]
    fn csv_round_trip_overwrites_existing_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("out").join("combined.csv");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale\n").unwrap();

        let table = Table::from_rows(&["name", "address"], &[&["Chez \"Moi\"", "1 Main St, NY"]]);
        table.write_csv(&path).unwrap();

        let read_back = Table::read_csv(&path).unwrap();
        assert_eq!(read_back, table);
        assert!(!temp.path().join("out").join("combined.csv.tmp").exists());
    }

    #[test]
    fn json_lines_cap_counts_blank_lines() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("checkin.json");
        fs::write(&path, "{\"business_id\":\"a\"}\n\n{\"business_id\":\"b\"}\n").unwrap();

        let table = Table::from_json_lines(&path, 2).unwrap();
        assert_eq!(table.column_values("business_id").unwrap(), ["a"]);
    }

    #[test]
    fn csv_row_with_extra_fields_is_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("fast_food.csv");
        fs::write(&path, "name,city\nBurger Barn,Austin,EXTRA,MORE\n").unwrap();

        match Table::read_csv(&path).unwrap_err() {
            DataError::SourceRead { reason, .. } => assert!(reason.contains("line 2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn csv_short_rows_are_padded() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("restaurants.csv");
        fs::write(&path, "name,city,rating\nA,Austin\n").unwrap();

        let table = Table::read_csv(&path).unwrap();
        assert_eq!(table.rows()[0], ["A", "Austin", ""]);
    }

    #[test]
    fn failed_write_leaves_no_temporary_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("combined.csv");
        fs::create_dir_all(path.join("occupied")).unwrap();

        let table = Table::from_rows(&["name"], &[&["A"]]);
        assert!(matches!(table.write_csv(&path), Err(DataError::Write { .. })));
        assert!(!temp.path().join("combined.csv.tmp").exists());
        assert!(path.is_dir());
    }
}
