//! Mock prediction fixtures loaded from a JSON file
//!
//! The file maps a location name to either a prediction object or a
//! precomputed forecast curve:
//!
//! ```json
//! {
//!   "Kisumu": [{ "ds": "2024-05-01", "yhat": 0.41 }, { "ds": "2024-07-01", "yhat": 0.52 }],
//!   "Nakuru": { "city": "Nakuru", "predicted_ndvi": 0.58, "...": "..." },
//!   "default": [{ "ds": "2024-01-01", "yhat": 0.5 }]
//! }
//! ```

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::ForecastPoint;

/// Key of the entry used when a location has no entry of its own
pub const DEFAULT_KEY: &str = "default";

/// Fixture loading errors
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Fixture file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read fixture file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse fixture JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Fixture root must be a JSON object")]
    NotAnObject,
}

/// A resolved fixture entry
#[derive(Debug, Clone, PartialEq)]
pub enum FixtureEntry {
    /// Precomputed forecast curve, in file order; malformed points dropped
    Series(Vec<ForecastPoint>),
    /// Prediction object returned as-is
    Record(Map<String, Value>),
}

impl FixtureEntry {
    /// Interpret a raw JSON value; None for shapes that cannot be served
    ///
    /// A series keeps its well-formed points in file order. A non-empty
    /// series without a single usable point is unusable.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => {
                let points: Vec<ForecastPoint> = items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| {
                        serde_json::from_value::<ForecastPoint>(item.clone())
                            .map_err(|e| {
                                tracing::warn!("Skipping malformed forecast point #{}: {}", i, e)
                            })
                            .ok()
                    })
                    .collect();

                if points.is_empty() && !items.is_empty() {
                    tracing::warn!("Forecast series has no usable points");
                    return None;
                }
                Some(FixtureEntry::Series(points))
            }
            Value::Object(map) => Some(FixtureEntry::Record(map.clone())),
            _ => None,
        }
    }

    /// Short description used by the CLI listing
    pub fn describe(&self) -> String {
        match self {
            FixtureEntry::Series(points) => match (points.first(), points.last()) {
                (Some(first), Some(last)) => {
                    format!("series of {} points ({} .. {})", points.len(), first.ds, last.ds)
                }
                _ => "empty series".to_string(),
            },
            FixtureEntry::Record(map) => format!("record with {} fields", map.len()),
        }
    }
}

/// Parsed fixture file
#[derive(Debug, Clone, Default)]
pub struct FixtureTable {
    entries: Map<String, Value>,
}

impl FixtureTable {
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(entries) => Ok(Self { entries }),
            _ => Err(FixtureError::NotAnObject),
        }
    }

    /// Entry for `location`, else the default entry
    ///
    /// A null value counts as absent.
    pub fn resolve(&self, location: &str) -> Option<FixtureEntry> {
        let raw = self
            .entries
            .get(location)
            .filter(|v| !v.is_null())
            .or_else(|| self.entries.get(DEFAULT_KEY).filter(|v| !v.is_null()))?;
        FixtureEntry::from_value(raw)
    }

    /// All keys, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entry stored under exactly `key`, without the default lookup
    pub fn get(&self, key: &str) -> Option<FixtureEntry> {
        self.entries.get(key).and_then(FixtureEntry::from_value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where fixture tables come from
pub trait FixtureSource: Send + Sync {
    /// Read and parse the fixtures; called once per fallback
    fn load(&self) -> Result<FixtureTable, FixtureError>;

    /// Human-readable location, for logs and the CLI
    fn location(&self) -> String;
}

/// File-backed fixture store
///
/// Nothing is cached: each `load` reads and parses the file again.
#[derive(Debug, Clone)]
pub struct FixtureStore {
    path: PathBuf,
}

impl FixtureStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

}

impl FixtureSource for FixtureStore {
    fn load(&self) -> Result<FixtureTable, FixtureError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FixtureError::NotFound(self.path.clone())
            } else {
                FixtureError::Io {
                    path: self.path.clone(),
                    source: e,
                }
            }
        })?;

        FixtureTable::from_json(&content)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "Kisumu": [
            { "ds": "2024-05-01", "yhat": 0.41 },
            { "ds": "2024-07-01", "yhat": 0.52 }
        ],
        "Nakuru": { "city": "Nakuru", "predicted_ndvi": 0.58 },
        "Garissa": null,
        "Broken": [{ "date": "2024-01-01" }],
        "Patchy": [
            { "ds": "2024-02-01", "yhat": null },
            { "ds": "2024-03-01", "yhat": 0.47 },
            { "yhat": 0.2 },
            { "ds": "2024-04-01", "yhat": 0.49 }
        ],
        "Number": 3,
        "default": [{ "ds": "2024-01-01", "yhat": 0.5 }]
    }"#;

    #[test]
    fn test_resolve_series() {
        let table = FixtureTable::from_json(SAMPLE).unwrap();
        match table.resolve("Kisumu") {
            Some(FixtureEntry::Series(points)) => {
                assert_eq!(points.len(), 2);
                assert_eq!(points[0].ds, "2024-05-01");
                assert!((points[1].yhat - 0.52).abs() < 1e-9);
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_record() {
        let table = FixtureTable::from_json(SAMPLE).unwrap();
        match table.resolve("Nakuru") {
            Some(FixtureEntry::Record(map)) => assert_eq!(map["predicted_ndvi"], 0.58),
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_uses_default_for_missing_and_null() {
        let table = FixtureTable::from_json(SAMPLE).unwrap();
        let default = table.get(DEFAULT_KEY);
        assert!(default.is_some());
        assert_eq!(table.resolve("Mombasa"), default);
        assert_eq!(table.resolve("Garissa"), default);
    }

    #[test]
    fn test_resolve_unusable_shapes() {
        let table = FixtureTable::from_json(SAMPLE).unwrap();
        assert_eq!(table.resolve("Broken"), None);
        assert_eq!(table.resolve("Number"), None);
    }

    #[test]
    fn test_resolve_series_skips_malformed_points() {
        let table = FixtureTable::from_json(SAMPLE).unwrap();
        match table.resolve("Patchy") {
            Some(FixtureEntry::Series(points)) => {
                let dates: Vec<&str> = points.iter().map(|p| p.ds.as_str()).collect();
                assert_eq!(dates, vec!["2024-03-01", "2024-04-01"]);
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_without_default() {
        let table = FixtureTable::from_json(r#"{ "Kisumu": [] }"#).unwrap();
        assert_eq!(table.resolve("Mombasa"), None);
        assert_eq!(table.resolve("Kisumu"), Some(FixtureEntry::Series(vec![])));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(matches!(
            FixtureTable::from_json("[1, 2]"),
            Err(FixtureError::NotAnObject)
        ));
        assert!(matches!(
            FixtureTable::from_json("{ not json"),
            Err(FixtureError::Parse(_))
        ));
    }

    #[test]
    fn test_store_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let store = FixtureStore::new(file.path());
        let table = store.load().unwrap();
        assert_eq!(table.len(), 7);
        assert_eq!(store.location(), file.path().display().to_string());
        assert!(table.keys().any(|k| k == "Kisumu"));
    }

    #[test]
    fn test_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FixtureStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load(), Err(FixtureError::NotFound(_))));
    }

    #[test]
    fn test_store_rereads_on_every_load() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{ "a": [] }"#).unwrap();
        let store = FixtureStore::new(file.path());
        assert_eq!(store.load().unwrap().len(), 1);

        std::fs::write(file.path(), r#"{ "a": [], "b": [] }"#).unwrap();
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn test_describe() {
        let table = FixtureTable::from_json(SAMPLE).unwrap();
        let desc = table.get("Kisumu").unwrap().describe();
        assert_eq!(desc, "series of 2 points (2024-05-01 .. 2024-07-01)");
        assert_eq!(FixtureEntry::Series(vec![]).describe(), "empty series");
    }
}
