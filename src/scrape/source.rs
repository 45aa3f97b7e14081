//! Enrichment source files
//!
//! Index output comes in several layouts depending on how it was scraped:
//!
//! - a bare array of listings
//! - a single-letter document `{"medicines": [...]}`
//! - a multi-letter catalogue `{"letters": [{"medicines": [...]}, ...]}`
//! - an object keyed by letter `{"A": [...], "B": [...]}`
//!
//! All of them flatten to one ordered list of [`MedicineListing`].

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::{Error, Result, types::MedicineListing};

/// Flatten any supported layout into listings, dropping duplicate URLs.
pub fn flatten_source(source: Value) -> Result<Vec<MedicineListing>> {
    let entries: Vec<Value> = match source {
        Value::Array(entries) => entries,
        Value::Object(mut map) => {
            if let Some(Value::Array(entries)) = map.remove("medicines") {
                entries
            } else if let Some(Value::Array(groups)) = map.remove("letters") {
                groups
                    .into_iter()
                    .filter_map(|mut group| match group.get_mut("medicines").map(Value::take) {
                        Some(Value::Array(entries)) => Some(entries),
                        _ => None,
                    })
                    .flatten()
                    .collect()
            } else {
                map.into_iter()
                    .filter_map(|(_, v)| match v {
                        Value::Array(entries) => Some(entries),
                        _ => None,
                    })
                    .flatten()
                    .collect()
            }
        }
        other => {
            return Err(Error::config(format!(
                "Unsupported source layout: expected array or object, got {}",
                json_kind(&other)
            )));
        }
    };

    let mut seen = HashSet::new();
    let mut listings = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<MedicineListing>(entry) {
            Ok(listing) if listing.url.is_empty() => {
                warn!("Skipping source entry {}: empty url", position);
            }
            Ok(listing) => {
                if seen.insert(listing.url.clone()) {
                    listings.push(listing);
                }
            }
            Err(e) => warn!("Skipping source entry {}: {}", position, e),
        }
    }

    Ok(listings)
}

/// Read and flatten a source file.
pub async fn load_source(path: &Path) -> Result<Vec<MedicineListing>> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::config(format!("Cannot read source file {}: {}", path.display(), e))
    })?;
    let value: Value = serde_json::from_str(&raw)?;
    let listings = flatten_source(value)?;
    info!("Loaded {} medicines from {}", listings.len(), path.display());
    Ok(listings)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn entry(name: &str) -> Value {
        json!({"name": name, "url": format!("https://www.1mg.com/drugs/{}", name)})
    }

    fn names(listings: &[MedicineListing]) -> Vec<&str> {
        listings.iter().map(|l| l.name.as_str()).collect()
    }

    #[rstest]
    #[case::array(json!([entry("a1"), entry("a2")]))]
    #[case::single_letter(json!({"letter": "A", "medicines": [entry("a1"), entry("a2")]}))]
    #[case::catalogue(json!({"letters": [{"letter": "A", "medicines": [entry("a1")]}, {"letter": "B", "medicines": [entry("a2")]}]}))]
    #[case::keyed(json!({"A": [entry("a1")], "B": [entry("a2")], "scrapedAt": "2024-01-01"}))]
    fn test_flatten_layouts(#[case] source: Value) {
        let listings = flatten_source(source).unwrap();
        assert_eq!(names(&listings), vec!["a1", "a2"]);
    }

    #[test]
    fn test_invalid_and_duplicate_entries_skipped() {
        let source = json!([entry("a1"), {"name": "no url"}, 42, entry("a1"), {"name": "blank", "url": ""}, entry("a3")]);
        let listings = flatten_source(source).unwrap();
        assert_eq!(names(&listings), vec!["a1", "a3"]);
    }

    #[test]
    fn test_scalar_source_rejected() {
        let err = flatten_source(json!("nope")).unwrap_err();
        assert!(err.to_string().contains("string"));
    }

    #[tokio::test]
    async fn test_load_source_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, json!({"medicines": [entry("z1")]}).to_string()).unwrap();

        let listings = load_source(&path).await.unwrap();
        assert_eq!(names(&listings), vec!["z1"]);

        let missing = load_source(&dir.path().join("missing.json")).await;
        assert!(missing.is_err());
    }
}
