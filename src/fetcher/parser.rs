//! Catalog response parser
//!
//! Converts one catalog response body into a [`CatalogPage`]. Field names are
//! carried by [`CatalogFormat`] so a different catalog only needs a different
//! format, not a different parser.

use crate::fetcher::{FetcherError, FetcherResult};
use crate::{CatalogEntry, CatalogPage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Field names of the catalog wire format.
///
/// Defaults describe the WordPress plugin directory:
/// `{"plugins": [{"slug", "version", "download_link", "active_installs"}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFormat {
    /// Key of the record collection in the response object
    pub collection_key: String,
    /// Key of the unique identifier
    pub slug_key: String,
    /// Key of the version label
    pub version_key: String,
    /// Key of the direct download URI
    pub link_key: String,
    /// Key of the popularity metric
    pub popularity_key: String,
}

impl Default for CatalogFormat {
    fn default() -> Self {
        Self {
            collection_key: "plugins".to_string(),
            slug_key: "slug".to_string(),
            version_key: "version".to_string(),
            link_key: "download_link".to_string(),
            popularity_key: "active_installs".to_string(),
        }
    }
}

impl CatalogFormat {
    /// Decode a raw response body for page `index`
    ///
    /// # Errors
    /// Returns [`FetcherError::Decode`] if the body is not JSON, the record
    /// collection is missing, or the collection is non-empty but none of its
    /// records decode. Individual records lacking a slug are skipped with a
    /// warning; a record without a download link is kept with an empty link.
    pub fn decode(&self, index: u32, body: &[u8]) -> FetcherResult<CatalogPage> {
        let root: Value = serde_json::from_slice(body)
            .map_err(|e| FetcherError::Decode(format!("page {index}: invalid JSON: {e}")))?;

        let collection = root.get(&self.collection_key).ok_or_else(|| {
            FetcherError::Decode(format!(
                "page {index}: missing '{}' collection",
                self.collection_key
            ))
        })?;

        // Some catalogs key their records by slug instead of listing them.
        let records: Vec<&Value> = match collection {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => map.values().collect(),
            Value::Null => Vec::new(),
            other => {
                return Err(FetcherError::Decode(format!(
                    "page {index}: '{}' is neither an array nor an object (got {})",
                    self.collection_key,
                    kind(other)
                )))
            }
        };

        let total = records.len();
        let mut entries = Vec::with_capacity(total);
        let mut last_error = None;
        for (position, record) in records.into_iter().enumerate() {
            match self.parse_entry(record) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(page = index, position, error = %e, "Skipping malformed catalog record");
                    last_error = Some(e);
                }
            }
        }

        if entries.is_empty() {
            if let Some(e) = last_error {
                return Err(FetcherError::Decode(format!(
                    "page {index}: none of {total} records could be decoded ({e})"
                )));
            }
        }

        let skipped = total - entries.len();
        Ok(CatalogPage::new(index, entries).with_skipped(skipped))
    }

    /// Parse one record into a [`CatalogEntry`]
    pub fn parse_entry(&self, record: &Value) -> FetcherResult<CatalogEntry> {
        let obj = record
            .as_object()
            .ok_or_else(|| FetcherError::Decode(format!("record is {}", kind(record))))?;

        let slug = obj
            .get(&self.slug_key)
            .and_then(scalar_to_string)
            .ok_or_else(|| FetcherError::Decode(format!("missing '{}'", self.slug_key)))?;

        // Without a link the entry still goes through the filter; its download
        // attempt reports the failure.
        let download_link = obj
            .get(&self.link_key)
            .and_then(scalar_to_string)
            .unwrap_or_default();

        // A missing version still yields a usable file name.
        let version = obj
            .get(&self.version_key)
            .and_then(scalar_to_string)
            .unwrap_or_default();

        let popularity = match obj.get(&self.popularity_key) {
            None | Some(Value::Null) => 0,
            Some(value) => parse_popularity(value).ok_or_else(|| {
                FetcherError::Decode(format!(
                    "'{slug}' has invalid '{}': {value}",
                    self.popularity_key
                ))
            })?,
        };

        let entry = CatalogEntry {
            slug,
            version,
            download_link,
            popularity,
        };
        entry.validate().map_err(FetcherError::Decode)?;
        Ok(entry)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_popularity(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
