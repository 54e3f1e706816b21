//! JSON record sink
//!
//! Accumulates accepted records in memory during the crawl and writes them
//! out once at job end. The write is a read-modify-write: records already in
//! the target file load first and the new records append after them. Nothing
//! protects two jobs writing the same file name concurrently; callers that
//! run overlapping jobs use distinct export names.

use crate::record::ProductRecord;
use crate::Result;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Accumulating JSON-document sink for one job
pub struct JsonSink {
    path: PathBuf,
    records: Vec<ProductRecord>,
}

impl JsonSink {
    /// Creates a sink writing under `data_dir`
    ///
    /// The file name is `<export_name>.json` when given, otherwise a
    /// timestamp-derived `products_YYYYmmdd_HHMMSS.json`.
    pub fn new(data_dir: &Path, export_name: Option<&str>) -> Self {
        let stem = match export_name {
            Some(name) => name.to_string(),
            None => format!("products_{}", Local::now().format("%Y%m%d_%H%M%S")),
        };
        Self {
            path: data_dir.join(format!("{stem}.json")),
            records: Vec::new(),
        }
    }

    /// Target file path of this sink
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a record; no I/O happens here
    pub fn accept(&mut self, record: ProductRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes the accumulated records, merged after any existing contents
    ///
    /// With zero accumulated records nothing is written and any pre-existing
    /// file is left untouched. An unreadable or corrupt existing file counts
    /// as empty prior state rather than failing the job.
    pub fn finalize(&mut self) -> Result<Option<PathBuf>> {
        if self.records.is_empty() {
            tracing::info!("No records accumulated, skipping export write");
            return Ok(None);
        }

        let mut merged = load_existing(&self.path);
        merged.append(&mut self.records);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec(&merged)?)?;

        tracing::info!(
            path = %self.path.display(),
            records = merged.len(),
            "Export written"
        );
        Ok(Some(self.path.clone()))
    }
}

fn load_existing(path: &Path) -> Vec<ProductRecord> {
    if !path.exists() {
        return Vec::new();
    }
    match fs::read_to_string(path).map_err(|e| e.to_string()).and_then(|body| {
        serde_json::from_str::<Vec<ProductRecord>>(&body).map_err(|e| e.to_string())
    }) {
        Ok(existing) => existing,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                "Existing export unreadable, treating as empty: {e}"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn empty_sink_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut sink = JsonSink::new(dir.path(), Some("export"));
        assert_eq!(sink.finalize().unwrap(), None);
        assert!(!dir.path().join("export.json").exists());
    }

    #[test]
    fn empty_sink_leaves_preexisting_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.json");
        fs::write(&path, r#"[{"product_title":"Old","product_price":"1","image_url":null,"local_path":null}]"#).unwrap();

        let mut sink = JsonSink::new(dir.path(), Some("export"));
        assert_eq!(sink.finalize().unwrap(), None);

        let loaded: Vec<ProductRecord> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].product_title, "Old");
    }

    #[test]
    fn round_trips_and_appends_after_existing() {
        let dir = tempdir().unwrap();

        let mut first = JsonSink::new(dir.path(), Some("export"));
        first.accept(ProductRecord::new("A", "1.0"));
        first.accept(ProductRecord::new("B", "2.0"));
        let path = first.finalize().unwrap().unwrap();

        let mut second = JsonSink::new(dir.path(), Some("export"));
        second.accept(ProductRecord::new("C", "3.0"));
        second.finalize().unwrap().unwrap();

        let loaded: Vec<ProductRecord> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let titles: Vec<_> = loaded.iter().map(|r| r.product_title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn corrupt_existing_file_counts_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.json");
        fs::write(&path, "{not json").unwrap();

        let mut sink = JsonSink::new(dir.path(), Some("export"));
        sink.accept(ProductRecord::new("A", "1.0"));
        sink.finalize().unwrap().unwrap();

        let loaded: Vec<ProductRecord> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].product_title, "A");
    }

    #[test]
    fn default_name_is_timestamp_derived() {
        let dir = tempdir().unwrap();
        let sink = JsonSink::new(dir.path(), None);
        let name = sink.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("products_"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn creates_missing_data_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("data").join("exports");
        let mut sink = JsonSink::new(&nested, Some("export"));
        sink.accept(ProductRecord::new("A", "1.0"));
        let path = sink.finalize().unwrap().unwrap();
        assert!(path.exists());
    }
}
