//! Landing directory ingestion.
//!
//! `.json` files hold scraped listings in a `{"data": [...]}` envelope,
//! `.csv` files hold catalog rows. Anything else is fingerprinted but not read.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::models::{RawPrimaryRecord, RawSecondaryRecord};

/// Fingerprint of one landing file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_name: String,
    pub path: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub ingest_timestamp: DateTime<Utc>,
}

/// Everything read from the landing directory in one pass.
#[derive(Debug, Clone, Default)]
pub struct LandingBatch {
    pub files: Vec<FileMetadata>,
    pub primary: Vec<RawPrimaryRecord>,
    pub secondary: Vec<RawSecondaryRecord>,
}

#[derive(Deserialize)]
struct Envelope {
    data: OneOrMany,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<RawPrimaryRecord>),
    One(Box<RawPrimaryRecord>),
}

pub fn read_landing(dir: &Path, ingest_ts: DateTime<Utc>) -> Result<LandingBatch> {
    if !dir.is_dir() {
        return Err(CoreError::LandingDirNotFound(dir.to_path_buf()));
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut batch = LandingBatch::default();
    for path in paths {
        let metadata = match fingerprint(&path, ingest_ts) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable landing file");
                continue;
            }
        };

        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let loaded = match ext.as_str() {
            "json" => read_primary(&path).map(|rows| {
                debug!(file = %metadata.file_name, rows = rows.len(), "primary rows read");
                batch.primary.extend(rows);
            }),
            "csv" => read_secondary(&path, &metadata.file_name).map(|rows| {
                debug!(file = %metadata.file_name, rows = rows.len(), "secondary rows read");
                batch.secondary.extend(rows);
            }),
            _ => Ok(()),
        };
        if let Err(e) = loaded {
            warn!(file = %metadata.file_name, error = %e, "failed to read landing file");
        }
        batch.files.push(metadata);
    }

    info!(
        files = batch.files.len(),
        primary = batch.primary.len(),
        secondary = batch.secondary.len(),
        "landing directory read"
    );
    Ok(batch)
}

pub fn fingerprint(path: &Path, ingest_ts: DateTime<Utc>) -> Result<FileMetadata> {
    let bytes = fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(FileMetadata {
        file_name,
        path: path.to_string_lossy().to_string(),
        size_bytes: bytes.len() as u64,
        sha256: format!("{:x}", Sha256::digest(&bytes)),
        ingest_timestamp: ingest_ts,
    })
}

pub fn read_primary(path: &Path) -> Result<Vec<RawPrimaryRecord>> {
    let contents = fs::read_to_string(path)?;
    let envelope: Envelope = serde_json::from_str(&contents)?;
    Ok(match envelope.data {
        OneOrMany::Many(rows) => rows,
        OneOrMany::One(row) => vec![*row],
    })
}

pub fn read_secondary(path: &Path, source_file: &str) -> Result<Vec<RawSecondaryRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let mut row: RawSecondaryRecord = row?;
        row.source_file = Some(source_file.to_string());
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 2, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_envelope_accepts_list_or_single_object() {
        let dir = TempDir::new().unwrap();
        let many = dir.path().join("many.json");
        let one = dir.path().join("one.json");
        fs::write(&many, r#"{"data": [{"title": "A"}, {"title": "B", "rating": 4}]}"#).unwrap();
        fs::write(&one, r#"{"data": {"title": "C", "isbn13": 9781491901427}}"#).unwrap();

        let rows = read_primary(&many).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].rating.as_deref(), Some("4"));

        let rows = read_primary(&one).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].isbn13.as_deref(), Some("9781491901427"));
    }

    #[test]
    fn test_csv_empty_cells_are_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.csv");
        fs::write(
            &path,
            "gb_id,title,authors,isbn13,price_amount\nabc,Dune,Frank Herbert,,\n",
        )
        .unwrap();

        let rows = read_secondary(&path, "catalog.csv").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].gb_id.as_deref(), Some("abc"));
        assert_eq!(rows[0].isbn13, None);
        assert_eq!(rows[0].publisher, None);
        assert_eq!(rows[0].source_file.as_deref(), Some("catalog.csv"));
    }

    #[test]
    fn test_landing_scan_is_sorted_and_skips_broken_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.csv"), "title\nSecond\n").unwrap();
        fs::write(dir.path().join("a.csv"), "title\nFirst\n").unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let batch = read_landing(dir.path(), ts()).unwrap();
        let names: Vec<_> = batch.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.csv", "b.csv", "broken.json", "notes.txt"]);
        assert!(batch.primary.is_empty());
        let titles: Vec<_> = batch.secondary.iter().map(|r| r.title.as_deref()).collect();
        assert_eq!(titles, vec![Some("First"), Some("Second")]);
        assert_eq!(batch.files[3].size_bytes, 7);
        assert_eq!(batch.files[0].sha256.len(), 64);
        assert_eq!(batch.files[0].ingest_timestamp, ts());
    }

    #[test]
    fn test_missing_landing_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            read_landing(&missing, ts()),
            Err(CoreError::LandingDirNotFound(_))
        ));
    }
}
