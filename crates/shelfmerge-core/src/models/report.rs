use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row counts at each stage of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub primary_rows: usize,
    pub secondary_rows: usize,
    pub merged_rows: usize,
    pub canonical_rows_emitted: usize,
}

/// How many primary records each linker tier matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCounts {
    pub isbn13: usize,
    pub isbn10: usize,
    pub fuzzy: usize,
    pub unmatched: usize,
    /// Secondary records no primary record linked to.
    pub unlinked_secondary: usize,
}

/// Identifiers whose check digit does not verify. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumCounts {
    pub isbn13: usize,
    pub isbn10: usize,
}

/// Metrics produced by a passing quality gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub ingest_timestamp: DateTime<Utc>,
    pub min_title_coverage: f64,
    pub counts: RunCounts,
    pub link_counts: LinkCounts,
    /// Absent values per canonical field.
    pub missing_counts: BTreeMap<String, usize>,
    pub title_coverage_ratio: f64,
    /// Canonical ISBN-13 values are pairwise distinct.
    pub isbn13_unique: bool,
    /// Source records folded into an ISBN-13 group beyond its first.
    pub duplicates_detected_by_isbn13: usize,
    pub synthetic_ids_count: usize,
    pub examples_synthetic_ids: Vec<String>,
    pub invalid_checksums: ChecksumCounts,
}
