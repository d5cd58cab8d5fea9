use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::dedup::is_synthetic;
use crate::error::QualityViolation;
use crate::linker::LinkedPair;
use crate::models::{
    CanonicalBook, ChecksumCounts, DetailRow, LinkCounts, LinkTier, QualityReport, RunCounts,
    SourceArena,
};

pub const DEFAULT_MIN_TITLE_COVERAGE: f64 = 0.90;
const DUPLICATE_SAMPLE: usize = 5;

/// Blocking checks run once per batch before anything is published.
#[derive(Debug, Clone)]
pub struct QualityGate {
    min_title_coverage: f64,
    synthetic_sample_size: usize,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            min_title_coverage: DEFAULT_MIN_TITLE_COVERAGE,
            synthetic_sample_size: 5,
        }
    }
}

/// Everything the gate measures.
pub struct GateInput<'a> {
    pub arena: &'a SourceArena,
    pub pairs: &'a [LinkedPair],
    /// Secondary indices no primary linked to; they still feed canonical rows.
    pub orphans: &'a [usize],
    pub detail: &'a [DetailRow],
    pub canonical: &'a [CanonicalBook],
    pub ingest_ts: DateTime<Utc>,
}

impl QualityGate {
    pub fn new(min_title_coverage: f64, synthetic_sample_size: usize) -> Self {
        Self {
            min_title_coverage: min_title_coverage.clamp(0.0, 1.0),
            synthetic_sample_size,
        }
    }

    /// Checks title coverage, ISBN-13 uniqueness and price sign, in that
    /// order. The first failure aborts; a pass yields the report.
    pub fn evaluate(&self, input: &GateInput<'_>) -> Result<QualityReport, QualityViolation> {
        let detail = input.detail;

        let ratio = title_coverage(detail);
        if ratio < self.min_title_coverage {
            warn!(ratio, threshold = self.min_title_coverage, "title coverage below minimum");
            return Err(QualityViolation::TitleCoverage {
                ratio,
                threshold: self.min_title_coverage,
            });
        }

        let duplicates = duplicated_isbn13(detail);
        if !duplicates.is_empty() {
            let duplicated_rows = duplicates.values().sum();
            let sample = duplicates.keys().take(DUPLICATE_SAMPLE).cloned().collect();
            return Err(QualityViolation::DuplicateIsbn13 {
                duplicated_rows,
                sample,
            });
        }

        let negative: Vec<f64> = published_prices(input)
            .filter(|price| *price < 0.0)
            .collect();
        if let Some(min) = negative.iter().copied().reduce(f64::min) {
            return Err(QualityViolation::NegativePrice {
                count: negative.len(),
                min,
            });
        }

        let report = self.report(input, ratio);
        info!(
            merged_rows = report.counts.merged_rows,
            canonical_rows = report.counts.canonical_rows_emitted,
            synthetic_ids = report.synthetic_ids_count,
            "quality gate passed"
        );
        Ok(report)
    }

    fn report(&self, input: &GateInput<'_>, ratio: f64) -> QualityReport {
        let GateInput {
            arena,
            pairs,
            orphans,
            detail,
            canonical,
            ingest_ts,
        } = *input;

        let mut link_counts = LinkCounts {
            unlinked_secondary: orphans.len(),
            ..LinkCounts::default()
        };
        for pair in pairs {
            match pair.tier {
                Some(LinkTier::Isbn13) => link_counts.isbn13 += 1,
                Some(LinkTier::Isbn10) => link_counts.isbn10 += 1,
                Some(LinkTier::Fuzzy) => link_counts.fuzzy += 1,
                None => link_counts.unmatched += 1,
            }
        }

        let synthetic: Vec<&str> = canonical
            .iter()
            .map(|book| book.canonical_id.as_str())
            .filter(|id| is_synthetic(id))
            .collect();

        let invalid_checksums = ChecksumCounts {
            isbn13: arena
                .primary
                .iter()
                .filter_map(|r| r.isbn13.as_ref())
                .chain(arena.secondary.iter().filter_map(|r| r.isbn13.as_ref()))
                .filter(|isbn| !isbn.has_valid_checksum())
                .count(),
            isbn10: arena
                .primary
                .iter()
                .filter_map(|r| r.isbn10.as_ref())
                .chain(arena.secondary.iter().filter_map(|r| r.isbn10.as_ref()))
                .filter(|isbn| !isbn.has_valid_checksum())
                .count(),
        };

        QualityReport {
            ingest_timestamp: ingest_ts,
            min_title_coverage: self.min_title_coverage,
            counts: RunCounts {
                primary_rows: arena.primary.len(),
                secondary_rows: arena.secondary.len(),
                merged_rows: detail.len(),
                canonical_rows_emitted: canonical.len(),
            },
            link_counts,
            missing_counts: missing_counts(canonical),
            title_coverage_ratio: ratio,
            isbn13_unique: canonical_isbn13_unique(canonical),
            duplicates_detected_by_isbn13: canonical
                .iter()
                .filter(|book| book.isbn13.is_some())
                .map(|book| book.source_ids.len().saturating_sub(1))
                .sum(),
            synthetic_ids_count: synthetic.len(),
            examples_synthetic_ids: synthetic
                .iter()
                .take(self.synthetic_sample_size)
                .map(|id| id.to_string())
                .collect(),
            invalid_checksums,
        }
    }
}

/// Every price that can reach a canonical row: linked ones through the
/// detail table, orphaned ones straight from the catalog.
fn published_prices<'a>(input: &'a GateInput<'_>) -> impl Iterator<Item = f64> + 'a {
    input
        .detail
        .iter()
        .filter_map(|row| row.price_amount)
        .chain(
            input
                .orphans
                .iter()
                .filter_map(|idx| input.arena.secondary[*idx].price_amount),
        )
}

/// Share of detail rows with a primary title. An empty table covers nothing.
pub fn title_coverage(detail: &[DetailRow]) -> f64 {
    if detail.is_empty() {
        return 0.0;
    }
    let covered = detail.iter().filter(|row| row.title_primary.is_some()).count();
    covered as f64 / detail.len() as f64
}

fn canonical_isbn13_unique(canonical: &[CanonicalBook]) -> bool {
    let mut seen = HashSet::new();
    canonical
        .iter()
        .filter_map(|book| book.isbn13.as_ref())
        .all(|isbn| seen.insert(isbn))
}

/// ISBN-13 values carried by more than one row, with their row counts.
fn duplicated_isbn13(detail: &[DetailRow]) -> BTreeMap<String, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for isbn in detail.iter().filter_map(|row| row.isbn13.as_ref()) {
        *counts.entry(isbn.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(isbn, n)| (isbn.to_string(), n))
        .collect()
}

fn missing_counts(canonical: &[CanonicalBook]) -> BTreeMap<String, usize> {
    let fields: [(&str, fn(&CanonicalBook) -> bool); 7] = [
        ("isbn13", |b| b.isbn13.is_none()),
        ("isbn10", |b| b.isbn10.is_none()),
        ("title", |b| b.title.is_none()),
        ("authors", |b| b.authors.is_none()),
        ("pub_date", |b| b.pub_date.is_none()),
        ("language", |b| b.language.is_none()),
        ("price_amount", |b| b.price_amount.is_none()),
    ];
    fields
        .iter()
        .map(|(name, missing)| {
            (
                name.to_string(),
                canonical.iter().filter(|b| missing(b)).count(),
            )
        })
        .collect()
}
