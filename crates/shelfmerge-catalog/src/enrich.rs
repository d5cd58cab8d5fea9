//! Builds the catalog CSV by looking up every scraped listing.

use std::path::Path;

use shelfmerge_core::storage::landing::read_primary;
use shelfmerge_core::{PrimaryRecord, RawPrimaryRecord, RawSecondaryRecord};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::sources::{CatalogLookup, CatalogQuery};

/// Column order of the catalog CSV.
pub const CATALOG_HEADER: [&str; 12] = [
    "gb_id",
    "title",
    "subtitle",
    "authors",
    "publisher",
    "pub_date",
    "language",
    "categories",
    "isbn13",
    "isbn10",
    "price_amount",
    "price_currency",
];

#[derive(Debug, Clone, Default)]
pub struct EnrichOutcome {
    pub rows: Vec<RawSecondaryRecord>,
    pub looked_up: usize,
    pub matched: usize,
    /// Listings with nothing to search for.
    pub skipped: usize,
    pub failed: usize,
}

/// Looks up each listing in order. Failed lookups are logged and skipped.
pub async fn enrich_listings(
    listings: &[RawPrimaryRecord],
    lookup: &dyn CatalogLookup,
) -> EnrichOutcome {
    let mut outcome = EnrichOutcome::default();
    for (ordinal, raw) in listings.iter().enumerate() {
        let record = PrimaryRecord::from_raw(ordinal, raw);
        let Some(query) = CatalogQuery::for_listing(&record) else {
            outcome.skipped += 1;
            continue;
        };

        outcome.looked_up += 1;
        match lookup.lookup(&query).await {
            Ok(Some(row)) => {
                debug!(listing = %record.src_id, %query, "catalog match");
                outcome.matched += 1;
                outcome.rows.push(row);
            }
            Ok(None) => debug!(listing = %record.src_id, %query, "no catalog match"),
            Err(e) => {
                warn!(
                    listing = %record.src_id,
                    %query,
                    source = lookup.name(),
                    error = %e,
                    "catalog lookup failed"
                );
                outcome.failed += 1;
            }
        }
    }

    info!(
        listings = listings.len(),
        matched = outcome.matched,
        failed = outcome.failed,
        "catalog enrichment finished"
    );
    outcome
}

pub fn write_catalog_csv(path: &Path, rows: &[RawSecondaryRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(CATALOG_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads the listing envelope at `input`, enriches it and writes `output`.
pub async fn enrich_file(
    input: &Path,
    output: &Path,
    lookup: &dyn CatalogLookup,
) -> Result<EnrichOutcome> {
    let listings = read_primary(input)?;
    let outcome = enrich_listings(&listings, lookup).await;
    write_catalog_csv(output, &outcome.rows)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use shelfmerge_core::storage::landing::read_secondary;
    use tempfile::TempDir;

    use super::*;
    use crate::error::CatalogError;

    struct FakeCatalog {
        answers: HashMap<String, RawSecondaryRecord>,
        failing: Vec<String>,
    }

    #[async_trait]
    impl CatalogLookup for FakeCatalog {
        fn name(&self) -> &str {
            "fake"
        }

        async fn lookup(&self, query: &CatalogQuery) -> Result<Option<RawSecondaryRecord>> {
            let q = query.to_q();
            if self.failing.contains(&q) {
                return Err(CatalogError::ApiError("fake".into(), "HTTP 500".into()));
            }
            Ok(self.answers.get(&q).cloned())
        }
    }

    fn catalog_row(title: &str, isbn13: &str) -> RawSecondaryRecord {
        RawSecondaryRecord {
            gb_id: Some(format!("id-{isbn13}")),
            title: Some(title.into()),
            authors: Some("Joel Grus".into()),
            publisher: Some("O'Reilly".into()),
            isbn13: Some(isbn13.into()),
            price_amount: Some("34.5".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_enrich_collects_matches_and_skips_failures() {
        let catalog = FakeCatalog {
            answers: HashMap::from([(
                "intitle:Data Science from Scratch inauthor:Joel Grus".to_string(),
                catalog_row("Data Science from Scratch", "9781491901427"),
            )]),
            failing: vec!["isbn:9780000000002".to_string()],
        };
        let listings = vec![
            RawPrimaryRecord {
                title: Some("Data Science from Scratch".into()),
                author: Some("Joel Grus".into()),
                ..Default::default()
            },
            RawPrimaryRecord {
                title: Some("Broken".into()),
                isbn13: Some("9780000000002".into()),
                ..Default::default()
            },
            RawPrimaryRecord {
                title: Some("Unknown".into()),
                isbn10: Some("0000000000".into()),
                ..Default::default()
            },
            RawPrimaryRecord::default(),
        ];

        let outcome = enrich_listings(&listings, &catalog).await;
        assert_eq!(outcome.looked_up, 3);
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.rows[0].title.as_deref(), Some("Data Science from Scratch"));
    }

    #[test]
    fn test_csv_has_fixed_header_and_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("landing").join("googlebooks_books.csv");
        let row = catalog_row("Data Science from Scratch", "9781491901427");
        write_catalog_csv(&path, &[row]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().next().unwrap(), CATALOG_HEADER.join(","));

        let rows = read_secondary(&path, "googlebooks_books.csv").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].publisher.as_deref(), Some("O'Reilly"));
        assert_eq!(rows[0].subtitle, None);
        assert_eq!(rows[0].price_amount.as_deref(), Some("34.5"));
    }

    #[test]
    fn test_empty_csv_still_has_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        write_catalog_csv(&path, &[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap().trim_end(),
            CATALOG_HEADER.join(",")
        );
    }
}
