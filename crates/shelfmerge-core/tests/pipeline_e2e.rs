use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use shelfmerge_core::{
    CoreError, LinkTier, QualityGate, QualityViolation, RawPrimaryRecord, RawSecondaryRecord,
    SourceKind, SrcId, integrate,
};

fn ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

fn primary(
    title: &str,
    author: &str,
    isbn13: Option<&str>,
    isbn10: Option<&str>,
) -> RawPrimaryRecord {
    RawPrimaryRecord {
        title: Some(title.into()),
        author: Some(author.into()),
        rating: Some("4.05".into()),
        ratings_count: Some("1,000".into()),
        isbn13: isbn13.map(Into::into),
        isbn10: isbn10.map(Into::into),
        ..Default::default()
    }
}

fn secondary(title: &str, authors: &str, isbn13: Option<&str>) -> RawSecondaryRecord {
    RawSecondaryRecord {
        title: Some(title.into()),
        authors: Some(authors.into()),
        isbn13: isbn13.map(Into::into),
        ..Default::default()
    }
}

fn sample_batch() -> (Vec<RawPrimaryRecord>, Vec<RawSecondaryRecord>) {
    let primaries = vec![
        primary(
            "Data Science From Scratch: First Principles with Python",
            "Joel Grus",
            None,
            None,
        ),
        primary("Python for Data Analysis", "Wes McKinney", Some("978-1-4919-5766-0"), None),
        primary("Hands-On Machine Learning", "Aurélien Géron", None, Some("1492032646")),
        primary("Storytelling with Data", "Cole Nussbaumer Knaflic", None, None),
        primary("Storytelling with Data", "Cole Nussbaumer Knaflic", None, None),
    ];
    let secondaries = vec![
        RawSecondaryRecord {
            gb_id: Some("7Mu-BwAAQBAJ".into()),
            publisher: Some("O'Reilly".into()),
            pub_date: Some("2015-04-14".into()),
            language: Some("en-US".into()),
            price_amount: Some("34.5".into()),
            price_currency: Some("$".into()),
            ..secondary("Data Science from Scratch", "Joel Grus", Some("9781491901427"))
        },
        RawSecondaryRecord {
            pub_date: Some("2017".into()),
            ..secondary("Python for Data Analysis", "Wes McKinney", Some("9781491957660"))
        },
        RawSecondaryRecord {
            isbn10: Some("1492032646".into()),
            ..secondary(
                "Hands-On Machine Learning with Scikit-Learn",
                "Aurélien Géron",
                Some("9781492032649"),
            )
        },
        secondary("The Pragmatic Programmer", "David Thomas, Andrew Hunt", Some("9780135957059")),
    ];
    (primaries, secondaries)
}

#[test]
fn test_fuzzy_linked_listing_takes_catalog_identity() {
    let (primaries, secondaries) = sample_batch();
    let output = integrate(&primaries, &secondaries, ts(), &QualityGate::default()).unwrap();

    let row = &output.detail[0];
    assert_eq!(row.link_tier, Some(LinkTier::Fuzzy));
    assert_eq!(row.secondary_src_id, Some(SrcId::secondary(0)));
    assert_eq!(row.isbn13.as_ref().map(|i| i.as_str()), Some("9781491901427"));
    assert_eq!(row.publisher.as_deref(), Some("O'Reilly"));
    assert_eq!(row.provenance_title, Some(SourceKind::Secondary));
    assert_eq!(row.title.as_deref(), Some("Data Science from Scratch"));
    assert_eq!(row.canonical_id, "9781491901427");

    let book = output
        .canonical
        .iter()
        .find(|b| b.canonical_id == "9781491901427")
        .unwrap();
    assert_eq!(book.publisher.as_deref(), Some("O'Reilly"));
    assert_eq!(book.provenance_title, Some(SourceKind::Secondary));
    assert_eq!(book.language.as_deref(), Some("en"));
    assert_eq!(book.price_currency.as_deref(), Some("USD"));
    assert_eq!(book.provenance_price, Some(SourceKind::Secondary));
    assert_eq!(book.source_ids, vec![SrcId::primary(0), SrcId::secondary(0)]);
}

#[test]
fn test_tiers_and_report_counts() {
    let (primaries, secondaries) = sample_batch();
    let output = integrate(&primaries, &secondaries, ts(), &QualityGate::default()).unwrap();

    let tiers: Vec<_> = output.detail.iter().map(|r| r.link_tier).collect();
    assert_eq!(
        tiers,
        vec![
            Some(LinkTier::Fuzzy),
            Some(LinkTier::Isbn13),
            Some(LinkTier::Isbn10),
            None,
            None,
        ]
    );

    let report = &output.report;
    assert_eq!(report.counts.primary_rows, 5);
    assert_eq!(report.counts.secondary_rows, 4);
    assert_eq!(report.counts.merged_rows, 5);
    assert_eq!(report.link_counts.fuzzy, 1);
    assert_eq!(report.link_counts.isbn13, 1);
    assert_eq!(report.link_counts.isbn10, 1);
    assert_eq!(report.link_counts.unmatched, 2);
    assert_eq!(report.link_counts.unlinked_secondary, 1);
    assert_eq!(report.title_coverage_ratio, 1.0);
    // Both unmatched listings share one synthetic identity.
    assert_eq!(report.synthetic_ids_count, 1);
    assert_eq!(report.counts.canonical_rows_emitted, 5);
    assert_eq!(report.ingest_timestamp, ts());
    // Three listings each folded into a catalog row sharing its ISBN-13.
    assert!(report.isbn13_unique);
    assert_eq!(report.duplicates_detected_by_isbn13, 3);
}

#[test]
fn test_every_source_record_lands_in_exactly_one_canonical_row() {
    let (primaries, secondaries) = sample_batch();
    let output = integrate(&primaries, &secondaries, ts(), &QualityGate::default()).unwrap();

    let mut seen = HashSet::new();
    for book in &output.canonical {
        for id in &book.source_ids {
            assert!(seen.insert(*id), "{id} appears twice");
        }
    }
    assert_eq!(seen.len(), primaries.len() + secondaries.len());

    let ids: HashSet<_> = output.canonical.iter().map(|b| &b.canonical_id).collect();
    assert_eq!(ids.len(), output.canonical.len());

    let isbns: Vec<_> = output.canonical.iter().filter_map(|b| b.isbn13.as_ref()).collect();
    let unique: HashSet<_> = isbns.iter().collect();
    assert_eq!(unique.len(), isbns.len());
    for book in &output.canonical {
        if let Some(isbn) = &book.isbn13 {
            assert_eq!(isbn.as_str(), book.canonical_id);
        }
    }

    let sorted: Vec<_> = output.canonical.iter().map(|b| b.canonical_id.clone()).collect();
    let mut expected = sorted.clone();
    expected.sort();
    assert_eq!(sorted, expected);
}

#[test]
fn test_identical_input_gives_identical_output() {
    let (primaries, secondaries) = sample_batch();
    let first = integrate(&primaries, &secondaries, ts(), &QualityGate::default()).unwrap();
    let second = integrate(&primaries, &secondaries, ts(), &QualityGate::default()).unwrap();

    assert_eq!(
        serde_json::to_string(&first.canonical).unwrap(),
        serde_json::to_string(&second.canonical).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&first.detail).unwrap(),
        serde_json::to_string(&second.detail).unwrap()
    );
}

#[test]
fn test_listings_sharing_an_isbn13_abort_the_run() {
    let primaries = vec![
        primary("Dune", "Frank Herbert", Some("9780441013593"), None),
        primary("Dune", "Frank Herbert", Some("9780441013593"), None),
    ];
    let err = integrate(&primaries, &[], ts(), &QualityGate::default()).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Quality(QualityViolation::DuplicateIsbn13 { duplicated_rows: 2, .. })
    ));
}

#[test]
fn test_empty_batch_fails_the_coverage_check() {
    let err = integrate(&[], &[], ts(), &QualityGate::default()).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Quality(QualityViolation::TitleCoverage { .. })
    ));
}

#[test]
fn test_negative_price_on_an_unlinked_catalog_row_aborts_the_run() {
    let primaries = vec![primary("Dune", "Frank Herbert", None, None)];
    let secondaries = vec![RawSecondaryRecord {
        price_amount: Some("-5".into()),
        ..secondary("Cooking for Two", "Jane Doe", Some("9780000000002"))
    }];
    let err = integrate(&primaries, &secondaries, ts(), &QualityGate::default()).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Quality(QualityViolation::NegativePrice { count: 1, min }) if min == -5.0
    ));
}
