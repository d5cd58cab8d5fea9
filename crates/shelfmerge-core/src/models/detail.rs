use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Isbn10, Isbn13, PrimaryRecord, PubDate, SecondaryRecord, SourceKind, SrcId};
use crate::survivorship::{prefer_secondary, secondary_only};

/// Which source contributed a winning field value.
pub type Provenance = SourceKind;

/// The linker tier that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTier {
    Isbn13,
    Isbn10,
    Fuzzy,
}

impl LinkTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Isbn13 => "isbn13",
            Self::Isbn10 => "isbn10",
            Self::Fuzzy => "fuzzy",
        }
    }
}

/// One row of the merged detail table: a primary record, the secondary
/// record linked to it (if any), and the row-level survivors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub src_id: SrcId,
    pub secondary_src_id: Option<SrcId>,
    pub link_tier: Option<LinkTier>,

    // primary
    pub title_primary: Option<String>,
    pub author: Option<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<i64>,
    pub source_url: Option<String>,
    pub isbn10_primary: Option<Isbn10>,
    pub isbn13_primary: Option<Isbn13>,

    /// The linked secondary's ISBN-13 when linked, else the primary's.
    pub isbn13: Option<Isbn13>,

    // secondary
    pub external_id: Option<String>,
    pub title_secondary: Option<String>,
    pub subtitle: Option<String>,
    pub authors_secondary: Option<String>,
    pub publisher: Option<String>,
    pub pub_date: Option<String>,
    pub pub_date_iso: Option<PubDate>,
    pub language: Option<String>,
    pub language_norm: Option<String>,
    pub categories: Option<String>,
    pub isbn10_secondary: Option<Isbn10>,
    pub price_amount: Option<f64>,
    pub price_currency: Option<String>,
    pub price_currency_norm: Option<String>,

    // row-level survivors
    pub title: Option<String>,
    pub authors: Option<String>,
    pub isbn10: Option<Isbn10>,
    pub provenance_title: Option<Provenance>,
    pub provenance_authors: Option<Provenance>,
    pub provenance_isbn10: Option<Provenance>,
    pub provenance_price: Option<Provenance>,

    pub canonical_id: String,
    pub ingest_ts: DateTime<Utc>,
}

impl DetailRow {
    pub fn assemble(
        primary: &PrimaryRecord,
        secondary: Option<&SecondaryRecord>,
        link_tier: Option<LinkTier>,
        canonical_id: String,
        ingest_ts: DateTime<Utc>,
    ) -> Self {
        let title = prefer_secondary(
            primary.title.as_ref(),
            secondary.and_then(|s| s.title.as_ref()),
        );
        let authors = prefer_secondary(
            primary.author.as_ref(),
            secondary.and_then(|s| s.authors.as_ref()),
        );
        let isbn10 = prefer_secondary(
            primary.isbn10.as_ref(),
            secondary.and_then(|s| s.isbn10.as_ref()),
        );
        let price = secondary_only(secondary.and_then(|s| s.price_amount.as_ref()));

        let isbn13 = match secondary {
            Some(s) => s.isbn13.clone(),
            None => primary.isbn13.clone(),
        };

        Self {
            src_id: primary.src_id,
            secondary_src_id: secondary.map(|s| s.src_id),
            link_tier,
            title_primary: primary.title.clone(),
            author: primary.author.clone(),
            rating: primary.rating,
            rating_count: primary.rating_count,
            source_url: primary.source_url.clone(),
            isbn10_primary: primary.isbn10.clone(),
            isbn13_primary: primary.isbn13.clone(),
            isbn13,
            external_id: secondary.and_then(|s| s.external_id.clone()),
            title_secondary: secondary.and_then(|s| s.title.clone()),
            subtitle: secondary.and_then(|s| s.subtitle.clone()),
            authors_secondary: secondary.and_then(|s| s.authors.clone()),
            publisher: secondary.and_then(|s| s.publisher.clone()),
            pub_date: secondary.and_then(|s| s.published.clone()),
            pub_date_iso: secondary.and_then(|s| s.pub_date),
            language: secondary.and_then(|s| s.language.clone()),
            language_norm: secondary.and_then(|s| s.language_code.clone()),
            categories: secondary.and_then(|s| s.categories.clone()),
            isbn10_secondary: secondary.and_then(|s| s.isbn10.clone()),
            price_amount: price.value.copied(),
            price_currency: secondary.and_then(|s| s.price_currency.clone()),
            price_currency_norm: secondary.and_then(|s| s.currency_code.clone()),
            title: title.value.cloned(),
            authors: authors.value.cloned(),
            isbn10: isbn10.value.cloned(),
            provenance_title: title.provenance,
            provenance_authors: authors.provenance,
            provenance_isbn10: isbn10.provenance,
            provenance_price: price.provenance,
            canonical_id,
            ingest_ts,
        }
    }
}
