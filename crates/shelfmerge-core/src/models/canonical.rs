use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Isbn10, Isbn13, Provenance, PubDate, SrcId};

/// Prefix marking a canonical id that is not a real ISBN-13.
pub const SYNTHETIC_PREFIX: &str = "synth:";

/// One surviving row per linked group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalBook {
    pub canonical_id: String,
    pub synthetic_id: bool,

    pub isbn13: Option<Isbn13>,
    pub isbn10: Option<Isbn10>,
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub authors: Option<String>,
    pub publisher: Option<String>,
    pub pub_date: Option<PubDate>,
    pub language: Option<String>,
    pub categories: Option<String>,
    pub price_amount: Option<f64>,
    pub price_currency: Option<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<i64>,

    pub provenance_title: Option<Provenance>,
    pub provenance_authors: Option<Provenance>,
    pub provenance_isbn10: Option<Provenance>,
    pub provenance_price: Option<Provenance>,

    /// Every contributing source record, sorted.
    pub source_ids: Vec<SrcId>,
    pub ingest_ts: DateTime<Utc>,
}
