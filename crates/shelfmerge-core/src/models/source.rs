use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::{Isbn10, Isbn13, PubDate};
use crate::normalize::{
    clean_text, coerce_float, coerce_int, normalize_currency, normalize_language,
    normalize_pub_date,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Primary,
    Secondary,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source kind plus ordinal within that source, rendered `primary:3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SrcId {
    pub kind: SourceKind,
    pub ordinal: usize,
}

impl SrcId {
    pub fn primary(ordinal: usize) -> Self {
        Self {
            kind: SourceKind::Primary,
            ordinal,
        }
    }

    pub fn secondary(ordinal: usize) -> Self {
        Self {
            kind: SourceKind::Secondary,
            ordinal,
        }
    }
}

impl fmt::Display for SrcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.ordinal)
    }
}

impl FromStr for SrcId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, ordinal) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid src_id: {s}"))?;
        let ordinal = ordinal
            .parse()
            .map_err(|_| format!("invalid src_id ordinal: {s}"))?;
        match kind {
            "primary" => Ok(Self::primary(ordinal)),
            "secondary" => Ok(Self::secondary(ordinal)),
            _ => Err(format!("invalid src_id kind: {s}")),
        }
    }
}

impl Serialize for SrcId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SrcId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ─── Raw rows as decoded by collaborators ───────────────────────────────────

/// A scraped listing row. Numeric fields may arrive as JSON numbers or strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPrimaryRecord {
    #[serde(default, deserialize_with = "loose_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub rating: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub ratings_count: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub book_url: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub isbn10: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub isbn13: Option<String>,
}

/// A catalog row. Field names are the catalog CSV header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSecondaryRecord {
    #[serde(default)]
    pub gb_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub isbn13: Option<String>,
    #[serde(default)]
    pub isbn10: Option<String>,
    #[serde(default)]
    pub price_amount: Option<String>,
    #[serde(default)]
    pub price_currency: Option<String>,

    /// Landing file the row was read from; not part of the CSV.
    #[serde(skip)]
    pub source_file: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

fn loose_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Loose>::deserialize(deserializer)?.map(|value| match value {
        Loose::Text(s) => s,
        Loose::Int(i) => i.to_string(),
        Loose::Float(f) => f.to_string(),
        Loose::Bool(b) => b.to_string(),
    }))
}

// ─── Normalized, immutable source records ───────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimaryRecord {
    pub src_id: SrcId,
    pub title: Option<String>,
    pub author: Option<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<i64>,
    pub source_url: Option<String>,
    pub isbn10: Option<Isbn10>,
    pub isbn13: Option<Isbn13>,
}

impl PrimaryRecord {
    pub fn from_raw(ordinal: usize, raw: &RawPrimaryRecord) -> Self {
        Self {
            src_id: SrcId::primary(ordinal),
            title: clean_text(raw.title.as_deref()),
            author: clean_text(raw.author.as_deref()),
            rating: raw.rating.as_deref().and_then(coerce_float),
            rating_count: raw.ratings_count.as_deref().and_then(coerce_int),
            source_url: clean_text(raw.book_url.as_deref()),
            isbn10: raw.isbn10.as_deref().and_then(Isbn10::normalize),
            isbn13: raw.isbn13.as_deref().and_then(Isbn13::normalize),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecondaryRecord {
    pub src_id: SrcId,
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub authors: Option<String>,
    pub publisher: Option<String>,
    /// Date text as published by the catalog.
    pub published: Option<String>,
    pub pub_date: Option<PubDate>,
    pub language: Option<String>,
    pub language_code: Option<String>,
    pub categories: Option<String>,
    pub isbn13: Option<Isbn13>,
    pub isbn10: Option<Isbn10>,
    pub price_amount: Option<f64>,
    pub price_currency: Option<String>,
    pub currency_code: Option<String>,
    pub source_file: Option<String>,
}

impl SecondaryRecord {
    pub fn from_raw(ordinal: usize, raw: &RawSecondaryRecord) -> Self {
        let published = clean_text(raw.pub_date.as_deref());
        let language = clean_text(raw.language.as_deref());
        let price_currency = clean_text(raw.price_currency.as_deref());
        Self {
            src_id: SrcId::secondary(ordinal),
            external_id: clean_text(raw.gb_id.as_deref()),
            title: clean_text(raw.title.as_deref()),
            subtitle: clean_text(raw.subtitle.as_deref()),
            authors: clean_text(raw.authors.as_deref()),
            publisher: clean_text(raw.publisher.as_deref()),
            pub_date: published.as_deref().and_then(normalize_pub_date),
            published,
            language_code: language.as_deref().and_then(normalize_language),
            language,
            categories: clean_text(raw.categories.as_deref()),
            isbn13: raw.isbn13.as_deref().and_then(Isbn13::normalize),
            isbn10: raw.isbn10.as_deref().and_then(Isbn10::normalize),
            price_amount: raw.price_amount.as_deref().and_then(coerce_float),
            currency_code: price_currency.as_deref().and_then(normalize_currency),
            price_currency,
            source_file: raw.source_file.clone(),
        }
    }
}

/// Owns both record collections for one run; records are addressed by index.
#[derive(Debug, Clone, Default)]
pub struct SourceArena {
    pub primary: Vec<PrimaryRecord>,
    pub secondary: Vec<SecondaryRecord>,
}

impl SourceArena {
    pub fn from_raw(primary: &[RawPrimaryRecord], secondary: &[RawSecondaryRecord]) -> Self {
        Self {
            primary: primary
                .iter()
                .enumerate()
                .map(|(idx, raw)| PrimaryRecord::from_raw(idx, raw))
                .collect(),
            secondary: secondary
                .iter()
                .enumerate()
                .map(|(idx, raw)| SecondaryRecord::from_raw(idx, raw))
                .collect(),
        }
    }
}
