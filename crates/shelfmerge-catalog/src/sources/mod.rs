use std::fmt;

use async_trait::async_trait;
use shelfmerge_core::{Isbn10, Isbn13, PrimaryRecord, RawSecondaryRecord};

use crate::error::Result;

pub mod google_books;

/// What to ask the catalog for one listing, most specific first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogQuery {
    Isbn13(Isbn13),
    Isbn10(Isbn10),
    TitleAuthor {
        title: String,
        author: Option<String>,
    },
}

impl CatalogQuery {
    /// ISBN-13, then ISBN-10, then title plus author. `None` when the
    /// listing carries nothing searchable.
    pub fn for_listing(record: &PrimaryRecord) -> Option<Self> {
        if let Some(isbn) = &record.isbn13 {
            return Some(Self::Isbn13(isbn.clone()));
        }
        if let Some(isbn) = &record.isbn10 {
            return Some(Self::Isbn10(isbn.clone()));
        }
        record.title.as_ref().map(|title| Self::TitleAuthor {
            title: title.clone(),
            author: record.author.clone(),
        })
    }

    /// The catalog's `q` parameter.
    pub fn to_q(&self) -> String {
        match self {
            Self::Isbn13(isbn) => format!("isbn:{isbn}"),
            Self::Isbn10(isbn) => format!("isbn:{isbn}"),
            Self::TitleAuthor {
                title,
                author: Some(author),
            } => format!("intitle:{title} inauthor:{author}"),
            Self::TitleAuthor {
                title,
                author: None,
            } => format!("intitle:{title}"),
        }
    }
}

impl fmt::Display for CatalogQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_q())
    }
}

/// A catalog that resolves one query to at most one record.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(&self, query: &CatalogQuery) -> Result<Option<RawSecondaryRecord>>;
}

#[cfg(test)]
mod tests {
    use shelfmerge_core::RawPrimaryRecord;

    use super::*;

    fn listing(raw: RawPrimaryRecord) -> PrimaryRecord {
        PrimaryRecord::from_raw(0, &raw)
    }

    #[test]
    fn test_query_priority_is_isbn13_isbn10_then_title() {
        let both = listing(RawPrimaryRecord {
            title: Some("Dune".into()),
            isbn13: Some("978-0441013593".into()),
            isbn10: Some("0441013597".into()),
            ..Default::default()
        });
        assert_eq!(CatalogQuery::for_listing(&both).unwrap().to_q(), "isbn:9780441013593");

        let ten = listing(RawPrimaryRecord {
            title: Some("Dune".into()),
            isbn10: Some("0441013597".into()),
            ..Default::default()
        });
        assert_eq!(CatalogQuery::for_listing(&ten).unwrap().to_q(), "isbn:0441013597");

        let text = listing(RawPrimaryRecord {
            title: Some("Dune".into()),
            author: Some("Frank Herbert".into()),
            ..Default::default()
        });
        assert_eq!(
            CatalogQuery::for_listing(&text).unwrap().to_q(),
            "intitle:Dune inauthor:Frank Herbert"
        );

        assert_eq!(CatalogQuery::for_listing(&listing(RawPrimaryRecord::default())), None);
    }
}
