//! Bibliographic catalog lookups that build the secondary source for shelfmerge.

pub mod enrich;
pub mod error;
pub mod http;
pub mod sources;

pub use enrich::{CATALOG_HEADER, EnrichOutcome, enrich_file, enrich_listings, write_catalog_csv};
pub use error::{CatalogError, Result};
pub use sources::google_books::GoogleBooksSource;
pub use sources::{CatalogLookup, CatalogQuery};
