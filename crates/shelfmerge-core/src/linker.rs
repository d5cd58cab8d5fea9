use std::collections::HashMap;

use tracing::debug;

use crate::models::{Isbn10, Isbn13, LinkTier, PrimaryRecord, SecondaryRecord};

/// Outcome of linking one primary record. Indices address the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkedPair {
    pub primary: usize,
    pub secondary: Option<usize>,
    pub tier: Option<LinkTier>,
}

struct FoldedCandidate {
    title: Option<String>,
    authors: String,
}

/// Matches primary records against the secondary pool: exact ISBN-13,
/// then exact ISBN-10, then title/author containment. First match wins.
pub struct RecordLinker<'a> {
    by_isbn13: HashMap<&'a Isbn13, usize>,
    by_isbn10: HashMap<&'a Isbn10, usize>,
    folded: Vec<FoldedCandidate>,
}

impl<'a> RecordLinker<'a> {
    pub fn new(secondary: &'a [SecondaryRecord]) -> Self {
        let mut by_isbn13 = HashMap::new();
        let mut by_isbn10 = HashMap::new();
        for (idx, record) in secondary.iter().enumerate() {
            if let Some(isbn13) = record.isbn13.as_ref() {
                by_isbn13.entry(isbn13).or_insert(idx);
            }
            if let Some(isbn10) = record.isbn10.as_ref() {
                by_isbn10.entry(isbn10).or_insert(idx);
            }
        }

        let folded = secondary
            .iter()
            .map(|record| FoldedCandidate {
                title: record.title.as_deref().map(str::to_lowercase),
                authors: record
                    .authors
                    .as_deref()
                    .map(str::to_lowercase)
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            by_isbn13,
            by_isbn10,
            folded,
        }
    }

    pub fn link(&self, primary: &PrimaryRecord) -> Option<(usize, LinkTier)> {
        if let Some(idx) = primary
            .isbn13
            .as_ref()
            .and_then(|isbn| self.by_isbn13.get(isbn))
        {
            return Some((*idx, LinkTier::Isbn13));
        }

        if let Some(idx) = primary
            .isbn10
            .as_ref()
            .and_then(|isbn| self.by_isbn10.get(isbn))
        {
            return Some((*idx, LinkTier::Isbn10));
        }

        self.fuzzy(primary).map(|idx| (idx, LinkTier::Fuzzy))
    }

    pub fn link_all(&self, primaries: &[PrimaryRecord]) -> Vec<LinkedPair> {
        primaries
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                let found = self.link(record);
                match found {
                    Some((secondary, tier)) => debug!(
                        primary = %record.src_id,
                        secondary,
                        tier = tier.as_str(),
                        "linked"
                    ),
                    None => debug!(primary = %record.src_id, "no catalog match"),
                }
                LinkedPair {
                    primary: idx,
                    secondary: found.map(|(s, _)| s),
                    tier: found.map(|(_, t)| t),
                }
            })
            .collect()
    }

    // Scans in pool order and takes the first candidate that qualifies.
    fn fuzzy(&self, primary: &PrimaryRecord) -> Option<usize> {
        let title = primary.title.as_deref()?.to_lowercase();
        let author = primary.author.as_deref().map(str::to_lowercase);

        self.folded.iter().position(|candidate| {
            let Some(candidate_title) = candidate.title.as_deref() else {
                return false;
            };
            if !candidate_title.contains(&title) && !title.contains(candidate_title) {
                return false;
            }
            match author.as_deref() {
                Some(author) => author
                    .split_whitespace()
                    .any(|token| candidate.authors.contains(token)),
                None => true,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawPrimaryRecord, RawSecondaryRecord, SourceArena};

    fn primary(
        title: &str,
        author: Option<&str>,
        isbn13: Option<&str>,
        isbn10: Option<&str>,
    ) -> RawPrimaryRecord {
        RawPrimaryRecord {
            title: Some(title.to_string()),
            author: author.map(ToOwned::to_owned),
            isbn13: isbn13.map(ToOwned::to_owned),
            isbn10: isbn10.map(ToOwned::to_owned),
            ..Default::default()
        }
    }

    fn secondary(
        title: &str,
        authors: &str,
        isbn13: Option<&str>,
        isbn10: Option<&str>,
    ) -> RawSecondaryRecord {
        RawSecondaryRecord {
            title: Some(title.to_string()),
            authors: Some(authors.to_string()),
            isbn13: isbn13.map(ToOwned::to_owned),
            isbn10: isbn10.map(ToOwned::to_owned),
            ..Default::default()
        }
    }

    #[test]
    fn test_isbn13_beats_every_other_tier() {
        let arena = SourceArena::from_raw(
            &[primary("Dune", Some("Frank Herbert"), Some("978-0441013593"), Some("0441013597"))],
            &[
                secondary("Dune", "Frank Herbert", None, Some("0441013597")),
                secondary("Dune (Deluxe)", "Frank Herbert", Some("9780441013593"), None),
            ],
        );
        let linker = RecordLinker::new(&arena.secondary);
        assert_eq!(linker.link(&arena.primary[0]), Some((1, LinkTier::Isbn13)));
    }

    #[test]
    fn test_isbn10_uses_first_occurrence() {
        let arena = SourceArena::from_raw(
            &[primary("Clean Code", None, None, Some("0132350882"))],
            &[
                secondary("Something Else", "Nobody", None, None),
                secondary("Clean Code", "Robert C. Martin", None, Some("0132350882")),
                secondary("Clean Code (2nd)", "Robert C. Martin", None, Some("0-13-235088-2")),
            ],
        );
        let linker = RecordLinker::new(&arena.secondary);
        assert_eq!(linker.link(&arena.primary[0]), Some((1, LinkTier::Isbn10)));
    }

    #[test]
    fn test_fuzzy_requires_an_author_token() {
        let arena = SourceArena::from_raw(
            &[primary("Deep Learning", Some("Ian Goodfellow"), None, None)],
            &[
                secondary("Deep Learning with Python", "François Chollet", None, None),
                secondary("Deep Learning", "Ian Goodfellow, Yoshua Bengio", None, None),
            ],
        );
        let linker = RecordLinker::new(&arena.secondary);
        assert_eq!(linker.link(&arena.primary[0]), Some((1, LinkTier::Fuzzy)));
    }

    #[test]
    fn test_fuzzy_title_containment_works_both_ways() {
        let arena = SourceArena::from_raw(
            &[primary("Python for Data Analysis: Data Wrangling", None, None, None)],
            &[secondary("python for data analysis", "Wes McKinney", None, None)],
        );
        let linker = RecordLinker::new(&arena.secondary);
        assert_eq!(linker.link(&arena.primary[0]), Some((0, LinkTier::Fuzzy)));
    }

    #[test]
    fn test_fuzzy_takes_first_candidate_in_pool_order() {
        let arena = SourceArena::from_raw(
            &[primary("Statistics", None, None, None)],
            &[
                secondary("Practical Statistics for Data Scientists", "Peter Bruce", None, None),
                secondary("Statistics", "David Freedman", None, None),
            ],
        );
        let linker = RecordLinker::new(&arena.secondary);
        assert_eq!(linker.link(&arena.primary[0]), Some((0, LinkTier::Fuzzy)));
    }

    #[test]
    fn test_unmatched_and_untitled_records_stay_unlinked() {
        let arena = SourceArena::from_raw(
            &[
                primary("Storytelling with Data", Some("Cole Knaflic"), None, None),
                RawPrimaryRecord::default(),
            ],
            &[secondary("The Art of Statistics", "David Spiegelhalter", None, None)],
        );
        let linker = RecordLinker::new(&arena.secondary);
        let pairs = linker.link_all(&arena.primary);
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.secondary.is_none() && p.tier.is_none()));
    }

    #[test]
    fn test_secondary_without_title_is_never_a_fuzzy_candidate() {
        let arena = SourceArena::from_raw(
            &[primary("Dune", None, None, None)],
            &[RawSecondaryRecord {
                authors: Some("Frank Herbert".into()),
                ..Default::default()
            }],
        );
        let linker = RecordLinker::new(&arena.secondary);
        assert_eq!(linker.link(&arena.primary[0]), None);
    }
}
