//! Field-level conflict resolution.
//!
//! Row level: a primary record and its linked secondary record compete per
//! field, by source priority. Group level: the row survivors of one linked
//! group compete again, by completeness, granularity or magnitude.

use std::fmt;

use crate::models::{Provenance, PubDate, SourceKind};

/// How a canonical field picks its winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// Secondary when present, else primary; then most complete across the group.
    SourcePriority,
    /// Secondary values only; most complete across the group.
    SecondaryOnly,
    /// Finest granularity, then most recent.
    FinestDate,
    /// Largest present value.
    Maximum,
    /// Shared by every member of the group.
    Identity,
}

impl MergeRule {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::SourcePriority => "secondary > primary per row; longest value across the group",
            Self::SecondaryOnly => "secondary only; longest value across the group",
            Self::FinestDate => "finest granularity (day > month > year), then most recent",
            Self::Maximum => "maximum present value across the group",
            Self::Identity => "grouping key; identical across the group",
        }
    }
}

/// The rule applied to each canonical field, in output order.
pub const CANONICAL_FIELD_RULES: &[(&str, MergeRule)] = &[
    ("isbn13", MergeRule::Identity),
    ("isbn10", MergeRule::SourcePriority),
    ("external_id", MergeRule::SecondaryOnly),
    ("title", MergeRule::SourcePriority),
    ("subtitle", MergeRule::SecondaryOnly),
    ("authors", MergeRule::SourcePriority),
    ("publisher", MergeRule::SecondaryOnly),
    ("pub_date", MergeRule::FinestDate),
    ("language", MergeRule::SecondaryOnly),
    ("categories", MergeRule::SecondaryOnly),
    ("price_amount", MergeRule::Maximum),
    ("price_currency", MergeRule::SecondaryOnly),
    ("rating", MergeRule::Maximum),
    ("rating_count", MergeRule::Maximum),
];

/// A winning value and the source that supplied it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Survivor<'a, T> {
    pub value: Option<&'a T>,
    pub provenance: Option<Provenance>,
}

pub fn prefer_secondary<'a, T>(
    primary: Option<&'a T>,
    secondary: Option<&'a T>,
) -> Survivor<'a, T> {
    match (secondary, primary) {
        (Some(value), _) => Survivor {
            value: Some(value),
            provenance: Some(SourceKind::Secondary),
        },
        (None, Some(value)) => Survivor {
            value: Some(value),
            provenance: Some(SourceKind::Primary),
        },
        (None, None) => Survivor {
            value: None,
            provenance: None,
        },
    }
}

/// Never falls back to the primary source.
pub fn secondary_only<T>(secondary: Option<&T>) -> Survivor<'_, T> {
    Survivor {
        value: secondary,
        provenance: secondary.map(|_| SourceKind::Secondary),
    }
}

/// Longest rendering wins; equal lengths fall to the greater value, and
/// identical values to the secondary source.
pub fn most_complete<T, I>(candidates: I) -> Option<(T, Provenance)>
where
    T: fmt::Display + Ord,
    I: IntoIterator<Item = (T, Provenance)>,
{
    candidates
        .into_iter()
        .map(|(value, provenance)| (value.to_string().chars().count(), value, provenance))
        .max_by(|(len_a, a, prov_a), (len_b, b, prov_b)| {
            len_a
                .cmp(len_b)
                .then_with(|| a.cmp(b))
                .then_with(|| prov_a.cmp(prov_b))
        })
        .map(|(_, value, provenance)| (value, provenance))
}

/// Most complete among values that all come from the secondary source.
pub fn most_complete_secondary<T, I>(values: I) -> Option<T>
where
    T: fmt::Display + Ord,
    I: IntoIterator<Item = T>,
{
    most_complete(values.into_iter().map(|v| (v, SourceKind::Secondary))).map(|(v, _)| v)
}

pub fn finest_date<I>(candidates: I) -> Option<PubDate>
where
    I: IntoIterator<Item = PubDate>,
{
    candidates.into_iter().max_by(|a, b| {
        a.granularity()
            .cmp(&b.granularity())
            .then_with(|| a.to_iso().cmp(&b.to_iso()))
    })
}

pub fn max_present<T, I>(values: I) -> Option<T>
where
    T: PartialOrd + Copy,
    I: IntoIterator<Item = Option<T>>,
{
    values.into_iter().flatten().fold(None, |best, v| match best {
        Some(current) if current >= v => Some(current),
        _ => Some(v),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_secondary_wins_when_present() {
        let primary = "Data Science From Scratch".to_string();
        let secondary = "Data Science from Scratch".to_string();

        let both = prefer_secondary(Some(&primary), Some(&secondary));
        assert_eq!(both.value, Some(&secondary));
        assert_eq!(both.provenance, Some(SourceKind::Secondary));

        let only_primary = prefer_secondary(Some(&primary), None);
        assert_eq!(only_primary.value, Some(&primary));
        assert_eq!(only_primary.provenance, Some(SourceKind::Primary));

        let neither = prefer_secondary::<String>(None, None);
        assert_eq!(neither.value, None);
        assert_eq!(neither.provenance, None);
    }

    #[test]
    fn test_secondary_only_has_no_fallback() {
        assert_eq!(secondary_only::<f64>(None).provenance, None);
        let price = 34.5;
        let won = secondary_only(Some(&price));
        assert_eq!(won.value, Some(&34.5));
        assert_eq!(won.provenance, Some(SourceKind::Secondary));
    }

    #[test]
    fn test_most_complete_prefers_longer_text() {
        let winner = most_complete_secondary(vec![
            "Data Sci".to_string(),
            "Data Science from Scratch".to_string(),
        ]);
        assert_eq!(winner.as_deref(), Some("Data Science from Scratch"));
    }

    #[test]
    fn test_most_complete_breaks_length_ties_by_value() {
        let winner = most_complete_secondary(vec![
            "abc".to_string(),
            "abd".to_string(),
            "abb".to_string(),
        ]);
        assert_eq!(winner.as_deref(), Some("abd"));
        assert_eq!(most_complete_secondary(Vec::<String>::new()), None);
    }

    #[test]
    fn test_identical_values_keep_secondary_provenance() {
        let winner = most_complete(vec![
            ("Dune".to_string(), SourceKind::Secondary),
            ("Dune".to_string(), SourceKind::Primary),
        ]);
        assert_eq!(winner, Some(("Dune".to_string(), SourceKind::Secondary)));
    }

    #[test]
    fn test_finest_date_wins() {
        let day = PubDate::Full(NaiveDate::from_ymd_opt(2019, 4, 14).unwrap());
        let picked = finest_date(vec![PubDate::Year(2019), PubDate::YearMonth(2019, 4), day]);
        assert_eq!(picked.map(|d| d.to_iso()).as_deref(), Some("2019-04-14"));
    }

    #[test]
    fn test_equal_granularity_prefers_most_recent() {
        let picked = finest_date(vec![
            PubDate::YearMonth(2015, 3),
            PubDate::YearMonth(2019, 1),
            PubDate::Year(2021),
        ]);
        assert_eq!(picked, Some(PubDate::YearMonth(2019, 1)));
        assert_eq!(finest_date(Vec::new()), None);
    }

    #[test]
    fn test_max_present_ignores_absent() {
        assert_eq!(max_present(vec![None, Some(3.5), Some(4.1), None]), Some(4.1));
        assert_eq!(max_present(vec![Some(10_i64), Some(2)]), Some(10));
        assert_eq!(max_present::<i64, _>(vec![None, None]), None);
    }
}
