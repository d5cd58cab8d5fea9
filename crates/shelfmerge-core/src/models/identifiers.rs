use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalized 13-digit ISBN. Only constructible through [`Isbn13::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Isbn13(String);

/// A normalized 10-digit ISBN. Only constructible through [`Isbn10::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Isbn10(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Isbn {
    Ten(Isbn10),
    Thirteen(Isbn13),
}

fn compact(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

fn digits(s: &str) -> Vec<u32> {
    s.chars().filter_map(|c| c.to_digit(10)).collect()
}

impl Isbn {
    /// Strips separators and whitespace; accepts only an all-digit
    /// string of exactly 10 or 13 characters.
    pub fn normalize(input: &str) -> Option<Self> {
        let compacted = compact(input);
        if !compacted.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        match compacted.len() {
            10 => Some(Self::Ten(Isbn10(compacted))),
            13 => Some(Self::Thirteen(Isbn13(compacted))),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ten(isbn) => isbn.as_str(),
            Self::Thirteen(isbn) => isbn.as_str(),
        }
    }
}

impl Isbn13 {
    pub fn normalize(input: &str) -> Option<Self> {
        match Isbn::normalize(input)? {
            Isbn::Thirteen(isbn) => Some(isbn),
            Isbn::Ten(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// EAN-13 weighted checksum. Normalization does not require it.
    pub fn has_valid_checksum(&self) -> bool {
        let sum: u32 = digits(&self.0)
            .iter()
            .enumerate()
            .map(|(i, &d)| if i % 2 == 0 { d } else { d * 3 })
            .sum();
        sum % 10 == 0
    }
}

impl Isbn10 {
    pub fn normalize(input: &str) -> Option<Self> {
        match Isbn::normalize(input)? {
            Isbn::Ten(isbn) => Some(isbn),
            Isbn::Thirteen(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_valid_checksum(&self) -> bool {
        let sum: u32 = digits(&self.0)
            .iter()
            .enumerate()
            .map(|(i, &d)| (10 - i as u32) * d)
            .sum();
        sum % 11 == 0
    }
}

impl fmt::Display for Isbn13 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Isbn10 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
