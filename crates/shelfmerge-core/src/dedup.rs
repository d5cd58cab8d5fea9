//! Grouping of linked records into one identity per book, and the
//! canonical row each group survives as.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::linker::LinkedPair;
use crate::models::{
    CanonicalBook, Isbn13, Provenance, SYNTHETIC_PREFIX, SecondaryRecord, SourceArena, SourceKind,
    SrcId,
};
use crate::survivorship::{
    Survivor, finest_date, max_present, most_complete, most_complete_secondary, prefer_secondary,
};

const SYNTHETIC_HEX_LEN: usize = 16;

/// Deterministic fallback identity over `lowercase(title|author)`.
pub fn synthetic_id(title: Option<&str>, author: Option<&str>) -> String {
    let key = format!("{}|{}", title.unwrap_or(""), author.unwrap_or("")).to_lowercase();
    let digest = Sha256::digest(key.as_bytes());
    let hex = format!("{digest:x}");
    format!("{SYNTHETIC_PREFIX}{}", &hex[..SYNTHETIC_HEX_LEN])
}

pub fn is_synthetic(canonical_id: &str) -> bool {
    canonical_id.starts_with(SYNTHETIC_PREFIX)
}

/// Records believed to describe the same book. Indices address the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedGroup {
    pub canonical_id: String,
    pub isbn13: Option<Isbn13>,
    /// Sorted primary indices.
    pub primaries: Vec<usize>,
    /// Sorted secondary indices, linked and orphaned alike.
    pub secondaries: Vec<usize>,
}

impl LinkedGroup {
    pub fn is_synthetic(&self) -> bool {
        self.isbn13.is_none()
    }
}

/// Groups ordered by canonical id, plus the group of every record.
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    pub groups: Vec<LinkedGroup>,
    primary_group: Vec<usize>,
    /// Secondary indices that no primary record linked to.
    pub orphans: Vec<usize>,
}

impl Grouping {
    pub fn canonical_id_of_primary(&self, primary: usize) -> &str {
        &self.groups[self.primary_group[primary]].canonical_id
    }
}

#[derive(Debug, Clone)]
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, left: usize, right: usize) {
        let left_root = self.find(left);
        let right_root = self.find(right);

        if left_root == right_root {
            return;
        }

        match self.rank[left_root].cmp(&self.rank[right_root]) {
            std::cmp::Ordering::Less => self.parent[left_root] = right_root,
            std::cmp::Ordering::Greater => self.parent[right_root] = left_root,
            std::cmp::Ordering::Equal => {
                self.parent[right_root] = left_root;
                self.rank[left_root] += 1;
            }
        }
    }
}

/// Identity of one node: its ISBN-13 when known, else its synthetic key.
struct NodeKey {
    isbn13: Option<Isbn13>,
    synthetic: String,
}

impl NodeKey {
    fn bucket(&self) -> &str {
        self.isbn13
            .as_ref()
            .map(Isbn13::as_str)
            .unwrap_or(&self.synthetic)
    }
}

/// Joins pairs sharing an identity key or a linked secondary record, then
/// attaches orphan secondaries by their own identity.
///
/// Nodes are primaries `0..P` followed by secondaries `P..P+S`. Linked
/// secondaries carry no key of their own; they follow their primaries.
pub fn group_records(arena: &SourceArena, pairs: &[LinkedPair]) -> Grouping {
    let primary_len = arena.primary.len();
    let total = primary_len + arena.secondary.len();

    let mut linked = vec![false; arena.secondary.len()];
    for pair in pairs {
        if let Some(secondary) = pair.secondary {
            linked[secondary] = true;
        }
    }

    let mut keys: Vec<Option<NodeKey>> = Vec::with_capacity(total);
    for pair in pairs {
        let primary = &arena.primary[pair.primary];
        let isbn13 = match pair.secondary {
            Some(idx) => arena.secondary[idx].isbn13.clone(),
            None => primary.isbn13.clone(),
        };
        keys.push(Some(NodeKey {
            isbn13,
            synthetic: synthetic_id(primary.title.as_deref(), primary.author.as_deref()),
        }));
    }
    for (idx, secondary) in arena.secondary.iter().enumerate() {
        keys.push((!linked[idx]).then(|| NodeKey {
            isbn13: secondary.isbn13.clone(),
            synthetic: synthetic_id(secondary.title.as_deref(), secondary.authors.as_deref()),
        }));
    }

    let mut dsu = DisjointSet::new(total);
    let mut buckets: HashMap<&str, usize> = HashMap::new();
    for (node, key) in keys.iter().enumerate() {
        if let Some(key) = key {
            let first = *buckets.entry(key.bucket()).or_insert(node);
            dsu.union(first, node);
        }
    }
    for pair in pairs {
        if let Some(secondary) = pair.secondary {
            dsu.union(pair.primary, primary_len + secondary);
        }
    }

    // Nodes are visited in order, so the first keyed member is the lowest ordinal.
    let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for node in 0..total {
        let root = dsu.find(node);
        components.entry(root).or_default().push(node);
    }

    let mut groups: Vec<LinkedGroup> = components
        .into_values()
        .map(|members| {
            let isbn13 = members
                .iter()
                .find_map(|node| keys[*node].as_ref().and_then(|k| k.isbn13.clone()));
            let canonical_id = match &isbn13 {
                Some(isbn) => isbn.as_str().to_string(),
                None => members
                    .iter()
                    .find_map(|node| keys[*node].as_ref().map(|k| k.synthetic.clone()))
                    .unwrap_or_default(),
            };
            let (primaries, secondaries): (Vec<usize>, Vec<usize>) =
                members.into_iter().partition(|node| *node < primary_len);
            LinkedGroup {
                canonical_id,
                isbn13,
                primaries,
                secondaries: secondaries.into_iter().map(|n| n - primary_len).collect(),
            }
        })
        .collect();
    groups.sort_by(|a, b| a.canonical_id.cmp(&b.canonical_id));

    let mut primary_group = vec![0; primary_len];
    for (group_idx, group) in groups.iter().enumerate() {
        debug!(
            canonical_id = %group.canonical_id,
            primaries = group.primaries.len(),
            secondaries = group.secondaries.len(),
            "group formed"
        );
        for primary in &group.primaries {
            primary_group[*primary] = group_idx;
        }
    }

    Grouping {
        groups,
        primary_group,
        orphans: linked
            .iter()
            .enumerate()
            .filter_map(|(idx, is_linked)| (!is_linked).then_some(idx))
            .collect(),
    }
}

/// Collapses one group into its surviving row.
pub fn build_canonical(
    group: &LinkedGroup,
    arena: &SourceArena,
    pairs: &[LinkedPair],
    ingest_ts: DateTime<Utc>,
) -> CanonicalBook {
    let rows: Vec<_> = group
        .primaries
        .iter()
        .map(|idx| {
            let primary = &arena.primary[*idx];
            let secondary = pairs[*idx].secondary.map(|s| &arena.secondary[s]);
            (primary, secondary)
        })
        .collect();
    let orphans: Vec<_> = group
        .secondaries
        .iter()
        .map(|idx| &arena.secondary[*idx])
        .filter(|s| {
            !rows
                .iter()
                .any(|(_, linked)| linked.is_some_and(|l| l.src_id == s.src_id))
        })
        .collect();
    let secondaries: Vec<_> = group
        .secondaries
        .iter()
        .map(|idx| &arena.secondary[*idx])
        .collect();

    // Row survivors by source priority, then orphan values as secondary.
    let title = most_complete(
        rows.iter()
            .filter_map(|(p, s)| {
                with_provenance(prefer_secondary(
                    p.title.as_ref(),
                    s.and_then(|s| s.title.as_ref()),
                ))
            })
            .chain(orphans.iter().filter_map(|s| as_secondary(s.title.as_ref()))),
    );
    let authors = most_complete(
        rows.iter()
            .filter_map(|(p, s)| {
                with_provenance(prefer_secondary(
                    p.author.as_ref(),
                    s.and_then(|s| s.authors.as_ref()),
                ))
            })
            .chain(orphans.iter().filter_map(|s| as_secondary(s.authors.as_ref()))),
    );
    let isbn10 = most_complete(
        rows.iter()
            .filter_map(|(p, s)| {
                with_provenance(prefer_secondary(
                    p.isbn10.as_ref(),
                    s.and_then(|s| s.isbn10.as_ref()),
                ))
            })
            .chain(orphans.iter().filter_map(|s| as_secondary(s.isbn10.as_ref()))),
    );

    let price_amount = max_present(secondaries.iter().map(|s| s.price_amount));
    let longest = |field: fn(&SecondaryRecord) -> Option<&String>| {
        most_complete_secondary(secondaries.iter().filter_map(|s| field(s).cloned()))
    };

    let mut source_ids: Vec<SrcId> = group
        .primaries
        .iter()
        .map(|idx| arena.primary[*idx].src_id)
        .chain(secondaries.iter().map(|s| s.src_id))
        .collect();
    source_ids.sort();
    source_ids.dedup();

    CanonicalBook {
        canonical_id: group.canonical_id.clone(),
        synthetic_id: group.is_synthetic(),
        isbn13: group.isbn13.clone(),
        isbn10: isbn10.as_ref().map(|(v, _)| v.clone()),
        external_id: longest(|s| s.external_id.as_ref()),
        title: title.as_ref().map(|(v, _)| v.clone()),
        subtitle: longest(|s| s.subtitle.as_ref()),
        authors: authors.as_ref().map(|(v, _)| v.clone()),
        publisher: longest(|s| s.publisher.as_ref()),
        pub_date: finest_date(secondaries.iter().filter_map(|s| s.pub_date)),
        language: longest(|s| s.language_code.as_ref()),
        categories: longest(|s| s.categories.as_ref()),
        price_amount,
        price_currency: longest(|s| s.currency_code.as_ref()),
        rating: max_present(rows.iter().map(|(p, _)| p.rating)),
        rating_count: max_present(rows.iter().map(|(p, _)| p.rating_count)),
        provenance_title: title.map(|(_, p)| p),
        provenance_authors: authors.map(|(_, p)| p),
        provenance_isbn10: isbn10.map(|(_, p)| p),
        provenance_price: price_amount.map(|_| SourceKind::Secondary),
        source_ids,
        ingest_ts,
    }
}

fn with_provenance<T: Clone>(survivor: Survivor<'_, T>) -> Option<(T, Provenance)> {
    Some((survivor.value?.clone(), survivor.provenance?))
}

fn as_secondary<T: Clone>(value: Option<&T>) -> Option<(T, Provenance)> {
    value.map(|v| (v.clone(), SourceKind::Secondary))
}
