//! One batch: link, group, survive, gate.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::dedup::{build_canonical, group_records};
use crate::error::Result;
use crate::linker::RecordLinker;
use crate::models::{
    CanonicalBook, DetailRow, QualityReport, RawPrimaryRecord, RawSecondaryRecord, SourceArena,
};
use crate::quality::{GateInput, QualityGate};

/// The tables a passing run publishes.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// One row per primary record, in source order.
    pub detail: Vec<DetailRow>,
    /// One row per group, ordered by canonical id.
    pub canonical: Vec<CanonicalBook>,
    pub report: QualityReport,
}

/// Normalizes raw rows into an arena and runs the batch over it.
pub fn integrate(
    primary: &[RawPrimaryRecord],
    secondary: &[RawSecondaryRecord],
    ingest_ts: DateTime<Utc>,
    gate: &QualityGate,
) -> Result<PipelineOutput> {
    let arena = SourceArena::from_raw(primary, secondary);
    run(&arena, ingest_ts, gate)
}

pub fn run(
    arena: &SourceArena,
    ingest_ts: DateTime<Utc>,
    gate: &QualityGate,
) -> Result<PipelineOutput> {
    info!(
        primary = arena.primary.len(),
        secondary = arena.secondary.len(),
        "integration started"
    );

    let pairs = RecordLinker::new(&arena.secondary).link_all(&arena.primary);
    let grouping = group_records(arena, &pairs);

    let detail: Vec<DetailRow> = pairs
        .iter()
        .map(|pair| {
            DetailRow::assemble(
                &arena.primary[pair.primary],
                pair.secondary.map(|idx| &arena.secondary[idx]),
                pair.tier,
                grouping.canonical_id_of_primary(pair.primary).to_string(),
                ingest_ts,
            )
        })
        .collect();

    let canonical: Vec<CanonicalBook> = grouping
        .groups
        .iter()
        .map(|group| build_canonical(group, arena, &pairs, ingest_ts))
        .collect();

    let report = gate.evaluate(&GateInput {
        arena,
        pairs: &pairs,
        orphans: &grouping.orphans,
        detail: &detail,
        canonical: &canonical,
        ingest_ts,
    })?;

    info!(
        detail_rows = detail.len(),
        canonical_rows = canonical.len(),
        "integration finished"
    );

    Ok(PipelineOutput {
        detail,
        canonical,
        report,
    })
}
