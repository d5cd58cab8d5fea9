//! Writes the published tables and their documentation.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::models::{QualityReport, RunCounts};
use crate::pipeline::PipelineOutput;
use crate::storage::landing::FileMetadata;
use crate::storage::schema::render_schema_markdown;

pub const DETAIL_FILE: &str = "book_source_detail.jsonl";
pub const CANONICAL_FILE: &str = "dim_book.jsonl";
pub const QUALITY_FILE: &str = "quality_metrics.json";
pub const SCHEMA_FILE: &str = "schema.md";
pub const SUMMARY_FILE: &str = "ingest_summary.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedPaths {
    pub book_source_detail: PathBuf,
    pub dim_book: PathBuf,
    pub quality_metrics: PathBuf,
    pub schema_md: PathBuf,
    pub ingest_summary: PathBuf,
}

#[derive(Serialize)]
struct QualityMetrics<'a> {
    #[serde(flatten)]
    report: &'a QualityReport,
    files_read: &'a [FileMetadata],
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub output_files: PublishedPaths,
    pub counts: RunCounts,
    pub ingest_ts: DateTime<Utc>,
}

/// Persists a passing run. Callers only reach this after the gate passed.
pub fn publish(
    output: &PipelineOutput,
    files_read: &[FileMetadata],
    standard_dir: &Path,
    docs_dir: &Path,
) -> Result<IngestSummary> {
    fs::create_dir_all(standard_dir)?;
    fs::create_dir_all(docs_dir)?;

    let paths = PublishedPaths {
        book_source_detail: standard_dir.join(DETAIL_FILE),
        dim_book: standard_dir.join(CANONICAL_FILE),
        quality_metrics: docs_dir.join(QUALITY_FILE),
        schema_md: docs_dir.join(SCHEMA_FILE),
        ingest_summary: docs_dir.join(SUMMARY_FILE),
    };

    write_jsonl(&paths.book_source_detail, &output.detail)?;
    write_jsonl(&paths.dim_book, &output.canonical)?;

    let metrics = QualityMetrics {
        report: &output.report,
        files_read,
    };
    fs::write(&paths.quality_metrics, serde_json::to_string_pretty(&metrics)?)?;
    fs::write(
        &paths.schema_md,
        render_schema_markdown(output.report.min_title_coverage),
    )?;

    let summary = IngestSummary {
        output_files: paths,
        counts: output.report.counts.clone(),
        ingest_ts: output.report.ingest_timestamp,
    };
    fs::write(
        &summary.output_files.ingest_summary,
        serde_json::to_string_pretty(&summary)?,
    )?;

    info!(
        standard = %standard_dir.display(),
        docs = %docs_dir.display(),
        "outputs published"
    );
    Ok(summary)
}

/// One JSON object per line.
pub fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
