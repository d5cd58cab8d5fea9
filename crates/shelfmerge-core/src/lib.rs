pub mod config;
pub mod dedup;
pub mod error;
pub mod linker;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod quality;
pub mod storage;
pub mod survivorship;

pub use config::PipelineConfig;
pub use error::{CoreError, ExitCode, QualityViolation, Result};
pub use models::*;

pub use dedup::{Grouping, LinkedGroup, build_canonical, group_records, synthetic_id};
pub use linker::{LinkedPair, RecordLinker};
pub use pipeline::{PipelineOutput, integrate, run};
pub use quality::{GateInput, QualityGate};

pub use storage::landing::{FileMetadata, LandingBatch, read_landing};
pub use storage::publish::{IngestSummary, PublishedPaths, publish};
pub use storage::schema::render_schema_markdown;
