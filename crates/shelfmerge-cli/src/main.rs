use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use shelfmerge_catalog::{CatalogError, GoogleBooksSource, enrich_file};
use shelfmerge_core::{CoreError, ExitCode, PipelineConfig, integrate, publish, read_landing};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "shelfmerge",
    about = "Link, deduplicate and publish book metadata from a listing scrape and a catalog",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to SHELFMERGE_CONFIG or ~/.config/shelfmerge/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output in JSON format. Also enabled by setting SHELFMERGE_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the landing directory, link and merge records, publish if the quality gate passes.
    Integrate {
        #[arg(long)]
        landing: Option<PathBuf>,
        #[arg(long)]
        standard: Option<PathBuf>,
        #[arg(long)]
        docs: Option<PathBuf>,
        /// Ingest timestamp (RFC 3339). Defaults to the current time.
        #[arg(long)]
        now: Option<String>,
    },

    /// Look up every scraped listing in the catalog and write the catalog CSV.
    Enrich {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the canonical table documentation.
    Schema,

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

// ─── Config Actions ──────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective config.
    Show,
    /// Print the config file path.
    Path,
    /// Write a default config file.
    Init {
        #[arg(long)]
        force: bool,
    },
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let json_output = cli.json || std::env::var("SHELFMERGE_JSON").as_deref() == Ok("1");

    if let Err(err) = run(cli, json_output).await {
        if json_output {
            let body = serde_json::json!({"status": "error", "error": format!("{err:#}")});
            println!("{body}");
        } else {
            eprintln!("Error: {err:#}");
        }
        std::process::exit(exit_code(&err) as i32);
    }
}

async fn run(cli: Cli, json_output: bool) -> Result<()> {
    let start = Instant::now();
    let config_path = cli.config.clone().unwrap_or_else(PipelineConfig::config_path);
    let config = PipelineConfig::load_from(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    match cli.command {
        // ── Integrate ──────────────────────────────────────────────────────
        Commands::Integrate {
            landing,
            standard,
            docs,
            now,
        } => {
            let landing = landing.unwrap_or_else(|| config.landing_dir());
            let standard = standard.unwrap_or_else(|| config.standard_dir());
            let docs = docs.unwrap_or_else(|| config.docs_dir());
            let ingest_ts = parse_now(now.as_deref())?;

            let batch = read_landing(&landing, ingest_ts)?;
            let output = integrate(
                &batch.primary,
                &batch.secondary,
                ingest_ts,
                &config.quality_gate(),
            )?;
            let summary = publish(&output, &batch.files, &standard, &docs)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "summary": summary, "link_counts": output.report.link_counts },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                let counts = &summary.counts;
                println!("Integration complete ({dur} ms)");
                println!("  Listings read:     {}", counts.primary_rows);
                println!("  Catalog rows read: {}", counts.secondary_rows);
                println!("  Detail rows:       {}", counts.merged_rows);
                println!("  Canonical books:   {}", counts.canonical_rows_emitted);
                println!(
                    "  Title coverage:    {:.1}%",
                    output.report.title_coverage_ratio * 100.0
                );
                println!("  Written to {} and {}", standard.display(), docs.display());
            }
        }

        // ── Enrich ─────────────────────────────────────────────────────────
        Commands::Enrich { input, output } => {
            let landing = config.landing_dir();
            let input = input.unwrap_or_else(|| landing.join(&config.paths.primary_file));
            let output = output.unwrap_or_else(|| landing.join(&config.paths.secondary_file));

            let source = GoogleBooksSource::from_config(&config.catalog, config.cache_dir())?;
            let outcome = enrich_file(&input, &output, &source).await?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "output": output,
                        "looked_up": outcome.looked_up,
                        "matched": outcome.matched,
                        "skipped": outcome.skipped,
                        "failed": outcome.failed,
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!(
                    "Wrote {} catalog rows to {} ({} looked up, {} failed)",
                    outcome.matched,
                    output.display(),
                    outcome.looked_up,
                    outcome.failed
                );
            }
        }

        // ── Schema ─────────────────────────────────────────────────────────
        Commands::Schema => {
            let md = shelfmerge_core::render_schema_markdown(config.quality.min_title_coverage);
            if json_output {
                print_json(&serde_json::json!({"status": "ok", "data": {"markdown": md}}))?;
            } else {
                print!("{md}");
            }
        }

        // ── Config ─────────────────────────────────────────────────────────
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if json_output {
                    print_json(&serde_json::json!({"status": "ok", "data": config}))?;
                } else {
                    println!("# {}", config_path.display());
                    print!("{}", config.to_toml_string()?);
                }
            }
            ConfigAction::Path => {
                if json_output {
                    print_json(&serde_json::json!({
                        "status": "ok",
                        "data": { "path": config_path }
                    }))?;
                } else {
                    println!("{}", config_path.display());
                }
            }
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    bail!(
                        "config already exists at {} (use --force to overwrite)",
                        config_path.display()
                    );
                }
                PipelineConfig::default().save_to(&config_path)?;
                if json_output {
                    print_json(&serde_json::json!({
                        "status": "ok",
                        "data": { "path": config_path }
                    }))?;
                } else {
                    println!("Wrote default config to {}", config_path.display());
                }
            }
        },
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn parse_now(now: Option<&str>) -> Result<DateTime<Utc>> {
    match now {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("--now must be RFC 3339, got {raw:?}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    if let Some(core) = err.downcast_ref::<CoreError>() {
        return core.exit_code();
    }
    if let Some(catalog) = err.downcast_ref::<CatalogError>() {
        return match catalog {
            CatalogError::Http(_) | CatalogError::RateLimit(..) | CatalogError::ApiError(..) => {
                ExitCode::NetworkError
            }
            CatalogError::Io(_) => ExitCode::FileSystemError,
            CatalogError::Core(core) => core.exit_code(),
            _ => ExitCode::GeneralError,
        };
    }
    if err.downcast_ref::<chrono::ParseError>().is_some() {
        return ExitCode::InvalidArgs;
    }
    ExitCode::GeneralError
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}
