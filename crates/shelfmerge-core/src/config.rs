use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::quality::{DEFAULT_MIN_TITLE_COVERAGE, QualityGate};

/// Root pipeline configuration, loaded from `~/.config/shelfmerge/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub quality: QualityConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub landing_dir: String,
    pub standard_dir: String,
    pub docs_dir: String,
    /// Scraped listing file name inside the landing directory.
    pub primary_file: String,
    /// Catalog CSV file name inside the landing directory.
    pub secondary_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub min_title_coverage: f64,
    pub synthetic_sample_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    pub min_interval_ms: u64,
    pub max_retries: u32,
    pub user_agent: String,
    pub api_key_env: String,
    pub cache_ttl_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            landing_dir: "landing".to_string(),
            standard_dir: "standard".to_string(),
            docs_dir: "docs".to_string(),
            primary_file: "goodreads_books.json".to_string(),
            secondary_file: "googlebooks_books.csv".to_string(),
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_title_coverage: DEFAULT_MIN_TITLE_COVERAGE,
            synthetic_sample_size: 5,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/books/v1".to_string(),
            min_interval_ms: 500,
            max_retries: 3,
            user_agent: concat!("shelfmerge/", env!("CARGO_PKG_VERSION")).to_string(),
            api_key_env: "GOOGLE_BOOKS_API_KEY".to_string(),
            cache_ttl_secs: 7 * 24 * 60 * 60,
            cache_dir: None,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl PipelineConfig {
    /// Standard config file path: `~/.config/shelfmerge/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SHELFMERGE_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("shelfmerge")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let coverage = self.quality.min_title_coverage;
        if !(0.0..=1.0).contains(&coverage) {
            return Err(CoreError::ConfigError(format!(
                "quality.min_title_coverage must be within 0..=1, got {coverage}"
            )));
        }
        if self.quality.synthetic_sample_size == 0 {
            return Err(CoreError::ConfigError(
                "quality.synthetic_sample_size must be positive".to_string(),
            ));
        }
        if self.catalog.base_url.trim().is_empty() {
            return Err(CoreError::ConfigError("catalog.base_url is empty".to_string()));
        }
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    pub fn landing_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.landing_dir)
    }

    pub fn standard_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.standard_dir)
    }

    pub fn docs_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.docs_dir)
    }

    /// Where the catalog response cache lives.
    pub fn cache_dir(&self) -> PathBuf {
        match &self.catalog.cache_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("~/.cache"))
                .join("shelfmerge")
                .join("catalog"),
        }
    }

    pub fn quality_gate(&self) -> QualityGate {
        QualityGate::new(
            self.quality.min_title_coverage,
            self.quality.synthetic_sample_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = PipelineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.quality.min_title_coverage, 0.90);
        assert_eq!(cfg.paths.primary_file, "goodreads_books.json");
        assert_eq!(cfg.catalog.cache_ttl_secs, 604_800);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = PipelineConfig::default();
        cfg.paths.landing_dir = "/data/landing".to_string();
        cfg.quality.min_title_coverage = 0.75;
        cfg.save_to(&path).unwrap();

        let loaded = PipelineConfig::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[quality]\nmin_title_coverage = 0.5\n").unwrap();

        let cfg = PipelineConfig::load_from(&path).unwrap();
        assert_eq!(cfg.quality.min_title_coverage, 0.5);
        assert_eq!(cfg.quality.synthetic_sample_size, 5);
        assert_eq!(cfg.paths.docs_dir, "docs");
    }

    #[test]
    fn test_out_of_range_coverage_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[quality]\nmin_title_coverage = 1.5\n").unwrap();

        assert!(matches!(
            PipelineConfig::load_from(&path),
            Err(CoreError::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let dir = TempDir::new().unwrap();
        let cfg = PipelineConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(cfg, PipelineConfig::default());
    }
}
