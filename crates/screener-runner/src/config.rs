use anyhow::{bail, Context, Result};
use backtest_engine::BacktestConfig;
use chrono::{NaiveDate, Utc};
use scoring_engine::EngineConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use signal_feeds::PolicyKeywords;
use std::env;
use std::path::{Path, PathBuf};

/// Contents of the `SCREENER_CONFIG` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenerFile {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    /// Category -> keywords for the policy scan. Defaults when absent.
    #[serde(default)]
    pub policy_keywords: Option<PolicyKeywords>,
}

impl ScreenerFile {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: ScreenerFile = serde_json::from_str(json).context("Invalid screener config")?;
        file.engine.validate()?;
        file.backtest.validate()?;
        Ok(file)
    }
}

/// Where each input comes from, read from the environment.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub config_path: Option<PathBuf>,
    pub signals_path: Option<PathBuf>,
    pub evidence_path: Option<PathBuf>,
    pub fundamentals_path: Option<PathBuf>,
    pub company_news_path: Option<PathBuf>,
    pub ceo_news_path: Option<PathBuf>,
    pub history_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub as_of: NaiveDate,
}

impl RunnerConfig {
    pub fn from_env() -> Result<Self> {
        let path = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty()).map(PathBuf::from);

        let as_of = match env::var("SCREENER_AS_OF") {
            Ok(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .with_context(|| format!("SCREENER_AS_OF must be YYYY-MM-DD, got '{}'", raw))?,
            Err(_) => Utc::now().date_naive(),
        };

        let config = Self {
            config_path: path("SCREENER_CONFIG"),
            signals_path: path("SCREENER_SIGNALS"),
            evidence_path: path("SCREENER_EVIDENCE"),
            fundamentals_path: path("SCREENER_FUNDAMENTALS"),
            company_news_path: path("SCREENER_COMPANY_NEWS"),
            ceo_news_path: path("SCREENER_CEO_NEWS"),
            history_path: path("SCREENER_HISTORY"),
            output_path: path("SCREENER_OUTPUT"),
            as_of,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let feeds = [
            &self.signals_path,
            &self.fundamentals_path,
            &self.company_news_path,
            &self.ceo_news_path,
        ];
        if feeds.iter().all(|p| p.is_none()) {
            bail!(
                "No input feed configured: set SCREENER_SIGNALS, SCREENER_FUNDAMENTALS, \
                 SCREENER_COMPANY_NEWS or SCREENER_CEO_NEWS"
            );
        }
        Ok(())
    }

    pub fn screener_file(&self) -> Result<ScreenerFile> {
        match &self.config_path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                ScreenerFile::from_json_str(&json)
                    .with_context(|| format!("Failed to load config {}", path.display()))
            }
            None => {
                tracing::info!("SCREENER_CONFIG not set, using built-in defaults");
                Ok(ScreenerFile::default())
            }
        }
    }
}

/// Read a JSON array of rows; a missing path yields no rows.
pub fn load_rows<T: DeserializeOwned>(path: Option<&Path>, what: &str) -> Result<Vec<T>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} from {}", what, path.display()))?;
    let rows: Vec<T> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse {} from {}", what, path.display()))?;
    tracing::info!("Loaded {} {} rows from {}", rows.len(), what, path.display());
    Ok(rows)
}
