use crate::models::Source;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    #[serde(default = "default_referer")]
    pub referer: String,
}

/// Provider page locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesConfig {
    #[serde(default = "default_angelone_gold_url")]
    pub angelone_gold_url: String,

    #[serde(default = "default_angelone_silver_url")]
    pub angelone_silver_url: String,

    /// Directory URL; `<city>.html` is appended.
    #[serde(default = "default_goodreturns_gold_url")]
    pub goodreturns_gold_url: String,

    #[serde(default = "default_goodreturns_silver_url")]
    pub goodreturns_silver_url: String,

    #[serde(default = "default_goodreturns_cities")]
    pub goodreturns_cities: Vec<String>,

    #[serde(default = "default_bankbazaar_gold_url")]
    pub bankbazaar_gold_url: String,

    #[serde(default = "default_bankbazaar_silver_url")]
    pub bankbazaar_silver_url: String,
}

/// Orchestration and reconciliation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Sources tried for gold, highest priority first.
    #[serde(default = "default_priority")]
    pub gold_priority: Vec<Source>,

    #[serde(default = "default_priority")]
    pub silver_priority: Vec<Source>,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_timeout_secs() -> u64 {
    15
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}
fn default_accept_language() -> String {
    "en-US,en;q=0.5".to_string()
}
fn default_referer() -> String {
    "https://www.google.com/".to_string()
}
fn default_angelone_gold_url() -> String {
    "https://www.angelone.in/gold-rates-today".to_string()
}
fn default_angelone_silver_url() -> String {
    "https://www.angelone.in/silver-rates-today".to_string()
}
fn default_goodreturns_gold_url() -> String {
    "https://www.goodreturns.in/gold-rates/".to_string()
}
fn default_goodreturns_silver_url() -> String {
    "https://www.goodreturns.in/silver-rates/".to_string()
}
fn default_goodreturns_cities() -> Vec<String> {
    ["mumbai", "delhi", "bangalore", "chennai"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}
fn default_bankbazaar_gold_url() -> String {
    "https://www.bankbazaar.com/gold-rate-india.html".to_string()
}
fn default_bankbazaar_silver_url() -> String {
    "https://www.bankbazaar.com/silver-rate-india.html".to_string()
}
fn default_concurrency() -> usize {
    4
}
fn default_priority() -> Vec<Source> {
    vec![Source::BankBazaar, Source::GoodReturns, Source::AngelOne]
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            referer: default_referer(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            angelone_gold_url: default_angelone_gold_url(),
            angelone_silver_url: default_angelone_silver_url(),
            goodreturns_gold_url: default_goodreturns_gold_url(),
            goodreturns_silver_url: default_goodreturns_silver_url(),
            goodreturns_cities: default_goodreturns_cities(),
            bankbazaar_gold_url: default_bankbazaar_gold_url(),
            bankbazaar_silver_url: default_bankbazaar_silver_url(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            gold_priority: default_priority(),
            silver_priority: default_priority(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::Environment::with_prefix("METAL_RATES")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("sources.goodreturns_cities")
                    .with_list_parse_key("pipeline.gold_priority")
                    .with_list_parse_key("pipeline.silver_priority"),
            )
            .build()
            .context("Failed to read configuration sources")?;

        let app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Invalid configuration")?;
        app_cfg.validate()?;
        Ok(app_cfg)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.scraper.timeout_secs > 0, "scraper.timeout_secs must be positive");
        anyhow::ensure!(self.pipeline.concurrency > 0, "pipeline.concurrency must be positive");
        anyhow::ensure!(
            !self.sources.goodreturns_cities.is_empty()
                || !self.uses(Source::GoodReturns),
            "sources.goodreturns_cities is empty but goodreturns is enabled"
        );
        Ok(())
    }

    fn uses(&self, source: Source) -> bool {
        self.pipeline.gold_priority.contains(&source)
            || self.pipeline.silver_priority.contains(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.scraper.timeout_secs, 15);
        assert_eq!(
            cfg.pipeline.gold_priority,
            vec![Source::BankBazaar, Source::GoodReturns, Source::AngelOne]
        );
        assert_eq!(cfg.sources.goodreturns_cities.len(), 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[pipeline]\ngold_priority = [\"angelone\", \"bankbazaar\"]\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.pipeline.gold_priority, vec![Source::AngelOne, Source::BankBazaar]);
        assert_eq!(cfg.pipeline.silver_priority.len(), 3);
        assert_eq!(cfg.pipeline.concurrency, 4);
        assert_eq!(cfg.scraper.referer, "https://www.google.com/");
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut cfg = AppConfig::default();
        cfg.pipeline.concurrency = 0;
        assert!(cfg.validate().is_err());
    }
}
