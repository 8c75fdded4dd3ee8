//! TOML configuration.
//!
//! Every section is optional; a missing file or section falls back to the
//! built-in defaults. The `[fallbacks]` table is the one place where the
//! sentinel values shown in place of failed or absent upstream data live.
//!
//! ```toml
//! [stats]
//! base_url = "https://api.jolpi.ca/ergast/f1"
//! circuit_limit = 100
//!
//! [insight]
//! provider = "gemini"          # or "disabled"
//! model = "gemini-2.5-flash"
//! api_key_env = "GEMINI_API_KEY"
//!
//! [views]
//! top_drivers = 3
//!
//! [fallbacks]
//! track_image = "https://example.org/track.png"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub insight: InsightConfig,
    #[serde(default)]
    pub views: ViewConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fallbacks: FallbackConfig,
}

impl Config {
    /// Built-in defaults, used when no config file is present.
    pub fn minimal() -> Self {
        Self::default()
    }
}

/// Racing-results API and image-metadata service settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StatsConfig {
    pub base_url: String,
    pub image_api_url: String,
    pub thumbnail_size: u32,
    pub circuit_limit: usize,
    pub race_history_limit: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.jolpi.ca/ergast/f1".to_string(),
            image_api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            thumbnail_size: 800,
            circuit_limit: 100,
            race_history_limit: 500,
            timeout_secs: 10,
            max_retries: 2,
        }
    }
}

/// Generative text service settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InsightConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

impl InsightConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

/// Per-screen shaping knobs.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewConfig {
    pub top_drivers: usize,
    pub recent_form_races: usize,
    pub detail_min_delay_ms: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            top_drivers: 3,
            recent_form_races: 3,
            detail_min_delay_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7340".to_string(),
        }
    }
}

/// Sentinel values substituted for failed or absent upstream data.
///
/// Adapters and the aggregator consult this table instead of inlining
/// constants, so every exposed record carries a defined value.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FallbackConfig {
    pub driver_image: String,
    pub track_image: String,
    pub flag: String,
    pub unknown: String,
    pub not_available: String,
    pub race_analysis_failed: String,
    pub race_analysis_empty: String,
    pub driver_analysis_failed: String,
    pub driver_analysis_empty: String,
    pub track_report_failed: String,
    pub track_report_empty: String,
    pub track_report_offline: String,
    pub no_upcoming_race: String,
    pub maps_citation_title: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            driver_image: "https://upload.wikimedia.org/wikipedia/commons/thumb/b/bd/Silhouette_Anonyme.svg/500px-Silhouette_Anonyme.svg.png".to_string(),
            track_image: "https://upload.wikimedia.org/wikipedia/commons/thumb/6/67/Hermanos_Rodriguez_2015.png/640px-Hermanos_Rodriguez_2015.png".to_string(),
            flag: "🏁".to_string(),
            unknown: "Unknown".to_string(),
            not_available: "N/A".to_string(),
            race_analysis_failed: "Unable to retrieve analysis at this time.".to_string(),
            race_analysis_empty: "No analysis available.".to_string(),
            driver_analysis_failed: "AI Analysis system offline.".to_string(),
            driver_analysis_empty: "Driver analysis currently unavailable.".to_string(),
            track_report_failed: "We couldn't retrieve the intelligence report for this track right now. Connection to the insight service may be interrupted.".to_string(),
            track_report_empty: "No detailed analysis available for this track.".to_string(),
            track_report_offline: "Intelligence system offline.".to_string(),
            no_upcoming_race: "Season concluded or schedule unavailable.".to_string(),
            maps_citation_title: "View on Google Maps".to_string(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    check_url("stats.base_url", &config.stats.base_url)?;
    check_url("stats.image_api_url", &config.stats.image_api_url)?;
    check_url("insight.base_url", &config.insight.base_url)?;

    if config.stats.timeout_secs == 0 {
        bail!("stats.timeout_secs must be > 0");
    }
    if config.insight.timeout_secs == 0 {
        bail!("insight.timeout_secs must be > 0");
    }
    if !(1..=1000).contains(&config.stats.circuit_limit) {
        bail!("stats.circuit_limit must be in [1, 1000]");
    }
    if !(1..=1000).contains(&config.stats.race_history_limit) {
        bail!("stats.race_history_limit must be in [1, 1000]");
    }
    if config.views.top_drivers == 0 {
        bail!("views.top_drivers must be >= 1");
    }

    match config.insight.provider.as_str() {
        "disabled" | "gemini" => {}
        other => bail!(
            "Unknown insight provider: '{}'. Must be gemini or disabled.",
            other
        ),
    }

    if config.insight.is_enabled() && config.insight.model.trim().is_empty() {
        bail!("insight.model must be specified when provider is 'gemini'");
    }

    Ok(())
}

fn check_url(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{} must not be empty", field);
    }
    reqwest::Url::parse(value).with_context(|| format!("{} is not a valid URL: {}", field, value))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.stats.circuit_limit, 100);
        assert_eq!(config.stats.race_history_limit, 500);
        assert_eq!(config.views.top_drivers, 3);
        assert_eq!(config.fallbacks.unknown, "Unknown");
        assert!(config.insight.is_enabled());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let file = write_config(
            r#"
[stats]
base_url = "http://127.0.0.1:9999/ergast"

[fallbacks]
flag = "*"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.stats.base_url, "http://127.0.0.1:9999/ergast");
        assert_eq!(config.stats.timeout_secs, 10);
        assert_eq!(config.fallbacks.flag, "*");
        assert_eq!(config.fallbacks.not_available, "N/A");
    }

    #[test]
    fn rejects_unknown_provider() {
        let file = write_config("[insight]\nprovider = \"openai\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown insight provider"));
    }

    #[test]
    fn rejects_bad_url() {
        let file = write_config("[stats]\nbase_url = \"not a url\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_out_of_range_limits() {
        let file = write_config("[stats]\ncircuit_limit = 0\n");
        assert!(load_config(file.path()).is_err());

        let file = write_config("[stats]\nrace_history_limit = 5000\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/nonexistent/paddock.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
