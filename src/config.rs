use crate::cli::Cli;
use crate::error::CacheResult;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, Level};

const TRACE_LEVELS: [&'static str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
const LOCAL_SETTINGS_YAML_FILE: &str = ".env.local.yaml";

// All settings may be configured via environment variables. Example:
// API_BASE_URL="http://localhost:8080" would set api_base_url to that value.
// Settings are built once at startup and handed to the components needing them.
#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default = "default_trace_level")]
    trace_level: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_api_timeout_sec")]
    pub api_timeout_sec: u64,
    #[serde(default = "default_campaign_levels_path")]
    pub campaign_levels_path: String,
    #[serde(default = "default_campaign_reload_interval_sec")]
    pub campaign_reload_interval_sec: u64,
    // Reload interval of the most recent weekly levels
    #[serde(default = "default_weekly_reload_interval_sec")]
    pub weekly_reload_interval_sec: u64,
    // Older weekly levels reload this many times slower
    #[serde(default = "default_inactive_weekly_multiplier")]
    pub inactive_weekly_multiplier: u32,
    #[serde(default = "default_hot_weekly_count")]
    pub hot_weekly_count: usize,
    #[serde(default = "default_weekly_index_reload_interval_sec")]
    pub weekly_index_reload_interval_sec: u64,
    #[serde(default = "default_buckets_reload_interval_sec")]
    pub buckets_reload_interval_sec: u64,
    // Orchestrator sleep when no resource is tracked at all
    #[serde(default = "default_idle_poll_interval_sec")]
    pub idle_poll_interval_sec: u64,
    // Minimum orchestrator sleep after a reload pass with failures
    #[serde(default = "default_retry_delay_sec")]
    pub retry_delay_sec: u64,
    // Number of entries kept by the remote source for each level
    #[serde(default = "default_top_n")]
    pub top_n: u32,
    #[serde(default = "default_score_count_thresholds")]
    pub score_count_thresholds: Vec<u32>,
}

impl Settings {
    pub fn load(cli: &Cli) -> CacheResult<Self> {
        let yaml_file = cli
            .config
            .clone()
            .unwrap_or_else(|| LOCAL_SETTINGS_YAML_FILE.to_string());

        let mut figment = Figment::new();
        if Path::new(&yaml_file).exists() {
            info!("Found '{yaml_file}' file, loading local configuration.");
            figment = figment.merge(Yaml::file(&yaml_file));
        }
        let settings = figment
            .merge(Env::raw())
            .merge(Serialized::defaults(cli))
            .extract()?;

        Ok(settings)
    }

    pub fn get_trace_level(&self) -> Level {
        get_trace_level(&self.trace_level)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_sec)
    }

    pub fn campaign_reload_interval(&self) -> Duration {
        Duration::from_secs(self.campaign_reload_interval_sec)
    }

    pub fn weekly_reload_interval(&self) -> Duration {
        Duration::from_secs(self.weekly_reload_interval_sec)
    }

    pub fn inactive_weekly_reload_interval(&self) -> Duration {
        self.weekly_reload_interval() * self.inactive_weekly_multiplier
    }

    pub fn weekly_index_reload_interval(&self) -> Duration {
        Duration::from_secs(self.weekly_index_reload_interval_sec)
    }

    pub fn buckets_reload_interval(&self) -> Duration {
        Duration::from_secs(self.buckets_reload_interval_sec)
    }

    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_secs(self.idle_poll_interval_sec)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_sec)
    }

    /// Rank charged on a level where a user is not part of the top entries.
    pub fn unranked_penalty(&self) -> u32 {
        self.top_n + 1
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            trace_level: default_trace_level(),
            api_base_url: default_api_base_url(),
            api_timeout_sec: default_api_timeout_sec(),
            campaign_levels_path: default_campaign_levels_path(),
            campaign_reload_interval_sec: default_campaign_reload_interval_sec(),
            weekly_reload_interval_sec: default_weekly_reload_interval_sec(),
            inactive_weekly_multiplier: default_inactive_weekly_multiplier(),
            hot_weekly_count: default_hot_weekly_count(),
            weekly_index_reload_interval_sec: default_weekly_index_reload_interval_sec(),
            buckets_reload_interval_sec: default_buckets_reload_interval_sec(),
            idle_poll_interval_sec: default_idle_poll_interval_sec(),
            retry_delay_sec: default_retry_delay_sec(),
            top_n: default_top_n(),
            score_count_thresholds: default_score_count_thresholds(),
        }
    }
}

fn get_trace_level(level_str: &str) -> Level {
    match level_str.to_uppercase().as_str() {
        level if level == TRACE_LEVELS[0] => Level::TRACE,
        level if level == TRACE_LEVELS[1] => Level::DEBUG,
        level if level == TRACE_LEVELS[2] => Level::INFO,
        level if level == TRACE_LEVELS[3] => Level::WARN,
        level if level == TRACE_LEVELS[4] => Level::ERROR,
        // Default trace level
        _ => Level::INFO,
    }
}

fn default_trace_level() -> String {
    "INFO".to_string()
}

fn default_api_base_url() -> String {
    "https://dfp529wcvahka.cloudfront.net".to_string()
}

fn default_api_timeout_sec() -> u64 {
    10
}

fn default_campaign_levels_path() -> String {
    "./json/campaign_levels.json".to_string()
}

fn default_campaign_reload_interval_sec() -> u64 {
    8 * 60 * 60
}

fn default_weekly_reload_interval_sec() -> u64 {
    60 * 60
}

fn default_inactive_weekly_multiplier() -> u32 {
    16
}

fn default_hot_weekly_count() -> usize {
    2
}

fn default_weekly_index_reload_interval_sec() -> u64 {
    60 * 60
}

fn default_buckets_reload_interval_sec() -> u64 {
    8 * 60 * 60
}

fn default_idle_poll_interval_sec() -> u64 {
    60
}

fn default_retry_delay_sec() -> u64 {
    60
}

fn default_top_n() -> u32 {
    1000
}

fn default_score_count_thresholds() -> Vec<u32> {
    vec![1, 50]
}
