use clap::Parser;
use serde::Serialize;

#[derive(Debug, Default, Parser, Serialize)]
#[command(name = "lbmirror", about = "Keeps an in-memory mirror of level leaderboards")]
pub struct Cli {
    /// Path to a YAML settings file (defaults to '.env.local.yaml' when present)
    #[arg(long)]
    #[serde(skip_serializing)]
    pub config: Option<String>,
    /// Overrides the configured trace level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_level: Option<String>,
    /// Overrides the path of the campaign levels metadata file
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_levels_path: Option<String>,
}
