// src/cli.rs
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Scheduled HTTP health checks with persisted uptime summaries.
#[derive(Debug, Parser)]
#[command(name = "uptime-runner", version, about)]
pub struct Cli {
    /// Monitor configuration (YAML or JSON)
    #[arg(long, env = "UPTIME_CONFIG", default_value = "monitor.config.yml")]
    pub config: PathBuf,

    /// Directory holding checks/, summary/ and incidents/
    #[arg(long, env = "UPTIME_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Keep running, one check cycle every N seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}
