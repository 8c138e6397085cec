// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : bulkdeals_rust — daily bulk deal netting & drill-down in Rust
Module  : config.rs
Version : 0.5.0
License : MIT (see LICENSE)

Summary : Fetches today's exchange bulk deals (archive CSV / file / mock),
          nets them per (symbol, client) above a Crore threshold, shows a
          sortable table with per-symbol / per-client drill-down, exposes
          Prometheus metrics, and logs through tracing.
=============================================================================
*/
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;

use crate::engine::{AggregationParams, ThresholdMode, DEFAULT_THRESHOLD_CR};
use crate::source::{DealSource, DEFAULT_NSE_BULK_URL};

/// Mode sumber bulk deal
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceMode {
    #[value(alias = "archive", alias = "live")]
    Nse,
    #[value(alias = "csv")]
    File,
    Mock,
}

impl SourceMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nse" | "archive" | "live" => Some(SourceMode::Nse),
            "file" | "csv" => Some(SourceMode::File),
            "mock" => Some(SourceMode::Mock),
            _ => None,
        }
    }

    pub fn from_env(key: &str, default_mode: SourceMode) -> SourceMode {
        env::var(key).ok().and_then(|v| Self::parse(&v)).unwrap_or(default_mode)
    }
}

#[derive(Parser, Debug)]
#[command(name = "bulkdeals", version, about = "Net today's bulk deals per symbol and client")]
pub struct Cli {
    /// Override SOURCE_MODE
    #[arg(long, global = true, value_enum, ignore_case = true)]
    pub source: Option<SourceMode>,

    /// Override BULK_FILE (implies --source file when --source is absent)
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the net position table
    Show {
        /// Sort view by column (symbol | client | net)
        #[arg(long)]
        sort: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Select a cell (1-based view row, column 0=symbol 1=client) and print its drill-down
    Select {
        #[arg(long)]
        row: usize,
        #[arg(long)]
        col: usize,
        #[arg(long)]
        sort: Option<String>,
    },
    /// Drill-down for one symbol
    Symbol { symbol: String },
    /// Drill-down for one client name
    Client { name: String },
    /// Refresh every REFRESH_SECS and print the table
    Watch,
}

#[derive(Clone, Debug)]
pub struct Args {
    // source
    pub source_mode: SourceMode,
    pub nse_bulk_url: String,
    pub bulk_file: PathBuf,
    pub mock_rows: usize,
    pub http_timeout: Duration,

    // aggregation
    pub params: AggregationParams,

    // watch / metrics / logging
    pub refresh_every: Duration,
    pub metrics_port: Option<u16>,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn source(&self) -> DealSource {
        match self.source_mode {
            SourceMode::Nse => DealSource::NseArchive {
                url: self.nse_bulk_url.clone(),
                timeout: self.http_timeout,
            },
            SourceMode::File => DealSource::CsvFile { path: self.bulk_file.clone() },
            SourceMode::Mock => DealSource::Mock { rows: self.mock_rows },
        }
    }

    /// Flag CLI menimpa nilai env.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(path) = &cli.file {
            self.bulk_file = path.clone();
            self.source_mode = SourceMode::File;
        }
        if let Some(mode) = &cli.source {
            self.source_mode = mode.clone();
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

pub fn load() -> Args {
    // Pastikan .env dibaca (SOURCE_MODE, BULK_FILE, dll)
    let _ = dotenv();
    from_env()
}

pub fn from_env() -> Args {
    // ===== Source =====
    let source_mode  = SourceMode::from_env("SOURCE_MODE", SourceMode::Nse);
    let nse_bulk_url = env::var("NSE_BULK_URL").unwrap_or_else(|_| DEFAULT_NSE_BULK_URL.to_string());
    let bulk_file    = env::var("BULK_FILE").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("bulk.csv"));
    let mock_rows    = env_parse("MOCK_ROWS").unwrap_or(40);
    let http_timeout = Duration::from_secs(env_parse("HTTP_TIMEOUT_SECS").unwrap_or(15));

    // ===== Aggregation =====
    //   THRESHOLD_CR=10
    //   THRESHOLD_MODE=per_trade | net
    let threshold_cr = env_parse::<f64>("THRESHOLD_CR")
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(DEFAULT_THRESHOLD_CR);
    let threshold_mode = env::var("THRESHOLD_MODE")
        .ok()
        .and_then(|s| ThresholdMode::parse(&s))
        .unwrap_or_default();

    // ===== Watch / metrics / logging =====
    let refresh_every = Duration::from_secs(env_parse::<u64>("REFRESH_SECS").unwrap_or(300).max(1));
    let metrics_port  = env_parse("METRICS_PORT");
    let log_level     = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_file      = env::var("LOG_FILE").ok().filter(|s| !s.is_empty()).map(PathBuf::from);

    Args {
        source_mode,
        nse_bulk_url,
        bulk_file,
        mock_rows,
        http_timeout,
        params: AggregationParams { threshold_cr, threshold_mode },
        refresh_every,
        metrics_port,
        log_level,
        log_file,
    }
}
