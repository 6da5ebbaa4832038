//! TrendScan Runner: batch orchestration on top of `trendscan-core`.
//!
//! This crate provides:
//! - TOML application config (`[fetch]`, `[screen]`, `[sell]`, `[pipeline]`)
//! - Positions CSV loading
//! - A bounded worker pool with per-task timeouts
//! - Universe screening and batch sell advice
//! - Candidate and decision CSV exports

pub mod advisor;
pub mod config;
pub mod export;
pub mod pipeline;
pub mod pool;
pub mod positions;

pub use advisor::{AdviceOutcome, AdviceReport, AdviceRow, Advisor};
pub use config::{AppConfig, ConfigError, PipelineConfig};
pub use export::{candidates_csv, decisions_csv, write_file, CANDIDATE_HEADER, DECISION_HEADER};
pub use pipeline::{ScanPipeline, ScanReport};
pub use pool::{default_threads, PoolError, WorkerPool};
pub use positions::{load_positions, parse_positions};
