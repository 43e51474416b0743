//! Analysis and profiling tools for tracestat.
//!
//! This crate provides:
//! - Trace parsing into an execution model
//! - Cycle cost models and instruction categories
//! - Weighted metrics extraction (cycles, CPI/IPC, densities)
//! - Markdown report generation

pub mod cost;
pub mod density;
pub mod engine;
pub mod metrics;
pub mod parser;
pub mod report;

pub use cost::{Category, CostModel};
pub use density::{CategoryCounts, Densities};
pub use engine::{CycleBuckets, EngineConfig, MetricsEngine};
pub use metrics::{Averages, Metrics};
pub use parser::{ParsePolicy, ParsedTrace, SkippedLine, TraceParser};
pub use report::{Page, Report};
