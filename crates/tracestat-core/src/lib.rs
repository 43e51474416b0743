//! Core types and artifacts for the tracestat toolchain.
//!
//! This crate defines the data structures shared by the parser, the metrics
//! engine and the CLI. It contains no analysis logic, only type definitions,
//! serialization formats, and error types.

pub mod error;
pub mod model;

pub use error::{Error, LineError, Result};
pub use model::{Address, CallSite, ExecutionModel, Histogram};
