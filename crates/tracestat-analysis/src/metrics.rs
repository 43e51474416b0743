use crate::density::Densities;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracestat_core::{Histogram, Result};

/// Performance metrics extracted from an execution model.
///
/// `func_calls_instr`, `func_calls_cycles` and `func_cpi` are ordered by
/// descending value. The other per-mnemonic and per-function maps keep the
/// order in which their keys were first met.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Executed instructions, weighted by call-site invocation counts.
    pub instructions: u64,
    /// Sum of every count in `func_used_instr`.
    pub unique_instructions: u64,
    /// Weighted executions per mnemonic.
    pub instructions_counts: Histogram,
    /// Weighted instructions per function.
    pub func_calls_instr: IndexMap<String, u64>,
    /// Instruction mix of each function body, not weighted by invocations.
    pub func_used_instr: IndexMap<String, Histogram>,
    /// Estimated cycles, weighted.
    pub cycles: u64,
    /// Cycles attributed to each mnemonic, see [`crate::CycleBuckets`].
    pub cycles_count: IndexMap<String, u64>,
    /// Weighted cycles per function.
    pub func_calls_cycles: IndexMap<String, u64>,
    pub cpi: f64,
    pub ipc: f64,
    pub func_cpi: IndexMap<String, f64>,
    /// Category shares of `instructions_counts`.
    pub densities: Densities,
    /// Category shares of each `func_used_instr` histogram.
    pub func_densities: IndexMap<String, Densities>,
    pub averages: Averages,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Averages {
    /// Number of distinct function names.
    pub func_number: usize,
    /// `unique_instructions / func_number`
    pub instr_per_func: f64,
}

impl Metrics {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
