use crate::cost::CostModel;
use crate::density::Densities;
use crate::metrics::{Averages, Metrics};
use indexmap::IndexMap;
use tracestat_core::{Address, Error, ExecutionModel, Histogram, Result};
use tracing::{debug, info};

/// How cycles are attributed to mnemonics in [`Metrics::cycles_count`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CycleBuckets {
    /// Each mnemonic gets `count * cost * invocations`, so the buckets sum to
    /// [`Metrics::cycles`].
    #[default]
    Isolated,
    /// Each mnemonic gets the running, unweighted cycle subtotal of its block
    /// at the point the mnemonic is visited (first-seen order). Mnemonics late
    /// in a block are inflated. Matches the output of earlier releases.
    RunningSubtotal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    pub cycle_buckets: CycleBuckets,
}

/// Weighted totals accumulated over call sites, before derived values.
#[derive(Default)]
struct Totals {
    instructions: u64,
    cycles: u64,
    instructions_counts: Histogram,
    cycles_count: IndexMap<String, u64>,
    func_calls_instr: IndexMap<String, u64>,
    func_calls_cycles: IndexMap<String, u64>,
    func_used_instr: IndexMap<String, Histogram>,
}

fn overflow(address: Address, what: &str) -> Error {
    Error::Overflow(format!("{what} of call site {address:#x} exceeds u64"))
}

fn product(a: u64, b: u64, address: Address, what: &str) -> Result<u64> {
    a.checked_mul(b).ok_or_else(|| overflow(address, what))
}

fn add_to(slot: &mut u64, amount: u64, address: Address, what: &str) -> Result<()> {
    *slot = slot.checked_add(amount).ok_or_else(|| overflow(address, what))?;
    Ok(())
}

/// Combines an execution model with a cost model into [`Metrics`].
pub struct MetricsEngine<'a> {
    costs: &'a CostModel,
    config: EngineConfig,
}

impl<'a> MetricsEngine<'a> {
    pub fn new(costs: &'a CostModel) -> Self {
        Self::with_config(costs, EngineConfig::default())
    }

    pub fn with_config(costs: &'a CostModel, config: EngineConfig) -> Self {
        Self { costs, config }
    }

    /// Compute the metrics of `model`.
    ///
    /// Only blocks listed in `model.calls` contribute, each weighted by its
    /// invocation count.
    pub fn compute(&self, model: &ExecutionModel) -> Result<Metrics> {
        let mut totals = self.accumulate(model)?;

        // `sort_by` is stable, so ties keep first-seen order.
        totals.func_calls_instr.sort_by(|_, a, _, b| b.cmp(a));
        totals.func_calls_cycles.sort_by(|_, a, _, b| b.cmp(a));

        if totals.instructions == 0 {
            return Err(Error::InsufficientData(
                "no instructions were executed from any call site".into(),
            ));
        }
        let cpi = totals.cycles as f64 / totals.instructions as f64;

        let mut func_cpi = IndexMap::new();
        for (name, &cycles) in totals.func_calls_cycles.iter() {
            let instructions = totals.func_calls_instr.get(name).copied().unwrap_or(0);
            if instructions == 0 {
                return Err(Error::InsufficientData(format!(
                    "function '{name}' executed no instructions"
                )));
            }
            func_cpi.insert(name.clone(), cycles as f64 / instructions as f64);
        }
        func_cpi.sort_by(|_, a, _, b| b.total_cmp(a));

        let unique_instructions = totals
            .func_used_instr
            .values()
            .try_fold(0u64, |sum, histogram| sum.checked_add(histogram.checked_total()?))
            .ok_or_else(|| Error::Overflow("unique instruction count exceeds u64".into()))?;

        let densities = Densities::from_histogram(&totals.instructions_counts, self.costs)?;
        let mut func_densities = IndexMap::new();
        for (name, histogram) in totals.func_used_instr.iter() {
            func_densities.insert(name.clone(), Densities::from_histogram(histogram, self.costs)?);
        }

        let func_number = totals.func_used_instr.len();
        if func_number == 0 {
            return Err(Error::InsufficientData("no function was called".into()));
        }

        info!(
            instructions = totals.instructions,
            cycles = totals.cycles,
            functions = func_number,
            cpi,
            "metrics computed"
        );

        Ok(Metrics {
            instructions: totals.instructions,
            unique_instructions,
            instructions_counts: totals.instructions_counts,
            func_calls_instr: totals.func_calls_instr,
            func_used_instr: totals.func_used_instr,
            cycles: totals.cycles,
            cycles_count: totals.cycles_count,
            func_calls_cycles: totals.func_calls_cycles,
            cpi,
            ipc: 1.0 / cpi,
            func_cpi,
            densities,
            func_densities,
            averages: Averages {
                func_number,
                instr_per_func: unique_instructions as f64 / func_number as f64,
            },
        })
    }

    fn accumulate(&self, model: &ExecutionModel) -> Result<Totals> {
        let mut totals = Totals::default();

        for (&address, site) in model.calls.iter() {
            let block = model
                .blocks
                .get(&address)
                .ok_or(Error::UnknownBlock(address))?;
            let weight = site.count;

            let mut block_instructions = 0u64;
            let mut block_cycles = 0u64;
            let used = totals.func_used_instr.entry(site.name.clone()).or_default();

            for (mnemonic, count) in block.iter() {
                let cost = self.costs.cost_of(mnemonic)?;
                let cycles = product(count, cost, address, "block cycles")?;
                add_to(&mut block_instructions, count, address, "block instructions")?;
                add_to(&mut block_cycles, cycles, address, "block cycles")?;

                let weighted = product(count, weight, address, "instruction count")?;
                totals
                    .instructions_counts
                    .checked_add(mnemonic, weighted)
                    .ok_or_else(|| overflow(address, "instruction count"))?;
                used.checked_add(mnemonic, count)
                    .ok_or_else(|| overflow(address, "function instruction mix"))?;

                let bucket = match self.config.cycle_buckets {
                    CycleBuckets::Isolated => product(cycles, weight, address, "cycle bucket")?,
                    CycleBuckets::RunningSubtotal => block_cycles,
                };
                let slot = totals.cycles_count.entry(mnemonic.to_string()).or_insert(0);
                add_to(slot, bucket, address, "cycle bucket")?;
            }

            debug!(
                address = %format!("{address:#x}"),
                function = %site.name,
                invocations = weight,
                block_instructions,
                block_cycles,
                "call site"
            );

            let instructions = product(block_instructions, weight, address, "instructions")?;
            let cycles = product(block_cycles, weight, address, "cycles")?;
            let slot = totals.func_calls_instr.entry(site.name.clone()).or_insert(0);
            add_to(slot, instructions, address, "function instructions")?;
            let slot = totals.func_calls_cycles.entry(site.name.clone()).or_insert(0);
            add_to(slot, cycles, address, "function cycles")?;
            add_to(&mut totals.instructions, instructions, address, "instructions")?;
            add_to(&mut totals.cycles, cycles, address, "cycles")?;
        }

        Ok(totals)
    }
}
