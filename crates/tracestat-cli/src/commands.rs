//! Command implementations for the tracestat CLI.
//!
//! Every command builds its whole output in memory before touching the
//! output path, so a failed run leaves no artifact behind.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracestat_analysis::{
    CostModel, CycleBuckets, EngineConfig, Metrics, MetricsEngine, ParsePolicy, Report,
    TraceParser,
};
use tracestat_core::ExecutionModel;
use tracing::info;

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// Parse command: trace log -> execution model.
pub fn parse(input: &Path, output: &Path, skip_malformed: bool) -> Result<()> {
    let policy = if skip_malformed {
        ParsePolicy::Skip
    } else {
        ParsePolicy::Abort
    };

    let trace = read_file(input).context("parse stage failed")?;
    let parsed = TraceParser::new(policy)
        .parse_str(&trace)
        .with_context(|| format!("parse stage failed on {}", input.display()))?;
    let json = parsed
        .model
        .to_json()
        .context("parse stage failed to serialize the execution model")?;
    write_file(output, &json)?;

    println!("Parsed {}", input.display());
    println!("  Blocks: {}", parsed.model.blocks.len());
    println!("  Call sites: {}", parsed.model.calls.len());
    if !parsed.skipped.is_empty() {
        println!("  Skipped lines: {}", parsed.skipped.len());
        for skipped in &parsed.skipped {
            println!("    line {}: {}", skipped.line, skipped.error);
        }
    }
    println!("  Output: {}", output.display());

    Ok(())
}

/// Compute command: execution model + cost model -> metrics.
pub fn compute(input: &Path, output: &Path, costs: &Path, legacy_cycle_buckets: bool) -> Result<()> {
    let model = ExecutionModel::from_json(&read_file(input).context("compute stage failed")?)
        .with_context(|| format!("compute stage failed to load {}", input.display()))?;
    let costs = CostModel::load(costs).context("compute stage failed to load the cost model")?;

    let config = EngineConfig {
        cycle_buckets: if legacy_cycle_buckets {
            CycleBuckets::RunningSubtotal
        } else {
            CycleBuckets::Isolated
        },
    };
    info!(?config, "computing metrics");

    let metrics = MetricsEngine::with_config(&costs, config)
        .compute(&model)
        .context("compute stage failed")?;
    let json = Report::new(&metrics)
        .to_json()
        .context("compute stage failed to serialize metrics")?;
    write_file(output, &json)?;

    println!("Computed metrics for {}", input.display());
    println!("  Instructions: {}", metrics.instructions);
    println!("  Cycles: {}", metrics.cycles);
    println!("  CPI: {:.3}", metrics.cpi);
    println!("  Functions: {}", metrics.averages.func_number);
    println!("  Output: {}", output.display());

    Ok(())
}

/// Report command: metrics -> markdown pages.
pub fn report(input: &Path, output: &Path) -> Result<()> {
    let metrics = Metrics::from_json(&read_file(input).context("report stage failed")?)
        .with_context(|| format!("report stage failed to load {}", input.display()))?;
    let pages = Report::new(&metrics).to_markdown();

    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    for page in &pages {
        write_file(&output.join(page.file_name), &page.content)?;
    }

    println!("Report written to {}", output.display());
    for page in &pages {
        println!("  {}", page.file_name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE: &str = "\
QEMU log
----------------
IN: _start
0x00010000:  00000097          auipc                   ra,0
0x00010004:  0c8080e7          jalr                    ra,ra,200
Trace 0: 0x7f0000000000 [00000000/0000000000010000/0101c078/00000200] _start
----------------
IN: memset
0x000156c6:  c30c              sw                      a1,0(a4)
0x000156c8:  0711              addi                    a4,a4,4
0x000156ca:  fed76ee3          bltu                    a4,a3,-4
Trace 0: 0x7f0000000100 [00000000/00000000000156c6/0101c078/00000200] memset
Trace 0: 0x7f0000000100 [00000000/00000000000156c6/0101c078/00000200] memset
Trace 0: 0x7f0000000100 [00000000/00000000000156c6/0101c078/00000200] memset
";

    const COSTS: &str = "\
[jumps]
JALR = 3
[conditions]
BLTU = 2
[arithmetic]
AUIPC = 1
ADDI = 1
[memory]
SW = 2
";

    #[test]
    fn test_pipeline_writes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("trace.log");
        let costs = dir.path().join("instructions.toml");
        let data = dir.path().join("data.json");
        let computed = dir.path().join("computed.json");
        let report_dir = dir.path().join("report");
        fs::write(&trace, TRACE).unwrap();
        fs::write(&costs, COSTS).unwrap();

        parse(&trace, &data, false).unwrap();
        compute(&data, &computed, &costs, false).unwrap();
        report(&computed, &report_dir).unwrap();

        let metrics = Metrics::from_json(&fs::read_to_string(&computed).unwrap()).unwrap();
        assert_eq!(metrics.instructions, 2 + 3 * 3);
        assert_eq!(metrics.cycles, 4 + 5 * 3);
        assert_eq!(
            metrics.func_calls_instr.keys().collect::<Vec<_>>(),
            vec!["memset", "_start"]
        );

        for page in ["summary.md", "functions.md", "densities.md", "instrcycles.md", "cpi.md"] {
            assert!(report_dir.join(page).exists(), "missing {page}");
        }
    }

    #[test]
    fn test_failed_parse_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("trace.log");
        let data = dir.path().join("data.json");
        fs::write(
            &trace,
            "header\nTrace 1: 0x7f0000000000 [00000000/0000000000010000/0/0] _start\n",
        )
        .unwrap();

        let error = parse(&trace, &data, false).unwrap_err();
        assert!(format!("{error:#}").contains("parse stage failed"));
        assert!(!data.exists());

        parse(&trace, &data, true).unwrap();
        assert!(data.exists());
    }

    #[test]
    fn test_compute_without_instructions_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data.json");
        let costs = dir.path().join("instructions.toml");
        let computed = dir.path().join("computed.json");
        fs::write(&data, r#"{"blocks": {}, "calls": {}}"#).unwrap();
        fs::write(&costs, COSTS).unwrap();

        let error = compute(&data, &computed, &costs, false).unwrap_err();
        assert!(format!("{error:#}").contains("Insufficient data"));
        assert!(!computed.exists());
    }

    #[test]
    fn test_missing_input_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.log");
        let error = parse(&missing, &dir.path().join("data.json"), false).unwrap_err();
        assert!(format!("{error:#}").contains("nope.log"));
    }
}
