use crate::metrics::Metrics;
use tracestat_core::Result;

const SUMMARY: &str = "summary.md";
const FUNCTIONS: &str = "functions.md";
const DENSITIES: &str = "densities.md";
const CYCLES: &str = "instrcycles.md";
const CPI: &str = "cpi.md";

/// A rendered markdown document and the file name it should be written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub file_name: &'static str,
    pub content: String,
}

/// Generates human-readable and machine-readable reports.
pub struct Report<'a> {
    metrics: &'a Metrics,
}

impl<'a> Report<'a> {
    pub fn new(metrics: &'a Metrics) -> Self {
        Self { metrics }
    }

    /// Render every markdown page. The summary links to the others.
    pub fn to_markdown(&self) -> Vec<Page> {
        vec![
            Page {
                file_name: SUMMARY,
                content: self.summary(),
            },
            Page {
                file_name: FUNCTIONS,
                content: self.functions(),
            },
            Page {
                file_name: DENSITIES,
                content: self.densities(),
            },
            Page {
                file_name: CYCLES,
                content: self.instructions_and_cycles(),
            },
            Page {
                file_name: CPI,
                content: self.cpi(),
            },
        ]
    }

    /// Generate a JSON report.
    pub fn to_json(&self) -> Result<String> {
        self.metrics.to_json()
    }

    fn summary(&self) -> String {
        let m = self.metrics;
        let mut out = String::new();

        out.push_str("# **Code analysis report**\n\n");

        out.push_str("## Counts\n\n");
        out.push_str(&format!("Total instructions : {}<br>\n", group_digits(m.instructions)));
        out.push_str(&format!("Total cycles (approx) : {}<br>\n", group_digits(m.cycles)));
        out.push_str(&format!("*More on theses files [instructions cycles]({CYCLES})*<br>\n"));

        out.push_str("## CPI\n\n");
        out.push_str(&format!("Global CPI : {:.3} <br>\n", m.cpi));
        out.push_str(&format!("Global IPC : {:.3} <br>\n", m.ipc));
        out.push_str(&format!("*More on this file [ipc/cpi]({CPI})*<br>\n"));

        out.push_str("## Densities\n\n");
        for (category, percent) in m.densities.percents.iter() {
            out.push_str(&format!("Total {category} proportion : {percent:.3} %<br>\n"));
        }
        out.push_str(&format!("*More on this file [densities]({DENSITIES})*<br>\n"));

        out.push_str("## Functions\n\n");
        out.push_str(&format!("Total functions number : {} <br>\n", m.averages.func_number));
        out.push_str(&format!(
            "Mean instructions per functions : {:.3} <br>\n",
            m.averages.instr_per_func
        ));
        out.push_str(&format!("*More on this file [functions]({FUNCTIONS})*<br>\n"));

        out
    }

    fn functions(&self) -> String {
        let mut out = String::from("# **Functions detailled report**\n\n");

        for (func, histogram) in self.metrics.func_used_instr.iter() {
            out.push_str(&format!("## {}\n\n", display_name(func)));
            out.push_str("| Opcode | Count |\n");
            out.push_str("| ------------- | ------------------ |\n");
            for (mnemonic, count) in histogram.iter() {
                out.push_str(&format!("| {mnemonic} | {count} |\n"));
            }
            out.push('\n');
        }

        out.push_str(BACK_TO_SUMMARY);
        out
    }

    fn densities(&self) -> String {
        let mut out = String::from("# **Densities detailled report**\n\n");

        for (func, densities) in self.metrics.func_densities.iter() {
            out.push_str(&format!("## {}\n\n", display_name(func)));
            out.push_str("| Instruction type | Proportion |\n");
            out.push_str("| ---------------- | ---------- |\n");
            for (category, percent) in densities.percents.iter() {
                out.push_str(&format!("| {category} | {percent:.3} |\n"));
            }
            out.push('\n');
        }

        out.push_str(BACK_TO_SUMMARY);
        out
    }

    fn instructions_and_cycles(&self) -> String {
        let m = self.metrics;
        let mut out = String::from("# **Instructions and cycles detailled report**\n\n");

        out.push_str("## Functions details\n\n");
        out.push_str("| Function name | Instructions count | Cycles counts |\n");
        out.push_str("| ------------- | ------------------ | ------------- |\n");
        for (func, instructions) in m.func_calls_instr.iter() {
            let cycles = m.func_calls_cycles.get(func).copied().unwrap_or(0);
            out.push_str(&format!("| {} | {instructions} | {cycles} |\n", display_name(func)));
        }
        out.push_str("\n*Table is ordered by descending instructions counts*\n\n");

        out.push_str(BACK_TO_SUMMARY);
        out
    }

    fn cpi(&self) -> String {
        let m = self.metrics;
        let mut out = String::from("# **CPI detailled report**\n\n");

        out.push_str("## Global\n\n");
        out.push_str(&format!("Global CPI : {:.3} <br>\n", m.cpi));
        out.push_str(&format!("Global IPC : {:.3} <br>\n", m.ipc));

        out.push_str("## Functions details\n\n");
        out.push_str("| Function name | CPI | IPC |\n");
        out.push_str("| ------------- | --- | --- |\n");
        for (func, cpi) in m.func_cpi.iter() {
            out.push_str(&format!("| {} | {cpi:.3} | {:.3} |\n", display_name(func), 1.0 / cpi));
        }
        out.push('\n');

        out.push_str(BACK_TO_SUMMARY);
        out
    }
}

const BACK_TO_SUMMARY: &str = "---\n*Return to [summary](summary.md)*<br>\n";

/// Call sites without a symbol have an empty name.
fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "(unknown)"
    } else {
        name
    }
}

/// Format with `,` thousands separators.
fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{Category, CostModel};
    use crate::engine::MetricsEngine;
    use tracestat_core::{CallSite, ExecutionModel};

    fn metrics() -> Metrics {
        let mut costs = CostModel::new();
        costs.insert("ADD", 1, Some(Category::Arithmetic)).unwrap();
        costs.insert("SW", 2, Some(Category::Memory)).unwrap();

        let mut model = ExecutionModel::default();
        model
            .blocks
            .insert(100, [("add", 2), ("sw", 1)].into_iter().collect());
        model
            .blocks
            .insert(200, [("add", 1)].into_iter().collect());
        model.calls.insert(
            100,
            CallSite {
                name: "foo".to_string(),
                count: 1000,
            },
        );
        model.calls.insert(
            200,
            CallSite {
                name: String::new(),
                count: 1,
            },
        );
        MetricsEngine::new(&costs).compute(&model).unwrap()
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1000), "1,000");
        assert_eq!(group_digits(1234567), "1,234,567");
    }

    #[test]
    fn test_markdown_pages() {
        let metrics = metrics();
        let pages = Report::new(&metrics).to_markdown();

        let names: Vec<_> = pages.iter().map(|page| page.file_name).collect();
        assert_eq!(names, vec![SUMMARY, FUNCTIONS, DENSITIES, CYCLES, CPI]);

        let summary = &pages[0].content;
        assert!(summary.contains("Total instructions : 3,001<br>"));
        assert!(summary.contains("Total cycles (approx) : 4,001<br>"));
        assert!(summary.contains("Total arithmetic proportion : "));
        assert!(summary.contains("Total functions number : 2 <br>"));

        let functions = &pages[1].content;
        assert!(functions.contains("## foo\n"));
        assert!(functions.contains("## (unknown)\n"));
        assert!(functions.contains("| sw | 1 |"));

        let cycles = &pages[3].content;
        assert!(cycles.contains("| foo | 3000 | 4000 |"));

        for page in &pages[1..] {
            assert!(page.content.ends_with(BACK_TO_SUMMARY));
        }
    }

    #[test]
    fn test_json_report_keeps_rankings() {
        let metrics = metrics();
        let json = Report::new(&metrics).to_json().unwrap();
        let back = Metrics::from_json(&json).unwrap();

        assert_eq!(back.instructions, 3001);
        // `IndexMap` equality ignores order, so compare the entries in sequence.
        assert!(back.func_calls_instr.iter().eq(metrics.func_calls_instr.iter()));
        assert!(back.func_used_instr.iter().eq(metrics.func_used_instr.iter()));
        assert_eq!(
            back.func_cpi.keys().collect::<Vec<_>>(),
            metrics.func_cpi.keys().collect::<Vec<_>>()
        );
    }
}
