//! Static instruction cost model.
//!
//! The model is a TOML document made of top-level tables, each mapping an
//! uppercased mnemonic to its cycle cost:
//!
//! ```toml
//! [arithmetic]
//! ADD = 1
//! ADDI = 1
//!
//! [memory]
//! LW = 2
//! SW = 2
//! ```
//!
//! Every table feeds the cost lookup. Tables named after a [`Category`] also
//! assign their mnemonics to that category.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use tracestat_core::{Error, Result};
use tracing::{info, warn};

/// Instruction categories used for density analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Jumps,
    Conditions,
    Arithmetic,
    Muldiv,
    Memory,
    Special,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Jumps,
        Category::Conditions,
        Category::Arithmetic,
        Category::Muldiv,
        Category::Memory,
        Category::Special,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Jumps => "jumps",
            Category::Conditions => "conditions",
            Category::Arithmetic => "arithmetic",
            Category::Muldiv => "muldiv",
            Category::Memory => "memory",
            Category::Special => "special",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.name() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy)]
struct InstructionCost {
    cycles: u64,
    category: Option<Category>,
}

/// Cycle cost and category of every known mnemonic.
#[derive(Debug, Clone, Default)]
pub struct CostModel {
    instructions: HashMap<String, InstructionCost>,
}

impl CostModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a cost model from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let model = Self::from_toml_str(&source)?;
        info!(
            path = %path.display(),
            instructions = model.len(),
            "cost model loaded"
        );
        Ok(model)
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let tables: BTreeMap<String, BTreeMap<String, i64>> =
            toml::from_str(source).map_err(|e| Error::CostModel(e.to_string()))?;

        let mut model = Self::new();
        for (table, entries) in tables {
            let category = Category::from_name(&table);
            if category.is_none() {
                warn!(%table, "table is not an instruction category, used for costs only");
            }
            for (mnemonic, cycles) in entries {
                let cycles = u64::try_from(cycles)
                    .ok()
                    .filter(|&cycles| cycles > 0)
                    .ok_or_else(|| {
                        Error::CostModel(format!(
                            "[{table}] {mnemonic}: cycle cost must be positive, got {cycles}"
                        ))
                    })?;
                model.insert(&mnemonic, cycles, category)?;
            }
        }
        Ok(model)
    }

    /// Register a mnemonic. A mnemonic may only be registered once.
    pub fn insert(&mut self, mnemonic: &str, cycles: u64, category: Option<Category>) -> Result<()> {
        let key = mnemonic.to_uppercase();
        if self.instructions.contains_key(&key) {
            return Err(Error::CostModel(format!("{key} is defined more than once")));
        }
        self.instructions
            .insert(key, InstructionCost { cycles, category });
        Ok(())
    }

    /// Cycle cost of `mnemonic`, looked up case-insensitively.
    pub fn cost_of(&self, mnemonic: &str) -> Result<u64> {
        self.instructions
            .get(&mnemonic.to_uppercase())
            .map(|instruction| instruction.cycles)
            .ok_or_else(|| Error::MissingCost(mnemonic.to_string()))
    }

    /// Category of `mnemonic`, looked up case-insensitively.
    pub fn category_of(&self, mnemonic: &str) -> Result<Category> {
        self.instructions
            .get(&mnemonic.to_uppercase())
            .and_then(|instruction| instruction.category)
            .ok_or_else(|| Error::MissingCategory(mnemonic.to_string()))
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[arithmetic]
ADD = 1
addi = 1

[memory]
SW = 2
LW = 3

[pseudo]
NOP = 1
"#;

    #[test]
    fn test_cost_lookup_is_case_insensitive() {
        let model = CostModel::from_toml_str(CONFIG).unwrap();
        assert_eq!(model.len(), 5);
        assert_eq!(model.cost_of("add").unwrap(), 1);
        assert_eq!(model.cost_of("ADDI").unwrap(), 1);
        assert_eq!(model.cost_of("lw").unwrap(), 3);
        assert!(matches!(model.cost_of("mul"), Err(Error::MissingCost(m)) if m == "mul"));
    }

    #[test]
    fn test_category_from_table_name() {
        let model = CostModel::from_toml_str(CONFIG).unwrap();
        assert_eq!(model.category_of("sw").unwrap(), Category::Memory);
        assert_eq!(model.category_of("add").unwrap(), Category::Arithmetic);

        // Extra tables only contribute costs.
        assert_eq!(model.cost_of("nop").unwrap(), 1);
        assert!(matches!(model.category_of("nop"), Err(Error::MissingCategory(_))));
    }

    #[test]
    fn test_rejects_duplicate_mnemonic() {
        let config = "[arithmetic]\nADD = 1\n[special]\nadd = 4\n";
        assert!(matches!(
            CostModel::from_toml_str(config),
            Err(Error::CostModel(_))
        ));
    }

    #[test]
    fn test_rejects_non_positive_cost() {
        assert!(matches!(
            CostModel::from_toml_str("[memory]\nSW = 0\n"),
            Err(Error::CostModel(_))
        ));
        assert!(matches!(
            CostModel::from_toml_str("[memory]\nSW = -2\n"),
            Err(Error::CostModel(_))
        ));
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        match CostModel::load(&path) {
            Err(Error::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_category_names() {
        for category in Category::ALL {
            assert_eq!(Category::from_name(category.name()), Some(category));
        }
        assert_eq!(Category::from_name("pseudo"), None);
    }
}
