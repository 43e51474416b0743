//! Instruction category densities.

use crate::cost::{Category, CostModel};
use serde::{Deserialize, Serialize};
use tracestat_core::{Error, Histogram, Result};

/// One value per [`Category`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryCounts<T> {
    pub jumps: T,
    pub conditions: T,
    pub arithmetic: T,
    pub muldiv: T,
    pub memory: T,
    pub special: T,
}

impl<T: Copy> CategoryCounts<T> {
    pub fn get(&self, category: Category) -> T {
        match category {
            Category::Jumps => self.jumps,
            Category::Conditions => self.conditions,
            Category::Arithmetic => self.arithmetic,
            Category::Muldiv => self.muldiv,
            Category::Memory => self.memory,
            Category::Special => self.special,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut T {
        match category {
            Category::Jumps => &mut self.jumps,
            Category::Conditions => &mut self.conditions,
            Category::Arithmetic => &mut self.arithmetic,
            Category::Muldiv => &mut self.muldiv,
            Category::Memory => &mut self.memory,
            Category::Special => &mut self.special,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, T)> + '_ {
        Category::ALL
            .into_iter()
            .map(move |category| (category, self.get(category)))
    }
}

/// Category shares of a histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Densities {
    /// Share of each category, in percent of the categorized total.
    pub percents: CategoryCounts<f64>,
    pub counts: CategoryCounts<u64>,
    /// `jumps + conditions`
    pub branch_count: u64,
    /// `arithmetic + muldiv`
    pub arithmetic_count: u64,
    pub branch_densities: f64,
    pub arithmetic_densities: f64,
    pub memory_densities: f64,
    pub special_densities: f64,
}

impl Densities {
    /// Classify every mnemonic of `histogram` and compute category shares.
    ///
    /// Fails if a mnemonic has no category or the histogram is empty.
    pub fn from_histogram(histogram: &Histogram, costs: &CostModel) -> Result<Self> {
        let mut counts = CategoryCounts::<u64>::default();
        for (mnemonic, count) in histogram.iter() {
            *counts.get_mut(costs.category_of(mnemonic)?) += count;
        }

        let total: u64 = counts.iter().map(|(_, count)| count).sum();
        if total == 0 {
            return Err(Error::InsufficientData(
                "cannot compute densities of an empty histogram".into(),
            ));
        }
        let percent = |count: u64| count as f64 * 100.0 / total as f64;

        let mut percents = CategoryCounts::<f64>::default();
        for (category, count) in counts.iter() {
            *percents.get_mut(category) = percent(count);
        }

        let branch_count = counts.jumps + counts.conditions;
        let arithmetic_count = counts.arithmetic + counts.muldiv;

        Ok(Self {
            percents,
            counts,
            branch_count,
            arithmetic_count,
            branch_densities: percent(branch_count),
            arithmetic_densities: percent(arithmetic_count),
            memory_densities: percents.memory,
            special_densities: percents.special,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn costs() -> CostModel {
        CostModel::from_toml_str(
            r#"
[jumps]
JAL = 1
[conditions]
BNE = 2
[arithmetic]
ADD = 1
[muldiv]
MUL = 3
[memory]
SW = 2
[special]
CSRRW = 4
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_percentages_sum_to_100() {
        let histogram: Histogram = [
            ("jal", 3),
            ("bne", 7),
            ("add", 11),
            ("mul", 2),
            ("sw", 5),
            ("csrrw", 1),
        ]
        .into_iter()
        .collect();
        let densities = Densities::from_histogram(&histogram, &costs()).unwrap();

        let sum: f64 = densities.percents.iter().map(|(_, p)| p).sum();
        assert!((sum - 100.0).abs() < 1e-6 * 100.0);

        assert_eq!(densities.counts.conditions, 7);
        assert_eq!(densities.branch_count, 10);
        assert_eq!(densities.arithmetic_count, 13);
        assert!((densities.branch_densities - 10.0 * 100.0 / 29.0).abs() < 1e-9);
        assert_eq!(densities.memory_densities, densities.percents.memory);
    }

    #[test]
    fn test_uncategorized_mnemonic_fails() {
        let histogram: Histogram = [("add", 1), ("fence", 1)].into_iter().collect();
        assert!(matches!(
            Densities::from_histogram(&histogram, &costs()),
            Err(Error::MissingCategory(m)) if m == "fence"
        ));
    }

    #[test]
    fn test_empty_histogram_is_insufficient_data() {
        assert!(matches!(
            Densities::from_histogram(&Histogram::new(), &costs()),
            Err(Error::InsufficientData(_))
        ));
    }
}
