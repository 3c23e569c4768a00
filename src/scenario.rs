//! Scenarios are combinations of a decarbonisation pathway and a sensitivity.
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::fmt;
use strum::EnumIter;

/// A decarbonisation pathway, determining how technologies are ranked and which are permitted
#[derive(
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Debug,
    EnumIter,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum Pathway {
    /// Choose the cheapest technologies first
    #[string = "me"]
    MostEconomic,
    /// Choose the technologies with the lowest emissions first
    #[string = "fa"]
    FastAbatement,
    /// Phase out fossil technologies from a cutoff year
    #[string = "nf"]
    NoFossil,
    /// Phase out fossil technologies early, keeping only incumbents until then
    #[string = "nfs"]
    NoFossilStrict,
    /// Business as usual: no retrofits and no forced phase-outs
    #[string = "bau"]
    BusinessAsUsual,
}

impl Pathway {
    /// Whether this is the business-as-usual pathway
    pub fn is_business_as_usual(self) -> bool {
        self == Self::BusinessAsUsual
    }
}

/// A sensitivity, selecting alternative input data
#[derive(
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Debug,
    EnumIter,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum Sensitivity {
    /// Default assumptions
    #[string = "def"]
    Default,
    /// Business-as-usual demand growth
    #[string = "bdem"]
    BauDemand,
    /// Low demand growth
    #[string = "ldem"]
    LowDemand,
    /// Low fossil fuel prices
    #[string = "lfos"]
    LowFossilPrices,
    /// Constrained CO2 storage
    #[string = "ccs"]
    ConstrainedCcs,
}

/// One independent run of the simulation
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct Scenario {
    /// The decarbonisation pathway
    pub pathway: Pathway,
    /// The input-data sensitivity
    pub sensitivity: Sensitivity,
}

impl Scenario {
    /// The seed for this scenario's random number generator.
    ///
    /// Each scenario gets its own seed so that running scenarios in parallel cannot change the
    /// random draws made within any one of them.
    pub fn seed(self, base_seed: u64) -> u64 {
        base_seed
            .wrapping_add(16 * self.pathway as u64)
            .wrapping_add(self.sensitivity as u64)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.pathway, self.sensitivity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use strum::IntoEnumIterator;

    #[test]
    fn test_scenario_name() {
        let scenario = Scenario {
            pathway: Pathway::NoFossilStrict,
            sensitivity: Sensitivity::LowDemand,
        };
        assert_eq!(scenario.to_string(), "nfs_ldem");
    }

    #[test]
    fn test_scenario_seeds_unique() {
        let seeds = Pathway::iter()
            .cartesian_product(Sensitivity::iter())
            .map(|(pathway, sensitivity)| Scenario { pathway, sensitivity }.seed(100))
            .collect_vec();
        assert_eq!(seeds.iter().unique().count(), seeds.len());
    }
}
