//! Upstream (scope 3) emissions attributed to the inputs of a process.
//!
//! How an input's emission factor is applied depends on whether the input is biogenic or fossil,
//! and whether it is burned for energy or incorporated into the product as a raw material. Each
//! combination maps to one fixed formula.
use crate::units::{Dimensionless, EmissionsPerTonne};

/// Whether an input is of biogenic or fossil origin
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum MaterialOrigin {
    /// Biogenic input (negative emission factor, as carbon was absorbed during growth)
    Bio,
    /// Fossil input
    Fossil,
}

impl MaterialOrigin {
    /// Classify an input by the sign of its emission factor
    pub fn from_factor(factor: EmissionsPerTonne) -> Self {
        if factor < EmissionsPerTonne(0.0) {
            Self::Bio
        } else {
            Self::Fossil
        }
    }
}

/// How an input is used by the process
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum InputCategory {
    /// Burned to provide process energy
    Energy,
    /// Incorporated into the product
    RawMaterial,
}

/// The formula used to attribute upstream emissions to a process input
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum UpstreamFormula {
    /// Only the share of carbon not retained in the product is credited
    RetainedShare,
    /// The full emission factor applies
    Full,
    /// No upstream emissions are attributed
    Zero,
}

/// The decision table mapping an input's origin and category to a formula
const fn formula(origin: MaterialOrigin, category: InputCategory) -> UpstreamFormula {
    match (origin, category) {
        (MaterialOrigin::Bio, InputCategory::RawMaterial) => UpstreamFormula::RetainedShare,
        (MaterialOrigin::Fossil, InputCategory::RawMaterial) => UpstreamFormula::Full,
        (MaterialOrigin::Bio, InputCategory::Energy) => UpstreamFormula::Zero,
        (MaterialOrigin::Fossil, InputCategory::Energy) => UpstreamFormula::Full,
    }
}

/// Upstream emissions per tonne of product from one input.
///
/// # Arguments
///
/// * `input` - Tonnes of input per tonne of product
/// * `factor` - Emission factor of the input
/// * `emissions_share` - Share of the input's carbon that ends up emitted during production
/// * `category` - How the input is used
pub fn upstream_emissions(
    input: Dimensionless,
    factor: EmissionsPerTonne,
    emissions_share: Dimensionless,
    category: InputCategory,
) -> EmissionsPerTonne {
    match formula(MaterialOrigin::from_factor(factor), category) {
        UpstreamFormula::RetainedShare => factor * input * (Dimensionless(1.0) - emissions_share),
        UpstreamFormula::Full => factor * input,
        UpstreamFormula::Zero => EmissionsPerTonne(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(-2.0, 0.25, InputCategory::RawMaterial, -3.0)] // bio raw material: 2 * -2 * 0.75
    #[case(2.0, 0.25, InputCategory::RawMaterial, 4.0)] // fossil raw material
    #[case(-2.0, 0.25, InputCategory::Energy, 0.0)] // bio energy
    #[case(2.0, 0.25, InputCategory::Energy, 4.0)] // fossil energy
    fn test_upstream_emissions(
        #[case] factor: f64,
        #[case] share: f64,
        #[case] category: InputCategory,
        #[case] expected: f64,
    ) {
        let emissions = upstream_emissions(
            Dimensionless(2.0),
            EmissionsPerTonne(factor),
            Dimensionless(share),
            category,
        );
        assert_approx_eq!(f64, emissions.value(), expected);
    }

    #[test]
    fn test_material_origin() {
        assert_eq!(
            MaterialOrigin::from_factor(EmissionsPerTonne(-0.1)),
            MaterialOrigin::Bio
        );
        assert_eq!(
            MaterialOrigin::from_factor(EmissionsPerTonne(0.0)),
            MaterialOrigin::Fossil
        );
    }
}
