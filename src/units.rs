//! This module defines various unit types and their conversions.
use serde::{Deserialize, Serialize};
use std::iter::Sum;

/// The number of tonnes in a megatonne
pub const TONNES_PER_MEGATONNE: f64 = 1e6;

macro_rules! unit_struct {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Display,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// Create a new instance of the unit type from a f64 value
            pub fn new(val: f64) -> Self {
                Self(val)
            }

            /// The value of the unit type as a f64
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// The larger of `self` and `other`
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                // Adding zero turns the -0.0 of an empty sum into 0.0
                Self(iter.map(|x| x.0).sum::<f64>() + 0.0)
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<$name> for $name {
            type Output = Dimensionless;
            fn div(self, rhs: $name) -> Dimensionless {
                Dimensionless(self.0 / rhs.0)
            }
        }
    };
}

/// Represents a dimensionless quantity (e.g. a capacity factor or a share).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Default,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::Sub,
    derive_more::Display,
)]
pub struct Dimensionless(pub f64);

impl Dimensionless {
    /// Create a new dimensionless value
    pub fn new(val: f64) -> Self {
        Self(val)
    }

    /// The value as a f64
    pub fn value(self) -> f64 {
        self.0
    }

    /// Whether the underlying value is finite
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

unit_struct!(Capacity, "Nameplate production capacity in megatonnes per year.");
unit_struct!(Volume, "Realised production volume in megatonnes per year.");
unit_struct!(Tonnes, "A quantity of material in tonnes per year.");
unit_struct!(Megatonnes, "A quantity of material in megatonnes per year.");
unit_struct!(MoneyPerTonne, "A levelised cost per tonne of product.");
unit_struct!(
    EmissionsPerTonne,
    "Emissions in tonnes of CO2 equivalent per tonne of product."
);

impl Capacity {
    /// The volume produced when operating at the given capacity factor
    pub fn at_factor(self, capacity_factor: Dimensionless) -> Volume {
        Volume(self.0 * capacity_factor.0)
    }
}

impl Tonnes {
    /// Convert to megatonnes
    pub fn to_megatonnes(self) -> Megatonnes {
        Megatonnes(self.0 / TONNES_PER_MEGATONNE)
    }
}

impl Megatonnes {
    /// Convert to tonnes
    pub fn to_tonnes(self) -> Tonnes {
        Tonnes(self.0 * TONNES_PER_MEGATONNE)
    }
}

impl From<Volume> for Megatonnes {
    fn from(volume: Volume) -> Self {
        Megatonnes(volume.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_capacity_at_factor() {
        let volume = Capacity(2.0).at_factor(Dimensionless(0.5));
        assert_eq!(volume, Volume(1.0));
    }

    #[test]
    fn test_tonnes_megatonnes_conversion() {
        assert_approx_eq!(f64, Tonnes(2.5e6).to_megatonnes().value(), 2.5);
        assert_approx_eq!(f64, Megatonnes(1e-6).to_tonnes().value(), 1.0);
    }

    #[test]
    fn test_sum_and_ratio() {
        let total: Volume = [Volume(1.0), Volume(2.0)].into_iter().sum();
        assert_eq!(total, Volume(3.0));
        assert_eq!(Volume(3.0) / Volume(1.5), Dimensionless(2.0));
    }

    #[test]
    fn test_empty_sum_is_positive_zero() {
        let total: Megatonnes = std::iter::empty().sum();
        assert!(total.value().is_sign_positive());
        assert_eq!(total.to_string(), "0");
    }
}
