//! Chemicals are the products made by plants, and the materials that plants consume.
use crate::id::define_id_type;
use crate::units::Tonnes;
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use strum::EnumIter;

define_id_type! {ChemicalID}

/// The two grades of methanol tracked separately by the model
#[derive(
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Debug,
    PartialOrd,
    Ord,
    EnumIter,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum MethanolType {
    /// Methanol made from fossil feedstocks
    #[string = "black"]
    Black,
    /// Methanol made from biogenic or electrolytic feedstocks
    #[string = "green"]
    Green,
}

/// A material whose availability is capped by the availability ledger
#[derive(
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Debug,
    PartialOrd,
    Ord,
    EnumIter,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum Material {
    /// Solid biomass
    #[string = "biomass"]
    Biomass,
    /// Bio-oils
    #[string = "bio_oils"]
    BioOils,
    /// Pyrolysis oil from plastic waste
    #[string = "pyrolysis_oil"]
    PyrolysisOil,
    /// Waste water
    #[string = "waste_water"]
    WasteWater,
    /// Municipal solid waste (refuse-derived fuel)
    #[string = "municipal_solid_waste"]
    MunicipalSolidWaste,
    /// Geological CO2 storage
    #[string = "co2_storage"]
    Co2Storage,
    /// Methanol made from fossil feedstocks
    #[string = "methanol_black"]
    MethanolBlack,
    /// Methanol made from green feedstocks
    #[string = "methanol_green"]
    MethanolGreen,
}

impl Material {
    /// Whether the material is traded globally rather than per region
    pub fn is_global(self) -> bool {
        matches!(self, Self::MethanolBlack | Self::MethanolGreen)
    }

    /// Whether usage of the material is additionally tracked per consuming chemical
    pub fn is_tracked_per_chemical(self) -> bool {
        matches!(
            self,
            Self::Biomass | Self::Co2Storage | Self::MethanolBlack | Self::MethanolGreen
        )
    }

    /// The ledger material corresponding to a grade of methanol
    pub fn methanol(methanol_type: MethanolType) -> Self {
        match methanol_type {
            MethanolType::Black => Self::MethanolBlack,
            MethanolType::Green => Self::MethanolGreen,
        }
    }
}

/// The yearly consumption of capped materials by a single plant.
///
/// CO2 capture is given both as the total over the plant lifetime and per year. Only the yearly
/// figure counts towards storage availability.
#[derive(PartialEq, Debug, Clone, Default, Deserialize)]
pub struct MaterialUsage {
    /// Biomass consumed per year
    pub biomass: Tonnes,
    /// Bio-oils consumed per year
    pub bio_oils: Tonnes,
    /// Pyrolysis oil consumed per year
    pub pyrolysis_oil: Tonnes,
    /// Waste water consumed per year
    pub waste_water: Tonnes,
    /// Municipal solid waste consumed per year
    pub municipal_solid_waste: Tonnes,
    /// Black methanol consumed per year
    pub methanol_black: Tonnes,
    /// Green methanol consumed per year
    pub methanol_green: Tonnes,
    /// CO2 captured over the plant lifetime
    pub ccs_total: Tonnes,
    /// CO2 captured (and stored) per year
    pub ccs_yearly: Tonnes,
}

impl MaterialUsage {
    /// The yearly usage of the given material
    pub fn get(&self, material: Material) -> Tonnes {
        match material {
            Material::Biomass => self.biomass,
            Material::BioOils => self.bio_oils,
            Material::PyrolysisOil => self.pyrolysis_oil,
            Material::WasteWater => self.waste_water,
            Material::MunicipalSolidWaste => self.municipal_solid_waste,
            Material::Co2Storage => self.ccs_yearly,
            Material::MethanolBlack => self.methanol_black,
            Material::MethanolGreen => self.methanol_green,
        }
    }

    /// Total methanol of both grades consumed per year
    pub fn methanol(&self) -> Tonnes {
        self.methanol_black + self.methanol_green
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[test]
    fn test_material_usage_get() {
        let usage = MaterialUsage {
            biomass: Tonnes(1.0),
            ccs_total: Tonnes(100.0),
            ccs_yearly: Tonnes(4.0),
            methanol_green: Tonnes(2.0),
            ..MaterialUsage::default()
        };
        assert_eq!(usage.get(Material::Biomass), Tonnes(1.0));
        assert_eq!(usage.get(Material::Co2Storage), Tonnes(4.0));
        assert_eq!(usage.methanol(), Tonnes(2.0));
    }

    #[test]
    fn test_only_methanol_is_global() {
        let global: Vec<_> = Material::iter().filter(|m| m.is_global()).collect();
        assert_eq!(global, [Material::MethanolBlack, Material::MethanolGreen]);
        assert_eq!(Material::methanol(MethanolType::Green), Material::MethanolGreen);
    }

    #[rstest]
    #[case(Material::BioOils, "bio_oils")]
    #[case(Material::Co2Storage, "co2_storage")]
    #[case(Material::MethanolBlack, "methanol_black")]
    fn test_material_display_matches_label(#[case] material: Material, #[case] label: &str) {
        assert_eq!(material.to_string(), label);
    }
}
