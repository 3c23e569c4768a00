//! Plants are individual production units, each running a single technology in one region.
use crate::chemical::{ChemicalID, MaterialUsage, MethanolType};
use crate::region::RegionID;
use crate::technology::{Technology, TechnologyID, TechnologyTier};
use crate::units::{Capacity, Dimensionless, Volume};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::collections::HashMap;
use std::rc::Rc;

/// A unique identifier for a plant
#[derive(
    Clone,
    Copy,
    Debug,
    derive_more::Display,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
)]
pub struct PlantID(pub u32);

/// The capacity of a plant for each chemical it produces
pub type ChemicalCapacityMap = IndexMap<ChemicalID, Capacity>;

/// Plant capacities keyed by (technology, region)
pub type PlantCapacityMap = HashMap<(TechnologyID, RegionID), Rc<ChemicalCapacityMap>>;

/// Plant specs keyed by (technology, region, year)
pub type PlantSpecMap = HashMap<(TechnologyID, RegionID, u32), Rc<PlantSpec>>;

/// Operating parameters for plants of a given technology, region and year
#[derive(PartialEq, Debug, Clone)]
pub struct PlantSpec {
    /// Expected lifetime in years
    pub lifetime: u32,
    /// Fraction of nameplate capacity realised as production
    pub capacity_factor: Dimensionless,
    /// Yearly consumption of capped materials
    pub usage: MaterialUsage,
}

/// Whether a plant is past its minimum decommissioning age
#[derive(
    PartialEq, Eq, Clone, Copy, Debug, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum PlantStatus {
    /// Younger than the minimum decommissioning age
    #[string = "new"]
    New,
    /// At or past the minimum decommissioning age
    #[string = "old"]
    Old,
}

/// Check that a capacity is valid for a plant
pub fn check_capacity_valid_for_plant(capacity: Capacity) -> Result<()> {
    ensure!(
        capacity.is_finite() && capacity > Capacity(0.0),
        "Capacity must be a finite, positive number"
    );
    Ok(())
}

/// A single production unit.
///
/// Plants are never mutated after construction: retrofitting replaces a plant with a new one.
#[derive(Debug, PartialEq)]
pub struct Plant {
    /// Unique identifier
    pub id: PlantID,
    /// The chemical this plant was built to produce
    pub chemical_id: ChemicalID,
    /// The technology in use
    pub technology: Rc<Technology>,
    /// The technology this plant was retrofitted from (`None` for greenfield plants)
    pub origin: Option<TechnologyID>,
    /// The region the plant is located in
    pub region_id: RegionID,
    /// The year the plant started operating
    pub start_year: u32,
    /// Expected lifetime in years
    pub lifetime: u32,
    /// Fraction of nameplate capacity realised as production
    pub capacity_factor: Dimensionless,
    /// Yearly consumption of capped materials
    pub usage: MaterialUsage,
    capacities: Rc<ChemicalCapacityMap>,
}

impl Plant {
    /// Create a new [`Plant`].
    ///
    /// The plant's chemical is the technology's primary chemical, which must have a positive
    /// capacity.
    pub fn new(
        id: PlantID,
        technology: Rc<Technology>,
        origin: Option<TechnologyID>,
        region_id: RegionID,
        start_year: u32,
        spec: &PlantSpec,
        capacities: Rc<ChemicalCapacityMap>,
    ) -> Result<Self> {
        let chemical_id = technology.primary_chemical.clone();
        let capacity = capacities
            .get(&chemical_id)
            .copied()
            .unwrap_or_default();
        check_capacity_valid_for_plant(capacity)?;

        Ok(Self {
            id,
            chemical_id,
            technology,
            origin,
            region_id,
            start_year,
            lifetime: spec.lifetime,
            capacity_factor: spec.capacity_factor,
            usage: spec.usage.clone(),
            capacities,
        })
    }

    /// The technology's ID
    pub fn technology_id(&self) -> &TechnologyID {
        &self.technology.id
    }

    /// The maturity tier of the plant's technology
    pub fn tier(&self) -> TechnologyTier {
        self.technology.tier
    }

    /// The grade of methanol this plant supplies, if any
    pub fn methanol_supply(&self) -> Option<MethanolType> {
        self.technology.methanol_supply
    }

    /// Nameplate capacity for the given chemical (zero if the plant doesn't produce it)
    pub fn capacity(&self, chemical_id: &ChemicalID) -> Capacity {
        self.capacities
            .get(chemical_id)
            .copied()
            .unwrap_or_default()
    }

    /// Production volume of the given chemical each year
    pub fn yearly_volume(&self, chemical_id: &ChemicalID) -> Volume {
        self.capacity(chemical_id).at_factor(self.capacity_factor)
    }

    /// Iterate over every chemical with a nonzero capacity, primary chemical first
    pub fn chemicals(&self) -> impl Iterator<Item = (&ChemicalID, Capacity)> {
        let primary = self
            .capacities
            .get_key_value(&self.chemical_id)
            .map(|(id, cap)| (id, *cap));
        primary.into_iter().chain(self.byproducts())
    }

    /// Iterate over byproduct chemicals with a nonzero capacity
    pub fn byproducts(&self) -> impl Iterator<Item = (&ChemicalID, Capacity)> {
        self.capacities
            .iter()
            .filter(|(id, cap)| **id != self.chemical_id && **cap > Capacity(0.0))
            .map(|(id, cap)| (id, *cap))
    }

    /// Whether the plant produces the given chemical (as primary product or byproduct)
    pub fn produces(&self, chemical_id: &ChemicalID) -> bool {
        self.capacity(chemical_id) > Capacity(0.0)
    }

    /// Age of the plant in the given year
    pub fn age(&self, year: u32) -> u32 {
        year.saturating_sub(self.start_year)
    }

    /// Lifecycle status of the plant in the given year
    pub fn status(&self, year: u32, minimum_age: u32) -> PlantStatus {
        if self.age(year) >= minimum_age {
            PlantStatus::Old
        } else {
            PlantStatus::New
        }
    }
}

/// Additional methods for iterating over plants
pub trait PlantIterator<'a>: Iterator<Item = &'a Rc<Plant>> + Sized
where
    Self: 'a,
{
    /// Filter plants by region
    fn filter_region(self, region_id: &'a RegionID) -> impl Iterator<Item = &'a Rc<Plant>> + 'a {
        self.filter(move |plant| plant.region_id == *region_id)
    }

    /// Filter plants by technology
    fn filter_technology(
        self,
        technology_id: &'a TechnologyID,
    ) -> impl Iterator<Item = &'a Rc<Plant>> + 'a {
        self.filter(move |plant| plant.technology_id() == technology_id)
    }

    /// Filter plants producing the given chemical, either as primary product or byproduct
    fn filter_producers_of(
        self,
        chemical_id: &'a ChemicalID,
    ) -> impl Iterator<Item = &'a Rc<Plant>> + 'a {
        self.filter(move |plant| plant.produces(chemical_id))
    }

    /// Filter plants supplying the given methanol grade
    fn filter_methanol_supply(
        self,
        methanol_type: MethanolType,
    ) -> impl Iterator<Item = &'a Rc<Plant>> + 'a {
        self.filter(move |plant| plant.methanol_supply() == Some(methanol_type))
    }
}

impl<'a, I> PlantIterator<'a> for I where I: Iterator<Item = &'a Rc<Plant>> + Sized + 'a {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, cracker, cracker_capacities, plant_spec};
    use rstest::rstest;

    #[rstest]
    fn test_plant_capacity_and_volume(
        cracker: Technology,
        cracker_capacities: ChemicalCapacityMap,
        plant_spec: PlantSpec,
    ) {
        let plant = Plant::new(
            PlantID(0),
            cracker.into(),
            None,
            "Europe".into(),
            2010,
            &plant_spec,
            cracker_capacities.into(),
        )
        .unwrap();

        assert_eq!(plant.chemical_id, "Ethylene".into());
        assert_eq!(plant.capacity(&"Ethylene".into()), Capacity(1.0));
        assert_eq!(plant.capacity(&"Ammonia".into()), Capacity(0.0));
        assert_eq!(plant.yearly_volume(&"Propylene".into()), Volume(0.25));
        assert!(plant.origin.is_none());
        let chemicals: Vec<_> = plant.chemicals().map(|(id, _)| id.clone()).collect();
        assert_eq!(chemicals, ["Ethylene".into(), "Propylene".into()]);
    }

    #[rstest]
    #[case(2015, 5, PlantStatus::New)]
    #[case(2030, 20, PlantStatus::Old)]
    #[case(2031, 21, PlantStatus::Old)]
    #[case(2000, 0, PlantStatus::New)]
    fn test_plant_age_and_status(
        cracker: Technology,
        cracker_capacities: ChemicalCapacityMap,
        plant_spec: PlantSpec,
        #[case] year: u32,
        #[case] age: u32,
        #[case] status: PlantStatus,
    ) {
        let plant = Plant::new(
            PlantID(0),
            cracker.into(),
            None,
            "Europe".into(),
            2010,
            &plant_spec,
            cracker_capacities.into(),
        )
        .unwrap();
        assert_eq!(plant.age(year), age);
        assert_eq!(plant.status(year, 20), status);
    }

    #[rstest]
    fn test_plant_new_without_primary_capacity(cracker: Technology, plant_spec: PlantSpec) {
        let capacities = ChemicalCapacityMap::from([("Propylene".into(), Capacity(1.0))]);
        assert_error!(
            Plant::new(
                PlantID(0),
                cracker.into(),
                None,
                "Europe".into(),
                2010,
                &plant_spec,
                capacities.into(),
            ),
            "Capacity must be a finite, positive number"
        );
    }
}
