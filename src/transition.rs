//! An append-only record of the transitions made to the plant stack.
use crate::chemical::ChemicalID;
use crate::plant::Plant;
use crate::region::RegionID;
use crate::technology::{TechnologyID, TechnologyTier};
use anyhow::{Context, Result};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The kinds of change that can be made to the plant stack
#[derive(
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Debug,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum TransitionType {
    /// A new plant was built
    #[string = "new_build"]
    NewBuild,
    /// A plant was swapped for one using a different technology
    #[string = "retrofit"]
    Retrofit,
    /// A plant was removed
    #[string = "decommission"]
    Decommission,
}

/// A single executed transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRecord {
    /// The year in which the decision was made
    pub year: u32,
    /// The kind of transition
    pub transition_type: TransitionType,
    /// Region of the affected plant(s)
    pub region_id: RegionID,
    /// Chemical of the affected plant(s)
    pub chemical_id: ChemicalID,
    /// Technology of the plant removed, if any
    pub origin_technology: Option<TechnologyID>,
    /// Tier of the plant removed, if any
    pub origin_tier: Option<TechnologyTier>,
    /// Technology of the plant added, if any
    pub destination_technology: Option<TechnologyID>,
    /// Tier of the plant added, if any
    pub destination_tier: Option<TechnologyTier>,
}

/// The audit log of transitions for a scenario
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionRegistry {
    records: Vec<TransitionRecord>,
}

impl TransitionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transition.
    ///
    /// Region and chemical are taken from the origin plant if given, else from the destination.
    pub fn add(
        &mut self,
        year: u32,
        transition_type: TransitionType,
        origin: Option<&Plant>,
        destination: Option<&Plant>,
    ) -> Result<()> {
        let reference = origin
            .or(destination)
            .context("A transition needs an origin or a destination plant")?;

        self.records.push(TransitionRecord {
            year,
            transition_type,
            region_id: reference.region_id.clone(),
            chemical_id: reference.chemical_id.clone(),
            origin_technology: origin.map(|plant| plant.technology_id().clone()),
            origin_tier: origin.map(Plant::tier),
            destination_technology: destination.map(|plant| plant.technology_id().clone()),
            destination_tier: destination.map(Plant::tier),
        });

        Ok(())
    }

    /// Iterate over all records, in the order they were added
    pub fn iter(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.records.iter()
    }

    /// Iterate over the records for one year
    pub fn for_year(&self, year: u32) -> impl Iterator<Item = &TransitionRecord> {
        self.iter().filter(move |record| record.year == year)
    }

    /// The number of records of the given type in a year
    pub fn count(&self, year: u32, transition_type: TransitionType) -> usize {
        self.for_year(year)
            .filter(|record| record.transition_type == transition_type)
            .count()
    }

    /// The total number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
