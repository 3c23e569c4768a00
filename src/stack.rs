//! A stack is the fleet of plants in existence in a single year.
use crate::chemical::{ChemicalID, MethanolType};
use crate::plant::{Plant, PlantID, PlantIterator, PlantStatus};
use crate::region::RegionID;
use crate::technology::TechnologyID;
use crate::units::{Capacity, Dimensionless, Volume};
use anyhow::{Context, Result, ensure};
use indexmap::{IndexMap, IndexSet};
use itertools::Either;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

/// Index key for plants producing a chemical with a technology in a region
type GroupKey = (ChemicalID, TechnologyID, RegionID);

/// A query over the plants in a stack.
///
/// Unset fields match any plant. A chemical matches plants producing it either as primary
/// product or as a byproduct.
#[derive(Default, Clone, Copy, Debug)]
pub struct PlantFilter<'a> {
    region_id: Option<&'a RegionID>,
    technology_id: Option<&'a TechnologyID>,
    chemical_id: Option<&'a ChemicalID>,
    methanol_type: Option<MethanolType>,
}

impl<'a> PlantFilter<'a> {
    /// A filter matching every plant
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a region
    pub fn region(mut self, region_id: &'a RegionID) -> Self {
        self.region_id = Some(region_id);
        self
    }

    /// Restrict to a technology
    pub fn technology(mut self, technology_id: &'a TechnologyID) -> Self {
        self.technology_id = Some(technology_id);
        self
    }

    /// Restrict to producers of a chemical
    pub fn chemical(mut self, chemical_id: &'a ChemicalID) -> Self {
        self.chemical_id = Some(chemical_id);
        self
    }

    /// Restrict to suppliers of a methanol grade
    pub fn methanol_type(mut self, methanol_type: MethanolType) -> Self {
        self.methanol_type = Some(methanol_type);
        self
    }

    fn matches(&self, plant: &Plant) -> bool {
        self.region_id.is_none_or(|id| plant.region_id == *id)
            && self.technology_id.is_none_or(|id| plant.technology_id() == id)
            && self.chemical_id.is_none_or(|id| plant.produces(id))
            && self
                .methanol_type
                .is_none_or(|t| plant.methanol_supply() == Some(t))
    }
}

/// A plant's contribution towards one of the chemicals it produces
#[derive(Debug)]
pub struct StackRow<'a> {
    /// The plant
    pub plant: &'a Rc<Plant>,
    /// The chemical produced (primary product or byproduct)
    pub chemical_id: &'a ChemicalID,
    /// Nameplate capacity for `chemical_id`
    pub capacity: Capacity,
    /// Whether the plant was added to the stack this year
    pub is_new: bool,
}

impl StackRow<'_> {
    /// Production volume for the row's chemical
    pub fn yearly_volume(&self) -> Volume {
        self.capacity.at_factor(self.plant.capacity_factor)
    }
}

/// Aggregated figures for a group of stack rows
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StackAggregate {
    /// Total nameplate capacity
    pub capacity: Capacity,
    /// Total production volume
    pub yearly_volume: Volume,
    /// Number of plants
    pub number_of_plants: u32,
    /// Number of plants added this year
    pub number_of_new_plants: u32,
}

/// The collection of plants in existence in one year
#[derive(Debug, Default, Clone)]
pub struct PlantStack {
    plants: IndexMap<PlantID, Rc<Plant>>,
    new_ids: IndexSet<PlantID>,
    groups: HashMap<GroupKey, IndexSet<PlantID>>,
}

impl PlantStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stack from pre-existing plants (none are marked as new this year)
    pub fn from_plants<I>(plants: I) -> Result<Self>
    where
        I: IntoIterator<Item = Rc<Plant>>,
    {
        let mut stack = Self::new();
        for plant in plants {
            stack.insert(plant)?;
        }

        Ok(stack)
    }

    /// A copy of this stack to start the following year from.
    ///
    /// The set of plants added this year is cleared.
    pub fn copy_forward(&self) -> Self {
        Self {
            plants: self.plants.clone(),
            new_ids: IndexSet::new(),
            groups: self.groups.clone(),
        }
    }

    fn insert(&mut self, plant: Rc<Plant>) -> Result<()> {
        ensure!(
            !self.plants.contains_key(&plant.id),
            "Plant {} is already in the stack",
            plant.id
        );
        self.index(plant);

        Ok(())
    }

    /// Add a plant known not to be in the stack yet
    fn index(&mut self, plant: Rc<Plant>) {
        for (chemical_id, _) in plant.chemicals() {
            let key = (
                chemical_id.clone(),
                plant.technology_id().clone(),
                plant.region_id.clone(),
            );
            self.groups.entry(key).or_default().insert(plant.id);
        }
        self.plants.insert(plant.id, plant);
    }

    /// Add a newly built plant to the stack, recording it as new this year
    pub fn add(&mut self, plant: Rc<Plant>) -> Result<()> {
        let id = plant.id;
        self.insert(plant)?;
        self.new_ids.insert(id);

        Ok(())
    }

    /// Remove a plant from the stack.
    ///
    /// It is an error if the plant is not present, as this means the stack is out of sync with
    /// the rest of the simulation state.
    pub fn remove(&mut self, id: PlantID) -> Result<Rc<Plant>> {
        let plant = self
            .plants
            .swap_remove(&id)
            .with_context(|| format!("Inconsistent stack: plant {id} is not present"))?;

        for (chemical_id, _) in plant.chemicals() {
            let key = (
                chemical_id.clone(),
                plant.technology_id().clone(),
                plant.region_id.clone(),
            );
            if let Some(group) = self.groups.get_mut(&key) {
                group.swap_remove(&id);
                if group.is_empty() {
                    self.groups.remove(&key);
                }
            }
        }
        self.new_ids.swap_remove(&id);

        Ok(plant)
    }

    /// Get a plant by ID
    pub fn get(&self, id: PlantID) -> Option<&Rc<Plant>> {
        self.plants.get(&id)
    }

    /// Whether the plant is in the stack
    pub fn contains(&self, id: PlantID) -> bool {
        self.plants.contains_key(&id)
    }

    /// The number of plants in the stack
    pub fn len(&self) -> usize {
        self.plants.len()
    }

    /// Whether the stack has no plants
    pub fn is_empty(&self) -> bool {
        self.plants.is_empty()
    }

    /// Iterate over the plants in the stack
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Plant>> {
        self.plants.values()
    }

    /// Whether the plant was added to the stack this year
    pub fn is_new(&self, id: PlantID) -> bool {
        self.new_ids.contains(&id)
    }

    /// Iterate over plants added this year
    pub fn new_this_year(&self) -> impl Iterator<Item = &Rc<Plant>> {
        self.new_ids.iter().map(|id| &self.plants[id])
    }

    /// Iterate over plants producing `chemical_id` with a technology in a region
    pub fn group<'a>(
        &'a self,
        chemical_id: &ChemicalID,
        technology_id: &TechnologyID,
        region_id: &RegionID,
    ) -> impl Iterator<Item = &'a Rc<Plant>> + use<'a> {
        let key = (chemical_id.clone(), technology_id.clone(), region_id.clone());
        self.groups
            .get(&key)
            .into_iter()
            .flatten()
            .map(|id| &self.plants[id])
    }

    /// Iterate over the plants matching a filter.
    ///
    /// Uses the group index when chemical, technology and region are all given.
    pub fn filter<'a>(&'a self, filter: PlantFilter<'a>) -> impl Iterator<Item = &'a Rc<Plant>> {
        match (filter.chemical_id, filter.technology_id, filter.region_id) {
            (Some(chemical_id), Some(technology_id), Some(region_id)) => Either::Left(
                self.group(chemical_id, technology_id, region_id)
                    .filter(move |plant| filter.matches(plant)),
            ),
            _ => Either::Right(self.iter().filter(move |plant| filter.matches(plant))),
        }
    }

    /// Iterate over plants whose designated chemical is `chemical_id`
    pub fn primary_producers_of<'a>(
        &'a self,
        chemical_id: &'a ChemicalID,
    ) -> impl Iterator<Item = &'a Rc<Plant>> {
        self.iter()
            .filter(move |plant| plant.chemical_id == *chemical_id)
    }

    /// Iterate over one row per (plant, produced chemical)
    pub fn rows(&self) -> impl Iterator<Item = StackRow<'_>> {
        self.iter().flat_map(move |plant| {
            let is_new = self.is_new(plant.id);
            plant.chemicals().map(move |(chemical_id, capacity)| StackRow {
                plant,
                chemical_id,
                capacity,
                is_new,
            })
        })
    }

    /// Aggregate byproduct-exploded rows by an arbitrary key.
    ///
    /// Rows for which `key_fn` returns `None` are skipped.
    pub fn aggregate<K, F>(&self, key_fn: F) -> IndexMap<K, StackAggregate>
    where
        K: Hash + Eq,
        F: Fn(&StackRow) -> Option<K>,
    {
        let mut map: IndexMap<K, StackAggregate> = IndexMap::new();
        for row in self.rows() {
            let Some(key) = key_fn(&row) else {
                continue;
            };
            let entry = map.entry(key).or_default();
            entry.capacity += row.capacity;
            entry.yearly_volume += row.yearly_volume();
            entry.number_of_plants += 1;
            if row.is_new {
                entry.number_of_new_plants += 1;
            }
        }

        map
    }

    /// Total capacity for a chemical among plants matching the filter
    pub fn capacity(&self, chemical_id: &ChemicalID, filter: PlantFilter) -> Capacity {
        self.filter(filter.chemical(chemical_id))
            .map(|plant| plant.capacity(chemical_id))
            .sum()
    }

    /// Total yearly production of a chemical among plants matching the filter
    pub fn yearly_volume(&self, chemical_id: &ChemicalID, filter: PlantFilter) -> Volume {
        self.filter(filter.chemical(chemical_id))
            .map(|plant| plant.yearly_volume(chemical_id))
            .sum()
    }

    /// Number of plants producing a chemical among plants matching the filter
    pub fn number_of_plants(&self, chemical_id: &ChemicalID, filter: PlantFilter) -> usize {
        self.filter(filter.chemical(chemical_id)).count()
    }

    /// The share of a chemical's capacity held by each region
    pub fn regional_shares(&self, chemical_id: &ChemicalID) -> IndexMap<RegionID, Dimensionless> {
        let by_region = self.aggregate(|row| {
            (row.chemical_id == chemical_id).then(|| row.plant.region_id.clone())
        });
        let total: Capacity = by_region.values().map(|agg| agg.capacity).sum();
        by_region
            .into_iter()
            .map(|(region_id, agg)| (region_id, agg.capacity / total))
            .collect()
    }

    /// A stack containing only the plants matching a predicate
    pub fn sub_stack<F>(&self, predicate: F) -> PlantStack
    where
        F: Fn(&Plant) -> bool,
    {
        let mut stack = PlantStack::new();
        for plant in self.iter().filter(|plant| predicate(plant)) {
            stack.index(Rc::clone(plant));
            if self.is_new(plant.id) {
                stack.new_ids.insert(plant.id);
            }
        }

        stack
    }

    /// Plants at or past the minimum decommissioning age
    pub fn old_plants(&self, year: u32, minimum_age: u32) -> PlantStack {
        self.sub_stack(|plant| plant.status(year, minimum_age) == PlantStatus::Old)
    }

    /// Plants younger than the minimum decommissioning age
    pub fn new_plants(&self, year: u32, minimum_age: u32) -> PlantStack {
        self.sub_stack(|plant| plant.status(year, minimum_age) == PlantStatus::New)
    }

    /// Plants using a single technology
    pub fn technology_stack(&self, technology_id: &TechnologyID) -> PlantStack {
        self.sub_stack(|plant| plant.technology_id() == technology_id)
    }

    /// The distinct (technology, region) combinations among producers of a chemical
    pub fn unique_technologies(
        &self,
        chemical_id: &ChemicalID,
    ) -> IndexSet<(TechnologyID, RegionID)> {
        self.iter()
            .filter_producers_of(chemical_id)
            .map(|plant| (plant.technology_id().clone(), plant.region_id.clone()))
            .collect()
    }

    /// Unabated fossil plants built for the given chemical
    pub fn unabated_fossil_plants(&self, chemical_id: &ChemicalID) -> Vec<Rc<Plant>> {
        self.primary_producers_of(chemical_id)
            .filter(|plant| plant.technology.unabated_fossil)
            .cloned()
            .collect()
    }

    /// The oldest plant built for `chemical_id` in a (technology, region) group which satisfies
    /// a predicate.
    ///
    /// Ties on start year are broken by plant ID.
    pub fn oldest_in_group<F>(
        &self,
        chemical_id: &ChemicalID,
        technology_id: &TechnologyID,
        region_id: &RegionID,
        predicate: F,
    ) -> Option<&Rc<Plant>>
    where
        F: Fn(&Plant) -> bool,
    {
        self.group(chemical_id, technology_id, region_id)
            .filter(|plant| plant.chemical_id == *chemical_id && predicate(plant))
            .min_by_key(|plant| (plant.start_year, plant.id))
    }
}
