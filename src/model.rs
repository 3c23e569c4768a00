//! The model represents the static input data provided by the user.
use crate::chemical::ChemicalID;
use crate::economics::{
    CostMap, DecommissionRateMap, EmissionsMap, MethanolFeedstockMap, TechnologyEmissions,
};
use crate::ledger::AvailabilityCap;
use crate::plant::{Plant, PlantCapacityMap, PlantID, PlantSpec, PlantSpecMap};
use crate::region::{RegionID, RegionMap};
use crate::technology::{RetrofitRouteMap, Technology, TechnologyID, TechnologyMap};
use crate::units::{Dimensionless, MoneyPerTonne, Volume};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

pub mod parameters;
pub use parameters::{BuildExclusion, ModelParameters, ModelScope};

/// Demand for each chemical, keyed by (chemical, year)
pub type DemandMap = HashMap<(ChemicalID, u32), Volume>;

/// Model definition
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Regions for the model
    pub regions: RegionMap,
    /// Technologies for the model
    pub technologies: TechnologyMap,
    /// Operating parameters of plants by technology, region and year
    pub plant_specs: PlantSpecMap,
    /// Capacities of plants by technology and region
    pub plant_capacities: PlantCapacityMap,
    /// Levelised costs for greenfield plants and retrofits
    pub costs: CostMap,
    /// Emissions by chemical, technology, region and year
    pub emissions: EmissionsMap,
    /// Permitted retrofit routes
    pub retrofit_routes: RetrofitRouteMap,
    /// Demand for each chemical and year
    pub demand: DemandMap,
    /// Caps on the availability of materials
    pub availability: Vec<AvailabilityCap>,
    /// Forced decommission rates
    pub decommission_rates: DecommissionRateMap,
    /// Methanol requirements of methanol-consuming technologies
    pub methanol_feedstock: MethanolFeedstockMap,
}

impl Model {
    /// Iterate over the model's regions
    pub fn iter_regions(&self) -> impl Iterator<Item = &RegionID> {
        self.regions.keys()
    }

    /// Iterate over the technologies which produce the given chemical
    pub fn technologies_producing<'a>(
        &'a self,
        chemical_id: &'a ChemicalID,
    ) -> impl Iterator<Item = &'a Rc<Technology>> {
        self.technologies
            .values()
            .filter(move |technology| technology.produces(chemical_id))
    }

    /// Get a technology by ID
    pub fn technology(&self, technology_id: &TechnologyID) -> Result<&Rc<Technology>> {
        self.technologies
            .get(technology_id)
            .with_context(|| format!("Unknown technology {technology_id}"))
    }

    /// The demand for a chemical in a year
    pub fn demand(&self, chemical_id: &ChemicalID, year: u32) -> Result<Volume> {
        self.demand
            .get(&(chemical_id.clone(), year))
            .copied()
            .with_context(|| format!("No demand given for {chemical_id} in {year}"))
    }

    /// Operating parameters for a new plant
    pub fn plant_spec(
        &self,
        technology_id: &TechnologyID,
        region_id: &RegionID,
        year: u32,
    ) -> Result<&Rc<PlantSpec>> {
        self.plant_specs
            .get(&(technology_id.clone(), region_id.clone(), year))
            .with_context(|| {
                format!("No plant spec given for {technology_id} in {region_id} in {year}")
            })
    }

    /// The levelised cost of production for a greenfield plant (`origin` is `None`) or a retrofit
    pub fn cost(
        &self,
        chemical_id: &ChemicalID,
        origin: Option<&TechnologyID>,
        destination: &TechnologyID,
        region_id: &RegionID,
        year: u32,
    ) -> Option<MoneyPerTonne> {
        let key = (
            chemical_id.clone(),
            origin.cloned(),
            destination.clone(),
            region_id.clone(),
            year,
        );
        self.costs.get(&key).copied()
    }

    /// The emissions of a technology producing a chemical
    pub fn emissions(
        &self,
        chemical_id: &ChemicalID,
        technology_id: &TechnologyID,
        region_id: &RegionID,
        year: u32,
    ) -> Result<TechnologyEmissions> {
        let key = (
            chemical_id.clone(),
            technology_id.clone(),
            region_id.clone(),
            year,
        );
        self.emissions.get(&key).copied().with_context(|| {
            format!(
                "No emissions given for {technology_id} producing {chemical_id} in {region_id} \
                in {year}"
            )
        })
    }

    /// The forced decommission rate for a technology (zero if none is given)
    pub fn decommission_rate(&self, technology_id: &TechnologyID, year: u32) -> Dimensionless {
        self.decommission_rates
            .get(&(technology_id.clone(), year))
            .copied()
            .unwrap_or_default()
    }

    /// Create a new plant using the technology's parameters for the given region and year.
    ///
    /// Plants which started operating before the simulated horizon use the parameters for the
    /// first simulated year.
    pub fn create_plant(
        &self,
        id: PlantID,
        technology_id: &TechnologyID,
        origin: Option<TechnologyID>,
        region_id: &RegionID,
        start_year: u32,
    ) -> Result<Plant> {
        let technology = self.technology(technology_id)?;
        let spec_year = start_year.max(self.parameters.start_year);
        let spec = self.plant_spec(technology_id, region_id, spec_year)?;
        let capacities = self
            .plant_capacities
            .get(&(technology_id.clone(), region_id.clone()))
            .with_context(|| {
                format!("No plant capacities given for {technology_id} in {region_id}")
            })?;

        Plant::new(
            id,
            Rc::clone(technology),
            origin,
            region_id.clone(),
            start_year,
            spec,
            Rc::clone(capacities),
        )
        .with_context(|| format!("Could not create plant for {technology_id} in {region_id}"))
    }
}
