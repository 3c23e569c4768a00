//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::chemical::ChemicalID;
use crate::input::{deserialise_proportion_nonzero, input_err_msg, read_toml};
use crate::region::RegionID;
use crate::scenario::{Pathway, Sensitivity};
use crate::technology::TechnologyID;
use crate::units::{Dimensionless, Volume};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use log::warn;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_sensitivities, Vec<Sensitivity>, vec![Sensitivity::Default]);
define_param_default!(default_seed, u64, 100);
define_unit_param_default!(default_retrofit_cap, Dimensionless, 0.05);
define_unit_param_default!(default_max_tech_ramp_rate, Dimensionless, 1.3);
define_param_default!(default_ramp_up_allowance, u32, 120);
define_unit_param_default!(default_regional_cap, Dimensionless, 0.3);
define_param_default!(default_number_of_bins, u32, 300);
define_param_default!(default_initial_tech_allowed_until_year, u32, 2025);
define_param_default!(default_strict_no_fossil_from_year, u32, 2025);
define_param_default!(default_no_fossil_from_year, u32, 2030);
define_param_default!(default_second_retrofit_earliest_year, u32, 2040);
define_param_default!(default_minimum_age_decommission, u32, 20);
define_unit_param_default!(default_typical_plant_capacity, Volume, 0.0365);
define_unit_param_default!(default_methanol_availability_factor, Dimensionless, 1.5);

/// Whether plants are optimised as one global fleet or region by region
#[derive(DeserializeLabeledStringEnum, Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum ModelScope {
    /// A single global fleet, subject to regional share caps
    #[default]
    #[string = "world"]
    World,
    /// Regions are treated independently
    #[string = "regional"]
    Regional,
}

/// A technology which may not be built in a region
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct BuildExclusion {
    /// The excluded technology
    pub technology: TechnologyID,
    /// The region it may not be built in
    pub region: RegionID,
}

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// The first simulated year
    pub start_year: u32,
    /// The year the simulation ends (the stack is produced up to and including this year)
    pub end_year: u32,
    /// The chemicals to simulate
    pub chemicals: Vec<ChemicalID>,
    /// The pathways to run
    pub pathways: Vec<Pathway>,
    /// The sensitivities to run for each pathway
    #[serde(default = "default_sensitivities")]
    pub sensitivities: Vec<Sensitivity>,
    /// Whether to model a global fleet or independent regions
    #[serde(default)]
    pub scope: ModelScope,
    /// Base seed for the random number generators used to break ties
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Share of a chemical's production which may be retrofitted each year
    #[serde(default = "default_retrofit_cap")]
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub retrofit_cap: Dimensionless,
    /// The maximum year-on-year growth ratio of a technology's capacity
    #[serde(default = "default_max_tech_ramp_rate")]
    pub max_tech_ramp_rate: Dimensionless,
    /// Growth in plant numbers which is always permitted, whatever the ramp rate
    #[serde(default = "default_ramp_up_allowance")]
    pub ramp_up_allowance: u32,
    /// The maximum share of a chemical's capacity that any one region may hold
    #[serde(default = "default_regional_cap")]
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub regional_cap: Dimensionless,
    /// The number of histogram bins used to group costs and emissions when ranking
    #[serde(default = "default_number_of_bins")]
    pub number_of_bins: u32,
    /// The last year in which new builds are not ranked by technology tier
    #[serde(default = "default_initial_tech_allowed_until_year")]
    pub initial_tech_allowed_until_year: u32,
    /// The year from which fossil technologies are excluded for the `nfs` pathway
    #[serde(default = "default_strict_no_fossil_from_year")]
    pub strict_no_fossil_from_year: u32,
    /// The year from which fossil technologies are excluded for the `nf` pathway
    #[serde(default = "default_no_fossil_from_year")]
    pub no_fossil_from_year: u32,
    /// The year from which transition-tier plants may themselves be retrofitted
    #[serde(default = "default_second_retrofit_earliest_year")]
    pub second_retrofit_earliest_year: u32,
    /// The minimum age at which a plant counts as old
    #[serde(default = "default_minimum_age_decommission")]
    pub minimum_age_decommission: u32,
    /// The year from which forced decommission rates apply, per pathway
    #[serde(default)]
    pub forced_decommission_start_year: HashMap<Pathway, u32>,
    /// The yearly production of a typical plant
    #[serde(default = "default_typical_plant_capacity")]
    pub typical_plant_capacity: Volume,
    /// Chemicals for which only old plants may be decommissioned to meet demand
    #[serde(default)]
    pub age_dependent_chemicals: Vec<ChemicalID>,
    /// The chemical produced by methanol-supplying technologies
    #[serde(default)]
    pub methanol_chemical: Option<ChemicalID>,
    /// Chemicals whose rankings depend on the methanol supply mix
    #[serde(default)]
    pub methanol_dependent_chemicals: Vec<ChemicalID>,
    /// Methanol availability as a multiple of methanol production
    #[serde(default = "default_methanol_availability_factor")]
    pub methanol_availability_factor: Dimensionless,
    /// Technologies which may not be built in particular regions
    #[serde(default)]
    pub build_exclusions: Vec<BuildExclusion>,
}

/// Check that the simulated horizon is valid
fn check_years(start_year: u32, end_year: u32) -> Result<()> {
    ensure!(
        start_year < end_year,
        "start_year must be earlier than end_year"
    );

    Ok(())
}

/// Check that the `chemicals` parameter is valid
fn check_chemicals(chemicals: &[ChemicalID]) -> Result<()> {
    ensure!(!chemicals.is_empty(), "`chemicals` is empty");
    ensure!(
        chemicals.iter().all_unique(),
        "`chemicals` must not contain duplicates"
    );

    Ok(())
}

/// Check that the pathways and sensitivities to run are valid
fn check_scenarios(pathways: &[Pathway], sensitivities: &[Sensitivity]) -> Result<()> {
    ensure!(!pathways.is_empty(), "`pathways` is empty");
    ensure!(
        pathways.iter().all_unique(),
        "`pathways` must not contain duplicates"
    );
    ensure!(!sensitivities.is_empty(), "`sensitivities` is empty");
    ensure!(
        sensitivities.iter().all_unique(),
        "`sensitivities` must not contain duplicates"
    );

    Ok(())
}

/// Check that the `max_tech_ramp_rate` parameter is valid
fn check_max_tech_ramp_rate(value: Dimensionless) -> Result<()> {
    ensure!(
        value.is_finite() && value >= Dimensionless(1.0),
        "max_tech_ramp_rate must be a finite number of at least one"
    );

    Ok(())
}

/// Check that the `number_of_bins` parameter is valid
fn check_number_of_bins(value: u32) -> Result<()> {
    ensure!(value > 0, "number_of_bins cannot be zero");

    Ok(())
}

/// Check that a positive quantity parameter is valid
fn check_positive(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "{name} must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that the methanol-related chemicals are among those simulated
fn check_methanol_chemicals(
    chemicals: &[ChemicalID],
    methanol_chemical: Option<&ChemicalID>,
    dependent: &[ChemicalID],
) -> Result<()> {
    for chemical_id in methanol_chemical.into_iter().chain(dependent) {
        ensure!(
            chemicals.contains(chemical_id),
            "Methanol chemical {chemical_id} is not in `chemicals`"
        );
    }

    if !dependent.is_empty() {
        ensure!(
            methanol_chemical.is_some(),
            "`methanol_dependent_chemicals` given without `methanol_chemical`"
        );
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Every year for which a stack is produced
    pub fn years(&self) -> RangeInclusive<u32> {
        self.start_year..=self.end_year
    }

    /// Whether only old plants of the chemical may be decommissioned to meet demand
    pub fn is_age_dependent(&self, chemical_id: &ChemicalID) -> bool {
        self.age_dependent_chemicals.contains(chemical_id)
    }

    /// Whether the chemical is the methanol chemical
    pub fn is_methanol(&self, chemical_id: &ChemicalID) -> bool {
        self.methanol_chemical.as_ref() == Some(chemical_id)
    }

    /// The year from which forced decommission rates apply for a pathway (`None` = never)
    pub fn forced_decommission_start(&self, pathway: Pathway) -> Option<u32> {
        self.forced_decommission_start_year.get(&pathway).copied()
    }

    /// Whether building the technology in the region is excluded
    pub fn is_build_excluded(&self, technology_id: &TechnologyID, region_id: &RegionID) -> bool {
        self.build_exclusions
            .iter()
            .any(|exclusion| {
                exclusion.technology == *technology_id && exclusion.region == *region_id
            })
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_years(self.start_year, self.end_year)?;
        check_chemicals(&self.chemicals)?;
        check_scenarios(&self.pathways, &self.sensitivities)?;

        // retrofit_cap and regional_cap already validated with deserialise_proportion_nonzero

        check_max_tech_ramp_rate(self.max_tech_ramp_rate)?;
        check_number_of_bins(self.number_of_bins)?;
        check_positive(
            "typical_plant_capacity",
            self.typical_plant_capacity.value(),
        )?;
        check_positive(
            "methanol_availability_factor",
            self.methanol_availability_factor.value(),
        )?;
        check_methanol_chemicals(
            &self.chemicals,
            self.methanol_chemical.as_ref(),
            &self.methanol_dependent_chemicals,
        )?;

        for chemical_id in &self.age_dependent_chemicals {
            if !self.chemicals.contains(chemical_id) {
                warn!("Age-dependent chemical {chemical_id} is not simulated and will be ignored");
            }
        }

        Ok(())
    }
}
