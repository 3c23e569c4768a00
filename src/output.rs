//! The module responsible for writing output data to disk.
use crate::chemical::{ChemicalID, Material};
use crate::ledger::{AvailabilityLedger, LedgerEntry};
use crate::plant::{PlantID, PlantStatus};
use crate::ranking::{RankPurpose, RankingTables, RetrofitKind};
use crate::region::RegionID;
use crate::scenario::Scenario;
use crate::simulation::ScenarioOutcome;
use crate::stack::PlantStack;
use crate::technology::{TechnologyID, TechnologyTier};
use crate::transition::{TransitionRecord, TransitionRegistry, TransitionType};
use crate::units::{Capacity, EmissionsPerTonne, Megatonnes, MoneyPerTonne, Volume};
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "chemwedge_results";

/// The output file name for the aggregated plant stack
const STACK_FILE_NAME: &str = "stack.csv";

/// The output file name for the transition registry
const TRANSITIONS_FILE_NAME: &str = "transitions.csv";

/// The output file name for material availability
const AVAILABILITY_FILE_NAME: &str = "availability.csv";

/// The output file name for individual plants
const PLANTS_FILE_NAME: &str = "debug_plants.csv";

/// The output file name for ranking tables
const RANKINGS_FILE_NAME: &str = "debug_rankings.csv";

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model, optionally overwriting existing data.
///
/// # Returns
///
/// `true` if an existing non-empty directory was overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    // If the folder already exists, then delete it
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass the \
            --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir).context("Could not delete folder")?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Create the subfolder of `output_path` holding one scenario's results
pub fn create_scenario_output_directory(
    output_path: &Path,
    scenario: &Scenario,
) -> Result<PathBuf> {
    let scenario_dir = output_path.join(scenario.to_string());
    fs::create_dir_all(&scenario_dir).with_context(|| {
        format!("Could not create output folder {}", scenario_dir.display())
    })?;

    Ok(scenario_dir)
}

/// Represents a row of the stack output file: plants aggregated by technology and region
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct StackRow {
    year: u32,
    chemical_id: ChemicalID,
    technology_id: TechnologyID,
    region_id: RegionID,
    capacity: Capacity,
    yearly_volume: Volume,
    number_of_plants: u32,
    number_of_new_plants: u32,
}

/// Represents a row of the transitions output file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TransitionRow {
    year: u32,
    transition_type: TransitionType,
    chemical_id: ChemicalID,
    region_id: RegionID,
    origin_technology_id: Option<TechnologyID>,
    origin_tier: Option<TechnologyTier>,
    destination_technology_id: Option<TechnologyID>,
    destination_tier: Option<TechnologyTier>,
}

impl From<&TransitionRecord> for TransitionRow {
    fn from(record: &TransitionRecord) -> Self {
        Self {
            year: record.year,
            transition_type: record.transition_type,
            chemical_id: record.chemical_id.clone(),
            region_id: record.region_id.clone(),
            origin_technology_id: record.origin_technology.clone(),
            origin_tier: record.origin_tier,
            destination_technology_id: record.destination_technology.clone(),
            destination_tier: record.destination_tier,
        }
    }
}

/// Represents a row of the availability output file.
///
/// Rows without a chemical are scope totals.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct AvailabilityRow {
    year: u32,
    material: Material,
    scope: String,
    chemical_id: Option<ChemicalID>,
    cap: Option<Megatonnes>,
    used: Megatonnes,
    remaining: Option<Megatonnes>,
}

impl AvailabilityRow {
    /// One row for the scope total, followed by one for each chemical's share
    fn rows_for_entry(
        year: u32,
        material: Material,
        scope: String,
        entry: &LedgerEntry,
    ) -> Vec<Self> {
        let mut rows = vec![Self {
            year,
            material,
            scope: scope.clone(),
            chemical_id: None,
            cap: entry.cap,
            used: entry.used,
            remaining: entry.remaining(),
        }];

        for (chemical_id, share) in &entry.chemicals {
            rows.push(Self {
                year,
                material,
                scope: scope.clone(),
                chemical_id: Some(chemical_id.clone()),
                cap: share.cap,
                used: share.used,
                remaining: entry.headroom(chemical_id),
            });
        }

        rows
    }
}

/// Represents a row of the debug plants output file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PlantRow {
    year: u32,
    plant_id: PlantID,
    chemical_id: ChemicalID,
    technology_id: TechnologyID,
    origin_technology_id: Option<TechnologyID>,
    region_id: RegionID,
    start_year: u32,
    status: PlantStatus,
    capacity: Capacity,
    yearly_volume: Volume,
    is_new: bool,
}

/// Represents a row of the debug rankings output file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct RankingRow {
    year: u32,
    purpose: RankPurpose,
    chemical_id: ChemicalID,
    rank: u32,
    origin_technology_id: Option<TechnologyID>,
    destination_technology_id: TechnologyID,
    region_id: RegionID,
    kind: RetrofitKind,
    lcox: MoneyPerTonne,
    emissions_scope_1_2: EmissionsPerTonne,
    emissions_scope_3_upstream: EmissionsPerTonne,
    emissions_scope_1_2_3_upstream: EmissionsPerTonne,
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    plants_writer: csv::Writer<File>,
    rankings_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        Ok(Self {
            plants_writer: new_writer(PLANTS_FILE_NAME)?,
            rankings_writer: new_writer(RANKINGS_FILE_NAME)?,
        })
    }

    /// Write every plant in a year's stack
    fn write_plants(&mut self, year: u32, stack: &PlantStack, minimum_age: u32) -> Result<()> {
        for row in stack.rows() {
            let plant = row.plant;
            self.plants_writer.serialize(PlantRow {
                year,
                plant_id: plant.id,
                chemical_id: row.chemical_id.clone(),
                technology_id: plant.technology_id().clone(),
                origin_technology_id: plant.origin.clone(),
                region_id: plant.region_id.clone(),
                start_year: plant.start_year,
                status: plant.status(year, minimum_age),
                capacity: row.capacity,
                yearly_volume: row.yearly_volume(),
                is_new: row.is_new,
            })?;
        }

        Ok(())
    }

    /// Write every ranking table
    fn write_rankings(&mut self, rankings: &RankingTables) -> Result<()> {
        for (purpose, chemical_id, year, table) in rankings.iter() {
            for ranked in table {
                let candidate = &ranked.candidate;
                self.rankings_writer.serialize(RankingRow {
                    year,
                    purpose,
                    chemical_id: chemical_id.clone(),
                    rank: ranked.rank,
                    origin_technology_id: candidate.origin.clone(),
                    destination_technology_id: candidate.destination.clone(),
                    region_id: candidate.region_id.clone(),
                    kind: candidate.kind,
                    lcox: candidate.lcox,
                    emissions_scope_1_2: candidate.emissions_scope_1_2,
                    emissions_scope_3_upstream: candidate.emissions_scope_3_upstream,
                    emissions_scope_1_2_3_upstream: candidate.emissions_scope_1_2_3_upstream,
                })?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.plants_writer.flush()?;
        self.rankings_writer.flush()?;

        Ok(())
    }
}

/// An object for writing the results of a scenario to file
pub struct DataWriter {
    stack_writer: csv::Writer<File>,
    transitions_writer: csv::Writer<File>,
    availability_writer: csv::Writer<File>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let debug_writer = if save_debug_info {
            // Create debug CSV files
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        Ok(Self {
            stack_writer: new_writer(STACK_FILE_NAME)?,
            transitions_writer: new_writer(TRANSITIONS_FILE_NAME)?,
            availability_writer: new_writer(AVAILABILITY_FILE_NAME)?,
            debug_writer,
        })
    }

    /// Write the stack for a year, aggregated by chemical, technology and region
    pub fn write_stack(&mut self, year: u32, stack: &PlantStack) -> Result<()> {
        let aggregates = stack.aggregate(|row| {
            Some((
                row.chemical_id.clone(),
                row.plant.technology_id().clone(),
                row.plant.region_id.clone(),
            ))
        });
        for ((chemical_id, technology_id, region_id), aggregate) in aggregates {
            self.stack_writer.serialize(StackRow {
                year,
                chemical_id,
                technology_id,
                region_id,
                capacity: aggregate.capacity,
                yearly_volume: aggregate.yearly_volume,
                number_of_plants: aggregate.number_of_plants,
                number_of_new_plants: aggregate.number_of_new_plants,
            })?;
        }

        Ok(())
    }

    /// Write every transition in the registry
    pub fn write_transitions(&mut self, registry: &TransitionRegistry) -> Result<()> {
        for record in registry.iter() {
            self.transitions_writer.serialize(TransitionRow::from(record))?;
        }

        Ok(())
    }

    /// Write the caps, usage and headroom of every ledger entry
    pub fn write_availability(&mut self, ledger: &AvailabilityLedger) -> Result<()> {
        for (material, scope, year, entry) in ledger.iter() {
            for row in AvailabilityRow::rows_for_entry(year, material, scope.to_string(), entry) {
                self.availability_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Write everything produced by a scenario, including debug info if requested
    pub fn write_outcome(&mut self, outcome: &ScenarioOutcome, minimum_age: u32) -> Result<()> {
        for (year, stack) in &outcome.stacks {
            self.write_stack(*year, stack)?;
            if let Some(wtr) = &mut self.debug_writer {
                wtr.write_plants(*year, stack, minimum_age)?;
            }
        }
        self.write_transitions(&outcome.registry)?;
        self.write_availability(&outcome.ledger)?;
        if let Some(wtr) = &mut self.debug_writer {
            wtr.write_rankings(&outcome.rankings)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.stack_writer.flush()?;
        self.transitions_writer.flush()?;
        self.availability_writer.flush()?;
        if let Some(wtr) = &mut self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}
