//! Common routines for handling input data.
use crate::id::{HasID, IDLike};
use crate::model::{Model, ModelParameters};
use crate::region::RegionID;
use crate::scenario::Sensitivity;
use crate::stack::PlantStack;
use crate::units::Dimensionless;
use anyhow::{Context, Result, bail, ensure};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::debug;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};

mod availability;
use availability::read_availability;
mod demand;
use demand::read_demand;
mod economics;
use economics::{read_costs, read_decommission_rates, read_emissions, read_methanol_feedstock};
mod plant;
use plant::{read_initial_stack, read_plant_capacities, read_plant_specs};
mod region;
use region::read_regions;
mod technology;
use technology::{read_retrofit_routes, read_technologies};

/// The subfolder of the model directory holding the files overridden by each sensitivity
const SENSITIVITIES_DIR_NAME: &str = "sensitivities";

/// Locates the input files for a model run.
///
/// A sensitivity may override any of the model's CSV files by providing a file with the same name
/// in `sensitivities/<label>/`.
#[derive(Debug, Clone)]
pub struct InputFiles {
    model_dir: PathBuf,
    override_dir: Option<PathBuf>,
}

impl InputFiles {
    /// Look up input files in `model_dir`, applying the overrides for `sensitivity`
    pub fn new(model_dir: &Path, sensitivity: Sensitivity) -> Self {
        let override_dir = model_dir
            .join(SENSITIVITIES_DIR_NAME)
            .join(sensitivity.to_string());
        Self {
            model_dir: model_dir.to_path_buf(),
            override_dir: override_dir.is_dir().then_some(override_dir),
        }
    }

    /// The path to the named input file
    pub fn path(&self, file_name: &str) -> PathBuf {
        if let Some(override_dir) = &self.override_dir {
            let path = override_dir.join(file_name);
            if path.is_file() {
                debug!("Using {} from {}", file_name, override_dir.display());
                return path;
            }
        }

        self.model_dir.join(file_name)
    }
}

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }
    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// The file may be empty or missing, in which case no items are returned.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    let vec = read_csv_internal(file_path)?;
    Ok(vec.into_iter())
}

fn read_csv_internal<'a, T: DeserializeOwned + 'a>(file_path: &'a Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read a proportion, checking that it is greater than zero and no more than one
pub fn deserialise_proportion_nonzero<'de, D>(deserialiser: D) -> Result<Dimensionless, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserialiser)?;
    if !(value > 0.0 && value <= 1.0) {
        Err(serde::de::Error::custom("Value must be > 0 and <= 1"))?;
    }

    Ok(Dimensionless(value))
}

/// Format an error message to include the file path
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a CSV file of items with IDs.
///
/// As this function is only ever used for top-level CSV files (i.e. the ones which actually define
/// the IDs for a given type), we use an ordered map to maintain the order in the input files.
fn read_csv_id_file<T, ID: IDLike>(file_path: &Path) -> Result<IndexMap<ID, T>>
where
    T: HasID<ID> + DeserializeOwned,
{
    let mut map = IndexMap::new();
    for record in read_csv::<T>(file_path)? {
        let id = record.get_id().clone();
        let existing = map.insert(id.clone(), record).is_some();
        ensure!(!existing, "{}: Duplicate ID found: {id}", input_err_msg(file_path));
    }

    Ok(map)
}

/// Check whether an iterator contains values that are sorted and unique
pub fn is_sorted_and_unique<T, I>(iter: I) -> bool
where
    T: PartialOrd + Clone,
    I: IntoIterator<Item = T>,
{
    iter.into_iter().tuple_windows().all(|(a, b)| a < b)
}

/// Check that every technology with a greenfield cost can actually be built.
///
/// A plant spec, plant capacities and emissions must be given for each greenfield cost entry.
fn check_greenfield_data(model: &Model) -> Result<()> {
    for (chemical_id, origin, technology_id, region_id, year) in model.costs.keys() {
        if origin.is_some() {
            continue;
        }

        model.plant_spec(technology_id, region_id, *year)?;
        ensure!(
            model
                .plant_capacities
                .contains_key(&(technology_id.clone(), region_id.clone())),
            "No plant capacities given for {technology_id} in {region_id}"
        );
        model.emissions(chemical_id, technology_id, region_id, *year)?;
    }

    Ok(())
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `sensitivity` - The sensitivity whose input overrides are applied
///
/// # Returns
///
/// The static model data and the initial plant stack, or an error.
pub fn load_model<P: AsRef<Path>>(
    model_dir: P,
    sensitivity: Sensitivity,
) -> Result<(Model, PlantStack)> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;
    let files = InputFiles::new(model_dir, sensitivity);
    let horizon = parameters.years();

    let regions = read_regions(&files)?;
    let region_ids: IndexSet<RegionID> = regions.keys().cloned().collect();
    let technologies = read_technologies(&files, &parameters)?;
    let plant_specs = read_plant_specs(&files, &technologies, &region_ids, &horizon)?;
    let plant_capacities = read_plant_capacities(&files, &technologies, &region_ids)?;
    let costs = read_costs(&files, &parameters, &technologies, &region_ids, &horizon)?;
    let emissions = read_emissions(&files, &parameters, &technologies, &region_ids, &horizon)?;
    let retrofit_routes = read_retrofit_routes(&files, &parameters, &technologies)?;
    let demand = read_demand(&files, &parameters, &horizon)?;
    let availability = read_availability(&files, &parameters, &region_ids, &horizon)?;
    let decommission_rates = read_decommission_rates(&files, &technologies, &horizon)?;
    let methanol_feedstock = read_methanol_feedstock(&files, &technologies)?;

    let model = Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        regions,
        technologies,
        plant_specs,
        plant_capacities,
        costs,
        emissions,
        retrofit_routes,
        demand,
        availability,
        decommission_rates,
        methanol_feedstock,
    };
    check_greenfield_data(&model)?;

    let initial_stack = read_initial_stack(&files, &model)?;
    Ok((model, initial_stack))
}
