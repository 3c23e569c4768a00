//! Code for reading technologies and retrofit routes from CSV files.
use super::{InputFiles, input_err_msg, read_csv, read_csv_optional};
use crate::chemical::{ChemicalID, MethanolType};
use crate::id::IDCollection;
use crate::model::ModelParameters;
use crate::technology::{RetrofitRouteMap, Technology, TechnologyID, TechnologyMap, TechnologyTier};
use anyhow::{Context, Result, ensure};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::rc::Rc;

const TECHNOLOGIES_FILE_NAME: &str = "technologies.csv";
const RETROFITS_FILE_NAME: &str = "retrofits.csv";

/// A row of the technologies file: one technology producing one chemical
#[derive(PartialEq, Debug, Deserialize)]
struct TechnologyRaw {
    technology_id: String,
    chemical_id: String,
    primary_chemical_id: String,
    tier: TechnologyTier,
    fossil: bool,
    unabated_fossil: bool,
    methanol_supply: Option<MethanolType>,
    consumes_methanol: bool,
    available_from: u32,
    available_until: u32,
}

impl TechnologyRaw {
    /// Whether the technology-level fields of two rows agree
    fn agrees_with(&self, technology: &Technology) -> bool {
        self.tier == technology.tier
            && self.fossil == technology.fossil
            && self.unabated_fossil == technology.unabated_fossil
            && self.methanol_supply == technology.methanol_supply
            && self.consumes_methanol == technology.consumes_methanol
            && *self.primary_chemical_id == *technology.primary_chemical.0
    }
}

/// Read the technologies CSV file.
///
/// # Arguments
///
/// * `files` - The model's input files
/// * `parameters` - The model parameters
///
/// # Returns
///
/// A map of technologies keyed by ID, in the order they first appear in the file.
pub fn read_technologies(
    files: &InputFiles,
    parameters: &ModelParameters,
) -> Result<TechnologyMap> {
    let file_path = files.path(TECHNOLOGIES_FILE_NAME);
    let technologies_csv = read_csv(&file_path)?;
    let chemical_ids: IndexSet<ChemicalID> = parameters.chemicals.iter().cloned().collect();
    read_technologies_from_iter(technologies_csv, &chemical_ids)
        .with_context(|| input_err_msg(&file_path))
}

fn read_technologies_from_iter<I>(
    iter: I,
    chemical_ids: &IndexSet<ChemicalID>,
) -> Result<TechnologyMap>
where
    I: Iterator<Item = TechnologyRaw>,
{
    let mut technologies: IndexMap<TechnologyID, Technology> = IndexMap::new();
    for record in iter {
        let chemical_id = chemical_ids.get_id_by_str(&record.chemical_id)?;
        let primary_chemical = chemical_ids.get_id_by_str(&record.primary_chemical_id)?;
        ensure!(
            record.available_from <= record.available_until,
            "Technology {} has available_from after available_until for {chemical_id}",
            record.technology_id
        );
        ensure!(
            !record.unabated_fossil || record.fossil,
            "Technology {} is unabated fossil but not fossil",
            record.technology_id
        );

        let technology_id = TechnologyID::from(record.technology_id.as_str());
        let technology = technologies
            .entry(technology_id.clone())
            .or_insert_with(|| Technology {
                id: technology_id.clone(),
                tier: record.tier,
                fossil: record.fossil,
                unabated_fossil: record.unabated_fossil,
                methanol_supply: record.methanol_supply,
                consumes_methanol: record.consumes_methanol,
                primary_chemical,
                availability: IndexMap::new(),
            });
        ensure!(
            record.agrees_with(technology),
            "Technology {technology_id} has inconsistent fields across its rows"
        );

        let existing = technology
            .availability
            .insert(
                chemical_id.clone(),
                record.available_from..=record.available_until,
            )
            .is_some();
        ensure!(
            !existing,
            "Technology {technology_id} is given more than once for {chemical_id}"
        );
    }

    for technology in technologies.values() {
        ensure!(
            technology.produces(&technology.primary_chemical),
            "Technology {} does not produce its primary chemical {}",
            technology.id,
            technology.primary_chemical
        );
    }

    Ok(technologies
        .into_iter()
        .map(|(id, technology)| (id, Rc::new(technology)))
        .collect())
}

/// A row of the retrofits file
#[derive(PartialEq, Debug, Deserialize)]
struct RetrofitRouteRaw {
    chemical_id: String,
    origin_technology_id: String,
    destination_technology_id: String,
}

/// Read the permitted retrofit routes.
///
/// The file is optional. If it is absent, no retrofits are possible.
pub fn read_retrofit_routes(
    files: &InputFiles,
    parameters: &ModelParameters,
    technologies: &TechnologyMap,
) -> Result<RetrofitRouteMap> {
    let file_path = files.path(RETROFITS_FILE_NAME);
    let retrofits_csv = read_csv_optional(&file_path)?;
    let chemical_ids: IndexSet<ChemicalID> = parameters.chemicals.iter().cloned().collect();
    read_retrofit_routes_from_iter(retrofits_csv, &chemical_ids, technologies)
        .with_context(|| input_err_msg(&file_path))
}

fn read_retrofit_routes_from_iter<I>(
    iter: I,
    chemical_ids: &IndexSet<ChemicalID>,
    technologies: &TechnologyMap,
) -> Result<RetrofitRouteMap>
where
    I: Iterator<Item = RetrofitRouteRaw>,
{
    let mut routes = RetrofitRouteMap::new();
    for record in iter {
        let chemical_id = chemical_ids.get_id_by_str(&record.chemical_id)?;
        let origin = technologies.get_id_by_str(&record.origin_technology_id)?;
        let destination = technologies.get_id_by_str(&record.destination_technology_id)?;
        ensure!(
            origin != destination,
            "Retrofit route from {origin} to itself for {chemical_id}"
        );
        for technology_id in [&origin, &destination] {
            ensure!(
                technologies[technology_id].produces(&chemical_id),
                "Technology {technology_id} in retrofit route does not produce {chemical_id}"
            );
        }

        let inserted = routes
            .entry(chemical_id.clone())
            .or_default()
            .insert((origin.clone(), destination.clone()));
        ensure!(
            inserted,
            "Duplicate retrofit route from {origin} to {destination} for {chemical_id}"
        );
    }

    Ok(routes)
}
