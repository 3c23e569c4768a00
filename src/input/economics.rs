//! Code for reading costs, emissions and related technology data from CSV files.
use super::{InputFiles, input_err_msg, read_csv, read_csv_optional};
use crate::chemical::{ChemicalID, MethanolType};
use crate::economics::{
    CostMap, DecommissionRateMap, EmissionsMap, MethanolFeedstock, MethanolFeedstockMap,
    TechnologyEmissions,
};
use crate::id::IDCollection;
use crate::model::ModelParameters;
use crate::region::{RegionID, parse_region_str};
use crate::technology::{TechnologyID, TechnologyMap};
use crate::units::{Dimensionless, EmissionsPerTonne, MoneyPerTonne};
use crate::year::parse_year_str;
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use itertools::iproduct;
use serde::Deserialize;
use std::ops::RangeInclusive;

const COSTS_FILE_NAME: &str = "costs.csv";
const EMISSIONS_FILE_NAME: &str = "emissions.csv";
const DECOMMISSION_RATES_FILE_NAME: &str = "decommission_rates.csv";
const METHANOL_FEEDSTOCK_FILE_NAME: &str = "methanol_feedstock.csv";

/// Check that a technology produces the given chemical
fn check_produces(
    technologies: &TechnologyMap,
    technology_id: &TechnologyID,
    chemical_id: &ChemicalID,
) -> Result<()> {
    ensure!(
        technologies[technology_id].produces(chemical_id),
        "Technology {technology_id} does not produce {chemical_id}"
    );

    Ok(())
}

/// A row of the costs file. An empty origin denotes a greenfield plant.
#[derive(PartialEq, Debug, Deserialize)]
struct CostRaw {
    chemical_id: String,
    origin_technology_id: Option<String>,
    destination_technology_id: String,
    region_id: String,
    year: String,
    lcox: MoneyPerTonne,
}

/// Read the levelised costs CSV file.
///
/// # Arguments
///
/// * `files` - The model's input files
/// * `parameters` - The model parameters
/// * `technologies` - The model's technologies
/// * `region_ids` - All possible region IDs
/// * `horizon` - The simulated years
pub fn read_costs(
    files: &InputFiles,
    parameters: &ModelParameters,
    technologies: &TechnologyMap,
    region_ids: &IndexSet<RegionID>,
    horizon: &RangeInclusive<u32>,
) -> Result<CostMap> {
    let file_path = files.path(COSTS_FILE_NAME);
    let costs_csv = read_csv(&file_path)?;
    let chemical_ids: IndexSet<ChemicalID> = parameters.chemicals.iter().cloned().collect();
    read_costs_from_iter(costs_csv, &chemical_ids, technologies, region_ids, horizon)
        .with_context(|| input_err_msg(&file_path))
}

fn read_costs_from_iter<I>(
    iter: I,
    chemical_ids: &IndexSet<ChemicalID>,
    technologies: &TechnologyMap,
    region_ids: &IndexSet<RegionID>,
    horizon: &RangeInclusive<u32>,
) -> Result<CostMap>
where
    I: Iterator<Item = CostRaw>,
{
    let mut map = CostMap::new();
    for record in iter {
        ensure!(record.lcox.is_finite(), "Cost must be a finite number");
        let chemical_id = chemical_ids.get_id_by_str(&record.chemical_id)?;
        let destination = technologies.get_id_by_str(&record.destination_technology_id)?;
        check_produces(technologies, &destination, &chemical_id)?;
        let origin = record
            .origin_technology_id
            .as_deref()
            .map(|id| technologies.get_id_by_str(id))
            .transpose()?;
        if let Some(origin) = &origin {
            check_produces(technologies, origin, &chemical_id)?;
        }

        let regions = parse_region_str(&record.region_id, region_ids)?;
        let years = parse_year_str(&record.year, horizon)?;
        for (region_id, year) in iproduct!(regions, years) {
            let key = (
                chemical_id.clone(),
                origin.clone(),
                destination.clone(),
                region_id,
                year,
            );
            ensure!(
                map.insert(key, record.lcox).is_none(),
                "Cost of {destination} for {chemical_id} in {year} given more than once"
            );
        }
    }

    Ok(map)
}

/// A row of the emissions file (tonnes of CO2e per tonne of product)
#[derive(PartialEq, Debug, Deserialize)]
struct EmissionsRaw {
    chemical_id: String,
    technology_id: String,
    region_id: String,
    year: String,
    scope_1_2: EmissionsPerTonne,
    scope_3_upstream: EmissionsPerTonne,
}

/// Read the emissions CSV file
pub fn read_emissions(
    files: &InputFiles,
    parameters: &ModelParameters,
    technologies: &TechnologyMap,
    region_ids: &IndexSet<RegionID>,
    horizon: &RangeInclusive<u32>,
) -> Result<EmissionsMap> {
    let file_path = files.path(EMISSIONS_FILE_NAME);
    let emissions_csv = read_csv(&file_path)?;
    let chemical_ids: IndexSet<ChemicalID> = parameters.chemicals.iter().cloned().collect();
    read_emissions_from_iter(
        emissions_csv,
        &chemical_ids,
        technologies,
        region_ids,
        horizon,
    )
    .with_context(|| input_err_msg(&file_path))
}

fn read_emissions_from_iter<I>(
    iter: I,
    chemical_ids: &IndexSet<ChemicalID>,
    technologies: &TechnologyMap,
    region_ids: &IndexSet<RegionID>,
    horizon: &RangeInclusive<u32>,
) -> Result<EmissionsMap>
where
    I: Iterator<Item = EmissionsRaw>,
{
    let mut map = EmissionsMap::new();
    for record in iter {
        ensure!(
            record.scope_1_2.is_finite() && record.scope_3_upstream.is_finite(),
            "Emissions must be finite numbers"
        );
        let chemical_id = chemical_ids.get_id_by_str(&record.chemical_id)?;
        let technology_id = technologies.get_id_by_str(&record.technology_id)?;
        check_produces(technologies, &technology_id, &chemical_id)?;

        let emissions = TechnologyEmissions {
            scope_1_2: record.scope_1_2,
            scope_3_upstream: record.scope_3_upstream,
        };
        let regions = parse_region_str(&record.region_id, region_ids)?;
        let years = parse_year_str(&record.year, horizon)?;
        for (region_id, year) in iproduct!(regions, years) {
            let key = (
                chemical_id.clone(),
                technology_id.clone(),
                region_id,
                year,
            );
            ensure!(
                map.insert(key, emissions).is_none(),
                "Emissions of {technology_id} for {chemical_id} in {year} given more than once"
            );
        }
    }

    Ok(map)
}

/// A row of the decommission rates file
#[derive(PartialEq, Debug, Deserialize)]
struct DecommissionRateRaw {
    technology_id: String,
    year: String,
    rate: Dimensionless,
}

/// Read the forced decommission rates.
///
/// The file is optional. Technologies without a rate for a year are not forced out in that year.
pub fn read_decommission_rates(
    files: &InputFiles,
    technologies: &TechnologyMap,
    horizon: &RangeInclusive<u32>,
) -> Result<DecommissionRateMap> {
    let file_path = files.path(DECOMMISSION_RATES_FILE_NAME);
    let rates_csv = read_csv_optional(&file_path)?;
    read_decommission_rates_from_iter(rates_csv, technologies, horizon)
        .with_context(|| input_err_msg(&file_path))
}

fn read_decommission_rates_from_iter<I>(
    iter: I,
    technologies: &TechnologyMap,
    horizon: &RangeInclusive<u32>,
) -> Result<DecommissionRateMap>
where
    I: Iterator<Item = DecommissionRateRaw>,
{
    let mut map = DecommissionRateMap::new();
    for record in iter {
        ensure!(
            record.rate >= Dimensionless(0.0) && record.rate <= Dimensionless(1.0),
            "Decommission rate must be between 0 and 1"
        );
        let technology_id = technologies.get_id_by_str(&record.technology_id)?;
        for year in parse_year_str(&record.year, horizon)? {
            ensure!(
                map.insert((technology_id.clone(), year), record.rate)
                    .is_none(),
                "Decommission rate of {technology_id} in {year} given more than once"
            );
        }
    }

    Ok(map)
}

/// A row of the methanol feedstock file
#[derive(PartialEq, Debug, Deserialize)]
struct MethanolFeedstockRaw {
    technology_id: String,
    methanol_type: MethanolType,
    intensity: Dimensionless,
    emissions_share: Dimensionless,
}

/// Read how much methanol of which grade each methanol-consuming technology uses.
///
/// The file is optional.
pub fn read_methanol_feedstock(
    files: &InputFiles,
    technologies: &TechnologyMap,
) -> Result<MethanolFeedstockMap> {
    let file_path = files.path(METHANOL_FEEDSTOCK_FILE_NAME);
    let feedstock_csv = read_csv_optional(&file_path)?;
    read_methanol_feedstock_from_iter(feedstock_csv, technologies)
        .with_context(|| input_err_msg(&file_path))
}

fn read_methanol_feedstock_from_iter<I>(
    iter: I,
    technologies: &TechnologyMap,
) -> Result<MethanolFeedstockMap>
where
    I: Iterator<Item = MethanolFeedstockRaw>,
{
    let mut map = MethanolFeedstockMap::new();
    for record in iter {
        let technology_id = technologies.get_id_by_str(&record.technology_id)?;
        ensure!(
            technologies[&technology_id].consumes_methanol,
            "Technology {technology_id} has methanol feedstock but does not consume methanol"
        );
        ensure!(
            record.intensity.is_finite() && record.intensity >= Dimensionless(0.0),
            "Methanol intensity must be a finite, non-negative number"
        );
        ensure!(
            record.emissions_share >= Dimensionless(0.0)
                && record.emissions_share <= Dimensionless(1.0),
            "Emissions share must be between 0 and 1"
        );

        let feedstock = MethanolFeedstock {
            methanol_type: record.methanol_type,
            intensity: record.intensity,
            emissions_share: record.emissions_share,
        };
        ensure!(
            map.insert(technology_id.clone(), feedstock).is_none(),
            "Methanol feedstock of {technology_id} given more than once"
        );
    }

    Ok(map)
}
