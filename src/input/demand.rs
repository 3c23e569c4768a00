//! Code for reading chemical demand from a CSV file.
use super::{InputFiles, input_err_msg, read_csv};
use crate::chemical::ChemicalID;
use crate::id::IDCollection;
use crate::model::{DemandMap, ModelParameters};
use crate::units::Volume;
use crate::year::parse_year_str;
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use itertools::iproduct;
use serde::Deserialize;
use std::ops::RangeInclusive;

const DEMAND_FILE_NAME: &str = "demand.csv";

/// A row of the demand file (Mt/yr)
#[derive(PartialEq, Debug, Deserialize)]
struct DemandRaw {
    chemical_id: String,
    year: String,
    demand: Volume,
}

/// Read the demand CSV file.
///
/// Demand must be given for every simulated chemical in every simulated year.
pub fn read_demand(
    files: &InputFiles,
    parameters: &ModelParameters,
    horizon: &RangeInclusive<u32>,
) -> Result<DemandMap> {
    let file_path = files.path(DEMAND_FILE_NAME);
    let demand_csv = read_csv(&file_path)?;
    let chemical_ids: IndexSet<ChemicalID> = parameters.chemicals.iter().cloned().collect();
    read_demand_from_iter(demand_csv, &chemical_ids, horizon)
        .with_context(|| input_err_msg(&file_path))
}

fn read_demand_from_iter<I>(
    iter: I,
    chemical_ids: &IndexSet<ChemicalID>,
    horizon: &RangeInclusive<u32>,
) -> Result<DemandMap>
where
    I: Iterator<Item = DemandRaw>,
{
    let mut map = DemandMap::new();
    for record in iter {
        let chemical_id = chemical_ids.get_id_by_str(&record.chemical_id)?;
        ensure!(
            record.demand.is_finite() && record.demand >= Volume(0.0),
            "Demand for {chemical_id} must be a finite, non-negative number"
        );

        for year in parse_year_str(&record.year, horizon)? {
            ensure!(
                map.insert((chemical_id.clone(), year), record.demand)
                    .is_none(),
                "Demand for {chemical_id} in {year} given more than once"
            );
        }
    }

    for (chemical_id, year) in iproduct!(chemical_ids, horizon.clone()) {
        ensure!(
            map.contains_key(&(chemical_id.clone(), year)),
            "No demand given for {chemical_id} in {year}"
        );
    }

    Ok(map)
}
