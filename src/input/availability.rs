//! Code for reading material availability caps from a CSV file.
use super::{InputFiles, input_err_msg, read_csv_optional};
use crate::chemical::{ChemicalID, Material};
use crate::id::IDCollection;
use crate::ledger::{AvailabilityCap, LedgerScope};
use crate::model::ModelParameters;
use crate::region::{RegionID, parse_region_str};
use crate::units::Megatonnes;
use crate::year::parse_year_str;
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use itertools::iproduct;
use serde::Deserialize;
use std::collections::HashSet;
use std::ops::RangeInclusive;

const AVAILABILITY_FILE_NAME: &str = "availability.csv";

/// A row of the availability file.
///
/// An empty region denotes a global cap and an empty chemical a cap on the total across chemicals.
#[derive(PartialEq, Debug, Deserialize)]
struct AvailabilityRaw {
    material: Material,
    region_id: Option<String>,
    chemical_id: Option<String>,
    year: String,
    cap: Megatonnes,
}

/// Read the material availability caps.
///
/// The file is optional. Materials without a cap are unconstrained.
pub fn read_availability(
    files: &InputFiles,
    parameters: &ModelParameters,
    region_ids: &IndexSet<RegionID>,
    horizon: &RangeInclusive<u32>,
) -> Result<Vec<AvailabilityCap>> {
    let file_path = files.path(AVAILABILITY_FILE_NAME);
    let availability_csv = read_csv_optional(&file_path)?;
    read_availability_from_iter(availability_csv, parameters, region_ids, horizon)
        .with_context(|| input_err_msg(&file_path))
}

fn read_availability_from_iter<I>(
    iter: I,
    parameters: &ModelParameters,
    region_ids: &IndexSet<RegionID>,
    horizon: &RangeInclusive<u32>,
) -> Result<Vec<AvailabilityCap>>
where
    I: Iterator<Item = AvailabilityRaw>,
{
    let chemical_ids: IndexSet<ChemicalID> = parameters.chemicals.iter().cloned().collect();
    let mut caps = Vec::new();
    let mut seen = HashSet::new();
    for record in iter {
        let material = record.material;
        ensure!(
            record.cap.is_finite() && record.cap >= Megatonnes(0.0),
            "Cap for {material} must be a finite, non-negative number"
        );
        ensure!(
            !(material.is_global() && parameters.methanol_chemical.is_some()),
            "Availability of {material} is derived from methanol production and cannot be given"
        );

        let chemical_id = record
            .chemical_id
            .as_deref()
            .map(|id| chemical_ids.get_id_by_str(id))
            .transpose()?;
        if let Some(chemical_id) = &chemical_id {
            ensure!(
                material.is_tracked_per_chemical(),
                "{material} cannot be capped for {chemical_id} alone"
            );
        }

        let scopes = match &record.region_id {
            None => {
                ensure!(material.is_global(), "No region given for {material}");
                vec![LedgerScope::Global]
            }
            Some(region_str) => {
                ensure!(!material.is_global(), "{material} is traded globally");
                parse_region_str(region_str, region_ids)?
                    .into_iter()
                    .map(LedgerScope::Region)
                    .collect()
            }
        };

        for (scope, year) in iproduct!(scopes, parse_year_str(&record.year, horizon)?) {
            ensure!(
                seen.insert((material, scope.clone(), chemical_id.clone(), year)),
                "Cap for {material} in {scope} in {year} given more than once"
            );
            caps.push(AvailabilityCap {
                material,
                scope,
                chemical_id: chemical_id.clone(),
                year,
                cap: record.cap,
            });
        }
    }

    Ok(caps)
}
