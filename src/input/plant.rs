//! Code for reading plant parameters and the initial plant stack from CSV files.
use super::{InputFiles, input_err_msg, read_csv};
use crate::chemical::{ChemicalID, MaterialUsage};
use crate::id::IDCollection;
use crate::model::Model;
use crate::plant::{
    ChemicalCapacityMap, PlantCapacityMap, PlantID, PlantSpec, PlantSpecMap,
    check_capacity_valid_for_plant,
};
use crate::region::{RegionID, parse_region_str};
use crate::stack::PlantStack;
use crate::technology::TechnologyMap;
use crate::units::{Capacity, Dimensionless, Tonnes};
use crate::year::parse_year_str;
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use itertools::iproduct;
use serde::Deserialize;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::rc::Rc;

const PLANT_SPECS_FILE_NAME: &str = "plant_specs.csv";
const PLANT_CAPACITIES_FILE_NAME: &str = "plant_capacities.csv";
const PLANTS_FILE_NAME: &str = "plants.csv";

/// A row of the plant specs file. Material usage is in tonnes per plant per year.
#[derive(PartialEq, Debug, Deserialize)]
struct PlantSpecRaw {
    technology_id: String,
    region_id: String,
    year: String,
    capacity_factor: Dimensionless,
    lifetime: u32,
    biomass: Tonnes,
    bio_oils: Tonnes,
    pyrolysis_oil: Tonnes,
    waste_water: Tonnes,
    municipal_solid_waste: Tonnes,
    methanol_black: Tonnes,
    methanol_green: Tonnes,
    ccs_total: Tonnes,
    ccs_yearly: Tonnes,
}

impl PlantSpecRaw {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.capacity_factor > Dimensionless(0.0) && self.capacity_factor <= Dimensionless(1.0),
            "Capacity factor must be > 0 and <= 1"
        );
        ensure!(self.lifetime > 0, "Lifetime must be greater than zero");
        for usage in [
            self.biomass,
            self.bio_oils,
            self.pyrolysis_oil,
            self.waste_water,
            self.municipal_solid_waste,
            self.methanol_black,
            self.methanol_green,
            self.ccs_total,
            self.ccs_yearly,
        ] {
            ensure!(
                usage.is_finite() && usage >= Tonnes(0.0),
                "Material usage must be a finite, non-negative number"
            );
        }

        Ok(())
    }

    fn into_spec(self) -> PlantSpec {
        PlantSpec {
            lifetime: self.lifetime,
            capacity_factor: self.capacity_factor,
            usage: MaterialUsage {
                biomass: self.biomass,
                bio_oils: self.bio_oils,
                pyrolysis_oil: self.pyrolysis_oil,
                waste_water: self.waste_water,
                municipal_solid_waste: self.municipal_solid_waste,
                methanol_black: self.methanol_black,
                methanol_green: self.methanol_green,
                ccs_total: self.ccs_total,
                ccs_yearly: self.ccs_yearly,
            },
        }
    }
}

/// Read the plant specs CSV file.
///
/// # Arguments
///
/// * `files` - The model's input files
/// * `technologies` - The model's technologies
/// * `region_ids` - All possible region IDs
/// * `horizon` - The simulated years
pub fn read_plant_specs(
    files: &InputFiles,
    technologies: &TechnologyMap,
    region_ids: &IndexSet<RegionID>,
    horizon: &RangeInclusive<u32>,
) -> Result<PlantSpecMap> {
    let file_path = files.path(PLANT_SPECS_FILE_NAME);
    let specs_csv = read_csv(&file_path)?;
    read_plant_specs_from_iter(specs_csv, technologies, region_ids, horizon)
        .with_context(|| input_err_msg(&file_path))
}

fn read_plant_specs_from_iter<I>(
    iter: I,
    technologies: &TechnologyMap,
    region_ids: &IndexSet<RegionID>,
    horizon: &RangeInclusive<u32>,
) -> Result<PlantSpecMap>
where
    I: Iterator<Item = PlantSpecRaw>,
{
    let mut map = PlantSpecMap::new();
    for record in iter {
        record.validate()?;
        let technology_id = technologies.get_id_by_str(&record.technology_id)?;
        let regions = parse_region_str(&record.region_id, region_ids)?;
        let years = parse_year_str(&record.year, horizon)?;

        let spec = Rc::new(record.into_spec());
        for (region_id, year) in iproduct!(regions, years) {
            let existing = map
                .insert(
                    (technology_id.clone(), region_id.clone(), year),
                    Rc::clone(&spec),
                )
                .is_some();
            ensure!(
                !existing,
                "Plant spec for {technology_id} in {region_id} in {year} given more than once"
            );
        }
    }

    Ok(map)
}

/// A row of the plant capacities file (Mt/yr per plant)
#[derive(PartialEq, Debug, Deserialize)]
struct PlantCapacityRaw {
    technology_id: String,
    region_id: String,
    chemical_id: String,
    capacity: Capacity,
}

/// Read the plant capacities CSV file.
///
/// Each technology must be given a capacity for its primary chemical wherever it has capacities.
pub fn read_plant_capacities(
    files: &InputFiles,
    technologies: &TechnologyMap,
    region_ids: &IndexSet<RegionID>,
) -> Result<PlantCapacityMap> {
    let file_path = files.path(PLANT_CAPACITIES_FILE_NAME);
    let capacities_csv = read_csv(&file_path)?;
    read_plant_capacities_from_iter(capacities_csv, technologies, region_ids)
        .with_context(|| input_err_msg(&file_path))
}

fn read_plant_capacities_from_iter<I>(
    iter: I,
    technologies: &TechnologyMap,
    region_ids: &IndexSet<RegionID>,
) -> Result<PlantCapacityMap>
where
    I: Iterator<Item = PlantCapacityRaw>,
{
    let mut map: HashMap<_, ChemicalCapacityMap> = HashMap::new();
    for record in iter {
        let technology_id = technologies.get_id_by_str(&record.technology_id)?;
        let technology = &technologies[&technology_id];
        let chemical_id = ChemicalID::from(record.chemical_id.as_str());
        ensure!(
            technology.produces(&chemical_id),
            "Technology {technology_id} does not produce {chemical_id}"
        );
        check_capacity_valid_for_plant(record.capacity)?;

        for region_id in parse_region_str(&record.region_id, region_ids)? {
            let existing = map
                .entry((technology_id.clone(), region_id.clone()))
                .or_default()
                .insert(chemical_id.clone(), record.capacity)
                .is_some();
            ensure!(
                !existing,
                "Capacity of {technology_id} in {region_id} given more than once for {chemical_id}"
            );
        }
    }

    for ((technology_id, region_id), capacities) in &map {
        let primary = &technologies[technology_id].primary_chemical;
        ensure!(
            capacities.contains_key(primary),
            "No capacity given for primary chemical {primary} of {technology_id} in {region_id}"
        );
    }

    Ok(map
        .into_iter()
        .map(|(key, capacities)| (key, Rc::new(capacities)))
        .collect())
}

/// A row of the plants file, describing a group of identical plants already operating
#[derive(PartialEq, Debug, Deserialize)]
struct InitialPlantsRaw {
    technology_id: String,
    region_id: String,
    start_year: u32,
    number_of_plants: u32,
}

/// Read the initial plant stack.
///
/// Plants are numbered in the order they appear in the file.
pub fn read_initial_stack(files: &InputFiles, model: &Model) -> Result<PlantStack> {
    let file_path = files.path(PLANTS_FILE_NAME);
    let plants_csv = read_csv(&file_path)?;
    read_initial_stack_from_iter(plants_csv, model).with_context(|| input_err_msg(&file_path))
}

fn read_initial_stack_from_iter<I>(iter: I, model: &Model) -> Result<PlantStack>
where
    I: Iterator<Item = InitialPlantsRaw>,
{
    let region_ids: IndexSet<RegionID> = model.regions.keys().cloned().collect();
    let mut stack = PlantStack::new();
    let mut next_id = 0;
    for record in iter {
        let technology_id = model.technologies.get_id_by_str(&record.technology_id)?;
        let region_id = region_ids.get_id_by_str(&record.region_id)?;
        ensure!(
            record.start_year <= model.parameters.start_year,
            "Initial plants of {technology_id} in {region_id} start after the first simulated \
            year"
        );
        ensure!(
            record.number_of_plants > 0,
            "Number of plants must be greater than zero"
        );

        for _ in 0..record.number_of_plants {
            let plant = model.create_plant(
                PlantID(next_id),
                &technology_id,
                None,
                &region_id,
                record.start_year,
            )?;
            stack.add(Rc::new(plant))?;
            next_id += 1;
        }
    }

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model};
    use crate::units::Volume;
    use rstest::rstest;
    use std::iter;

    fn plant_spec_raw(region_id: &str, year: &str) -> PlantSpecRaw {
        PlantSpecRaw {
            technology_id: "SMR".into(),
            region_id: region_id.into(),
            year: year.into(),
            capacity_factor: Dimensionless(0.9),
            lifetime: 30,
            biomass: Tonnes(0.0),
            bio_oils: Tonnes(0.0),
            pyrolysis_oil: Tonnes(0.0),
            waste_water: Tonnes(0.0),
            municipal_solid_waste: Tonnes(0.0),
            methanol_black: Tonnes(0.0),
            methanol_green: Tonnes(0.0),
            ccs_total: Tonnes(0.0),
            ccs_yearly: Tonnes(0.0),
        }
    }

    #[rstest]
    fn test_read_plant_specs_from_iter(model: Model) {
        let region_ids = model.regions.keys().cloned().collect();
        let specs = read_plant_specs_from_iter(
            [
                plant_spec_raw("all", "2020..2025"),
                PlantSpecRaw {
                    lifetime: 25,
                    ..plant_spec_raw("Europe", "2026;2030")
                },
            ]
            .into_iter(),
            &model.technologies,
            &region_ids,
            &(2020..=2030),
        )
        .unwrap();

        assert_eq!(specs.len(), 14);
        assert_eq!(specs[&("SMR".into(), "China".into(), 2025)].lifetime, 30);
        assert_eq!(specs[&("SMR".into(), "Europe".into(), 2030)].lifetime, 25);
        assert!(!specs.contains_key(&("SMR".into(), "China".into(), 2030)));
    }

    #[rstest]
    #[case(
        PlantSpecRaw {
            capacity_factor: Dimensionless(0.0),
            ..plant_spec_raw("all", "all")
        },
        "Capacity factor must be > 0 and <= 1"
    )]
    #[case(
        PlantSpecRaw {
            lifetime: 0,
            ..plant_spec_raw("all", "all")
        },
        "Lifetime must be greater than zero"
    )]
    #[case(
        PlantSpecRaw {
            biomass: Tonnes(-1.0),
            ..plant_spec_raw("all", "all")
        },
        "Material usage must be a finite, non-negative number"
    )]
    #[case(plant_spec_raw("Mars", "all"), "Unknown ID Mars found")]
    #[case(plant_spec_raw("all", "2019"), "Invalid year: 2019")]
    fn test_read_plant_specs_invalid(model: Model, #[case] row: PlantSpecRaw, #[case] msg: &str) {
        let region_ids = model.regions.keys().cloned().collect();
        assert_error!(
            read_plant_specs_from_iter(
                iter::once(row),
                &model.technologies,
                &region_ids,
                &(2020..=2030),
            ),
            msg
        );
    }

    #[rstest]
    fn test_read_plant_specs_duplicate(model: Model) {
        let region_ids = model.regions.keys().cloned().collect();
        assert_error!(
            read_plant_specs_from_iter(
                [plant_spec_raw("all", "all"), plant_spec_raw("China", "2030")].into_iter(),
                &model.technologies,
                &region_ids,
                &(2020..=2030),
            ),
            "Plant spec for SMR in China in 2030 given more than once"
        );
    }

    fn capacity_raw(technology_id: &str, chemical_id: &str, capacity: f64) -> PlantCapacityRaw {
        PlantCapacityRaw {
            technology_id: technology_id.into(),
            region_id: "all".into(),
            chemical_id: chemical_id.into(),
            capacity: Capacity(capacity),
        }
    }

    #[rstest]
    fn test_read_plant_capacities_from_iter(model: Model) {
        let region_ids = model.regions.keys().cloned().collect();
        let capacities = read_plant_capacities_from_iter(
            iter::once(capacity_raw("SMR", "Ammonia", 1.2)),
            &model.technologies,
            &region_ids,
        )
        .unwrap();
        assert_eq!(capacities.len(), 2);
        assert_eq!(
            capacities[&("SMR".into(), "Europe".into())]["Ammonia"],
            Capacity(1.2)
        );
    }

    #[rstest]
    #[case(capacity_raw("SMR", "Ethylene", 1.0), "Technology SMR does not produce Ethylene")]
    #[case(
        capacity_raw("SMR", "Ammonia", 0.0),
        "Capacity must be a finite, positive number"
    )]
    #[case(capacity_raw("Haber", "Ammonia", 1.0), "Unknown ID Haber found")]
    fn test_read_plant_capacities_invalid(
        model: Model,
        #[case] row: PlantCapacityRaw,
        #[case] msg: &str,
    ) {
        let region_ids = model.regions.keys().cloned().collect();
        assert_error!(
            read_plant_capacities_from_iter(iter::once(row), &model.technologies, &region_ids),
            msg
        );
    }

    #[rstest]
    fn test_read_initial_stack_from_iter(model: Model) {
        let rows = [
            InitialPlantsRaw {
                technology_id: "SMR".into(),
                region_id: "Europe".into(),
                start_year: 1995,
                number_of_plants: 3,
            },
            InitialPlantsRaw {
                technology_id: "SMR + CCS".into(),
                region_id: "China".into(),
                start_year: 2020,
                number_of_plants: 2,
            },
        ];
        let stack = read_initial_stack_from_iter(rows.into_iter(), &model).unwrap();
        assert_eq!(stack.len(), 5);
        assert!(stack.contains(PlantID(4)));
        assert_eq!(stack.get(PlantID(0)).unwrap().start_year, 1995);
        assert_eq!(
            stack.yearly_volume(
                &"Ammonia".into(),
                crate::stack::PlantFilter::new().region(&"China".into())
            ),
            Volume(2.0)
        );
    }

    #[rstest]
    fn test_read_initial_stack_invalid(model: Model) {
        let row = InitialPlantsRaw {
            technology_id: "SMR".into(),
            region_id: "Europe".into(),
            start_year: 2021,
            number_of_plants: 1,
        };
        assert_error!(
            read_initial_stack_from_iter(iter::once(row), &model),
            "Initial plants of SMR in Europe start after the first simulated year"
        );
    }
}
