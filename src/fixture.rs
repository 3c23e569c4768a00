//! Fixtures for tests

use crate::chemical::{ChemicalID, MaterialUsage};
use crate::economics::TechnologyEmissions;
use crate::model::{Model, ModelParameters};
use crate::plant::{ChemicalCapacityMap, Plant, PlantID, PlantSpec};
use crate::ranking::{RetrofitKind, TransitionCandidate};
use crate::region::{Region, RegionID, RegionMap};
use crate::stack::PlantStack;
use crate::technology::{Technology, TechnologyID, TechnologyMap, TechnologyTier};
use crate::units::{Capacity, Dimensionless, EmissionsPerTonne, MoneyPerTonne, Tonnes, Volume};
use indexmap::{IndexMap, IndexSet, indexmap};
use itertools::Itertools;
use rstest::fixture;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn region_id() -> RegionID {
    "Europe".into()
}

/// A technology making ethylene with propylene as a byproduct
#[fixture]
pub fn cracker() -> Technology {
    Technology {
        id: "Steam cracker".into(),
        tier: TechnologyTier::Initial,
        fossil: true,
        unabated_fossil: true,
        methanol_supply: None,
        consumes_methanol: false,
        primary_chemical: "Ethylene".into(),
        availability: indexmap! {
            "Ethylene".into() => 2020..=2050,
            "Propylene".into() => 2030..=2030,
        },
    }
}

#[fixture]
pub fn cracker_capacities() -> ChemicalCapacityMap {
    indexmap! {
        "Ethylene".into() => Capacity(1.0),
        "Propylene".into() => Capacity(0.5),
    }
}

#[fixture]
pub fn plant_spec() -> PlantSpec {
    PlantSpec {
        lifetime: 30,
        capacity_factor: Dimensionless(0.5),
        usage: MaterialUsage::default(),
    }
}

/// An incumbent ammonia technology
#[fixture]
pub fn reformer() -> Technology {
    Technology {
        id: "SMR".into(),
        tier: TechnologyTier::Initial,
        fossil: true,
        unabated_fossil: true,
        methanol_supply: None,
        consumes_methanol: false,
        primary_chemical: "Ammonia".into(),
        availability: indexmap! {"Ammonia".into() => 2020..=2050},
    }
}

/// Make a plant with a capacity of 1 Mt/yr of its primary chemical and 0.5 Mt/yr of any byproducts
pub fn make_plant(
    id: u32,
    technology: &Rc<Technology>,
    region: &str,
    start_year: u32,
) -> Rc<Plant> {
    let capacities: ChemicalCapacityMap = technology
        .availability
        .keys()
        .map(|chemical_id| {
            let capacity = if technology.is_primary_for(chemical_id) {
                1.0
            } else {
                0.5
            };
            (chemical_id.clone(), Capacity(capacity))
        })
        .collect();

    Plant::new(
        PlantID(id),
        Rc::clone(technology),
        None,
        region.into(),
        start_year,
        &plant_spec(),
        Rc::new(capacities),
    )
    .unwrap()
    .into()
}

/// Three crackers: two in Europe (started 1990 and 2000) and one in China (started 2015)
#[fixture]
pub fn cracker_stack(cracker: Technology) -> PlantStack {
    let cracker = Rc::new(cracker);
    PlantStack::from_plants([
        make_plant(0, &cracker, "Europe", 1990),
        make_plant(1, &cracker, "Europe", 2000),
        make_plant(2, &cracker, "China", 2015),
    ])
    .unwrap()
}

/// An ammonia plant in Europe using 0.5 Mt of biomass a year
#[fixture]
pub fn biomass_plant(reformer: Technology, region_id: RegionID) -> Rc<Plant> {
    let spec = PlantSpec {
        usage: MaterialUsage {
            biomass: Tonnes(5e5),
            ..Default::default()
        },
        ..plant_spec()
    };
    let capacities = ChemicalCapacityMap::from([("Ammonia".into(), Capacity(1.0))]);
    Plant::new(
        PlantID(0),
        reformer.into(),
        None,
        region_id,
        2010,
        &spec,
        capacities.into(),
    )
    .unwrap()
    .into()
}

/// A new build candidate for ammonia in Europe
pub fn candidate(
    destination: &str,
    tier: TechnologyTier,
    lcox: f64,
    emissions: f64,
) -> TransitionCandidate {
    TransitionCandidate {
        chemical_id: "Ammonia".into(),
        origin: None,
        origin_tier: None,
        destination: destination.into(),
        destination_tier: tier,
        region_id: "Europe".into(),
        year: 2030,
        kind: RetrofitKind::Normal,
        lcox: MoneyPerTonne(lcox),
        emissions_scope_1_2: EmissionsPerTonne(emissions),
        emissions_scope_3_upstream: EmissionsPerTonne(0.0),
        emissions_scope_1_2_3_upstream: EmissionsPerTonne(emissions),
    }
}

#[fixture]
pub fn model_parameters() -> ModelParameters {
    toml::from_str(
        r#"
start_year = 2020
end_year = 2030
chemicals = ["Ammonia"]
pathways = ["me"]
"#,
    )
    .unwrap()
}

/// The ammonia technologies of the model fixture: (id, tier, fossil, greenfield cost, emissions)
const AMMONIA_TECHNOLOGIES: [(&str, TechnologyTier, bool, f64, f64, f64); 3] = [
    ("SMR", TechnologyTier::Initial, true, 300.0, 2.0, 0.5),
    ("SMR + CCS", TechnologyTier::Transition, true, 400.0, 0.5, 0.5),
    ("Electrolyser", TechnologyTier::EndState, false, 600.0, 0.0, 0.1),
];

/// A model producing ammonia in Europe and China from 2020 to 2030.
///
/// Plants have a capacity of 1 Mt/yr, run at full capacity and use no capped materials. SMR can be
/// retrofitted to SMR + CCS.
#[fixture]
pub fn model(model_parameters: ModelParameters) -> Model {
    let ammonia: ChemicalID = "Ammonia".into();
    let regions: RegionMap = ["Europe", "China"]
        .into_iter()
        .map(|id| {
            let region = Region {
                id: id.into(),
                description: id.to_string(),
            };
            (region.id.clone(), region)
        })
        .collect();
    let years = model_parameters.years();

    let technologies: TechnologyMap = AMMONIA_TECHNOLOGIES
        .iter()
        .map(|(id, tier, fossil, _, _, _)| {
            let technology = Technology {
                id: (*id).into(),
                tier: *tier,
                fossil: *fossil,
                unabated_fossil: *tier == TechnologyTier::Initial,
                methanol_supply: None,
                consumes_methanol: false,
                primary_chemical: ammonia.clone(),
                availability: indexmap! {ammonia.clone() => 2020..=2050},
            };
            (technology.id.clone(), Rc::new(technology))
        })
        .collect();

    let spec = Rc::new(PlantSpec {
        lifetime: 30,
        capacity_factor: Dimensionless(1.0),
        usage: MaterialUsage::default(),
    });
    let capacities = Rc::new(ChemicalCapacityMap::from([(
        ammonia.clone(),
        Capacity(1.0),
    )]));

    let mut plant_specs = HashMap::new();
    let mut plant_capacities = HashMap::new();
    let mut costs = HashMap::new();
    let mut emissions = HashMap::new();
    for ((id, _, _, lcox, scope_1_2, scope_3), region_id) in
        AMMONIA_TECHNOLOGIES.iter().cartesian_product(regions.keys())
    {
        let technology_id: TechnologyID = (*id).into();
        plant_capacities.insert(
            (technology_id.clone(), region_id.clone()),
            Rc::clone(&capacities),
        );
        for year in years.clone() {
            plant_specs.insert(
                (technology_id.clone(), region_id.clone(), year),
                Rc::clone(&spec),
            );
            costs.insert(
                (
                    ammonia.clone(),
                    None,
                    technology_id.clone(),
                    region_id.clone(),
                    year,
                ),
                MoneyPerTonne(*lcox),
            );
            emissions.insert(
                (ammonia.clone(), technology_id.clone(), region_id.clone(), year),
                TechnologyEmissions {
                    scope_1_2: EmissionsPerTonne(*scope_1_2),
                    scope_3_upstream: EmissionsPerTonne(*scope_3),
                },
            );
        }
    }

    // Retrofit route from SMR to SMR + CCS
    for (region_id, year) in regions.keys().cartesian_product(years.clone()) {
        costs.insert(
            (
                ammonia.clone(),
                Some("SMR".into()),
                "SMR + CCS".into(),
                region_id.clone(),
                year,
            ),
            MoneyPerTonne(350.0),
        );
    }
    let retrofit_routes = indexmap! {
        ammonia.clone() => IndexSet::from([("SMR".into(), "SMR + CCS".into())]),
    };

    let demand = years
        .clone()
        .map(|year| {
            (
                (ammonia.clone(), year),
                Volume(10.0 + f64::from(year - 2020)),
            )
        })
        .collect();

    Model {
        model_path: PathBuf::new(),
        parameters: model_parameters,
        regions,
        technologies,
        plant_specs,
        plant_capacities,
        costs,
        emissions,
        retrofit_routes,
        demand,
        availability: Vec::new(),
        decommission_rates: HashMap::new(),
        methanol_feedstock: IndexMap::new(),
    }
}

/// Plants of the model fixture, all SMR: `n_europe` in Europe and `n_china` in China
pub fn smr_stack(model: &Model, n_europe: u32, n_china: u32, start_year: u32) -> PlantStack {
    let europe = (0..n_europe).map(|i| (i, "Europe"));
    let china = (n_europe..n_europe + n_china).map(|i| (i, "China"));
    PlantStack::from_plants(europe.chain(china).map(|(id, region)| {
        Rc::new(
            model
                .create_plant(PlantID(id), &"SMR".into(), None, &region.into(), start_year)
                .unwrap(),
        )
    }))
    .unwrap()
}
