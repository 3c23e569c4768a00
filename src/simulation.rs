//! Functionality for running the chemwedge simulation.
use crate::chemical::ChemicalID;
use crate::constraints::Constraints;
use crate::economics::MethanolMixMap;
use crate::input::load_model;
use crate::ledger::AvailabilityLedger;
use crate::model::{Model, ModelParameters};
use crate::output::{DataWriter, create_scenario_output_directory};
use crate::plant::{Plant, PlantID};
use crate::ranking::{RankingTables, RetrofitKind, TransitionCandidate};
use crate::scenario::{Pathway, Scenario};
use crate::stack::{PlantFilter, PlantStack};
use crate::transition::{TransitionRegistry, TransitionType};
use crate::units::Volume;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

pub mod build_new;
use build_new::build_new;
pub mod decommission;
use decommission::decommission;
pub mod methanol;
use methanol::{methanol_mix, update_methanol_availability};
pub mod retrofit;
use retrofit::retrofit;
pub mod select;

/// Raised when a plant must be chosen for decommissioning but none is eligible
#[derive(Debug, Clone, PartialEq)]
pub struct NoEligiblePlant {
    /// The chemical being optimised
    pub chemical: String,
    /// The year being optimised
    pub year: u32,
}

impl fmt::Display for NoEligiblePlant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "No plant left to decommission for {} in {}",
            self.chemical, self.year
        )
    }
}

impl std::error::Error for NoEligiblePlant {}

/// Everything produced by simulating one scenario
pub struct ScenarioOutcome {
    /// The scenario which was simulated
    pub scenario: Scenario,
    /// The plant stack for every year, from the start year to the end year
    pub stacks: IndexMap<u32, PlantStack>,
    /// Material caps and usage
    pub ledger: AvailabilityLedger,
    /// Every transition made
    pub registry: TransitionRegistry,
    /// The final ranking tables, including methanol adjustments
    pub rankings: RankingTables,
}

/// Mutable state shared by the phases of one (year, chemical) step.
///
/// During the loop for `year`, the phases mutate the stack for `year + 1` and record material
/// usage against `year` in the ledger.
pub struct Phase<'a> {
    /// The model
    pub model: &'a Model,
    /// The scenario's pathway
    pub pathway: Pathway,
    /// The year being optimised
    pub year: u32,
    /// The chemical being optimised
    pub chemical_id: &'a ChemicalID,
    /// The stack at the start of the year
    pub previous: &'a PlantStack,
    /// Precomputed rankings
    pub rankings: &'a RankingTables,
    /// The stack for the following year
    pub next: &'a mut PlantStack,
    /// Material caps and usage
    pub ledger: &'a mut AvailabilityLedger,
    /// Audit log of transitions
    pub registry: &'a mut TransitionRegistry,
    /// Random number generator used for tie-breaking
    pub rng: &'a mut StdRng,
    /// The ID for the next plant created
    pub next_plant_id: &'a mut u32,
}

impl<'a> Phase<'a> {
    /// The model parameters
    pub fn parameters(&self) -> &'a ModelParameters {
        &self.model.parameters
    }

    /// The constraint filters for this step
    pub fn constraints(&self) -> Constraints<'a> {
        Constraints {
            model: self.model,
            pathway: self.pathway,
            year: self.year,
            chemical_id: self.chemical_id,
        }
    }

    /// Demand for the chemical in this year.
    ///
    /// For the methanol chemical, this includes the methanol consumed by the following year's
    /// stack.
    pub fn demand(&self) -> Result<Volume> {
        let mut demand = self.model.demand(self.chemical_id, self.year)?;
        if self.parameters().is_methanol(self.chemical_id) {
            let consumed = self
                .next
                .iter()
                .map(|plant| plant.usage.methanol().to_megatonnes().value())
                .sum::<f64>();
            demand += Volume(consumed);
        }

        Ok(demand)
    }

    /// The total yearly volume of the chemical in the following year's stack
    pub fn volume(&self) -> Volume {
        self.next.yearly_volume(self.chemical_id, PlantFilter::new())
    }

    fn allocate_id(&mut self) -> PlantID {
        let id = PlantID(*self.next_plant_id);
        *self.next_plant_id += 1;
        id
    }

    /// Create a new plant for a candidate's destination technology
    pub fn create_plant(
        &mut self,
        candidate: &TransitionCandidate,
        origin: Option<&Plant>,
    ) -> Result<Rc<Plant>> {
        let id = self.allocate_id();
        let plant = self.model.create_plant(
            id,
            &candidate.destination,
            origin.map(|plant| plant.technology_id().clone()),
            &candidate.region_id,
            self.year,
        )?;

        Ok(Rc::new(plant))
    }

    /// Remove a plant from the stack
    pub fn decommission_plant(&mut self, plant: &Rc<Plant>) -> Result<()> {
        debug!(
            "Decommissioning plant {} ({} in {}) in {}",
            plant.id,
            plant.technology_id(),
            plant.region_id,
            self.year
        );
        self.next.remove(plant.id)?;
        self.ledger.remove_plant(plant, self.year);
        self.registry
            .add(self.year, TransitionType::Decommission, Some(plant), None)
    }

    /// Add a newly built plant to the stack
    pub fn build_plant(&mut self, plant: Rc<Plant>) -> Result<()> {
        debug!(
            "Building plant {} ({} in {}) in {}",
            plant.id,
            plant.technology_id(),
            plant.region_id,
            self.year
        );
        self.ledger.add_plant(&plant, self.year);
        self.registry
            .add(self.year, TransitionType::NewBuild, None, Some(&plant))?;
        self.next.add(plant)
    }

    /// Replace a plant with one using the candidate's destination technology.
    ///
    /// Normal retrofits are logged as a single retrofit; otherwise the replacement is logged as a
    /// decommission followed by a new build.
    pub fn retrofit_plant(
        &mut self,
        plant: &Rc<Plant>,
        candidate: &TransitionCandidate,
    ) -> Result<()> {
        ensure!(
            candidate.origin.as_ref() == Some(plant.technology_id())
                && plant.region_id == candidate.region_id,
            "Plant {} does not match the retrofit of {} in {}",
            plant.id,
            candidate.destination,
            candidate.region_id
        );

        match candidate.kind {
            RetrofitKind::Normal => {
                let new_plant = self.create_plant(candidate, Some(plant))?;
                debug!(
                    "Retrofitting plant {} from {} to {} in {}",
                    plant.id,
                    plant.technology_id(),
                    new_plant.technology_id(),
                    plant.region_id
                );
                self.next.remove(plant.id)?;
                self.ledger.remove_plant(plant, self.year);
                self.ledger.add_plant(&new_plant, self.year);
                self.registry.add(
                    self.year,
                    TransitionType::Retrofit,
                    Some(plant),
                    Some(&new_plant),
                )?;
                self.next.add(new_plant)
            }
            RetrofitKind::DecommissionNewBuild => {
                let new_plant = self.create_plant(candidate, None)?;
                self.decommission_plant(plant)?;
                self.build_plant(new_plant)
            }
        }
    }
}

/// The order in which chemicals are optimised in a year.
///
/// Chemicals are shuffled, except that the methanol chemical always comes last.
pub fn chemical_order(parameters: &ModelParameters, rng: &mut StdRng) -> Vec<ChemicalID> {
    let mut chemicals = parameters
        .chemicals
        .iter()
        .filter(|chemical_id| !parameters.is_methanol(chemical_id))
        .cloned()
        .collect_vec();
    chemicals.shuffle(rng);

    chemicals.extend(
        parameters
            .chemicals
            .iter()
            .filter(|chemical_id| parameters.is_methanol(chemical_id))
            .cloned(),
    );
    chemicals
}

/// Simulate a single scenario.
///
/// # Arguments
///
/// * `model` - The model, loaded for the scenario's sensitivity
/// * `initial_stack` - Plants operating in the start year
/// * `scenario` - The scenario to simulate
pub fn simulate(
    model: &Model,
    initial_stack: PlantStack,
    scenario: Scenario,
) -> Result<ScenarioOutcome> {
    let parameters = &model.parameters;
    let pathway = scenario.pathway;
    let mut rng = StdRng::seed_from_u64(scenario.seed(parameters.seed));

    let mut ledger = AvailabilityLedger::new(&model.availability);
    for plant in initial_stack.iter() {
        ledger.add_plant(plant, parameters.start_year);
    }
    let mut next_plant_id = initial_stack
        .iter()
        .map(|plant| plant.id.0 + 1)
        .max()
        .unwrap_or_default();

    let mut methanol_mix_map = MethanolMixMap::new();
    let mut rankings = RankingTables::build(model, pathway, &methanol_mix_map)?;
    let mut registry = TransitionRegistry::new();
    let mut stacks = IndexMap::from([(parameters.start_year, initial_stack)]);

    for year in parameters.start_year..parameters.end_year {
        info!("{scenario}: optimising {year}");
        let previous = &stacks[&year];
        update_methanol_availability(model, previous, &mut ledger, year);

        let mut next = previous.copy_forward();
        for chemical_id in chemical_order(parameters, &mut rng) {
            debug!("{scenario}: optimising {chemical_id} in {year}");
            let mut phase = Phase {
                model,
                pathway,
                year,
                chemical_id: &chemical_id,
                previous,
                rankings: &rankings,
                next: &mut next,
                ledger: &mut ledger,
                registry: &mut registry,
                rng: &mut rng,
                next_plant_id: &mut next_plant_id,
            };

            decommission(&mut phase)?;
            if !pathway.is_business_as_usual() {
                retrofit(&mut phase)?;
            }
            build_new(&mut phase)?;
        }

        // Methanol consumers are re-ranked against the methanol stack for the following year.
        // The mix is costed with `year` data, the year in which that stack was put together.
        if let Some(methanol) = &parameters.methanol_chemical {
            methanol_mix_map = methanol_mix(model, &next, methanol, year)?;
            rankings.update(
                model,
                pathway,
                &parameters.methanol_dependent_chemicals,
                year + 1,
                &methanol_mix_map,
            )?;
        }

        ledger.roll_forward(year);
        stacks.insert(year + 1, next);
    }
    update_methanol_availability(
        model,
        &stacks[&parameters.end_year],
        &mut ledger,
        parameters.end_year,
    );

    info!(
        "{scenario}: simulation complete with {} transitions",
        registry.len()
    );

    Ok(ScenarioOutcome {
        scenario,
        stacks,
        ledger,
        registry,
        rankings,
    })
}

/// Every scenario configured for a model
pub fn scenarios(parameters: &ModelParameters) -> Vec<Scenario> {
    parameters
        .pathways
        .iter()
        .cartesian_product(&parameters.sensitivities)
        .map(|(pathway, sensitivity)| Scenario {
            pathway: *pathway,
            sensitivity: *sensitivity,
        })
        .collect()
}

/// Run every scenario for a model and write the results.
///
/// Scenarios run in parallel, each loading its own copy of the model.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model input files
/// * `scenarios` - The scenarios to run
/// * `output_path` - Folder to write results to
/// * `debug_model` - Whether to write additional debugging files
pub fn run(
    model_dir: &Path,
    scenarios: &[Scenario],
    output_path: &Path,
    debug_model: bool,
) -> Result<()> {
    scenarios
        .par_iter()
        .map(|scenario| {
            let (model, initial_stack) = load_model(model_dir, scenario.sensitivity)?;
            let outcome = simulate(&model, initial_stack, *scenario)?;

            let scenario_dir = create_scenario_output_directory(output_path, scenario)?;
            let mut writer = DataWriter::create(&scenario_dir, debug_model)?;
            writer.write_outcome(&outcome, model.parameters.minimum_age_decommission)?;
            writer.flush()?;
            info!("{scenario}: results written to {}", scenario_dir.display());

            Ok(())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{model, smr_stack};
    use crate::scenario::Sensitivity;
    use crate::technology::TechnologyTier;
    use crate::units::Dimensionless;
    use rstest::rstest;

    fn scenario(pathway: Pathway) -> Scenario {
        Scenario {
            pathway,
            sensitivity: Sensitivity::Default,
        }
    }

    #[rstest]
    fn test_chemical_order_methanol_last(mut model: Model) {
        let parameters = &mut model.parameters;
        parameters.chemicals = ["Methanol", "Ammonia", "Ethylene", "Propylene"]
            .into_iter()
            .map(ChemicalID::from)
            .collect();
        parameters.methanol_chemical = Some("Methanol".into());

        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            let order = chemical_order(parameters, &mut rng);
            assert_eq!(order.len(), 4);
            assert_eq!(order.last(), Some(&"Methanol".into()));
        }
    }

    #[rstest]
    fn test_simulate_meets_growing_demand(mut model: Model) {
        model.parameters.regional_cap = Dimensionless(1.0);
        let initial = smr_stack(&model, 5, 5, 2000);
        let outcome = simulate(&model, initial, scenario(Pathway::BusinessAsUsual)).unwrap();
        let ammonia = "Ammonia".into();

        assert_eq!(outcome.stacks.len(), 11);
        for year in 2020..2030 {
            // Plants are 1 Mt/yr, so demand is met exactly
            let demand = model.demand(&ammonia, year).unwrap();
            assert_eq!(
                outcome.stacks[&(year + 1)].yearly_volume(&ammonia, PlantFilter::new()),
                demand
            );
        }

        // Cheapest technology is always chosen for business as usual
        assert!(
            outcome
                .stacks
                .values()
                .flat_map(PlantStack::iter)
                .all(|plant| plant.technology_id() == &"SMR".into())
        );
        // Initial plants already meet demand in the first year
        assert_eq!(outcome.registry.count(2020, TransitionType::NewBuild), 0);
        assert_eq!(outcome.registry.count(2021, TransitionType::NewBuild), 1);
    }

    #[rstest]
    fn test_simulate_retrofits_and_removes_fossil(mut model: Model) {
        model.parameters.regional_cap = Dimensionless(1.0);
        model.parameters.retrofit_cap = Dimensionless(0.2);
        let initial = smr_stack(&model, 5, 5, 2000);
        let outcome = simulate(&model, initial, scenario(Pathway::MostEconomic)).unwrap();
        let ammonia = "Ammonia".into();

        // SMR plants are replaced by electrolysers up to the retrofit budget of 2 Mt/yr
        let electrolyser = "Electrolyser".into();
        assert_eq!(
            outcome.stacks[&2021]
                .number_of_plants(&ammonia, PlantFilter::new().technology(&electrolyser)),
            2
        );
        assert_eq!(outcome.registry.count(2020, TransitionType::Decommission), 2);

        // All unabated fossil plants are removed in the final year
        let last = &outcome.stacks[&2030];
        assert!(last.unabated_fossil_plants(&ammonia).is_empty());
        assert!(last.iter().all(|plant| plant.tier() != TechnologyTier::Initial));
    }

    #[rstest]
    fn test_simulate_is_deterministic(mut model: Model) {
        model.parameters.regional_cap = Dimensionless(1.0);
        let run = || {
            let initial = smr_stack(&model, 5, 5, 2000);
            let outcome = simulate(&model, initial, scenario(Pathway::MostEconomic)).unwrap();
            outcome
                .registry
                .iter()
                .map(|record| {
                    (
                        record.year,
                        record.transition_type,
                        record.region_id.clone(),
                        record.destination_technology.clone(),
                    )
                })
                .collect_vec()
        };

        assert_eq!(run(), run());
    }

    #[rstest]
    fn test_simulate_plant_ids_unique(mut model: Model) {
        model.parameters.regional_cap = Dimensionless(1.0);
        let initial = smr_stack(&model, 5, 5, 2000);
        let outcome = simulate(&model, initial, scenario(Pathway::FastAbatement)).unwrap();
        let plants = outcome
            .stacks
            .values()
            .flat_map(PlantStack::iter)
            .map(|plant| (plant.id, plant.technology_id().clone(), plant.start_year))
            .unique()
            .collect_vec();

        // An ID always refers to the same plant
        assert_eq!(
            plants.iter().map(|(id, _, _)| id).unique().count(),
            plants.len()
        );
    }

    #[test]
    fn test_no_eligible_plant_display() {
        let err = NoEligiblePlant {
            chemical: "Ammonia".into(),
            year: 2030,
        };
        assert_eq!(
            err.to_string(),
            "No plant left to decommission for Ammonia in 2030"
        );
    }
}
