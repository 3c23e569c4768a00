//! Decommissioning of plants: forced decommission rates, the final fossil phase-out and
//! following falling demand.
use super::select::select_best;
use super::{NoEligiblePlant, Phase};
use crate::constraints::owns_chemical;
use crate::model::ModelScope;
use crate::plant::Plant;
use crate::ranking::RankPurpose;
use crate::stack::PlantFilter;
use crate::technology::TechnologyID;
use crate::units::Volume;
use anyhow::Result;
use log::debug;
use std::rc::Rc;

/// Choose a plant to decommission.
///
/// The worst-ranked (technology, region) combination with an eligible plant is chosen, then the
/// oldest eligible plant in it.
///
/// # Arguments
///
/// * `phase` - The current step
/// * `technology_id` - Restrict to plants of this technology
/// * `old_only` - Restrict to plants past the minimum decommissioning age
fn select_plant_to_decommission(
    phase: &mut Phase,
    technology_id: Option<&TechnologyID>,
    old_only: bool,
) -> Result<Rc<Plant>> {
    let model = phase.model;
    let year = phase.year;
    let chemical_id = phase.chemical_id;
    let minimum_age = phase.parameters().minimum_age_decommission;

    let old_plants;
    let stack = if old_only {
        old_plants = phase.next.old_plants(year, minimum_age);
        &old_plants
    } else {
        &*phase.next
    };
    let present = stack.unique_technologies(chemical_id);

    let mut options = Vec::new();
    for ranked in phase
        .rankings
        .get(RankPurpose::Decommission, chemical_id, year)
    {
        let candidate = &ranked.candidate;
        if technology_id.is_some_and(|id| *id != candidate.destination)
            || !present.contains(&(candidate.destination.clone(), candidate.region_id.clone()))
            || !owns_chemical(model.technology(&candidate.destination)?, chemical_id)
        {
            continue;
        }

        let plant = stack.oldest_in_group(
            chemical_id,
            &candidate.destination,
            &candidate.region_id,
            |_| true,
        );
        if let Some(plant) = plant {
            options.push((ranked.rank, Rc::clone(plant)));
        }
    }

    select_best(options, phase.rng).ok_or_else(|| {
        NoEligiblePlant {
            chemical: chemical_id.to_string(),
            year,
        }
        .into()
    })
}

/// Apply forced decommission rates to each technology making the chemical.
///
/// A technology loses the given share of its volume each year. Once its remaining volume is no
/// more than one typical plant, all of its plants are retired.
fn forced_decommission(phase: &mut Phase) -> Result<()> {
    let model = phase.model;
    let typical = phase.parameters().typical_plant_capacity;

    for technology in model.technologies_producing(phase.chemical_id) {
        if !owns_chemical(technology, phase.chemical_id) {
            continue;
        }
        let rate = model.decommission_rate(&technology.id, phase.year);
        if rate.value() <= 0.0 {
            continue;
        }

        let mut to_remove = phase
            .next
            .technology_stack(&technology.id)
            .yearly_volume(phase.chemical_id, PlantFilter::new())
            * rate;
        let filter = PlantFilter::new().technology(&technology.id);
        loop {
            let remaining = phase.next.yearly_volume(phase.chemical_id, filter);
            if to_remove <= Volume(0.0) && remaining > typical {
                break;
            }

            let plant = match select_plant_to_decommission(phase, Some(&technology.id), false) {
                Ok(plant) => plant,
                Err(err) if err.is::<NoEligiblePlant>() => {
                    debug!("{err}");
                    break;
                }
                Err(err) => return Err(err),
            };
            to_remove -= plant.yearly_volume(phase.chemical_id);
            phase.decommission_plant(&plant)?;
        }
    }

    Ok(())
}

/// Decommission plants for a chemical.
///
/// Forced decommission rates apply first, then, in the final simulated year, any remaining
/// unabated fossil plants are removed. Finally, plants are removed while the surplus over demand
/// exceeds the volume of a typical plant.
pub fn decommission(phase: &mut Phase) -> Result<()> {
    let parameters = phase.parameters();
    let pathway = phase.pathway;
    let year = phase.year;

    if !pathway.is_business_as_usual()
        && parameters
            .forced_decommission_start(pathway)
            .is_some_and(|start| year >= start)
    {
        forced_decommission(phase)?;
    }

    if year == parameters.end_year - 1 && !pathway.is_business_as_usual() {
        for plant in phase.next.unabated_fossil_plants(phase.chemical_id) {
            phase.decommission_plant(&plant)?;
        }
    }

    let old_only =
        parameters.is_age_dependent(phase.chemical_id) && parameters.scope == ModelScope::World;
    let mut surplus = phase.volume() - phase.demand()?;
    while surplus > parameters.typical_plant_capacity {
        let plant = match select_plant_to_decommission(phase, None, old_only) {
            Ok(plant) => plant,
            Err(err) if err.is::<NoEligiblePlant>() => {
                debug!("{err}");
                break;
            }
            Err(err) => return Err(err),
        };

        surplus -= plant.yearly_volume(phase.chemical_id);
        phase.decommission_plant(&plant)?;
    }

    Ok(())
}
