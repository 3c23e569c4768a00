//! Retrofitting of plants to cleaner technologies, both to clear material deficits and, up to the
//! retrofit budget, to decarbonise the fleet.
use super::Phase;
use super::select::select_best;
use crate::constraints::passes_vintage;
use crate::ledger::{Deficit, LedgerScope, covers_usage};
use crate::model::ModelScope;
use crate::plant::Plant;
use crate::ranking::{RankPurpose, RankedCandidate};
use crate::stack::PlantStack;
use crate::technology::{TechnologyID, TechnologyTier};
use crate::units::{Megatonnes, Tonnes, Volume};
use anyhow::Result;
use indexmap::IndexSet;
use log::debug;
use std::rc::Rc;

/// The retrofit candidates which pass the filters that don't depend on the state of the stack
fn prefiltered_candidates<'a>(phase: &Phase<'a>) -> Result<Vec<&'a RankedCandidate>> {
    let constraints = phase.constraints();
    let transition_origins_allowed =
        phase.year >= phase.parameters().second_retrofit_earliest_year;

    let mut candidates = Vec::new();
    for ranked in phase
        .rankings
        .get(RankPurpose::Retrofit, phase.chemical_id, phase.year)
    {
        let candidate = &ranked.candidate;
        if !transition_origins_allowed && candidate.origin_tier == Some(TechnologyTier::Transition)
        {
            continue;
        }
        if constraints.destination_allowed(candidate)? {
            candidates.push(ranked);
        }
    }

    Ok(candidates)
}

/// Whether either end of a candidate is a methanol-consuming technology
fn involves_methanol_consumer(phase: &Phase, ranked: &RankedCandidate) -> Result<bool> {
    let candidate = &ranked.candidate;
    let consumes = |technology_id: &TechnologyID| -> Result<bool> {
        Ok(phase.model.technology(technology_id)?.consumes_methanol)
    };

    Ok(consumes(&candidate.destination)?
        || candidate
            .origin
            .as_ref()
            .map(consumes)
            .transpose()?
            .unwrap_or(false))
}

/// The plant in `stack` a candidate would retrofit, if any: the oldest plant of the origin
/// technology in the region which isn't protected by its age and satisfies `predicate`
fn plant_to_retrofit<'b, F>(
    phase: &Phase,
    stack: &'b PlantStack,
    ranked: &RankedCandidate,
    predicate: F,
) -> Option<&'b Rc<Plant>>
where
    F: Fn(&Plant) -> bool,
{
    let candidate = &ranked.candidate;
    let origin = candidate.origin.as_ref()?;
    let parameters = phase.parameters();
    stack.oldest_in_group(phase.chemical_id, origin, &candidate.region_id, |plant| {
        passes_vintage(plant, phase.year, parameters) && predicate(plant)
    })
}

/// Retrofit plants which consume a material used beyond its cap, until the deficit is cleared.
///
/// Methanol consumers may switch feedstock here.
fn clear_deficit(
    phase: &mut Phase,
    candidates: &[&RankedCandidate],
    deficit: &Deficit,
) -> Result<()> {
    let material = deficit.material;
    let uses_material = |plant: &Plant| {
        plant.usage.get(material) > Tonnes(0.0)
            && LedgerScope::for_material(material, &plant.region_id) == deficit.scope
    };

    let origins: IndexSet<TechnologyID> = phase
        .next
        .primary_producers_of(phase.chemical_id)
        .filter(|plant| uses_material(plant))
        .map(|plant| plant.technology_id().clone())
        .collect();

    let mut remaining = deficit.remaining;
    for origin in &origins {
        while remaining < Megatonnes(0.0) {
            let view: &Phase = phase;
            let constraints = view.constraints();
            let options = candidates
                .iter()
                .filter(|ranked| ranked.candidate.origin.as_ref() == Some(origin))
                .filter(|ranked| {
                    constraints.within_ramp_rate(&ranked.candidate, view.previous, view.next)
                })
                .filter_map(|ranked| {
                    plant_to_retrofit(view, view.next, ranked, uses_material)
                        .map(|plant| (ranked.rank, (*ranked, Rc::clone(plant))))
                })
                .collect::<Vec<_>>();

            let Some((ranked, plant)) = select_best(options, &mut *phase.rng) else {
                debug!(
                    "No more forced retrofits of {origin} available for {} in {}",
                    phase.chemical_id, phase.year
                );
                break;
            };

            let usage = plant.usage.get(material);
            let used = phase
                .ledger
                .used(material, &deficit.scope, phase.year, phase.chemical_id);
            if !covers_usage(used, usage) {
                debug!("Not enough {material:?} recorded as used to retrofit plant {}", plant.id);
                break;
            }

            phase.retrofit_plant(&plant, &ranked.candidate)?;
            remaining += usage.to_megatonnes();
        }
    }

    if remaining < Megatonnes(0.0) {
        debug!(
            "{material:?} in {} remains over its cap by {} Mt in {}",
            deficit.scope,
            Megatonnes(0.0) - remaining,
            phase.year
        );
    }

    Ok(())
}

/// Retrofit plants up to the retrofit budget.
///
/// For age-dependent chemicals in a world model, only plants younger than the minimum
/// decommissioning age are considered.
fn capped_retrofit(phase: &mut Phase, candidates: &[&RankedCandidate]) -> Result<()> {
    let mut eligible = Vec::new();
    for ranked in candidates {
        if !involves_methanol_consumer(phase, ranked)? {
            eligible.push(*ranked);
        }
    }

    let parameters = phase.parameters();
    let new_plants_only =
        parameters.is_age_dependent(phase.chemical_id) && parameters.scope == ModelScope::World;
    let mut budget = phase.volume() * parameters.retrofit_cap;
    while budget > Volume(0.0) {
        let view: &Phase = phase;
        let constraints = view.constraints();
        let new_plants;
        let stack = if new_plants_only {
            new_plants = view
                .next
                .new_plants(view.year, parameters.minimum_age_decommission);
            &new_plants
        } else {
            &*view.next
        };

        let mut options = Vec::new();
        for ranked in &eligible {
            if !constraints.has_headroom(&ranked.candidate, view.ledger)?
                || !constraints.within_ramp_rate(&ranked.candidate, view.previous, view.next)
            {
                continue;
            }
            if let Some(plant) = plant_to_retrofit(view, stack, ranked, |_| true) {
                options.push((ranked.rank, (*ranked, Rc::clone(plant))));
            }
        }

        let Some((ranked, plant)) = select_best(options, &mut *phase.rng) else {
            debug!(
                "No more retrofits available for {} in {}",
                phase.chemical_id, phase.year
            );
            break;
        };

        budget -= plant.yearly_volume(phase.chemical_id);
        phase.retrofit_plant(&plant, &ranked.candidate)?;
    }

    Ok(())
}

/// Retrofit plants for a chemical.
///
/// Plants consuming materials used beyond their caps are retrofitted first. Further plants are
/// then retrofitted until the retrofitted volume reaches the retrofit budget.
pub fn retrofit(phase: &mut Phase) -> Result<()> {
    let candidates = prefiltered_candidates(phase)?;

    for deficit in phase.ledger.deficits(phase.year, phase.chemical_id) {
        clear_deficit(phase, &candidates, &deficit)?;
    }

    capped_retrofit(phase, &candidates)
}
