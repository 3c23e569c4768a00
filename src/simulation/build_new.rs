//! Building new plants to close the gap between production and demand.
use super::Phase;
use super::select::select_best;
use crate::ranking::{RankPurpose, RankedCandidate};
use crate::units::Volume;
use anyhow::Result;
use log::{debug, warn};

/// The new build candidates which pass the filters that don't depend on the state of the stack
fn prefiltered_candidates<'a>(phase: &Phase<'a>) -> Result<Vec<&'a RankedCandidate>> {
    let constraints = phase.constraints();
    let mut candidates = Vec::new();
    for ranked in phase
        .rankings
        .get(RankPurpose::NewBuild, phase.chemical_id, phase.year)
    {
        if constraints.destination_allowed(&ranked.candidate)?
            && constraints.new_build_allowed(&ranked.candidate)?
        {
            candidates.push(ranked);
        }
    }

    Ok(candidates)
}

/// Build new plants for a chemical while production falls short of demand
pub fn build_new(phase: &mut Phase) -> Result<()> {
    let candidates = prefiltered_candidates(phase)?;
    let mut gap = phase.demand()? - phase.volume();

    while gap > Volume(0.0) {
        let view: &Phase = phase;
        let constraints = view.constraints();
        let mut options = Vec::new();
        for ranked in &candidates {
            let candidate = &ranked.candidate;
            if constraints.has_headroom(candidate, view.ledger)?
                && constraints.within_regional_cap(candidate, view.next)
                && constraints.within_ramp_rate(candidate, view.previous, view.next)
            {
                options.push((ranked.rank, *ranked));
            }
        }

        let Some(ranked) = select_best(options, &mut *phase.rng) else {
            warn!(
                "No more new builds available for {} in {}: demand is {gap} Mt/yr short",
                phase.chemical_id, phase.year
            );
            break;
        };

        let plant = phase.create_plant(&ranked.candidate, None)?;
        gap -= plant.yearly_volume(phase.chemical_id);
        phase.build_plant(plant)?;
    }

    debug!(
        "{} production in {} is {} Mt/yr",
        phase.chemical_id,
        phase.year + 1,
        phase.volume()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemical::{ChemicalID, Material, MaterialUsage};
    use crate::fixture::{model, smr_stack};
    use crate::ledger::{AvailabilityCap, AvailabilityLedger, LedgerScope};
    use crate::model::{BuildExclusion, Model, ModelScope};
    use crate::plant::PlantSpec;
    use crate::ranking::RankingTables;
    use crate::scenario::Pathway;
    use crate::stack::{PlantFilter, PlantStack};
    use crate::transition::{TransitionRegistry, TransitionType};
    use crate::units::{Dimensionless, Megatonnes, Tonnes};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::rc::Rc;

    fn run_build_new(
        model: &Model,
        pathway: Pathway,
        year: u32,
        previous: &PlantStack,
        mut ledger: AvailabilityLedger,
    ) -> (PlantStack, TransitionRegistry) {
        let rankings = RankingTables::build(model, pathway, &HashMap::new()).unwrap();
        let chemical_id = ChemicalID::from("Ammonia");
        let mut next = previous.copy_forward();
        let mut registry = TransitionRegistry::new();
        let mut rng = StdRng::seed_from_u64(0);
        let mut next_plant_id = 100;
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
        build_new(&mut phase).unwrap();

        (next, registry)
    }

    fn count(stack: &PlantStack, technology_id: &str, region_id: &str) -> usize {
        stack.number_of_plants(
            &"Ammonia".into(),
            PlantFilter::new()
                .technology(&technology_id.into())
                .region(&region_id.into()),
        )
    }

    #[rstest]
    fn test_build_new_closes_gap(mut model: Model) {
        model.parameters.scope = ModelScope::Regional;

        // Demand is 15 Mt/yr in 2025
        let previous = smr_stack(&model, 5, 5, 2000);
        let (next, registry) = run_build_new(
            &model,
            Pathway::MostEconomic,
            2025,
            &previous,
            AvailabilityLedger::default(),
        );
        assert_eq!(next.len(), 15);
        assert_eq!(registry.count(2025, TransitionType::NewBuild), 5);

        // Until 2025, new builds are ranked on cost alone
        assert!(
            next.new_this_year()
                .all(|plant| plant.technology_id() == &"SMR".into())
        );
        assert!(next.new_this_year().all(|plant| plant.start_year == 2025));
    }

    #[rstest]
    fn test_build_new_prefers_higher_tier_later(mut model: Model) {
        model.parameters.scope = ModelScope::Regional;
        let previous = smr_stack(&model, 10, 10, 2000);
        let (next, _) = run_build_new(
            &model,
            Pathway::MostEconomic,
            2027,
            &previous,
            AvailabilityLedger::default(),
        );

        // Demand is 17 Mt/yr, so there's no gap
        assert_eq!(next.len(), 20);

        let previous = smr_stack(&model, 5, 5, 2000);
        let (next, _) = run_build_new(
            &model,
            Pathway::MostEconomic,
            2027,
            &previous,
            AvailabilityLedger::default(),
        );
        assert_eq!(next.len(), 17);
        assert!(
            next.new_this_year()
                .all(|plant| plant.technology_id() == &"Electrolyser".into())
        );
    }

    #[rstest]
    fn test_build_new_regional_cap(mut model: Model) {
        // Europe already holds 60% of the capacity, above the cap, so only China can grow
        model.parameters.regional_cap = Dimensionless(0.5);
        let previous = smr_stack(&model, 6, 4, 2000);
        let (next, _) = run_build_new(
            &model,
            Pathway::BusinessAsUsual,
            2022,
            &previous,
            AvailabilityLedger::default(),
        );
        assert_eq!(next.len(), 12);
        assert_eq!(count(&next, "SMR", "China"), 6);
    }

    #[rstest]
    fn test_build_new_exclusion(mut model: Model) {
        model.parameters.scope = ModelScope::Regional;
        model.parameters.build_exclusions = vec![BuildExclusion {
            technology: "SMR".into(),
            region: "Europe".into(),
        }];
        let previous = smr_stack(&model, 5, 5, 2000);
        let (next, _) = run_build_new(
            &model,
            Pathway::BusinessAsUsual,
            2024,
            &previous,
            AvailabilityLedger::default(),
        );
        assert_eq!(count(&next, "SMR", "Europe"), 5);
        assert_eq!(count(&next, "SMR", "China"), 9);
    }

    #[rstest]
    fn test_build_new_ramp_rate(mut model: Model) {
        model.parameters.scope = ModelScope::Regional;
        model.parameters.ramp_up_allowance = 3;
        let previous = smr_stack(&model, 5, 5, 2000);
        let (next, registry) = run_build_new(
            &model,
            Pathway::MostEconomic,
            2030,
            &previous,
            AvailabilityLedger::default(),
        );

        // Electrolysers can only grow by three plants from nothing and SMR + CCS likewise; the
        // rest of the 10 Mt/yr gap is left unmet
        assert_eq!(registry.count(2030, TransitionType::NewBuild), 6);
        assert_eq!(next.len(), 16);
    }

    #[rstest]
    fn test_build_new_material_headroom(mut model: Model) {
        model.parameters.scope = ModelScope::Regional;
        let spec = Rc::new(PlantSpec {
            lifetime: 30,
            capacity_factor: Dimensionless(1.0),
            usage: MaterialUsage {
                biomass: Tonnes(1e6),
                ..Default::default()
            },
        });
        for region_id in ["Europe", "China"] {
            model
                .plant_specs
                .insert(("SMR".into(), region_id.into(), 2024), Rc::clone(&spec));
        }
        let caps = ["Europe", "China"].map(|region_id| AvailabilityCap {
            material: Material::Biomass,
            scope: LedgerScope::Region(region_id.into()),
            chemical_id: None,
            year: 2024,
            cap: Megatonnes(1.5),
        });

        // Each region's biomass only allows one more SMR plant
        let previous = smr_stack(&model, 5, 5, 2000);
        let (next, _) = run_build_new(
            &model,
            Pathway::BusinessAsUsual,
            2024,
            &previous,
            AvailabilityLedger::new(&caps),
        );
        assert_eq!(count(&next, "SMR", "Europe"), 6);
        assert_eq!(count(&next, "SMR", "China"), 6);
        assert_eq!(next.len(), 14);
    }
}
