//! Generation of transition candidates from cost and emissions data.
use super::{RankPurpose, RetrofitKind, TransitionCandidate};
use crate::chemical::ChemicalID;
use crate::economics::{MethanolMixMap, TechnologyEmissions};
use crate::emissions::{InputCategory, upstream_emissions};
use crate::model::Model;
use crate::region::RegionID;
use crate::technology::Technology;
use crate::units::MoneyPerTonne;
use anyhow::Result;
use indexmap::IndexMap;
use std::rc::Rc;

/// The cost and emissions of operating a technology in a region and year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attributes {
    /// Levelised cost of production
    pub lcox: MoneyPerTonne,
    /// Emissions per tonne of product
    pub emissions: TechnologyEmissions,
}

/// Add the cost and upstream emissions of methanol feedstock to a methanol consumer's attributes.
///
/// Technologies which don't consume methanol, or whose methanol grade has no known supply mix
/// yet, are left unchanged.
pub fn with_methanol_feedstock(
    model: &Model,
    technology: &Technology,
    mut attributes: Attributes,
    methanol_mix: &MethanolMixMap,
) -> Attributes {
    if !technology.consumes_methanol {
        return attributes;
    }
    let Some(feedstock) = model.methanol_feedstock.get(&technology.id) else {
        return attributes;
    };
    let Some(mix) = methanol_mix.get(&feedstock.methanol_type) else {
        return attributes;
    };

    attributes.lcox += mix.lcox * feedstock.intensity;
    attributes.emissions.scope_3_upstream += upstream_emissions(
        feedstock.intensity,
        mix.emissions,
        feedstock.emissions_share,
        InputCategory::RawMaterial,
    );
    attributes
}

/// The attributes of a greenfield plant, or `None` if there is no greenfield cost for it
pub fn greenfield_attributes(
    model: &Model,
    chemical_id: &ChemicalID,
    technology: &Technology,
    region_id: &RegionID,
    year: u32,
    methanol_mix: &MethanolMixMap,
) -> Result<Option<Attributes>> {
    let Some(lcox) = model.cost(chemical_id, None, &technology.id, region_id, year) else {
        return Ok(None);
    };
    let emissions = model.emissions(chemical_id, &technology.id, region_id, year)?;
    let attributes = Attributes { lcox, emissions };

    Ok(Some(with_methanol_feedstock(
        model,
        technology,
        attributes,
        methanol_mix,
    )))
}

type Greenfield = IndexMap<(usize, RegionID), (Rc<Technology>, Attributes)>;

/// Greenfield attributes for every technology producing the chemical in every region
fn all_greenfield(
    model: &Model,
    chemical_id: &ChemicalID,
    year: u32,
    methanol_mix: &MethanolMixMap,
) -> Result<Greenfield> {
    let mut greenfield = Greenfield::new();
    for (index, technology) in model.technologies_producing(chemical_id).enumerate() {
        for region_id in model.iter_regions() {
            if let Some(attributes) = greenfield_attributes(
                model,
                chemical_id,
                technology,
                region_id,
                year,
                methanol_mix,
            )? {
                greenfield.insert(
                    (index, region_id.clone()),
                    (Rc::clone(technology), attributes),
                );
            }
        }
    }

    Ok(greenfield)
}

/// Emissions of `destination` relative to `origin`
fn emissions_delta(
    destination: &TechnologyEmissions,
    origin: &TechnologyEmissions,
) -> TechnologyEmissions {
    TechnologyEmissions {
        scope_1_2: destination.scope_1_2 - origin.scope_1_2,
        scope_3_upstream: destination.scope_3_upstream - origin.scope_3_upstream,
    }
}

#[allow(clippy::too_many_arguments)]
fn make_candidate(
    chemical_id: &ChemicalID,
    origin: Option<&Technology>,
    destination: &Technology,
    region_id: &RegionID,
    year: u32,
    kind: RetrofitKind,
    lcox: MoneyPerTonne,
    emissions: &TechnologyEmissions,
) -> TransitionCandidate {
    TransitionCandidate {
        chemical_id: chemical_id.clone(),
        origin: origin.map(|technology| technology.id.clone()),
        origin_tier: origin.map(|technology| technology.tier),
        destination: destination.id.clone(),
        destination_tier: destination.tier,
        region_id: region_id.clone(),
        year,
        kind,
        lcox,
        emissions_scope_1_2: emissions.scope_1_2,
        emissions_scope_3_upstream: emissions.scope_3_upstream,
        emissions_scope_1_2_3_upstream: emissions.scope_1_2_3_upstream(),
    }
}

/// Build the unranked candidates for a purpose, chemical and year.
///
/// # Arguments
///
/// * `model` - The model
/// * `purpose` - The decision the candidates are for
/// * `chemical_id` - The chemical
/// * `year` - The year
/// * `methanol_mix` - The current cost and emissions of each methanol grade
pub fn build_candidates(
    model: &Model,
    purpose: RankPurpose,
    chemical_id: &ChemicalID,
    year: u32,
    methanol_mix: &MethanolMixMap,
) -> Result<Vec<TransitionCandidate>> {
    let greenfield = all_greenfield(model, chemical_id, year, methanol_mix)?;

    let mut candidates = Vec::new();
    match purpose {
        RankPurpose::NewBuild | RankPurpose::Decommission => {
            for ((_, region_id), (technology, attributes)) in &greenfield {
                candidates.push(make_candidate(
                    chemical_id,
                    None,
                    technology,
                    region_id,
                    year,
                    RetrofitKind::Normal,
                    attributes.lcox,
                    &attributes.emissions,
                ));
            }
        }
        RankPurpose::Retrofit => {
            candidates.extend(normal_retrofits(model, chemical_id, year, methanol_mix)?);

            for ((origin_index, region_id), (origin, origin_attributes)) in &greenfield {
                for ((destination_index, destination_region), (destination, attributes)) in
                    &greenfield
                {
                    if destination_region != region_id || destination_index == origin_index {
                        continue;
                    }
                    candidates.push(make_candidate(
                        chemical_id,
                        Some(origin),
                        destination,
                        region_id,
                        year,
                        RetrofitKind::DecommissionNewBuild,
                        attributes.lcox,
                        &emissions_delta(&attributes.emissions, &origin_attributes.emissions),
                    ));
                }
            }
        }
    }

    Ok(candidates)
}

/// Candidates for converting plants in place along the permitted retrofit routes
fn normal_retrofits(
    model: &Model,
    chemical_id: &ChemicalID,
    year: u32,
    methanol_mix: &MethanolMixMap,
) -> Result<Vec<TransitionCandidate>> {
    let Some(routes) = model.retrofit_routes.get(chemical_id) else {
        return Ok(Vec::new());
    };

    let mut candidates = Vec::new();
    for (origin_id, destination_id) in routes {
        let origin = model.technology(origin_id)?;
        let destination = model.technology(destination_id)?;
        for region_id in model.iter_regions() {
            let Some(lcox) =
                model.cost(chemical_id, Some(origin_id), destination_id, region_id, year)
            else {
                continue;
            };

            let destination_attributes = with_methanol_feedstock(
                model,
                destination,
                Attributes {
                    lcox,
                    emissions: model.emissions(chemical_id, destination_id, region_id, year)?,
                },
                methanol_mix,
            );
            let origin_attributes = with_methanol_feedstock(
                model,
                origin,
                Attributes {
                    lcox,
                    emissions: model.emissions(chemical_id, origin_id, region_id, year)?,
                },
                methanol_mix,
            );

            candidates.push(make_candidate(
                chemical_id,
                Some(origin),
                destination,
                region_id,
                year,
                RetrofitKind::Normal,
                destination_attributes.lcox,
                &emissions_delta(
                    &destination_attributes.emissions,
                    &origin_attributes.emissions,
                ),
            ));
        }
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economics::{MethanolFeedstock, MethanolMix};
    use crate::chemical::MethanolType;
    use crate::fixture::{assert_error, model};
    use crate::technology::TechnologyID;
    use crate::units::{Dimensionless, EmissionsPerTonne};
    use float_cmp::assert_approx_eq;
    use itertools::Itertools;
    use rstest::rstest;
    use std::collections::HashMap;

    #[rstest]
    fn test_new_build_candidates(model: Model) {
        let candidates = build_candidates(
            &model,
            RankPurpose::NewBuild,
            &"Ammonia".into(),
            2030,
            &HashMap::new(),
        )
        .unwrap();

        // Three technologies in two regions
        assert_eq!(candidates.len(), 6);
        assert!(candidates.iter().all(|candidate| candidate.origin.is_none()));
        let smr = candidates
            .iter()
            .find(|candidate| candidate.destination == "SMR".into())
            .unwrap();
        assert_eq!(smr.lcox, MoneyPerTonne(300.0));
        assert_approx_eq!(f64, smr.emissions_scope_1_2_3_upstream.value(), 2.5);
    }

    #[rstest]
    fn test_retrofit_candidates(model: Model) {
        let candidates = build_candidates(
            &model,
            RankPurpose::Retrofit,
            &"Ammonia".into(),
            2030,
            &HashMap::new(),
        )
        .unwrap();

        let (normal, replacements): (Vec<_>, Vec<_>) = candidates
            .iter()
            .partition(|candidate| candidate.kind == RetrofitKind::Normal);

        // One route (SMR -> SMR + CCS) in two regions
        assert_eq!(normal.len(), 2);
        let retrofit = normal[0];
        assert_eq!(retrofit.origin, Some("SMR".into()));
        assert_eq!(retrofit.lcox, MoneyPerTonne(350.0));
        // Retrofits are ranked by the change in emissions
        assert_approx_eq!(f64, retrofit.emissions_scope_1_2.value(), -1.5);

        // Ordered pairs of distinct technologies in each region
        assert_eq!(replacements.len(), 2 * 3 * 2);
        assert!(
            replacements
                .iter()
                .all(|candidate| candidate.origin.as_ref() != Some(&candidate.destination))
        );
        assert_eq!(
            replacements
                .iter()
                .map(|candidate| &candidate.region_id)
                .unique()
                .count(),
            2
        );
    }

    #[rstest]
    fn test_missing_emissions_is_error(mut model: Model) {
        model.emissions.retain(|(_, technology_id, _, _), _| *technology_id != "SMR".into());
        assert_error!(
            build_candidates(
                &model,
                RankPurpose::NewBuild,
                &"Ammonia".into(),
                2030,
                &HashMap::new(),
            ),
            "No emissions given for SMR producing Ammonia in Europe in 2030"
        );
    }

    #[rstest]
    fn test_methanol_feedstock_adjustment(mut model: Model) {
        let technology = Rc::new(Technology {
            consumes_methanol: true,
            ..Technology::clone(&model.technologies[&TechnologyID::from("SMR")])
        });
        model.methanol_feedstock.insert(
            technology.id.clone(),
            MethanolFeedstock {
                methanol_type: MethanolType::Green,
                intensity: Dimensionless(2.0),
                emissions_share: Dimensionless(0.25),
            },
        );
        let attributes = Attributes {
            lcox: MoneyPerTonne(100.0),
            emissions: TechnologyEmissions::default(),
        };

        // No mix known yet
        assert_eq!(
            with_methanol_feedstock(&model, &technology, attributes, &HashMap::new()),
            attributes
        );

        let mix = HashMap::from([(
            MethanolType::Green,
            MethanolMix {
                lcox: MoneyPerTonne(50.0),
                emissions: EmissionsPerTonne(-1.0),
            },
        )]);
        let adjusted = with_methanol_feedstock(&model, &technology, attributes, &mix);
        assert_approx_eq!(f64, adjusted.lcox.value(), 200.0);
        // Biogenic raw material: 2 * -1 * (1 - 0.25)
        assert_approx_eq!(f64, adjusted.emissions.scope_3_upstream.value(), -1.5);
    }
}
