//! Constraint filters applied to transition candidates before selection.
//!
//! Each filter is an independent predicate, so they can be combined in any order.
use crate::chemical::ChemicalID;
use crate::ledger::AvailabilityLedger;
use crate::model::{Model, ModelParameters, ModelScope};
use crate::plant::Plant;
use crate::ranking::TransitionCandidate;
use crate::region::RegionID;
use crate::scenario::Pathway;
use crate::stack::{PlantFilter, PlantStack};
use crate::technology::{Technology, TechnologyID, TechnologyTier};
use crate::units::{Capacity, Dimensionless};
use anyhow::Result;
use log::trace;

/// Whether a technology may be chosen for a chemical in a year
pub fn is_available(technology: &Technology, chemical_id: &ChemicalID, year: u32) -> bool {
    technology.is_available(chemical_id, year)
}

/// Whether the chemical is the technology's primary chemical.
///
/// Plants are only built or retrofitted by their primary chemical, so that byproduct capacity is
/// not counted twice.
pub fn owns_chemical(technology: &Technology, chemical_id: &ChemicalID) -> bool {
    technology.is_primary_for(chemical_id)
}

/// Whether a technology is permitted by the pathway's restrictions on fossil technologies
pub fn passes_fossil_filter(
    technology: &Technology,
    pathway: Pathway,
    year: u32,
    parameters: &ModelParameters,
) -> bool {
    match pathway {
        Pathway::NoFossilStrict if year >= parameters.strict_no_fossil_from_year => {
            !technology.fossil
        }
        Pathway::NoFossilStrict => technology.tier == TechnologyTier::Initial,
        Pathway::NoFossil if year >= parameters.no_fossil_from_year => !technology.fossil,
        _ => true,
    }
}

/// Whether initial-tier technologies may still be built.
///
/// Only business as usual keeps building them after `initial_tech_allowed_until_year`.
pub fn allows_technology_tier(
    technology: &Technology,
    pathway: Pathway,
    year: u32,
    parameters: &ModelParameters,
) -> bool {
    pathway.is_business_as_usual()
        || year <= parameters.initial_tech_allowed_until_year
        || technology.tier != TechnologyTier::Initial
}

/// Whether the technology may be built in the region
pub fn is_build_allowed(
    technology_id: &TechnologyID,
    region_id: &RegionID,
    parameters: &ModelParameters,
) -> bool {
    !parameters.is_build_excluded(technology_id, region_id)
}

/// Whether a plant is protected from retrofitting by its age.
///
/// Plants younger than the minimum decommissioning age may only be retrofitted if they still use
/// an initial-tier technology.
pub fn passes_vintage(plant: &Plant, year: u32, parameters: &ModelParameters) -> bool {
    plant.age(year) >= parameters.minimum_age_decommission
        || plant.tier() == TechnologyTier::Initial
}

/// Whether growth of a technology from one year to the next is within the ramp-rate limits.
///
/// Growth is permitted if either the capacity ratio is within `max_tech_ramp_rate` or the increase
/// in plant numbers is within `ramp_up_allowance`. A technology with no capacity in the previous
/// year has an unbounded ratio, so only the allowance applies.
pub fn ramp_rate_ok(
    old_capacity: Capacity,
    new_capacity: Capacity,
    old_plants: usize,
    new_plants: usize,
    parameters: &ModelParameters,
) -> bool {
    let within_ratio = old_capacity > Capacity(0.0)
        && new_capacity / old_capacity <= parameters.max_tech_ramp_rate;
    let within_allowance =
        new_plants.saturating_sub(old_plants) <= parameters.ramp_up_allowance as usize;
    within_ratio || within_allowance
}

/// Whether adding a plant of a technology keeps it within the ramp-rate limits.
///
/// # Arguments
///
/// * `previous` - The stack at the start of the year
/// * `current` - The stack being built for the following year
/// * `technology_id` - The technology of the prospective plant
/// * `chemical_id` - The chemical being optimised
/// * `added` - The prospective plant's capacity for `chemical_id`
/// * `parameters` - Model parameters
pub fn passes_ramp_rate(
    previous: &PlantStack,
    current: &PlantStack,
    technology_id: &TechnologyID,
    chemical_id: &ChemicalID,
    added: Capacity,
    parameters: &ModelParameters,
) -> bool {
    let filter = PlantFilter::new().technology(technology_id);
    ramp_rate_ok(
        previous.capacity(chemical_id, filter),
        current.capacity(chemical_id, filter) + added,
        previous.number_of_plants(chemical_id, filter),
        current.number_of_plants(chemical_id, filter) + 1,
        parameters,
    )
}

/// Whether a region's share of capacity would stay within the cap after adding capacity to it
pub fn regional_share_ok(
    share: Dimensionless,
    total_capacity: Capacity,
    added: Capacity,
    regional_cap: Dimensionless,
) -> bool {
    if share <= Dimensionless(0.0) || total_capacity <= Capacity(0.0) {
        return true;
    }

    (total_capacity * share + added) / (total_capacity + added) <= regional_cap
}

/// Whether adding a plant in a region keeps the region within the regional cap.
///
/// The cap only applies when modelling a global fleet. Regions holding no capacity for the
/// chemical are always eligible.
pub fn passes_regional_cap(
    stack: &PlantStack,
    chemical_id: &ChemicalID,
    region_id: &RegionID,
    added: Capacity,
    parameters: &ModelParameters,
) -> bool {
    if parameters.scope != ModelScope::World {
        return true;
    }

    let Some(share) = stack.regional_shares(chemical_id).get(region_id).copied() else {
        return true;
    };
    regional_share_ok(
        share,
        stack.capacity(chemical_id, PlantFilter::new()),
        added,
        parameters.regional_cap,
    )
}

/// The constraints which apply while optimising one chemical in one year
pub struct Constraints<'a> {
    /// The model
    pub model: &'a Model,
    /// The scenario's pathway
    pub pathway: Pathway,
    /// The year being optimised
    pub year: u32,
    /// The chemical being optimised
    pub chemical_id: &'a ChemicalID,
}

impl Constraints<'_> {
    fn parameters(&self) -> &ModelParameters {
        &self.model.parameters
    }

    /// The filters which apply to every destination technology: availability, primary chemical
    /// and the pathway's fossil restrictions
    pub fn destination_allowed(&self, candidate: &TransitionCandidate) -> Result<bool> {
        let technology = self.model.technology(&candidate.destination)?;
        Ok(is_available(technology, self.chemical_id, self.year)
            && owns_chemical(technology, self.chemical_id)
            && passes_fossil_filter(technology, self.pathway, self.year, self.parameters()))
    }

    /// Whether a new plant for the candidate fits within the material caps
    pub fn has_headroom(
        &self,
        candidate: &TransitionCandidate,
        ledger: &AvailabilityLedger,
    ) -> Result<bool> {
        let spec =
            self.model
                .plant_spec(&candidate.destination, &candidate.region_id, self.year)?;
        Ok(ledger.can_accommodate(
            &spec.usage,
            &candidate.region_id,
            self.year,
            self.chemical_id,
        ))
    }

    /// The capacity for the chemical of a new plant of the candidate's technology
    pub fn candidate_capacity(&self, candidate: &TransitionCandidate) -> Capacity {
        self.model
            .plant_capacities
            .get(&(candidate.destination.clone(), candidate.region_id.clone()))
            .and_then(|capacities| capacities.get(self.chemical_id).copied())
            .unwrap_or_default()
    }

    /// Whether a plant of the candidate's technology may be added without breaking the ramp-rate
    /// limits
    pub fn within_ramp_rate(
        &self,
        candidate: &TransitionCandidate,
        previous: &PlantStack,
        current: &PlantStack,
    ) -> bool {
        let ok = passes_ramp_rate(
            previous,
            current,
            &candidate.destination,
            self.chemical_id,
            self.candidate_capacity(candidate),
            self.parameters(),
        );
        if !ok {
            trace!(
                "{} rejected for {} in {}: ramp rate",
                candidate.destination, self.chemical_id, self.year
            );
        }
        ok
    }

    /// Whether a plant in the candidate's region may be added without breaking the regional cap
    pub fn within_regional_cap(
        &self,
        candidate: &TransitionCandidate,
        current: &PlantStack,
    ) -> bool {
        passes_regional_cap(
            current,
            self.chemical_id,
            &candidate.region_id,
            self.candidate_capacity(candidate),
            self.parameters(),
        )
    }

    /// Filters which apply only to new builds: initial-tier removal and build exclusions
    pub fn new_build_allowed(&self, candidate: &TransitionCandidate) -> Result<bool> {
        let technology = self.model.technology(&candidate.destination)?;
        Ok(
            allows_technology_tier(technology, self.pathway, self.year, self.parameters())
                && is_build_allowed(
                    &candidate.destination,
                    &candidate.region_id,
                    self.parameters(),
                ),
        )
    }
}
