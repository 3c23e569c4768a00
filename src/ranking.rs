//! Ranking of technology transition candidates.
//!
//! Candidates for a (chemical, year) are ordered lexicographically by a list of criteria. Costs
//! and emissions are first grouped into equal-width histogram bins, so that candidates whose
//! values differ only slightly are treated as equally good and receive the same rank.
use crate::chemical::ChemicalID;
use crate::economics::MethanolMixMap;
use crate::model::{Model, ModelParameters};
use crate::region::RegionID;
use crate::scenario::Pathway;
use crate::technology::{TechnologyID, TechnologyTier};
use crate::units::{EmissionsPerTonne, MoneyPerTonne};
use anyhow::Result;
use itertools::Itertools;
use log::debug;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::cmp::Ordering;
use std::collections::HashMap;

pub mod candidate;
pub mod policy;
use candidate::build_candidates;
pub use policy::{Criterion, Direction, RankPurpose, RankingPolicy, ranking_policy};

/// How a retrofit candidate is carried out
#[derive(
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Debug,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum RetrofitKind {
    /// The plant is converted in place
    #[string = "normal"]
    Normal,
    /// The plant is decommissioned and a new one built in the same region
    #[string = "decommission_new_build"]
    DecommissionNewBuild,
}

/// A possible change of technology for a chemical in a region and year
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionCandidate {
    /// The chemical being produced
    pub chemical_id: ChemicalID,
    /// The technology being replaced (`None` for new builds and decommissions)
    pub origin: Option<TechnologyID>,
    /// Tier of the origin technology
    pub origin_tier: Option<TechnologyTier>,
    /// The technology being built, or removed for decommissions
    pub destination: TechnologyID,
    /// Tier of the destination technology
    pub destination_tier: TechnologyTier,
    /// The region
    pub region_id: RegionID,
    /// The year
    pub year: u32,
    /// How a retrofit is carried out (always [`RetrofitKind::Normal`] for other purposes)
    pub kind: RetrofitKind,
    /// Levelised cost of production
    pub lcox: MoneyPerTonne,
    /// Scope 1 and 2 emissions (change in emissions, for retrofits)
    pub emissions_scope_1_2: EmissionsPerTonne,
    /// Scope 3 upstream emissions (change in emissions, for retrofits)
    pub emissions_scope_3_upstream: EmissionsPerTonne,
    /// Scope 1, 2 and 3 upstream emissions (change in emissions, for retrofits)
    pub emissions_scope_1_2_3_upstream: EmissionsPerTonne,
}

impl TransitionCandidate {
    /// The value of a criterion for this candidate
    fn value(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::TierOrigin => self.origin_tier.map_or(0, TechnologyTier::level) as f64,
            Criterion::TierDestination => self.destination_tier.level() as f64,
            Criterion::Lcox => self.lcox.value(),
            Criterion::EmissionsScope12 => self.emissions_scope_1_2.value(),
            Criterion::EmissionsScope3Upstream => self.emissions_scope_3_upstream.value(),
            Criterion::EmissionsScope123Upstream => self.emissions_scope_1_2_3_upstream.value(),
        }
    }
}

/// A candidate with its rank (1 = best)
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    /// The candidate
    pub candidate: TransitionCandidate,
    /// Dense rank among the candidates for the same chemical and year
    pub rank: u32,
}

/// Assign each value to one of `n_bins` equal-width bins spanning the values.
///
/// The bin index of a value is the number of bin edges which are less than or equal to it, so the
/// minimum value is in bin 1 and the maximum value lands one past the last bin. If all values are
/// equal, the range is widened by 0.5 either side so that they share a bin.
pub fn bin_values(values: &[f64], n_bins: u32) -> Vec<i64> {
    let Some((&min, &max)) = values
        .iter()
        .minmax_by(|a, b| a.total_cmp(b))
        .into_option()
    else {
        return Vec::new();
    };

    #[allow(clippy::float_cmp)]
    let (first, last) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };

    let n_bins = n_bins.max(1);
    let step = (last - first) / f64::from(n_bins);
    let edges = (0..=n_bins)
        .map(|i| {
            if i == n_bins {
                last
            } else {
                first + f64::from(i) * step
            }
        })
        .collect_vec();

    values
        .iter()
        .map(|&value| edges.partition_point(|&edge| edge <= value) as i64)
        .collect()
}

/// Compare two composite keys according to the directions of the policy
fn compare_keys(a: &[i64], b: &[i64], policy: &[(Criterion, Direction)]) -> Ordering {
    a.iter()
        .zip(b)
        .zip(policy)
        .map(|((a, b), (_, direction))| match direction {
            Direction::Ascending => a.cmp(b),
            Direction::Descending => b.cmp(a),
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Rank candidates according to a policy.
///
/// Candidates are sorted (stably) by their binned criteria and assigned a dense rank, so that
/// candidates which are indistinguishable across all criteria share a rank. The returned
/// candidates are in rank order.
pub fn rank_candidates(
    candidates: Vec<TransitionCandidate>,
    policy: &[(Criterion, Direction)],
    n_bins: u32,
) -> Vec<RankedCandidate> {
    // One column of binned keys per criterion
    let columns = policy
        .iter()
        .map(|(criterion, _)| {
            let values = candidates
                .iter()
                .map(|candidate| candidate.value(*criterion))
                .collect_vec();
            if criterion.is_discrete() {
                values.into_iter().map(|value| value as i64).collect_vec()
            } else {
                bin_values(&values, n_bins)
            }
        })
        .collect_vec();
    let keys = (0..candidates.len())
        .map(|row| columns.iter().map(|column| column[row]).collect_vec())
        .collect_vec();

    let mut rows = keys.into_iter().zip(candidates).collect_vec();
    rows.sort_by(|(a, _), (b, _)| compare_keys(a, b, policy));

    // Equal keys are adjacent after sorting, so a dense rank only needs to look at the predecessor
    let mut rank = 0;
    let mut previous: Option<Vec<i64>> = None;
    rows.into_iter()
        .map(|(key, candidate)| {
            if previous.as_ref() != Some(&key) {
                rank += 1;
                previous = Some(key);
            }
            RankedCandidate { candidate, rank }
        })
        .collect()
}

/// The policy actually applied for a purpose, pathway and year.
///
/// In the earliest years, new builds are not ranked by destination tier, so that incumbent
/// technologies can still be chosen.
pub fn effective_policy(
    purpose: RankPurpose,
    pathway: Pathway,
    year: u32,
    parameters: &ModelParameters,
) -> Vec<(Criterion, Direction)> {
    let policy = ranking_policy(purpose, pathway);
    let drop_tier =
        purpose == RankPurpose::NewBuild && year <= parameters.initial_tech_allowed_until_year;
    policy
        .iter()
        .filter(|(criterion, _)| !(drop_tier && *criterion == Criterion::TierDestination))
        .copied()
        .collect()
}

/// Rank candidates for a purpose, pathway and year
pub fn rank(
    candidates: Vec<TransitionCandidate>,
    purpose: RankPurpose,
    pathway: Pathway,
    year: u32,
    parameters: &ModelParameters,
) -> Vec<RankedCandidate> {
    let policy = effective_policy(purpose, pathway, year, parameters);
    rank_candidates(candidates, &policy, parameters.number_of_bins)
}

type TableKey = (RankPurpose, ChemicalID, u32);

/// Ranked candidates for every purpose, chemical and year of a scenario
#[derive(Debug, Clone, Default)]
pub struct RankingTables {
    tables: HashMap<TableKey, Vec<RankedCandidate>>,
}

impl RankingTables {
    /// Rank the candidates for every purpose, chemical and year
    pub fn build(model: &Model, pathway: Pathway, methanol_mix: &MethanolMixMap) -> Result<Self> {
        let mut tables = Self::default();
        let chemicals = model.parameters.chemicals.clone();
        for year in model.parameters.years() {
            tables.update(model, pathway, &chemicals, year, methanol_mix)?;
        }

        Ok(tables)
    }

    /// Recompute the rankings for some chemicals in one year
    pub fn update(
        &mut self,
        model: &Model,
        pathway: Pathway,
        chemicals: &[ChemicalID],
        year: u32,
        methanol_mix: &MethanolMixMap,
    ) -> Result<()> {
        for chemical_id in chemicals {
            for purpose in [
                RankPurpose::NewBuild,
                RankPurpose::Retrofit,
                RankPurpose::Decommission,
            ] {
                let candidates = build_candidates(model, purpose, chemical_id, year, methanol_mix)?;
                debug!(
                    "Ranking {} {} candidates for {chemical_id} in {year}",
                    candidates.len(),
                    purpose_label(purpose)
                );
                let ranked = rank(candidates, purpose, pathway, year, &model.parameters);
                self.tables
                    .insert((purpose, chemical_id.clone(), year), ranked);
            }
        }

        Ok(())
    }

    /// The ranked candidates for a purpose, chemical and year (empty if there are none)
    pub fn get(
        &self,
        purpose: RankPurpose,
        chemical_id: &ChemicalID,
        year: u32,
    ) -> &[RankedCandidate] {
        self.tables
            .get(&(purpose, chemical_id.clone(), year))
            .map_or(&[], Vec::as_slice)
    }

    /// Iterate over every table, sorted by year, chemical and purpose
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (RankPurpose, &ChemicalID, u32, &[RankedCandidate])> {
        self.tables
            .iter()
            .sorted_by_key(|((purpose, chemical_id, year), _)| {
                (*year, chemical_id.clone(), purpose_label(*purpose))
            })
            .map(|((purpose, chemical_id, year), table)| {
                (*purpose, chemical_id, *year, table.as_slice())
            })
    }
}

/// The label used for a purpose in logs and output files
pub fn purpose_label(purpose: RankPurpose) -> &'static str {
    match purpose {
        RankPurpose::NewBuild => "new_build",
        RankPurpose::Retrofit => "retrofit",
        RankPurpose::Decommission => "decommission",
    }
}
