//! The ranking policies used for each purpose and pathway.
use crate::scenario::Pathway;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The decision a ranking is made for
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
pub enum RankPurpose {
    /// Choosing a technology for a new plant
    #[string = "new_build"]
    NewBuild,
    /// Choosing a technology to retrofit an existing plant to
    #[string = "retrofit"]
    Retrofit,
    /// Choosing which installed technology to remove
    #[string = "decommission"]
    Decommission,
}

/// A key which candidates can be ordered by
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum Criterion {
    /// Tier of the technology being replaced
    TierOrigin,
    /// Tier of the technology being built
    TierDestination,
    /// Levelised cost of production
    Lcox,
    /// Scope 1 and 2 emissions
    EmissionsScope12,
    /// Scope 3 upstream emissions
    EmissionsScope3Upstream,
    /// Scope 1, 2 and 3 upstream emissions
    EmissionsScope123Upstream,
}

impl Criterion {
    /// Whether the criterion takes discrete values, which are compared as-is rather than binned
    pub fn is_discrete(self) -> bool {
        matches!(self, Self::TierOrigin | Self::TierDestination)
    }
}

/// Whether smaller or larger values of a criterion are preferred
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Direction {
    /// Smaller values rank first
    Ascending,
    /// Larger values rank first
    Descending,
}

/// An ordered list of criteria, in decreasing order of priority
pub type RankingPolicy = &'static [(Criterion, Direction)];

use Criterion::{
    EmissionsScope3Upstream as E3, EmissionsScope12 as E12, EmissionsScope123Upstream as E123,
    Lcox, TierDestination, TierOrigin,
};
use Direction::{Ascending as Asc, Descending as Desc};

const NEW_BUILD_ME: RankingPolicy = &[(TierDestination, Desc), (Lcox, Asc), (E12, Asc), (E3, Asc)];
const NEW_BUILD_FA: RankingPolicy = &[(TierDestination, Desc), (E12, Asc), (E3, Asc), (Lcox, Asc)];
const NEW_BUILD_NF: RankingPolicy = &[(TierDestination, Desc), (E123, Asc), (Lcox, Asc)];
const NEW_BUILD_BAU: RankingPolicy = &[(Lcox, Asc), (E12, Asc), (E3, Asc)];

const RETROFIT_ME: RankingPolicy = &[
    (TierOrigin, Asc),
    (TierDestination, Desc),
    (Lcox, Asc),
    (E12, Desc),
    (E3, Desc),
];
const RETROFIT_FA: RankingPolicy = &[
    (TierOrigin, Asc),
    (TierDestination, Desc),
    (E12, Desc),
    (E3, Desc),
    (Lcox, Asc),
];
const RETROFIT_NF: RankingPolicy = &[
    (TierOrigin, Asc),
    (TierDestination, Desc),
    (E123, Desc),
    (Lcox, Asc),
];
const RETROFIT_BAU: RankingPolicy = &[(Lcox, Asc), (E12, Desc), (E3, Desc)];

const DECOMMISSION_ME: RankingPolicy =
    &[(TierDestination, Asc), (Lcox, Desc), (E12, Desc), (E3, Desc)];
const DECOMMISSION_FA: RankingPolicy =
    &[(TierDestination, Asc), (E12, Desc), (E3, Desc), (Lcox, Desc)];
const DECOMMISSION_NF: RankingPolicy = &[(TierDestination, Asc), (E123, Desc), (Lcox, Desc)];
const DECOMMISSION_BAU: RankingPolicy = &[(Lcox, Desc), (E12, Desc), (E3, Desc)];

/// The ranking policy for a purpose and pathway
pub fn ranking_policy(purpose: RankPurpose, pathway: Pathway) -> RankingPolicy {
    match (purpose, pathway) {
        (RankPurpose::NewBuild, Pathway::MostEconomic) => NEW_BUILD_ME,
        (RankPurpose::NewBuild, Pathway::FastAbatement) => NEW_BUILD_FA,
        (RankPurpose::NewBuild, Pathway::NoFossil | Pathway::NoFossilStrict) => NEW_BUILD_NF,
        (RankPurpose::NewBuild, Pathway::BusinessAsUsual) => NEW_BUILD_BAU,
        (RankPurpose::Retrofit, Pathway::MostEconomic) => RETROFIT_ME,
        (RankPurpose::Retrofit, Pathway::FastAbatement) => RETROFIT_FA,
        (RankPurpose::Retrofit, Pathway::NoFossil | Pathway::NoFossilStrict) => RETROFIT_NF,
        (RankPurpose::Retrofit, Pathway::BusinessAsUsual) => RETROFIT_BAU,
        (RankPurpose::Decommission, Pathway::MostEconomic) => DECOMMISSION_ME,
        (RankPurpose::Decommission, Pathway::FastAbatement) => DECOMMISSION_FA,
        (RankPurpose::Decommission, Pathway::NoFossil | Pathway::NoFossilStrict) => DECOMMISSION_NF,
        (RankPurpose::Decommission, Pathway::BusinessAsUsual) => DECOMMISSION_BAU,
    }
}
