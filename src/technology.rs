//! Technologies are the production routes that plants use to make chemicals.
use crate::chemical::{ChemicalID, MethanolType};
use crate::id::{define_id_getter, define_id_type};
use indexmap::{IndexMap, IndexSet};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::ops::RangeInclusive;
use std::rc::Rc;

define_id_type! {TechnologyID}

/// A map of [`Technology`]s, keyed by technology ID
pub type TechnologyMap = IndexMap<TechnologyID, Rc<Technology>>;

/// Permitted retrofit routes as (origin, destination) pairs, keyed by chemical
pub type RetrofitRouteMap = IndexMap<ChemicalID, IndexSet<(TechnologyID, TechnologyID)>>;

/// The maturity of a technology on the road to decarbonisation
#[derive(
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Debug,
    PartialOrd,
    Ord,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum TechnologyTier {
    /// Incumbent technologies
    #[string = "initial"]
    Initial,
    /// Intermediate technologies (e.g. partial abatement)
    #[string = "transition"]
    Transition,
    /// Fully decarbonised technologies
    #[string = "end_state"]
    EndState,
}

impl TechnologyTier {
    /// The numeric level of the tier, used as a ranking key
    pub fn level(self) -> i64 {
        match self {
            Self::Initial => 1,
            Self::Transition => 2,
            Self::EndState => 3,
        }
    }
}

/// A production technology
#[derive(PartialEq, Debug, Clone)]
pub struct Technology {
    /// Unique identifier for the technology (e.g. "Steam cracker + CCS")
    pub id: TechnologyID,
    /// Maturity tier
    pub tier: TechnologyTier,
    /// Whether the technology relies on fossil feedstocks
    pub fossil: bool,
    /// Whether the technology is fossil-based without any abatement
    pub unabated_fossil: bool,
    /// The grade of methanol this technology supplies, if it is a methanol producer
    pub methanol_supply: Option<MethanolType>,
    /// Whether the technology consumes methanol as a feedstock
    pub consumes_methanol: bool,
    /// The chemical which "owns" the technology for build decisions
    pub primary_chemical: ChemicalID,
    /// The chemicals produced, with the years in which the technology may be chosen for each
    pub availability: IndexMap<ChemicalID, RangeInclusive<u32>>,
}
define_id_getter! {Technology, TechnologyID}

impl Technology {
    /// Whether the technology produces the given chemical (as primary product or byproduct)
    pub fn produces(&self, chemical_id: &ChemicalID) -> bool {
        self.availability.contains_key(chemical_id)
    }

    /// Whether the technology may be chosen for the given chemical in the given year
    pub fn is_available(&self, chemical_id: &ChemicalID, year: u32) -> bool {
        self.availability
            .get(chemical_id)
            .is_some_and(|years| years.contains(&year))
    }

    /// Whether `chemical_id` is the technology's primary chemical
    pub fn is_primary_for(&self, chemical_id: &ChemicalID) -> bool {
        self.primary_chemical == *chemical_id
    }
}
