//! Cost and emissions data for technologies.
use crate::chemical::{ChemicalID, MethanolType};
use crate::region::RegionID;
use crate::technology::TechnologyID;
use crate::units::{Dimensionless, EmissionsPerTonne, MoneyPerTonne};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Key for levelised costs: (chemical, origin, destination, region, year).
///
/// An origin of `None` denotes a greenfield plant.
pub type CostKey = (ChemicalID, Option<TechnologyID>, TechnologyID, RegionID, u32);

/// Levelised cost of production for greenfield plants and retrofits
pub type CostMap = HashMap<CostKey, MoneyPerTonne>;

/// Emissions per tonne of product for a technology
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct TechnologyEmissions {
    /// Direct and energy-related (scope 1 and 2) emissions
    pub scope_1_2: EmissionsPerTonne,
    /// Upstream (scope 3) emissions
    pub scope_3_upstream: EmissionsPerTonne,
}

impl TechnologyEmissions {
    /// Scope 1, 2 and 3 upstream emissions combined
    pub fn scope_1_2_3_upstream(&self) -> EmissionsPerTonne {
        self.scope_1_2 + self.scope_3_upstream
    }
}

/// Emissions keyed by (chemical, technology, region, year)
pub type EmissionsMap = HashMap<(ChemicalID, TechnologyID, RegionID, u32), TechnologyEmissions>;

/// The methanol requirement of a technology which uses methanol as a feedstock
#[derive(PartialEq, Debug, Clone)]
pub struct MethanolFeedstock {
    /// The grade of methanol consumed
    pub methanol_type: MethanolType,
    /// Tonnes of methanol per tonne of product
    pub intensity: Dimensionless,
    /// Share of the methanol's carbon emitted during production
    pub emissions_share: Dimensionless,
}

/// Methanol feedstock requirements, keyed by consuming technology
pub type MethanolFeedstockMap = IndexMap<TechnologyID, MethanolFeedstock>;

/// Yearly forced decommission rates, keyed by (technology, year)
pub type DecommissionRateMap = HashMap<(TechnologyID, u32), Dimensionless>;

/// The average cost and emissions of the methanol supplied by one grade of producer
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct MethanolMix {
    /// Volume-weighted levelised cost
    pub lcox: MoneyPerTonne,
    /// Volume-weighted scope 1, 2 and 3 upstream emissions
    pub emissions: EmissionsPerTonne,
}

/// The most recent methanol mix for each grade
pub type MethanolMixMap = HashMap<MethanolType, MethanolMix>;
