//! The availability ledger tracks how much of each capped material is available and used.
//!
//! Entries are keyed by material, scope and year. Regional materials are tracked in the region
//! where the consuming plant is located, while methanol is tracked globally. Some materials are
//! additionally tracked per consuming chemical, so that a chemical can be given its own share of
//! the cap.
//!
//! Materials without a cap for a given scope and year are unconstrained, but their usage is still
//! recorded (a cap may be set later, as happens for methanol each year).
use crate::chemical::{ChemicalID, Material, MaterialUsage};
use crate::plant::Plant;
use crate::region::RegionID;
use crate::units::{Megatonnes, Tonnes};
use indexmap::IndexMap;
use std::fmt;
use strum::IntoEnumIterator;

/// The absolute tolerance used when comparing ledger quantities with plant usage
pub const LEDGER_TOLERANCE: Megatonnes = Megatonnes(1e-10);

/// Where a material is traded
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LedgerScope {
    /// Traded globally
    Global,
    /// Available only within a region
    Region(RegionID),
}

impl LedgerScope {
    /// The scope in which a plant in `region_id` consumes `material`
    pub fn for_material(material: Material, region_id: &RegionID) -> Self {
        if material.is_global() {
            Self::Global
        } else {
            Self::Region(region_id.clone())
        }
    }
}

impl fmt::Display for LedgerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Region(region_id) => write!(f, "{region_id}"),
        }
    }
}

/// Usage of a material by one chemical
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChemicalShare {
    /// The chemical's own cap, if it has one
    pub cap: Option<Megatonnes>,
    /// Amount used by the chemical's plants
    pub used: Megatonnes,
}

/// Cap and usage of a material in one scope and year
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerEntry {
    /// The amount available (`None` = unconstrained)
    pub cap: Option<Megatonnes>,
    /// The amount used by all plants
    pub used: Megatonnes,
    /// Usage by each consuming chemical, for materials tracked per chemical
    pub chemicals: IndexMap<ChemicalID, ChemicalShare>,
}

/// The headroom left under a cap, clamping usage at zero
fn headroom(cap: Megatonnes, used: Megatonnes) -> Megatonnes {
    (cap - used.max(Megatonnes(0.0))).max(Megatonnes(0.0))
}

impl LedgerEntry {
    /// Cap minus usage, which is negative if the material is over-used
    pub fn remaining(&self) -> Option<Megatonnes> {
        self.cap.map(|cap| cap - self.used)
    }

    /// The headroom available to a chemical.
    ///
    /// If the chemical has its own cap, its headroom is computed from its own usage, otherwise
    /// from the entry total. Returns `None` if the material is unconstrained.
    pub fn headroom(&self, chemical_id: &ChemicalID) -> Option<Megatonnes> {
        if let Some(ChemicalShare {
            cap: Some(cap),
            used,
        }) = self.chemicals.get(chemical_id)
        {
            return Some(headroom(*cap, *used));
        }

        self.cap.map(|cap| headroom(cap, self.used))
    }
}

/// A cap on the availability of a material, as supplied by input data
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityCap {
    /// The material being capped
    pub material: Material,
    /// Where the cap applies
    pub scope: LedgerScope,
    /// The chemical the cap is reserved for (`None` = the scope total)
    pub chemical_id: Option<ChemicalID>,
    /// The year the cap applies to
    pub year: u32,
    /// The amount available
    pub cap: Megatonnes,
}

/// A material currently used beyond its cap
#[derive(Debug, Clone, PartialEq)]
pub struct Deficit {
    /// The over-used material
    pub material: Material,
    /// Where the deficit occurs
    pub scope: LedgerScope,
    /// Cap minus usage (negative)
    pub remaining: Megatonnes,
}

type LedgerKey = (Material, LedgerScope, u32);

/// Tracks material caps and usage for every scope and year
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailabilityLedger {
    entries: IndexMap<LedgerKey, LedgerEntry>,
}

impl AvailabilityLedger {
    /// Create a ledger from input caps
    pub fn new<'a, I>(caps: I) -> Self
    where
        I: IntoIterator<Item = &'a AvailabilityCap>,
    {
        let mut ledger = Self::default();
        for cap in caps {
            let entry = ledger.entry_mut(cap.material, cap.scope.clone(), cap.year);
            match &cap.chemical_id {
                Some(chemical_id) => {
                    entry.chemicals.entry(chemical_id.clone()).or_default().cap = Some(cap.cap);
                }
                None => entry.cap = Some(cap.cap),
            }
        }

        ledger
    }

    fn entry_mut(&mut self, material: Material, scope: LedgerScope, year: u32) -> &mut LedgerEntry {
        self.entries.entry((material, scope, year)).or_default()
    }

    /// Get the entry for a material, scope and year, if one exists
    pub fn entry(
        &self,
        material: Material,
        scope: &LedgerScope,
        year: u32,
    ) -> Option<&LedgerEntry> {
        self.entries.get(&(material, scope.clone(), year))
    }

    /// Set the total cap for a material
    pub fn set_cap(&mut self, material: Material, scope: LedgerScope, year: u32, cap: Megatonnes) {
        self.entry_mut(material, scope, year).cap = Some(cap);
    }

    /// Record the consumption of a plant added to the stack in `year`
    pub fn add_plant(&mut self, plant: &Plant, year: u32) {
        self.update(plant, year, 1.0);
    }

    /// Release the consumption of a plant removed from the stack in `year`
    pub fn remove_plant(&mut self, plant: &Plant, year: u32) {
        self.update(plant, year, -1.0);
    }

    fn update(&mut self, plant: &Plant, year: u32, sign: f64) {
        for material in Material::iter() {
            let usage = plant.usage.get(material);
            if usage == Tonnes(0.0) {
                continue;
            }

            let delta = Megatonnes(sign * usage.to_megatonnes().value());
            let scope = LedgerScope::for_material(material, &plant.region_id);
            let entry = self.entry_mut(material, scope, year);
            entry.used += delta;
            if material.is_tracked_per_chemical() {
                entry
                    .chemicals
                    .entry(plant.chemical_id.clone())
                    .or_default()
                    .used += delta;
            }
        }
    }

    /// The headroom for a material available to plants of a chemical in a region.
    ///
    /// Returns `None` if the material is unconstrained.
    pub fn headroom(
        &self,
        material: Material,
        region_id: &RegionID,
        year: u32,
        chemical_id: &ChemicalID,
    ) -> Option<Megatonnes> {
        let scope = LedgerScope::for_material(material, region_id);
        self.entry(material, &scope, year)?.headroom(chemical_id)
    }

    /// Whether the consumption of a prospective plant fits within the headroom for every material
    pub fn can_accommodate(
        &self,
        usage: &MaterialUsage,
        region_id: &RegionID,
        year: u32,
        chemical_id: &ChemicalID,
    ) -> bool {
        Material::iter().all(|material| {
            let usage = usage.get(material).to_megatonnes();
            usage <= Megatonnes(0.0)
                || self
                    .headroom(material, region_id, year, chemical_id)
                    .is_none_or(|headroom| usage <= headroom)
        })
    }

    /// Materials used beyond their cap in `year`, either in total or by `chemical_id`'s share
    pub fn deficits(&self, year: u32, chemical_id: &ChemicalID) -> Vec<Deficit> {
        self.entries
            .iter()
            .filter(|((_, _, entry_year), _)| *entry_year == year)
            .filter_map(|((material, scope, _), entry)| {
                let share_remaining = entry
                    .chemicals
                    .get(chemical_id)
                    .and_then(|share| share.cap.map(|cap| cap - share.used));
                let remaining = share_remaining.or_else(|| entry.remaining())?;
                (remaining < Megatonnes(0.0)).then(|| Deficit {
                    material: *material,
                    scope: scope.clone(),
                    remaining,
                })
            })
            .collect()
    }

    /// The amount of a material recorded as used in a scope, either by `chemical_id` (if it has
    /// its own cap) or in total
    pub fn used(
        &self,
        material: Material,
        scope: &LedgerScope,
        year: u32,
        chemical_id: &ChemicalID,
    ) -> Megatonnes {
        let Some(entry) = self.entry(material, scope, year) else {
            return Megatonnes(0.0);
        };
        match entry.chemicals.get(chemical_id) {
            Some(share) if share.cap.is_some() => share.used,
            _ => entry.used,
        }
    }

    /// Carry usage in `year` over to the following year.
    ///
    /// Caps already supplied for the following year are kept; otherwise the current caps are
    /// carried over too.
    pub fn roll_forward(&mut self, year: u32) {
        let current: Vec<_> = self
            .entries
            .iter()
            .filter(|((_, _, entry_year), _)| *entry_year == year)
            .map(|((material, scope, _), entry)| (*material, scope.clone(), entry.clone()))
            .collect();

        for (material, scope, entry) in current {
            let next = self.entry_mut(material, scope, year + 1);
            next.used = entry.used;
            if next.cap.is_none() {
                next.cap = entry.cap;
            }
            for (chemical_id, share) in entry.chemicals {
                let next_share = next.chemicals.entry(chemical_id).or_default();
                next_share.used = share.used;
                if next_share.cap.is_none() {
                    next_share.cap = share.cap;
                }
            }
        }
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (Material, &LedgerScope, u32, &LedgerEntry)> {
        self.entries
            .iter()
            .map(|((material, scope, year), entry)| (*material, scope, *year, entry))
    }
}

/// Whether the recorded usage of a material covers a plant's consumption.
///
/// The ledger is kept in megatonnes and plant usage in tonnes, so the usage is converted before
/// comparing, allowing for [`LEDGER_TOLERANCE`].
pub fn covers_usage(used: Megatonnes, usage: Tonnes) -> bool {
    used - usage.to_megatonnes() >= Megatonnes(0.0) - LEDGER_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{biomass_plant, region_id};
    use crate::plant::Plant;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::rc::Rc;

    fn biomass_cap(region_id: &RegionID, cap: f64) -> AvailabilityCap {
        AvailabilityCap {
            material: Material::Biomass,
            scope: LedgerScope::Region(region_id.clone()),
            chemical_id: None,
            year: 2020,
            cap: Megatonnes(cap),
        }
    }

    #[rstest]
    fn test_add_remove_plant(biomass_plant: Rc<Plant>, region_id: RegionID) {
        // Plant uses 0.5 Mt biomass per year
        let mut ledger = AvailabilityLedger::new([&biomass_cap(&region_id, 2.0)]);
        let ammonia = "Ammonia".into();
        ledger.add_plant(&biomass_plant, 2020);
        assert_approx_eq!(
            f64,
            ledger
                .headroom(Material::Biomass, &region_id, 2020, &ammonia)
                .unwrap()
                .value(),
            1.5
        );

        ledger.remove_plant(&biomass_plant, 2020);
        let entry = ledger
            .entry(Material::Biomass, &LedgerScope::Region(region_id.clone()), 2020)
            .unwrap();
        assert_approx_eq!(f64, entry.used.value(), 0.0);
        assert_approx_eq!(f64, entry.chemicals[&ammonia].used.value(), 0.0);
    }

    #[rstest]
    fn test_headroom_clamped(biomass_plant: Rc<Plant>, region_id: RegionID) {
        let mut ledger = AvailabilityLedger::new([&biomass_cap(&region_id, 0.2)]);
        let ammonia = "Ammonia".into();

        // Over-use gives zero headroom, not negative headroom
        ledger.add_plant(&biomass_plant, 2020);
        assert_eq!(
            ledger.headroom(Material::Biomass, &region_id, 2020, &ammonia),
            Some(Megatonnes(0.0))
        );
        assert_eq!(ledger.deficits(2020, &ammonia).len(), 1);

        // Negative usage is clamped before computing headroom
        ledger.remove_plant(&biomass_plant, 2020);
        ledger.remove_plant(&biomass_plant, 2020);
        let headroom = ledger
            .headroom(Material::Biomass, &region_id, 2020, &ammonia)
            .unwrap();
        assert_approx_eq!(f64, headroom.value(), 0.2);
    }

    #[rstest]
    fn test_chemical_share(biomass_plant: Rc<Plant>, region_id: RegionID) {
        let share = AvailabilityCap {
            chemical_id: Some("Ammonia".into()),
            cap: Megatonnes(0.6),
            ..biomass_cap(&region_id, 10.0)
        };
        let mut ledger = AvailabilityLedger::new([&biomass_cap(&region_id, 10.0), &share]);
        ledger.add_plant(&biomass_plant, 2020);

        // Ammonia has its own (smaller) share, other chemicals see the total
        let ammonia_headroom = ledger
            .headroom(Material::Biomass, &region_id, 2020, &"Ammonia".into())
            .unwrap();
        assert_approx_eq!(f64, ammonia_headroom.value(), 0.1);
        let urea_headroom = ledger
            .headroom(Material::Biomass, &region_id, 2020, &"Urea".into())
            .unwrap();
        assert_approx_eq!(f64, urea_headroom.value(), 9.5);
        assert!(!ledger.can_accommodate(&biomass_plant.usage, &region_id, 2020, &"Ammonia".into()));
        assert!(ledger.can_accommodate(&biomass_plant.usage, &region_id, 2020, &"Urea".into()));
    }

    #[rstest]
    fn test_unconstrained_material(biomass_plant: Rc<Plant>, region_id: RegionID) {
        let mut ledger = AvailabilityLedger::default();
        ledger.add_plant(&biomass_plant, 2020);
        assert!(
            ledger
                .headroom(Material::Biomass, &region_id, 2020, &"Ammonia".into())
                .is_none()
        );
        assert!(ledger.deficits(2020, &"Ammonia".into()).is_empty());
        assert!(ledger.can_accommodate(&biomass_plant.usage, &region_id, 2020, &"Ammonia".into()));
    }

    #[rstest]
    fn test_roll_forward(biomass_plant: Rc<Plant>, region_id: RegionID) {
        let next_cap = AvailabilityCap {
            year: 2021,
            ..biomass_cap(&region_id, 3.0)
        };
        let mut ledger = AvailabilityLedger::new([&biomass_cap(&region_id, 1.0), &next_cap]);
        ledger.add_plant(&biomass_plant, 2020);
        ledger.roll_forward(2020);
        ledger.roll_forward(2021);

        let scope = LedgerScope::Region(region_id);
        let entry_2021 = ledger.entry(Material::Biomass, &scope, 2021).unwrap();
        assert_eq!(entry_2021.cap, Some(Megatonnes(3.0)));
        assert_approx_eq!(f64, entry_2021.used.value(), 0.5);
        let entry_2022 = ledger.entry(Material::Biomass, &scope, 2022).unwrap();
        assert_eq!(entry_2022.cap, Some(Megatonnes(3.0)));
        assert_approx_eq!(f64, entry_2022.used.value(), 0.5);
    }

    #[rstest]
    #[case(1e-6, 1.0, true)] // exactly equal after conversion
    #[case(2e-6, 1.0, true)]
    #[case(1e-6 - 5e-11, 1.0, true)] // within tolerance
    #[case(1e-6 - 1e-9, 1.0, false)] // beyond tolerance
    #[case(0.0, 1e-5, true)] // 1e-11 Mt is within tolerance of zero
    #[case(0.0, 1.0, false)]
    fn test_covers_usage(#[case] used: f64, #[case] usage: f64, #[case] expected: bool) {
        assert_eq!(covers_usage(Megatonnes(used), Tonnes(usage)), expected);
    }
}
