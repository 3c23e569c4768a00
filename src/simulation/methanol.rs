//! Coupling between the methanol stack and the technologies which consume methanol.
use crate::chemical::{ChemicalID, Material, MethanolType};
use crate::economics::{MethanolMix, MethanolMixMap};
use crate::ledger::{AvailabilityLedger, LedgerScope};
use crate::model::Model;
use crate::stack::{PlantFilter, PlantStack};
use crate::units::{EmissionsPerTonne, Megatonnes, MoneyPerTonne};
use anyhow::Result;
use log::debug;
use strum::IntoEnumIterator;

/// Calculate the cost and emissions of each grade of methanol supplied by a stack.
///
/// For each grade, these are the averages of the greenfield cost and scope 1+2+3 emissions of the
/// plants supplying it, weighted by their methanol production. Grades with no production are
/// omitted.
pub fn methanol_mix(
    model: &Model,
    stack: &PlantStack,
    methanol: &ChemicalID,
    year: u32,
) -> Result<MethanolMixMap> {
    let mut mix = MethanolMixMap::new();
    for methanol_type in MethanolType::iter() {
        let mut total_volume = 0.0;
        let mut lcox = 0.0;
        let mut emissions = 0.0;
        for plant in stack.filter(PlantFilter::new().methanol_type(methanol_type)) {
            let volume = plant.yearly_volume(methanol).value();
            let Some(cost) =
                model.cost(methanol, None, plant.technology_id(), &plant.region_id, year)
            else {
                continue;
            };
            let plant_emissions =
                model.emissions(methanol, plant.technology_id(), &plant.region_id, year)?;

            total_volume += volume;
            lcox += cost.value() * volume;
            emissions += plant_emissions.scope_1_2_3_upstream().value() * volume;
        }

        if total_volume > 0.0 {
            let grade_mix = MethanolMix {
                lcox: MoneyPerTonne(lcox / total_volume),
                emissions: EmissionsPerTonne(emissions / total_volume),
            };
            debug!(
                "Methanol ({methanol_type:?}) mix in {year}: {} per t, {} tCO2e/t",
                grade_mix.lcox, grade_mix.emissions
            );
            mix.insert(methanol_type, grade_mix);
        }
    }

    Ok(mix)
}

/// Set the availability of each grade of methanol in `year` from that year's methanol production.
///
/// Does nothing if the model has no methanol chemical.
pub fn update_methanol_availability(
    model: &Model,
    stack: &PlantStack,
    ledger: &mut AvailabilityLedger,
    year: u32,
) {
    let parameters = &model.parameters;
    let Some(methanol) = &parameters.methanol_chemical else {
        return;
    };

    for methanol_type in MethanolType::iter() {
        let volume = stack.yearly_volume(methanol, PlantFilter::new().methanol_type(methanol_type));
        ledger.set_cap(
            Material::methanol(methanol_type),
            LedgerScope::Global,
            year,
            Megatonnes::from(volume) * parameters.methanol_availability_factor,
        );
    }
}
