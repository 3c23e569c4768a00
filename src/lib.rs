//! Common functionality for chemwedge, a simulator of decarbonisation pathways for the chemical
//! industry's production fleet.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod chemical;
pub mod cli;
pub mod constraints;
pub mod economics;
pub mod emissions;
pub mod id;
pub mod input;
pub mod ledger;
pub mod log;
pub mod model;
pub mod output;
pub mod plant;
pub mod ranking;
pub mod region;
pub mod scenario;
pub mod settings;
pub mod simulation;
pub mod stack;
pub mod technology;
pub mod transition;
pub mod units;
pub mod year;

#[cfg(test)]
mod fixture;

/// Get the config dir for the program
pub fn get_chemwedge_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir present on this platform. Use the current directory instead.
        return PathBuf::new();
    };

    config_dir.push("chemwedge");
    config_dir
}
