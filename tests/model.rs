//! Integration tests for loading the example model.
use chemwedge::input::load_model;
use chemwedge::scenario::Sensitivity;
use std::path::{Path, PathBuf};

/// Get the path to the example model.
fn get_model_dir() -> PathBuf {
    Path::new(file!())
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("demos")
        .join("simple")
}

/// An integration test which attempts to load the example model
#[test]
fn test_load_model() {
    let (model, stack) = load_model(get_model_dir(), Sensitivity::Default).unwrap();
    assert_eq!(model.parameters.chemicals.len(), 3);
    assert_eq!(model.regions.len(), 4);
    assert_eq!(stack.len(), 40);

    // Plant IDs are allocated in order
    assert!(
        stack
            .iter()
            .enumerate()
            .all(|(i, plant)| plant.id.0 as usize == i)
    );
}

/// Files in a sensitivity's folder take the place of the default ones
#[test]
fn test_load_model_sensitivity() {
    let (default, _) = load_model(get_model_dir(), Sensitivity::Default).unwrap();
    let (low_demand, _) = load_model(get_model_dir(), Sensitivity::LowDemand).unwrap();

    let ammonia = "Ammonia".into();
    assert_eq!(
        default.demand(&ammonia, 2020).unwrap(),
        low_demand.demand(&ammonia, 2020).unwrap()
    );
    assert!(default.demand(&ammonia, 2030).unwrap() > low_demand.demand(&ammonia, 2030).unwrap());

    // Other files are shared
    assert_eq!(default.costs, low_demand.costs);
}
