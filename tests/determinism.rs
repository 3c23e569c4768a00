//! Scenario runs of the example model are reproducible and keep the stack consistent.
use chemwedge::input::load_model;
use chemwedge::scenario::{Pathway, Scenario, Sensitivity};
use chemwedge::simulation::{run, simulate};
use chemwedge::stack::PlantFilter;
use chemwedge::transition::TransitionType;
use float_cmp::approx_eq;
use itertools::Itertools;
use std::fs::{File, read_dir};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const FLOAT_CMP_TOLERANCE: f64 = 1e-10;

/// Get the path to the example model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

fn scenarios() -> Vec<Scenario> {
    [Pathway::MostEconomic, Pathway::NoFossil, Pathway::BusinessAsUsual]
        .into_iter()
        .map(|pathway| Scenario {
            pathway,
            sensitivity: Sensitivity::Default,
        })
        .collect()
}

/// Running the same scenarios twice, in parallel, gives identical output files
#[test]
fn test_runs_are_reproducible() {
    unsafe { std::env::set_var("CHEMWEDGE_LOG_LEVEL", "off") };

    let dir1 = tempdir().unwrap();
    let dir2 = tempdir().unwrap();
    run(&get_model_dir(), &scenarios(), dir1.path(), true).unwrap();
    run(&get_model_dir(), &scenarios(), dir2.path(), true).unwrap();

    for scenario in scenarios() {
        let name = scenario.to_string();
        compare_output_dirs(&dir1.path().join(&name), &dir2.path().join(&name));
    }
}

/// Every year's stack is the previous one plus new builds minus decommissions
#[test]
fn test_stack_conservation() {
    for scenario in scenarios() {
        let (model, initial_stack) = load_model(get_model_dir(), scenario.sensitivity).unwrap();
        let outcome = simulate(&model, initial_stack, scenario).unwrap();
        let parameters = &model.parameters;
        assert_eq!(outcome.stacks.len(), parameters.years().count());

        for (year, next_year) in parameters.years().tuple_windows() {
            for chemical_id in &parameters.chemicals {
                let count = |year: u32| {
                    outcome.stacks[&year]
                        .primary_producers_of(chemical_id)
                        .count()
                };
                let transitions = |transition_type| {
                    outcome
                        .registry
                        .for_year(year)
                        .filter(|record| {
                            record.chemical_id == *chemical_id
                                && record.transition_type == transition_type
                        })
                        .count()
                };
                assert_eq!(
                    count(next_year) + transitions(TransitionType::Decommission),
                    count(year) + transitions(TransitionType::NewBuild),
                    "{scenario}: {chemical_id} in {year}"
                );
            }
        }

        // Nothing is retrofitted under business as usual
        if scenario.pathway == Pathway::BusinessAsUsual {
            assert!(
                outcome
                    .registry
                    .iter()
                    .all(|record| record.transition_type != TransitionType::Retrofit)
            );
        }
    }
}

/// Under the no-fossil pathway, no fossil plants are built once fossil technologies are phased out
#[test]
fn test_no_fossil_builds_after_cutoff() {
    let scenario = Scenario {
        pathway: Pathway::NoFossil,
        sensitivity: Sensitivity::Default,
    };
    let (model, initial_stack) = load_model(get_model_dir(), scenario.sensitivity).unwrap();
    let outcome = simulate(&model, initial_stack, scenario).unwrap();
    let cutoff = model.parameters.no_fossil_from_year;

    for (year, stack) in &outcome.stacks {
        if *year <= cutoff {
            continue;
        }
        assert!(stack.new_this_year().all(|plant| !plant.technology.fossil));
    }

    // Production never stops altogether
    let last = &outcome.stacks[&model.parameters.end_year];
    for chemical_id in &model.parameters.chemicals {
        assert!(last.number_of_plants(chemical_id, PlantFilter::new()) > 0);
    }
}

fn compare_output_dirs(output_dir1: &Path, output_dir2: &Path) {
    let file_names1 = get_csv_file_names(output_dir1);
    let file_names2 = get_csv_file_names(output_dir2);

    // Check that output files haven't been added/removed
    assert!(!file_names1.is_empty());
    assert!(file_names1 == file_names2);

    let mut errors = Vec::new();
    for file_name in file_names1 {
        compare_lines(output_dir1, output_dir2, &file_name, &mut errors);
    }

    assert!(
        errors.is_empty(),
        "The following errors occurred:\n  * {}",
        errors.join("\n  * ")
    );
}

fn compare_lines(
    output_dir1: &Path,
    output_dir2: &Path,
    file_name: &str,
    errors: &mut Vec<String>,
) {
    let lines1 = read_lines(&output_dir1.join(file_name));
    let lines2 = read_lines(&output_dir2.join(file_name));

    // Check for different number of lines
    if lines1.len() != lines2.len() {
        errors.push(format!(
            "{}: Different number of lines: {} vs {}",
            file_name,
            lines1.len(),
            lines2.len()
        ));
    }

    for (num, (line1, line2)) in lines1.into_iter().zip(lines2).enumerate() {
        let same = line1
            .split(',')
            .zip_longest(line2.split(','))
            .all(|pair| {
                pair.both()
                    .is_some_and(|(f1, f2)| try_compare_floats(f1, f2).unwrap_or(f1 == f2))
            });
        if !same {
            errors.push(format!(
                "{file_name}: line {num}:\n    + \"{line1}\"\n    - \"{line2}\""
            ));
        }
    }
}

/// Parse a string into an `f64`, returning `None` if parsing fails or value is infinite/NaN
fn parse_finite(s: &str) -> Option<f64> {
    s.parse().ok().filter(|f: &f64| f.is_finite())
}

fn try_compare_floats(s1: &str, s2: &str) -> Option<bool> {
    let float1 = parse_finite(s1)?;
    let float2 = parse_finite(s2)?;

    Some(approx_eq!(
        f64,
        float1,
        float2,
        epsilon = FLOAT_CMP_TOLERANCE
    ))
}

/// Get the names of CSV files in the given folder
fn get_csv_file_names(dir_path: &Path) -> Vec<String> {
    read_dir(dir_path)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|file_name| file_name.ends_with(".csv"))
        .sorted()
        .collect()
}

// Read all lines from a file into a `Vec`
fn read_lines(path: &Path) -> Vec<String> {
    BufReader::new(File::open(path).unwrap())
        .lines()
        .map_while(Result::ok)
        .collect()
}
