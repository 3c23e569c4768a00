//! Integration tests for the `example run` command.
use chemwedge::cli::example::handle_example_run_command;
use chemwedge::settings::Settings;
use tempfile::tempdir;

/// An integration test for the `example run` command.
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("CHEMWEDGE_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("results");
    handle_example_run_command("simple", Some(&output_dir), false, Some(Settings::default()))
        .unwrap();

    assert!(output_dir.join("metadata.toml").is_file());
    for scenario in ["me_def", "fa_def", "nf_def", "bau_def", "me_ldem", "bau_ldem"] {
        let scenario_dir = output_dir.join(scenario);
        for file_name in ["stack.csv", "transitions.csv", "availability.csv"] {
            assert!(
                scenario_dir.join(file_name).is_file(),
                "{file_name} missing for {scenario}"
            );
        }
        assert!(!scenario_dir.join("debug_plants.csv").exists());
    }
}
