use std::path::Path;
use uplift_core::{config::SimConfig, error::SimError};

#[test]
fn shipped_settings_match_defaults() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../data/settings.json");
    let config = SimConfig::load(&path).unwrap();
    assert_eq!(config, SimConfig::default());
}

#[test]
fn missing_settings_file_is_fatal() {
    let result = SimConfig::load(Path::new("no/such/settings.json"));
    assert!(matches!(result, Err(SimError::ConfigNotFound { .. })));
}

#[test]
fn inverted_horizon_is_invalid() {
    let json = r#"{ "simulation": { "start_date": "2024-03-01", "end_date": "2024-01-01" } }"#;
    assert!(matches!(SimConfig::from_json(json), Err(SimError::InvalidConfig(_))));
}

#[test]
fn zero_customers_is_invalid() {
    let json = r#"{ "simulation": { "n_customers": 0 } }"#;
    assert!(matches!(SimConfig::from_json(json), Err(SimError::InvalidConfig(_))));
}

#[test]
fn partial_settings_override_only_what_they_name() {
    let json = r#"{ "project": { "random_seed": 7 }, "governance": { "min_group_size": 10 } }"#;
    let config = SimConfig::from_json(json).unwrap();
    assert_eq!(config.project.random_seed, 7);
    assert_eq!(config.governance.min_group_size, 10);
    assert_eq!(config.governance.significance_z, 3.0);
    assert_eq!(config.simulation.n_customers, 25_000);
}
