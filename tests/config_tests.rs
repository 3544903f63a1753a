//! Settings loading and validation tests.

use std::fs;

use tempfile::TempDir;

use incline::{GeneratorKind, NaryRestriction, Settings};

fn write_settings(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("incline.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn loads_a_full_profile_from_toml() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(
        &dir,
        r#"
            drop_nulls = true
            max_arity = 3
            num_column_bits = 12
            sample_rows = 1000
            nary_restriction = "dep_ref_disjoint"
            candidate_generator = "binder"
            candidate_chunk_size = 500

            [csv]
            field_separator = ";"
            null_string = "\\N"
            has_header = false

            [logging]
            level = "debug"
        "#,
    );
    let settings = Settings::load_with(Some(&path), serde_json::json!({})).unwrap();
    assert!(settings.drop_nulls);
    assert_eq!(settings.max_arity, 3);
    assert_eq!(settings.num_column_bits, 12);
    assert_eq!(settings.sample_rows, 1000);
    assert_eq!(
        settings.nary_restriction,
        Some(NaryRestriction::DepRefDisjoint)
    );
    assert_eq!(settings.candidate_generator, Some(GeneratorKind::Binder));
    assert_eq!(settings.candidate_chunk_size, Some(500));
    assert_eq!(settings.csv.field_separator, ';');
    assert_eq!(settings.csv.null_string.as_deref(), Some("\\N"));
    assert!(!settings.csv.has_header);
    assert_eq!(settings.logging.level, "debug");
    assert!(settings.validate().is_ok());
}

#[test]
fn missing_drop_nulls_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(&dir, "max_arity = 1\n");
    let err = Settings::load_with(Some(&path), serde_json::json!({})).unwrap_err();
    assert!(err.to_string().contains("drop_nulls"));
}

#[test]
fn overrides_win_over_the_file() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(&dir, "drop_nulls = true\nmax_arity = 2\n");
    let settings = Settings::load_with(
        Some(&path),
        serde_json::json!({
            "max_arity": 1,
            "csv": { "field_separator": "\t" },
        }),
    )
    .unwrap();
    assert_eq!(settings.max_arity, 1);
    assert!(settings.drop_nulls);
    assert_eq!(settings.csv.field_separator, '\t');
}

#[test]
fn overrides_alone_can_satisfy_required_options() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(&dir, "max_arity = 1\n");
    let settings =
        Settings::load_with(Some(&path), serde_json::json!({ "drop_nulls": false })).unwrap();
    assert!(!settings.drop_nulls);
    assert_eq!(settings.max_arity, 1);
}

#[test]
fn unset_options_take_their_documented_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(&dir, "drop_nulls = true\nmax_arity = 1\n");
    let settings = Settings::load_with(Some(&path), serde_json::json!({})).unwrap();
    assert_eq!(settings.num_column_bits, 16);
    assert_eq!(settings.max_columns, -1);
    assert_eq!(settings.sample_rows, -1);
    assert!(!settings.only_count_inds);
    assert!(settings.exclude_trivial_inds);
    assert_eq!(settings.nary_restriction, None);
    assert_eq!(settings.candidate_generator, None);
    assert_eq!(settings.csv.quote_char, '"');
    assert_eq!(settings.logging.level, "info");
}

#[test]
fn settings_round_trip_through_toml() {
    let settings = Settings::with_drop_nulls(true);
    let rendered = toml::to_string(&settings).unwrap();
    let dir = TempDir::new().unwrap();
    let path = write_settings(&dir, &rendered);
    let reloaded = Settings::load_with(Some(&path), serde_json::json!({})).unwrap();
    assert_eq!(reloaded.drop_nulls, settings.drop_nulls);
    assert_eq!(reloaded.max_arity, settings.max_arity);
    assert_eq!(reloaded.csv.field_separator, settings.csv.field_separator);
}
