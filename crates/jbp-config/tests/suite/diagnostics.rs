use jbp_config::{ConfigValidationError, ConfigWarning, JbpConfig};

#[test]
fn reports_unknown_keys() {
    let (_config, diagnostics) = JbpConfig::load_from_str_with_diagnostics(
        r#"
[jre]
version = "1.8.0_+"
vendor = "zulu"

[memory]
heap_ratio = 3

[extras]
enabled = true
"#,
    )
    .unwrap();

    assert_eq!(
        diagnostics.unknown_keys,
        vec!["extras", "jre.vendor", "memory.heap_ratio"]
    );
    assert!(diagnostics.is_ok());
}

#[test]
fn reports_invalid_memory_settings() {
    let (_config, diagnostics) = JbpConfig::load_from_str_with_diagnostics(
        r#"
[memory]
granularity = 0

[memory.weights]
heap = -1
stack = 1

[memory.sizes]
metaspace = "60%"
direct_memory = "50%"
"#,
    )
    .unwrap();

    assert!(!diagnostics.is_ok());
    assert!(diagnostics
        .errors
        .contains(&ConfigValidationError::InvalidValue {
            toml_path: "memory.weights.heap".to_string(),
            message: "must be a finite number >= 0".to_string(),
        }));
    assert!(diagnostics
        .errors
        .iter()
        .any(|err| matches!(err, ConfigValidationError::PercentagesExceedBudget { .. })));
    assert!(diagnostics
        .errors
        .iter()
        .any(|err| err.to_string().starts_with("memory.granularity")));
}

#[test]
fn all_zero_weights_are_an_error() {
    let (_config, diagnostics) = JbpConfig::load_from_str_with_diagnostics(
        r#"
[memory.weights]
heap = 0
stack = 0
"#,
    )
    .unwrap();

    assert_eq!(diagnostics.errors, vec![ConfigValidationError::AllWeightsZero]);
}

#[test]
fn warns_about_templates_and_stray_minimums() {
    let (_config, diagnostics) = JbpConfig::load_from_str_with_diagnostics(
        r#"
[memory.weights]
heap = 1

[memory.minimums]
stack = "16m"

[memory.flags]
heap = "-Xmx"

[logging]
level = "jbp=[[["
"#,
    )
    .unwrap();

    assert!(diagnostics.is_ok(), "{diagnostics:?}");
    assert!(diagnostics.warnings.contains(&ConfigWarning::MinimumWithoutWeight {
        toml_path: "memory.minimums.stack".to_string(),
    }));
    assert!(diagnostics
        .warnings
        .contains(&ConfigWarning::FlagTemplateMissingPlaceholder {
            toml_path: "memory.flags.heap".to_string(),
            template: "-Xmx".to_string(),
        }));
    assert!(diagnostics
        .warnings
        .iter()
        .any(|warning| matches!(warning, ConfigWarning::LoggingLevelInvalid { .. })));
}

#[test]
fn missing_archive_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("jbp.toml");
    std::fs::write(&config_path, "[jre]\narchive = \"jre.tar.gz\"\n").unwrap();

    let (config, diagnostics) = JbpConfig::load_from_path_with_diagnostics(&config_path).unwrap();
    assert_eq!(config.jre.archive, Some(dir.path().join("jre.tar.gz")));
    assert_eq!(
        diagnostics.warnings,
        vec![ConfigWarning::JreArchiveMissing {
            resolved: dir.path().join("jre.tar.gz"),
        }]
    );
}

#[test]
fn unknown_region_is_a_parse_error() {
    let err = JbpConfig::load_from_str_with_diagnostics(
        r#"
[memory.weights]
permgen = 5
"#,
    )
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("unknown variant"), "{message}");
    assert!(!message.contains("permgen"), "{message}");
}
