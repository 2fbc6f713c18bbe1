use std::path::PathBuf;
use std::str::FromStr;

use strategy_launcher::config::{
    Config, ConfigError, ConfigOverrides, DEFAULT_CONFIG, LaunchMode, LogFormat,
    get_default_config,
};

#[test]
fn default_environment_and_program() {
    let config = get_default_config();

    assert_eq!(config.environment.path, PathBuf::from("venv"));
    assert_eq!(config.program.interpreter, "python");
    assert_eq!(config.program.script, PathBuf::from("main.py"));
    assert!(config.program.working_dir.is_none());
    assert_eq!(config.launch.mode, LaunchMode::Wait);
}

#[test]
fn default_logging_writes_no_files() {
    let config = get_default_config();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Text);
    assert!(!config.logging.to_file);
    assert_eq!(config.logging.directory, PathBuf::from("logs"));
    assert_eq!(config.logging.file_prefix, "launcher");
}

#[test]
fn default_config_is_valid() {
    assert!(DEFAULT_CONFIG.validate().is_ok());
}

#[test]
fn relative_paths_resolve_against_working_dir() {
    let mut config = Config::default();
    config.program.working_dir = Some(PathBuf::from("/srv/backtest"));

    assert_eq!(config.environment_path(), PathBuf::from("/srv/backtest/venv"));
    assert_eq!(config.script_path(), PathBuf::from("/srv/backtest/main.py"));

    config.environment.path = PathBuf::from("/opt/envs/kdj");
    assert_eq!(config.environment_path(), PathBuf::from("/opt/envs/kdj"));
}

#[test]
fn validation_rejects_interpreter_paths() {
    let mut config = Config::default();
    config.program.interpreter = "bin/python".to_string();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue {
            field: "program.interpreter",
            ..
        })
    ));
}

#[test]
fn validation_rejects_padded_interpreter() {
    let mut config = Config::default();
    config.program.interpreter = " python ".to_string();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue {
            field: "program.interpreter",
            ..
        })
    ));
}

#[test]
fn validation_rejects_blank_log_level() {
    for level in ["", "   "] {
        let mut config = Config::default();
        config.logging.level = level.to_string();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingValue {
                field: "logging.level"
            })
        ));
    }
}

#[test]
fn validation_rejects_empty_values() {
    let mut config = Config::default();
    config.program.script = PathBuf::new();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingValue {
            field: "program.script"
        })
    ));

    let mut config = Config::default();
    config.environment.path = PathBuf::new();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingValue {
            field: "environment.path"
        })
    ));

    let mut config = Config::default();
    config.logging.file_prefix = "  ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn validation_rejects_bad_log_filter() {
    let mut config = Config::default();
    config.logging.level = "strategy_launcher=loud".to_string();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue {
            field: "logging.level",
            ..
        })
    ));
}

#[test]
fn enums_parse_case_insensitively() {
    assert_eq!(LaunchMode::from_str("wait").unwrap(), LaunchMode::Wait);
    assert_eq!(LaunchMode::from_str(" EXEC ").unwrap(), LaunchMode::Replace);
    assert_eq!(LogFormat::from_str("Json").unwrap(), LogFormat::Json);
    assert!(LogFormat::from_str("xml").is_err());
}

#[test]
fn toml_overrides_accept_partial_sections() {
    let overrides = ConfigOverrides::from_toml_str(
        r#"
[launch]
mode = "REPLACE"
"#,
    )
    .unwrap();

    assert_eq!(overrides.launch.mode, Some(LaunchMode::Replace));
    assert!(overrides.logging.level.is_none());
}

#[test]
fn toml_overrides_reject_unknown_modes() {
    assert!(ConfigOverrides::from_toml_str("[launch]\nmode = \"DAEMON\"\n").is_err());
}
