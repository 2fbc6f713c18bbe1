use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const ENV_PREFIX: &str = "LAUNCHER_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
    #[error("missing required value for {field}")]
    MissingValue { field: &'static str },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("dotenv parse error: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchMode {
    /// Spawn the child and wait for it.
    #[default]
    Wait,
    /// Replace the launcher process with the child (Unix `exec`).
    Replace,
}

impl FromStr for LaunchMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "WAIT" => Ok(LaunchMode::Wait),
            "REPLACE" | "EXEC" => Ok(LaunchMode::Replace),
            _ => Err(ConfigError::InvalidValue {
                field: "launch.mode",
                message: format!("unsupported launch mode: {value}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogFormat {
    Json,
    #[default]
    Text,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "JSON" => Ok(LogFormat::Json),
            "TEXT" => Ok(LogFormat::Text),
            _ => Err(ConfigError::InvalidValue {
                field: "logging.format",
                message: format!("unsupported log format: {value}"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub path: PathBuf,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("venv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramConfig {
    pub interpreter: String,
    pub script: PathBuf,
    pub working_dir: Option<PathBuf>,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            interpreter: "python".to_string(),
            script: PathBuf::from("main.py"),
            working_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LaunchConfig {
    pub mode: LaunchMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub to_file: bool,
    pub directory: PathBuf,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            to_file: false,
            directory: PathBuf::from("logs"),
            file_prefix: "launcher".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    pub environment: EnvironmentConfig,
    pub program: ProgramConfig,
    pub launch: LaunchConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingValue {
                field: "environment.path",
            });
        }
        let interpreter = self.program.interpreter.as_str();
        if interpreter.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                field: "program.interpreter",
            });
        }
        if interpreter.trim() != interpreter {
            return Err(ConfigError::InvalidValue {
                field: "program.interpreter",
                message: "must not have surrounding whitespace".to_string(),
            });
        }
        if interpreter.contains('/') || interpreter.contains('\\') {
            return Err(ConfigError::InvalidValue {
                field: "program.interpreter",
                message: "must be a file name inside the environment".to_string(),
            });
        }
        if self.program.script.as_os_str().is_empty() {
            return Err(ConfigError::MissingValue {
                field: "program.script",
            });
        }
        if let Some(dir) = &self.program.working_dir
            && dir.as_os_str().is_empty()
        {
            return Err(ConfigError::InvalidValue {
                field: "program.working_dir",
                message: "must not be empty".to_string(),
            });
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                field: "logging.level",
            });
        }
        if let Err(err) = EnvFilter::try_new(&self.logging.level) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level",
                message: err.to_string(),
            });
        }
        if self.logging.directory.as_os_str().is_empty() {
            return Err(ConfigError::MissingValue {
                field: "logging.directory",
            });
        }
        if self.logging.file_prefix.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                field: "logging.file_prefix",
            });
        }
        Ok(())
    }

    /// Directory the child runs in; relative paths resolve against it.
    pub fn working_dir(&self) -> PathBuf {
        self.program
            .working_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn environment_path(&self) -> PathBuf {
        resolve(&self.working_dir(), &self.environment.path)
    }

    pub fn script_path(&self) -> PathBuf {
        resolve(&self.working_dir(), &self.program.script)
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(value) = overrides.environment.path {
            self.environment.path = value;
        }
        if let Some(value) = overrides.program.interpreter {
            self.program.interpreter = value;
        }
        if let Some(value) = overrides.program.script {
            self.program.script = value;
        }
        if let Some(value) = overrides.program.working_dir {
            self.program.working_dir = Some(value);
        }
        if let Some(value) = overrides.launch.mode {
            self.launch.mode = value;
        }
        if let Some(value) = overrides.logging.level {
            self.logging.level = value;
        }
        if let Some(value) = overrides.logging.format {
            self.logging.format = value;
        }
        if let Some(value) = overrides.logging.to_file {
            self.logging.to_file = value;
        }
        if let Some(value) = overrides.logging.directory {
            self.logging.directory = value;
        }
        if let Some(value) = overrides.logging.file_prefix {
            self.logging.file_prefix = value;
        }
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub environment: EnvironmentOverrides,
    #[serde(default)]
    pub program: ProgramOverrides,
    #[serde(default)]
    pub launch: LaunchOverrides,
    #[serde(default)]
    pub logging: LoggingOverrides,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnvironmentOverrides {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProgramOverrides {
    pub interpreter: Option<String>,
    pub script: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LaunchOverrides {
    pub mode: Option<LaunchMode>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingOverrides {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
    pub to_file: Option<bool>,
    pub directory: Option<PathBuf>,
    pub file_prefix: Option<String>,
}

impl ConfigOverrides {
    pub fn from_toml_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let overrides = toml::from_str(content)?;
        Ok(overrides)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `LAUNCHER_*` keys from a `.env` file without touching the
    /// process environment. A missing file yields no overrides.
    pub fn from_dotenv_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Ok(ConfigOverrides::default());
        }
        let mut vars = HashMap::new();
        for item in dotenvy::from_path_iter(path)? {
            let (key, value) = item?;
            if key.starts_with(ENV_PREFIX) {
                vars.insert(key, value);
            }
        }
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut overrides = ConfigOverrides::default();
        if let Some(value) = lookup("LAUNCHER_ENV_DIR") {
            overrides.environment.path = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("LAUNCHER_INTERPRETER") {
            overrides.program.interpreter = Some(value);
        }
        if let Some(value) = lookup("LAUNCHER_SCRIPT") {
            overrides.program.script = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("LAUNCHER_WORKDIR") {
            overrides.program.working_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("LAUNCHER_MODE") {
            overrides.launch.mode = Some(LaunchMode::from_str(&value)?);
        }
        if let Some(value) = lookup("LAUNCHER_LOG_LEVEL") {
            overrides.logging.level = Some(value);
        }
        if let Some(value) = lookup("LAUNCHER_LOG_FORMAT") {
            overrides.logging.format = Some(LogFormat::from_str(&value)?);
        }
        if let Some(value) = lookup("LAUNCHER_LOG_TO_FILE") {
            overrides.logging.to_file = Some(parse_bool(&value, "logging.to_file")?);
        }
        if let Some(value) = lookup("LAUNCHER_LOG_DIR") {
            overrides.logging.directory = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("LAUNCHER_LOG_PREFIX") {
            overrides.logging.file_prefix = Some(value);
        }
        Ok(overrides)
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    load_config_with_cli(path, None)
}

pub fn load_config_with_cli(
    path: Option<&Path>,
    cli_overrides: Option<ConfigOverrides>,
) -> Result<Config, ConfigError> {
    load_config_from_sources(path, Path::new(".env"), cli_overrides)
}

/// Layers, later wins: defaults, TOML file, `.env`, process env, CLI.
pub fn load_config_from_sources(
    path: Option<&Path>,
    dotenv_path: &Path,
    cli_overrides: Option<ConfigOverrides>,
) -> Result<Config, ConfigError> {
    let mut config = Config::default();
    if let Some(path) = path {
        let file_overrides = ConfigOverrides::from_toml_path(path)?;
        config.apply_overrides(file_overrides);
    }
    let dotenv_overrides = ConfigOverrides::from_dotenv_path(dotenv_path)?;
    config.apply_overrides(dotenv_overrides);
    let env_overrides = ConfigOverrides::from_env()?;
    config.apply_overrides(env_overrides);
    if let Some(cli_overrides) = cli_overrides {
        config.apply_overrides(cli_overrides);
    }
    config.validate()?;
    Ok(config)
}

fn parse_bool(value: &str, field: &'static str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            field,
            message: format!("invalid bool: {other}"),
        }),
    }
}

pub static DEFAULT_CONFIG: Lazy<Config> = Lazy::new(Config::default);

pub fn get_default_config() -> Config {
    DEFAULT_CONFIG.clone()
}
