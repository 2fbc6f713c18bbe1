use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigOverrides, LaunchMode};

/// Every flag is optional; with none given the launcher runs `main.py`
/// from `./venv` exactly as configured by default.
#[derive(Debug, Parser)]
#[command(
    name = "strategy-launcher",
    about = "Activate the strategy environment and run the KDJ backtest program"
)]
pub struct Cli {
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    #[arg(long, value_name = "DIR")]
    pub env_dir: Option<PathBuf>,
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,
    /// Replace this process with the child instead of waiting for it.
    #[arg(long)]
    pub exec: bool,
    /// Print the launch plan as JSON and exit without starting the child.
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::default();
        overrides.environment.path = self.env_dir.clone();
        overrides.program.working_dir = self.workdir.clone();
        overrides.program.script = self.script.clone();
        overrides.logging.level = self.log_level.clone();
        if self.exec {
            overrides.launch.mode = Some(LaunchMode::Replace);
        }
        overrides
    }
}
