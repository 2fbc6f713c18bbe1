use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use strategy_launcher::cli::Cli;
use strategy_launcher::config::{Config, load_config_with_cli};
use strategy_launcher::error::LaunchError;
use strategy_launcher::logging::init_logging;
use strategy_launcher::runtime::Launcher;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config_with_cli(cli.config.as_deref(), Some(cli.overrides())) {
        Ok(config) => config,
        Err(err) => return report_early(LaunchError::from(err)),
    };
    let log_path = match init_logging(&config.logging) {
        Ok(path) => path,
        Err(err) => return report_early(LaunchError::from(err)),
    };
    if let Some(path) = log_path {
        info!(path = %path.display(), "logging to file");
    }

    match run(&cli, config).await {
        Ok(code) => code,
        Err(err) => {
            error!("launch failed: {err}");
            err.downcast_ref::<LaunchError>()
                .map(ExitCode::from)
                .unwrap_or(ExitCode::FAILURE)
        }
    }
}

async fn run(cli: &Cli, config: Config) -> anyhow::Result<ExitCode> {
    info!(
        environment = %config.environment_path().display(),
        script = %config.script_path().display(),
        mode = ?config.launch.mode,
        "configuration loaded"
    );
    let launcher = Launcher::new(config);

    if cli.dry_run {
        let plan = launcher.plan()?;
        let payload = serde_json::to_string_pretty(&plan).context("format launch plan")?;
        println!("{payload}");
        return Ok(ExitCode::SUCCESS);
    }

    let exit = launcher.run().await?;
    Ok(ExitCode::from(exit))
}

fn report_early(err: LaunchError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}
