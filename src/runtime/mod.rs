use std::process::{ExitCode, ExitStatus};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Config, LaunchMode};
use crate::environment::IsolatedEnvironment;
use crate::error::LaunchError;
use crate::launch::LaunchPlan;

/// How the child ended. Passed through as the launcher's own status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChildExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ChildExit {
    pub fn from_status(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            signal: exit_signal(&status),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Child's code, or `128 + signal` when it was killed.
    pub fn exit_code(&self) -> u8 {
        match (self.code, self.signal) {
            (Some(code), _) => u8::try_from(code).unwrap_or(1),
            (None, Some(signal)) => u8::try_from(128 + signal).unwrap_or(u8::MAX),
            (None, None) => 1,
        }
    }
}

impl From<ChildExit> for ExitCode {
    fn from(exit: ChildExit) -> Self {
        ExitCode::from(exit.exit_code())
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

pub struct Launcher {
    config: Config,
}

impl Launcher {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn locate_environment(&self) -> Result<IsolatedEnvironment, LaunchError> {
        let environment = IsolatedEnvironment::locate(
            &self.config.environment_path(),
            &self.config.program.interpreter,
        )?;
        Ok(environment)
    }

    /// Resolves the launch without starting anything.
    pub fn plan(&self) -> Result<LaunchPlan, LaunchError> {
        let environment = self.locate_environment()?;
        let activation = environment.activate()?;
        LaunchPlan::build(&self.config, &activation)
    }

    /// Activates the environment, starts the child and waits for it. The
    /// activation is held until the child has exited.
    pub async fn run(&self) -> Result<ChildExit, LaunchError> {
        let environment = self.locate_environment()?;
        let activation = environment.activate()?;
        info!(
            root = %environment.root().display(),
            interpreter = %environment.interpreter().display(),
            version = environment.marker().version().unwrap_or("unknown"),
            home = environment.marker().home().unwrap_or("unknown"),
            system_site_packages = environment.marker().include_system_site_packages(),
            "environment activated"
        );

        let plan = LaunchPlan::build(&self.config, &activation)?;
        let exit = match self.config.launch.mode {
            LaunchMode::Wait => spawn_and_wait(&plan).await?,
            LaunchMode::Replace => replace_process(&plan).await?,
        };
        drop(activation);
        Ok(exit)
    }
}

pub async fn spawn_and_wait(plan: &LaunchPlan) -> Result<ChildExit, LaunchError> {
    let mut command = tokio::process::Command::from(plan.to_command());
    let mut child = command
        .spawn()
        .map_err(|err| LaunchError::from_spawn(plan.program().to_path_buf(), err))?;
    let pid = child.id();
    info!(pid = ?pid, command = %plan.command_line(), "child started");

    let mut listen = true;
    let status = loop {
        tokio::select! {
            status = child.wait() => break status.map_err(LaunchError::Wait)?,
            signal = tokio::signal::ctrl_c(), if listen => match signal {
                Ok(()) => info!(pid = ?pid, "interrupt received; waiting for child to exit"),
                Err(err) => {
                    warn!(error = ?err, "failed to listen for ctrl-c");
                    listen = false;
                }
            },
        }
    };

    let exit = ChildExit::from_status(status);
    info!(code = ?exit.code, signal = ?exit.signal, "child exited");
    Ok(exit)
}

#[cfg(unix)]
async fn replace_process(plan: &LaunchPlan) -> Result<ChildExit, LaunchError> {
    use std::os::unix::process::CommandExt;

    info!(command = %plan.command_line(), "replacing launcher with child");
    let err = plan.to_command().exec();
    Err(LaunchError::from_spawn(plan.program().to_path_buf(), err))
}

#[cfg(not(unix))]
async fn replace_process(plan: &LaunchPlan) -> Result<ChildExit, LaunchError> {
    warn!("process replacement is unsupported on this platform; waiting instead");
    spawn_and_wait(plan).await
}
