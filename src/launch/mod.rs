use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;

use crate::config::Config;
use crate::environment::Activation;
use crate::error::LaunchError;

/// Interpreter-level filter for the deprecation-style warnings the
/// strategy program would otherwise print.
pub const WARNING_FILTER: &str = "ignore::FutureWarning";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgramFlag {
    Value {
        flag: &'static str,
        value: &'static str,
    },
    Switch {
        flag: &'static str,
    },
}

impl ProgramFlag {
    fn push_into(&self, args: &mut Vec<&'static str>) {
        match self {
            ProgramFlag::Value { flag, value } => {
                args.push(*flag);
                args.push(*value);
            }
            ProgramFlag::Switch { flag } => args.push(*flag),
        }
    }
}

pub const TRADING_TYPE: ProgramFlag = ProgramFlag::Value {
    flag: "-tt",
    value: "uni",
};
pub const DATA_PROVIDER: ProgramFlag = ProgramFlag::Value {
    flag: "-dp",
    value: "binance",
};
pub const USER_STRATEGY: ProgramFlag = ProgramFlag::Value {
    flag: "-us",
    value: "kdj",
};
pub const WARNING_GATE: ProgramFlag = ProgramFlag::Switch { flag: "-wg" };

/// Flags handed to the strategy program, in order.
pub const PROGRAM_FLAGS: [ProgramFlag; 4] =
    [TRADING_TYPE, DATA_PROVIDER, USER_STRATEGY, WARNING_GATE];

pub fn program_args() -> Vec<&'static str> {
    let mut args = Vec::with_capacity(7);
    for flag in &PROGRAM_FLAGS {
        flag.push_into(&mut args);
    }
    args
}

/// Everything needed to start the child, resolved up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchPlan {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: Vec<(String, String)>,
    pub env_remove: Vec<String>,
    #[serde(skip)]
    raw_args: Vec<OsString>,
    #[serde(skip)]
    raw_env: Vec<(OsString, OsString)>,
    #[serde(skip)]
    raw_env_remove: Vec<OsString>,
}

impl LaunchPlan {
    pub fn build(config: &Config, activation: &Activation<'_>) -> Result<Self, LaunchError> {
        let script_path = config.script_path();
        if !script_path.is_file() {
            return Err(LaunchError::ProgramNotFound { path: script_path });
        }

        let mut raw_args: Vec<OsString> = vec![
            OsString::from("-W"),
            OsString::from(WARNING_FILTER),
            config.program.script.clone().into_os_string(),
        ];
        raw_args.extend(program_args().into_iter().map(OsString::from));

        let raw_env: Vec<(OsString, OsString)> = activation
            .vars()
            .map(|(key, value)| (key.to_os_string(), value.to_os_string()))
            .collect();
        let raw_env_remove: Vec<OsString> =
            activation.removed().map(|key| key.to_os_string()).collect();

        Ok(Self {
            program: activation.environment().interpreter().to_path_buf(),
            args: raw_args.iter().map(lossy).collect(),
            working_dir: config.working_dir(),
            env: raw_env
                .iter()
                .map(|(key, value)| (lossy(key), lossy(value)))
                .collect(),
            env_remove: raw_env_remove.iter().map(lossy).collect(),
            raw_args,
            raw_env,
            raw_env_remove,
        })
    }

    /// Arguments after the script path.
    pub fn program_args(&self) -> &[String] {
        &self.args[3..]
    }

    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.raw_args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        for key in &self.raw_env_remove {
            command.env_remove(key);
        }
        for (key, value) in &self.raw_env {
            command.env(key, value);
        }
        command
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

fn lossy(value: &OsString) -> String {
    value.to_string_lossy().into_owned()
}
