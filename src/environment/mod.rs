//! Isolated runtime environment discovery and activation.
//!
//! Activation never touches the launcher's own process environment. It
//! produces an overlay that is applied to the child command only, so the
//! prior environment is restored on every exit path by construction.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub const MARKER_FILE: &str = "pyvenv.cfg";

#[cfg(windows)]
pub const BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
pub const BIN_DIR: &str = "bin";

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("environment not found at {}", path.display())]
    NotFound { path: PathBuf },
    #[error("environment path is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },
    #[error("environment at {} has no pyvenv.cfg", path.display())]
    MissingMarker { path: PathBuf },
    #[error("corrupt pyvenv.cfg at line {line}: {content}")]
    CorruptMarker { line: usize, content: String },
    #[error("environment at {} has no interpreter {}", root.display(), interpreter.display())]
    MissingInterpreter { root: PathBuf, interpreter: PathBuf },
    #[error("cannot build PATH: {0}")]
    Path(#[from] std::env::JoinPathsError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsed `pyvenv.cfg`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvironmentMarker {
    entries: BTreeMap<String, String>,
}

impl EnvironmentMarker {
    pub fn parse(content: &str) -> Result<Self, EnvironmentError> {
        let mut entries = BTreeMap::new();
        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(EnvironmentError::CorruptMarker {
                    line: index + 1,
                    content: raw.to_string(),
                });
            };
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                return Err(EnvironmentError::CorruptMarker {
                    line: index + 1,
                    content: raw.to_string(),
                });
            }
            entries.insert(key, value.trim().to_string());
        }
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn home(&self) -> Option<&str> {
        self.get("home")
    }

    pub fn version(&self) -> Option<&str> {
        self.get("version").or_else(|| self.get("version_info"))
    }

    pub fn prompt(&self) -> Option<&str> {
        self.get("prompt")
            .map(|value| value.trim_matches(|c| c == '\'' || c == '"'))
            .filter(|value| !value.is_empty())
    }

    pub fn include_system_site_packages(&self) -> bool {
        self.get("include-system-site-packages")
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// A validated environment directory.
#[derive(Debug, Clone, Serialize)]
pub struct IsolatedEnvironment {
    root: PathBuf,
    bin_dir: PathBuf,
    interpreter: PathBuf,
    marker: EnvironmentMarker,
}

impl IsolatedEnvironment {
    /// Checks that `root` looks like a usable environment holding
    /// `interpreter` in its binary directory.
    pub fn locate(root: &Path, interpreter: &str) -> Result<Self, EnvironmentError> {
        if !root.exists() {
            return Err(EnvironmentError::NotFound {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(EnvironmentError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        let root = std::path::absolute(root)?;

        let marker_path = root.join(MARKER_FILE);
        if !marker_path.is_file() {
            return Err(EnvironmentError::MissingMarker { path: root });
        }
        let marker = EnvironmentMarker::parse(&std::fs::read_to_string(&marker_path)?)?;

        let bin_dir = root.join(BIN_DIR);
        let interpreter = bin_dir.join(executable_name(interpreter));
        if !interpreter.is_file() {
            return Err(EnvironmentError::MissingInterpreter { root, interpreter });
        }

        Ok(Self {
            root,
            bin_dir,
            interpreter,
            marker,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    pub fn marker(&self) -> &EnvironmentMarker {
        &self.marker
    }

    pub fn prompt(&self) -> String {
        match self.marker.prompt() {
            Some(prompt) => prompt.to_string(),
            None => self
                .root
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    pub fn activate(&self) -> Result<Activation<'_>, EnvironmentError> {
        self.activate_with_path(std::env::var_os("PATH"))
    }

    /// Builds the overlay against an explicit inherited `PATH`.
    pub fn activate_with_path(
        &self,
        inherited_path: Option<OsString>,
    ) -> Result<Activation<'_>, EnvironmentError> {
        let mut entries = vec![self.bin_dir.clone()];
        if let Some(path) = inherited_path.as_deref() {
            entries.extend(std::env::split_paths(path).filter(|entry| entry != &self.bin_dir));
        }
        let path = std::env::join_paths(entries)?;

        let set = vec![
            (OsString::from("VIRTUAL_ENV"), self.root.clone().into_os_string()),
            (OsString::from("VIRTUAL_ENV_PROMPT"), OsString::from(self.prompt())),
            (OsString::from("PATH"), path),
        ];
        let remove = vec![OsString::from("PYTHONHOME")];

        debug!(root = %self.root.display(), "acquired environment");
        Ok(Activation {
            environment: self,
            set,
            remove,
        })
    }
}

/// Scoped environment overlay. Dropping it releases the environment.
#[derive(Debug)]
pub struct Activation<'a> {
    environment: &'a IsolatedEnvironment,
    set: Vec<(OsString, OsString)>,
    remove: Vec<OsString>,
}

impl Activation<'_> {
    pub fn environment(&self) -> &IsolatedEnvironment {
        self.environment
    }

    pub fn vars(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.set
            .iter()
            .map(|(key, value)| (key.as_os_str(), value.as_os_str()))
    }

    pub fn var(&self, key: &str) -> Option<&OsStr> {
        self.vars()
            .find(|(name, _)| *name == OsStr::new(key))
            .map(|(_, value)| value)
    }

    pub fn removed(&self) -> impl Iterator<Item = &OsStr> {
        self.remove.iter().map(OsString::as_os_str)
    }
}

impl Drop for Activation<'_> {
    fn drop(&mut self) {
        debug!(root = %self.environment.root.display(), "released environment");
    }
}

#[cfg(windows)]
fn executable_name(name: &str) -> String {
    if Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{name}.exe")
    }
}

#[cfg(not(windows))]
fn executable_name(name: &str) -> String {
    name.to_string()
}
