#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use uuid::Uuid;

use strategy_launcher::config::Config;

/// Serialises tests that write and exec scripts so a concurrent fork cannot
/// hold a script open for writing (ETXTBSY).
static PROCESS_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub fn process_lock() -> MutexGuard<'static, ()> {
    PROCESS_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub const MARKER: &str =
    "home = /usr/bin\ninclude-system-site-packages = false\nversion = 3.11.4\n";

/// Fake interpreter: records argv and environment into the working
/// directory, then exits with `code`.
pub fn recording_python(code: i32) -> String {
    format!(
        r#"#!/bin/sh
: > args.txt
for arg in "$@"; do printf '%s\n' "$arg" >> args.txt; done
printf '%s\n' "$VIRTUAL_ENV" > virtual_env.txt
printf '%s\n' "$PATH" > path.txt
exit {code}
"#
    )
}

pub struct Sandbox {
    pub root: PathBuf,
}

impl Sandbox {
    pub fn new(label: &str) -> Self {
        let root = std::env::temp_dir()
            .join(format!("strategy_launcher_{label}_{}", Uuid::new_v4()));
        fs::create_dir_all(&root).unwrap();
        Self { root }
    }

    pub fn env_dir(&self) -> PathBuf {
        self.root.join("venv")
    }

    pub fn write_marker(&self, content: &str) {
        fs::create_dir_all(self.env_dir()).unwrap();
        fs::write(self.env_dir().join("pyvenv.cfg"), content).unwrap();
    }

    pub fn write_interpreter(&self, body: &str, mode: u32) -> PathBuf {
        let bin = self.env_dir().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let path = bin.join("python");
        fs::write(&path, body).unwrap();
        set_mode(&path, mode);
        path
    }

    /// A complete environment whose interpreter exits with `code`.
    pub fn create_environment(&self, code: i32) -> PathBuf {
        self.write_marker(MARKER);
        self.write_interpreter(&recording_python(code), 0o755)
    }

    pub fn create_script(&self) -> PathBuf {
        let path = self.root.join("main.py");
        fs::write(&path, "print('strategy')\n").unwrap();
        path
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.program.working_dir = Some(self.root.clone());
        config
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.root.join(name)).unwrap()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.root.join(name).exists()
    }

    pub fn read_lines(&self, name: &str) -> Vec<String> {
        self.read(name).lines().map(str::to_string).collect()
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

#[cfg(unix)]
fn set_mode(path: &std::path::Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

#[cfg(not(unix))]
fn set_mode(_path: &std::path::Path, _mode: u32) {}
