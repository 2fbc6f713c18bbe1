use std::fs;

use chrono::{Local, TimeZone};
use uuid::Uuid;

use strategy_launcher::config::LoggingConfig;
use strategy_launcher::logging::{
    GITIGNORE_CONTENT, log_file_name, open_log_file, prepare_log_dir,
};

#[test]
fn log_file_name_carries_prefix_and_timestamp() {
    let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();

    assert_eq!(log_file_name("launcher", now), "launcher-2024-03-09_07-05-01.log");
    assert_eq!(log_file_name("", now), "2024-03-09_07-05-01.log");
}

#[test]
fn prepare_log_dir_creates_gitignore_once() {
    let dir = std::env::temp_dir()
        .join(format!("launcher_logs_{}", Uuid::new_v4()))
        .join("logs");

    prepare_log_dir(&dir).unwrap();
    let gitignore = dir.join(".gitignore");
    assert_eq!(fs::read_to_string(&gitignore).unwrap(), GITIGNORE_CONTENT);

    fs::write(&gitignore, "custom\n").unwrap();
    prepare_log_dir(&dir).unwrap();
    assert_eq!(fs::read_to_string(&gitignore).unwrap(), "custom\n");

    fs::remove_dir_all(dir.parent().unwrap()).unwrap();
}

#[test]
fn open_log_file_creates_file_in_directory() {
    let root = std::env::temp_dir().join(format!("launcher_logs_{}", Uuid::new_v4()));
    let config = LoggingConfig {
        directory: root.clone(),
        file_prefix: "kdj".to_string(),
        ..LoggingConfig::default()
    };
    let now = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

    let (_file, path) = open_log_file(&config, now).unwrap();

    assert_eq!(path, root.join("kdj-2024-01-02_03-04-05.log"));
    assert!(path.is_file());
    assert!(root.join(".gitignore").is_file());

    fs::remove_dir_all(&root).unwrap();
}
