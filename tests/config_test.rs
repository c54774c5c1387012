//! Tests for config loading

use serial_test::serial;
use std::env;
use std::path::Path;

use rotapost::config::Config;
use rotapost::scheduler::CursorSeed;

const ENV_KEYS: &[&str] = &[
    "ROTAPOST_MAX_PER_ACTOR",
    "ROTAPOST_MAX_PER_TARGET",
    "ROTAPOST_TARGET_COOLDOWN_DAYS",
    "ROTAPOST_CONTENT_COOLDOWN_DAYS",
    "ROTAPOST_SLOT_INTERVAL",
    "ROTAPOST_WORKING_HOURS",
    "ROTAPOST_BREAK",
    "ROTAPOST_DEFAULT_COUNT",
    "ROTAPOST_PER_DAY",
    "ROTAPOST_ENFORCE_LINKAGE",
    "ROTAPOST_SQLITE_PATH",
    "ROTAPOST_BIND",
    "ROTAPOST_LOG_LEVEL",
    "ROTAPOST_LOG_FORMAT",
];

fn clear_env() {
    for key in ENV_KEYS {
        env::remove_var(key);
    }
}

#[test]
fn test_config_file_exists() {
    let config_path = Path::new("config.toml");
    assert!(
        config_path.exists(),
        "config.toml should exist in project root"
    );
}

#[test]
fn test_shipped_config_loads_and_validates() {
    let config = Config::load(Some(Path::new("config.toml"))).unwrap();

    assert_eq!(config.safety.max_per_actor_per_day, 5);
    assert_eq!(config.safety.max_per_target_per_day, 1);
    assert_eq!(config.safety.slot_interval_minutes, 20);
    assert!(config.safety.break_window.is_some());
    assert_eq!(config.planner.cursor_seed, CursorSeed::Fixed);
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_missing_file_is_an_error() {
    let err = Config::load(Some(Path::new("does/not/exist.toml"))).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read config file"));
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(
        &path,
        r#"
        [safety]
        max_per_actor_per_day = 0
        max_per_target_per_day = 1
        target_cooldown_days = 3
        content_reuse_cooldown_days = 7
        slot_interval_minutes = 20

        [safety.working_hours]
        start = "09:00"
        end = "18:00"
        "#,
    )
    .unwrap();

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(format!("{err:#}").contains("max_per_actor_per_day"));
}

#[test]
#[serial]
fn test_env_defaults() {
    clear_env();

    let config = Config::from_env().unwrap();
    let defaults = Config::default();

    assert_eq!(config.safety, defaults.safety);
    assert_eq!(config.server.bind_address, "127.0.0.1:8080");
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();

    env::set_var("ROTAPOST_MAX_PER_ACTOR", "3");
    env::set_var("ROTAPOST_SLOT_INTERVAL", "15");
    env::set_var("ROTAPOST_WORKING_HOURS", "08:00-16:00");
    env::set_var("ROTAPOST_BREAK", "none");
    env::set_var("ROTAPOST_ENFORCE_LINKAGE", "true");
    env::set_var("ROTAPOST_BIND", "0.0.0.0:9000");

    let config = Config::load(None).unwrap();

    assert_eq!(config.safety.max_per_actor_per_day, 3);
    assert_eq!(config.safety.slot_interval_minutes, 15);
    assert_eq!(
        config.safety.working_hours.start.format("%H:%M").to_string(),
        "08:00"
    );
    assert!(config.safety.break_window.is_none());
    assert!(config.planner.enforce_linkage);
    assert_eq!(config.server.bind_address, "0.0.0.0:9000");

    clear_env();
}

#[test]
#[serial]
fn test_env_malformed_window() {
    clear_env();
    env::set_var("ROTAPOST_WORKING_HOURS", "nine-to-five");

    assert!(Config::from_env().is_err());

    clear_env();
}
