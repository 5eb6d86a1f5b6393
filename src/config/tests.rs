use std::io::Write;

use serial_test::serial;

use super::*;

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(settings.cache.memory_capacity.is_none());
    assert_eq!(settings.cache.memory_shards.get(), 16);
    assert!(settings.cache.default_ttl.is_none());
    assert!(settings.database.url.is_none());
    assert_eq!(settings.database.max_connections.get(), 8);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("postgres://file".to_string());
    raw.logging.level = Some("info".to_string());

    let overrides = GlobalOverrides {
        database_url: Some("postgres://cli".to_string()),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.database.url.as_deref(), Some("postgres://cli"));
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = GlobalOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_capacity_means_unbounded() {
    let mut raw = RawSettings::default();
    raw.cache.memory_capacity = Some(0);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.cache.memory_capacity.is_none());
}

#[test]
fn zero_ttl_means_no_default_lifetime() {
    let mut raw = RawSettings::default();
    raw.cache.default_ttl_seconds = Some(0);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.cache.default_ttl.is_none());
}

#[test]
fn zero_shards_are_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.memory_shards = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero shards are invalid");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.memory_shards",
            ..
        }
    ));
}

#[test]
fn zero_pool_size_is_rejected() {
    let mut raw = RawSettings::default();
    raw.database.max_connections = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    let err = Settings::from_raw(raw).expect_err("unknown level");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "logging.level",
            ..
        }
    ));
}

#[test]
fn blank_database_url_is_treated_as_absent() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
#[serial]
fn explicit_config_file_is_loaded() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config file");
    writeln!(
        file,
        "[cache]\nmemory_capacity = 500\nmemory_shards = 4\ndefault_ttl_seconds = 90\n\n[database]\nurl = \"postgres://from-file\""
    )
    .expect("write config");

    let args = CliArgs::parse_from([
        "memfirst",
        "--config-file",
        file.path().to_str().expect("utf-8 temp path"),
        "clear",
    ]);
    let settings = load(&args).expect("settings load");

    assert_eq!(settings.cache.memory_capacity.map(NonZeroUsize::get), Some(500));
    assert_eq!(settings.cache.memory_shards.get(), 4);
    assert_eq!(settings.cache.default_ttl, Some(Duration::from_secs(90)));
    assert_eq!(settings.database.url.as_deref(), Some("postgres://from-file"));
}

#[test]
#[serial]
fn environment_overrides_file_and_cli_overrides_environment() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config file");
    writeln!(file, "[cache]\nmemory_shards = 4\n\n[logging]\nlevel = \"warn\"")
        .expect("write config");

    // SAFETY: serialized with every other test that reads the environment.
    unsafe {
        std::env::set_var("MEMFIRST__CACHE__MEMORY_SHARDS", "32");
        std::env::set_var("MEMFIRST__LOGGING__LEVEL", "debug");
    }

    let args = CliArgs::parse_from([
        "memfirst",
        "--config-file",
        file.path().to_str().expect("utf-8 temp path"),
        "--log-level",
        "trace",
        "clear",
    ]);
    let result = load(&args);

    unsafe {
        std::env::remove_var("MEMFIRST__CACHE__MEMORY_SHARDS");
        std::env::remove_var("MEMFIRST__LOGGING__LEVEL");
    }

    let settings = result.expect("settings load");
    assert_eq!(settings.cache.memory_shards.get(), 32);
    assert_eq!(settings.logging.level, LevelFilter::TRACE);
}

#[test]
fn parse_set_arguments() {
    let args = CliArgs::parse_from([
        "memfirst",
        "set",
        "user:42",
        "{\"name\":\"Ada\"}",
        "--ttl-seconds",
        "30",
        "--database-url",
        "postgres://example",
    ]);

    assert_eq!(
        args.overrides.database_url.as_deref(),
        Some("postgres://example")
    );
    match args.command {
        Command::Set(set) => {
            assert_eq!(set.key, "user:42");
            assert_eq!(set.value, "{\"name\":\"Ada\"}");
            assert_eq!(set.ttl_seconds, Some(30));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_maintenance_commands() {
    let clear = CliArgs::parse_from(["memfirst", "clear"]);
    assert!(matches!(clear.command, Command::Clear));

    let purge = CliArgs::parse_from(["memfirst", "purge-expired"]);
    assert!(matches!(purge.command, Command::PurgeExpired));

    let delete = CliArgs::parse_from(["memfirst", "delete", "user:42"]);
    assert!(matches!(delete.command, Command::Delete(KeyArgs { ref key }) if key == "user:42"));
}
