#![allow(clippy::unwrap_used)]
// File-based config loading and token lookup.

use std::path::PathBuf;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;
use tempfile::TempDir;

use zerofly_config::{
    Config, ConfigError, TokenSource, load_config_from, prepare_token_dir, read_token_file,
    resolve_token_from_files, save_config_to, to_daemon_config,
};

// ── Loading ─────────────────────────────────────────────────────────

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config_from(&dir.path().join("config.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_sections_override_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[daemon]
url = "http://127.0.0.1:9994/"
token_file = "/tmp/zt-token"
elevate = ""

[sync]
poll_interval_ms = 500
follow_up_refresh_ms = [250]

[commands]
max_concurrent = 4
"#,
    )
    .unwrap();

    let config = load_config_from(&path).unwrap();
    assert_eq!(config.daemon.url, "http://127.0.0.1:9994/");
    assert_eq!(config.daemon.token_file, Some(PathBuf::from("/tmp/zt-token")));
    // Untouched keys keep their defaults.
    assert_eq!(config.daemon.service_unit, "zerotier-one");
    assert_eq!(config.sync.backoff_max_secs, 30);

    let daemon = to_daemon_config(&config, "t".to_owned().into()).unwrap();
    assert_eq!(daemon.sync.poll_interval, Duration::from_millis(500));
    assert_eq!(daemon.sync.follow_up_refresh, vec![Duration::from_millis(250)]);
    assert_eq!(daemon.max_concurrent_commands, 4);
    assert_eq!(daemon.elevate, None);
}

#[test]
fn test_wrong_type_is_a_load_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[sync]\npoll_interval_ms = \"fast\"\n").unwrap();

    assert!(matches!(load_config_from(&path), Err(ConfigError::Figment(_))));
}

#[test]
fn test_saved_config_loads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.daemon.host_timeout_secs = 90;
    config.defaults.output = "json".into();
    save_config_to(&config, &path).unwrap();

    assert_eq!(load_config_from(&path).unwrap(), config);
}

// ── Token files ─────────────────────────────────────────────────────

#[test]
fn test_token_file_is_trimmed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("authtoken.secret");
    std::fs::write(&path, "  abc123token\n").unwrap();

    let token = read_token_file(&path).unwrap().unwrap();
    assert_eq!(token.expose_secret(), "abc123token");
}

#[test]
fn test_first_non_empty_file_wins() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing");
    let blank = dir.path().join("blank");
    let real = dir.path().join("real");
    let later = dir.path().join("later");
    std::fs::write(&blank, "\n").unwrap();
    std::fs::write(&real, "from-real").unwrap();
    std::fs::write(&later, "from-later").unwrap();

    let resolved =
        resolve_token_from_files(&[missing, blank, real.clone(), later]).unwrap();
    assert_eq!(resolved.token.expose_secret(), "from-real");
    assert_eq!(resolved.source, TokenSource::File(real));
}

#[test]
fn test_no_token_lists_searched_locations() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("authtoken.secret");

    let err = resolve_token_from_files(std::slice::from_ref(&missing)).unwrap_err();
    let ConfigError::NoToken { searched } = err else {
        panic!("expected NoToken, got {err:?}");
    };
    assert!(searched.contains("ZEROFLY_TOKEN"));
    assert!(searched.contains(&missing.display().to_string()));
}

// ── Token provisioning ──────────────────────────────────────────────

#[test]
fn test_token_dir_is_created_and_owner_reported() {
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("zerofly").join("authtoken.secret");

    let owner = prepare_token_dir(&dest).unwrap();
    assert!(dest.parent().unwrap().is_dir());
    assert!(!dest.exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let meta = std::fs::metadata(dir.path()).unwrap();
        assert_eq!(owner, Some((meta.uid(), meta.gid())));
    }
    #[cfg(not(unix))]
    assert_eq!(owner, None);
}
