//! Configuration for the zerofly CLI.
//!
//! TOML file + `ZEROFLY_*` environment overrides, auth-token resolution
//! (env, keyring, token files), and translation to
//! `zerofly_core::DaemonConfig`. The CLI layers its flag overrides on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use zerofly_core::{DaemonConfig, SyncConfig, config as core_config};

/// Env var checked first for the auth token.
pub const TOKEN_ENV: &str = "ZEROFLY_TOKEN";

/// Keyring service / user the token may be stored under.
pub const KEYRING_SERVICE: &str = "zerofly";
pub const KEYRING_USER: &str = "authtoken";

/// Where the daemon writes its token on Linux installs.
pub const SYSTEM_TOKEN_FILE: &str = "/var/lib/zerotier-one/authtoken.secret";

/// Per-user copy the desktop clients conventionally keep.
const USER_TOKEN_FILE: &str = ".zeroTierOneAuthToken";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no auth token found (searched: {searched})")]
    NoToken { searched: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub daemon: DaemonSection,

    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub commands: CommandsSection,
}

/// Presentation defaults for the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// How to reach and control the local daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DaemonSection {
    /// Local API base URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Token file tried before the well-known locations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_host_timeout_secs")]
    pub host_timeout_secs: u64,

    #[serde(default = "default_service_unit")]
    pub service_unit: String,

    /// Privilege helper for interface changes. Empty runs them directly.
    #[serde(default = "default_elevate")]
    pub elevate: String,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            token_file: None,
            timeout_secs: default_timeout_secs(),
            host_timeout_secs: default_host_timeout_secs(),
            service_unit: default_service_unit(),
            elevate: default_elevate(),
        }
    }
}

fn default_url() -> String {
    core_config::DEFAULT_URL.into()
}
fn default_timeout_secs() -> u64 {
    5
}
fn default_host_timeout_secs() -> u64 {
    60
}
fn default_service_unit() -> String {
    core_config::DEFAULT_SERVICE_UNIT.into()
}
fn default_elevate() -> String {
    core_config::DEFAULT_ELEVATE.into()
}

/// Poll cadence and read-path backoff.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncSection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,

    /// Extra refreshes after a join, in milliseconds after completion.
    #[serde(default = "default_follow_up_refresh_ms")]
    pub follow_up_refresh_ms: Vec<u64>,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_secs: default_backoff_max_secs(),
            follow_up_refresh_ms: default_follow_up_refresh_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2_000
}
fn default_backoff_base_ms() -> u64 {
    1_000
}
fn default_backoff_max_secs() -> u64 {
    30
}
fn default_follow_up_refresh_ms() -> Vec<u64> {
    vec![1_000, 5_000]
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandsSection {
    /// Commands allowed to run at once across different networks.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CommandsSection {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    2
}

// ── Config file path ────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "zerofly", "zerofly")
}

/// Directory holding `config.toml` (and optionally `authtoken.secret`).
pub fn config_dir() -> PathBuf {
    project_dirs().map_or_else(dirs_fallback, |dirs| dirs.config_dir().to_path_buf())
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("zerofly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file yields the defaults.
///
/// `ZEROFLY_<SECTION>__<KEY>` overrides any file value, e.g.
/// `ZEROFLY_DAEMON__URL` or `ZEROFLY_SYNC__POLL_INTERVAL_MS`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ZEROFLY_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Where a resolved token came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Passed explicitly (CLI flag).
    Explicit,
    Env,
    Keyring,
    File(PathBuf),
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit => f.write_str("command line"),
            Self::Env => write!(f, "${TOKEN_ENV}"),
            Self::Keyring => write!(f, "keyring ({KEYRING_SERVICE}/{KEYRING_USER})"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedToken {
    pub token: SecretString,
    pub source: TokenSource,
}

/// Token files in lookup order: configured file, per-user copy, config
/// dir, system location.
pub fn token_candidates(config: &Config) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(ref file) = config.daemon.token_file {
        paths.push(file.clone());
    }
    if let Some(base) = BaseDirs::new() {
        paths.push(base.home_dir().join(USER_TOKEN_FILE));
    }
    paths.push(user_token_path());
    paths.push(PathBuf::from(SYSTEM_TOKEN_FILE));
    paths
}

/// Per-user copy of the daemon's token, as written by `config fetch-token`.
pub fn user_token_path() -> PathBuf {
    config_dir().join("authtoken.secret")
}

/// `true` only when the daemon's token is known to be absent, which means
/// the service has never been started. An unreadable directory is not proof.
pub fn system_token_missing() -> bool {
    matches!(Path::new(SYSTEM_TOKEN_FILE).try_exists(), Ok(false))
}

/// Create the directory that will hold `dest` and return its owner
/// (uid, gid), which a copied token should be given. `None` where the
/// platform has no such notion.
pub fn prepare_token_dir(dest: &Path) -> Result<Option<(u32, u32)>, ConfigError> {
    let dir = dest.parent().ok_or_else(|| ConfigError::Validation {
        field: "token path".into(),
        reason: format!("{} has no parent directory", dest.display()),
    })?;
    std::fs::create_dir_all(dir)?;
    owner_of(dir)
}

#[cfg(unix)]
fn owner_of(dir: &Path) -> Result<Option<(u32, u32)>, ConfigError> {
    use std::os::unix::fs::MetadataExt;

    let meta = std::fs::metadata(dir)?;
    Ok(Some((meta.uid(), meta.gid())))
}

#[cfg(not(unix))]
fn owner_of(_dir: &Path) -> Result<Option<(u32, u32)>, ConfigError> {
    Ok(None)
}

/// Resolve the auth token: `ZEROFLY_TOKEN`, then the keyring, then the
/// token files.
pub fn resolve_token(config: &Config) -> Result<ResolvedToken, ConfigError> {
    if let Ok(value) = std::env::var(TOKEN_ENV) {
        if !value.trim().is_empty() {
            return Ok(ResolvedToken {
                token: SecretString::from(value.trim().to_owned()),
                source: TokenSource::Env,
            });
        }
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
        if let Ok(secret) = entry.get_password() {
            return Ok(ResolvedToken {
                token: SecretString::from(secret),
                source: TokenSource::Keyring,
            });
        }
    }

    resolve_token_from_files(&token_candidates(config))
}

/// First readable, non-empty file wins. Unreadable files are skipped.
pub fn resolve_token_from_files(paths: &[PathBuf]) -> Result<ResolvedToken, ConfigError> {
    for path in paths {
        match read_token_file(path) {
            Ok(Some(token)) => {
                debug!(path = %path.display(), "auth token read from file");
                return Ok(ResolvedToken {
                    token,
                    source: TokenSource::File(path.clone()),
                });
            }
            Ok(None) => {}
            Err(e) => debug!(path = %path.display(), error = %e, "token file not readable"),
        }
    }

    let mut searched = vec![format!("${TOKEN_ENV}"), "keyring".to_owned()];
    searched.extend(paths.iter().map(|p| p.display().to_string()));
    Err(ConfigError::NoToken {
        searched: searched.join(", "),
    })
}

/// `Ok(None)` when the file is absent or blank.
pub fn read_token_file(path: &Path) -> Result<Option<SecretString>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(SecretString::from(trimmed.to_owned())))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Save a token to the keyring so later runs need no file access.
pub fn store_token_in_keyring(token: &SecretString) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).map_err(keyring_error)?;
    entry
        .set_password(token.expose_secret())
        .map_err(keyring_error)
}

fn keyring_error(err: keyring::Error) -> ConfigError {
    ConfigError::Validation {
        field: "keyring".into(),
        reason: err.to_string(),
    }
}

// ── Translation to core config ──────────────────────────────────────

/// Build a `DaemonConfig` from the file config and a resolved token.
pub fn to_daemon_config(config: &Config, token: SecretString) -> Result<DaemonConfig, ConfigError> {
    let daemon = &config.daemon;
    let url: url::Url = daemon.url.parse().map_err(|_| ConfigError::Validation {
        field: "daemon.url".into(),
        reason: format!("invalid URL: {}", daemon.url),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "daemon.url".into(),
            reason: format!("expected http or https, got '{}'", url.scheme()),
        });
    }

    positive("daemon.timeout_secs", daemon.timeout_secs)?;
    positive("daemon.host_timeout_secs", daemon.host_timeout_secs)?;
    positive("sync.poll_interval_ms", config.sync.poll_interval_ms)?;
    positive("sync.backoff_base_ms", config.sync.backoff_base_ms)?;
    if config.commands.max_concurrent == 0 {
        return Err(ConfigError::Validation {
            field: "commands.max_concurrent".into(),
            reason: "must be at least 1".into(),
        });
    }

    let backoff_base = Duration::from_millis(config.sync.backoff_base_ms);
    let backoff_max = Duration::from_secs(config.sync.backoff_max_secs);
    if backoff_max < backoff_base {
        return Err(ConfigError::Validation {
            field: "sync.backoff_max_secs".into(),
            reason: "must not be shorter than sync.backoff_base_ms".into(),
        });
    }

    let elevate = daemon.elevate.trim();
    Ok(DaemonConfig {
        url: url.to_string(),
        token,
        timeout: Duration::from_secs(daemon.timeout_secs),
        host_timeout: Duration::from_secs(daemon.host_timeout_secs),
        service_unit: daemon.service_unit.clone(),
        elevate: (!elevate.is_empty()).then(|| elevate.to_owned()),
        sync: SyncConfig {
            poll_interval: Duration::from_millis(config.sync.poll_interval_ms),
            backoff_base,
            backoff_max,
            follow_up_refresh: config
                .sync
                .follow_up_refresh_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        },
        max_concurrent_commands: config.commands.max_concurrent,
        background_sync: true,
    })
}

fn positive(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(())
}
