//! CLI-side configuration: file config plus flag overrides into a
//! `DaemonConfig`.

use secrecy::SecretString;
use tracing::debug;

use zerofly_config::{Config, ConfigError, TokenSource};
use zerofly_core::DaemonConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Whether a command can run without an auth token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPolicy {
    Required,
    /// Host-only commands (service control) still work when the token is
    /// unreadable, e.g. because the service was never installed.
    Optional,
}

/// Build the runtime daemon config from the config file and global flags.
pub fn build_daemon_config(
    global: &GlobalOpts,
    policy: TokenPolicy,
) -> Result<DaemonConfig, CliError> {
    let mut cfg = zerofly_config::load_config()?;
    apply_overrides(&mut cfg, global);

    let token = match resolve_token(&cfg, global) {
        Ok((token, source)) => {
            debug!(%source, "using auth token");
            token
        }
        Err(ConfigError::NoToken { .. }) if policy == TokenPolicy::Optional => {
            debug!("no auth token found; continuing without one");
            SecretString::from(String::new())
        }
        Err(e) => return Err(e.into()),
    };

    Ok(zerofly_config::to_daemon_config(&cfg, token)?)
}

/// Flag values win over the file.
pub fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref url) = global.url {
        cfg.daemon.url.clone_from(url);
    }
    if let Some(secs) = global.timeout {
        cfg.daemon.timeout_secs = secs;
    }
}

fn resolve_token(
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(SecretString, TokenSource), ConfigError> {
    if let Some(ref token) = global.token {
        return Ok((SecretString::from(token.clone()), TokenSource::Explicit));
    }
    let resolved = zerofly_config::resolve_token(cfg)?;
    Ok((resolved.token, resolved.source))
}
