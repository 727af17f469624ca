//! Config subcommand handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dialoguer::{Input, Password, Select};
use secrecy::SecretString;
use tracing::debug;

use zerofly_config::{self as config, Config};
use zerofly_core::{ServiceController, SystemExecutor};

use super::util;
use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{TokenPolicy, apply_overrides, build_daemon_config};
use crate::error::CliError;
use crate::output;

const OUTPUT_CHOICES: &[&str] = &["table", "json", "json-compact", "yaml", "plain"];

/// How long to wait for a freshly started service to write its token.
const TOKEN_WAIT: Duration = Duration::from_secs(10);
const TOKEN_POLL: Duration = Duration::from_millis(250);

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
        ConfigCommand::Show => show(global),
        ConfigCommand::Init { force } => init(force, global),
        ConfigCommand::SetToken { from_file } => set_token(from_file, global),
        ConfigCommand::FetchToken { force } => fetch_token(force, global).await,
    }
}

// ── show ────────────────────────────────────────────────────────────

fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load_config()?;
    apply_overrides(&mut cfg, global);

    let token_source = if global.token.is_some() {
        Some(config::TokenSource::Explicit.to_string())
    } else {
        config::resolve_token(&cfg).ok().map(|t| t.source.to_string())
    };

    let out = match global.output {
        OutputFormat::Table | OutputFormat::Plain => {
            let body = toml::to_string_pretty(&cfg)
                .map_err(|e| CliError::ConfigWrite(e.to_string()))?;
            let token = token_source.unwrap_or_else(|| "not found".into());
            format!(
                "# {}\n# auth token: {token}\n\n{}",
                config::config_path().display(),
                body.trim_end()
            )
        }
        OutputFormat::Json => output::render_json_pretty(&cfg)?,
        OutputFormat::JsonCompact => output::render_json_compact(&cfg)?,
        OutputFormat::Yaml => output::render_yaml(&cfg)?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── init ────────────────────────────────────────────────────────────

fn init(force: bool, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_path();
    if path.exists() && !force {
        return Err(CliError::Conflict {
            resource_type: "config file".into(),
            identifier: path.display().to_string(),
        });
    }

    let mut cfg = Config::default();
    apply_overrides(&mut cfg, global);
    if !global.yes {
        prompt_config(&mut cfg)?;
    }

    // Fail here rather than on the next command.
    config::to_daemon_config(&cfg, SecretString::from(String::new()))?;

    let written = config::save_config(&cfg)?;
    if !global.quiet {
        eprintln!("Wrote {}", written.display());
    }
    Ok(())
}

fn prompt_config(cfg: &mut Config) -> Result<(), CliError> {
    cfg.daemon.url = Input::new()
        .with_prompt("ZeroTier service URL")
        .default(cfg.daemon.url.clone())
        .interact_text()
        .map_err(prompt_err)?;

    let token_file: String = Input::new()
        .with_prompt("Auth token file (empty for the standard locations)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    cfg.daemon.token_file = Some(token_file.trim())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    let current = OUTPUT_CHOICES
        .iter()
        .position(|c| *c == cfg.defaults.output)
        .unwrap_or(0);
    let selection = Select::new()
        .with_prompt("Default output format")
        .items(OUTPUT_CHOICES)
        .default(current)
        .interact()
        .map_err(prompt_err)?;
    if let Some(choice) = OUTPUT_CHOICES.get(selection) {
        cfg.defaults.output = (*choice).to_owned();
    }
    Ok(())
}

// ── set-token ───────────────────────────────────────────────────────

fn set_token(from_file: Option<PathBuf>, global: &GlobalOpts) -> Result<(), CliError> {
    let token = if let Some(ref path) = from_file {
        config::read_token_file(path)?.ok_or_else(|| CliError::Validation {
            field: "from-file".into(),
            reason: format!("{} is missing or empty", path.display()),
        })?
    } else if let Some(ref token) = global.token {
        SecretString::from(token.clone())
    } else {
        let raw = Password::new()
            .with_prompt("Auth token")
            .interact()
            .map_err(prompt_err)?;
        SecretString::from(raw.trim().to_owned())
    };

    config::store_token_in_keyring(&token)?;
    if !global.quiet {
        eprintln!(
            "Stored token in the keyring ({}/{})",
            config::KEYRING_SERVICE,
            config::KEYRING_USER
        );
    }
    Ok(())
}

// ── fetch-token ─────────────────────────────────────────────────────

async fn fetch_token(force: bool, global: &GlobalOpts) -> Result<(), CliError> {
    let dest = config::user_token_path();
    if !force && config::read_token_file(&dest)?.is_some() {
        return Err(CliError::Conflict {
            resource_type: "token file".into(),
            identifier: dest.display().to_string(),
        });
    }

    let daemon = build_daemon_config(global, TokenPolicy::Optional)?;
    let service = ServiceController::from_config(&daemon, Arc::new(SystemExecutor));

    if config::system_token_missing() {
        let prompt = format!(
            "{} does not exist, so {} has never run. Start it now?",
            config::SYSTEM_TOKEN_FILE,
            service.unit()
        );
        if !util::confirm("start the service", &prompt, global.yes)? {
            return Ok(());
        }
        service.start().await?;
        wait_for_system_token().await;
    }

    let prompt = format!(
        "Copy {} to {}? You may be asked for your password.",
        config::SYSTEM_TOKEN_FILE,
        dest.display()
    );
    if !util::confirm("copy the auth token", &prompt, global.yes)? {
        return Ok(());
    }

    let owner = config::prepare_token_dir(&dest)?;
    service
        .copy_auth_token(Path::new(config::SYSTEM_TOKEN_FILE), &dest, owner)
        .await?;

    if config::read_token_file(&dest)?.is_none() {
        return Err(CliError::ConfigWrite(format!(
            "{} is empty after copying",
            dest.display()
        )));
    }
    if !global.quiet {
        eprintln!("Copied auth token to {}", dest.display());
    }
    Ok(())
}

async fn wait_for_system_token() {
    let deadline = tokio::time::Instant::now() + TOKEN_WAIT;
    while config::system_token_missing() {
        if tokio::time::Instant::now() >= deadline {
            debug!("service started but its token has not appeared yet");
            return;
        }
        tokio::time::sleep(TOKEN_POLL).await;
    }
}
