//! Shared helpers for command handlers.

use std::io::IsTerminal;

use zerofly_core::{CommandResult, NetworkId};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Parse a network ID argument.
pub fn parse_network_id(raw: &str) -> Result<NetworkId, CliError> {
    NetworkId::parse(raw).map_err(|e| CliError::Validation {
        field: "network id".into(),
        reason: e.to_string(),
    })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(action: &str, message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Status line for a finished mutation, on stderr so stdout stays parseable.
pub fn report(result: &CommandResult, applied: &str, unchanged: &str, global: &GlobalOpts) {
    if global.quiet {
        return;
    }
    match result {
        CommandResult::Unchanged => eprintln!("{unchanged}"),
        CommandResult::Applied | CommandResult::Network(_) => eprintln!("{applied}"),
    }
}

/// `-` for absent values in tables.
pub fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}

pub fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.into()
}
