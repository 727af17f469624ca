//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod networks;
pub mod peers;
pub mod service;
pub mod status;
pub mod util;
pub mod watch;

use zerofly_core::Controller;

use crate::cli::{Command, GlobalOpts, NetworksArgs, NetworksCommand};
use crate::config::{self, TokenPolicy};
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
///
/// Everything but `watch` and `networks join --wait` runs against a
/// controller without the background poll loop and refreshes explicitly
/// when it needs the model.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let policy = match cmd {
        Command::Service(_) => TokenPolicy::Optional,
        _ => TokenPolicy::Required,
    };
    let mut daemon = config::build_daemon_config(global, policy)?;

    if let Command::Watch(args) = cmd {
        return watch::handle(daemon, args, global).await;
    }

    daemon.background_sync = matches!(
        cmd,
        Command::Networks(NetworksArgs {
            command: NetworksCommand::Join { wait: Some(_), .. }
        })
    );
    let controller = Controller::new(daemon)?;
    controller.start().await?;

    let result = match cmd {
        Command::Status => status::handle(&controller, global).await,
        Command::Networks(args) => networks::handle(&controller, args, global).await,
        Command::Peers(args) => peers::handle(&controller, args, global).await,
        Command::Service(args) => service::handle(&controller, args, global).await,
        // Handled before dispatch or above
        Command::Watch(_) | Command::Config(_) | Command::Completions(_) => Ok(()),
    };

    controller.shutdown().await;
    result
}
