//! Service unit command handlers.

use serde::Serialize;
use zerofly_core::{Command as CoreCommand, Controller, ServiceStatus};

use crate::cli::{GlobalOpts, ServiceArgs, ServiceCommand};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

#[derive(Debug, Serialize)]
struct UnitView {
    unit: String,
    status: ServiceStatus,
    boot_enabled: bool,
}

fn detail(view: &UnitView, paint: Painter) -> String {
    let status = match view.status {
        ServiceStatus::Running => paint.good("running"),
        ServiceStatus::Stopped => paint.bad("stopped"),
        ServiceStatus::Unknown => paint.dim("unknown"),
    };
    output::render_detail(&[
        ("Unit", view.unit.clone()),
        ("Status", status),
        ("At boot", if view.boot_enabled { "enabled" } else { "disabled" }.into()),
    ])
}

pub async fn handle(
    controller: &Controller,
    args: ServiceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let unit = controller.service().unit().to_owned();

    let (command, applied, unchanged) = match args.command {
        ServiceCommand::Status => {
            let state = controller.service().unit_state().await?;
            let view = UnitView {
                unit,
                status: state.status,
                boot_enabled: state.boot_enabled,
            };
            let paint = Painter::new(&global.color);
            let out = output::render_single(
                &global.output,
                &view,
                |v| detail(v, paint),
                |v| v.status.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            return Ok(());
        }
        ServiceCommand::Start => (
            CoreCommand::SetServiceRunning(true),
            format!("Started {unit}"),
            format!("{unit} is already running"),
        ),
        ServiceCommand::Stop => {
            let prompt = format!("Stop {unit}? Every ZeroTier network on this host goes down.");
            if !util::confirm("service stop", &prompt, global.yes)? {
                return Ok(());
            }
            (
                CoreCommand::SetServiceRunning(false),
                format!("Stopped {unit}"),
                format!("{unit} is already stopped"),
            )
        }
        ServiceCommand::Enable => (
            CoreCommand::SetServiceEnabled(true),
            format!("{unit} now starts at boot"),
            format!("{unit} already starts at boot"),
        ),
        ServiceCommand::Disable => (
            CoreCommand::SetServiceEnabled(false),
            format!("{unit} no longer starts at boot"),
            format!("{unit} already does not start at boot"),
        ),
    };

    let result = controller.execute(command).await?;
    util::report(&result, &applied, &unchanged, global);
    Ok(())
}
