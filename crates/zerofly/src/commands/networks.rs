//! Network command handlers.

use std::sync::Arc;
use std::time::Duration;

use tabled::Tabled;
use zerofly_core::{
    Command as CoreCommand, CommandResult, Controller, InterfaceState, Network, NetworkFlags,
    NetworkId, NetworkStatus,
};

use crate::cli::{GlobalOpts, NetworkSetArgs, NetworksArgs, NetworksCommand};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util::{self, or_dash, yes_no};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct NetworkRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Type")]
    network_type: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Interface")]
    interface: String,
    #[tabled(rename = "Addresses")]
    addresses: String,
}

impl NetworkRow {
    fn new(n: &Arc<Network>, paint: Painter) -> Self {
        Self {
            id: n.id.to_string(),
            name: n.display_name().to_owned(),
            status: paint_status(&n.status, paint),
            network_type: n.network_type.to_string(),
            device: or_dash(n.port_device_name.as_deref()),
            interface: paint_interface(n.interface, paint),
            addresses: n.assigned_addresses.join(", "),
        }
    }
}

fn paint_status(status: &NetworkStatus, paint: Painter) -> String {
    match status {
        NetworkStatus::Ok => paint.good(status.as_str()),
        NetworkStatus::RequestingConfiguration => paint.warn(status.as_str()),
        _ => paint.bad(status.as_str()),
    }
}

fn paint_interface(state: InterfaceState, paint: Painter) -> String {
    let text = state.to_string();
    match state {
        InterfaceState::Up => paint.good(&text),
        InterfaceState::Down => paint.warn(&text),
        InterfaceState::PortError => paint.bad(&text),
        InterfaceState::Unknown => paint.dim(&text),
    }
}

fn detail(n: &Network, paint: Painter) -> String {
    let routes = if n.routes.is_empty() {
        "-".to_owned()
    } else {
        n.routes
            .iter()
            .map(|r| match r.via {
                Some(ref via) => format!("{} via {via}", r.target),
                None => r.target.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut pairs = vec![
        ("ID", n.id.to_string()),
        ("Name", n.display_name().to_owned()),
        ("Status", paint_status(&n.status, paint)),
        ("Type", n.network_type.to_string()),
        ("MAC", or_dash(n.mac.as_deref())),
        ("Device", or_dash(n.port_device_name.as_deref())),
        ("Interface", paint_interface(n.interface, paint)),
        ("MTU", or_dash(n.mtu)),
        ("Addresses", n.assigned_addresses.join(", ")),
        ("Routes", routes),
        ("DHCP", yes_no(n.dhcp)),
        ("Bridge", yes_no(n.bridge)),
        ("Broadcast", yes_no(n.broadcast_enabled)),
        ("Allow managed", yes_no(n.allow_managed)),
        ("Allow global", yes_no(n.allow_global)),
        ("Allow default", yes_no(n.allow_default)),
        ("Allow DNS", yes_no(n.allow_dns)),
    ];
    if let Some(code) = n.port_error.filter(|c| *c != 0) {
        pairs.push(("Port error", paint.bad(&code.to_string())));
    }
    output::render_detail(&pairs)
}

fn print_network(n: &Network, global: &GlobalOpts) -> Result<(), CliError> {
    let paint = Painter::new(&global.color);
    let out = output::render_single(
        &global.output,
        n,
        |n| detail(n, paint),
        |n| n.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: NetworksArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        NetworksCommand::List => {
            controller.refresh_now().await?;
            let snap = controller.networks_snapshot();
            let paint = Painter::new(&global.color);
            let out = output::render_list(
                &global.output,
                &snap,
                |n| NetworkRow::new(n, paint),
                |n| n.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NetworksCommand::Get { id } => {
            let id = util::parse_network_id(&id)?;
            controller.refresh_now().await?;
            let network = controller.network(&id).ok_or_else(|| CliError::NotFound {
                resource_type: "network".into(),
                identifier: id.to_string(),
                list_command: "networks list".into(),
            })?;
            print_network(&network, global)
        }

        NetworksCommand::Join { id, wait } => {
            let id = util::parse_network_id(&id)?;
            // The join check and the route both read the model.
            controller.refresh_now().await?;
            let result = controller
                .execute(CoreCommand::JoinNetwork(id.clone()))
                .await?;
            util::report(
                &result,
                &format!("Joined network {id}"),
                &format!("Already a member of network {id}"),
                global,
            );
            match (wait, result) {
                (Some(seconds), _) => {
                    let network = wait_for_config(controller, &id, seconds).await?;
                    print_network(&network, global)
                }
                (None, CommandResult::Network(network)) => print_network(&network, global),
                (None, _) => Ok(()),
            }
        }

        NetworksCommand::Leave { id } => {
            let id = util::parse_network_id(&id)?;
            if !util::confirm("networks leave", &format!("Leave network {id}?"), global.yes)? {
                return Ok(());
            }
            let result = controller.execute(CoreCommand::LeaveNetwork(id.clone())).await?;
            util::report(
                &result,
                &format!("Left network {id}"),
                &format!("Not a member of network {id}"),
                global,
            );
            Ok(())
        }

        NetworksCommand::Up { id } => set_interface(controller, &id, true, global).await,
        NetworksCommand::Down { id } => set_interface(controller, &id, false, global).await,

        NetworksCommand::Set(set) => set_flags(controller, set, global).await,
    }
}

/// Block until a poll shows the network past REQUESTING_CONFIGURATION.
async fn wait_for_config(
    controller: &Controller,
    id: &NetworkId,
    seconds: u64,
) -> Result<Arc<Network>, CliError> {
    let mut networks = controller.networks();
    let settled = networks.wait_for(id.as_str(), |n| {
        n.status != NetworkStatus::RequestingConfiguration
    });
    match tokio::time::timeout(Duration::from_secs(seconds), settled).await {
        Ok(Some(network)) => Ok(network),
        Ok(None) => Err(CliError::Internal(format!("stopped watching network {id}"))),
        Err(_) => Err(CliError::Timeout {
            operation: format!("waiting for network {id} configuration"),
            seconds,
        }),
    }
}

async fn set_interface(
    controller: &Controller,
    id: &str,
    up: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let id = util::parse_network_id(id)?;
    let direction = if up { "up" } else { "down" };
    let result = controller
        .execute(CoreCommand::SetNetworkInterfaceUp {
            network: id.clone(),
            up,
        })
        .await?;
    util::report(
        &result,
        &format!("Interface for network {id} is now {direction}"),
        &format!("Interface for network {id} is already {direction}"),
        global,
    );
    Ok(())
}

async fn set_flags(
    controller: &Controller,
    args: NetworkSetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let id = util::parse_network_id(&args.id)?;
    let flags = NetworkFlags {
        allow_default: args.allow_default,
        allow_global: args.allow_global,
        allow_managed: args.allow_managed,
        allow_dns: args.allow_dns,
    };
    if flags.is_empty() {
        return Err(CliError::Validation {
            field: "flags".into(),
            reason: "pass at least one of --allow-default, --allow-global, \
                     --allow-managed, --allow-dns"
                .into(),
        });
    }

    let result = controller
        .execute(CoreCommand::SetNetworkFlags {
            network: id.clone(),
            flags,
        })
        .await?;
    util::report(
        &result,
        &format!("Updated network {id}: {flags}"),
        &format!("Network {id} already has {flags}"),
        global,
    );
    if let CommandResult::Network(ref network) = result {
        print_network(network, global)?;
    }
    Ok(())
}
