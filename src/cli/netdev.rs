// SPDX-License-Identifier: Apache-2.0

use ncm::{InterfaceHandle, VlanDescriptor};

use crate::context::{option_arg, parse, required, value_arg};
use crate::{CliContext, CliError};

const CMD_CREATE_VLAN: &str = "create-vlan";
const CMD_REMOVE_NETDEV: &str = "remove-netdev";

pub(crate) struct CommandNetdev;

impl CommandNetdev {
    pub(crate) const VERBS: &'static [&'static str] =
        &[CMD_CREATE_VLAN, CMD_REMOVE_NETDEV];

    pub(crate) fn new_cmds() -> Vec<clap::Command> {
        vec![
            clap::Command::new(CMD_CREATE_VLAN)
                .alias("vlan")
                .about("Create VLAN on top of a parent interface")
                .arg(value_arg("NAME", "VLAN interface name"))
                .arg(option_arg("dev", "Parent interface").required(true))
                .arg(option_arg("id", "VLAN id, 1 to 4094").required(true)),
            clap::Command::new(CMD_REMOVE_NETDEV)
                .alias("del-netdev")
                .about("Remove virtual interface and its configuration")
                .arg(value_arg("NAME", "Interface name"))
                .arg(
                    option_arg("kind", "Virtual interface kind")
                        .default_value("vlan"),
                ),
        ]
    }

    pub(crate) async fn handle(
        ctx: &CliContext,
        verb: &str,
        matches: &clap::ArgMatches,
    ) -> Result<(), CliError> {
        let name = required(matches, "NAME")?;
        match verb {
            CMD_CREATE_VLAN => {
                let parent = InterfaceHandle::new(required(matches, "dev")?)?;
                let vlan =
                    VlanDescriptor::new(name, parse(matches, "id")?, parent)?;
                ctx.manager().await?.create_vlan(&vlan).await?;
            }
            CMD_REMOVE_NETDEV => {
                let kind = required(matches, "kind")?;
                ctx.manager().await?.remove_netdev(name, kind).await?;
            }
            _ => {
                return Err(CliError::from(format!("Unknown command {verb}")));
            }
        }
        Ok(())
    }
}
