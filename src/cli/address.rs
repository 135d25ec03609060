// SPDX-License-Identifier: Apache-2.0

use ncm::{AddressConfig, AddressScope, DuplicateAddressDetection, IpAddress};

use crate::context::{
    device, device_arg, option_arg, parse, parse_bool_opt, parse_opt,
    value_arg,
};
use crate::{CliContext, CliError};

const CMD_ADD: &str = "add-address";
const CMD_DELETE: &str = "delete-address";

pub(crate) struct CommandAddress;

impl CommandAddress {
    pub(crate) const VERBS: &'static [&'static str] = &[CMD_ADD, CMD_DELETE];

    pub(crate) fn new_cmds() -> Vec<clap::Command> {
        vec![
            clap::Command::new(CMD_ADD)
                .alias("addr")
                .about("Add IP address, persisted and applied")
                .arg(device_arg())
                .arg(value_arg("ADDRESS", "Address with prefix length"))
                .arg(option_arg("peer", "Peer address"))
                .arg(option_arg("scope", "global, link, host or number"))
                .arg(option_arg("lifetime", "Preferred lifetime: forever or 0"))
                .arg(option_arg("dad", "ipv4, ipv6, both or none"))
                .arg(option_arg("prefix-route", "yes or no"))
                .arg(option_arg("label", "Address label")),
            clap::Command::new(CMD_DELETE)
                .aliases(["del-address", "del-addr"])
                .about("Remove IP address, persisted and applied")
                .arg(device_arg())
                .arg(value_arg("ADDRESS", "Address with prefix length")),
        ]
    }

    pub(crate) async fn handle(
        ctx: &CliContext,
        verb: &str,
        matches: &clap::ArgMatches,
    ) -> Result<(), CliError> {
        let iface = device(matches)?;
        let address: IpAddress = parse(matches, "ADDRESS")?;
        match verb {
            CMD_ADD => {
                let mut cfg = AddressConfig::new(address);
                cfg.peer = parse_opt(matches, "peer")?;
                cfg.scope = parse_opt::<AddressScope>(matches, "scope")?;
                cfg.preferred_lifetime = parse_opt(matches, "lifetime")?;
                cfg.duplicate_address_detection =
                    parse_opt::<DuplicateAddressDetection>(matches, "dad")?;
                cfg.prefix_route = parse_bool_opt(matches, "prefix-route")?;
                cfg.label = parse_opt(matches, "label")?;
                ctx.manager().await?.configure_address(&iface, &cfg).await?;
            }
            CMD_DELETE => {
                ctx.manager().await?.delete_address(&iface, &address).await?;
            }
            _ => {
                return Err(CliError::from(format!("Unknown command {verb}")));
            }
        }
        Ok(())
    }
}
