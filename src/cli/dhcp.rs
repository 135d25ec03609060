// SPDX-License-Identifier: Apache-2.0

use ncm::{
    DhcpClientDuid, DhcpClientIdentifier, DhcpClientMode, DhcpFamily, DuidType,
};
use serde::Serialize;

use crate::context::{
    device, device_arg, option_arg, parse, parse_opt, value_arg,
};
use crate::{CliContext, CliError};

const CMD_SET_MODE: &str = "set-dhcp-mode";
const CMD_SHOW_MODE: &str = "show-dhcp-mode";
const CMD_SET_CLIENT_ID: &str = "set-dhcp4-client-identifier";
const CMD_SET_IAID: &str = "set-dhcp-iaid";
const CMD_SET_DUID: &str = "set-dhcp-duid";

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct DhcpModeReport {
    iface: String,
    dhcp: DhcpClientMode,
}

pub(crate) struct CommandDhcp;

impl CommandDhcp {
    pub(crate) const VERBS: &'static [&'static str] = &[
        CMD_SET_MODE,
        CMD_SHOW_MODE,
        CMD_SET_CLIENT_ID,
        CMD_SET_IAID,
        CMD_SET_DUID,
    ];

    pub(crate) fn new_cmds() -> Vec<clap::Command> {
        vec![
            clap::Command::new(CMD_SET_MODE)
                .alias("dhcp")
                .about("Set DHCP client mode")
                .arg(device_arg())
                .arg(value_arg("MODE", "yes, no, ipv4 or ipv6")),
            clap::Command::new(CMD_SHOW_MODE)
                .alias("show-dhcp")
                .about("Show DHCP client mode")
                .arg(device_arg()),
            clap::Command::new(CMD_SET_CLIENT_ID)
                .alias("dhcp4-client-id")
                .about("Set DHCPv4 client identifier")
                .arg(device_arg())
                .arg(value_arg("IDENTIFIER", "mac, duid or duid-only")),
            clap::Command::new(CMD_SET_IAID)
                .alias("dhcp-iaid")
                .about("Set DHCP IAID")
                .arg(device_arg())
                .arg(value_arg("FAMILY", "4 or 6"))
                .arg(value_arg("IAID", "Identity association identifier")),
            clap::Command::new(CMD_SET_DUID)
                .alias("dhcp-duid")
                .about("Set DHCP DUID")
                .arg(device_arg())
                .arg(value_arg("FAMILY", "4 or 6"))
                .arg(value_arg(
                    "TYPE",
                    "link-layer-time, vendor, link-layer or uuid",
                ))
                .arg(option_arg(
                    "raw-data",
                    "Colon separated hex bytes, e.g. 00:00:ab:11",
                ))
                .arg(
                    clap::Arg::new("system")
                        .long("system")
                        .action(clap::ArgAction::SetTrue)
                        .help("Store as the system wide DUID"),
                ),
        ]
    }

    pub(crate) async fn handle(
        ctx: &CliContext,
        verb: &str,
        matches: &clap::ArgMatches,
    ) -> Result<(), CliError> {
        let iface = device(matches)?;
        let persister = ctx.persister();
        match verb {
            CMD_SET_MODE => {
                let mode: DhcpClientMode = parse(matches, "MODE")?;
                persister.set_dhcp_client(&iface, mode)?;
            }
            CMD_SHOW_MODE => {
                let dhcp = persister.get_dhcp_client(&iface)?;
                ctx.print(&DhcpModeReport {
                    iface: iface.name().to_string(),
                    dhcp,
                })?;
            }
            CMD_SET_CLIENT_ID => {
                let id: DhcpClientIdentifier = parse(matches, "IDENTIFIER")?;
                persister.set_dhcp4_client_identifier(&iface, id)?;
            }
            CMD_SET_IAID => {
                let family: DhcpFamily = parse(matches, "FAMILY")?;
                let iaid: u32 = parse(matches, "IAID")?;
                persister.set_dhcp_client_iaid(&iface, family, iaid)?;
            }
            CMD_SET_DUID => {
                let family: DhcpFamily = parse(matches, "FAMILY")?;
                let mut duid = DhcpClientDuid::new(parse::<DuidType>(
                    matches, "TYPE",
                )?);
                duid.raw_data = parse_opt(matches, "raw-data")?;
                duid.persist_across_systems = matches.get_flag("system");
                persister.set_dhcp_client_duid(&iface, family, &duid)?;
            }
            _ => {
                return Err(CliError::from(format!("Unknown command {verb}")));
            }
        }
        Ok(())
    }
}
