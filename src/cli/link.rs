// SPDX-License-Identifier: Apache-2.0

use ncm::{
    ActivationPolicy, AddressFamilyOnline, LinkFlag, LinkLocalAddressing,
    LinkState, MacAddress,
};

use crate::context::{
    device, device_arg, parse, parse_bool, required, value_arg,
};
use crate::{CliContext, CliError};

const CMD_SET_MTU: &str = "set-mtu";
const CMD_SET_MAC: &str = "set-mac";
const CMD_SET_LINK_STATE: &str = "set-link-state";
const CMD_SET_GROUP: &str = "set-group";
const CMD_SET_LINK_FLAG: &str = "set-link-flag";
const CMD_SET_ONLINE_FAMILY: &str = "set-link-online-family";
const CMD_SET_ACT_POLICY: &str = "set-link-act-policy";
const CMD_ENABLE_IPV6: &str = "enable-ipv6";
const CMD_SET_IPV6_MTU: &str = "set-ipv6-mtu";
const CMD_SET_LINK_LOCAL: &str = "set-link-local-address";

pub(crate) struct CommandLink;

impl CommandLink {
    pub(crate) const VERBS: &'static [&'static str] = &[
        CMD_SET_MTU,
        CMD_SET_MAC,
        CMD_SET_LINK_STATE,
        CMD_SET_GROUP,
        CMD_SET_LINK_FLAG,
        CMD_SET_ONLINE_FAMILY,
        CMD_SET_ACT_POLICY,
        CMD_ENABLE_IPV6,
        CMD_SET_IPV6_MTU,
        CMD_SET_LINK_LOCAL,
    ];

    pub(crate) fn new_cmds() -> Vec<clap::Command> {
        vec![
            clap::Command::new(CMD_SET_MTU)
                .alias("mtu")
                .about("Set MTU of the link, persisted and applied")
                .arg(device_arg())
                .arg(value_arg("MTU", "MTU in bytes")),
            clap::Command::new(CMD_SET_MAC)
                .alias("mac")
                .about("Set MAC address of the link, persisted and applied")
                .arg(device_arg())
                .arg(value_arg("MAC", "MAC address, e.g. 00:11:22:33:44:55")),
            clap::Command::new(CMD_SET_LINK_STATE)
                .alias("link-state")
                .about("Bring the link up or down, not persisted")
                .arg(device_arg())
                .arg(value_arg("STATE", "up or down")),
            clap::Command::new(CMD_SET_GROUP)
                .alias("group")
                .about("Set link group, persisted and applied")
                .arg(device_arg())
                .arg(value_arg("GROUP", "Link group number")),
            clap::Command::new(CMD_SET_LINK_FLAG)
                .alias("link-flag")
                .about(
                    "Set link flag. ARP and promiscuous are also applied \
                     to the live link",
                )
                .arg(device_arg())
                .arg(value_arg(
                    "FLAG",
                    "arp, multicast, allmulticast, promiscuous, \
                     requiredforonline or unmanaged",
                ))
                .arg(value_arg("VALUE", "yes or no")),
            clap::Command::new(CMD_SET_ONLINE_FAMILY)
                .alias("link-online-family")
                .about("Set address family required for online")
                .arg(device_arg())
                .arg(value_arg("FAMILY", "ipv4, ipv6, both or any")),
            clap::Command::new(CMD_SET_ACT_POLICY)
                .alias("link-act-policy")
                .about("Set link activation policy")
                .arg(device_arg())
                .arg(value_arg(
                    "POLICY",
                    "up, always-up, manual, always-down, down or bound",
                )),
            clap::Command::new(CMD_ENABLE_IPV6)
                .alias("ipv6")
                .about("Enable or disable IPv6 link local and RA")
                .arg(device_arg())
                .arg(value_arg("VALUE", "yes or no")),
            clap::Command::new(CMD_SET_IPV6_MTU)
                .alias("ipv6-mtu")
                .about("Set IPv6 MTU")
                .arg(device_arg())
                .arg(value_arg("MTU", "IPv6 MTU in bytes")),
            clap::Command::new(CMD_SET_LINK_LOCAL)
                .alias("link-local-address")
                .about("Set link local addressing")
                .arg(device_arg())
                .arg(value_arg("MODE", "yes, no, ipv4 or ipv6")),
        ]
    }

    pub(crate) async fn handle(
        ctx: &CliContext,
        verb: &str,
        matches: &clap::ArgMatches,
    ) -> Result<(), CliError> {
        let iface = device(matches)?;
        match verb {
            CMD_SET_MTU => {
                let mtu: u32 = parse(matches, "MTU")?;
                ctx.manager().await?.set_link_mtu(&iface, mtu).await?;
            }
            CMD_SET_MAC => {
                let mac: MacAddress = parse(matches, "MAC")?;
                ctx.manager().await?.set_link_mac(&iface, &mac).await?;
            }
            CMD_SET_LINK_STATE => {
                let state: LinkState = parse(matches, "STATE")?;
                ctx.manager().await?.set_link_state(&iface, state).await?;
            }
            CMD_SET_GROUP => {
                let group: u32 = parse(matches, "GROUP")?;
                ctx.manager().await?.set_link_group(&iface, group).await?;
            }
            CMD_SET_LINK_FLAG => {
                let flag: LinkFlag = parse(matches, "FLAG")?;
                let value = parse_bool(required(matches, "VALUE")?, "VALUE")?;
                if flag.is_live() {
                    ctx.manager()
                        .await?
                        .set_link_flag(&iface, flag, value)
                        .await?;
                } else {
                    ctx.persister().set_link_flag(&iface, flag, value)?;
                }
            }
            CMD_SET_ONLINE_FAMILY => {
                let family: AddressFamilyOnline = parse(matches, "FAMILY")?;
                ctx.persister()
                    .set_link_required_family_for_online(&iface, family)?;
            }
            CMD_SET_ACT_POLICY => {
                let policy: ActivationPolicy = parse(matches, "POLICY")?;
                ctx.persister().set_link_activation_policy(&iface, policy)?;
            }
            CMD_ENABLE_IPV6 => {
                let value = parse_bool(required(matches, "VALUE")?, "VALUE")?;
                ctx.persister().enable_ipv6(&iface, value)?;
            }
            CMD_SET_IPV6_MTU => {
                let mtu: u32 = parse(matches, "MTU")?;
                ctx.persister().set_ipv6_mtu(&iface, mtu)?;
            }
            CMD_SET_LINK_LOCAL => {
                let mode: LinkLocalAddressing = parse(matches, "MODE")?;
                ctx.persister().set_link_local_addressing(&iface, mode)?;
            }
            _ => {
                return Err(CliError::from(format!("Unknown command {verb}")));
            }
        }
        Ok(())
    }
}
