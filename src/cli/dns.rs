// SPDX-License-Identifier: Apache-2.0

use ncm::{DnsScope, IpAddress};
use serde::Serialize;

use crate::context::{device, device_arg, parse_many};
use crate::{CliContext, CliError};

const CMD_ADD_DNS: &str = "add-dns";
const CMD_ADD_DOMAIN: &str = "add-domain";
const CMD_REVERT_DNS: &str = "revert-dns";
const CMD_SHOW_DOMAINS: &str = "show-domains";
const CMD_ADD_NTP: &str = "add-ntp";
const CMD_SET_NTP: &str = "set-ntp";
const CMD_REMOVE_NTP: &str = "remove-ntp";
const CMD_ADD_SYSTEM_NTP: &str = "add-system-ntp";
const CMD_REMOVE_SYSTEM_NTP: &str = "remove-system-ntp";

const ARG_VALUES: &str = "VALUES";

#[derive(Serialize)]
struct DomainsReport {
    domains: Vec<String>,
}

pub(crate) struct CommandDns;

impl CommandDns {
    pub(crate) const VERBS: &'static [&'static str] = &[
        CMD_ADD_DNS,
        CMD_ADD_DOMAIN,
        CMD_REVERT_DNS,
        CMD_SHOW_DOMAINS,
        CMD_ADD_NTP,
        CMD_SET_NTP,
        CMD_REMOVE_NTP,
        CMD_ADD_SYSTEM_NTP,
        CMD_REMOVE_SYSTEM_NTP,
    ];

    pub(crate) fn new_cmds() -> Vec<clap::Command> {
        vec![
            clap::Command::new(CMD_ADD_DNS)
                .alias("dns")
                .about("Add DNS servers")
                .arg(device_arg())
                .arg(values_arg("DNS server addresses"))
                .arg(global_arg()),
            clap::Command::new(CMD_ADD_DOMAIN)
                .alias("domain")
                .about("Add DNS search domains")
                .arg(device_arg())
                .arg(values_arg("Search domains"))
                .arg(global_arg()),
            clap::Command::new(CMD_REVERT_DNS)
                .about("Remove DNS servers and search domains of interface")
                .arg(device_arg()),
            clap::Command::new(CMD_SHOW_DOMAINS)
                .about("Show system wide DNS search domains"),
            clap::Command::new(CMD_ADD_NTP)
                .alias("ntp")
                .about("Append NTP servers")
                .arg(device_arg())
                .arg(values_arg("NTP servers")),
            clap::Command::new(CMD_SET_NTP)
                .about("Replace NTP servers")
                .arg(device_arg())
                .arg(values_arg("NTP servers")),
            clap::Command::new(CMD_REMOVE_NTP)
                .alias("del-ntp")
                .about("Remove NTP servers of interface")
                .arg(device_arg()),
            clap::Command::new(CMD_ADD_SYSTEM_NTP)
                .about("Add NTP servers to the time synchronization daemon")
                .arg(values_arg("NTP servers")),
            clap::Command::new(CMD_REMOVE_SYSTEM_NTP)
                .about("Remove NTP servers of the time synchronization daemon")
                .arg(values_arg("NTP servers")),
        ]
    }

    pub(crate) async fn handle(
        ctx: &CliContext,
        verb: &str,
        matches: &clap::ArgMatches,
    ) -> Result<(), CliError> {
        let persister = ctx.persister();
        match verb {
            CMD_ADD_DNS => {
                let servers: Vec<IpAddress> = parse_many(matches, ARG_VALUES)?;
                persister.add_dns_servers(
                    &device(matches)?,
                    &servers,
                    dns_scope(matches),
                )?;
            }
            CMD_ADD_DOMAIN => {
                persister.add_dns_domains(
                    &device(matches)?,
                    &parse_many::<String>(matches, ARG_VALUES)?,
                    dns_scope(matches),
                )?;
            }
            CMD_REVERT_DNS => {
                persister.revert_dns_and_domains(&device(matches)?)?;
            }
            CMD_SHOW_DOMAINS => {
                ctx.print(&DomainsReport {
                    domains: persister.read_system_domains()?,
                })?;
            }
            CMD_ADD_NTP | CMD_SET_NTP => {
                persister.add_ntp(
                    &device(matches)?,
                    &parse_many::<String>(matches, ARG_VALUES)?,
                    verb == CMD_ADD_NTP,
                )?;
            }
            CMD_REMOVE_NTP => {
                persister.remove_ntp(&device(matches)?)?;
            }
            CMD_ADD_SYSTEM_NTP => {
                let servers: Vec<String> = parse_many(matches, ARG_VALUES)?;
                persister.add_system_ntp(&servers)?;
            }
            CMD_REMOVE_SYSTEM_NTP => {
                let servers: Vec<String> = parse_many(matches, ARG_VALUES)?;
                persister.remove_system_ntp(&servers)?;
            }
            _ => {
                return Err(CliError::from(format!("Unknown command {verb}")));
            }
        }
        Ok(())
    }
}

fn values_arg(help: &'static str) -> clap::Arg {
    clap::Arg::new(ARG_VALUES)
        .required(true)
        .num_args(1..)
        .help(help)
}

fn global_arg() -> clap::Arg {
    clap::Arg::new("global")
        .long("global")
        .action(clap::ArgAction::SetTrue)
        .help("Also write to the system resolver configuration")
}

fn dns_scope(matches: &clap::ArgMatches) -> DnsScope {
    if matches.get_flag("global") {
        DnsScope::global()
    } else {
        DnsScope::system()
    }
}
