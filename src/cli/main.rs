// SPDX-License-Identifier: Apache-2.0

mod address;
mod context;
mod dhcp;
mod dns;
mod error;
mod generate;
mod link;
mod netdev;
mod proxy;
mod route;
mod service;

use std::path::Path;

use ncm::NcmConfig;

pub(crate) use self::context::CliContext;
pub(crate) use self::error::CliError;
use self::{
    address::CommandAddress, dhcp::CommandDhcp, dns::CommandDns,
    generate::CommandGenerate, link::CommandLink, netdev::CommandNetdev,
    proxy::CommandProxy, route::CommandRoute, service::CommandService,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut cli_cmd = clap::Command::new("ncmctl")
        .about("Network configuration manager CLI")
        .version(clap::crate_version!())
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            clap::Arg::new("quiet")
                .short('q')
                .action(clap::ArgAction::SetTrue)
                .help("Disable logging")
                .global(true),
        )
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .action(clap::ArgAction::Count)
                .help("Increase verbose level")
                .global(true),
        )
        .arg(
            clap::Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Configuration file of the manager itself")
                .global(true),
        )
        .arg(
            clap::Arg::new("json")
                .long("json")
                .action(clap::ArgAction::SetTrue)
                .help("Show output in JSON instead of YAML")
                .global(true),
        )
        .subcommands(CommandLink::new_cmds())
        .subcommands(CommandDhcp::new_cmds())
        .subcommands(CommandAddress::new_cmds())
        .subcommands(CommandRoute::new_cmds())
        .subcommands(CommandDns::new_cmds())
        .subcommands(CommandService::new_cmds())
        .subcommands(CommandNetdev::new_cmds())
        .subcommands(CommandProxy::new_cmds())
        .subcommands(CommandGenerate::new_cmds());

    let matches = cli_cmd.get_matches_mut();

    let (log_groups, log_level) = match matches.get_count("verbose") {
        0 => (vec!["ncm", "ncmctl"], log::LevelFilter::Warn),
        1 => (vec!["ncm", "ncmctl"], log::LevelFilter::Info),
        2 => (vec!["ncm", "ncmctl"], log::LevelFilter::Debug),
        3 => (vec!["ncm", "ncmctl"], log::LevelFilter::Trace),
        _ => (vec![""], log::LevelFilter::Trace),
    };

    if !matches.get_flag("quiet") {
        let mut log_builder = env_logger::Builder::new();
        if log_groups.is_empty() {
            log_builder.filter(None, log_level);
        } else {
            for log_group in log_groups {
                log_builder.filter(Some(log_group), log_level);
            }
        }
        log_builder.init();
    }

    log::debug!("ncmctl version: {}", clap::crate_version!());

    if let Err(e) = call_subcommand(&matches).await {
        eprintln!("{e}");
        std::process::exit(e.exit_code());
    }
}

async fn call_subcommand(matches: &clap::ArgMatches) -> Result<(), CliError> {
    let config = NcmConfig::load(
        matches.get_one::<String>("config").map(Path::new),
    )?;
    let ctx = CliContext {
        config,
        json: matches.get_flag("json"),
    };
    let Some((verb, sub_matches)) = matches.subcommand() else {
        return Err(CliError::from("No command specified"));
    };
    if CommandLink::VERBS.contains(&verb) {
        CommandLink::handle(&ctx, verb, sub_matches).await
    } else if CommandDhcp::VERBS.contains(&verb) {
        CommandDhcp::handle(&ctx, verb, sub_matches).await
    } else if CommandAddress::VERBS.contains(&verb) {
        CommandAddress::handle(&ctx, verb, sub_matches).await
    } else if CommandRoute::VERBS.contains(&verb) {
        CommandRoute::handle(&ctx, verb, sub_matches).await
    } else if CommandDns::VERBS.contains(&verb) {
        CommandDns::handle(&ctx, verb, sub_matches).await
    } else if CommandService::VERBS.contains(&verb) {
        CommandService::handle(&ctx, verb, sub_matches).await
    } else if CommandNetdev::VERBS.contains(&verb) {
        CommandNetdev::handle(&ctx, verb, sub_matches).await
    } else if CommandProxy::VERBS.contains(&verb) {
        CommandProxy::handle(&ctx, verb, sub_matches).await
    } else if CommandGenerate::VERBS.contains(&verb) {
        CommandGenerate::handle(&ctx, verb, sub_matches).await
    } else {
        Err(CliError::from(format!("Unknown command {verb}")))
    }
}
