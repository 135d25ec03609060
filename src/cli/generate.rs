// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use ncm::GenerateReport;

use crate::context::{device, device_arg, option_arg, required, value_arg};
use crate::{CliContext, CliError};

const CMD_SHOW_CONFIG: &str = "show-config";
const CMD_GENERATE_YAML: &str = "generate-from-yaml";
const CMD_GENERATE_CMDLINE: &str = "generate-from-cmdline";
const CMD_REAPPLY: &str = "reapply";
const CMD_RELOAD: &str = "reload";
const CMD_RECONFIGURE: &str = "reconfigure";

pub(crate) struct CommandGenerate;

impl CommandGenerate {
    pub(crate) const VERBS: &'static [&'static str] = &[
        CMD_SHOW_CONFIG,
        CMD_GENERATE_YAML,
        CMD_GENERATE_CMDLINE,
        CMD_REAPPLY,
        CMD_RELOAD,
        CMD_RECONFIGURE,
    ];

    pub(crate) fn new_cmds() -> Vec<clap::Command> {
        vec![
            clap::Command::new(CMD_SHOW_CONFIG)
                .alias("show")
                .about("Show configuration file of interface")
                .arg(device_arg()),
            clap::Command::new(CMD_GENERATE_YAML)
                .alias("yaml")
                .about("Generate configuration files from YAML document")
                .arg(value_arg("FILE", "YAML file")),
            clap::Command::new(CMD_GENERATE_CMDLINE)
                .alias("cmdline")
                .about("Generate configuration files from kernel command line")
                .arg(
                    clap::Arg::new("FILE")
                        .help("File holding the command line, default is \
                               /proc/cmdline"),
                )
                .arg(
                    option_arg("line", "Command line to parse instead of FILE")
                        .conflicts_with("FILE"),
                ),
            clap::Command::new(CMD_REAPPLY)
                .about(
                    "Replace configuration of interfaces of YAML document \
                     and apply them",
                )
                .arg(value_arg("FILE", "YAML file")),
            clap::Command::new(CMD_RELOAD)
                .about("Ask the network daemon to reload all files"),
            clap::Command::new(CMD_RECONFIGURE)
                .about("Ask the network daemon to re-apply interface file")
                .arg(device_arg()),
        ]
    }

    pub(crate) async fn handle(
        ctx: &CliContext,
        verb: &str,
        matches: &clap::ArgMatches,
    ) -> Result<(), CliError> {
        match verb {
            CMD_SHOW_CONFIG => {
                print!(
                    "{}",
                    ctx.persister().show_network_config(&device(matches)?)?
                );
            }
            CMD_GENERATE_YAML => {
                let path = Path::new(required(matches, "FILE")?);
                report(ctx, ctx.persister().generate_from_yaml(path)?)?;
            }
            CMD_GENERATE_CMDLINE => {
                let file = matches.get_one::<String>("FILE").map(Path::new);
                let line =
                    matches.get_one::<String>("line").map(String::as_str);
                report(
                    ctx,
                    ctx.persister().generate_from_command_line(file, line)?,
                )?;
            }
            CMD_REAPPLY => {
                let path = required(matches, "FILE")?;
                let content = std::fs::read_to_string(path).map_err(|e| {
                    CliError::from(format!("Failed to read {path}: {e}"))
                })?;
                let networks = ncm::parse_yaml(&content)?;
                let mut manager = ctx.manager().await?;
                for network in &networks {
                    let path = manager.reapply_network(network).await?;
                    log::info!("Reapplied {}", path.display());
                }
            }
            CMD_RELOAD => {
                ctx.manager().await?.reload_network().await?;
            }
            CMD_RECONFIGURE => {
                ctx.manager()
                    .await?
                    .reconfigure_link(&device(matches)?)
                    .await?;
            }
            _ => {
                return Err(CliError::from(format!("Unknown command {verb}")));
            }
        }
        Ok(())
    }
}

// The report is printed even when some interface failed, the exit code
// follows the first failure.
fn report(ctx: &CliContext, report: GenerateReport) -> Result<(), CliError> {
    ctx.print(&report)?;
    match report.first_error() {
        Some(e) => Err(e.clone().into()),
        None => Ok(()),
    }
}
