// SPDX-License-Identifier: Apache-2.0

use crate::context::{list_arg, option_arg, parse_bool_opt, parse_many};
use crate::{CliContext, CliError};

const CMD_SET_PROXY: &str = "set-proxy";
const CMD_REMOVE_PROXY: &str = "remove-proxy";
const CMD_SHOW_PROXY: &str = "show-proxy";

const URL_ARGS: [&str; 6] =
    ["http", "https", "ftp", "gopher", "socks", "socks5"];

pub(crate) struct CommandProxy;

impl CommandProxy {
    pub(crate) const VERBS: &'static [&'static str] =
        &[CMD_SET_PROXY, CMD_REMOVE_PROXY, CMD_SHOW_PROXY];

    pub(crate) fn new_cmds() -> Vec<clap::Command> {
        let mut set_cmd = clap::Command::new(CMD_SET_PROXY)
            .alias("proxy")
            .about("Set system wide proxy, unspecified values are kept")
            .arg(option_arg("enable", "yes or no"))
            .arg(list_arg("no-proxy", "Hosts not going through the proxy"));
        for name in URL_ARGS {
            set_cmd = set_cmd.arg(option_arg(name, "Proxy URL"));
        }
        vec![
            set_cmd,
            clap::Command::new(CMD_REMOVE_PROXY)
                .alias("del-proxy")
                .about("Remove system wide proxy"),
            clap::Command::new(CMD_SHOW_PROXY).about("Show system wide proxy"),
        ]
    }

    pub(crate) async fn handle(
        ctx: &CliContext,
        verb: &str,
        matches: &clap::ArgMatches,
    ) -> Result<(), CliError> {
        let persister = ctx.persister();
        match verb {
            CMD_SET_PROXY => {
                let mut cfg = persister.read_proxy()?;
                if let Some(enabled) = parse_bool_opt(matches, "enable")? {
                    cfg.enabled = enabled;
                }
                for name in URL_ARGS {
                    let Some(url) = matches.get_one::<String>(name) else {
                        continue;
                    };
                    let slot = match name {
                        "http" => &mut cfg.http,
                        "https" => &mut cfg.https,
                        "ftp" => &mut cfg.ftp,
                        "gopher" => &mut cfg.gopher,
                        "socks" => &mut cfg.socks,
                        _ => &mut cfg.socks5,
                    };
                    *slot = Some(url.clone()).filter(|u| !u.is_empty());
                }
                let no_proxy: Vec<String> = parse_many(matches, "no-proxy")?;
                cfg.no_proxy.extend(no_proxy);
                persister.configure_proxy(&cfg)?;
            }
            CMD_REMOVE_PROXY => {
                persister.remove_proxy()?;
            }
            CMD_SHOW_PROXY => {
                ctx.print(&persister.read_proxy()?)?;
            }
            _ => {
                return Err(CliError::from(format!("Unknown command {verb}")));
            }
        }
        Ok(())
    }
}
