// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use ncm::{
    ConfigPersister, InterfaceHandle, NcmConfig, NetworkManager,
    NetworkdDbus, RtnlChannel,
};
use serde::Serialize;

use crate::CliError;

pub(crate) const ARG_DEVICE: &str = "DEVICE";

pub(crate) type Manager = NetworkManager<RtnlChannel, NetworkdDbus<'static>>;

/// State shared by every verb: the loaded configuration and output format.
pub(crate) struct CliContext {
    pub(crate) config: NcmConfig,
    pub(crate) json: bool,
}

impl CliContext {
    pub(crate) fn persister(&self) -> ConfigPersister {
        ConfigPersister::new(self.config.clone())
    }

    /// Manager able to change the running system, needs the netlink socket
    /// and the system bus.
    pub(crate) async fn manager(&self) -> Result<Manager, CliError> {
        let channel = RtnlChannel::new()?;
        let daemon = NetworkdDbus::new().await?;
        Ok(NetworkManager::new(self.config.clone(), channel, daemon))
    }

    pub(crate) fn print<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<(), CliError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            print!("{}", serde_yaml::to_string(value)?);
        }
        Ok(())
    }
}

pub(crate) fn device_arg() -> clap::Arg {
    clap::Arg::new(ARG_DEVICE)
        .required(true)
        .help("Interface name")
}

pub(crate) fn value_arg(id: &'static str, help: &'static str) -> clap::Arg {
    clap::Arg::new(id).required(true).help(help)
}

/// Optional `--<name> <VALUE>`, looked up by `name`.
pub(crate) fn option_arg(
    name: &'static str,
    help: &'static str,
) -> clap::Arg {
    clap::Arg::new(name).long(name).value_name("VALUE").help(help)
}

/// Like [option_arg] but repeatable and accepting several values.
pub(crate) fn list_arg(name: &'static str, help: &'static str) -> clap::Arg {
    option_arg(name, help)
        .num_args(1..)
        .action(clap::ArgAction::Append)
}

pub(crate) fn device(
    matches: &clap::ArgMatches,
) -> Result<InterfaceHandle, CliError> {
    Ok(InterfaceHandle::new(required(matches, ARG_DEVICE)?)?)
}

pub(crate) fn required<'a>(
    matches: &'a clap::ArgMatches,
    id: &str,
) -> Result<&'a str, CliError> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| CliError::from(format!("{id} not defined")))
}

pub(crate) fn parse<T>(
    matches: &clap::ArgMatches,
    id: &str,
) -> Result<T, CliError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_str(required(matches, id)?, id)
}

pub(crate) fn parse_opt<T>(
    matches: &clap::ArgMatches,
    id: &str,
) -> Result<Option<T>, CliError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    matches
        .get_one::<String>(id)
        .map(|v| parse_str(v, id))
        .transpose()
}

pub(crate) fn parse_many<T>(
    matches: &clap::ArgMatches,
    id: &str,
) -> Result<Vec<T>, CliError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    matches
        .get_many::<String>(id)
        .into_iter()
        .flatten()
        .map(|v| parse_str(v, id))
        .collect()
}

pub(crate) fn parse_bool_opt(
    matches: &clap::ArgMatches,
    id: &str,
) -> Result<Option<bool>, CliError> {
    matches
        .get_one::<String>(id)
        .map(|v| parse_bool(v, id))
        .transpose()
}

pub(crate) fn parse_bool(value: &str, id: &str) -> Result<bool, CliError> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Ok(true),
        "no" | "false" | "off" | "0" => Ok(false),
        _ => Err(CliError::from(format!(
            "Invalid {id} '{value}', should be yes or no"
        ))),
    }
}

fn parse_str<T>(value: &str, id: &str) -> Result<T, CliError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| CliError::from(format!("Invalid {id} '{value}': {e}")))
}
