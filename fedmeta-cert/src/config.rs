// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use clap::{ArgAction, CommandFactory, Parser};
use log::debug;
use std::{ffi::OsString, path::PathBuf};
use url::Url;

use crate::{Error, Result};

const ATTRIBUTION: &str = "Kristofer Källsbo 2017";

const ABOUT: &str = "Extract the signing cert from an ADFS federation service.";

#[derive(Debug, Parser)]
#[clap(
    name = "fedmeta-cert",
    about = ABOUT,
    disable_help_flag = true,
    help_template = "{about}\n{usage-heading} {usage}\n\n{all-args}\n\n{after-help}",
    after_help = ATTRIBUTION
)]
pub struct Args {
    /// ADFS url (required)
    #[clap(short, long, value_name = "URL")]
    pub url: Option<String>,

    /// Output path for certificate (required)
    #[clap(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// show this message and exit
    #[clap(short, long, action = ArgAction::SetTrue)]
    pub help: bool,
}

/// Validated invocation. Built once and never modified.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// URL as given by the operator.
    pub url: String,
    /// Existing directory that receives the certificate file.
    pub output: PathBuf,
    /// Host component of `url`, used to name the output file.
    pub host: String,
}

#[derive(Debug, PartialEq)]
pub enum Invocation {
    Help,
    Run(Config),
}

impl Args {
    pub fn into_invocation(self) -> Result<Invocation> {
        // help wins over everything else on the command line
        if self.help {
            return Ok(Invocation::Help);
        }

        let url = self
            .url
            .ok_or_else(|| Error::Validation("ADFS url is required!".into()))?;
        let output = self.output.ok_or_else(|| {
            Error::Validation("Output path for certificate is required!".into())
        })?;

        if !output.is_dir() {
            return Err(Error::Validation(
                "Output path doesn't exist or is not accessible!".into(),
            ));
        }

        let host = resolve_host(&url)?;
        debug!("url: {url}, host: {host}, output: {}", output.display());

        Ok(Invocation::Run(Config { url, output, host }))
    }
}

/// Parse the command line. Errors from clap itself (unknown flags, a flag
/// missing its value) are reported the same way as failed validation.
pub fn parse_args<I, T>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = Args::try_parse_from(args).map_err(|e| {
        let msg = e.to_string();
        let msg = msg.lines().next().unwrap_or_default();
        Error::Validation(msg.trim_start_matches("error: ").to_string())
    })?;

    args.into_invocation()
}

fn resolve_host(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|source| Error::UrlParse {
        url: url.to_string(),
        source,
    })?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(host.to_string()),
        _ => Err(Error::NoHost(url.to_string())),
    }
}

/// Usage text: description, usage line, option descriptions and the
/// attribution line.
pub fn usage() -> String {
    Args::command().render_help().to_string()
}

pub fn print_usage() {
    println!("{}", usage());
}
