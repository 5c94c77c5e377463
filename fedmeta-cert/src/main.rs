// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::Result;
use env_logger::Builder;
use log::{debug, LevelFilter};
use std::{env, io, process};

use fedmeta_cert::Invocation;

fn main() -> Result<()> {
    // console output is the interface, logs stay quiet unless RUST_LOG
    // asks for more
    Builder::new()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .try_init()?;

    let code = match dispatch() {
        Ok(()) => 0,
        Err(e) => {
            fedmeta_cert::report(&e, &mut io::stdout().lock())?;
            1
        }
    };

    process::exit(code)
}

fn dispatch() -> fedmeta_cert::Result<()> {
    let config = match fedmeta_cert::parse_args(env::args_os())? {
        Invocation::Help => {
            fedmeta_cert::print_usage();
            return Ok(());
        }
        Invocation::Run(config) => config,
    };

    let written = fedmeta_cert::run(&config)?;
    debug!("{written} certificate(s) processed");

    Ok(())
}
