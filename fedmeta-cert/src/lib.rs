// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod config;
pub mod extract;
pub mod fetch;
pub mod write;

pub use crate::config::{parse_args, print_usage, usage, Config, Invocation};
pub use crate::extract::{certificate_nodes, decode_cert, SigningCert};
pub use crate::fetch::{fetch_metadata, fetch_metadata_with, metadata_url};
pub use crate::write::{cert_path, write_cert};

use log::{debug, info, warn};
use std::{
    io::{self, Write},
    path::PathBuf,
    result,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid url \"{url}\": {source}")]
    UrlParse {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Url \"{0}\" has no host component")]
    NoHost(String),
    #[error("GET {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to parse federation metadata: {source}")]
    Xml {
        #[from]
        source: quick_xml::Error,
    },
    #[error("Federation metadata is not well-formed XML: {0}")]
    Malformed(&'static str),
    #[error("X509Certificate is not valid base64: {source}")]
    Base64 {
        #[from]
        source: base64::DecodeError,
    },
    #[error("X509Certificate is not a valid DER certificate: {source}")]
    Certificate {
        #[from]
        source: x509_cert::der::Error,
    },
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Errors caused by bad command line input. These are reported along
    /// with the usage text.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::UrlParse { .. } | Error::NoHost(_)
        )
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Write the console message for `e` to `out`. Usage errors are followed
/// by the usage text, fetch and write failures get their own headline with
/// the underlying error on a `Msg:` line.
pub fn report<W: Write>(e: &Error, out: &mut W) -> io::Result<()> {
    match e {
        e if e.is_usage() => {
            writeln!(out, "Error: {e}")?;
            writeln!(out)?;
            writeln!(out, "{}", usage())
        }
        Error::Fetch { source, .. } => {
            writeln!(out, "ERROR: Unable to reach url, check the url and try again!")?;
            writeln!(out, "Msg: {source}")
        }
        Error::Io { source, .. } => {
            writeln!(out, "ERROR: Writing certificate, check output path!")?;
            writeln!(out, "Msg: {source}")
        }
        e => writeln!(out, "ERROR: {e}"),
    }
}

/// Fetch the federation metadata for `config` and write every certificate
/// found in it. Returns the number of certificate files written.
pub fn run(config: &Config) -> Result<usize> {
    let xml = fetch_metadata(&config.url)?;
    run_with_document(config, &xml)
}

/// Extract certificates from an already fetched metadata document and
/// write them to the output directory in document order. All certificates
/// share one file name so the last one wins.
pub fn run_with_document(config: &Config, xml: &str) -> Result<usize> {
    let nodes = certificate_nodes(xml)?;
    debug!("found {} X509Certificate node(s)", nodes.len());

    if nodes.is_empty() {
        warn!("no X509Certificate found in metadata for {}", config.host);
        return Ok(0);
    }

    // A bad node aborts the run: anything after it is left unprocessed.
    for text in &nodes {
        let cert = decode_cert(text)?;
        debug!("certificate subject: {}", cert.subject());

        let path = write_cert(config, &cert)?;
        info!("wrote certificate to {}", path.display());
    }

    Ok(nodes.len())
}
