// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::debug;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{Config, Error, Result, SigningCert};

/// `{output}/{host}-signing.cer`
pub fn cert_path(output: &Path, host: &str) -> PathBuf {
    output.join(format!("{host}-signing.cer"))
}

/// Write `cert` as base64 encoded DER to the output file for `config`,
/// replacing whatever was there.
pub fn write_cert(config: &Config, cert: &SigningCert) -> Result<PathBuf> {
    let path = cert_path(&config.output, &config.host);
    let b64 = cert.to_base64()?;

    debug!("writing {} bytes to {}", b64.len(), path.display());
    fs::write(&path, b64).map_err(|source| Error::Io {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}
