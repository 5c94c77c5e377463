// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::debug;
use reqwest::blocking::Client;

use crate::{Error, Result};

/// Well known location of the federation metadata document.
pub const METADATA_PATH: &str = "/FederationMetadata/2007-06/FederationMetadata.xml";

/// Append `METADATA_PATH` to `url` unless it already points at the
/// metadata document. The check ignores case.
pub fn metadata_url(url: &str) -> String {
    if url
        .to_lowercase()
        .contains(&METADATA_PATH.to_lowercase())
    {
        url.to_string()
    } else {
        format!("{}{}", url.trim_end_matches('/'), METADATA_PATH)
    }
}

/// GET the federation metadata for `url` and return the body as text. A
/// non-success status is an error. There is no retry.
pub fn fetch_metadata(url: &str) -> Result<String> {
    let client = Client::builder().build().map_err(|source| Error::Fetch {
        url: url.to_string(),
        source,
    })?;

    fetch_metadata_with(&client, url)
}

/// Same as `fetch_metadata` but with a caller provided HTTP client.
pub fn fetch_metadata_with(client: &Client, url: &str) -> Result<String> {
    let url = metadata_url(url);
    debug!("fetching federation metadata from {url}");

    let body = client
        .get(&url)
        .send()
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.text())
        .map_err(|source| Error::Fetch {
            url: url.clone(),
            source,
        })?;

    debug!("got {} bytes of metadata", body.len());
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::{Read, Write},
        net::TcpListener,
        thread::{self, JoinHandle},
    };

    #[test]
    fn appends_metadata_path() {
        assert_eq!(
            metadata_url("https://idp.example.com"),
            "https://idp.example.com/FederationMetadata/2007-06/FederationMetadata.xml"
        );
        assert_eq!(
            metadata_url("https://idp.example.com/"),
            "https://idp.example.com/FederationMetadata/2007-06/FederationMetadata.xml"
        );
    }

    #[test]
    fn keeps_full_metadata_url() {
        let url =
            "https://idp.example.com/FederationMetadata/2007-06/FederationMetadata.xml";
        assert_eq!(metadata_url(url), url);

        let url =
            "https://IDP.example.com/federationmetadata/2007-06/FEDERATIONMETADATA.XML";
        assert_eq!(metadata_url(url), url);
    }

    // Tests talk to loopback only, keep proxies from the environment out
    // of the way.
    fn fetch(url: &str) -> Result<String> {
        let client = Client::builder().no_proxy().build().expect("client");
        fetch_metadata_with(&client, url)
    }

    // Answer exactly one request with the given status line and body.
    // The join handle yields the request line.
    fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local_addr");

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");

            let mut request: Vec<u8> = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).expect("read");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: text/xml\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("write");

            String::from_utf8_lossy(&request)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });

        (format!("http://{addr}"), handle)
    }

    #[test]
    fn fetch_body() -> anyhow::Result<()> {
        let (url, server) = serve_once("200 OK", "<EntityDescriptor/>");

        let body = fetch(&url)?;
        assert_eq!(body, "<EntityDescriptor/>");

        let request = server.join().expect("server thread");
        assert_eq!(
            request,
            "GET /FederationMetadata/2007-06/FederationMetadata.xml HTTP/1.1"
        );

        Ok(())
    }

    #[test]
    fn fetch_not_found() {
        let (url, server) = serve_once("404 Not Found", "");

        let err = fetch(&url).unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));

        server.join().expect("server thread");
    }

    #[test]
    fn fetch_unreachable() {
        // grab a free port then release it so nothing is listening
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        drop(listener);

        let err = fetch(&format!("http://{addr}")).unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }
}
