// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use base64::{engine::general_purpose::STANDARD, Engine};
use log::debug;
use quick_xml::{
    events::{BytesStart, Event},
    name::{Namespace, ResolveResult},
    reader::NsReader,
};
use x509_cert::{
    der::{Decode, Encode},
    name::Name,
    Certificate,
};

use crate::{Error, Result};

/// SAML 2.0 metadata namespace, the default namespace of the document.
pub const SAML_METADATA_NS: &str = "urn:oasis:names:tc:SAML:2.0:metadata";

/// XML-DSig namespace. Both literal forms are accepted: documents in the
/// wild use the URI with and without the trailing '#'.
pub const XMLDSIG_NS: [&str; 2] = [
    "http://www.w3.org/2000/09/xmldsig#",
    "http://www.w3.org/2000/09/xmldsig",
];

const X509_CERTIFICATE: &[u8] = b"X509Certificate";

fn is_xmldsig(ns: &[u8]) -> bool {
    XMLDSIG_NS.iter().any(|n| n.as_bytes() == ns)
}

/// Return the text content of every `X509Certificate` element in the
/// XML-DSig namespace, in document order and at any depth. An element
/// nested in another one is returned on its own and also counts towards
/// the text of the outer one.
///
/// The whole document is checked for well-formedness before anything is
/// returned.
pub fn certificate_nodes(xml: &str) -> Result<Vec<String>> {
    let mut reader = NsReader::from_str(xml);

    let mut nodes: Vec<String> = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    // (depth, index into nodes) of every open X509Certificate element
    let mut open: Vec<(usize, usize)> = Vec::new();

    loop {
        let (ns, event) = reader.read_resolved_event()?;
        let in_dsig = match ns {
            ResolveResult::Bound(Namespace(ns)) => is_xmldsig(ns),
            ResolveResult::Unbound => false,
            ResolveResult::Unknown(_) => {
                return Err(Error::Malformed("undeclared namespace prefix"))
            }
        };

        match event {
            Event::Start(_) | Event::Empty(_) if depth == 0 && seen_root => {
                return Err(Error::Malformed("multiple root elements"));
            }
            Event::Start(e) => {
                check_element(&e)?;
                seen_root = true;
                depth += 1;

                if in_dsig && e.local_name().as_ref() == X509_CERTIFICATE {
                    open.push((depth, nodes.len()));
                    nodes.push(String::new());
                }
            }
            Event::Empty(e) => {
                check_element(&e)?;
                seen_root = true;

                if in_dsig && e.local_name().as_ref() == X509_CERTIFICATE {
                    nodes.push(String::new());
                }
            }
            Event::End(_) => {
                if depth == 0 {
                    return Err(Error::Malformed("unmatched end tag"));
                }
                if matches!(open.last(), Some((d, _)) if *d == depth) {
                    open.pop();
                }
                depth -= 1;
            }
            Event::Text(t) => {
                if depth == 0 {
                    if !t.iter().all(u8::is_ascii_whitespace) {
                        return Err(Error::Malformed("text outside root element"));
                    }
                    continue;
                }
                // unescape everything, undefined entities and a bare '&'
                // are errors wherever they appear
                let text = t.unescape()?;
                for (_, i) in &open {
                    nodes[*i].push_str(&text);
                }
            }
            Event::CData(c) => {
                if depth == 0 {
                    return Err(Error::Malformed("CDATA outside root element"));
                }
                let text = String::from_utf8_lossy(&c);
                for (_, i) in &open {
                    nodes[*i].push_str(&text);
                }
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
        }
    }

    if depth != 0 {
        return Err(Error::Malformed("unclosed element at end of document"));
    }
    if !seen_root {
        return Err(Error::Malformed("no root element"));
    }

    debug!("metadata has {} X509Certificate element(s)", nodes.len());
    Ok(nodes)
}

// Bytes that can never appear in an XML name.
const NAME_FORBIDDEN: &[u8] = b"<>&'\"=/!?;()[]{},%*+|\\^`~$@#";

fn is_name(name: &[u8]) -> bool {
    match name.first() {
        None => false,
        Some(b) if b.is_ascii_digit() || *b == b'-' || *b == b'.' => false,
        Some(_) => name
            .iter()
            .all(|b| !b.is_ascii_whitespace() && !NAME_FORBIDDEN.contains(b)),
    }
}

/// Check the element name and every attribute: attribute syntax,
/// duplicates, a raw '<' in a value and entity references in values.
fn check_element(e: &BytesStart) -> Result<()> {
    if !is_name(e.name().as_ref()) {
        return Err(Error::Malformed("invalid element name"));
    }

    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;

        if !is_name(attr.key.as_ref()) {
            return Err(Error::Malformed("invalid attribute name"));
        }
        if attr.value.contains(&b'<') {
            return Err(Error::Malformed("'<' in attribute value"));
        }
        attr.unescape_value()?;
    }

    Ok(())
}

/// A certificate taken from the federation metadata.
#[derive(Clone, Debug)]
pub struct SigningCert(Certificate);

impl SigningCert {
    pub fn subject(&self) -> &Name {
        &self.0.tbs_certificate.subject
    }

    /// DER encoding of the parsed certificate.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.0.to_der()?)
    }

    /// Standard base64 of `to_der`, without PEM armour or line breaks.
    pub fn to_base64(&self) -> Result<String> {
        Ok(STANDARD.encode(self.to_der()?))
    }
}

/// Decode the base64 text of an `X509Certificate` element and parse the
/// result as a DER encoded X.509 certificate. XML white space in the text
/// is ignored.
pub fn decode_cert(text: &str) -> Result<SigningCert> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let der = STANDARD.decode(compact)?;
    let cert = Certificate::from_der(&der)?;

    Ok(SigningCert(cert))
}
