use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// The first line of an HTTP request, e.g. `GET /index.html?q=1 HTTP/1.1`.
///
/// Splitting into method, path and protocol happens on first access and is
/// cached, as is the percent-decoded path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RequestFirstLine {
    raw: String,
    parts: OnceLock<RequestParts>,
    decoded_path: OnceLock<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RequestParts {
    method: String,
    path: String,
    protocol: String,
}

impl RequestParts {
    fn split(raw: &str) -> Self {
        let fields: Vec<&str> = raw.split(' ').collect();
        match fields.as_slice() {
            [method, path, protocol] => Self {
                method: method.to_string(),
                path: path.to_string(),
                protocol: protocol.to_string(),
            },
            _ => Self::default(),
        }
    }
}

impl RequestFirstLine {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            parts: OnceLock::new(),
            decoded_path: OnceLock::new(),
        }
    }

    fn parts(&self) -> &RequestParts {
        self.parts.get_or_init(|| RequestParts::split(&self.raw))
    }

    /// Raw text as captured from the log line
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// True once method, path and protocol have been split out
    pub fn is_decoded(&self) -> bool {
        self.parts.get().is_some()
    }

    pub fn method(&self) -> &str {
        &self.parts().method
    }

    /// Requested path, percent-decoded. Falls back to the encoded path when it
    /// holds a malformed escape or does not decode to UTF-8.
    pub fn path(&self) -> &str {
        self.decoded_path.get_or_init(|| {
            let raw_path = self.raw_path();
            decode_path(raw_path).unwrap_or_else(|| raw_path.to_string())
        })
    }

    /// Requested path exactly as it appears in the request line
    pub fn raw_path(&self) -> &str {
        &self.parts().path
    }

    pub fn protocol(&self) -> &str {
        &self.parts().protocol
    }
}

fn decode_path(path: &str) -> Option<String> {
    let bytes = path.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'%'
            || (i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit())
    });
    if !well_formed {
        return None;
    }
    percent_decode_str(path)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

impl PartialEq for RequestFirstLine {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for RequestFirstLine {}

impl fmt::Display for RequestFirstLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<String> for RequestFirstLine {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<RequestFirstLine> for String {
    fn from(line: RequestFirstLine) -> Self {
        line.raw
    }
}
