use crate::request_line::RequestFirstLine;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An access log line broken down into its fields.
///
/// Fields that the active format does not mention keep their default value:
/// empty strings, zero integers, no timestamp and empty maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    /// Remote IP address
    pub remote_ip_addr: String,
    /// Local IP address
    pub local_ip_addr: String,
    /// Size of response in bytes, excluding HTTP headers
    pub response_size: i64,
    /// Cookie values, keyed by cookie name
    pub cookies: HashMap<String, String>,
    /// Time taken to serve the request, in microseconds
    pub elapsed_time: i64,
    /// Environment variable values, keyed by variable name
    pub env_vars: HashMap<String, String>,
    pub filename: String,
    pub remote_host: String,
    pub request_proto: String,
    /// Request header values, keyed by header name as written in the format
    pub headers: HashMap<String, String>,
    /// Remote logname. A "-" is logged when not supplied
    pub remote_logname: String,
    pub request_method: String,
    /// Canonical port of the server serving the request
    pub port: String,
    /// Process ID of the child that serviced the request
    pub process_id: i64,
    /// Query string, prepended with a '?' if it exists
    pub query_string: String,
    pub request_first_line: RequestFirstLine,
    pub status: String,
    /// Time the request was received
    pub time: Option<DateTime<FixedOffset>>,
    /// Time taken to serve the request, in seconds
    pub elapsed_time_sec: i64,
    /// Remote user, from auth
    pub remote_user: String,
    /// URL path requested, not including any query string
    pub url_path: String,
    pub canonical_server_name: String,
    /// Server name according to the UseCanonicalName setting
    pub server_name: String,
    /// Bytes received, including request and headers
    pub bytes_received: i64,
    /// Bytes sent, including headers
    pub bytes_sent: i64,
}

impl AccessLogEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header value captured by a `%{Name}i` directive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env_vars.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_entry_is_empty() {
        let entry = AccessLogEntry::new();
        assert!(entry.remote_host.is_empty());
        assert_eq!(entry.response_size, 0);
        assert!(entry.time.is_none());
        assert!(entry.headers.is_empty());
        assert!(entry.cookies.is_empty());
        assert!(entry.env_vars.is_empty());
        assert!(entry.request_first_line.is_empty());
    }

    #[test]
    fn test_named_accessors() {
        let mut entry = AccessLogEntry::new();
        entry.headers.insert("Referer".to_string(), "http://127.0.0.1".to_string());
        entry.cookies.insert("session".to_string(), "abc".to_string());
        assert_eq!(entry.header("Referer"), Some("http://127.0.0.1"));
        assert_eq!(entry.header("User-agent"), None);
        assert_eq!(entry.cookie("session"), Some("abc"));
        assert_eq!(entry.env_var("HOME"), None);
    }

    #[test]
    fn test_entry_serializes_time_as_rfc3339() {
        let mut entry = AccessLogEntry::new();
        let tz = FixedOffset::east_opt(3600).unwrap();
        entry.time = Some(tz.with_ymd_and_hms(2016, 12, 12, 10, 57, 30).unwrap());
        entry.request_first_line = RequestFirstLine::new("GET /a HTTP/1.1");

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["time"], "2016-12-12T10:57:30+01:00");
        assert_eq!(value["request_first_line"], "GET /a HTTP/1.1");

        let back: AccessLogEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }
}
