use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Field kinds supported by the Apache mod_log_config module.
/// For more information, see:
///    https://httpd.apache.org/docs/2.4/mod/mod_log_config.html#formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    RemoteIpAddress,     // %a
    LocalIpAddress,      // %A
    ResponseSize,        // %B
    ResponseSizeClf,     // %b
    Cookie,              // %{Foobar}C
    ElapsedTime,         // %D
    EnvVar,              // %{FOOBAR}e
    Header,              // %{Foobar}i
    Filename,            // %f
    RemoteHost,          // %h
    RequestProto,        // %H
    RemoteLogname,       // %l
    RequestMethod,       // %m
    Port,                // %p
    ProcessId,           // %P
    QueryString,         // %q
    RequestFirstLine,    // %r
    Status,              // %s
    Time,                // %t
    ElapsedTimeSec,      // %T
    RemoteUser,          // %u
    UrlPath,             // %U
    CanonicalServerName, // %v
    ServerName,          // %V
    BytesReceived,       // %I
    BytesSent,           // %O
    /// Only used to signal an unrecognized directive
    Unknown,
}

const DIRECTIVES: [(FieldKind, &str); 26] = [
    (FieldKind::RemoteIpAddress, "%a"),
    (FieldKind::LocalIpAddress, "%A"),
    (FieldKind::ResponseSize, "%B"),
    (FieldKind::ResponseSizeClf, "%b"),
    (FieldKind::Cookie, "%{...}C"),
    (FieldKind::ElapsedTime, "%D"),
    (FieldKind::EnvVar, "%{...}e"),
    (FieldKind::Header, "%{...}i"),
    (FieldKind::Filename, "%f"),
    (FieldKind::RemoteHost, "%h"),
    (FieldKind::RequestProto, "%H"),
    (FieldKind::RemoteLogname, "%l"),
    (FieldKind::RequestMethod, "%m"),
    (FieldKind::Port, "%p"),
    (FieldKind::ProcessId, "%P"),
    (FieldKind::QueryString, "%q"),
    (FieldKind::RequestFirstLine, "%r"),
    (FieldKind::Status, "%s"),
    (FieldKind::Time, "%t"),
    (FieldKind::ElapsedTimeSec, "%T"),
    (FieldKind::RemoteUser, "%u"),
    (FieldKind::UrlPath, "%U"),
    (FieldKind::CanonicalServerName, "%v"),
    (FieldKind::ServerName, "%V"),
    (FieldKind::BytesReceived, "%I"),
    (FieldKind::BytesSent, "%O"),
];

fn registry() -> &'static HashMap<&'static str, FieldKind> {
    static REGISTRY: OnceLock<HashMap<&'static str, FieldKind>> = OnceLock::new();
    REGISTRY.get_or_init(|| DIRECTIVES.iter().map(|&(kind, token)| (token, kind)).collect())
}

/// Retrieve the field kind corresponding to an exact directive string, or
/// `FieldKind::Unknown` when the directive is not recognized.
pub fn lookup(directive: &str) -> FieldKind {
    registry().get(directive).copied().unwrap_or(FieldKind::Unknown)
}

impl FieldKind {
    /// Every defined kind, excluding `Unknown`
    pub fn all() -> impl Iterator<Item = FieldKind> {
        DIRECTIVES.iter().map(|&(kind, _)| kind)
    }

    /// Canonical directive text for this kind
    pub fn as_directive(&self) -> &'static str {
        DIRECTIVES
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|&(_, token)| token)
            .unwrap_or("UNKNOWN")
    }

    /// True for the `%{Name}x` kinds that target an entry in a map
    pub fn is_named(&self) -> bool {
        matches!(self, FieldKind::Cookie | FieldKind::EnvVar | FieldKind::Header)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}
