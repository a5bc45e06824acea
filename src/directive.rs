use crate::error::ParseError;
use crate::format::{self, FieldKind};
use crate::models::AccessLogEntry;
use crate::readers::{read_clf_size, read_date_time, read_int, read_string};
use crate::request_line::RequestFirstLine;
use std::fmt;

/// One compiled unit of a format string: which field to extract, whether the
/// value is wrapped in double quotes on the log line, and for `%{Name}x`
/// directives the name of the targeted cookie, header or variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    kind: FieldKind,
    quoted: bool,
    name: Option<String>,
}

impl Directive {
    /// Parse a single format string token such as `%h`, `"%r"` or
    /// `"%{User-agent}i"`.
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        let (text, quoted) = match token.strip_prefix('"') {
            Some(rest) => (rest.strip_suffix('"').unwrap_or(rest), true),
            None => (token, false),
        };

        let (kind, name) = match split_named(text) {
            Some((name, suffix)) => (format::lookup(&format!("%{{...}}{}", suffix)), Some(name)),
            None => (format::lookup(text), None),
        };

        if kind == FieldKind::Unknown {
            return Err(ParseError::UnsupportedDirective {
                directive: text.to_string(),
            });
        }

        Ok(Self {
            kind,
            quoted,
            name: name.map(str::to_string),
        })
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Cookie, header or variable name for `%{Name}x` directives
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Decode this directive's value from the start of `tail` into `entry`.
    ///
    /// Returns the number of bytes consumed from `tail`.
    pub fn apply(&self, entry: &mut AccessLogEntry, tail: &str) -> Result<usize, ParseError> {
        let quoted = self.quoted;
        match self.kind {
            FieldKind::Time => {
                let (time, consumed) = read_date_time(tail, quoted)?;
                entry.time = Some(time);
                Ok(consumed)
            }
            FieldKind::ResponseSizeClf => {
                let (size, consumed) = read_clf_size(tail, quoted)?;
                if let Some(size) = size {
                    entry.response_size = size;
                }
                Ok(consumed)
            }
            FieldKind::RequestFirstLine => {
                let (data, consumed) = read_string(tail, quoted)?;
                entry.request_first_line = RequestFirstLine::new(data);
                Ok(consumed)
            }
            FieldKind::Cookie | FieldKind::EnvVar | FieldKind::Header => {
                let (data, consumed) = read_string(tail, quoted)?;
                let name = self.name.clone().unwrap_or_default();
                let map = match self.kind {
                    FieldKind::Cookie => &mut entry.cookies,
                    FieldKind::EnvVar => &mut entry.env_vars,
                    _ => &mut entry.headers,
                };
                map.insert(name, data.to_string());
                Ok(consumed)
            }
            FieldKind::Unknown => Err(ParseError::UnsupportedDirective {
                directive: self.kind.to_string(),
            }),
            kind => {
                if let Some(field) = integer_field(kind, entry) {
                    let (value, consumed) = read_int(tail, quoted)?;
                    *field = value;
                    return Ok(consumed);
                }
                let (data, consumed) = read_string(tail, quoted)?;
                if let Some(field) = string_field(kind, entry) {
                    *field = data.to_string();
                }
                Ok(consumed)
            }
        }
    }
}

/// Split `%{Name}x` into its name and the trailing selector.
fn split_named(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("%{")?;
    let close = rest.find('}')?;
    Some((&rest[..close], &rest[close + 1..]))
}

fn integer_field(kind: FieldKind, entry: &mut AccessLogEntry) -> Option<&mut i64> {
    match kind {
        FieldKind::ResponseSize => Some(&mut entry.response_size),
        FieldKind::ElapsedTime => Some(&mut entry.elapsed_time),
        FieldKind::ProcessId => Some(&mut entry.process_id),
        FieldKind::ElapsedTimeSec => Some(&mut entry.elapsed_time_sec),
        FieldKind::BytesReceived => Some(&mut entry.bytes_received),
        FieldKind::BytesSent => Some(&mut entry.bytes_sent),
        _ => None,
    }
}

fn string_field(kind: FieldKind, entry: &mut AccessLogEntry) -> Option<&mut String> {
    match kind {
        FieldKind::RemoteIpAddress => Some(&mut entry.remote_ip_addr),
        FieldKind::LocalIpAddress => Some(&mut entry.local_ip_addr),
        FieldKind::Filename => Some(&mut entry.filename),
        FieldKind::RemoteHost => Some(&mut entry.remote_host),
        FieldKind::RequestProto => Some(&mut entry.request_proto),
        FieldKind::RemoteLogname => Some(&mut entry.remote_logname),
        FieldKind::RequestMethod => Some(&mut entry.request_method),
        FieldKind::Port => Some(&mut entry.port),
        FieldKind::QueryString => Some(&mut entry.query_string),
        FieldKind::Status => Some(&mut entry.status),
        FieldKind::RemoteUser => Some(&mut entry.remote_user),
        FieldKind::UrlPath => Some(&mut entry.url_path),
        FieldKind::CanonicalServerName => Some(&mut entry.canonical_server_name),
        FieldKind::ServerName => Some(&mut entry.server_name),
        _ => None,
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let directive = match &self.name {
            Some(name) => {
                let selector = self.kind.as_directive().trim_start_matches("%{...}");
                format!("%{{{}}}{}", name, selector)
            }
            None => self.kind.as_directive().to_string(),
        };
        if self.quoted {
            write!(f, "\"{}\"", directive)
        } else {
            f.write_str(&directive)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_quoted() {
        let host = Directive::parse("%h").unwrap();
        assert_eq!(host.kind(), FieldKind::RemoteHost);
        assert!(!host.is_quoted());
        assert_eq!(host.name(), None);

        let request = Directive::parse("\"%r\"").unwrap();
        assert_eq!(request.kind(), FieldKind::RequestFirstLine);
        assert!(request.is_quoted());
    }

    #[test]
    fn test_parse_named_directives() {
        let referer = Directive::parse("\"%{Referer}i\"").unwrap();
        assert_eq!(referer.kind(), FieldKind::Header);
        assert_eq!(referer.name(), Some("Referer"));
        assert!(referer.is_quoted());

        let cookie = Directive::parse("%{session}C").unwrap();
        assert_eq!(cookie.kind(), FieldKind::Cookie);
        assert_eq!(cookie.name(), Some("session"));

        let env = Directive::parse("%{HOME}e").unwrap();
        assert_eq!(env.kind(), FieldKind::EnvVar);
    }

    #[test]
    fn test_parse_unsupported() {
        for token in ["foo", "", "%z", "%{Referer}x", "%{Referer", "%>s", "%h\""] {
            assert!(
                matches!(Directive::parse(token), Err(ParseError::UnsupportedDirective { .. })),
                "token {:?}",
                token
            );
        }
        assert_eq!(
            Directive::parse("\"%Z\""),
            Err(ParseError::UnsupportedDirective { directive: "%Z".to_string() })
        );
    }

    #[test]
    fn test_display_restores_token() {
        for token in ["%h", "\"%r\"", "\"%{User-agent}i\"", "%{sid}C", "%{PATH}e", "%b"] {
            assert_eq!(Directive::parse(token).unwrap().to_string(), token);
        }
    }

    #[test]
    fn test_apply_remote_host() {
        for (quoted, line) in [(true, "\"foobar\" 42"), (false, "foobar 42")] {
            let directive = Directive { kind: FieldKind::RemoteHost, quoted, name: None };
            let mut entry = AccessLogEntry::new();
            let consumed = directive.apply(&mut entry, line).unwrap();
            assert_eq!(entry.remote_host, "foobar");
            assert_eq!(&line[consumed..], " 42");
        }
    }

    #[test]
    fn test_apply_integer_fields() {
        let mut entry = AccessLogEntry::new();
        Directive::parse("%D").unwrap().apply(&mut entry, "1532 x").unwrap();
        Directive::parse("%P").unwrap().apply(&mut entry, "4242").unwrap();
        Directive::parse("%O").unwrap().apply(&mut entry, "\"977\"").unwrap_err();
        Directive::parse("\"%O\"").unwrap().apply(&mut entry, "\"977\"").unwrap();
        assert_eq!(entry.elapsed_time, 1532);
        assert_eq!(entry.process_id, 4242);
        assert_eq!(entry.bytes_sent, 977);
    }

    #[test]
    fn test_apply_clf_dash_keeps_default() {
        let mut entry = AccessLogEntry::new();
        let consumed = Directive::parse("%b").unwrap().apply(&mut entry, "-\n").unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(entry.response_size, 0);
    }
}
