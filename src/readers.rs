//! Low-level scanners operating on the tail of a line.
//!
//! Every reader returns the decoded value along with the number of bytes it
//! consumed, counted from the start of the tail it was given.

use crate::error::ParseError;
use chrono::{DateTime, FixedOffset};

/// Time layout of the `%t` directive, e.g. `10/Oct/2000:13:55:36 -0700`
pub const APACHE_TIME_LAYOUT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Extract the content of a quoted expression.
///
/// `s` must start with a double quote. The closing quote does not need to be
/// at the end of `s`; the consumed length covers both quotes.
pub fn extract_from_quotes(s: &str) -> Result<(&str, usize), ParseError> {
    match s.chars().next() {
        Some('"') => {}
        found => {
            return Err(ParseError::UnexpectedCharacter {
                found,
                expected: "quote".to_string(),
            })
        }
    }
    let close = s[1..].find('"').ok_or(ParseError::MissingClosingQuote)? + 1;
    Ok((&s[1..close], close + 1))
}

/// Read the next string value, either delimited by a space or a newline, or
/// wrapped in double quotes when `quoted` is set.
pub fn read_string(tail: &str, quoted: bool) -> Result<(&str, usize), ParseError> {
    if quoted {
        return extract_from_quotes(tail);
    }
    let end = tail.find(&[' ', '\n'][..]).unwrap_or(tail.len());
    Ok((&tail[..end], end))
}

/// Read a timestamp surrounded by square brackets and formatted with
/// [`APACHE_TIME_LAYOUT`]. When `quoted` is set the brackets are themselves
/// wrapped in double quotes.
pub fn read_date_time(tail: &str, quoted: bool) -> Result<(DateTime<FixedOffset>, usize), ParseError> {
    let (input, quoted_len) = if quoted {
        let (inner, consumed) = extract_from_quotes(tail)?;
        (inner, Some(consumed))
    } else {
        (tail, None)
    };

    match input.chars().next() {
        Some('[') => {}
        found => {
            return Err(ParseError::UnexpectedCharacter {
                found,
                expected: "'['".to_string(),
            })
        }
    }
    let close = input.find(']').ok_or(ParseError::MissingClosingBracket)?;
    let interior = &input[1..close];

    let time = DateTime::parse_from_str(interior, APACHE_TIME_LAYOUT).map_err(|e| {
        ParseError::TimestampLayout {
            input: interior.to_string(),
            error_message: e.to_string(),
        }
    })?;

    Ok((time, quoted_len.unwrap_or(close + 1)))
}

/// Read an unsigned integer. Scanning stops at the first non-digit.
pub fn read_int(tail: &str, quoted: bool) -> Result<(i64, usize), ParseError> {
    if !quoted {
        return scan_digits(tail);
    }
    let (inner, consumed) = extract_from_quotes(tail)?;
    let (value, len) = scan_digits(inner)?;
    if len != inner.len() {
        return Err(ParseError::ExpectedDigit { found: inner[len..].chars().next() });
    }
    Ok((value, consumed))
}

fn scan_digits(s: &str) -> Result<(i64, usize), ParseError> {
    if !s.as_bytes().first().is_some_and(u8::is_ascii_digit) {
        return Err(ParseError::ExpectedDigit { found: s.chars().next() });
    }
    let end = s.bytes().position(|b| !b.is_ascii_digit()).unwrap_or(s.len());
    let digits = &s[..end];
    // only reachable on overflow, the run holds digits only
    let value = digits.parse::<i64>().map_err(|e| ParseError::IntegerOverflow {
        digits: digits.to_string(),
        error_message: e.to_string(),
    })?;
    Ok((value, end))
}

/// Read a response size in CLF form, where `-` stands for "no body".
///
/// Returns `None` for the dash so the caller keeps its zero default.
pub fn read_clf_size(tail: &str, quoted: bool) -> Result<(Option<i64>, usize), ParseError> {
    let (token, consumed) = read_string(tail, quoted)?;
    if token == "-" {
        return Ok((None, consumed));
    }
    let size = token.parse::<i64>().map_err(|e| ParseError::MalformedResponseSize {
        token: token.to_string(),
        error_message: e.to_string(),
    })?;
    Ok((Some(size), consumed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_extract_from_quotes() {
        assert_eq!(extract_from_quotes("\"foo\" bar").unwrap(), ("foo", 5));
        assert_eq!(extract_from_quotes("\"\" bar").unwrap(), ("", 2));
        assert_eq!(extract_from_quotes("\"foo bar"), Err(ParseError::MissingClosingQuote));
        assert_eq!(
            extract_from_quotes("foo\" bar").unwrap_err().to_string(),
            "got 'f', want quote"
        );
    }

    #[test]
    fn test_read_string() {
        assert_eq!(read_string("127.0.0.1\n", false).unwrap(), ("127.0.0.1", 9));
        assert_eq!(read_string("foo bar", false).unwrap(), ("foo", 3));
        assert_eq!(read_string("\"foo\"", true).unwrap(), ("foo", 5));
        assert_eq!(read_string("foobar", false).unwrap(), ("foobar", 6));
        assert_eq!(read_string("\"GET / HTTP/1.1\" 200", true).unwrap(), ("GET / HTTP/1.1", 16));
        assert_eq!(read_string("", false).unwrap(), ("", 0));
    }

    #[test]
    fn test_read_date_time() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let expected = tz.with_ymd_and_hms(2016, 11, 16, 9, 25, 5).unwrap();

        let (time, off) = read_date_time("[16/Nov/2016:09:25:05 +0100] foobar", false).unwrap();
        assert_eq!(time, expected);
        assert_eq!(time.offset(), &tz);
        assert_eq!(off, 28);

        let (time, off) = read_date_time("\"[16/Nov/2016:09:25:05 +0100]\" foobar", true).unwrap();
        assert_eq!(time, expected);
        assert_eq!(off, 30);
    }

    #[test]
    fn test_read_date_time_errors() {
        assert_eq!(
            read_date_time("foobar]", false).unwrap_err().to_string(),
            "got 'f', want '['"
        );
        assert_eq!(read_date_time("[foobar", false), Err(ParseError::MissingClosingBracket));
        assert!(matches!(
            read_date_time("[2016-11-16 09:25:05 +0100]", false),
            Err(ParseError::TimestampLayout { ref input, .. }) if input == "2016-11-16 09:25:05 +0100"
        ));
        assert_eq!(read_date_time("\"[16/Nov/2016", true), Err(ParseError::MissingClosingQuote));
        assert!(matches!(
            read_date_time("", false),
            Err(ParseError::UnexpectedCharacter { found: None, .. })
        ));
    }

    #[test]
    fn test_read_int() {
        assert_eq!(read_int("1234567890 foo", false).unwrap(), (1234567890, 10));
        assert_eq!(read_int("1234567890foo", false).unwrap(), (1234567890, 10));
        assert_eq!(read_int("1234567890\n", false).unwrap(), (1234567890, 10));
        assert_eq!(read_int("\"42\" foo", true).unwrap(), (42, 4));
        assert_eq!(
            read_int("foo123", false).unwrap_err().to_string(),
            "got 'f', want digit between 0 and 9"
        );
        assert_eq!(read_int("\"4x\"", true), Err(ParseError::ExpectedDigit { found: Some('x') }));
        assert!(matches!(
            read_int("99999999999999999999", false),
            Err(ParseError::IntegerOverflow { .. })
        ));
    }

    #[test]
    fn test_read_clf_size() {
        assert_eq!(read_clf_size("- foo", false).unwrap(), (None, 1));
        assert_eq!(read_clf_size("50122\n", false).unwrap(), (Some(50122), 5));
        assert!(matches!(
            read_clf_size("abc ", false),
            Err(ParseError::MalformedResponseSize { ref token, .. }) if token == "abc"
        ));
    }

    #[quickcheck]
    fn prop_clf_numeric_tokens_yield_exact_value(n: u32) -> bool {
        let line = format!("{} next", n);
        read_clf_size(&line, false) == Ok((Some(n as i64), n.to_string().len()))
    }

    #[quickcheck]
    fn prop_clf_non_numeric_tokens_fail(token: String) -> bool {
        let token: String = token.chars().filter(|c| !c.is_whitespace()).collect();
        if token == "-" || token.is_empty() || token.parse::<i64>().is_ok() {
            return true;
        }
        matches!(
            read_clf_size(&token, false),
            Err(ParseError::MalformedResponseSize { .. })
        )
    }
}
