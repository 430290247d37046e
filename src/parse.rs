//! Textual readers for the CLI.
//!
//! Not part of the core anonymization surface, but the binary needs line-
//! oriented parsing with clear diagnostics, in the same terse style as the
//! teacher's `load_selectors_csv` (`src/bin/prover.rs`): trim the line,
//! strip a trailing `#` comment, skip blanks, and report the line number
//! and offending token on failure. IPv4/IPv6 parsing is `std::net`'s own
//! `FromStr` — no reason to hand-roll what the standard library already
//! gets right.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{AnonError, AnonResult};

/// Strip a trailing `#`-comment and surrounding whitespace from one line.
fn clean_line(line: &str) -> &str {
    let line = match line.find('#') {
        Some(hash) => &line[..hash],
        None => line,
    };
    line.trim()
}

/// Parse an IPv4 address in dotted-quad form.
pub fn parse_ipv4(token: &str) -> AnonResult<[u8; 4]> {
    token
        .parse::<Ipv4Addr>()
        .map(|a| a.octets())
        .map_err(|e| AnonError::Io(format!("invalid IPv4 address `{token}`: {e}")))
}

/// Parse an IPv6 address in any RFC 5952 textual form.
pub fn parse_ipv6(token: &str) -> AnonResult<[u8; 16]> {
    token
        .parse::<Ipv6Addr>()
        .map(|a| a.octets())
        .map_err(|e| AnonError::Io(format!("invalid IPv6 address `{token}`: {e}")))
}

/// Parse a MAC address in colon-hex form, e.g. `de:ad:be:ef:00:01`.
pub fn parse_mac(token: &str) -> AnonResult<[u8; 6]> {
    let parts: Vec<&str> = token.split(':').collect();
    if parts.len() != 6 {
        return Err(AnonError::Io(format!(
            "invalid MAC address `{token}`: expected 6 colon-separated octets, found {}",
            parts.len()
        )));
    }
    let mut mac = [0u8; 6];
    for (i, p) in parts.iter().enumerate() {
        mac[i] = u8::from_str_radix(p, 16)
            .map_err(|e| AnonError::Io(format!("invalid MAC address `{token}`: octet `{p}` ({e})")))?;
    }
    Ok(mac)
}

/// Parse a decimal (or `-`-prefixed) signed 64-bit integer.
pub fn parse_i64(token: &str) -> AnonResult<i64> {
    token
        .parse::<i64>()
        .map_err(|e| AnonError::Io(format!("invalid integer `{token}`: {e}")))
}

/// Parse a decimal unsigned 64-bit integer.
pub fn parse_u64(token: &str) -> AnonResult<u64> {
    token
        .parse::<u64>()
        .map_err(|e| AnonError::Io(format!("invalid integer `{token}`: {e}")))
}

/// Read `text` as raw octet-string lines: one identifier per line, only
/// the trailing newline trimmed. Unlike `parse_lines`, blank lines and `#`
/// are not special-cased — an octet string is an arbitrary byte sequence,
/// and stripping either would silently corrupt data that happens to
/// contain them.
pub fn parse_octet_lines(text: &str) -> Vec<Vec<u8>> {
    text.lines().map(|line| line.as_bytes().to_vec()).collect()
}

/// Read `text` line by line, applying `parse_one` to each non-blank,
/// non-comment line, and collecting the results. On failure, the error
/// message is annotated with the 1-based line number.
pub fn parse_lines<T>(text: &str, mut parse_one: impl FnMut(&str) -> AnonResult<T>) -> AnonResult<Vec<T>> {
    let mut out = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = clean_line(raw);
        if line.is_empty() {
            continue;
        }
        let v = parse_one(line).map_err(|e| match e {
            AnonError::Io(msg) => AnonError::Io(format!("line {}: {msg}", lineno + 1)),
            other => other,
        })?;
        out.push(v);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_ipv4() {
        assert_eq!(parse_ipv4("10.0.0.1").unwrap(), [10, 0, 0, 1]);
    }

    #[test]
    fn rejects_invalid_ipv4() {
        assert!(parse_ipv4("not-an-ip").is_err());
    }

    #[test]
    fn parses_valid_ipv6() {
        assert_eq!(parse_ipv6("::1").unwrap(), Ipv6Addr::LOCALHOST.octets());
    }

    #[test]
    fn parses_valid_mac() {
        assert_eq!(parse_mac("de:ad:be:ef:00:01").unwrap(), [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
    }

    #[test]
    fn rejects_malformed_mac() {
        assert!(parse_mac("de:ad:be:ef:00").is_err());
        assert!(parse_mac("zz:ad:be:ef:00:01").is_err());
    }

    #[test]
    fn parse_octet_lines_keeps_raw_bytes_and_blanks() {
        let text = "alpha\n#not-a-comment\n\nbeta\n";
        let lines = parse_octet_lines(text);
        assert_eq!(
            lines,
            vec![b"alpha".to_vec(), b"#not-a-comment".to_vec(), b"".to_vec(), b"beta".to_vec()]
        );
    }

    #[test]
    fn parse_lines_skips_blanks_and_comments_and_annotates_errors() {
        let text = "10.0.0.1\n# a comment\n\n10.0.0.2  # trailing comment\nnope\n";
        let err = parse_lines(text, parse_ipv4).unwrap_err();
        match err {
            AnonError::Io(msg) => assert!(msg.starts_with("line 5:"), "got: {msg}"),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn parse_lines_collects_valid_entries() {
        let text = "10.0.0.1\n10.0.0.2\n";
        let out = parse_lines(text, parse_ipv4).unwrap();
        assert_eq!(out, vec![[10, 0, 0, 1], [10, 0, 0, 2]]);
    }
}
