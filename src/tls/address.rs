use crate::error::{Error, Result};
use std::{borrow::Cow, fmt, str::FromStr};

/// Port used when a target omits one
pub const DEFAULT_PORT: u16 = 443;

/// A validated `host:port` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    host: String,
    port: u16,
}

impl Address {
    /// Normalize a raw `host` or `host:port` target.
    ///
    /// A target without any colon gets the default port `443`. IPv6 hosts
    /// must be bracketed when a port is given, `[::1]:8443`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the target cannot be split into
    /// exactly a host and a port, and [`Error::InvalidPort`] if the port is
    /// not a number in `1..=65535`.
    pub fn parse(raw: &str) -> Result<Self> {
        let addr = ensure_default_port(raw.trim());
        let (host, port) = split_host_port(&addr)?;
        let port = parse_port(&addr, port)?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn ensure_default_port(addr: &str) -> Cow<'_, str> {
    if addr.contains(':') {
        Cow::Borrowed(addr)
    } else {
        Cow::Owned(format!("{addr}:{DEFAULT_PORT}"))
    }
}

fn split_host_port(addr: &str) -> Result<(&str, &str)> {
    let invalid = |reason| Error::InvalidAddress {
        address: addr.to_string(),
        reason,
    };

    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| invalid("missing ']' in address"))?;
        let port = tail
            .strip_prefix(':')
            .ok_or_else(|| invalid("missing port in address"))?;
        (host, port)
    } else {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port in address"))?;
        if host.contains(':') {
            return Err(invalid("too many colons in address"));
        }
        (host, port)
    };

    if host.contains(['[', ']']) || port.contains(['[', ']']) {
        return Err(invalid("unexpected bracket in address"));
    }
    if host.is_empty() {
        return Err(invalid("missing host in address"));
    }

    Ok((host, port))
}

fn parse_port(addr: &str, port: &str) -> Result<u16> {
    let invalid = || Error::InvalidPort {
        address: addr.to_string(),
        port: port.to_string(),
    };

    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(port) => Ok(port),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_default_port() {
        let addr = Address::parse("example.test").unwrap();
        assert_eq!(addr.host(), "example.test");
        assert_eq!(addr.port(), 443);
        assert_eq!(addr.to_string(), "example.test:443");
    }

    #[test]
    fn test_explicit_port_kept() {
        let addr = Address::parse("example.test:8443").unwrap();
        assert_eq!(addr.host(), "example.test");
        assert_eq!(addr.port(), 8443);
    }

    #[test]
    fn test_idempotent() {
        for raw in ["example.test", "example.test:8443", "[::1]:443", "127.0.0.1"] {
            let once = Address::parse(raw).unwrap();
            let twice = Address::parse(&once.to_string()).unwrap();
            assert_eq!(once, twice, "{raw}");
        }
    }

    #[test]
    fn test_ipv6() {
        let addr = Address::parse("[2001:db8::1]:8443").unwrap();
        assert_eq!(addr.host(), "2001:db8::1");
        assert_eq!(addr.port(), 8443);
        assert_eq!(addr.to_string(), "[2001:db8::1]:8443");
    }

    #[test]
    fn test_ipv6_without_brackets() {
        let err = Address::parse("::1").unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { .. }));

        let err = Address::parse("2001:db8::1:443").unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { .. }));
    }

    #[test]
    fn test_invalid_address() {
        for raw in [":443", "[::1", "[::1]", "[::1]x:443", "ex[am]ple:443", ""] {
            let err = Address::parse(raw).unwrap_err();
            assert!(
                matches!(err, Error::InvalidAddress { .. }),
                "{raw}: unexpected {err:?}"
            );
        }
    }

    #[test]
    fn test_invalid_port() {
        for raw in [
            "example.test:",
            "example.test:0",
            "example.test:65536",
            "example.test:https",
            "example.test:+443",
            "example.test:-1",
        ] {
            let err = Address::parse(raw).unwrap_err();
            assert!(
                matches!(err, Error::InvalidPort { .. }),
                "{raw}: unexpected {err:?}"
            );
        }
    }

    #[test]
    fn test_port_bounds() {
        assert_eq!(Address::parse("h:1").unwrap().port(), 1);
        assert_eq!(Address::parse("h:65535").unwrap().port(), 65535);
    }

    #[test]
    fn test_from_str() {
        let addr: Address = "example.test:993".parse().unwrap();
        assert_eq!(addr.port(), 993);
    }
}
