//! `host:port` address handling.

/// Split `host[:port]` into host and port.
///
/// IPv6 literals carry a port only when bracketed (`[::1]:22`); an
/// unbracketed literal with several colons is taken as a bare host.
/// An empty port (`host:`) counts as no port.
pub(crate) fn split_host_port(addr: &str) -> (&str, Option<&str>) {
    if let Some(rest) = addr.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').filter(|p| !p.is_empty());
            return (host, port);
        }
        return (addr, None);
    }

    match addr.rsplit_once(':') {
        Some((host, _)) if host.contains(':') => (addr, None),
        Some((host, port)) if port.is_empty() => (host, None),
        Some((host, port)) => (host, Some(port)),
        None => (addr, None),
    }
}

/// Resolve `addr` into host and port, applying `default_port` when the
/// address has none. Returns `None` if the port is not a valid number.
pub(crate) fn with_default_port(addr: &str, default_port: u16) -> Option<(String, u16)> {
    let (host, port) = split_host_port(addr);
    let port = match port {
        Some(p) => p.parse().ok()?,
        None => default_port,
    };
    Some((host.to_string(), port))
}

/// Parse a dial target, which must name both host and port.
pub(crate) fn parse_target(addr: &str) -> Option<(&str, u16)> {
    match split_host_port(addr) {
        (host, Some(port)) if !host.is_empty() => Some((host, port.parse().ok()?)),
        _ => None,
    }
}

/// Render host and port as a connectable address.
pub(crate) fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("example.com:2222"), ("example.com", Some("2222")));
        assert_eq!(split_host_port("example.com"), ("example.com", None));
        assert_eq!(split_host_port("example.com:"), ("example.com", None));
        assert_eq!(split_host_port("[::1]:22"), ("::1", Some("22")));
        assert_eq!(split_host_port("[::1]"), ("::1", None));
        assert_eq!(split_host_port("fe80::1"), ("fe80::1", None));
    }

    #[test]
    fn test_default_port_only_when_missing() {
        assert_eq!(
            with_default_port("10.0.0.1", 22),
            Some(("10.0.0.1".to_string(), 22))
        );
        assert_eq!(
            with_default_port("10.0.0.1:2200", 22),
            Some(("10.0.0.1".to_string(), 2200))
        );
        assert_eq!(with_default_port("10.0.0.1:ssh", 22), None);
        assert_eq!(with_default_port("10.0.0.1:70000", 22), None);
    }

    #[test]
    fn test_parse_target_requires_port() {
        assert_eq!(parse_target("db.internal:5432"), Some(("db.internal", 5432)));
        assert_eq!(parse_target("[::1]:8080"), Some(("::1", 8080)));
        assert_eq!(parse_target("db.internal"), None);
        assert_eq!(parse_target(":5432"), None);
        assert_eq!(parse_target("db.internal:http"), None);
    }

    #[test]
    fn test_join_host_port() {
        assert_eq!(join_host_port("example.com", 22), "example.com:22");
        assert_eq!(join_host_port("::1", 22), "[::1]:22");
    }
}
