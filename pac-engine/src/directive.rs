//! Parsing of the string returned by `FindProxyForURL`
//!
//! The grammar is `directive (";" directive)*` where a directive is `DIRECT`
//! or a keyword followed by `host[:port]`. Entries keep their input order,
//! which is the order a caller must try them in.

use std::fmt;
use tracing::debug;

const DEFAULT_HTTP_PORT: u16 = 80;
const DEFAULT_SOCKS_PORT: u16 = 1080;

/// Proxy host and port exactly as the script wrote them. No DNS lookup is
/// done here, so an unresolvable fallback cannot break an earlier entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyAddress {
    pub host: String,
    pub port: u16,
}

impl ProxyAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn parse(s: &str, default_port: u16) -> Option<Self> {
        // Bracketed IPv6 literal, e.g. [::1]:3128
        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']')?;
            if host.is_empty() {
                return None;
            }
            let port = match tail {
                "" | ":" => default_port,
                _ => tail.strip_prefix(':')?.parse().ok()?,
            };
            return Some(Self::new(format!("[{host}]"), port));
        }

        let (host, port) = match s.split_once(':') {
            Some((host, "")) => (host, default_port),
            Some((host, port)) => (host, port.parse().ok()?),
            None => (s, default_port),
        };
        if host.is_empty() || host.contains(':') {
            return None;
        }
        Some(Self::new(host, port))
    }
}

impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One entry of a PAC result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProxyDirective {
    /// Connect without a proxy
    Direct,
    /// HTTP proxy (`PROXY`, `HTTP` or `HTTPS`)
    Http(ProxyAddress),
    /// SOCKS proxy (`SOCKS`, `SOCKS4` or `SOCKS5`)
    Socks(ProxyAddress),
}

impl ProxyDirective {
    /// Address of the proxy, `None` for `DIRECT`
    pub fn address(&self) -> Option<&ProxyAddress> {
        match self {
            ProxyDirective::Direct => None,
            ProxyDirective::Http(addr) | ProxyDirective::Socks(addr) => Some(addr),
        }
    }

    /// Parse a single directive such as `PROXY host:8080`
    pub fn parse(entry: &str) -> Option<Self> {
        let mut tokens = entry.split_whitespace();
        let keyword = tokens.next()?;

        if keyword.eq_ignore_ascii_case("DIRECT") {
            return tokens.next().is_none().then_some(ProxyDirective::Direct);
        }

        let address = tokens.next()?;
        if tokens.next().is_some() {
            return None;
        }

        match keyword.to_ascii_uppercase().as_str() {
            "PROXY" | "HTTP" | "HTTPS" => {
                ProxyAddress::parse(address, DEFAULT_HTTP_PORT).map(ProxyDirective::Http)
            }
            "SOCKS" | "SOCKS4" | "SOCKS5" => {
                ProxyAddress::parse(address, DEFAULT_SOCKS_PORT).map(ProxyDirective::Socks)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ProxyDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyDirective::Direct => write!(f, "DIRECT"),
            ProxyDirective::Http(addr) => write!(f, "PROXY {}", addr),
            ProxyDirective::Socks(addr) => write!(f, "SOCKS {}", addr),
        }
    }
}

/// Parse a full `FindProxyForURL` result.
///
/// Entries that do not parse are skipped. The result is empty when nothing
/// parses; callers decide what an empty list means.
pub fn parse_directives(raw: &str) -> Vec<ProxyDirective> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let directive = ProxyDirective::parse(entry);
            if directive.is_none() {
                debug!("Skipping unparsable PAC directive: {:?}", entry);
            }
            directive
        })
        .collect()
}

/// Ordered, non-empty list of proxies to try
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyList(Vec<ProxyDirective>);

impl ProxyList {
    /// The fail-open answer: connect directly
    pub fn direct() -> Self {
        Self(vec![ProxyDirective::Direct])
    }

    /// Wrap parsed directives, `None` if there are none
    pub fn new(directives: Vec<ProxyDirective>) -> Option<Self> {
        if directives.is_empty() {
            None
        } else {
            Some(Self(directives))
        }
    }

    /// Parse a PAC result, falling back to `DIRECT` when nothing parses
    pub fn parse_or_direct(raw: &str) -> Self {
        Self::new(parse_directives(raw)).unwrap_or_else(Self::direct)
    }

    pub fn directives(&self) -> &[ProxyDirective] {
        &self.0
    }

    /// Whether the only choice is a direct connection
    pub fn is_direct(&self) -> bool {
        self.0.iter().all(|d| *d == ProxyDirective::Direct)
    }

    pub fn into_vec(self) -> Vec<ProxyDirective> {
        self.0
    }
}

impl std::ops::Deref for ProxyList {
    type Target = [ProxyDirective];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for ProxyList {
    type Item = ProxyDirective;
    type IntoIter = std::vec::IntoIter<ProxyDirective>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ProxyList {
    type Item = &'a ProxyDirective;
    type IntoIter = std::slice::Iter<'a, ProxyDirective>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ProxyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, directive) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", directive)?;
        }
        Ok(())
    }
}
