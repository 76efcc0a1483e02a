//! Scan target parsing and policy
//!
//! Targets end up on scanner command lines, so parsing is strict: anything
//! that could be read as an option or that carries shell metacharacters is
//! rejected before a job is created.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use utoipa::ToSchema;

static HOST_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("static regex is valid")
});

// `&` stays legal: URL query strings need it and targets only ever reach a
// tool as a single argv element.
const FORBIDDEN_CHARS: &[char] = &['`', '$', ';', '|', '<', '>', '"', '\'', '\\'];

/// What kind of identifier a target is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// http(s) URL
    Url,
    /// IPv4 or IPv6 address, optionally with a port
    Ip,
    /// DNS hostname, optionally with a port
    Hostname,
    /// Local repository or directory path
    RepositoryPath,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Url => "url",
            TargetKind::Ip => "ip",
            TargetKind::Hostname => "hostname",
            TargetKind::RepositoryPath => "repository_path",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated scan target. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanTarget {
    raw: String,
    kind: TargetKind,
    host: Option<String>,
}

impl ScanTarget {
    /// Parse and validate a target, auto-detecting its kind.
    pub fn parse(input: &str) -> Result<Self, TargetError> {
        let raw = input.trim();

        if raw.is_empty() {
            return Err(TargetError::Empty);
        }
        if raw.starts_with('-') {
            return Err(TargetError::LooksLikeFlag(raw.to_string()));
        }
        if raw
            .chars()
            .any(|c| !c.is_ascii_graphic() || FORBIDDEN_CHARS.contains(&c))
        {
            return Err(TargetError::InvalidCharacters(raw.to_string()));
        }

        if let Some(path) = raw.strip_prefix("file://") {
            return Self::repository_path(raw, path);
        }
        if raw.starts_with('/') {
            return Self::repository_path(raw, raw);
        }

        if let Some((scheme, rest)) = raw.split_once("://") {
            let scheme = scheme.to_ascii_lowercase();
            if scheme != "http" && scheme != "https" {
                return Err(TargetError::UnsupportedScheme(scheme));
            }
            let authority = rest
                .split(['/', '?', '#'])
                .next()
                .unwrap_or_default();
            let authority = authority.rsplit('@').next().unwrap_or_default();
            let host = strip_port(authority)?;
            if host.parse::<IpAddr>().is_err() && !is_valid_hostname(host) {
                return Err(TargetError::InvalidHost(host.to_string()));
            }
            return Ok(Self {
                raw: raw.to_string(),
                kind: TargetKind::Url,
                host: Some(host.to_string()),
            });
        }

        let host = strip_port(raw)?;
        if host.parse::<IpAddr>().is_ok() {
            return Ok(Self {
                raw: raw.to_string(),
                kind: TargetKind::Ip,
                host: Some(host.to_string()),
            });
        }
        if is_valid_hostname(host) {
            return Ok(Self {
                raw: raw.to_string(),
                kind: TargetKind::Hostname,
                host: Some(host.to_ascii_lowercase()),
            });
        }

        Err(TargetError::Unrecognized(raw.to_string()))
    }

    fn repository_path(raw: &str, path: &str) -> Result<Self, TargetError> {
        if !path.starts_with('/') || path.split('/').any(|segment| segment == "..") {
            return Err(TargetError::InvalidPath(path.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            kind: TargetKind::RepositoryPath,
            host: None,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Host part for network targets, `None` for repository paths.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Whether the target can be reached over the network.
    pub fn is_network(&self) -> bool {
        self.kind != TargetKind::RepositoryPath
    }

    /// URL form of the target; bare hosts get an `http://` prefix.
    pub fn as_url(&self) -> String {
        match self.kind {
            TargetKind::Url => self.raw.clone(),
            TargetKind::RepositoryPath if self.raw.starts_with("file://") => self.raw.clone(),
            TargetKind::RepositoryPath => format!("file://{}", self.raw),
            TargetKind::Ip if self.host.as_deref().is_some_and(|h| h.contains(':')) => {
                match self.raw.strip_prefix('[') {
                    Some(_) => format!("http://{}", self.raw),
                    None => format!("http://[{}]", self.raw),
                }
            }
            TargetKind::Ip | TargetKind::Hostname => format!("http://{}", self.raw),
        }
    }

    /// Filesystem path for repository targets.
    pub fn as_path(&self) -> Option<&str> {
        match self.kind {
            TargetKind::RepositoryPath => {
                Some(self.raw.strip_prefix("file://").unwrap_or(&self.raw))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Split an optional `:port` suffix off an authority. Bracketed IPv6 literals
/// keep their address, bare IPv6 literals are returned whole.
fn strip_port(authority: &str) -> Result<&str, TargetError> {
    if authority.is_empty() {
        return Err(TargetError::InvalidHost(authority.to_string()));
    }
    if let Some(rest) = authority.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| TargetError::InvalidHost(authority.to_string()))?;
        if !tail.is_empty() {
            check_port(authority, tail.strip_prefix(':'))?;
        }
        return Ok(host);
    }
    if authority.matches(':').count() > 1 {
        return Ok(authority);
    }
    match authority.split_once(':') {
        Some((host, port)) => {
            check_port(authority, Some(port))?;
            Ok(host)
        }
        None => Ok(authority),
    }
}

fn check_port(authority: &str, port: Option<&str>) -> Result<(), TargetError> {
    match port.map(str::parse::<u16>) {
        Some(Ok(p)) if p > 0 => Ok(()),
        _ => Err(TargetError::InvalidPort(authority.to_string())),
    }
}

fn is_valid_hostname(host: &str) -> bool {
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    // A dotted string made only of digits is a malformed IPv4 address, not a name.
    if host.split('.').all(|label| label.chars().all(|c| c.is_ascii_digit())) {
        return false;
    }
    host.split('.').all(|label| HOST_LABEL.is_match(label))
}

/// Allow-list of target patterns.
///
/// An empty policy allows every parsed target. Otherwise a target passes when
/// any pattern matches its raw form or its host.
#[derive(Debug, Clone, Default)]
pub struct TargetPolicy {
    patterns: Vec<Regex>,
}

impl TargetPolicy {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn check(&self, target: &ScanTarget) -> Result<(), TargetError> {
        if self.patterns.is_empty() {
            return Ok(());
        }
        let allowed = self.patterns.iter().any(|p| {
            p.is_match(target.as_str()) || target.host().is_some_and(|host| p.is_match(host))
        });
        if allowed {
            Ok(())
        } else {
            Err(TargetError::NotAllowed(target.as_str().to_string()))
        }
    }
}

/// Reasons a target is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("Target cannot be empty")]
    Empty,

    #[error("Target '{0}' looks like a command-line option")]
    LooksLikeFlag(String),

    #[error("Target '{0}' contains forbidden characters")]
    InvalidCharacters(String),

    #[error("Unsupported URL scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    #[error("Invalid host in target '{0}'")]
    InvalidHost(String),

    #[error("Invalid port in target '{0}'")]
    InvalidPort(String),

    #[error("Invalid repository path '{0}'")]
    InvalidPath(String),

    #[error("Target '{0}' is not a URL, IP address, hostname or absolute path")]
    Unrecognized(String),

    #[error("Target '{0}' is not permitted by the configured target patterns")]
    NotAllowed(String),
}
