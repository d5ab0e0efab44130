use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use url::{Host, Url};

/// Mapping of service name to the endpoint that should be probed for it.
/// A `BTreeMap` keeps reporting order stable (ascending by name).
pub type ServiceDirectory = BTreeMap<String, EndpointDescriptor>;

/// Client credential bundle used for the TLS stages of a probe.
/// Every field is an optional path; an empty string counts as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsBundle {
    pub ca_certs: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
}

impl TlsBundle {
    /// True when at least one field holds a non-empty path.
    pub fn is_configured(&self) -> bool {
        [&self.ca_certs, &self.key_file, &self.cert_file]
            .into_iter()
            .any(|field| non_empty(field).is_some())
    }

    pub fn ca_certs(&self) -> Option<&PathBuf> {
        non_empty(&self.ca_certs)
    }

    pub fn key_file(&self) -> Option<&PathBuf> {
        non_empty(&self.key_file)
    }

    pub fn cert_file(&self) -> Option<&PathBuf> {
        non_empty(&self.cert_file)
    }
}

fn non_empty(field: &Option<PathBuf>) -> Option<&PathBuf> {
    field.as_ref().filter(|p| !p.as_os_str().is_empty())
}

impl fmt::Display for TlsBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |field: Option<&PathBuf>| match field {
            Some(path) => format!("{:?}", path.display().to_string()),
            None => "None".to_string(),
        };
        write!(
            f,
            "ca_certs={}, key_file={}, cert_file={}",
            show(self.ca_certs()),
            show(self.key_file()),
            show(self.cert_file())
        )
    }
}

/// One remote service to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub name: String,
    pub url: String,
    pub tls: TlsBundle,
}

impl EndpointDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            tls: TlsBundle::default(),
        }
    }

    pub fn with_tls(mut self, tls: TlsBundle) -> Self {
        self.tls = tls;
        self
    }
}

/// Anything that knows how to reach a remote service implements this, so the
/// prober never has to dig into client internals.
pub trait DescribeEndpoint {
    fn describe(&self, name: &str) -> EndpointDescriptor;
}

/// Build a [`ServiceDirectory`] out of any collection of service clients.
pub fn directory_from<'a, S, I>(services: I) -> ServiceDirectory
where
    S: DescribeEndpoint + 'a,
    I: IntoIterator<Item = (&'a String, &'a S)>,
{
    services
        .into_iter()
        .map(|(name, service)| (name.clone(), service.describe(name)))
        .collect()
}

/// Host and port a probe connects to, derived from the endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

/// Secure schemes default to 443, everything else to 80.
pub fn default_port(scheme: &str) -> u16 {
    match scheme {
        "https" | "wss" => 443,
        _ => 80,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error("url has no host")]
    MissingHost,
}

impl Target {
    pub fn parse(url: &str) -> Result<Self, TargetError> {
        let parsed = Url::parse(url)?;
        let host = match parsed.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            _ => return Err(TargetError::MissingHost),
        };
        let scheme = parsed.scheme().to_string();
        // `Url::port` is None for a scheme's well-known port, so those fall
        // through to the same default
        let port = parsed.port().unwrap_or_else(|| default_port(&scheme));

        Ok(Target { scheme, host, port })
    }
}
