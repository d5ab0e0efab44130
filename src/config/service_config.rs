use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::probe::prelude::*;

/// The configuration file of a hostwatch process.
/// Contains the main loop poll interval, the probe timeouts and the service directory.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    /// How often the main loop wakes up to check whether it should stop.
    #[serde(default = "default_thread_wait_interval_ms")]
    pub thread_wait_interval_ms: u64,

    /// Per-stage timeouts for connectivity probes.
    #[serde(default)]
    pub probe: TimeoutsConfig,

    /// The services to probe, keyed by name.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
}

/// Timeouts for the network stages of a probe, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_timeout_ms")]
    pub resolve_timeout_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub handshake_timeout_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_timeout_ms(),
            handshake_timeout_ms: default_timeout_ms(),
        }
    }
}

impl TimeoutsConfig {
    pub fn settings(&self) -> ProbeSettings {
        ProbeSettings {
            resolve_timeout: Duration::from_millis(self.resolve_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            handshake_timeout: Duration::from_millis(self.handshake_timeout_ms),
        }
    }
}

/// A single entry of the service directory.
///
/// Either a full `url`, or the `type` + `host` pair an RPC client is
/// configured with (`host` may carry a port), which becomes `type://host/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    pub url: Option<String>,

    #[serde(rename = "type")]
    pub scheme: Option<String>,

    pub host: Option<String>,

    pub ca_certs: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
}

impl DescribeEndpoint for ServiceConfig {
    fn describe(&self, name: &str) -> EndpointDescriptor {
        let url = match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "{}://{}/",
                self.scheme.as_deref().unwrap_or("http"),
                self.host.as_deref().unwrap_or_default()
            ),
        };

        EndpointDescriptor::new(name, url).with_tls(TlsBundle {
            ca_certs: self.ca_certs.clone(),
            key_file: self.key_file.clone(),
            cert_file: self.cert_file.clone(),
        })
    }
}

fn default_thread_wait_interval_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    5000
}
