use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use trust_dns_resolver::TokioAsyncResolver;

use super::endpoint::{EndpointDescriptor, ServiceDirectory, Target, TlsBundle};
use super::result::{ProbeOutcome, ProbeResult, ProbeStage, StatusLog};
use super::tls::{self, PeerCheck};
use super::{StageError, error_chain};

const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bounds for each network stage of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    pub resolve_timeout: Duration,
    pub connect_timeout: Duration,
    pub handshake_timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            resolve_timeout: DEFAULT_STAGE_TIMEOUT,
            connect_timeout: DEFAULT_STAGE_TIMEOUT,
            handshake_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }
}

/// Runs staged connectivity checks: parse, resolve, connect, and the two TLS
/// handshakes when the endpoint carries credentials.
///
/// Cloning is cheap; the resolver is shared between clones.
#[derive(Clone)]
pub struct Prober {
    resolver: TokioAsyncResolver,
    settings: ProbeSettings,
}

impl Prober {
    pub fn new(resolver: TokioAsyncResolver, settings: ProbeSettings) -> Self {
        Self { resolver, settings }
    }

    pub fn settings(&self) -> ProbeSettings {
        self.settings
    }

    /// Probe a single endpoint. Never fails: every problem ends up as the
    /// last status line of the returned report.
    pub async fn probe(&self, endpoint: &EndpointDescriptor) -> ProbeResult {
        let mut status = StatusLog::default();
        status.push(format!("checking {}", endpoint.url));

        let target = match Target::parse(&endpoint.url) {
            Ok(target) => target,
            Err(e) => {
                return status.fail(
                    ProbeStage::Parse,
                    format!("failed to parse url: {}", error_chain(&e)),
                );
            }
        };
        let Target { host, port, .. } = &target;
        status.push(format!("using hostname {host} and port {port}"));

        let ip = match self.resolve(host).await {
            Ok(ip) => ip,
            Err(e) => {
                return status.fail(
                    ProbeStage::Resolve,
                    format!("failed to resolve host with DNS: {}", error_chain(&e)),
                );
            }
        };
        status.push(format!("successfully resolved host {host} to {ip}"));

        let addr = SocketAddr::new(ip, *port);
        let stream = match self.connect(addr).await {
            Ok(stream) => stream,
            Err(e) => {
                return status.fail(
                    ProbeStage::Connect,
                    format!(
                        "failed to establish a socket connection to {host} on port {port}: {}",
                        error_chain(&e)
                    ),
                );
            }
        };
        status.push(format!("successfully opened socket connection to {host}:{port}"));

        if !endpoint.tls.is_configured() {
            drop(stream);
            return status.succeed("everything seems to work");
        }

        // The stream is consumed here and closed whatever the outcome
        match self.handshake(&endpoint.tls, PeerCheck::AcceptAny, host, stream).await {
            Ok(days_left) => {
                status.push("succeeded at SSL handshake (without validating server cert)");
                if let Some(days) = days_left {
                    status.push(format!("server certificate expires in {days} days"));
                }
            }
            Err(e) => {
                return status.fail(
                    ProbeStage::Handshake,
                    format!(
                        "failed to complete SSL handshake ({}): {}",
                        endpoint.tls,
                        error_chain(&e)
                    ),
                );
            }
        }

        let validated = async {
            let stream = self.connect(addr).await?;
            self.handshake(&endpoint.tls, PeerCheck::RequireValid, host, stream)
                .await
        };
        if let Err(e) = validated.await {
            return status.fail(
                ProbeStage::Validate,
                format!(
                    "failed to validate server cert ({}): {}",
                    endpoint.tls,
                    error_chain(&e)
                ),
            );
        }
        status.push("succeeded at validating server cert");

        status.succeed("everything seems to work")
    }

    /// Probe every endpoint of the directory concurrently. Each endpoint gets
    /// its own task and its own slot in the returned map, ordered by name.
    pub async fn probe_all(&self, directory: &ServiceDirectory) -> BTreeMap<String, ProbeResult> {
        let mut handles = Vec::with_capacity(directory.len());

        for (name, endpoint) in directory {
            let prober = self.clone();
            let endpoint = endpoint.clone();
            let handle = tokio::spawn(async move { prober.probe(&endpoint).await });
            handles.push((name.clone(), handle));
        }

        let mut results = BTreeMap::new();
        for (name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    log::error!("Probe task for {name} did not finish: {e}");
                    ProbeResult {
                        lines: vec![format!("probe aborted: {e}")],
                        outcome: ProbeOutcome::Aborted,
                    }
                }
            };
            log::debug!("Probed {name}: {}", result.outcome);
            results.insert(name, result);
        }
        results
    }

    async fn resolve(&self, host: &str) -> Result<IpAddr, StageError> {
        let limit = self.settings.resolve_timeout;
        let lookup = timeout(limit, self.resolver.lookup_ip(host))
            .await
            .map_err(|_| StageError::Timeout(limit))??;

        lookup
            .iter()
            .next()
            .ok_or_else(|| StageError::NoAddress(host.to_string()))
    }

    async fn connect(&self, addr: SocketAddr) -> Result<TcpStream, StageError> {
        let limit = self.settings.connect_timeout;
        let stream = timeout(limit, TcpStream::connect(addr))
            .await
            .map_err(|_| StageError::Timeout(limit))??;
        Ok(stream)
    }

    /// Wrap `stream` in a TLS session and report how many days the peer
    /// certificate has left, when it can be read.
    async fn handshake(
        &self,
        bundle: &TlsBundle,
        check: PeerCheck,
        host: &str,
        stream: TcpStream,
    ) -> Result<Option<i64>, StageError> {
        let connector = tls::build_connector(bundle, check)?;
        let limit = self.settings.handshake_timeout;
        let tls_stream = timeout(limit, connector.connect(host, stream))
            .await
            .map_err(|_| StageError::Timeout(limit))??;

        Ok(tls::peer_cert_days_left(&tls_stream))
    }
}
