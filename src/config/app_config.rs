use std::env;
use std::net::{AddrParseError, IpAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts},
    error::ResolveError,
};

use super::service_config::FileConfig;
use crate::probe::prelude::*;

const CONFIG_FILE_ENV: &str = "CONFIG_FILE";
const DNS_HOSTS_ENV: &str = "DNS_HOSTS";
const DEFAULT_CONFIG_FILE: &str = "services.yml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in {}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid DNS host {host:?}")]
    DnsHost {
        host: String,
        #[source]
        source: AddrParseError,
    },
    #[error("cannot set up DNS resolver")]
    Resolver(#[from] ResolveError),
}

pub struct AppConfig {
    pub config: FileConfig,
    pub config_path: PathBuf,
    /// Name servers to use instead of the system resolver configuration.
    pub dns_hosts: Option<Vec<String>>,
}

impl AppConfig {
    pub fn directory(&self) -> ServiceDirectory {
        directory_from(&self.config.services)
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        self.config.probe.settings()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.thread_wait_interval_ms)
    }
}

/// Load the application configuration from a YAML file and environment variables.
/// The file is named by the `CONFIG_FILE` environment variable (default `services.yml`);
/// `DNS_HOSTS` optionally lists name servers, comma separated.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let config_file_location =
        env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let dns_hosts = env::var(DNS_HOSTS_ENV).ok();

    load_config_from(Path::new(&config_file_location), dns_hosts.as_deref())
}

pub fn load_config_from(path: &Path, dns_hosts: Option<&str>) -> Result<AppConfig, ConfigError> {
    let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: FileConfig = serde_yaml::from_str(&config_str).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    let dns_hosts = dns_hosts
        .map(|hosts| {
            hosts
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|hosts| !hosts.is_empty());

    log::info!(
        "Loaded {} service(s) from {}",
        config.services.len(),
        path.display()
    );
    if let Some(hosts) = &dns_hosts {
        log::info!("Using DNS hosts: {:?}", hosts);
    }

    Ok(AppConfig {
        config,
        config_path: path.to_path_buf(),
        dns_hosts,
    })
}

/// Build the resolver the prober should use: the configured DNS hosts when
/// present, the system configuration otherwise.
pub fn build_resolver(app: &AppConfig) -> Result<TokioAsyncResolver, ConfigError> {
    match &app.dns_hosts {
        Some(hosts) => setup_resolver(hosts, app.probe_settings().resolve_timeout),
        None => Ok(TokioAsyncResolver::tokio_from_system_conf()?),
    }
}

/// Setup a DNS resolver using the provided DNS hosts.
/// Queries go over TCP with 2 attempts and a cache of 1024 entries; each
/// attempt gets half of the stage timeout so both fit inside it.
pub fn setup_resolver(dns_hosts: &[String], stage_timeout: Duration) -> Result<TokioAsyncResolver, ConfigError> {
    let mut opts = ResolverOpts::default();
    opts.attempts = 2;
    opts.timeout = stage_timeout / 2;
    opts.cache_size = 1024;

    let mut name_servers = NameServerConfigGroup::new();

    for host in dns_hosts {
        let ip: IpAddr = host.parse().map_err(|source| ConfigError::DnsHost {
            host: host.clone(),
            source,
        })?;
        name_servers.push(NameServerConfig {
            socket_addr: (ip, 53).into(),
            protocol: Protocol::Tcp,
            tls_dns_name: None,
            trust_negative_responses: false,
            bind_addr: None,
        });
    }

    let resolver_config = ResolverConfig::from_parts(None, vec![], name_servers);
    Ok(TokioAsyncResolver::tokio(resolver_config, opts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, contents: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("hostwatch-{}-{name}.yml", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = load_config_from(Path::new("/nonexistent/hostwatch.yml"), None)
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert_eq!(err.to_string(), "failed to read /nonexistent/hostwatch.yml");
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let path = write_config("invalid", "services: [not, a, map");
        let err = load_config_from(&path, None).err().unwrap();
        assert!(matches!(err, ConfigError::Yaml { .. }));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn dns_hosts_are_split_and_trimmed() {
        let path = write_config(
            "dns",
            "services:\n  api:\n    url: http://api.internal:8080/\n",
        );
        let app = load_config_from(&path, Some(" 1.1.1.1, 8.8.8.8 ,")).unwrap();
        assert_eq!(
            app.dns_hosts,
            Some(vec!["1.1.1.1".to_string(), "8.8.8.8".to_string()])
        );
        assert_eq!(app.directory()["api"].url, "http://api.internal:8080/");
        assert_eq!(app.poll_interval(), Duration::from_secs(1));

        let app = load_config_from(&path, Some("  ")).unwrap();
        assert_eq!(app.dns_hosts, None);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn bad_dns_host_is_rejected() {
        let err = setup_resolver(&["not-an-ip".to_string()], Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::DnsHost { .. }));
    }
}
