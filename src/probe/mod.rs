pub mod endpoint;
pub mod probe;
pub mod result;
pub mod tls;

pub mod prelude {
    pub use super::endpoint::{
        DescribeEndpoint, EndpointDescriptor, ServiceDirectory, Target, TlsBundle, directory_from,
    };
    pub use super::probe::{ProbeSettings, Prober};
    pub use super::result::{ProbeOutcome, ProbeResult, ProbeStage};
}

use std::fmt::Write;
use std::path::PathBuf;
use std::time::Duration;

use trust_dns_resolver::error::ResolveError;

/// Everything that can go wrong inside a single probe stage.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("no addresses found for {0}")]
    NoAddress(String),
    #[error("cannot read {}", path.display())]
    Credential {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid PEM data in {}: {message}", path.display())]
    Pem { path: PathBuf, message: String },
    #[error("client key {} given without a client certificate", .0.display())]
    KeyWithoutCert(PathBuf),
    #[error("no private key found in {}", .0.display())]
    MissingKey(PathBuf),
    #[error("cannot use {format} from {}: {message}", path.display())]
    Key {
        path: PathBuf,
        format: String,
        message: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Tls(#[from] native_tls::Error),
}

/// Flatten an error and its sources into a single status-line fragment.
/// Sources whose text already shows up in the line are skipped; TLS errors
/// tend to repeat the message of the error they wrap.
pub fn error_chain(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let text = src.to_string();
        if !s.contains(&text) {
            let _ = write!(s, ": {}", text);
        }
        err = src;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_walks_the_source_chain() {
        let err = StageError::Credential {
            path: PathBuf::from("/etc/ca.pem"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
        };
        assert_eq!(error_chain(&err), "cannot read /etc/ca.pem: No such file");
    }

    #[derive(Debug, thiserror::Error)]
    #[error("handshake failed: {0} (self-signed certificate)")]
    struct Wrapper(#[source] Inner);

    #[derive(Debug, thiserror::Error)]
    #[error("certificate verify failed")]
    struct Inner;

    #[test]
    fn repeated_source_text_is_not_appended_twice() {
        let err = Wrapper(Inner);
        assert_eq!(
            error_chain(&err),
            "handshake failed: certificate verify failed (self-signed certificate)"
        );
    }

    #[test]
    fn timeout_mentions_the_limit() {
        let err = StageError::Timeout(Duration::from_millis(250));
        assert_eq!(error_chain(&err), "timed out after 250ms");
    }
}
