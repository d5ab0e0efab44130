use std::fmt;

/// The stage of a probe that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeStage {
    /// The URL could not be parsed (configuration error).
    Parse,
    /// DNS resolution failed.
    Resolve,
    /// The TCP connection could not be established.
    Connect,
    /// The TLS handshake did not complete, certificate checks disabled.
    Handshake,
    /// The TLS handshake completed but the peer certificate did not validate.
    Validate,
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProbeStage::Parse => "parse",
            ProbeStage::Resolve => "resolve",
            ProbeStage::Connect => "connect",
            ProbeStage::Handshake => "handshake",
            ProbeStage::Validate => "validate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Failed(ProbeStage),
    /// The probe task itself died before reporting.
    Aborted,
}

/// Ordered status report for a single endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub lines: Vec<String>,
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    pub fn is_reachable(&self) -> bool {
        self.outcome == ProbeOutcome::Reachable
    }

    pub fn failed_stage(&self) -> Option<ProbeStage> {
        match self.outcome {
            ProbeOutcome::Failed(stage) => Some(stage),
            ProbeOutcome::Reachable | ProbeOutcome::Aborted => None,
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Reachable => f.write_str("reachable"),
            ProbeOutcome::Failed(stage) => write!(f, "failed at {stage}"),
            ProbeOutcome::Aborted => f.write_str("aborted"),
        }
    }
}

/// Accumulates status lines while the stages of a probe run.
#[derive(Debug, Default)]
pub(crate) struct StatusLog {
    lines: Vec<String>,
}

impl StatusLog {
    pub(crate) fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub(crate) fn fail(mut self, stage: ProbeStage, line: impl Into<String>) -> ProbeResult {
        self.push(line);
        ProbeResult {
            lines: self.lines,
            outcome: ProbeOutcome::Failed(stage),
        }
    }

    pub(crate) fn succeed(mut self, line: impl Into<String>) -> ProbeResult {
        self.push(line);
        ProbeResult {
            lines: self.lines,
            outcome: ProbeOutcome::Reachable,
        }
    }
}
