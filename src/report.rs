use std::collections::BTreeMap;
use std::fmt::Write;

use crate::probe::prelude::*;

/// Render probe results the way the diagnostic CLI prints them: per service,
/// the name, an underline, every status line and a blank line.
pub fn render_report(results: &BTreeMap<String, ProbeResult>) -> String {
    let mut out = String::new();
    for (service, result) in results {
        let _ = writeln!(out, "{service}");
        let _ = writeln!(out, "{}", "-".repeat(service.chars().count()));
        for line in &result.lines {
            let _ = writeln!(out, "{line}");
        }
        out.push('\n');
    }
    out
}

/// One-line summary for the log: how many services were reachable.
pub fn summarize(results: &BTreeMap<String, ProbeResult>) -> String {
    let reachable = results.values().filter(|r| r.is_reachable()).count();
    let failed: Vec<String> = results
        .iter()
        .filter(|(_, r)| !r.is_reachable())
        .map(|(name, r)| format!("{name} ({})", r.outcome))
        .collect();

    if failed.is_empty() {
        format!("{reachable}/{} services reachable", results.len())
    } else {
        format!(
            "{reachable}/{} services reachable, failing: {}",
            results.len(),
            failed.join(", ")
        )
    }
}
