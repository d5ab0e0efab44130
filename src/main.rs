use std::process::ExitCode;

use hostwatch::config::{build_resolver, load_config};
use hostwatch::logging::setup_logging;
use hostwatch::probe::error_chain;
use hostwatch::probe::prelude::*;
use hostwatch::report::{render_report, summarize};

/// Probe every configured service and print a per-service report.
/// Probe failures only show up in the report; the exit code is non-zero
/// only when the configuration cannot be loaded.
#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    setup_logging("warn");

    let app = match load_config() {
        Ok(app) => app,
        Err(e) => {
            log::error!("Cannot load configuration: {}", error_chain(&e));
            return ExitCode::FAILURE;
        }
    };

    let resolver = match build_resolver(&app) {
        Ok(resolver) => resolver,
        Err(e) => {
            log::error!("Cannot set up DNS resolution: {}", error_chain(&e));
            return ExitCode::FAILURE;
        }
    };

    let prober = Prober::new(resolver, app.probe_settings());
    let results = prober.probe_all(&app.directory()).await;

    print!("{}", render_report(&results));
    log::info!("{}", summarize(&results));

    ExitCode::SUCCESS
}
