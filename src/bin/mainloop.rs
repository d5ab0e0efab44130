use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hostwatch::config::{AppConfig, load_config};
use hostwatch::lifecycle::{self, DEFAULT_PRIORITY, PidFile, relay_interrupts};
use hostwatch::logging::setup_logging;
use hostwatch::probe::error_chain;
use tokio::runtime::Handle;

/// Run the host in the foreground: startup hooks, wait for Ctrl-C, shutdown hooks.
#[derive(Parser, Debug)]
#[command(name = "hostwatch-mainloop")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Absolute path of the file where the process id will be stored
    #[arg(long, env = "HOSTWATCH_PIDFILE")]
    pidfile: Option<PathBuf>,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    setup_logging("info");
    let cli = Cli::parse();

    let app = match load_config() {
        Ok(app) => app,
        Err(e) => {
            log::error!("Cannot load configuration: {}", error_chain(&e));
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Cannot start signal runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    // A pidfile that cannot be written is reported but does not stop the host
    let _pidfile = cli.pidfile.and_then(|path| match PidFile::create(&path) {
        Ok(pidfile) => Some(pidfile),
        Err(e) => {
            log::error!(
                "Unexpected error writing pid ({}) to pidfile ({}): {e}",
                std::process::id(),
                path.display()
            );
            None
        }
    });

    let host = lifecycle::global();
    register_hooks(&app, runtime.handle().clone());

    let outcome = host.run_main_loop(app.poll_interval());
    runtime.shutdown_background();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}

fn register_hooks(app: &AppConfig, signals: Handle) {
    let host = lifecycle::global();

    // Runs right after the built-in hook clears the stop signal, so no
    // interrupt can be wiped by startup.
    let stop = host.stop_signal();
    host.register_startup(1, move || {
        let stop = stop.clone();
        signals.spawn(async move {
            let e = relay_interrupts(stop, tokio::signal::ctrl_c).await;
            log::error!("Cannot listen for interrupts: {e}");
        });
        Ok(())
    });

    let services = app.config.services.len();
    let config_path = app.config_path.clone();
    host.register_startup(DEFAULT_PRIORITY, move || {
        log::info!(
            "Host started with {services} service(s) from {}",
            config_path.display()
        );
        Ok(())
    });
    host.register_shutdown(DEFAULT_PRIORITY, || {
        log::info!("Host stopped");
        log::debug!("Final status:\n{}", lifecycle::global().gather_status());
        Ok(())
    });

    let urls = app
        .directory()
        .into_values()
        .map(|endpoint| format!("{}: {}", endpoint.name, endpoint.url))
        .collect::<Vec<_>>()
        .join("\n");
    host.register_status("configured_services", move || urls.clone());
    host.register_status("lifecycle_state", || {
        format!("{:?}", lifecycle::global().state())
    });
}
