//! Counter service HTTP binary (spec §6): parse flags, construct
//! dependencies, construct the `Counter` facade, serve, handle signals.
//! Bring-up follows the teacher's `main.rs` shape (flags → open deps →
//! build session/facade → dispatch) collapsed from a REPL dispatch into
//! an `axum::serve` loop, with the exit-code contract (0/1/2/130) owned
//! entirely by this crate — the core crates never call
//! `std::process::exit`.

mod config;
mod error;
mod http;

use clap::Parser;
use config::CliArgs;
use counter_core::testing::{FakeAtomicStore, FakeDurableStore};
use counter_core::Counter;
use std::process::ExitCode;
use tracing::{error, info};

const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_BRINGUP_FAILED: u8 = 2;
const EXIT_SIGNAL_TERMINATED: u8 = 130;

enum Shutdown {
    Clean,
    ServerError,
    Signal,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = CliArgs::parse();
    let resolved = match args.resolve() {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "configuration error");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    info!(
        listen = %resolved.listen,
        atomic_addr = %resolved.atomic_addr,
        durable_dsn = %resolved.durable_dsn,
        "bringing up dependencies"
    );

    // Real Redis/Postgres clients are an explicit non-goal (spec §7);
    // the fast and durable tiers backing this binary are the in-memory
    // fakes counter-core ships for exercising degradation without a
    // live dependency (see DESIGN.md). `atomic_addr`/`durable_dsn` are
    // still accepted and logged so the bring-up sequence reads the same
    // as it would against a real one.
    let bring_up = async { Counter::new(FakeAtomicStore::new(), FakeDurableStore::new(), resolved.counter.clone()) };

    let counter = match tokio::time::timeout(resolved.boot_timeout, bring_up).await {
        Ok(counter) => counter,
        Err(_) => {
            error!(timeout = ?resolved.boot_timeout, "dependency bring-up exceeded boot timeout");
            return ExitCode::from(EXIT_BRINGUP_FAILED);
        }
    };

    let app = http::router(http::AppState {
        counter: counter.clone(),
        reset_token: resolved.reset_token,
    });

    let listener = match tokio::net::TcpListener::bind(resolved.listen).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, addr = %resolved.listen, "failed to bind listener");
            return ExitCode::from(EXIT_BRINGUP_FAILED);
        }
    };

    info!(addr = %resolved.listen, "serving counter HTTP surface");

    let outcome = tokio::select! {
        result = axum::serve(listener, app) => {
            match result {
                Ok(()) => Shutdown::Clean,
                Err(e) => {
                    error!(error = %e, "server exited with error");
                    Shutdown::ServerError
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
            Shutdown::Signal
        }
    };

    counter.shutdown().await;

    match outcome {
        Shutdown::Clean => ExitCode::SUCCESS,
        Shutdown::ServerError => ExitCode::from(EXIT_BRINGUP_FAILED),
        Shutdown::Signal => ExitCode::from(EXIT_SIGNAL_TERMINATED),
    }
}
