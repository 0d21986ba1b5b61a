//! CapiscIO CLI entry point
//!
//! Intercepts the two wrapper-reserved flags, otherwise resolves a cached
//! or freshly downloaded capiscio-core binary and delegates to it.

use capiscio::launcher;
use capiscio::router::{self, ReservedFlag};
use capiscio::CapiscioError;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Every CLI argument belongs to the core binary, so wrapper verbosity
    // comes from the environment rather than a flag. Logs go to stderr;
    // stdout is the core's.
    let filter = EnvFilter::try_from_env("CAPISCIO_LOG")
        .unwrap_or_else(|_| EnvFilter::new("capiscio=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match ReservedFlag::from_args(&args) {
        Some(ReservedFlag::Clean) => match router::handle_clean().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                report(&e);
                ExitCode::FAILURE
            }
        },
        Some(ReservedFlag::Version) => {
            router::handle_version();
            ExitCode::SUCCESS
        }
        None => match launcher::run_core(&args).await {
            Ok(code) => propagate(code),
            Err(e) => {
                report(&e);
                ExitCode::FAILURE
            }
        },
    }
}

fn report(e: &CapiscioError) {
    eprintln!("{} {}", style("Error:").red().bold(), e);
    if let Some(hint) = e.hint() {
        eprintln!("{} {}", style("Hint:").yellow(), hint);
    }
}

/// The child's exit code becomes the wrapper's. `ExitCode` is a u8 on every
/// supported platform; anything out of range collapses to a plain failure.
fn propagate(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
