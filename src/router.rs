//! Reserved wrapper flags, intercepted before delegation
//!
//! Only the first argument is ever inspected. Everything else, including
//! `--help`, `--version`, and core subcommands, is opaque to the wrapper
//! and forwarded to capiscio-core untouched.

use crate::cache::{self, CleanOutcome};
use crate::error::CapiscioResult;
use console::style;

/// The closed set of wrapper-only flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedFlag {
    /// `--wrapper-clean`: remove the binary cache
    Clean,
    /// `--wrapper-version`: print the wrapper's own version
    Version,
}

impl ReservedFlag {
    /// Match the first argument against the reserved flags. Anything else,
    /// including an empty argument list, belongs to the core binary.
    pub fn from_args(args: &[String]) -> Option<Self> {
        match args.first().map(String::as_str) {
            Some("--wrapper-clean") => Some(Self::Clean),
            Some("--wrapper-version") => Some(Self::Version),
            _ => None,
        }
    }
}

/// Handle `--wrapper-clean`. An absent cache directory is informational,
/// not an error; a removal failure propagates.
pub async fn handle_clean() -> CapiscioResult<()> {
    match cache::clean().await? {
        CleanOutcome::Removed(path) => {
            println!(
                "{} {}",
                style("Cleaned cache directory:").green(),
                path.display()
            );
        }
        CleanOutcome::Absent(_) => {
            println!("{}", style("Cache directory does not exist.").yellow());
        }
    }
    Ok(())
}

/// Handle `--wrapper-version`: print the version declared in the build
/// metadata, or an explicit fallback when it is absent. Never fails.
pub fn handle_version() {
    match option_env!("CARGO_PKG_VERSION") {
        Some(version) => println!("capiscio wrapper v{version}"),
        None => println!("capiscio wrapper (unknown version)"),
    }
}
