//! Core binary resolution and child process delegation
//!
//! Resolves a cached (or freshly downloaded) capiscio-core binary, spawns
//! it with the forwarded arguments and full stdio inheritance, and maps the
//! child's exit status onto the wrapper's own exit code.

use crate::cache;
use crate::download;
use crate::error::{CapiscioError, CapiscioResult};
use crate::platform::Target;
use console::style;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Version of capiscio-core this wrapper release is pinned to.
/// Kept in lockstep with the wrapper's own package version.
pub const CORE_VERSION: &str = "2.2.0";

/// Resolve the core binary for the current platform, downloading it into
/// the cache on first use. A valid cache entry short-circuits without any
/// network access.
pub async fn ensure_core() -> CapiscioResult<PathBuf> {
    let target = Target::detect()?;
    let root = cache::cache_root()?;
    let dest = cache::entry_path(&root, CORE_VERSION, &target);

    if cache::entry_is_valid(&dest) {
        debug!("Cache hit: {}", dest.display());
        return Ok(dest);
    }

    debug!("Cache miss: {}", dest.display());
    eprintln!(
        "{} capiscio-core v{} for {}...",
        style("Downloading").cyan().bold(),
        CORE_VERSION,
        target
    );

    let install_dest = dest.clone();
    tokio::task::spawn_blocking(move || download::install(CORE_VERSION, &target, &install_dest))
        .await
        .map_err(|e| CapiscioError::io("joining download task", std::io::Error::other(e)))??;

    Ok(dest)
}

/// Spawn the core binary with `args` unchanged and stdio fully inherited,
/// wait for it, and return the exit code to propagate.
pub async fn run_core(args: &[String]) -> CapiscioResult<i32> {
    let binary = ensure_core().await?;

    let mut child = Command::new(&binary)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| CapiscioError::Spawn {
            path: binary.clone(),
            source: e,
        })?;

    // On interrupt, relay the signal to the child and keep waiting so it
    // is reaped and its resulting status propagated, never orphaned.
    let status = loop {
        tokio::select! {
            status = child.wait() => {
                break status.map_err(|e| CapiscioError::io("waiting for capiscio-core", e))?;
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupt received; forwarding to capiscio-core");
                forward_interrupt(&mut child);
            }
        }
    };

    Ok(exit_code(status))
}

/// Relay an interrupt to the child. A terminal Ctrl-C already reaches the
/// child through the foreground process group, but a SIGINT addressed to
/// the wrapper alone (kill -INT, CI job cancellation) must be forwarded or
/// the child would never see it.
#[cfg(unix)]
fn forward_interrupt(child: &mut tokio::process::Child) {
    if let Some(pid) = child.id() {
        // SAFETY: kill(2) with the live child's pid and a valid signal
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGINT);
        }
    }
}

#[cfg(not(unix))]
fn forward_interrupt(child: &mut tokio::process::Child) {
    // No SIGINT equivalent to relay; terminate the child so the wrapper
    // can still exit.
    let _ = child.start_kill();
}

/// Map a child exit status onto the wrapper's exit code. Signal-terminated
/// children use the conventional `128 + signo` sentinel.
fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
