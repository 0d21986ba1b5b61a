//! Release artifact download and atomic install
//!
//! Each invocation downloads to its own temporary file inside the cache
//! root and renames it over the final path, so a concurrent reader never
//! observes a partially written binary. The rename is the only contended
//! step and the filesystem resolves it without locks.

use crate::error::{CapiscioError, CapiscioResult};
use crate::platform::Target;
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Environment override for the release source, used by tests and mirrors
pub const BASE_URL_ENV: &str = "CAPISCIO_BASE_URL";

const DEFAULT_BASE_URL: &str = "https://github.com/capiscio/capiscio-core/releases/download";

/// Fail closed instead of hanging on a stalled fetch
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Resolve the release distribution base URL
pub fn base_url() -> String {
    std::env::var(BASE_URL_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// URL of one release artifact under the distribution source
pub fn artifact_url(base: &str, version: &str, artifact: &str) -> String {
    format!("{}/v{}/{}", base.trim_end_matches('/'), version, artifact)
}

/// Download the core binary for (version, target) and install it at `dest`.
///
/// The body streams to a temp file next to `dest`, is verified (non-empty,
/// plus a best-effort `.sha256` sidecar check), marked executable, and
/// atomically renamed into place. No retries; a transient failure surfaces
/// to the user for re-invocation.
pub fn install(version: &str, target: &Target, dest: &Path) -> CapiscioResult<()> {
    let artifact = target.artifact_name();
    let url = artifact_url(&base_url(), version, &artifact);
    let agent = http_agent();

    let parent = dest.parent().ok_or_else(|| {
        CapiscioError::io(
            "resolving cache entry parent",
            std::io::Error::other("cache entry path has no parent"),
        )
    })?;
    std::fs::create_dir_all(parent)
        .map_err(|e| CapiscioError::io(format!("creating {}", parent.display()), e))?;

    debug!("Fetching {}", url);
    let mut response = match agent.get(&url).call() {
        Ok(r) => r,
        Err(ureq::Error::StatusCode(404)) => {
            return Err(CapiscioError::ArtifactMissing {
                version: version.to_string(),
                target: target.to_string(),
            })
        }
        Err(ureq::Error::StatusCode(code)) => {
            return Err(CapiscioError::Download {
                url,
                reason: format!("server returned HTTP {code}"),
            })
        }
        Err(e) => {
            return Err(CapiscioError::Download {
                url,
                reason: e.to_string(),
            })
        }
    };

    // Same filesystem as the final path, so the rename below is atomic
    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|e| CapiscioError::io(format!("creating temp file in {}", parent.display()), e))?;

    let mut hasher = Sha256::new();
    let mut reader = response.body_mut().as_reader();
    let mut buf = [0u8; 64 * 1024];
    let mut written: u64 = 0;
    loop {
        let n = reader.read(&mut buf).map_err(|e| CapiscioError::Download {
            url: url.clone(),
            reason: format!("connection interrupted: {e}"),
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        tmp.write_all(&buf[..n])
            .map_err(|e| CapiscioError::io(format!("writing {}", tmp.path().display()), e))?;
        written += n as u64;
    }

    if written == 0 {
        return Err(CapiscioError::EmptyArtifact { url });
    }

    let digest = hex::encode(hasher.finalize());
    verify_sidecar_checksum(&agent, &url, &artifact, &digest)?;

    tmp.as_file()
        .sync_all()
        .map_err(|e| CapiscioError::io(format!("flushing {}", tmp.path().display()), e))?;

    mark_executable(tmp.path())?;

    tmp.persist(dest)
        .map_err(|e| CapiscioError::io(format!("installing {}", dest.display()), e.error))?;

    info!("Installed capiscio-core v{} at {}", version, dest.display());
    Ok(())
}

fn http_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(DOWNLOAD_TIMEOUT))
        .build()
        .new_agent()
}

/// Verify the downloaded digest against a published `<artifact>.sha256`
/// sidecar. The upstream release layout does not guarantee the sidecar, so
/// a missing or malformed one is skipped; a present, well-formed mismatch
/// is fatal.
fn verify_sidecar_checksum(
    agent: &ureq::Agent,
    url: &str,
    artifact: &str,
    actual: &str,
) -> CapiscioResult<()> {
    let sidecar_url = format!("{url}.sha256");

    let mut response = match agent.get(&sidecar_url).call() {
        Ok(r) => r,
        Err(e) => {
            debug!("No checksum sidecar at {}: {}", sidecar_url, e);
            return Ok(());
        }
    };

    let body = match response.body_mut().read_to_string() {
        Ok(b) => b,
        Err(e) => {
            debug!("Unreadable checksum sidecar at {}: {}", sidecar_url, e);
            return Ok(());
        }
    };

    let Some(expected) = parse_sidecar_digest(&body) else {
        debug!("Ignoring malformed checksum sidecar at {}", sidecar_url);
        return Ok(());
    };

    if expected != actual {
        return Err(CapiscioError::ChecksumMismatch {
            artifact: artifact.to_string(),
            expected,
            actual: actual.to_string(),
        });
    }

    debug!("Checksum verified for {}", artifact);
    Ok(())
}

/// Extract a SHA-256 digest from sidecar text in the standard sha256sum
/// layout (`<hex>  <file>`). Returns `None` for anything that is not a
/// 64-char hex string.
fn parse_sidecar_digest(body: &str) -> Option<String> {
    let first = body.split_whitespace().next()?.to_ascii_lowercase();
    if first.len() == 64 && first.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(first)
    } else {
        None
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> CapiscioResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| CapiscioError::io(format!("marking {} executable", path.display()), e))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> CapiscioResult<()> {
    Ok(())
}
