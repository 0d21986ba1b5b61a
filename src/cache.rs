//! Cache directory layout and maintenance
//!
//! The cache is a content store keyed by (version, platform, arch). Entries
//! are installed by atomic rename and never mutated in place; a fully
//! written entry is reused by every later invocation.

use crate::error::{CapiscioError, CapiscioResult};
use crate::platform::Target;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment override for the cache root, used by tests and CI
pub const CACHE_DIR_ENV: &str = "CAPISCIO_CACHE_DIR";

/// Resolve the cache root: `CAPISCIO_CACHE_DIR` if set, otherwise the
/// platform-conventional user cache location under the `capiscio` namespace.
pub fn cache_root() -> CapiscioResult<PathBuf> {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    dirs::cache_dir()
        .map(|d| d.join("capiscio"))
        .ok_or(CapiscioError::CacheDirUnavailable)
}

/// Expected on-disk path of the core binary for (version, target)
pub fn entry_path(root: &Path, version: &str, target: &Target) -> PathBuf {
    root.join(format!("v{version}")).join(target.artifact_name())
}

/// Whether a cache entry is usable: a regular file with the executable bit
/// set (existence alone on non-Unix).
pub fn entry_is_valid(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Outcome of `--wrapper-clean`
#[derive(Debug)]
pub enum CleanOutcome {
    /// The cache existed and was removed
    Removed(PathBuf),
    /// There was nothing to remove
    Absent(PathBuf),
}

/// Remove the entire cache tree. An absent cache is informational, not an
/// error; removal failures surface the underlying IO error.
pub async fn clean() -> CapiscioResult<CleanOutcome> {
    clean_at(cache_root()?).await
}

async fn clean_at(root: PathBuf) -> CapiscioResult<CleanOutcome> {
    if !root.exists() {
        debug!("Cache directory absent: {}", root.display());
        return Ok(CleanOutcome::Absent(root));
    }

    tokio::fs::remove_dir_all(&root)
        .await
        .map_err(|e| CapiscioError::CacheClean {
            path: root.clone(),
            source: e,
        })?;

    debug!("Removed cache directory: {}", root.display());
    Ok(CleanOutcome::Removed(root))
}
