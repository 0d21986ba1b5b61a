//! Platform and architecture detection for release artifacts
//!
//! Maps the compile-time target onto the platform/arch naming used by
//! capiscio-core release artifacts.

use crate::error::{CapiscioError, CapiscioResult};
use std::fmt;

/// Operating systems with published core builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOS,
    Windows,
}

/// CPU architectures with published core builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    Arm64,
}

/// A (platform, architecture) pair identifying one release artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub platform: Platform,
    pub arch: Arch,
}

impl Platform {
    /// Platform component of the release artifact name
    pub fn release_name(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOS => "darwin",
            Self::Windows => "win32",
        }
    }
}

impl Arch {
    /// Architecture component of the release artifact name
    pub fn release_name(&self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
        }
    }
}

impl Target {
    /// Detect the current target from compile-time constants.
    ///
    /// Combinations without a published core build are an error distinct
    /// from any network failure.
    pub fn detect() -> CapiscioResult<Self> {
        Self::from_os_arch(std::env::consts::OS, std::env::consts::ARCH)
    }

    fn from_os_arch(os: &str, arch: &str) -> CapiscioResult<Self> {
        let platform = match os {
            "linux" => Platform::Linux,
            "macos" => Platform::MacOS,
            "windows" => Platform::Windows,
            _ => {
                return Err(CapiscioError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                })
            }
        };

        let arch = match arch {
            "x86_64" => Arch::X64,
            "aarch64" => Arch::Arm64,
            _ => {
                return Err(CapiscioError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                })
            }
        };

        Ok(Self { platform, arch })
    }

    /// File name of the release artifact for this target
    pub fn artifact_name(&self) -> String {
        let ext = match self.platform {
            Platform::Windows => ".exe",
            _ => "",
        };
        format!(
            "capiscio-core-{}-{}{}",
            self.platform.release_name(),
            self.arch.release_name(),
            ext
        )
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.platform.release_name(),
            self.arch.release_name()
        )
    }
}
