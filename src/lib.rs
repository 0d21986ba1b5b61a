//! CapiscIO CLI - distribution shim for the capiscio-core binary
//!
//! Locates, downloads, caches, and executes the separately released
//! platform-specific core binary, forwarding arguments and exit codes
//! untouched.

pub mod cache;
pub mod download;
pub mod error;
pub mod launcher;
pub mod platform;
pub mod router;

pub use error::{CapiscioError, CapiscioResult};
