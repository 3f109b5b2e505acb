//! Device-transport collaborator interface (spec §6): the four operations
//! a shell-invocation adapter around a platform debug tool would provide.
//! No implementation ships here; the core only declares the seam.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// One connected device, as reported by the transport adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    pub serial: String,
    pub display_name: String,
}

/// Out-of-scope collaborator: lists devices, checks reachability, lists a
/// package's on-device archive paths, and pulls one to local disk. The core
/// never constructs an implementation of this trait itself.
pub trait DeviceTransport {
    fn list_devices(&self) -> Result<Vec<DeviceHandle>>;
    fn is_reachable(&self, device: &DeviceHandle) -> Result<bool>;
    fn package_archive_paths(&self, device: &DeviceHandle, package_name: &str) -> Result<Vec<String>>;
    fn pull(&self, device: &DeviceHandle, remote_path: &str, local_path: &Path) -> Result<PathBuf>;
}
