//! Access to UEFI firmware variables in the global namespace.
//!
//! All variables this crate touches live under the UEFI global variable
//! GUID. A [`VariableStore`] is the capability the rest of the crate is
//! written against; the concrete backend is picked once, at initialisation,
//! by [`system`].

use crate::error::Result;

#[cfg(target_os = "linux")]
pub mod efivarfs;
pub mod memory;
pub mod stub;
#[cfg(windows)]
pub mod windows;

/// The UEFI global variable namespace GUID, in canonical text form.
pub const GLOBAL_GUID: &str = "8be4df61-93ca-11d2-aa0d-00e098032b8c";

/// EFI_VARIABLE_NON_VOLATILE
pub const ATTR_NON_VOLATILE: u32 = 0x0000_0001;
/// EFI_VARIABLE_BOOTSERVICE_ACCESS
pub const ATTR_BOOTSERVICE_ACCESS: u32 = 0x0000_0002;
/// EFI_VARIABLE_RUNTIME_ACCESS
pub const ATTR_RUNTIME_ACCESS: u32 = 0x0000_0004;

/// Attributes used for every write this crate performs.
pub const DEFAULT_ATTRIBUTES: u32 =
    ATTR_NON_VOLATILE | ATTR_BOOTSERVICE_ACCESS | ATTR_RUNTIME_ACCESS;

/// A key/blob store over the UEFI global variable namespace.
///
/// Implementations report failures through the crate error taxonomy:
/// `NotFound` for absent variables, `PermissionDenied` when the platform
/// refuses access, `Unsupported` when firmware variables are not reachable
/// at all, `Io` for other transport failures.
pub trait VariableStore {
    /// Read the entire value of `name`. Returns the value bytes and the
    /// variable's attribute word.
    fn read(&self, name: &str) -> Result<(Vec<u8>, u32)>;

    /// Create or replace `name` with [`DEFAULT_ATTRIBUTES`].
    fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Remove `name`. Fails with `NotFound` if it does not exist.
    fn delete(&self, name: &str) -> Result<()>;

    /// Whether `name` exists *and is readable*. An existing variable the
    /// caller cannot read reports `false`.
    fn exists(&self, name: &str) -> bool;
}

/// The platform's firmware variable store.
#[cfg(target_os = "linux")]
pub fn system() -> Box<dyn VariableStore> {
    Box::new(efivarfs::EfivarfsStore::new())
}

/// The platform's firmware variable store.
#[cfg(windows)]
pub fn system() -> Box<dyn VariableStore> {
    Box::new(windows::WindowsStore::new())
}

/// The platform's firmware variable store.
#[cfg(not(any(target_os = "linux", windows)))]
pub fn system() -> Box<dyn VariableStore> {
    Box::new(stub::StubStore)
}
