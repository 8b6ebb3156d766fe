//! Linux backend, backed by the efivarfs filesystem.
//!
//! efivarfs exposes each variable as a file named `<Name>-<guid>` whose
//! first four bytes are the attribute word and whose remainder is the
//! value. The kernel marks these files immutable so that stray writes do
//! not brick machines with fragile firmware; the flag has to be cleared
//! before a write or delete.

use std::fs;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use nix::{ioctl_read, ioctl_write_ptr, libc};

use crate::error::{Error, Result};
use crate::varstore::{VariableStore, DEFAULT_ATTRIBUTES, GLOBAL_GUID};

/// Where the kernel mounts efivarfs.
pub const DEFAULT_ROOT: &str = "/sys/firmware/efi/efivars";

const FS_IMMUTABLE_FL: libc::c_long = 0x0000_0010;

ioctl_read!(fs_ioc_getflags, b'f', 1, libc::c_long);
ioctl_write_ptr!(fs_ioc_setflags, b'f', 2, libc::c_long);

pub struct EfivarfsStore {
    root: PathBuf,
}

impl EfivarfsStore {
    pub fn new() -> Self {
        Self::with_root(DEFAULT_ROOT)
    }

    /// A store rooted at an arbitrary directory. Integration tests point
    /// this at a tempdir; production callers never need it.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn variable_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}-{GLOBAL_GUID}"))
    }

    fn map_io(name: &str, err: io::Error) -> Error {
        match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound(name.to_string()),
            io::ErrorKind::PermissionDenied => Error::PermissionDenied(name.to_string()),
            _ => Error::Io(err),
        }
    }
}

impl Default for EfivarfsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore for EfivarfsStore {
    fn read(&self, name: &str) -> Result<(Vec<u8>, u32)> {
        let path = self.variable_path(name);
        let raw = fs::read(&path).map_err(|e| Self::map_io(name, e))?;
        if raw.len() < 4 {
            return Err(Error::Invalid(format!(
                "variable {name} is {} bytes, below the efivarfs attribute header",
                raw.len()
            )));
        }
        let attributes = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        Ok((raw[4..].to_vec(), attributes))
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.variable_path(name);
        make_mutable(&path).map_err(|e| Self::map_io(name, e))?;

        let mut raw = Vec::with_capacity(4 + data.len());
        raw.extend_from_slice(&DEFAULT_ATTRIBUTES.to_le_bytes());
        raw.extend_from_slice(data);

        log::debug!("Writing {} bytes to {path:?}", raw.len());
        fs::write(&path, raw).map_err(|e| Self::map_io(name, e))
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.variable_path(name);
        if !path.exists() {
            return Err(Error::NotFound(name.to_string()));
        }
        make_mutable(&path).map_err(|e| Self::map_io(name, e))?;
        log::debug!("Deleting {path:?}");
        fs::remove_file(&path).map_err(|e| Self::map_io(name, e))
    }

    fn exists(&self, name: &str) -> bool {
        // An open probe rather than a metadata probe: a variable that exists
        // but cannot be read must report false.
        fs::File::open(self.variable_path(name)).is_ok()
    }
}

/// Clear the immutable inode flag on `path` if it is set.
///
/// A missing file is fine (nothing to clear). Filesystems without inode
/// flags answer the ioctl with ENOTTY or similar; those are treated as
/// "not immutable" so that test roots on tmpfs work.
fn make_mutable(path: &Path) -> io::Result<()> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let mut flags: libc::c_long = 0;
    match unsafe { fs_ioc_getflags(file.as_raw_fd(), &mut flags) } {
        Ok(_) => {}
        Err(nix::errno::Errno::ENOTTY)
        | Err(nix::errno::Errno::EOPNOTSUPP)
        | Err(nix::errno::Errno::EINVAL) => return Ok(()),
        Err(e) => return Err(io::Error::from_raw_os_error(e as i32)),
    }

    if flags & FS_IMMUTABLE_FL != 0 {
        flags &= !FS_IMMUTABLE_FL;
        unsafe { fs_ioc_setflags(file.as_raw_fd(), &flags) }
            .map_err(|e| io::Error::from_raw_os_error(e as i32))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, EfivarfsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = EfivarfsStore::with_root(dir.path());
        (dir, store)
    }

    #[test]
    fn write_then_read_round_trips() {
        let (_dir, store) = store();
        store.write("Boot0001", &[0xAA, 0xBB]).unwrap();

        let (data, attributes) = store.read("Boot0001").unwrap();
        assert_eq!(data, vec![0xAA, 0xBB]);
        assert_eq!(attributes, DEFAULT_ATTRIBUTES);
    }

    #[test]
    fn value_carries_attribute_header_on_disk() {
        let (dir, store) = store();
        store.write("BootOrder", &[0x01, 0x00]).unwrap();

        let raw = fs::read(dir.path().join(format!("BootOrder-{GLOBAL_GUID}"))).unwrap();
        assert_eq!(raw, vec![0x07, 0x00, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn read_missing_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(store.read("Boot0000"), Err(Error::NotFound(_))));
    }

    #[test]
    fn delete_removes_and_then_reports_not_found() {
        let (_dir, store) = store();
        store.write("Boot0002", &[0x00]).unwrap();
        assert!(store.exists("Boot0002"));

        store.delete("Boot0002").unwrap();
        assert!(!store.exists("Boot0002"));
        assert!(matches!(store.delete("Boot0002"), Err(Error::NotFound(_))));
    }

    #[test]
    fn zero_length_value_is_readable() {
        let (_dir, store) = store();
        store.write("BootOrder", &[]).unwrap();
        let (data, _) = store.read("BootOrder").unwrap();
        assert!(data.is_empty());
    }
}
