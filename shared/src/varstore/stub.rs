//! Fallback backend for platforms without firmware variable access.

use crate::error::{Error, Result};
use crate::varstore::VariableStore;

/// A store on which every operation fails with `Unsupported`.
pub struct StubStore;

impl VariableStore for StubStore {
    fn read(&self, _name: &str) -> Result<(Vec<u8>, u32)> {
        Err(Error::Unsupported("no firmware variable access on this platform"))
    }

    fn write(&self, _name: &str, _data: &[u8]) -> Result<()> {
        Err(Error::Unsupported("no firmware variable access on this platform"))
    }

    fn delete(&self, _name: &str) -> Result<()> {
        Err(Error::Unsupported("no firmware variable access on this platform"))
    }

    fn exists(&self, _name: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operation_is_unsupported() {
        let store = StubStore;
        assert!(matches!(store.read("BootOrder"), Err(Error::Unsupported(_))));
        assert!(matches!(store.write("BootOrder", &[]), Err(Error::Unsupported(_))));
        assert!(matches!(store.delete("BootOrder"), Err(Error::Unsupported(_))));
        assert!(!store.exists("BootOrder"));
    }
}
