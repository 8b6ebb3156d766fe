//! In-process backend.
//!
//! Used by the crate's own tests and useful for dry runs. A `BTreeMap`
//! keeps iteration deterministic when debugging.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::varstore::{VariableStore, DEFAULT_ATTRIBUTES};

#[derive(Default)]
pub struct MemoryStore {
    variables: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all stored variables, in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.variables.borrow().keys().cloned().collect()
    }
}

impl VariableStore for MemoryStore {
    fn read(&self, name: &str) -> Result<(Vec<u8>, u32)> {
        self.variables
            .borrow()
            .get(name)
            .map(|data| (data.clone(), DEFAULT_ATTRIBUTES))
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        self.variables
            .borrow_mut()
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.variables
            .borrow_mut()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn exists(&self, name: &str) -> bool {
        self.variables.borrow().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behaves_like_a_store() {
        let store = MemoryStore::new();
        assert!(!store.exists("Boot0000"));

        store.write("Boot0000", &[1, 2, 3]).unwrap();
        assert!(store.exists("Boot0000"));
        assert_eq!(store.read("Boot0000").unwrap().0, vec![1, 2, 3]);

        store.delete("Boot0000").unwrap();
        assert!(matches!(store.read("Boot0000"), Err(Error::NotFound(_))));
    }
}
