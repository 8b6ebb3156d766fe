//! Collection operations over the entries of one class.
//!
//! The manager keeps no state of its own beyond the store handle. The
//! firmware is process- and machine-wide shared state that can change
//! between any two calls, so nothing (in particular AUTO index probing) is
//! cached across operations.

use crate::entry::{BootEntry, OptionClass};
use crate::error::{Error, Result};
use crate::loadopt::LoadOption;
use crate::varstore::{self, VariableStore};

pub struct BootEntryManager {
    store: Box<dyn VariableStore>,
}

impl BootEntryManager {
    pub fn new(store: Box<dyn VariableStore>) -> Self {
        Self { store }
    }

    /// A manager over the platform's firmware variable store.
    pub fn system() -> Self {
        Self::new(varstore::system())
    }

    /// The index sequence of the class's ordering variable.
    ///
    /// A missing ordering variable is an empty list, not an error; firmware
    /// with no entries of a class simply has no `*Order` variable. Every
    /// other failure propagates.
    pub fn read_order(&self, class: OptionClass) -> Result<Vec<u16>> {
        let raw = match self.store.read(class.order_variable()) {
            Ok((raw, _)) => raw,
            Err(Error::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        if raw.len() % 2 != 0 {
            return Err(Error::Invalid(format!(
                "{} has an odd byte count",
                class.order_variable()
            )));
        }
        Ok(raw
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect())
    }

    /// Rewrite the class's ordering variable. The variable is always
    /// written, never deleted, even for an empty order.
    pub fn write_order(&self, class: OptionClass, order: &[u16]) -> Result<()> {
        let mut raw = Vec::with_capacity(order.len() * 2);
        for index in order {
            raw.extend_from_slice(&index.to_le_bytes());
        }
        self.store.write(class.order_variable(), &raw)
    }

    /// Load the entry with the given index.
    pub fn load(&self, class: OptionClass, index: u16) -> Result<BootEntry> {
        let name = class.variable_name(index);
        let (raw, _) = self.store.read(&name)?;
        let option = LoadOption::decode(&raw)?;
        Ok(BootEntry::from_load_option(class, index, option))
    }

    /// Load every entry of the class, in ordering-variable order.
    ///
    /// Duplicate indices in the order load independently. An index whose
    /// entry variable is missing is a fatal error; the firmware needs
    /// repair, and silently dropping entries would hide that.
    pub fn load_all(&self, class: OptionClass) -> Result<Vec<BootEntry>> {
        let order = self.read_order(class)?;
        let mut entries = Vec::with_capacity(order.len());
        for index in order {
            entries.push(self.load(class, index)?);
        }
        Ok(entries)
    }

    /// Persist one entry if it is modified.
    ///
    /// An AUTO index is resolved here: indices are probed from 0 upward
    /// against the live store and the first free one is adopted. The scan
    /// runs on every save; the store may have changed since the last call.
    pub fn save(&self, entry: &mut BootEntry) -> Result<()> {
        if !entry.is_modified() {
            return Ok(());
        }
        if entry.index().is_none() {
            let index = self.free_index(entry.class())?;
            log::debug!("Assigning index {index:#06X} to {:?}", entry.description());
            entry.set_index(Some(index));
        }
        // The name is present: the index was just assigned above.
        let name = entry.variable_name().expect("entry index was just assigned");
        let record = entry.to_load_option().encode()?;
        self.store.write(&name, &record)?;
        entry.mark_clean();
        Ok(())
    }

    /// Persist a full entry list and rewrite the ordering variable to match
    /// its order.
    ///
    /// Entries of a different class are rejected before anything is
    /// written. A failure mid-way leaves the variables written so far in
    /// place and the ordering variable untouched; firmware offers no
    /// multi-variable transaction to do better.
    pub fn save_all(&self, class: OptionClass, entries: &mut [BootEntry]) -> Result<()> {
        for entry in entries.iter() {
            if entry.class() != class {
                return Err(Error::Invalid(format!(
                    "cannot save a {} entry into the {} order",
                    entry.class(),
                    class
                )));
            }
        }
        for entry in entries.iter_mut() {
            self.save(entry)?;
        }
        let order: Vec<u16> = entries
            .iter()
            .map(|e| e.index().expect("saved entries have indices"))
            .collect();
        self.write_order(class, &order)
    }

    /// Delete the entry's variable. Does not touch the ordering variable.
    pub fn delete(&self, entry: &BootEntry) -> Result<()> {
        let name = entry
            .variable_name()
            .ok_or_else(|| Error::invalid("cannot delete an entry without an index"))?;
        self.store.delete(&name)
    }

    /// Remove the entry with the given index from the managed list: drop it
    /// from the order, persist the remaining entries, then delete its
    /// variable.
    pub fn remove(&self, class: OptionClass, index: u16) -> Result<()> {
        let mut entries = self.load_all(class)?;
        let position = entries
            .iter()
            .position(|e| e.index() == Some(index))
            .ok_or_else(|| Error::NotFound(class.variable_name(index)))?;
        let removed = entries.remove(position);
        self.save_all(class, &mut entries)?;
        self.delete(&removed)
    }

    /// First index of the class not present in the store.
    fn free_index(&self, class: OptionClass) -> Result<u16> {
        for index in 0..=u16::MAX {
            if !self.store.exists(&class.variable_name(index)) {
                return Ok(index);
            }
        }
        Err(Error::NoSpace)
    }
}
