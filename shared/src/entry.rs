//! In-memory representation of one boot, driver, or sysprep entry.

use std::fmt;
use std::str::FromStr;

use crate::devicepath::DevicePath;
use crate::error::{Error, Result};
use crate::loadopt::{LoadOption, ATTR_ACTIVE};

/// The three classes of load option the firmware understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionClass {
    Boot,
    Driver,
    SysPrep,
}

impl OptionClass {
    /// Variable-name prefix for entries of this class.
    pub fn prefix(&self) -> &'static str {
        match self {
            OptionClass::Boot => "Boot",
            OptionClass::Driver => "Driver",
            OptionClass::SysPrep => "SysPrep",
        }
    }

    /// Name of the ordering variable for this class.
    pub fn order_variable(&self) -> &'static str {
        match self {
            OptionClass::Boot => "BootOrder",
            OptionClass::Driver => "DriverOrder",
            OptionClass::SysPrep => "SysPrepOrder",
        }
    }

    /// Variable name of the entry with the given index.
    pub fn variable_name(&self, index: u16) -> String {
        format!("{}{index:04X}", self.prefix())
    }
}

impl FromStr for OptionClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "boot" => Ok(OptionClass::Boot),
            "driver" => Ok(OptionClass::Driver),
            "sysprep" => Ok(OptionClass::SysPrep),
            other => Err(Error::Invalid(format!(
                "unknown entry class {other:?}, expected boot, driver or sysprep"
            ))),
        }
    }
}

impl fmt::Display for OptionClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// One load option with its identity.
///
/// An entry exclusively owns its description, paths (each with a cached
/// text rendering), and optional data. `modified` tracks whether the
/// persisted representation is stale; every setter raises it.
#[derive(Debug, Clone)]
pub struct BootEntry {
    class: OptionClass,
    /// `None` is the AUTO sentinel: an index is allocated at save time.
    index: Option<u16>,
    attributes: u32,
    description: String,
    paths: Vec<DevicePath>,
    optional_data: Vec<u8>,
    modified: bool,
}

impl BootEntry {
    /// A fresh entry: active, described as "Unknown", carrying the
    /// placeholder End-only path, index to be allocated at save time.
    pub fn new(class: OptionClass) -> Self {
        Self {
            class,
            index: None,
            attributes: ATTR_ACTIVE,
            description: String::from("Unknown"),
            paths: vec![DevicePath::end_only()],
            optional_data: Vec::new(),
            modified: true,
        }
    }

    /// Rehydrate an entry from its decoded load option. Used on load; the
    /// entry starts clean.
    pub fn from_load_option(class: OptionClass, index: u16, option: LoadOption) -> Self {
        Self {
            class,
            index: Some(index),
            attributes: option.attributes,
            description: option.description,
            paths: option.paths,
            optional_data: option.optional_data,
            modified: false,
        }
    }

    /// The load-option representation of this entry.
    pub fn to_load_option(&self) -> LoadOption {
        LoadOption {
            attributes: self.attributes,
            description: self.description.clone(),
            paths: self.paths.clone(),
            optional_data: self.optional_data.clone(),
        }
    }

    pub fn class(&self) -> OptionClass {
        self.class
    }

    /// `None` while the index is AUTO.
    pub fn index(&self) -> Option<u16> {
        self.index
    }

    /// `"{prefix}{index:04X}"`, or `None` while the index is AUTO.
    pub fn variable_name(&self) -> Option<String> {
        self.index.map(|i| self.class.variable_name(i))
    }

    pub fn attributes(&self) -> u32 {
        self.attributes
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn paths(&self) -> &[DevicePath] {
        &self.paths
    }

    pub fn path(&self, i: usize) -> Option<&DevicePath> {
        self.paths.get(i)
    }

    /// Canonical text of path `i`, rendered on first call and cached.
    pub fn path_text(&self, i: usize) -> Option<&str> {
        self.paths.get(i).map(DevicePath::text)
    }

    pub fn data(&self) -> &[u8] {
        &self.optional_data
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_class(&mut self, class: OptionClass) {
        self.class = class;
        self.modified = true;
    }

    /// Assign a concrete index, or `None` to return to AUTO.
    pub fn set_index(&mut self, index: Option<u16>) {
        self.index = index;
        self.modified = true;
    }

    pub fn set_attributes(&mut self, attributes: u32) {
        self.attributes = attributes;
        self.modified = true;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.modified = true;
    }

    /// Replace the whole path list. The list must not be empty.
    pub fn set_paths(&mut self, paths: Vec<DevicePath>) -> Result<()> {
        if paths.is_empty() {
            return Err(Error::invalid("an entry needs at least one device path"));
        }
        self.paths = paths;
        self.modified = true;
        Ok(())
    }

    /// Replace path `i`, dropping its cached text with it.
    pub fn set_path(&mut self, i: usize, path: DevicePath) -> Result<()> {
        let slot = self
            .paths
            .get_mut(i)
            .ok_or_else(|| Error::Invalid(format!("no device path at position {i}")))?;
        *slot = path;
        self.modified = true;
        Ok(())
    }

    /// Replace the whole path list from textual forms.
    pub fn set_paths_text(&mut self, texts: &[&str]) -> Result<()> {
        let paths = texts
            .iter()
            .map(|t| DevicePath::from_text(t, false))
            .collect::<Result<Vec<_>>>()?;
        self.set_paths(paths)
    }

    pub fn set_path_text(&mut self, i: usize, text: &str) -> Result<()> {
        self.set_path(i, DevicePath::from_text(text, false)?)
    }

    pub fn set_data(&mut self, data: impl Into<Vec<u8>>) {
        self.optional_data = data.into();
        self.modified = true;
    }

    pub fn clear_data(&mut self) {
        self.optional_data.clear();
        self.modified = true;
    }

    /// Lower the dirty flag after a successful persist.
    pub(crate) fn mark_clean(&mut self) {
        self.modified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entries_carry_documented_defaults() {
        let entry = BootEntry::new(OptionClass::Boot);
        assert_eq!(entry.attributes(), ATTR_ACTIVE);
        assert_eq!(entry.description(), "Unknown");
        assert_eq!(entry.index(), None);
        assert_eq!(entry.variable_name(), None);
        assert_eq!(entry.paths().len(), 1);
        assert!(entry.paths()[0].is_end_only());
        assert!(entry.is_modified());
    }

    #[test]
    fn variable_names_are_uppercase_hex() {
        let mut entry = BootEntry::new(OptionClass::Boot);
        entry.set_index(Some(0x0ABC));
        assert_eq!(entry.variable_name().unwrap(), "Boot0ABC");

        entry.set_class(OptionClass::SysPrep);
        assert_eq!(entry.variable_name().unwrap(), "SysPrep0ABC");

        entry.set_index(Some(2));
        assert_eq!(entry.variable_name().unwrap(), "SysPrep0002");

        entry.set_index(None);
        assert_eq!(entry.variable_name(), None);
    }

    #[test]
    fn setters_raise_the_dirty_flag() {
        let option = LoadOption {
            attributes: ATTR_ACTIVE,
            description: "Fedora".to_string(),
            paths: vec![DevicePath::end_only()],
            optional_data: Vec::new(),
        };
        let mut entry = BootEntry::from_load_option(OptionClass::Boot, 0, option);
        assert!(!entry.is_modified());

        entry.set_description("Fedora 39");
        assert!(entry.is_modified());

        entry.mark_clean();
        entry.set_data(vec![1, 2, 3]);
        assert!(entry.is_modified());
        assert_eq!(entry.data(), &[1, 2, 3]);

        entry.mark_clean();
        entry.clear_data();
        assert!(entry.is_modified());
        assert!(entry.data().is_empty());
    }

    #[test]
    fn path_list_may_never_become_empty() {
        let mut entry = BootEntry::new(OptionClass::Boot);
        assert!(entry.set_paths(Vec::new()).is_err());
        assert!(entry.set_paths_text(&[]).is_err());
        assert_eq!(entry.paths().len(), 1);
    }

    #[test]
    fn paths_from_text_are_cached_per_slot() {
        let mut entry = BootEntry::new(OptionClass::Boot);
        entry
            .set_paths_text(&["PciRoot(0x0)/Pci(0x1,0x1)/Ata(0x0)"])
            .unwrap();
        assert_eq!(
            entry.path_text(0).unwrap(),
            "PciRoot(0x0)/Pci(0x1,0x1)/Ata(Primary,Master,0x0)"
        );
        assert_eq!(entry.path_text(1), None);

        entry.set_path_text(0, r"\EFI\BOOT\BOOTX64.EFI").unwrap();
        assert_eq!(entry.path_text(0).unwrap(), r"\EFI\BOOT\BOOTX64.EFI");
    }

    #[test]
    fn out_of_range_path_replacement_fails() {
        let mut entry = BootEntry::new(OptionClass::Boot);
        assert!(entry.set_path(1, DevicePath::end_only()).is_err());
    }

    #[test]
    fn class_parsing_matches_cli_spelling() {
        assert_eq!("boot".parse::<OptionClass>().unwrap(), OptionClass::Boot);
        assert_eq!("driver".parse::<OptionClass>().unwrap(), OptionClass::Driver);
        assert_eq!(
            "sysprep".parse::<OptionClass>().unwrap(),
            OptionClass::SysPrep
        );
        assert!("BOOT".parse::<OptionClass>().is_err());
    }
}
