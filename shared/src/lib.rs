//! Inspection and mutation of UEFI boot configuration in NVRAM.
//!
//! The crate is built around two cores: a device-path codec
//! ([`devicepath`]) converting between the packed binary chains firmware
//! stores and the UEFI textual representation, and a boot-entry manager
//! ([`manager`]) maintaining the `Boot####`/`Driver####`/`SysPrep####`
//! variables and their ordering lists through a pluggable variable store
//! ([`varstore`]).
//!
//! Everything is synchronous and single-threaded. The firmware store is
//! machine-wide shared state; callers must not run concurrent writers.

pub mod devicepath;
pub mod entry;
pub mod error;
pub mod loadopt;
pub mod manager;
pub mod ucs2;
pub mod varstore;

pub use devicepath::DevicePath;
pub use entry::{BootEntry, OptionClass};
pub use error::{Error, Result};
pub use loadopt::LoadOption;
pub use manager::BootEntryManager;
