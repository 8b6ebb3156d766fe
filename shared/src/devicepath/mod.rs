//! UEFI device paths: packed binary chains and their textual form.
//!
//! A [`DevicePath`] owns the bytes of exactly one chain (a sequence of
//! typed, length-prefixed nodes terminated by End-Entire) and caches its
//! canonical text rendering on first use.

mod node;
mod parse;
mod text;

use std::cell::OnceCell;
use std::fmt;

use crate::error::{Error, Result};

pub struct DevicePath {
    bytes: Vec<u8>,
    text: OnceCell<String>,
}

impl DevicePath {
    /// The placeholder chain consisting of only the End-Entire node.
    ///
    /// Freshly created boot entries carry this until a real path is set.
    pub fn end_only() -> Self {
        let mut bytes = Vec::with_capacity(4);
        node::push_end(&mut bytes);
        Self::from_bytes_unchecked(bytes)
    }

    /// Parse `bytes` as exactly one chain. Trailing bytes after the End
    /// node are rejected.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let length = node::chain_length(bytes, 0, true)?;
        if length != bytes.len() {
            return Err(Error::invalid("trailing bytes after device path terminator"));
        }
        Ok(Self::from_bytes_unchecked(bytes.to_vec()))
    }

    /// Parse the first chain of `bytes`, returning it and the byte count it
    /// consumed. Used to split a load option's file-path list.
    pub(crate) fn parse_prefix(bytes: &[u8]) -> Result<(Self, usize)> {
        let length = node::chain_length(bytes, 0, true)?;
        Ok((Self::from_bytes_unchecked(bytes[..length].to_vec()), length))
    }

    /// Whether a prefix of `bytes`, bounded by `max_len` (0 = unbounded),
    /// forms a well-formed chain with at least one node.
    pub fn validate(bytes: &[u8], max_len: usize) -> bool {
        node::chain_length(bytes, max_len, false).is_ok()
    }

    /// Parse the textual representation.
    ///
    /// A segment with an unrecognised keyword is embedded as a file-path
    /// node, which the UEFI grammar allows but is usually a typo; unless
    /// `allow_implausible` is set, such results are rejected with
    /// [`Error::Implausible`].
    pub fn from_text(input: &str, allow_implausible: bool) -> Result<Self> {
        let bytes = parse::chain_from_text(input)?;
        if !allow_implausible {
            parse::plausibility_check(&bytes)?;
        }
        Ok(Self::from_bytes_unchecked(bytes))
    }

    fn from_bytes_unchecked(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            text: OnceCell::new(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Chain size in bytes, End node included.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_end_only(&self) -> bool {
        self.bytes.len() == 4
    }

    /// Render the chain. `display_only` selects the shorter display forms
    /// of some nodes; `allow_shortcuts` the shortcut names of well-known
    /// vendor nodes.
    pub fn to_text(&self, display_only: bool, allow_shortcuts: bool) -> String {
        text::chain_to_text(&self.bytes, display_only, allow_shortcuts)
    }

    /// The canonical text form, rendered once and cached.
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| self.to_text(false, false))
    }
}

impl Clone for DevicePath {
    fn clone(&self) -> Self {
        Self::from_bytes_unchecked(self.bytes.clone())
    }
}

impl PartialEq for DevicePath {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for DevicePath {}

impl fmt::Debug for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("DevicePath").field(&self.text()).finish()
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.text())
    }
}
