//! The EFI_LOAD_OPTION record format.
//!
//! Layout: `u32 Attributes | u16 FilePathListLength | UCS-2LE Description
//! NUL | FilePathListLength bytes of concatenated device-path chains |
//! optional data`. All integers little-endian.

use crate::devicepath::DevicePath;
use crate::error::{Error, Result};
use crate::ucs2;

/// LOAD_OPTION_ACTIVE
pub const ATTR_ACTIVE: u32 = 0x0000_0001;
/// LOAD_OPTION_FORCE_RECONNECT
pub const ATTR_FORCE_RECONNECT: u32 = 0x0000_0002;
/// LOAD_OPTION_HIDDEN
pub const ATTR_HIDDEN: u32 = 0x0000_0008;

/// Byte size of the fixed header (attributes + file path list length).
const HEADER_LEN: usize = 6;

/// A decoded EFI_LOAD_OPTION.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOption {
    pub attributes: u32,
    pub description: String,
    pub paths: Vec<DevicePath>,
    pub optional_data: Vec<u8>,
}

impl LoadOption {
    /// Decode a raw record.
    pub fn decode(record: &[u8]) -> Result<Self> {
        if record.len() < HEADER_LEN {
            return Err(Error::Invalid(format!(
                "load option record is {} bytes, need at least {HEADER_LEN}",
                record.len()
            )));
        }
        let attributes = u32::from_le_bytes([record[0], record[1], record[2], record[3]]);
        let path_list_len = u16::from_le_bytes([record[4], record[5]]) as usize;

        let rest = &record[HEADER_LEN..];
        let nul = ucs2::find_nul(rest)
            .ok_or_else(|| Error::invalid("load option description is not NUL-terminated"))?;
        let description = ucs2::decode(&rest[..nul])?;

        let after_description = &rest[nul + 2..];
        if path_list_len > after_description.len() {
            return Err(Error::invalid("file path list overruns the load option record"));
        }

        let mut region = &after_description[..path_list_len];
        let mut paths = Vec::new();
        while !region.is_empty() {
            let (path, consumed) = DevicePath::parse_prefix(region)?;
            paths.push(path);
            region = &region[consumed..];
        }
        if paths.is_empty() {
            return Err(Error::invalid("load option has an empty file path list"));
        }

        Ok(Self {
            attributes,
            description,
            paths,
            optional_data: after_description[path_list_len..].to_vec(),
        })
    }

    /// Encode into the wire representation. The dual of [`decode`]:
    /// `encode(decode(r)) == r` for every valid record.
    ///
    /// [`decode`]: LoadOption::decode
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.paths.is_empty() {
            return Err(Error::invalid("load option needs at least one device path"));
        }
        let path_list_len: usize = self.paths.iter().map(DevicePath::byte_len).sum();
        let path_list_len = u16::try_from(path_list_len)
            .map_err(|_| Error::invalid("file path list exceeds 65535 bytes"))?;

        let description = ucs2::encode_with_nul(&self.description)?;

        let mut record =
            Vec::with_capacity(HEADER_LEN + description.len() + path_list_len as usize);
        record.extend_from_slice(&self.attributes.to_le_bytes());
        record.extend_from_slice(&path_list_len.to_le_bytes());
        record.extend_from_slice(&description);
        for path in &self.paths {
            record.extend_from_slice(path.as_bytes());
        }
        record.extend_from_slice(&self.optional_data);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `Boot0000` of a stock Fedora installation.
    const FEDORA: &[u8] = &[
        0x01, 0x00, 0x00, 0x00, 0x62, 0x00, 0x46, 0x00, 0x65, 0x00, 0x64, 0x00, 0x6F, 0x00, 0x72,
        0x00, 0x61, 0x00, 0x00, 0x00, 0x04, 0x01, 0x2A, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x08,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x12, 0x00, 0x00, 0x00, 0x00, 0x00, 0x09,
        0x79, 0xF5, 0xC8, 0x89, 0xD5, 0xA1, 0x41, 0x99, 0x58, 0x44, 0xC7, 0xF2, 0x29, 0xE1, 0x50,
        0x02, 0x02, 0x04, 0x04, 0x34, 0x00, 0x5C, 0x00, 0x45, 0x00, 0x46, 0x00, 0x49, 0x00, 0x5C,
        0x00, 0x66, 0x00, 0x65, 0x00, 0x64, 0x00, 0x6F, 0x00, 0x72, 0x00, 0x61, 0x00, 0x5C, 0x00,
        0x73, 0x00, 0x68, 0x00, 0x69, 0x00, 0x6D, 0x00, 0x78, 0x00, 0x36, 0x00, 0x34, 0x00, 0x2E,
        0x00, 0x65, 0x00, 0x66, 0x00, 0x69, 0x00, 0x00, 0x00, 0x7F, 0xFF, 0x04, 0x00,
    ];

    #[test]
    fn decodes_the_fedora_record() {
        let option = LoadOption::decode(FEDORA).unwrap();
        assert_eq!(option.attributes, 0x0000_0001);
        assert_eq!(option.description, "Fedora");
        assert_eq!(option.paths.len(), 1);
        assert_eq!(
            option.paths[0].text(),
            r"HD(1,GPT,C8F57909-D589-41A1-9958-44C7F229E150,0x800,0x12C000)/\EFI\fedora\shimx64.efi"
        );
        assert!(option.optional_data.is_empty());
    }

    #[test]
    fn reencodes_bit_exactly() {
        let option = LoadOption::decode(FEDORA).unwrap();
        assert_eq!(option.encode().unwrap(), FEDORA);
    }

    #[test]
    fn rejects_records_below_the_header_size() {
        assert!(LoadOption::decode(&[]).is_err());
        assert!(LoadOption::decode(&FEDORA[..5]).is_err());
    }

    #[test]
    fn rejects_unterminated_description() {
        // Cut inside the description, before its NUL pair.
        assert!(matches!(
            LoadOption::decode(&FEDORA[..16]),
            Err(Error::Invalid(_))
        ));
    }

    #[test]
    fn rejects_path_list_length_off_by_one() {
        for delta in [-1i16, 1] {
            let mut record = FEDORA.to_vec();
            let skewed = (u16::from_le_bytes([record[4], record[5]]) as i16 + delta) as u16;
            record[4..6].copy_from_slice(&skewed.to_le_bytes());
            assert!(
                LoadOption::decode(&record).is_err(),
                "FilePathListLength {delta:+} must fail"
            );
        }
    }

    #[test]
    fn rejects_zero_length_path_list() {
        let mut record = FEDORA.to_vec();
        record[4..6].copy_from_slice(&0u16.to_le_bytes());
        assert!(LoadOption::decode(&record).is_err());
    }

    #[test]
    fn rejects_path_list_claiming_the_whole_record() {
        let mut record = FEDORA.to_vec();
        let len = record.len() as u16;
        record[4..6].copy_from_slice(&len.to_le_bytes());
        assert!(LoadOption::decode(&record).is_err());
    }

    #[test]
    fn optional_data_survives_the_round_trip() {
        let mut record = FEDORA.to_vec();
        record.extend_from_slice(b"loader config");
        let option = LoadOption::decode(&record).unwrap();
        assert_eq!(option.optional_data, b"loader config");
        assert_eq!(option.encode().unwrap(), record);

        // Truncating optional data still parses; the path region is intact.
        let truncated = LoadOption::decode(&record[..record.len() - 5]).unwrap();
        assert_eq!(truncated.optional_data, b"loader c");
    }

    #[test]
    fn truncation_into_the_path_region_fails() {
        // The record ends exactly with the path region; removing bytes cuts
        // into it.
        assert!(LoadOption::decode(&FEDORA[..FEDORA.len() - 1]).is_err());
        assert!(LoadOption::decode(&FEDORA[..FEDORA.len() - 4]).is_err());
    }

    #[test]
    fn multiple_chains_in_one_list() {
        let first = DevicePath::from_text("PciRoot(0x0)/Pci(0x1,0x1)", false).unwrap();
        let second = DevicePath::from_text(r"\EFI\BOOT\BOOTX64.EFI", false).unwrap();
        let option = LoadOption {
            attributes: ATTR_ACTIVE,
            description: "Test".to_string(),
            paths: vec![first.clone(), second.clone()],
            optional_data: Vec::new(),
        };
        let decoded = LoadOption::decode(&option.encode().unwrap()).unwrap();
        assert_eq!(decoded.paths, vec![first, second]);
    }
}
