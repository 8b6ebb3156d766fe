//! Rendering of device-path nodes into the UEFI textual representation.
//!
//! Each recognised `(Type, SubType)` pair has one routine here and one
//! parsing routine in [`super::parse`]; the two are kept in matching order
//! so a missing half stands out. Unknown nodes fall through to the generic
//! `Path(type,subtype,hex)` form instead of failing.

use std::fmt::Write;
use std::net::{Ipv4Addr, Ipv6Addr};

use uuid::Uuid;

use crate::devicepath::node::{
    self, u16le, u32le, u64le, RawNode, ACPI_ACPI, BBS_BBS, HW_PCI, HW_VENDOR, MEDIA_CDROM,
    MEDIA_FILE_PATH, MEDIA_FV, MEDIA_FV_FILE, MEDIA_HARD_DRIVE, MEDIA_RELATIVE_OFFSET,
    MEDIA_RAM_DISK, MEDIA_VENDOR, MSG_ATAPI, MSG_IPV4, MSG_IPV6, MSG_LUN, MSG_MAC, MSG_NVME,
    MSG_SATA, MSG_SCSI, MSG_UART, MSG_URI, MSG_USB, MSG_USB_CLASS, MSG_VENDOR, TYPE_ACPI,
    TYPE_BBS, TYPE_HARDWARE, TYPE_MEDIA, TYPE_MESSAGING,
};
use crate::ucs2;

/// Well-known vendor-messaging GUIDs with a shortcut text form.
pub(crate) const VENDOR_PC_ANSI: &str = "E0C14753-F9BE-11D2-9A0C-0090273FC14D";
pub(crate) const VENDOR_VT_100: &str = "DFA66065-B419-11D3-9A2D-0090273FC14D";
pub(crate) const VENDOR_VT_100_PLUS: &str = "7BAEC70B-57E0-4C76-8E87-2F9E28088343";
pub(crate) const VENDOR_VT_UTF8: &str = "AD15A0D6-8BEC-4ACF-A073-D01DE77E2D88";

/// Well-known RAM disk type GUIDs.
pub(crate) const RAM_DISK_VIRTUAL_DISK: &str = "77AB535A-45FC-624B-5560-F7B281D1F96E";
pub(crate) const RAM_DISK_VIRTUAL_CD: &str = "3D5ABD30-4175-87CE-6D64-D2ADE523C4BB";

/// Render a validated chain. Nodes are joined with `/`; the End node is
/// not rendered, so an End-only chain produces an empty string.
pub(crate) fn chain_to_text(chain: &[u8], display_only: bool, allow_shortcuts: bool) -> String {
    let mut out = String::new();
    for (i, raw) in node::Nodes::new(chain).enumerate() {
        if i > 0 {
            out.push('/');
        }
        out.push_str(&node_to_text(&raw, display_only, allow_shortcuts));
    }
    out
}

fn node_to_text(raw: &RawNode, display_only: bool, allow_shortcuts: bool) -> String {
    let d = raw.data;
    match (raw.node_type, raw.sub_type) {
        (TYPE_HARDWARE, HW_PCI) if d.len() == 2 => {
            // Stored function-first, displayed device-first.
            format!("Pci(0x{:X},0x{:X})", d[1], d[0])
        }
        (TYPE_HARDWARE, HW_VENDOR) if d.len() >= 16 => vendor_to_text("VenHw", d, false),
        (TYPE_ACPI, ACPI_ACPI) if d.len() == 8 => acpi_to_text(d),
        (TYPE_MESSAGING, MSG_ATAPI) if d.len() == 4 => atapi_to_text(d, display_only),
        (TYPE_MESSAGING, MSG_SCSI) if d.len() == 4 => {
            format!("Scsi(0x{:X},0x{:X})", u16le(d, 0), u16le(d, 2))
        }
        (TYPE_MESSAGING, MSG_USB) if d.len() == 2 => {
            format!("USB(0x{:X},0x{:X})", d[0], d[1])
        }
        (TYPE_MESSAGING, MSG_VENDOR) if d.len() >= 16 => {
            vendor_to_text("VenMsg", d, allow_shortcuts)
        }
        (TYPE_MESSAGING, MSG_UART) if d.len() == 15 => uart_to_text(d),
        (TYPE_MESSAGING, MSG_USB_CLASS) if d.len() == 7 => format!(
            "UsbClass(0x{:X},0x{:X},0x{:X},0x{:X},0x{:X})",
            u16le(d, 0),
            u16le(d, 2),
            d[4],
            d[5],
            d[6]
        ),
        (TYPE_MESSAGING, MSG_LUN) if d.len() == 1 => format!("Unit(0x{:X})", d[0]),
        (TYPE_MESSAGING, MSG_MAC) if d.len() == 33 => mac_to_text(d),
        (TYPE_MESSAGING, MSG_IPV4) if d.len() == 23 => ipv4_to_text(d, display_only),
        (TYPE_MESSAGING, MSG_IPV6) if d.len() == 56 => ipv6_to_text(d, display_only),
        (TYPE_MESSAGING, MSG_SATA) if d.len() == 6 => format!(
            "Sata(0x{:X},0x{:X},0x{:X})",
            u16le(d, 0),
            u16le(d, 2),
            u16le(d, 4)
        ),
        (TYPE_MESSAGING, MSG_NVME) if d.len() == 12 => nvme_to_text(d),
        (TYPE_MESSAGING, MSG_URI) => match std::str::from_utf8(d) {
            Ok(uri) => format!("Uri({uri})"),
            Err(_) => generic_to_text(raw),
        },
        (TYPE_MEDIA, MEDIA_HARD_DRIVE) if d.len() == 38 => hard_drive_to_text(d, display_only),
        (TYPE_MEDIA, MEDIA_CDROM) if d.len() == 20 => {
            let mut out = format!("CDROM(0x{:X}", u32le(d, 0));
            if !display_only {
                write!(out, ",0x{:X},0x{:X}", u64le(d, 4), u64le(d, 12)).unwrap();
            }
            out.push(')');
            out
        }
        (TYPE_MEDIA, MEDIA_VENDOR) if d.len() >= 16 => vendor_to_text("VenMedia", d, false),
        (TYPE_MEDIA, MEDIA_FILE_PATH) => match file_path_to_text(d) {
            Some(path) => path,
            None => generic_to_text(raw),
        },
        (TYPE_MEDIA, MEDIA_FV_FILE) if d.len() == 16 => {
            format!("FvFile({})", guid_to_text(d))
        }
        (TYPE_MEDIA, MEDIA_FV) if d.len() == 16 => format!("Fv({})", guid_to_text(d)),
        (TYPE_MEDIA, MEDIA_RELATIVE_OFFSET) if d.len() == 20 => {
            format!("Offset(0x{:X},0x{:X})", u64le(d, 4), u64le(d, 12))
        }
        (TYPE_MEDIA, MEDIA_RAM_DISK) if d.len() == 34 => ram_disk_to_text(d),
        (TYPE_BBS, BBS_BBS) if d.len() >= 4 => bbs_to_text(d, display_only),
        _ => generic_to_text(raw),
    }
}

pub(crate) fn guid_to_text(d: &[u8]) -> String {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&d[..16]);
    Uuid::from_bytes_le(bytes).to_string().to_ascii_uppercase()
}

fn hex_upper(d: &[u8]) -> String {
    let mut out = String::with_capacity(d.len() * 2);
    for b in d {
        write!(out, "{b:02X}").unwrap();
    }
    out
}

fn vendor_to_text(keyword: &str, d: &[u8], allow_shortcuts: bool) -> String {
    let guid = guid_to_text(d);
    if allow_shortcuts && d.len() == 16 {
        match guid.as_str() {
            VENDOR_PC_ANSI => return "VenPcAnsi()".to_string(),
            VENDOR_VT_100 => return "VenVt100()".to_string(),
            VENDOR_VT_100_PLUS => return "VenVt100Plus()".to_string(),
            VENDOR_VT_UTF8 => return "VenUtf8()".to_string(),
            _ => {}
        }
    }
    if d.len() > 16 {
        format!("{keyword}({guid},{})", hex_upper(&d[16..]))
    } else {
        format!("{keyword}({guid})")
    }
}

fn acpi_to_text(d: &[u8]) -> String {
    const PNP_EISA_ID: u32 = 0x41D0; // compressed "PNP"
    let hid = u32le(d, 0);
    let uid = u32le(d, 4);
    if hid & 0xFFFF == PNP_EISA_ID {
        match hid >> 16 {
            0x0A03 => format!("PciRoot(0x{uid:X})"),
            0x0A08 => format!("PcieRoot(0x{uid:X})"),
            0x0604 => format!("Floppy(0x{uid:X})"),
            0x0301 => format!("Keyboard(0x{uid:X})"),
            0x0501 => format!("Serial(0x{uid:X})"),
            0x0401 => format!("ParallelPort(0x{uid:X})"),
            id => format!("Acpi(PNP{id:04X},0x{uid:X})"),
        }
    } else {
        format!("Acpi(0x{hid:08X},0x{uid:X})")
    }
}

fn atapi_to_text(d: &[u8], display_only: bool) -> String {
    let lun = u16le(d, 2);
    if display_only {
        format!("Ata(0x{lun:X})")
    } else {
        format!(
            "Ata({},{},0x{lun:X})",
            if d[0] == 0 { "Primary" } else { "Secondary" },
            if d[1] == 0 { "Master" } else { "Slave" },
        )
    }
}

fn mac_to_text(d: &[u8]) -> String {
    let if_type = d[32];
    // Interface types 0 and 1 carry a 6-byte Ethernet address; everything
    // else renders the full 32-byte field.
    let significant = if if_type <= 1 { 6 } else { 32 };
    format!("MAC({},0x{if_type:X})", hex_upper(&d[..significant]))
}

fn ipv4(d: &[u8], off: usize) -> Ipv4Addr {
    Ipv4Addr::new(d[off], d[off + 1], d[off + 2], d[off + 3])
}

fn ipv4_to_text(d: &[u8], display_only: bool) -> String {
    let remote = ipv4(d, 4);
    if display_only {
        return format!("IPv4({remote})");
    }
    let protocol = u16le(d, 12);
    let origin = if d[14] == 0 { "DHCP" } else { "Static" };
    format!(
        "IPv4({remote},0x{protocol:X},{origin},{},{},{})",
        ipv4(d, 0),
        ipv4(d, 15),
        ipv4(d, 19),
    )
}

fn ipv6(d: &[u8], off: usize) -> Ipv6Addr {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&d[off..off + 16]);
    Ipv6Addr::from(bytes)
}

fn ipv6_to_text(d: &[u8], display_only: bool) -> String {
    let remote = ipv6(d, 16);
    if display_only {
        return format!("IPv6({remote})");
    }
    let protocol = u16le(d, 36);
    let origin = match d[38] {
        0 => "Static".to_string(),
        1 => "StatelessAutoConfigure".to_string(),
        2 => "StatefulAutoConfigure".to_string(),
        other => format!("0x{other:X}"),
    };
    format!(
        "IPv6({remote},0x{protocol:X},{origin},{},0x{:X},{})",
        ipv6(d, 0),
        d[39],
        ipv6(d, 40),
    )
}

fn uart_to_text(d: &[u8]) -> String {
    let baud = u64le(d, 4);
    let baud = if baud == 0 {
        "DEFAULT".to_string()
    } else {
        baud.to_string()
    };
    let parity = match d[13] {
        0 => "D".to_string(),
        1 => "N".to_string(),
        2 => "E".to_string(),
        3 => "O".to_string(),
        4 => "M".to_string(),
        5 => "S".to_string(),
        other => format!("0x{other:X}"),
    };
    let stop_bits = match d[14] {
        0 => "D".to_string(),
        1 => "1".to_string(),
        2 => "1.5".to_string(),
        3 => "2".to_string(),
        other => format!("0x{other:X}"),
    };
    format!("Uart({baud},{},{parity},{stop_bits})", d[12])
}

fn ram_disk_to_text(d: &[u8]) -> String {
    let start = u64le(d, 0);
    let end = u64le(d, 8);
    let instance = u16le(d, 32);
    let guid = guid_to_text(&d[16..32]);
    match guid.as_str() {
        RAM_DISK_VIRTUAL_DISK => format!("VirtualDisk(0x{start:X},0x{end:X},{instance})"),
        RAM_DISK_VIRTUAL_CD => format!("VirtualCD(0x{start:X},0x{end:X},{instance})"),
        _ => format!("RamDisk(0x{start:X},0x{end:X},{instance},{guid})"),
    }
}

fn nvme_to_text(d: &[u8]) -> String {
    let mut out = format!("NVMe(0x{:X},", u32le(d, 0));
    // The EUI-64 is displayed most-significant byte first.
    for (i, b) in d[4..12].iter().rev().enumerate() {
        if i > 0 {
            out.push('-');
        }
        write!(out, "{b:02X}").unwrap();
    }
    out.push(')');
    out
}

fn hard_drive_to_text(d: &[u8], display_only: bool) -> String {
    let partition = u32le(d, 0);
    let (kind, signature) = match d[37] {
        1 => ("MBR".to_string(), format!("0x{:08X}", u32le(d, 20))),
        2 => ("GPT".to_string(), guid_to_text(&d[20..36])),
        other => (format!("{other}"), "0".to_string()),
    };
    let mut out = format!("HD({partition},{kind},{signature}");
    if !display_only {
        write!(out, ",0x{:X},0x{:X}", u64le(d, 4), u64le(d, 12)).unwrap();
    }
    out.push(')');
    out
}

fn file_path_to_text(d: &[u8]) -> Option<String> {
    let text = match ucs2::find_nul(d) {
        Some(nul) => ucs2::decode(&d[..nul]).ok()?,
        None => ucs2::decode(d).ok()?,
    };
    Some(text)
}

fn bbs_to_text(d: &[u8], display_only: bool) -> String {
    let device_type = u16le(d, 0);
    let status = u16le(d, 2);
    let description: String = d[4..]
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect();
    let kind = match device_type {
        1 => "Floppy".to_string(),
        2 => "HD".to_string(),
        3 => "CDROM".to_string(),
        4 => "PCMCIA".to_string(),
        5 => "USB".to_string(),
        6 => "Network".to_string(),
        other => format!("0x{other:X}"),
    };
    if display_only {
        format!("BBS({kind},{description})")
    } else {
        format!("BBS({kind},{description},0x{status:X})")
    }
}

fn generic_to_text(raw: &RawNode) -> String {
    if raw.data.is_empty() {
        format!("Path({},{})", raw.node_type, raw.sub_type)
    } else {
        format!(
            "Path({},{},{})",
            raw.node_type,
            raw.sub_type,
            hex_upper(raw.data)
        )
    }
}
