//! Parsing of the UEFI textual device-path representation into binary.
//!
//! A segment whose keyword is not recognised becomes a file-path node.
//! That is what the UEFI grammar prescribes, but it is usually a typo
//! (`URI(...)` for `Uri(...)`), so [`plausibility_check`] can reject the
//! result after the fact.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

use crate::devicepath::node::{self, push_node};
use crate::devicepath::text;
use crate::error::{Error, Result};
use crate::ucs2;

/// Convert device path text into chain bytes, End node included.
pub(crate) fn chain_from_text(input: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut nodes = 0usize;
    for segment in split_segments(input) {
        if segment.is_empty() {
            continue;
        }
        parse_segment(segment, &mut out)?;
        nodes += 1;
    }
    if nodes == 0 {
        return Err(Error::invalid("empty device path text"));
    }
    node::push_end(&mut out);
    Ok(out)
}

/// Reject chains whose file-path nodes look like unrecognised typed-node
/// syntax: a component that, after an optional alphanumeric prefix,
/// consists of a parenthesised argument list.
pub(crate) fn plausibility_check(chain: &[u8]) -> Result<()> {
    static SUSPICIOUS: OnceLock<Regex> = OnceLock::new();
    let suspicious = SUSPICIOUS.get_or_init(|| Regex::new(r"^[0-9A-Za-z]*\(.*\)$").unwrap());

    for raw in node::Nodes::new(chain) {
        if raw.node_type != node::TYPE_MEDIA || raw.sub_type != node::MEDIA_FILE_PATH {
            continue;
        }
        let path = match ucs2::find_nul(raw.data) {
            Some(nul) => ucs2::decode(&raw.data[..nul])?,
            None => ucs2::decode(raw.data)?,
        };
        for component in path.split('\\') {
            if suspicious.is_match(component) {
                return Err(Error::Implausible(component.to_string()));
            }
        }
    }
    Ok(())
}

/// Split on `/` outside parentheses; `Uri(...)` may contain slashes.
fn split_segments(input: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                segments.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&input[start..]);
    segments
}

fn parse_segment(segment: &str, out: &mut Vec<u8>) -> Result<()> {
    if let Some((keyword, args)) = split_call(segment) {
        if parse_known(keyword, args, out)? {
            return Ok(());
        }
    }
    file_path_node(segment, out)
}

/// Split `Keyword(args)` if the segment has that shape.
fn split_call(segment: &str) -> Option<(&str, &str)> {
    let open = segment.find('(')?;
    if !segment.ends_with(')') || open == 0 {
        return None;
    }
    let keyword = &segment[..open];
    if !keyword.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some((keyword, &segment[open + 1..segment.len() - 1]))
}

/// Dispatch over recognised keywords. Returns `Ok(false)` for an unknown
/// keyword (the caller embeds the segment as a file path); argument errors
/// inside a recognised keyword are hard failures.
fn parse_known(keyword: &str, args: &str, out: &mut Vec<u8>) -> Result<bool> {
    use node::*;

    match keyword {
        "PciRoot" => acpi_pnp_node(0x0A03, args, out)?,
        "PcieRoot" => acpi_pnp_node(0x0A08, args, out)?,
        "Floppy" => acpi_pnp_node(0x0604, args, out)?,
        "Keyboard" => acpi_pnp_node(0x0301, args, out)?,
        "Serial" => acpi_pnp_node(0x0501, args, out)?,
        "ParallelPort" => acpi_pnp_node(0x0401, args, out)?,
        "Acpi" => acpi_node(args, out)?,
        "Pci" => pci_node(args, out)?,
        "VenHw" => vendor_node(TYPE_HARDWARE, HW_VENDOR, args, out)?,
        "VenMsg" => vendor_node(TYPE_MESSAGING, MSG_VENDOR, args, out)?,
        "VenMedia" => vendor_node(TYPE_MEDIA, MEDIA_VENDOR, args, out)?,
        "VenPcAnsi" => console_vendor_node(text::VENDOR_PC_ANSI, args, out)?,
        "VenVt100" => console_vendor_node(text::VENDOR_VT_100, args, out)?,
        "VenVt100Plus" => console_vendor_node(text::VENDOR_VT_100_PLUS, args, out)?,
        "VenUtf8" => console_vendor_node(text::VENDOR_VT_UTF8, args, out)?,
        "Ata" => ata_node(args, out)?,
        "Scsi" => scsi_node(args, out)?,
        "USB" => usb_node(args, out)?,
        "Uart" => uart_node(args, out)?,
        "UsbClass" => usb_class_node(args, out)?,
        "Unit" => unit_node(args, out)?,
        "Sata" => sata_node(args, out)?,
        "NVMe" => nvme_node(args, out)?,
        "MAC" => mac_node(args, out)?,
        "IPv4" => ipv4_node(args, out)?,
        "IPv6" => ipv6_node(args, out)?,
        "Uri" => push_node(out, TYPE_MESSAGING, MSG_URI, args.as_bytes())?,
        "HD" => hard_drive_node(args, out)?,
        "CDROM" => cdrom_node(args, out)?,
        "Fv" => guid_node(TYPE_MEDIA, MEDIA_FV, args, out)?,
        "FvFile" => guid_node(TYPE_MEDIA, MEDIA_FV_FILE, args, out)?,
        "Offset" => offset_node(args, out)?,
        "VirtualDisk" => ram_disk_node(Some(text::RAM_DISK_VIRTUAL_DISK), args, out)?,
        "VirtualCD" => ram_disk_node(Some(text::RAM_DISK_VIRTUAL_CD), args, out)?,
        "RamDisk" => ram_disk_node(None, args, out)?,
        "BBS" => bbs_node(args, out)?,
        "Path" => raw_node(args, out)?,
        _ => return Ok(false),
    }
    Ok(true)
}

fn split_args(args: &str) -> Vec<&str> {
    if args.is_empty() {
        return Vec::new();
    }
    args.split(',').map(str::trim).collect()
}

fn expect_args<'a>(keyword: &str, args: &'a str, counts: &[usize]) -> Result<Vec<&'a str>> {
    let parts = split_args(args);
    if counts.contains(&parts.len()) {
        Ok(parts)
    } else {
        Err(Error::Invalid(format!(
            "{keyword} takes {counts:?} arguments, got {}",
            parts.len()
        )))
    }
}

fn parse_u64(arg: &str) -> Result<u64> {
    let arg = arg.trim();
    let (digits, radix) = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (arg, 10),
    };
    u64::from_str_radix(digits, radix)
        .map_err(|_| Error::Invalid(format!("bad number {arg:?} in device path text")))
}

fn parse_u32(arg: &str) -> Result<u32> {
    u32::try_from(parse_u64(arg)?)
        .map_err(|_| Error::Invalid(format!("number {arg:?} does not fit in 32 bits")))
}

fn parse_u16(arg: &str) -> Result<u16> {
    u16::try_from(parse_u64(arg)?)
        .map_err(|_| Error::Invalid(format!("number {arg:?} does not fit in 16 bits")))
}

fn parse_u8(arg: &str) -> Result<u8> {
    u8::try_from(parse_u64(arg)?)
        .map_err(|_| Error::Invalid(format!("number {arg:?} does not fit in 8 bits")))
}

fn parse_guid(arg: &str) -> Result<[u8; 16]> {
    Uuid::parse_str(arg.trim())
        .map(|uuid| uuid.to_bytes_le())
        .map_err(|_| Error::Invalid(format!("bad GUID {arg:?} in device path text")))
}

fn parse_hex_bytes(arg: &str) -> Result<Vec<u8>> {
    if arg.len() % 2 != 0 {
        return Err(Error::Invalid(format!("odd-length hex string {arg:?}")));
    }
    (0..arg.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&arg[i..i + 2], 16)
                .map_err(|_| Error::Invalid(format!("bad hex string {arg:?}")))
        })
        .collect()
}

fn parse_ipv4(arg: &str) -> Result<[u8; 4]> {
    Ipv4Addr::from_str(arg)
        .map(|ip| ip.octets())
        .map_err(|_| Error::Invalid(format!("bad IPv4 address {arg:?}")))
}

fn parse_ipv6(arg: &str) -> Result<[u8; 16]> {
    Ipv6Addr::from_str(arg)
        .map(|ip| ip.octets())
        .map_err(|_| Error::Invalid(format!("bad IPv6 address {arg:?}")))
}

fn acpi_pnp_node(pnp_id: u32, args: &str, out: &mut Vec<u8>) -> Result<()> {
    let uid = if args.trim().is_empty() {
        0
    } else {
        parse_u32(args)?
    };
    acpi_payload((pnp_id << 16) | 0x41D0, uid, out)
}

fn acpi_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("Acpi", args, &[2])?;
    let hid = if let Some(pnp) = parts[0].strip_prefix("PNP") {
        let id = u32::from_str_radix(pnp, 16)
            .map_err(|_| Error::Invalid(format!("bad EISA id {:?}", parts[0])))?;
        (id << 16) | 0x41D0
    } else {
        parse_u32(parts[0])?
    };
    acpi_payload(hid, parse_u32(parts[1])?, out)
}

fn acpi_payload(hid: u32, uid: u32, out: &mut Vec<u8>) -> Result<()> {
    let mut payload = Vec::with_capacity(8);
    payload.extend_from_slice(&hid.to_le_bytes());
    payload.extend_from_slice(&uid.to_le_bytes());
    push_node(out, node::TYPE_ACPI, node::ACPI_ACPI, &payload)
}

fn pci_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("Pci", args, &[2])?;
    // Text order is device,function; storage order is function,device.
    let device = parse_u8(parts[0])?;
    let function = parse_u8(parts[1])?;
    push_node(out, node::TYPE_HARDWARE, node::HW_PCI, &[function, device])
}

fn vendor_node(node_type: u8, sub_type: u8, args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("Ven", args, &[1, 2])?;
    let mut payload = parse_guid(parts[0])?.to_vec();
    if parts.len() == 2 {
        payload.extend_from_slice(&parse_hex_bytes(parts[1])?);
    }
    push_node(out, node_type, sub_type, &payload)
}

fn console_vendor_node(guid: &str, args: &str, out: &mut Vec<u8>) -> Result<()> {
    if !args.trim().is_empty() {
        return Err(Error::invalid("console vendor shortcut takes no arguments"));
    }
    let payload = parse_guid(guid)?;
    push_node(out, node::TYPE_MESSAGING, node::MSG_VENDOR, &payload)
}

fn ata_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("Ata", args, &[1, 3])?;
    let (primary_secondary, slave_master, lun) = if parts.len() == 1 {
        (0, 0, parse_u16(parts[0])?)
    } else {
        let controller = match parts[0] {
            c if c.eq_ignore_ascii_case("Primary") => 0,
            c if c.eq_ignore_ascii_case("Secondary") => 1,
            other => return Err(Error::Invalid(format!("bad ATA controller {other:?}"))),
        };
        let drive = match parts[1] {
            d if d.eq_ignore_ascii_case("Master") => 0,
            d if d.eq_ignore_ascii_case("Slave") => 1,
            other => return Err(Error::Invalid(format!("bad ATA drive {other:?}"))),
        };
        (controller, drive, parse_u16(parts[2])?)
    };
    let mut payload = vec![primary_secondary, slave_master];
    payload.extend_from_slice(&lun.to_le_bytes());
    push_node(out, node::TYPE_MESSAGING, node::MSG_ATAPI, &payload)
}

fn scsi_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("Scsi", args, &[2])?;
    let mut payload = Vec::with_capacity(4);
    payload.extend_from_slice(&parse_u16(parts[0])?.to_le_bytes());
    payload.extend_from_slice(&parse_u16(parts[1])?.to_le_bytes());
    push_node(out, node::TYPE_MESSAGING, node::MSG_SCSI, &payload)
}

fn usb_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("USB", args, &[2])?;
    let payload = [parse_u8(parts[0])?, parse_u8(parts[1])?];
    push_node(out, node::TYPE_MESSAGING, node::MSG_USB, &payload)
}

fn uart_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("Uart", args, &[4])?;
    let baud = if parts[0].eq_ignore_ascii_case("DEFAULT") {
        0
    } else {
        parse_u64(parts[0])?
    };
    let parity = match parts[2] {
        "D" => 0,
        "N" => 1,
        "E" => 2,
        "O" => 3,
        "M" => 4,
        "S" => 5,
        other => parse_u8(other)?,
    };
    let stop_bits = match parts[3] {
        "D" => 0,
        "1" => 1,
        "1.5" => 2,
        "2" => 3,
        other => parse_u8(other)?,
    };
    let mut payload = vec![0u8; 4];
    payload.extend_from_slice(&baud.to_le_bytes());
    payload.push(parse_u8(parts[1])?);
    payload.push(parity);
    payload.push(stop_bits);
    push_node(out, node::TYPE_MESSAGING, node::MSG_UART, &payload)
}

fn usb_class_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("UsbClass", args, &[5])?;
    let mut payload = Vec::with_capacity(7);
    payload.extend_from_slice(&parse_u16(parts[0])?.to_le_bytes());
    payload.extend_from_slice(&parse_u16(parts[1])?.to_le_bytes());
    payload.push(parse_u8(parts[2])?);
    payload.push(parse_u8(parts[3])?);
    payload.push(parse_u8(parts[4])?);
    push_node(out, node::TYPE_MESSAGING, node::MSG_USB_CLASS, &payload)
}

fn unit_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("Unit", args, &[1])?;
    push_node(
        out,
        node::TYPE_MESSAGING,
        node::MSG_LUN,
        &[parse_u8(parts[0])?],
    )
}

fn ram_disk_node(kind: Option<&str>, args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = match kind {
        Some(_) => expect_args("VirtualDisk", args, &[3])?,
        None => expect_args("RamDisk", args, &[4])?,
    };
    let guid = match kind {
        Some(guid) => parse_guid(guid)?,
        None => parse_guid(parts[3])?,
    };
    let mut payload = Vec::with_capacity(34);
    payload.extend_from_slice(&parse_u64(parts[0])?.to_le_bytes());
    payload.extend_from_slice(&parse_u64(parts[1])?.to_le_bytes());
    payload.extend_from_slice(&guid);
    payload.extend_from_slice(&parse_u16(parts[2])?.to_le_bytes());
    push_node(out, node::TYPE_MEDIA, node::MEDIA_RAM_DISK, &payload)
}

fn sata_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("Sata", args, &[3])?;
    let mut payload = Vec::with_capacity(6);
    for part in parts {
        payload.extend_from_slice(&parse_u16(part)?.to_le_bytes());
    }
    push_node(out, node::TYPE_MESSAGING, node::MSG_SATA, &payload)
}

fn nvme_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("NVMe", args, &[2])?;
    let mut payload = parse_u32(parts[0])?.to_le_bytes().to_vec();
    let eui_hex: String = parts[1].chars().filter(|&c| c != '-').collect();
    if eui_hex.len() != 16 {
        return Err(Error::Invalid(format!("bad EUI-64 {:?}", parts[1])));
    }
    // Displayed most-significant first; stored least-significant first.
    let mut eui = parse_hex_bytes(&eui_hex)?;
    eui.reverse();
    payload.extend_from_slice(&eui);
    push_node(out, node::TYPE_MESSAGING, node::MSG_NVME, &payload)
}

fn mac_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("MAC", args, &[1, 2])?;
    let address = parse_hex_bytes(parts[0])?;
    if address.len() != 6 && address.len() != 32 {
        return Err(Error::Invalid(format!(
            "MAC address must be 6 or 32 bytes, got {}",
            address.len()
        )));
    }
    let if_type = if parts.len() == 2 {
        parse_u8(parts[1])?
    } else {
        0
    };
    let mut payload = vec![0u8; 33];
    payload[..address.len()].copy_from_slice(&address);
    payload[32] = if_type;
    push_node(out, node::TYPE_MESSAGING, node::MSG_MAC, &payload)
}

fn ipv4_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("IPv4", args, &[1, 6])?;
    let mut payload = vec![0u8; 23];
    payload[4..8].copy_from_slice(&parse_ipv4(parts[0])?);
    if parts.len() == 6 {
        payload[12..14].copy_from_slice(&parse_u16(parts[1])?.to_le_bytes());
        payload[14] = match parts[2] {
            o if o.eq_ignore_ascii_case("DHCP") => 0,
            o if o.eq_ignore_ascii_case("Static") => 1,
            other => return Err(Error::Invalid(format!("bad IPv4 origin {other:?}"))),
        };
        payload[0..4].copy_from_slice(&parse_ipv4(parts[3])?);
        payload[15..19].copy_from_slice(&parse_ipv4(parts[4])?);
        payload[19..23].copy_from_slice(&parse_ipv4(parts[5])?);
    }
    push_node(out, node::TYPE_MESSAGING, node::MSG_IPV4, &payload)
}

fn ipv6_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("IPv6", args, &[1, 6])?;
    let mut payload = vec![0u8; 56];
    payload[16..32].copy_from_slice(&parse_ipv6(parts[0])?);
    if parts.len() == 6 {
        payload[36..38].copy_from_slice(&parse_u16(parts[1])?.to_le_bytes());
        payload[38] = match parts[2] {
            o if o.eq_ignore_ascii_case("Static") => 0,
            o if o.eq_ignore_ascii_case("StatelessAutoConfigure") => 1,
            o if o.eq_ignore_ascii_case("StatefulAutoConfigure") => 2,
            other => parse_u8(other)?,
        };
        payload[0..16].copy_from_slice(&parse_ipv6(parts[3])?);
        payload[39] = parse_u8(parts[4])?;
        payload[40..56].copy_from_slice(&parse_ipv6(parts[5])?);
    }
    push_node(out, node::TYPE_MESSAGING, node::MSG_IPV6, &payload)
}

fn hard_drive_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("HD", args, &[3, 5])?;
    let partition = parse_u32(parts[0])?;

    let mut signature = [0u8; 16];
    let (mbr_type, signature_type) = match parts[1] {
        t if t.eq_ignore_ascii_case("MBR") => {
            signature[..4].copy_from_slice(&parse_u32(parts[2])?.to_le_bytes());
            (1u8, 1u8)
        }
        t if t.eq_ignore_ascii_case("GPT") => {
            signature = parse_guid(parts[2])?;
            (2u8, 2u8)
        }
        other => (parse_u8(other)?, 0u8),
    };

    let (start, size) = if parts.len() == 5 {
        (parse_u64(parts[3])?, parse_u64(parts[4])?)
    } else {
        (0, 0)
    };

    let mut payload = Vec::with_capacity(38);
    payload.extend_from_slice(&partition.to_le_bytes());
    payload.extend_from_slice(&start.to_le_bytes());
    payload.extend_from_slice(&size.to_le_bytes());
    payload.extend_from_slice(&signature);
    payload.push(mbr_type);
    payload.push(signature_type);
    push_node(out, node::TYPE_MEDIA, node::MEDIA_HARD_DRIVE, &payload)
}

fn cdrom_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("CDROM", args, &[1, 3])?;
    let (start, size) = if parts.len() == 3 {
        (parse_u64(parts[1])?, parse_u64(parts[2])?)
    } else {
        (0, 0)
    };
    let mut payload = Vec::with_capacity(20);
    payload.extend_from_slice(&parse_u32(parts[0])?.to_le_bytes());
    payload.extend_from_slice(&start.to_le_bytes());
    payload.extend_from_slice(&size.to_le_bytes());
    push_node(out, node::TYPE_MEDIA, node::MEDIA_CDROM, &payload)
}

fn guid_node(node_type: u8, sub_type: u8, args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("Fv", args, &[1])?;
    let payload = parse_guid(parts[0])?;
    push_node(out, node_type, sub_type, &payload)
}

fn offset_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("Offset", args, &[2])?;
    let mut payload = vec![0u8; 4];
    payload.extend_from_slice(&parse_u64(parts[0])?.to_le_bytes());
    payload.extend_from_slice(&parse_u64(parts[1])?.to_le_bytes());
    push_node(out, node::TYPE_MEDIA, node::MEDIA_RELATIVE_OFFSET, &payload)
}

fn bbs_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("BBS", args, &[2, 3])?;
    let device_type: u16 = match parts[0] {
        t if t.eq_ignore_ascii_case("Floppy") => 1,
        t if t.eq_ignore_ascii_case("HD") => 2,
        t if t.eq_ignore_ascii_case("CDROM") => 3,
        t if t.eq_ignore_ascii_case("PCMCIA") => 4,
        t if t.eq_ignore_ascii_case("USB") => 5,
        t if t.eq_ignore_ascii_case("Network") => 6,
        other => parse_u16(other)?,
    };
    if !parts[1].is_ascii() {
        return Err(Error::invalid("BBS description must be ASCII"));
    }
    let status = if parts.len() == 3 {
        parse_u16(parts[2])?
    } else {
        0
    };
    let mut payload = Vec::with_capacity(4 + parts[1].len() + 1);
    payload.extend_from_slice(&device_type.to_le_bytes());
    payload.extend_from_slice(&status.to_le_bytes());
    payload.extend_from_slice(parts[1].as_bytes());
    payload.push(0);
    push_node(out, node::TYPE_BBS, node::BBS_BBS, &payload)
}

fn raw_node(args: &str, out: &mut Vec<u8>) -> Result<()> {
    let parts = expect_args("Path", args, &[2, 3])?;
    let node_type = parse_u8(parts[0])?;
    let sub_type = parse_u8(parts[1])?;
    if node_type == node::TYPE_END {
        return Err(Error::invalid("Path() cannot describe an End node"));
    }
    let payload = if parts.len() == 3 {
        parse_hex_bytes(parts[2])?
    } else {
        Vec::new()
    };
    push_node(out, node_type, sub_type, &payload)
}

fn file_path_node(segment: &str, out: &mut Vec<u8>) -> Result<()> {
    let payload = ucs2::encode_with_nul(segment)?;
    push_node(out, node::TYPE_MEDIA, node::MEDIA_FILE_PATH, &payload)
}
