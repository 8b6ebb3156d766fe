use assert_cmd::Command;

/// `PciRoot(0x0)/Pci(0x1,0x1)/Ata(0x0)` in binary form.
const HDD_BYTES: &[u8] = &[
    0x02, 0x01, 0x0C, 0x00, 0xD0, 0x41, 0x03, 0x0A, 0x00, 0x00, 0x00, 0x00, //
    0x01, 0x01, 0x06, 0x00, 0x01, 0x01, //
    0x03, 0x01, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x7F, 0xFF, 0x04, 0x00,
];

fn efidevpath() -> Command {
    Command::cargo_bin("efidevpath").unwrap()
}

#[test]
fn binary_to_text_uses_the_full_form_by_default() {
    let output = efidevpath()
        .write_stdin(HDD_BYTES.to_vec())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "PciRoot(0x0)/Pci(0x1,0x1)/Ata(Primary,Master,0x0)\n"
    );
}

#[test]
fn display_flag_selects_the_short_form() {
    let output = efidevpath()
        .arg("-d")
        .write_stdin(HDD_BYTES.to_vec())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "PciRoot(0x0)/Pci(0x1,0x1)/Ata(0x0)\n"
    );
}

#[test]
fn text_to_binary_reproduces_the_bytes() {
    let output = efidevpath()
        .args(["-t", "PciRoot(0x0)/Pci(0x1,0x1)/Ata(0x0)"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(output.stdout, HDD_BYTES);
}

#[test]
fn uri_paths_survive_both_directions() {
    let text = "IPv4(0.0.0.0)/Uri(http://boot.ipxe.org/ipxe.efi)";
    let binary = efidevpath().args(["-t", text]).output().unwrap();
    assert!(binary.status.success());

    let round_tripped = efidevpath()
        .args(["-d", "-s"])
        .write_stdin(binary.stdout)
        .output()
        .unwrap();
    assert!(round_tripped.status.success());
    assert_eq!(
        String::from_utf8(round_tripped.stdout).unwrap(),
        format!("{text}\n")
    );
}

#[test]
fn implausible_text_is_refused() {
    let output = efidevpath().args(["-t", "URI(http://x)"]).output().unwrap();
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("implausible"), "stderr: {stderr}");
}

#[test]
fn truncated_binary_input_is_refused() {
    let output = efidevpath()
        .write_stdin(HDD_BYTES[..HDD_BYTES.len() - 2].to_vec())
        .output()
        .unwrap();
    assert!(!output.status.success());
}
