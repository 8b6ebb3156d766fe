use std::path::Path;

use assert_cmd::Command;
use expect_test::expect;

fn efibootctl(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("efibootctl").unwrap();
    cmd.env("EFIBOOT_EFIVARFS", root);
    cmd
}

fn show(root: &Path, extra: &[&str]) -> String {
    let output = efibootctl(root)
        .arg("show")
        .args(extra)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "show failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn add_show_del_flow() {
    let varfs = tempfile::tempdir().unwrap();

    efibootctl(varfs.path())
        .args([
            "add",
            "--description",
            "Fedora",
            "--path",
            r"HD(1,GPT,C8F57909-D589-41A1-9958-44C7F229E150,0x800,0x12C000)/\EFI\fedora\shimx64.efi",
        ])
        .assert()
        .success();

    efibootctl(varfs.path())
        .args([
            "add",
            "--description",
            "iPXE",
            "--path",
            "PciRoot(0x0)/Pci(0x3,0x0)/MAC(525400123456,0x1)",
            "--data",
            "3q2+7w==",
        ])
        .assert()
        .success();

    expect![[r#"
        Boot0000* Fedora
          attributes: 0x00000001
          path: HD(1,GPT,C8F57909-D589-41A1-9958-44C7F229E150,0x800,0x12C000)/\EFI\fedora\shimx64.efi
        Boot0001* iPXE
          attributes: 0x00000001
          path: PciRoot(0x0)/Pci(0x3,0x0)/MAC(525400123456,0x1)
          data: 3q2+7w==
    "#]]
    .assert_eq(&show(varfs.path(), &[]));

    efibootctl(varfs.path())
        .args(["del", "--name", "Boot0000"])
        .assert()
        .success();

    expect![[r#"
        Boot0001* iPXE
          attributes: 0x00000001
          path: PciRoot(0x0)/Pci(0x3,0x0)/MAC(525400123456,0x1)
          data: 3q2+7w==
    "#]]
    .assert_eq(&show(varfs.path(), &[]));
}

#[test]
fn position_controls_the_order() {
    let varfs = tempfile::tempdir().unwrap();

    for description in ["first", "second"] {
        efibootctl(varfs.path())
            .args(["add", "--description", description, "--path", r"\EFI\a.efi"])
            .assert()
            .success();
    }
    efibootctl(varfs.path())
        .args([
            "add",
            "--description",
            "queue jumper",
            "--path",
            r"\EFI\b.efi",
            "--position",
            "0",
        ])
        .assert()
        .success();

    expect![[r#"
        Boot0002* queue jumper
        Boot0000* first
        Boot0001* second
    "#]]
    .assert_eq(&show(varfs.path(), &["--description"]));
}

#[test]
fn explicit_names_reserve_their_index() {
    let varfs = tempfile::tempdir().unwrap();

    efibootctl(varfs.path())
        .args([
            "add",
            "--name",
            "Boot0001",
            "--description",
            "pinned",
            "--path",
            r"\EFI\a.efi",
        ])
        .assert()
        .success();
    // The automatic index skips the taken slot.
    efibootctl(varfs.path())
        .args(["add", "--description", "floating", "--path", r"\EFI\b.efi"])
        .assert()
        .success();

    expect![[r#"
        Boot0001* pinned
        Boot0000* floating
    "#]]
    .assert_eq(&show(varfs.path(), &["--description"]));
}

#[test]
fn mod_updates_fields_in_place() {
    let varfs = tempfile::tempdir().unwrap();

    efibootctl(varfs.path())
        .args(["add", "--description", "Fedora", "--path", r"\EFI\a.efi"])
        .assert()
        .success();

    efibootctl(varfs.path())
        .args([
            "mod",
            "--name",
            "Boot0000",
            "--description",
            "Fedora 39",
            "--attributes",
            "0x9",
        ])
        .assert()
        .success();

    expect![[r#"
        Boot0000* Fedora 39
          attributes: 0x00000009
          path: \EFI\a.efi
    "#]]
    .assert_eq(&show(varfs.path(), &[]));
}

#[test]
fn field_selectors_limit_the_output() {
    let varfs = tempfile::tempdir().unwrap();

    efibootctl(varfs.path())
        .args(["add", "--description", "Fedora", "--path", r"\EFI\a.efi"])
        .assert()
        .success();

    expect![[r#"
        Boot0000*
          path: \EFI\a.efi
    "#]]
    .assert_eq(&show(varfs.path(), &["--path"]));
}

#[test]
fn deleting_a_missing_entry_fails() {
    let varfs = tempfile::tempdir().unwrap();
    let output = efibootctl(varfs.path())
        .args(["del", "--name", "Boot0007"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn implausible_paths_are_rejected_with_a_nonzero_exit() {
    let varfs = tempfile::tempdir().unwrap();
    let output = efibootctl(varfs.path())
        .args(["add", "--description", "typo", "--path", "URI(http://x)"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    // Nothing may have been written.
    assert_eq!(std::fs::read_dir(varfs.path()).unwrap().count(), 0);
}

#[test]
fn show_on_an_empty_store_prints_nothing() {
    let varfs = tempfile::tempdir().unwrap();
    assert_eq!(show(varfs.path(), &[]), "");
}
