use anyhow::{bail, Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand};

use efiboot::{BootEntry, BootEntryManager, OptionClass};

/// The default log level.
///
/// 2 corresponds to the level INFO.
const DEFAULT_LOG_LEVEL: usize = 2;

/// Test hook: points the efivarfs backend at an alternate root directory.
const EFIVARFS_ENV: &str = "EFIBOOT_EFIVARFS";

#[derive(Parser)]
pub struct Cli {
    /// Silence all output
    #[arg(short, long)]
    quiet: bool,
    /// Verbose mode (-v, -vv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[clap(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List entries and their fields
    Show(ShowCommand),
    /// Create an entry and insert it into the ordering list
    Add(AddCommand),
    /// Modify fields of an existing entry
    Mod(ModCommand),
    /// Remove an entry from the ordering list and delete its variable
    Del(DelCommand),
}

#[derive(Parser)]
struct ShowCommand {
    /// Entry class (boot, driver or sysprep)
    #[arg(long = "type", default_value = "boot")]
    class: OptionClass,

    /// Show only the named entry (e.g. Boot0001)
    #[arg(long)]
    name: Option<String>,

    /// Show the description field
    #[arg(long)]
    description: bool,

    /// Show the attributes field
    #[arg(long)]
    attributes: bool,

    /// Show the device paths
    #[arg(long)]
    path: bool,

    /// Show the optional data, base64-encoded
    #[arg(long)]
    data: bool,
}

#[derive(Parser)]
struct AddCommand {
    /// Entry class (boot, driver or sysprep)
    #[arg(long = "type", default_value = "boot")]
    class: OptionClass,

    /// Variable name (e.g. Boot0002); the first free index is allocated
    /// when absent
    #[arg(long)]
    name: Option<String>,

    /// Description string
    #[arg(long)]
    description: Option<String>,

    /// Device path in UEFI text form; repeatable
    #[arg(long = "path")]
    paths: Vec<String>,

    /// Attributes word (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_attributes)]
    attributes: Option<u32>,

    /// Optional data, base64-encoded
    #[arg(long)]
    data: Option<String>,

    /// Insert position in the ordering list (appended when absent)
    #[arg(long)]
    position: Option<usize>,
}

#[derive(Parser)]
struct ModCommand {
    /// Variable name of the entry (e.g. Boot0001)
    #[arg(long)]
    name: String,

    /// New description string
    #[arg(long)]
    description: Option<String>,

    /// Replacement device path in UEFI text form; repeatable
    #[arg(long = "path")]
    paths: Vec<String>,

    /// New attributes word (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_attributes)]
    attributes: Option<u32>,

    /// New optional data, base64-encoded
    #[arg(long)]
    data: Option<String>,
}

#[derive(Parser)]
struct DelCommand {
    /// Variable name of the entry (e.g. Boot0001)
    #[arg(long)]
    name: String,
}

impl Cli {
    pub fn call(self, module: &str) {
        stderrlog::new()
            .module(module)
            .show_level(false)
            .quiet(self.quiet)
            .verbosity(DEFAULT_LOG_LEVEL + usize::from(self.verbose))
            .init()
            .expect("Failed to setup logger.");

        if let Err(e) = self.commands.call() {
            log::error!("{e:#}");
            std::process::exit(1);
        };
    }
}

impl Commands {
    pub fn call(self) -> Result<()> {
        match self {
            Commands::Show(args) => show(args),
            Commands::Add(args) => add(args),
            Commands::Mod(args) => modify(args),
            Commands::Del(args) => del(args),
        }
    }
}

/// The variable store the CLI runs against, honouring the test hook.
fn manager() -> BootEntryManager {
    #[cfg(target_os = "linux")]
    if let Ok(root) = std::env::var(EFIVARFS_ENV) {
        let store = efiboot::varstore::efivarfs::EfivarfsStore::with_root(root);
        return BootEntryManager::new(Box::new(store));
    }
    BootEntryManager::system()
}

/// Split a variable name like `Boot0001` into class and index.
fn parse_name(name: &str) -> Result<(OptionClass, u16)> {
    for class in [OptionClass::Boot, OptionClass::Driver, OptionClass::SysPrep] {
        if let Some(hex) = name.strip_prefix(class.prefix()) {
            if hex.len() != 4 {
                bail!("{name}: expected exactly four hex digits after {}", class.prefix());
            }
            let index = u16::from_str_radix(hex, 16)
                .with_context(|| format!("{name}: bad hex index {hex:?}"))?;
            return Ok((class, index));
        }
    }
    bail!("{name}: expected a Boot####, Driver#### or SysPrep#### name");
}

fn parse_attributes(arg: &str) -> std::result::Result<u32, String> {
    let parsed = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => arg.parse(),
    };
    parsed.map_err(|_| format!("bad attributes value {arg:?}"))
}

fn decode_data(data: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .context("Failed to decode --data as base64")
}

fn show(args: ShowCommand) -> Result<()> {
    let manager = manager();
    let entries = match &args.name {
        Some(name) => {
            let (class, index) = parse_name(name)?;
            vec![manager
                .load(class, index)
                .with_context(|| format!("Failed to load {name}"))?]
        }
        None => manager
            .load_all(args.class)
            .context("Failed to load the entry list")?,
    };

    // No selector means every field.
    let all = !(args.description || args.attributes || args.path || args.data);

    for entry in &entries {
        let name = entry
            .variable_name()
            .expect("loaded entries have an index");
        let marker = if entry.attributes() & efiboot::loadopt::ATTR_ACTIVE != 0 {
            "*"
        } else {
            " "
        };
        if all || args.description {
            println!("{name}{marker} {}", entry.description());
        } else {
            println!("{name}{marker}");
        }
        if all || args.attributes {
            println!("  attributes: 0x{:08X}", entry.attributes());
        }
        if all || args.path {
            for i in 0..entry.paths().len() {
                println!("  path: {}", entry.path_text(i).expect("index in range"));
            }
        }
        if (all && !entry.data().is_empty()) || args.data {
            let encoded = base64::engine::general_purpose::STANDARD.encode(entry.data());
            println!("  data: {encoded}");
        }
    }
    Ok(())
}

fn add(args: AddCommand) -> Result<()> {
    let mut entry = BootEntry::new(args.class);
    if let Some(name) = &args.name {
        let (class, index) = parse_name(name)?;
        if class != args.class {
            bail!("--name {name} does not belong to the {} class", args.class.prefix());
        }
        entry.set_index(Some(index));
    }
    if let Some(description) = &args.description {
        entry.set_description(description.as_str());
    }
    if !args.paths.is_empty() {
        let texts: Vec<&str> = args.paths.iter().map(String::as_str).collect();
        entry
            .set_paths_text(&texts)
            .context("Failed to parse --path")?;
    }
    if let Some(attributes) = args.attributes {
        entry.set_attributes(attributes);
    }
    if let Some(data) = &args.data {
        entry.set_data(decode_data(data)?);
    }

    let manager = manager();
    let mut entries = manager
        .load_all(args.class)
        .context("Failed to load the entry list")?;
    let position = args.position.unwrap_or(entries.len()).min(entries.len());
    entries.insert(position, entry);
    manager
        .save_all(args.class, &mut entries)
        .context("Failed to save the entry list")?;

    let name = entries[position]
        .variable_name()
        .expect("saved entries have an index");
    log::info!("Added {name} at position {position}");
    Ok(())
}

fn modify(args: ModCommand) -> Result<()> {
    let (class, index) = parse_name(&args.name)?;
    let manager = manager();
    let mut entry = manager
        .load(class, index)
        .with_context(|| format!("Failed to load {}", args.name))?;

    if let Some(description) = &args.description {
        entry.set_description(description.as_str());
    }
    if !args.paths.is_empty() {
        let texts: Vec<&str> = args.paths.iter().map(String::as_str).collect();
        entry
            .set_paths_text(&texts)
            .context("Failed to parse --path")?;
    }
    if let Some(attributes) = args.attributes {
        entry.set_attributes(attributes);
    }
    if let Some(data) = &args.data {
        entry.set_data(decode_data(data)?);
    }

    if entry.is_modified() {
        manager
            .save(&mut entry)
            .with_context(|| format!("Failed to save {}", args.name))?;
        log::info!("Updated {}", args.name);
    } else {
        log::info!("{} is unchanged", args.name);
    }
    Ok(())
}

fn del(args: DelCommand) -> Result<()> {
    let (class, index) = parse_name(&args.name)?;
    let manager = manager();
    manager
        .remove(class, index)
        .with_context(|| format!("Failed to delete {}", args.name))?;
    log::info!("Deleted {}", args.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_variable_names() {
        assert_eq!(
            parse_name("Boot0001").unwrap(),
            (OptionClass::Boot, 0x0001)
        );
        assert_eq!(
            parse_name("SysPrep00FF").unwrap(),
            (OptionClass::SysPrep, 0x00FF)
        );
        assert!(parse_name("Boot1").is_err());
        assert!(parse_name("Rescue0001").is_err());
        assert!(parse_name("BootOrder").is_err());
    }

    #[test]
    fn parses_attribute_words() {
        assert_eq!(parse_attributes("9").unwrap(), 9);
        assert_eq!(parse_attributes("0x9").unwrap(), 9);
        assert!(parse_attributes("banana").is_err());
    }
}
