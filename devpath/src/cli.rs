use std::io::{Read, Write};

use anyhow::{Context, Result};
use clap::Parser;

use efiboot::DevicePath;

/// The default log level.
///
/// 2 corresponds to the level INFO.
const DEFAULT_LOG_LEVEL: usize = 2;

/// Round-trip a UEFI device path between its binary and textual forms.
///
/// Without `-t`, one binary device path is read from stdin and its text
/// form is written to stdout. With `-t TEXT`, the conversion runs the other
/// way and the binary path is written to stdout.
#[derive(Parser)]
pub struct Cli {
    /// Use the shorter display-only text forms
    #[arg(short = 'd', long)]
    display: bool,

    /// Use shortcut text forms for well-known nodes
    #[arg(short = 's', long)]
    shortcuts: bool,

    /// Convert TEXT to a binary device path instead
    #[arg(short = 't', long, value_name = "TEXT")]
    text: Option<String>,

    /// Silence all output
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode (-v, -vv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
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

        if let Err(e) = self.run() {
            log::error!("{e:#}");
            std::process::exit(1);
        };
    }

    fn run(self) -> Result<()> {
        match &self.text {
            Some(text) => {
                let path =
                    DevicePath::from_text(text, false).context("Failed to parse device path text")?;
                std::io::stdout()
                    .write_all(path.as_bytes())
                    .context("Failed to write the binary device path")?;
            }
            None => {
                let mut bytes = Vec::new();
                std::io::stdin()
                    .read_to_end(&mut bytes)
                    .context("Failed to read a binary device path from stdin")?;
                let path =
                    DevicePath::parse(&bytes).context("Failed to parse the binary device path")?;
                println!("{}", path.to_text(self.display, self.shortcuts));
            }
        }
        Ok(())
    }
}
