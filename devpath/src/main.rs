mod cli;

use clap::Parser;

use cli::Cli;

fn main() {
    Cli::parse().call(module_path!())
}
