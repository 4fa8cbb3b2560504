//! `percolate` - read a journal and everything it includes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libpercolate::{JournalParser, ParseOptions};
use log::debug;

use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "percolate", version, about = "Plain text journal reader")]
struct Cli {
    /// Journal file to read
    #[arg(short, long, env = "LEDGER_FILE")]
    file: PathBuf,

    /// Reject postings that appear before any transaction header
    #[arg(long)]
    strict: bool,

    /// Parser option as key=value, may be repeated
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    options: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the top level account categories, in order of first use
    Accounts,
    /// Print the parsed journal back out
    Print,
}

fn parse_options(cli: &Cli) -> Result<ParseOptions> {
    let mut options = ParseOptions::new().strict_postings(cli.strict);
    for option in &cli.options {
        let (key, val) = option
            .split_once('=')
            .with_context(|| format!("option `{}' is not in key=value form", option))?;
        options
            .set(key.trim(), val.trim())
            .with_context(|| format!("invalid option `{}'", option))?;
    }
    Ok(options)
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let options = parse_options(&cli)?;
    debug!("reading {} with {:?}", cli.file.display(), options);

    let journal = JournalParser::new(options)
        .parse_file(&cli.file)
        .with_context(|| format!("failed to parse {}", cli.file.display()))?;

    match cli.command {
        Command::Accounts => {
            for account in journal.top_level_accounts() {
                println!("{}", account);
            }
        }
        Command::Print => print!("{}", journal),
    }

    Ok(())
}
