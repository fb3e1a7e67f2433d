//! `retec` command-line entry point (gated behind the `cli` feature),
//! mirroring the teacher's `clap`-derive `Cli`/`Commands` shape
//! (`src/cli.rs`) and `env_logger::init()` wiring.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{scan_all, AtomInterner, TokenKind};

#[derive(Parser)]
#[command(name = "retec")]
#[command(about = "Front-end compiler for a CLIPS-family rule base", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Tokenize a source file and print each token.
    Scan {
        /// Path to the rule-base source file.
        file: PathBuf,
    },
}

/// Entry point invoked from `main`.
pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Scan { file } => cmd_scan(&file),
    }
}

fn cmd_scan(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(path)?;
    let mut atoms = AtomInterner::new();
    let tokens = scan_all(&source, &mut atoms)?;

    for token in &tokens {
        if matches!(token.kind, TokenKind::Stop) {
            break;
        }
        log::debug!("token at {:?}: {:?}", token.span, token.kind);
        println!("{:<24} {}", format!("{:?}", token.kind), token.print_form);
    }

    println!("{} tokens", tokens.len().saturating_sub(1));
    Ok(())
}
