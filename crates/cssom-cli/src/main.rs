use clap::{Parser, Subcommand};
use std::path::Path;

use cssom_parser::{ParseOptions, StyleSheet};

#[derive(Parser)]
#[command(name = "cssom")]
#[command(about = "cssom — CSS object model parser")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a CSS file and print its rule tree as JSON
    Parse {
        /// Input .css file
        path: String,

        /// Record errors and print a best-effort tree instead of aborting
        #[arg(long)]
        silent: bool,

        /// Source label stamped onto spans and errors (defaults to the path)
        #[arg(long)]
        source: Option<String>,
    },

    /// Check a CSS file for parse errors without printing the tree
    Check {
        /// Input .css file
        path: String,

        /// Report every error instead of stopping at the first
        #[arg(long)]
        silent: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Parse {
            path,
            silent,
            source,
        } => cmd_parse(&path, silent, source),
        Command::Check { path, silent } => cmd_check(&path, silent),
    }
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(css) => css,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn parse_sheet(path: &str, silent: bool, source: Option<String>) -> StyleSheet {
    let css = read_source(path);
    let options = ParseOptions {
        source: source.or_else(|| Some(path.to_string())),
        silent,
        owner: None,
    };
    match cssom_parser::parse(&css, options) {
        Ok(sheet) => sheet,
        Err(e) => {
            eprintln!("Parse error: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_parse(path: &str, silent: bool, source: Option<String>) {
    let sheet = parse_sheet(path, silent, source);

    for err in sheet.errors() {
        eprintln!("Parse error: {err}");
    }

    match serde_json::to_string_pretty(&sheet) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_check(path: &str, silent: bool) {
    let sheet = parse_sheet(path, silent, None);

    if !sheet.errors().is_empty() {
        for err in sheet.errors() {
            eprintln!("Parse error: {err}");
        }
        std::process::exit(1);
    }

    eprintln!("OK: {path}");
}
