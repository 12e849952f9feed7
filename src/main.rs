//! callmap: load static call-graph extractor output into SQLite
//!
//! Usage:
//!   callmap load <input> [options]   Load an extractor output pair
//!   callmap status [options]         Show per-table row counts

use std::env;

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use callmap::cli::{load_command, load_config_file, read_prefix_file, status_command};
use callmap::LoadConfig;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "load" => {
            let debug = args.iter().any(|a| a == "--debug");
            setup_logging(debug);
            let config = parse_load_args(&args[2..])?;
            load_command(&config)?;
        }
        "status" => {
            let db_path = flag_value(&args, "--db").unwrap_or("callmap.db");
            let app_name = flag_value(&args, "--app").unwrap_or("app");
            status_command(db_path, app_name)?;
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "--version" | "-V" | "version" => {
            print_version();
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
        }
    }

    Ok(())
}

/// Build the load configuration from a positional input path plus flags,
/// starting from a config file when one is given.
fn parse_load_args(args: &[String]) -> Result<LoadConfig> {
    let mut config = match flag_value_owned(args, "--config") {
        Some(path) => load_config_file(path)?,
        None => LoadConfig::default(),
    };

    if let Some(input) = positional_arg(args) {
        config.input_file = input;
    }
    if let Some(app) = flag_value_owned(args, "--app") {
        config.app_name = app;
    }
    if let Some(db) = flag_value_owned(args, "--db") {
        config.db_path = db;
    }
    if let Some(prefix_file) = flag_value_owned(args, "--prefixes") {
        config.allowed_prefixes = read_prefix_file(prefix_file)?;
        config.filter_packages = true;
    }

    Ok(config)
}

/// First argument that is neither a flag nor a flag's value.
fn positional_arg(args: &[String]) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == "--debug" {
            i += 1;
        } else if arg.starts_with("--") {
            i += 2;
        } else {
            return Some(arg.clone());
        }
    }
    None
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn flag_value_owned(args: &[String], flag: &str) -> Option<String> {
    flag_value(args, flag).map(str::to_string)
}

fn print_usage() {
    println!(
        r#"callmap: load static call-graph extractor output into SQLite

USAGE:
    callmap <COMMAND> [OPTIONS]

COMMANDS:
    load <input>           Load an extractor output file (and its sibling
                           <input>-annotation.txt) into the database
    status                 Show per-table row counts
    help                   Show this help message

OPTIONS (load):
    --app <name>           Application identifier, suffixed onto table names
    --db <path>            Database file (default: callmap.db)
    --prefixes <file>      Allowed package prefixes, one per line; enables
                           package filtering
    --config <file>        JSON config file; flags override its values
    --debug                Verbose logging

EXAMPLES:
    callmap load callgraph.txt --app orders
    callmap load callgraph.txt --prefixes kept-packages.txt
    callmap status --db callmap.db --app orders
"#
    );
}

fn print_version() {
    println!("callmap {}", env!("CARGO_PKG_VERSION"));
}

fn setup_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}
