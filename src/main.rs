// Main entry point for the queryer CLI
// Runs a single query, or an interactive shell when no query is given

use anyhow::Result;
use clap::Parser as ClapParser;
use queryer::OutputFormat;
use std::io::{self, Write};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

/// queryer - run SQL against CSV and JSON files or URLs
#[derive(ClapParser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQL to execute, e.g. "SELECT * FROM file://./data.json"
    sql: Option<String>,

    /// Execute a single SQL query and exit
    #[arg(short, long, conflicts_with = "sql")]
    execute: Option<String>,

    /// Output format: table, csv or json
    #[arg(short, long, default_value = "table")]
    format: OutputFormat,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing; logs go to stderr so results stay pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("queryer={}", args.log_level))),
        )
        .with_writer(io::stderr)
        .init();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    // If a query was provided, execute it and exit
    if let Some(sql) = args.execute.or(args.sql) {
        return execute_query(&rt, &sql, args.format);
    }

    println!("╔════════════════════════════════════════════╗");
    println!("║         queryer Interactive Shell          ║");
    println!("║     SQL over CSV/JSON files and URLs       ║");
    println!("╚════════════════════════════════════════════╝");
    println!();
    println!("Type SQL queries or '.help' for help");
    println!("Type '.exit' to quit");
    println!();

    repl(&rt, args.format)
}

/// REPL (Read-Eval-Print Loop)
fn repl(rt: &Runtime, mut format: OutputFormat) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("queryer> ");
        stdout.flush()?;

        let mut input = String::new();
        // EOF (Ctrl-D) ends the session
        if stdin.read_line(&mut input)? == 0 {
            println!();
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // Handle special commands (starting with .)
        if input.starts_with('.') {
            let mut parts = input.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(".exit") | Some(".quit"), _) => {
                    println!("Goodbye!");
                    break;
                }
                (Some(".help"), _) => print_help(),
                (Some(".format"), Some(name)) => match name.parse() {
                    Ok(new_format) => {
                        format = new_format;
                        println!("Output format set to {}", format);
                    }
                    Err(e) => eprintln!("Error: {}", e),
                },
                (Some(".format"), None) => println!("Output format is {}", format),
                _ => {
                    println!("Unknown command: {}", input);
                    println!("Type '.help' for help");
                }
            }
            continue;
        }

        if let Err(e) = execute_query(rt, input, format) {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}

/// Run one query and print its result
fn execute_query(rt: &Runtime, sql: &str, format: OutputFormat) -> Result<()> {
    let result = rt.block_on(queryer::query(sql))?;
    println!("{}", result.render(format)?.trim_end());
    Ok(())
}

/// Print help information
fn print_help() {
    println!("Special Commands:");
    println!("  .help              Show this help message");
    println!("  .format [FORMAT]   Show or set the output format (table, csv, json)");
    println!("  .exit, .quit       Exit the shell");
    println!();
    println!("Queries:");
    println!("  SELECT * FROM file://./demos/data.json");
    println!("  SELECT name, age FROM file://./demos/data.json WHERE age >= 18 ORDER BY age DESC");
    println!("  SELECT location name, new_cases FROM https://example.com/latest.csv LIMIT 10");
    println!();
    println!("Notes:");
    println!("  - The FROM clause takes a URL: file://, http:// or https://");
    println!("  - CSV and JSON sources are supported");
    println!("  - WHERE supports comparisons, AND/OR/NOT, LIKE, IN, BETWEEN, IS NULL");
    println!();
}
