pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "cobuy",
    about = "Cobuy operator CLI",
    long_about = "Prepare the storefront database, load demo data, and inspect the current \"frequently bought together\" recommendation.",
    after_help = "Examples:\n  cobuy migrate\n  cobuy seed\n  cobuy recommend\n  cobuy config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo storefront and verify its expected winner")]
    Seed,
    #[command(about = "Scan completed orders and print the current buy-together view-model")]
    Recommend,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Recommend => commands::recommend::run(),
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
