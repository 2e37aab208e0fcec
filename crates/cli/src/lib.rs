pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "coindash",
    about = "CoinDash leaderboard bot operator CLI",
    long_about = "Inspect configuration, check Telegram and score store readiness, and preview the leaderboard reply.",
    after_help = "Examples:\n  coindash doctor --json\n  coindash config\n  coindash leaderboard"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Telegram token, and score store connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Query the score store once and print the exact /leaderboard reply")]
    Leaderboard,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Leaderboard => commands::leaderboard::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
