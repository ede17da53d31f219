pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "tabula",
    about = "Tabula operator CLI",
    long_about = "Operate Tabula migrations, demo fixtures, readiness checks, and guardrail dry runs.",
    after_help = "Examples:\n  tabula doctor --json\n  tabula migrate\n  tabula check \"show me the top products\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load deterministic demo fixtures into the configured database")]
    Seed,
    #[command(about = "Validate config, LLM readiness, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Dry-run a text against the input guardrails and the SQL validator")]
    Check {
        #[arg(help = "Question or SQL text to evaluate")]
        text: String,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Check { text, json } => commands::check::run(&text, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
