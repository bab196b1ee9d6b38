pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use estimo_core::config::LoadOptions;

use crate::commands::transition::{TransitionAction, TransitionArgs};

#[derive(Debug, Parser)]
#[command(
    name = "estimo",
    about = "Estimo quoting CLI",
    long_about = "Price quote records, move them through their approval flow, store them, and report on them.",
    after_help = "Examples:\n  estimo totals quote.json\n  estimo transition quote.json request-adjustment --feedback \"split payment\"\n  estimo report --from 2026-03-01 --to 2026-03-31"
)]
pub struct Cli {
    /// Explicit config file (defaults to estimo.toml or config/estimo.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Compute client-facing totals of a quote record")]
    Totals { file: PathBuf },
    #[command(about = "Compute totals plus cost, profit and margin of a quote record")]
    Profit { file: PathBuf },
    #[command(about = "Apply a status action to a quote record and print the updated record")]
    Transition {
        file: PathBuf,
        #[arg(value_enum)]
        action: TransitionAction,
        #[arg(long, help = "Client feedback for reject or request-adjustment")]
        feedback: Option<String>,
        #[arg(long, help = "Client display name recorded on approve")]
        name: Option<String>,
        #[arg(long, help = "Signature payload recorded by the sign action")]
        signature: Option<String>,
        #[arg(long, help = "Write the updated record back to FILE")]
        write: bool,
    },
    #[command(about = "Save a quote record into the database, assigning id and number")]
    Import { file: PathBuf },
    #[command(about = "List stored quotes, newest first")]
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, help = "pending|approved|rejected|negotiating")]
        status: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    #[command(about = "Revenue, pipeline and conversion over stored quotes")]
    Report {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl Cli {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            ..LoadOptions::default()
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let options = cli.load_options();

    let result = match cli.command {
        Command::Totals { file } => commands::totals::run(&file, options),
        Command::Profit { file } => commands::profit::run(&file, options),
        Command::Transition { file, action, feedback, name, signature, write } => {
            commands::transition::run(
                TransitionArgs { file, action, feedback, name, signature, write },
                options,
            )
        }
        Command::Import { file } => commands::import::run(&file, options),
        Command::List { search, status, page, limit } => {
            commands::list::run(search, status, page, limit, options)
        }
        Command::Report { from, to } => commands::report::run(from, to, options),
        Command::Migrate => commands::migrate::run(options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
