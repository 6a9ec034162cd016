//! Looks Lab CLI - Database migrations and question seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! looks-lab-cli migrate
//!
//! # Load onboarding and domain questions
//! looks-lab-cli seed questions --file crates/cli/seeds/questions.yaml
//! ```
//!
//! Both commands read `DATABASE_URL` (a `.env` file is honoured).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "looks-lab-cli")]
#[command(author, version, about = "Looks Lab CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert onboarding and domain questions from a YAML file
    Questions {
        /// Path to the questions file
        #[arg(short, long, default_value = "crates/cli/seeds/questions.yaml")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Questions { file } => commands::seed::questions(&file).await?,
        },
    }
    Ok(())
}
