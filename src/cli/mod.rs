pub mod commands;
pub mod utils;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::PgPool;

use crate::config;
use crate::database::{DatabaseManager, PgStore, Store};

#[derive(Parser)]
#[command(name = "siga")]
#[command(about = "SIGA admin CLI - operates directly on the PostgreSQL store")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "User account management")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },

    #[command(about = "Course catalog inspection")]
    Course {
        #[command(subcommand)]
        cmd: commands::course::CourseCommands,
    },

    #[command(about = "List the courses a student is eligible to enroll in")]
    Eligible {
        #[arg(help = "Student email")]
        email: String,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let pool = connect().await?;

    let result = match cli.command {
        Commands::Migrate => {
            DatabaseManager::migrate(&pool).await?;
            utils::output_success(output_format, "Migrations applied", None)
        }
        Commands::User { cmd } => commands::user::handle(cmd, store(&pool), output_format).await,
        Commands::Course { cmd } => commands::course::handle(cmd, store(&pool), output_format).await,
        Commands::Eligible { email } => {
            commands::eligible::handle(&email, store(&pool), output_format).await
        }
    };

    DatabaseManager::close(pool).await;
    result
}

async fn connect() -> anyhow::Result<PgPool> {
    DatabaseManager::connect(&config::config().database)
        .await
        .context("connecting to PostgreSQL (is DATABASE_URL set?)")
}

fn store(pool: &PgPool) -> Arc<dyn Store> {
    Arc::new(PgStore::new(pool.clone()))
}
