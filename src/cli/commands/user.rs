use std::sync::Arc;

use clap::Subcommand;
use serde_json::json;

use crate::auth::{Registration, StoreAuthenticator};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::Store;
use crate::types::Role;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create an account with any role")]
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long = "first-name")]
        first_name: String,
        #[arg(long = "last-name")]
        last_name: String,
        #[arg(long, default_value = "student", help = "admin, teacher or student")]
        role: Role,
    },
}

pub async fn handle(cmd: UserCommands, store: Arc<dyn Store>, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Add {
            email,
            password,
            first_name,
            last_name,
            role,
        } => {
            let registration = Registration {
                email,
                password,
                first_name,
                last_name,
            };
            let user = StoreAuthenticator::new(store).register(registration, role).await?;
            output_success(
                output_format,
                &format!("Created {} {} ({})", user.role, user.email, user.id),
                Some(json!(user.identity())),
            )
        }
    }
}
