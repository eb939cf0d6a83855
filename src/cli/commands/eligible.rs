use std::sync::Arc;

use anyhow::anyhow;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::{output_empty_collection, truncate};
use crate::cli::OutputFormat;
use crate::config;
use crate::database::Store;
use crate::services::{EnrollmentCompletion, EnrollmentLedger};
use crate::types::{Requester, Role};

pub async fn handle(email: &str, store: Arc<dyn Store>, output_format: OutputFormat) -> anyhow::Result<()> {
    let student = store
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| anyhow!("No user with email {}", email))?;

    let completion = Arc::new(EnrollmentCompletion::new(
        store.clone(),
        config::config().enrollment.completion_policy,
    ));
    let ledger = EnrollmentLedger::new(store, completion);

    // the CLI acts with admin rights
    let operator = Requester::new(Uuid::nil(), Role::Admin);
    let courses = ledger.eligible_courses(&operator, student.id).await?;

    if courses.is_empty() {
        return output_empty_collection(output_format, "courses", "No eligible courses");
    }
    match output_format {
        OutputFormat::Json => {
            let summaries: Vec<_> = courses.iter().map(|c| c.summary()).collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "courses": summaries }))?);
        }
        OutputFormat::Text => {
            println!("Eligible courses for {} {}:", student.first_name, student.last_name);
            for course in &courses {
                println!("  {:<10} {}", course.code.as_deref().unwrap_or("-"), truncate(&course.title, 60));
            }
        }
    }
    Ok(())
}
