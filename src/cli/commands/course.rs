use std::sync::Arc;

use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_empty_collection, truncate};
use crate::cli::OutputFormat;
use crate::database::Store;
use crate::services::CourseCatalog;

#[derive(Subcommand)]
pub enum CourseCommands {
    #[command(about = "List courses with their prerequisites")]
    List,
}

pub async fn handle(cmd: CourseCommands, store: Arc<dyn Store>, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        CourseCommands::List => {
            let courses = CourseCatalog::new(store).list().await?;
            if courses.is_empty() {
                return output_empty_collection(output_format, "courses", "No courses defined");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "courses": courses }))?);
                }
                OutputFormat::Text => {
                    println!("{:<36} {:<10} {:<30} {}", "ID", "CODE", "TITLE", "REQUIRES");
                    println!("{}", "-".repeat(100));
                    for course in &courses {
                        let requires: Vec<&str> = course.prerequisites.iter().map(|p| p.title.as_str()).collect();
                        println!(
                            "{:<36} {:<10} {:<30} {}",
                            course.id,
                            course.code.as_deref().unwrap_or("-"),
                            truncate(&course.title, 30),
                            requires.join(", ")
                        );
                    }
                }
            }
            Ok(())
        }
    }
}
