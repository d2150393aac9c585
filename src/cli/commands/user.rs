use anyhow::Context;
use clap::Subcommand;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::{self, query::USER_SORT, ListQuery, Page};
use crate::services::UserService;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create an account")]
    Create {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password")]
        password: String,
    },

    #[command(about = "List accounts")]
    List {
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },
}

pub async fn handle(
    cmd: UserCommands,
    config: AppConfig,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let db = database::connect(&config.database)
        .await
        .context("failed to open storage")?;

    match cmd {
        UserCommands::Create { email, password } => {
            let user = UserService::new(db, config.security.password_hash_cost)
                .register(&email, &password)
                .await
                .with_context(|| format!("could not create {}", email))?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
                OutputFormat::Text => println!("Created user {} ({})", user.email, user.id),
            }
            Ok(())
        }
        UserCommands::List { limit } => {
            let query = ListQuery {
                limit: Some(limit),
                ..ListQuery::default()
            };
            let page = Page::from_query(&query, &USER_SORT, &config.api)?;
            let users = db.list_users(&page).await?;

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "users": users }))?)
                }
                OutputFormat::Text => {
                    for user in &users {
                        println!("{}\t{}\t{}", user.id, user.email, user.created_at);
                    }
                }
            }
            Ok(())
        }
    }
}
