use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use pagetally::auth::password;
use pagetally::config::Config;
use pagetally::models::generate_id;
use pagetally::storage::{SqliteStorage, Storage, StorageError};

#[derive(Parser)]
#[command(name = "pagetally-admin")]
#[command(about = "Pagetally admin management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user account
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Grant admin rights regardless of account order
        #[arg(long, default_value_t = false)]
        admin: bool,
    },
    /// List all projects
    ListProjects,
    /// Delete expired sessions now instead of waiting for the daily sweep
    SweepSessions,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = Arc::new(
        SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
    );

    // Ensure database is initialized
    storage.init().await?;

    match cli.command {
        Commands::CreateUser {
            email,
            password: raw_password,
            admin,
        } => {
            let has_users = storage.has_users().await?;
            let password_hash = password::hash_password(&raw_password)?;
            // First account is always the admin
            let is_admin = admin || !has_users;

            match storage
                .insert_user(&generate_id(), email.trim(), &password_hash, is_admin)
                .await
            {
                Ok(user) => {
                    println!(
                        "✓ Created user '{}'{}",
                        user.email,
                        if user.is_admin { " (admin)" } else { "" }
                    );
                }
                Err(StorageError::Conflict) => {
                    println!("⚠ A user with email '{}' already exists", email);
                }
                Err(StorageError::Other(err)) => return Err(err),
            }
        }
        Commands::ListProjects => {
            let projects = storage.list_projects().await?;
            if projects.is_empty() {
                println!("No projects found.");
            } else {
                println!("{:<34} {:<24} {}", "Project ID", "Name", "Base URL");
                println!("{}", "-".repeat(80));
                for project in projects {
                    println!(
                        "{:<34} {:<24} {}",
                        project.project_id, project.name, project.base_url
                    );
                }
            }
        }
        Commands::SweepSessions => {
            let now = chrono::Utc::now().timestamp();
            let removed = storage.delete_expired_sessions(now).await?;
            println!("✓ Removed {} expired sessions", removed);
        }
    }

    Ok(())
}
