//! Techmart CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply schema and session-store migrations
//! tm-cli migrate
//!
//! # Load the demo catalog and an admin account
//! tm-cli seed --admin-email admin@techmart.example --admin-password 'change-me-now'
//!
//! # Grant admin rights to an existing customer
//! tm-cli user promote -e someone@example.com
//!
//! # Rebuild sold counts from the inventory ledger
//! tm-cli inventory reconcile
//!
//! # Show stock for one variant
//! tm-cli inventory show -v 42
//! ```
//!
//! All commands read `TECHMART_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tm-cli")]
#[command(author, version, about = "Techmart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with a demo catalog
    Seed {
        /// Also create an admin account with this email
        #[arg(long, requires = "admin_password")]
        admin_email: Option<String>,

        /// Password for the seeded admin account
        #[arg(long)]
        admin_password: Option<String>,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Inventory ledger maintenance
    Inventory {
        #[command(subcommand)]
        action: InventoryAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Give an existing user the admin role
    Promote {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum InventoryAction {
    /// Recompute every variant's sold count from the ledger
    Reconcile,
    /// Show the stock level of a variant
    Show {
        /// Variant ID
        #[arg(short, long)]
        variant: i32,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let pool = commands::connect().await?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&pool).await?,
        Commands::Seed {
            admin_email,
            admin_password,
        } => {
            commands::seed::catalog(&pool).await?;
            if let (Some(email), Some(password)) = (admin_email, admin_password) {
                commands::seed::admin(&pool, &email, &password).await?;
            }
        }
        Commands::User { action } => match action {
            UserAction::Promote { email } => commands::user::promote(&pool, &email).await?,
        },
        Commands::Inventory { action } => match action {
            InventoryAction::Reconcile => commands::inventory::reconcile(&pool).await?,
            InventoryAction::Show { variant } => {
                commands::inventory::show(&pool, variant).await?;
            }
        },
    }
    Ok(())
}
