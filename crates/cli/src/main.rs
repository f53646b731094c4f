//! CNB Carpets CLI - database migrations and user management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! cnb-cli migrate
//!
//! # Create a pending test account
//! cnb-cli user create-test
//!
//! # Assign a role (sends the activation email when leaving Pending)
//! cnb-cli user set-role --uid abc123 --role Manager
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use cnb_core::{Role, UserUid};

mod commands;

#[derive(Parser)]
#[command(name = "cnb-cli")]
#[command(author, version, about = "CNB Carpets admin CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a pending test account
    CreateTest,
    /// Assign a role to a user
    SetRole {
        /// User id (identity provider uid)
        #[arg(short, long)]
        uid: String,

        /// Role (`Admin`, `Manager`, `User - Price`, `User - No Price`, `Pending`)
        #[arg(short, long)]
        role: Role,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::warn!("rustls crypto provider already installed");
    }

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::CreateTest => {
                commands::user::create_test().await?;
            }
            UserAction::SetRole { uid, role } => {
                commands::user::set_role(&UserUid::new(uid), role).await?;
            }
        },
    }
    Ok(())
}
