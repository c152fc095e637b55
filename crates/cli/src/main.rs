//! vidly - rental store API
//!
//! Serves the API and offers a few operator commands against the same configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use vidly_app::{AppContext, Application};
use vidly_authz::Principal;
use vidly_db::{Database, ObjectId};
use vidly_kernel::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "vidly")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API until interrupted
    Serve,

    /// Apply pending schema migrations and list every known migration
    Migrations,

    /// Print a signed credential for a user
    IssueToken {
        /// Id of the user the credential is issued for
        #[arg(long)]
        user_id: ObjectId,

        /// Grant administrator rights
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("failed to load vidly settings")?;
    vidly_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Commands::Serve => serve(settings).await,
        Commands::Migrations => migrate(&settings).await,
        Commands::IssueToken { user_id, admin } => issue_token(&settings, user_id, admin).await,
    }
}

async fn serve(settings: Settings) -> Result<()> {
    tracing::info!(env = ?settings.environment, "starting vidly");
    Application::build(settings).await?.run().await
}

async fn migrate(settings: &Settings) -> Result<()> {
    let db = Database::connect(&settings.database.db_config())
        .await
        .context("failed to open database")?;

    for (version, description) in vidly_db::migrations::list() {
        println!("{version:>4}  {description}");
    }

    db.close().await;
    Ok(())
}

async fn issue_token(settings: &Settings, user_id: ObjectId, admin: bool) -> Result<()> {
    settings.validate()?;
    let ctx = AppContext::from_settings(settings).await?;

    let token = ctx
        .tokens
        .issue(&Principal {
            user_id,
            is_admin: admin,
        })
        .context("failed to sign credential")?;

    println!("{token}");
    Ok(())
}
