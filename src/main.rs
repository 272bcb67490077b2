use axum::extract::FromRef;
use clap::{Parser, Subcommand};

mod app;
mod auth;
mod config;
mod dates;
mod error;
mod extract;
mod ledger;
mod mail;
mod rate_limit;
mod records;
mod state;
#[cfg(test)]
mod testing;
mod users;

use crate::{auth::services::AuthWorkflow, config::AppConfig, state::AppState};

#[derive(Parser)]
#[command(name = "fintrack", about = "Personal finance tracker API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create a verified administrator account.
    CreateAdmin {
        #[arg(long, env = "ADMIN_NAME", default_value = "Admin")]
        name: String,
        #[arg(long, env = "ADMIN_EMAIL")]
        email: String,
        #[arg(long, env = "ADMIN_PASSWORD")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "fintrack=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let app_state = AppState::init(config).await?;

    sqlx::migrate!("./migrations").run(&app_state.db).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => app::serve(app::build_app(app_state)).await,
        Command::CreateAdmin {
            name,
            email,
            password,
        } => {
            let user = AuthWorkflow::from_ref(&app_state)
                .create_admin(&name, &email, &password)
                .await?;
            tracing::info!(user_id = %user.id, email = %user.email, "admin account ready");
            Ok(())
        }
    }
}
