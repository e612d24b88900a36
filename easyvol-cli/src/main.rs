//! easyvol - association backend CLI
//!
//! Subcommands:
//! - `serve`: run the HTTP API server
//! - `migrate`: apply the schema and seed the permission catalog
//! - `create-admin`: create a user holding every permission

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use easyvol_core::{Action, EasyvolConfig, Module};
use easyvol_server::auth::password::{generate_salt, hash_password};
use easyvol_server::db::repos::{UserInput, UserRepo};
use easyvol_server::db::{self, create_pool_with_options, PgPool};
use easyvol_server::http::server::{run_server, ServerConfig};
use easyvol_server::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "easyvol",
    author,
    version,
    about = "Volunteer association backend: registries, fleet, warehouse, exports and printing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(ServeArgs),
    /// Apply schema migrations and seed the permission catalog
    Migrate,
    /// Create a user with every permission granted
    CreateAdmin(CreateAdminArgs),
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Override the configured bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the configured bind port
    #[arg(long)]
    port: Option<u16>,

    /// Allow any CORS origin (development only)
    #[arg(long)]
    cors_permissive: bool,
}

#[derive(clap::Args, Debug)]
struct CreateAdminArgs {
    /// Login name for the new account
    username: String,

    /// Initial password (at least 8 characters)
    #[arg(long)]
    password: String,

    /// Display name; defaults to the username
    #[arg(long)]
    display_name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    let cli = Cli::parse();
    let config = EasyvolConfig::load()?;

    match cli.command {
        Commands::Serve(args) => serve(config, args).await,
        Commands::Migrate => migrate(config).await,
        Commands::CreateAdmin(args) => create_admin(config, args).await,
    }
}

async fn connect(config: &EasyvolConfig) -> Result<PgPool> {
    let url = config.database_url()?;
    create_pool_with_options(&url, config.database.max_connections)
        .await
        .context("Failed to connect to the database")
}

async fn serve(config: EasyvolConfig, args: ServeArgs) -> Result<()> {
    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let bind_addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid bind address")?;

    let server_config = ServerConfig {
        bind_addr,
        cors_permissive: args.cors_permissive || config.server.cors_permissive,
    };

    let pool = connect(&config).await?;
    let state = AppState::new(pool, config);
    run_server(state, server_config).await?;
    Ok(())
}

async fn migrate(config: EasyvolConfig) -> Result<()> {
    let pool = connect(&config).await?;
    db::migrations::run(&pool).await?;
    println!("Migrations applied");
    Ok(())
}

async fn create_admin(config: EasyvolConfig, args: CreateAdminArgs) -> Result<()> {
    if args.password.len() < 8 {
        anyhow::bail!("password must be at least 8 characters");
    }

    let pool = connect(&config).await?;
    db::migrations::run(&pool).await?;

    let salt = generate_salt();
    let hash = hash_password(&salt, &args.password);
    let input = UserInput {
        username: args.username.clone(),
        display_name: args.display_name.unwrap_or_else(|| args.username.clone()),
        email: None,
        role_id: None,
        active: true,
    };

    let repo = UserRepo::new(&pool);
    let user = repo.create(&input, &hash, &salt).await?;

    // Admins get every module/action pair as direct grants
    let grants: Vec<(Module, Action)> = Module::ALL
        .into_iter()
        .flat_map(|module| Action::ALL.into_iter().map(move |action| (module, action)))
        .collect();
    repo.replace_user_permissions(user.id, &grants).await?;

    println!(
        "Created admin '{}' with {} permission grants",
        user.username,
        grants.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_accepts_overrides() {
        let cli = Cli::parse_from([
            "easyvol",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--cors-permissive",
        ]);
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
                assert_eq!(args.port, Some(8080));
                assert!(args.cors_permissive);
            }
            _ => panic!("expected serve"),
        }
    }
}
