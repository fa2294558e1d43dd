use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use site_backend::auth::hash_password;
use site_backend::db::{Connector, Filter};
use site_backend::lifecycle::startup::{build_connector, init_observability, load_settings};
use site_backend::models::{Admin, AdminRole};
use site_backend::repository::Repository;
use site_backend::seed;

#[derive(Parser)]
#[command(name = "site-cli")]
#[command(about = "Maintenance CLI for the site backend", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "SITE_CONFIG")]
    config: Option<PathBuf>,

    /// Seconds to wait for the database before giving up.
    #[arg(long, default_value_t = 30)]
    wait_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the default superadmin from ADMIN_EMAIL / ADMIN_PASSWORD
    InitAdmin,
    /// Replace services, products, blogs and settings with the bundled data
    Seed,
    /// Query a running server's health endpoint
    Health {
        #[arg(short, long, default_value = "http://localhost:5000")]
        url: String,
    },
}

const DEFAULT_ADMIN_EMAIL: &str = "admin@anergia.com";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Health { url } => health(&url).await,
        Commands::InitAdmin => {
            let connector = open_store(cli.config, cli.wait_secs).await?;
            let result = init_admin(&connector).await;
            connector.close().await?;
            result
        }
        Commands::Seed => {
            let connector = open_store(cli.config, cli.wait_secs).await?;
            let result = run_seed(&connector).await;
            connector.close().await?;
            result
        }
    }
}

async fn open_store(
    config: Option<PathBuf>,
    wait_secs: u64,
) -> Result<Connector, Box<dyn std::error::Error>> {
    let config = load_settings(config.as_deref())?;
    init_observability(&config);

    let connector = build_connector(&config);
    connector.connect().await?;
    if !connector
        .wait_for_connection(Duration::from_secs(wait_secs))
        .await
    {
        connector.close().await?;
        return Err(format!("database not reachable (state: {})", connector.state()).into());
    }
    println!("Connected to database");
    Ok(connector)
}

async fn init_admin(connector: &Connector) -> Result<(), Box<dyn std::error::Error>> {
    let email = std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string());
    let password =
        std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());

    let admins = Repository::<Admin>::new(connector.driver().clone());
    let email = email.trim().to_lowercase();
    if let Some(existing) = admins
        .find_one(&Filter::new().eq("email", email.as_str()))
        .await?
    {
        println!("Admin user already exists");
        println!("Email: {}", existing.inner.email);
        return Ok(());
    }

    let admin = admins
        .insert(Admin {
            email,
            password: hash_password(&password).await?,
            role: AdminRole::Superadmin,
            ..Admin::default()
        })
        .await?;

    println!("Default admin created");
    println!("Email: {}", admin.inner.email);
    println!("Password: {}", password);
    println!("Change the password after first login.");
    Ok(())
}

async fn run_seed(connector: &Connector) -> Result<(), Box<dyn std::error::Error>> {
    let data = seed::bundled()?;
    let summary = seed::seed(connector.driver(), data).await?;

    println!("Seeding completed");
    println!("- Services: {}", summary.services);
    println!("- Products: {}", summary.products);
    println!("- Blogs: {}", summary.blogs);
    println!("- Settings: {}", summary.settings);
    Ok(())
}

async fn health(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let res = reqwest::get(format!("{}/health", url.trim_end_matches('/'))).await?;
    let status = res.status();
    let body: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);

    if !status.is_success() {
        return Err(format!("health check returned {}", status).into());
    }
    Ok(())
}
