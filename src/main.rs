//! Binary entry point for the taxi service.
//!
//! Runs the web server and the administrative commands that seed the
//! database.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stdout/print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use taxi_service::models::NewDriver;
use taxi_service::storage::migrations;
use taxi_service::{Database, EntityStore, SessionStore, TaxiConfig, UserDirectory, observability};

/// Taxi Service - manage drivers, cars and manufacturers.
#[derive(Parser)]
#[command(name = "taxi")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the web server.
    Serve {
        /// Address to bind.
        #[arg(long)]
        host: Option<String>,

        /// Port to bind.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create or upgrade the database schema.
    Migrate,

    /// Manage manufacturers.
    Manufacturer {
        #[command(subcommand)]
        action: ManufacturerAction,
    },

    /// Manage cars.
    Car {
        #[command(subcommand)]
        action: CarAction,
    },

    /// Manage drivers.
    Driver {
        #[command(subcommand)]
        action: DriverAction,
    },

    /// Delete expired sessions.
    PurgeSessions,
}

#[derive(Subcommand)]
enum ManufacturerAction {
    /// Register a manufacturer.
    Add {
        /// Unique name.
        name: String,
        /// Country of origin.
        country: String,
    },
}

#[derive(Subcommand)]
enum CarAction {
    /// Register a car.
    Add {
        /// Model name.
        model: String,
        /// Name of an existing manufacturer.
        #[arg(short, long)]
        manufacturer: String,
    },
}

#[derive(Subcommand)]
enum DriverAction {
    /// Register a driver account.
    Add {
        /// Login name.
        username: String,
        /// Driving license number.
        #[arg(short, long)]
        license: String,
        /// Given name.
        #[arg(long, default_value = "")]
        first_name: String,
        /// Family name.
        #[arg(long, default_value = "")]
        last_name: String,
        /// Password (at least 8 characters).
        #[arg(long, env = "TAXI_DRIVER_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match TaxiConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, mut config: TaxiConfig) -> anyhow::Result<()> {
    match command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            cmd_serve(config).await
        },
        Commands::Migrate => cmd_migrate(&config),
        Commands::Manufacturer {
            action: ManufacturerAction::Add { name, country },
        } => cmd_manufacturer_add(&config, &name, &country),
        Commands::Car {
            action: CarAction::Add {
                model,
                manufacturer,
            },
        } => cmd_car_add(&config, &model, &manufacturer),
        Commands::Driver {
            action:
                DriverAction::Add {
                    username,
                    license,
                    first_name,
                    last_name,
                    password,
                },
        } => {
            let new_driver =
                NewDriver::new(username, password, license).with_names(first_name, last_name);
            cmd_driver_add(&config, &new_driver)
        },
        Commands::PurgeSessions => cmd_purge_sessions(&config),
    }
}

fn open_database(config: &TaxiConfig) -> anyhow::Result<Database> {
    Database::open(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))
}

async fn cmd_serve(config: TaxiConfig) -> anyhow::Result<()> {
    let _metrics = observability::install_prometheus(&config.metrics)
        .context("starting the Prometheus exporter")?;
    taxi_service::web::serve(&config).await?;
    Ok(())
}

fn cmd_migrate(config: &TaxiConfig) -> anyhow::Result<()> {
    let db = open_database(config)?;
    let version = db.schema_version()?;
    println!(
        "Database {} at schema version {version} (latest {})",
        config.database_path.display(),
        migrations::latest_version()
    );
    Ok(())
}

fn cmd_manufacturer_add(config: &TaxiConfig, name: &str, country: &str) -> anyhow::Result<()> {
    let store = EntityStore::new(open_database(config)?);
    let manufacturer = store.insert_manufacturer(name, country)?;
    println!("Added manufacturer {} (id {})", manufacturer.name, manufacturer.id);
    Ok(())
}

fn cmd_car_add(config: &TaxiConfig, model: &str, manufacturer: &str) -> anyhow::Result<()> {
    let store = EntityStore::new(open_database(config)?);
    let Some(maker) = store.manufacturer_by_name(manufacturer)? else {
        bail!("no manufacturer named '{manufacturer}'");
    };
    let car = store.insert_car(model, maker.id)?;
    println!("Added car {} by {} (id {})", car.model, car.manufacturer_name, car.id);
    Ok(())
}

fn cmd_driver_add(config: &TaxiConfig, new_driver: &NewDriver) -> anyhow::Result<()> {
    let users =
        UserDirectory::new(open_database(config)?).with_hash_cost(config.password_hash_cost);
    let driver = users.register(new_driver)?;
    println!("Added driver {} (id {})", driver.username, driver.id);
    Ok(())
}

fn cmd_purge_sessions(config: &TaxiConfig) -> anyhow::Result<()> {
    let sessions = SessionStore::new(open_database(config)?).with_ttl(config.session_ttl);
    let removed = sessions.purge_expired()?;
    println!("Removed {removed} expired session(s)");
    Ok(())
}
