use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::{Parser, ValueEnum};
use securyflex::{
    AuthConfig, AuthServiceBuilder, InMemoryIdentityProvider, InMemoryProfileStore,
    validate_password_detailed,
};
use securyflex_core::validation::{
    IdentifierValidation, strength_label, validate_beveiligingspas_number_detailed,
    validate_dutch_postal_code_detailed, validate_kvk_detailed, validate_wpbr_number_detailed,
};
use tracing_subscriber::EnvFilter;

/// Command line interface for the SecuryFlex auth core
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum IdentifierKind {
    /// KvK (Chamber of Commerce) number
    Kvk,
    /// Dutch postal code
    Postal,
    /// WPBR permit number
    Wpbr,
    /// Beveiligingspas number
    Pas,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Check a password against the password policy and score its strength
    CheckPassword { password: String },
    /// Validate and format a Dutch business identifier
    Validate {
        #[arg(value_enum)]
        kind: IdentifierKind,
        value: String,
    },
    /// Run a login against in-memory providers
    LoginDemo {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Seed a verified account with these credentials before logging in
        #[arg(long)]
        seed: bool,
    },
    /// Print version information
    Version,
}

fn print_identifier(result: &IdentifierValidation, json: bool) -> ExitCode {
    if json {
        println!("{}", serde_json::to_string_pretty(result).unwrap_or_default());
    } else if let Some(formatted) = &result.formatted {
        println!("Geldig: {formatted}");
    } else {
        for error in &result.errors {
            println!("Ongeldig: {error}");
        }
    }
    if result.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn login_demo(
    email: &str,
    password: &str,
    config: Option<PathBuf>,
    seed: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = match config {
        Some(path) => AuthConfig::from_file(path)?,
        None => AuthConfig::default(),
    }
    .with_env_overrides()?;

    let identity = Arc::new(InMemoryIdentityProvider::new());
    if seed {
        identity.add_user(email, password, true);
    }

    let auth = AuthServiceBuilder::new()
        .with_config(config)
        .with_providers(identity, Arc::new(InMemoryProfileStore::new()))
        .build()
        .await?;

    let result = auth.login(email, password).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::CheckPassword { password } => {
            let result = validate_password_detailed(&password);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
            } else {
                println!(
                    "Sterkte: {} ({})",
                    result.strength(),
                    strength_label(result.strength())
                );
                for error in result.errors() {
                    println!("- {error}");
                }
            }
            if result.is_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Commands::Validate { kind, value } => {
            let result = match kind {
                IdentifierKind::Kvk => validate_kvk_detailed(&value),
                IdentifierKind::Postal => validate_dutch_postal_code_detailed(&value),
                IdentifierKind::Wpbr => validate_wpbr_number_detailed(&value),
                IdentifierKind::Pas => validate_beveiligingspas_number_detailed(&value),
            };
            print_identifier(&result, cli.json)
        }
        Commands::LoginDemo {
            email,
            password,
            config,
            seed,
        } => match login_demo(&email, &password, config, seed).await {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        },
        Commands::Version => {
            println!("SecuryFlex auth v{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
    }
}
