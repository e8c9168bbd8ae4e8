use catalog_assist::Result;
use catalog_assist::commands::{ingest_catalog, match_cart, show_config};
use catalog_assist::config::Config;
use clap::{Parser, Subcommand};
use console::style;
use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "catalog-assist")]
#[command(about = "Product catalog ingestion into Cosmos DB and cart matching with Azure OpenAI")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upsert every row of the product catalog into Cosmos DB
    Ingest {
        /// Catalog CSV to load instead of the configured one
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Ask the completion model which products a cart request refers to
    Match {
        /// The shopper's request, e.g. "add two tins of jade paint"
        #[arg(long)]
        question: String,
        /// JSON file holding an array of candidate product objects
        #[arg(long)]
        products: PathBuf,
    },
    /// Show the effective configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Print the configuration as TOML, secrets masked
        #[arg(long)]
        toml: bool,
    },
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest { csv } => {
            ingest_catalog(&config, csv.as_deref())?;
        }
        Commands::Match { question, products } => {
            match_cart(&config, &question, &products)?;
        }
        Commands::Config { show, toml } => {
            if toml {
                print!("{}", config.masked().to_toml()?);
            } else if show {
                show_config(&config, cli.config.as_deref())?;
            } else {
                println!("Use 'catalog-assist config --show' to display the configuration.");
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").bold().red(), e);
            // the top-level message already embeds its direct cause
            let mut source = e.source().and_then(|inner| inner.source());
            while let Some(cause) = source {
                eprintln!("  {} {}", style("caused by:").dim(), cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
