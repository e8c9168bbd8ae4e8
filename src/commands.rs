use anyhow::{Context, Result};
use console::style;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::cart::{CartMatcher, Product};
use crate::config::Config;
use crate::cosmos::{AzureIdentityCredential, CosmosError, TokenCredential};
use crate::ingest::run_ingestion;

/// Load the catalog file and upsert every row into the configured container
#[inline]
pub fn ingest_catalog(config: &Config, catalog: Option<&Path>) -> crate::Result<()> {
    let credential: Arc<dyn TokenCredential> = Arc::new(
        AzureIdentityCredential::from_default_chain().map_err(CosmosError::from)?,
    );

    let report = run_ingestion(config, catalog, credential, |product_id| {
        println!("Uploaded: ProductID {}", product_id);
    })?;

    info!("Ingestion finished: {} rows, {} uploaded", report.rows, report.uploaded);
    println!("All data uploaded to Cosmos DB.");
    Ok(())
}

/// Read candidate products from a JSON array file
#[inline]
pub fn read_products(path: &Path) -> Result<Vec<Product>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read products file {}", path.display()))?;
    let products: Vec<Product> = serde_json::from_str(&text).with_context(|| {
        format!(
            "Products file {} must contain a JSON array of objects",
            path.display()
        )
    })?;
    Ok(products)
}

/// Ask the completion model which products the question refers to
#[inline]
pub fn match_cart(config: &Config, question: &str, products_path: &Path) -> crate::Result<()> {
    let products = read_products(products_path)?;
    let matcher = CartMatcher::from_config(&config.completion)?;

    let reply = matcher.match_products(question, &products)?;

    println!("{}", style("🛒 Cart match").bold().cyan());
    println!("{}", reply);
    Ok(())
}

/// Print the effective configuration with secrets masked
#[inline]
pub fn show_config(config: &Config, config_path: Option<&Path>) -> Result<()> {
    let masked = config.masked();

    println!("{}", style("📋 Current Configuration").bold().cyan());
    println!();

    println!("{}", style("Completion Settings:").bold().yellow());
    println!("  Endpoint: {}", style(&masked.completion.endpoint).cyan());
    println!("  Deployment: {}", style(&masked.completion.deployment).cyan());
    println!("  API Key: {}", style(&masked.completion.api_key).cyan());
    println!("  API Version: {}", style(&masked.completion.api_version).cyan());
    println!(
        "  Prompt: {}",
        style(masked.completion.prompt_path.display()).cyan()
    );
    match masked.completion.chat_completions_url() {
        Ok(url) => println!("  Completions URL: {}", style(url).cyan()),
        Err(e) => println!("  Completions URL: {} ({})", style("Invalid").red(), e),
    }

    println!();
    println!("{}", style("Cosmos DB Settings:").bold().yellow());
    println!("  Endpoint: {}", style(&masked.cosmos.endpoint).cyan());
    println!(
        "  Key: {}",
        style(masked.cosmos.key.as_deref().unwrap_or("(none)")).cyan()
    );
    println!("  Database: {}", style(&masked.cosmos.database).cyan());
    println!("  Container: {}", style(&masked.cosmos.container).cyan());
    println!(
        "  Partition Key: {}",
        style(&masked.cosmos.partition_key_path).cyan()
    );

    println!();
    println!("{}", style("Ingestion Settings:").bold().yellow());
    println!(
        "  Catalog: {}",
        style(masked.ingest.catalog_path.display()).cyan()
    );
    println!("  Encoding: {}", style(&masked.ingest.encoding).cyan());

    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path().context("Failed to get config file path")?,
    };
    println!();
    println!("Config file: {}", style(config_path.display()).dim());

    Ok(())
}
