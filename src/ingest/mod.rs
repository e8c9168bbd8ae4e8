// Catalog ingestion job
// Loads the product catalog file and upserts one document per row into Cosmos DB

pub mod catalog;
pub mod connect;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub use catalog::{
    CatalogError, CatalogRow, CatalogTable, ColumnKind, Document, PRODUCT_ID_COLUMN,
    SEARCH_TEXT_FIELD, content_for_vector, read_catalog,
};
pub use connect::{ConnectError, get_cosmos_client};

use crate::config::Config;
use crate::cosmos::{ItemSink, TokenCredential};

/// Outcome of one ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionReport {
    pub rows: usize,
    pub uploaded: usize,
}

/// Upsert every row of `table` into `sink`, in file order.
///
/// The first failing row stops the loop. Documents already written stay
/// written. `on_uploaded` receives the product id of each stored document.
#[inline]
pub fn upload_documents<S, F>(sink: &S, table: &CatalogTable, mut on_uploaded: F) -> crate::Result<usize>
where
    S: ItemSink + ?Sized,
    F: FnMut(&str),
{
    let partition_key_field = sink.partition_key_field();
    let mut uploaded = 0;

    for row in table.rows() {
        let document = table.to_document(row, partition_key_field)?;
        sink.upsert_item(&document)?;

        let product_id = table.product_id(row)?;
        debug!("Upserted row {} as {}", row.number, product_id);
        on_uploaded(&product_id);
        uploaded += 1;
    }

    Ok(uploaded)
}

/// Run the whole ingestion job described by `config`.
///
/// Configuration is checked before the catalog is read and before any
/// network call. `catalog_override` replaces the configured catalog path.
#[inline]
pub fn run_ingestion<F>(
    config: &Config,
    catalog_override: Option<&Path>,
    credential: Arc<dyn TokenCredential>,
    on_uploaded: F,
) -> crate::Result<IngestionReport>
where
    F: FnMut(&str),
{
    config.cosmos.validate()?;
    config.ingest.validate()?;
    let encoding = config.ingest.resolve_encoding()?;

    let catalog_path = catalog_override.unwrap_or(config.ingest.catalog_path.as_path());
    let mut table = read_catalog(catalog_path, encoding)?;
    table.derive_search_text();

    let client = get_cosmos_client(
        &config.cosmos.endpoint,
        config.cosmos.key.as_deref(),
        credential,
    )?;

    let database = client.create_database_if_not_exists(config.cosmos.database.trim())?;
    let container = database.create_container_if_not_exists(
        config.cosmos.container.trim(),
        &config.cosmos.partition_key_path,
    )?;
    info!(
        "Uploading {} documents to {}/{}",
        table.len(),
        database.id(),
        container.id()
    );

    let uploaded = upload_documents(&container, &table, on_uploaded)?;
    info!("Uploaded {} of {} catalog rows", uploaded, table.len());

    Ok(IngestionReport {
        rows: table.len(),
        uploaded,
    })
}
