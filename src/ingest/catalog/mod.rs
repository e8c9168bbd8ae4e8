
use encoding_rs::Encoding;
use serde_json::{Map, Number, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const PRODUCT_ID_COLUMN: &str = "ProductID";
pub const PRODUCT_NAME_COLUMN: &str = "ProductName";
pub const PRODUCT_CATEGORY_COLUMN: &str = "ProductCategory";
pub const PRODUCT_DESCRIPTION_COLUMN: &str = "ProductDescription";
pub const SEARCH_TEXT_FIELD: &str = "content_for_vector";

/// One catalog row as stored in the document database
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Catalog file {path} is not valid {encoding}")]
    Decode {
        path: PathBuf,
        encoding: &'static str,
    },
    #[error("Malformed catalog CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Catalog is missing required column {0}")]
    MissingColumn(&'static str),
    #[error("Row {row}: expected {expected} fields, found {found}")]
    RowShape {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Row {row}: ProductID is empty")]
    EmptyProductId { row: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    /// 1-based position among data rows
    pub number: usize,
    pub values: Vec<String>,
    pub search_text: Option<String>,
}

/// Product catalog loaded from a delimited file
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogTable {
    headers: Vec<String>,
    kinds: Vec<ColumnKind>,
    rows: Vec<CatalogRow>,
}

/// `name | category | description`, with missing parts as empty strings
#[inline]
pub fn content_for_vector(
    name: Option<&str>,
    category: Option<&str>,
    description: Option<&str>,
) -> String {
    format!(
        "{} | {} | {}",
        name.unwrap_or_default(),
        category.unwrap_or_default(),
        description.unwrap_or_default()
    )
}

/// Read and decode a catalog file, then parse it as CSV with a header row.
#[inline]
pub fn read_catalog(path: &Path, encoding: &'static Encoding) -> Result<CatalogTable, CatalogError> {
    let bytes = fs::read(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let (text, used_encoding, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(CatalogError::Decode {
            path: path.to_path_buf(),
            encoding: used_encoding.name(),
        });
    }
    debug!(
        "Decoded {} bytes of {} as {}",
        bytes.len(),
        path.display(),
        used_encoding.name()
    );

    let table = CatalogTable::parse(&text)?;
    info!(
        "Loaded {} catalog rows with {} columns from {}",
        table.len(),
        table.headers().len(),
        path.display()
    );
    Ok(table)
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Integer;
    let mut seen_any = false;

    for cell in cells {
        seen_any = true;
        if kind == ColumnKind::Integer && cell.parse::<i64>().is_err() {
            kind = ColumnKind::Float;
        }
        if kind == ColumnKind::Float && !cell.parse::<f64>().is_ok_and(f64::is_finite) {
            return ColumnKind::Text;
        }
    }

    if seen_any { kind } else { ColumnKind::Text }
}

fn typed_value(kind: ColumnKind, cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }

    match kind {
        ColumnKind::Integer => cell
            .parse::<i64>()
            .map_or_else(|_| Value::String(cell.to_string()), Value::from),
        ColumnKind::Float => cell
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or_else(|| Value::String(cell.to_string()), Value::Number),
        ColumnKind::Text => Value::String(cell.to_string()),
    }
}

impl CatalogTable {
    /// Parse CSV text with a header row. Records with a field count that
    /// differs from the header are kept and rejected when converted.
    #[inline]
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|header| header.trim().to_string())
            .collect();

        if !headers.iter().any(|header| header == PRODUCT_ID_COLUMN) {
            return Err(CatalogError::MissingColumn(PRODUCT_ID_COLUMN));
        }

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            rows.push(CatalogRow {
                number: index + 1,
                values: record.iter().map(ToString::to_string).collect(),
                search_text: None,
            });
        }

        let kinds = (0..headers.len())
            .map(|column| {
                infer_kind(
                    rows.iter()
                        .filter_map(|row| row.values.get(column))
                        .map(String::as_str)
                        .filter(|cell| !cell.is_empty()),
                )
            })
            .collect();

        Ok(Self {
            headers,
            kinds,
            rows,
        })
    }

    #[inline]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[inline]
    pub fn rows(&self) -> &[CatalogRow] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        self.column_index(name).map(|index| self.kinds[index])
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Non-empty cell of `row` in column `name`
    #[inline]
    pub fn cell<'a>(&self, row: &'a CatalogRow, name: &str) -> Option<&'a str> {
        self.column_index(name)
            .and_then(|index| row.values.get(index))
            .map(String::as_str)
            .filter(|cell| !cell.is_empty())
    }

    #[inline]
    pub fn search_text(&self, row: &CatalogRow) -> String {
        content_for_vector(
            self.cell(row, PRODUCT_NAME_COLUMN),
            self.cell(row, PRODUCT_CATEGORY_COLUMN),
            self.cell(row, PRODUCT_DESCRIPTION_COLUMN),
        )
    }

    /// Fill the derived search field of every row.
    #[inline]
    pub fn derive_search_text(&mut self) {
        let texts: Vec<String> = self.rows.iter().map(|row| self.search_text(row)).collect();
        for (row, text) in self.rows.iter_mut().zip(texts) {
            row.search_text = Some(text);
        }
        debug!("Derived {} for {} rows", SEARCH_TEXT_FIELD, self.rows.len());
    }

    /// Stringified product identifier of `row`
    #[inline]
    pub fn product_id(&self, row: &CatalogRow) -> Result<String, CatalogError> {
        self.cell(row, PRODUCT_ID_COLUMN)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(CatalogError::EmptyProductId { row: row.number })
    }

    /// Build the stored document for `row`. `id`, `ProductID` and the
    /// partition key field all carry the stringified product identifier.
    #[inline]
    pub fn to_document(
        &self,
        row: &CatalogRow,
        partition_key_field: &str,
    ) -> Result<Document, CatalogError> {
        if row.values.len() != self.headers.len() {
            return Err(CatalogError::RowShape {
                row: row.number,
                expected: self.headers.len(),
                found: row.values.len(),
            });
        }

        let product_id = self.product_id(row)?;

        let mut document = Document::new();
        for ((header, kind), cell) in self.headers.iter().zip(&self.kinds).zip(&row.values) {
            document.insert(header.clone(), typed_value(*kind, cell));
        }

        let search_text = row
            .search_text
            .clone()
            .unwrap_or_else(|| self.search_text(row));
        document.insert(SEARCH_TEXT_FIELD.to_string(), Value::String(search_text));

        document.insert("id".to_string(), Value::String(product_id.clone()));
        document.insert(
            PRODUCT_ID_COLUMN.to_string(),
            Value::String(product_id.clone()),
        );
        document.insert(partition_key_field.to_string(), Value::String(product_id));

        Ok(document)
    }
}
