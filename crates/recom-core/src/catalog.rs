use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};
use crate::types::{Payload, Product, NAME_FIELD};

pub const ID_COLUMN: &str = "product_id";
pub const NAME_COLUMN: &str = NAME_FIELD;
pub const DESCRIPTION_COLUMN: &str = "description";
pub const REQUIRED_COLUMNS: [&str; 3] = [ID_COLUMN, NAME_COLUMN, DESCRIPTION_COLUMN];

/// Products in load order. Row position is the positional point id used by
/// ingestion, so rows are never reordered.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::Catalog(format!("{} not found", path.display())),
            _ => Error::Io(e),
        })?;
        let catalog = Self::from_reader(file)?;
        info!(path = %path.display(), rows = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    /// Parse a CSV table with a header row.
    ///
    /// Missing name/description cells become empty strings; every column is
    /// kept in the payload with empty cells as `null`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| Error::Catalog(format!("unreadable header: {e}")))?
            .clone();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Catalog(format!("missing required columns: {}", missing.join(", "))));
        }
        let column = |name: &str| headers.iter().position(|h| h == name).unwrap_or_default();
        let (id_idx, name_idx, desc_idx) = (column(ID_COLUMN), column(NAME_COLUMN), column(DESCRIPTION_COLUMN));

        let mut products = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| Error::Catalog(format!("row {}: {e}", row + 1)))?;
            let cell = |idx: usize| record.get(idx).unwrap_or_default().to_string();
            let payload: Payload = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| {
                    let value = if v.is_empty() { Value::Null } else { Value::String(v.to_string()) };
                    (h.to_string(), value)
                })
                .collect();
            products.push(Product {
                id: cell(id_idx),
                name: cell(name_idx),
                description: cell(desc_idx),
                payload,
            });
        }
        Ok(Self { products })
    }

    pub fn from_products(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.products.iter().map(|p| p.name.clone()).collect()
    }

    pub fn product_ids(&self) -> Vec<String> {
        self.products.iter().map(|p| p.id.clone()).collect()
    }

    pub fn embedding_inputs(&self) -> Vec<String> {
        self.products.iter().map(Product::embedding_input).collect()
    }
}
