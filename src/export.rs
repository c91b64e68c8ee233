//! Bulk export of persisted products
//!
//! Exporters receive every batch the persistence gateway has written. They
//! give no feedback to the crawl: a failing exporter is logged and ignored.

use crate::catalog::Product;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Sink for written products
#[async_trait]
pub trait Exporter: Send + Sync {
    async fn export(&self, products: &[Product]) -> Result<()>;

    /// Flush anything buffered; called once when the crawl shuts down
    async fn finish(&self) -> Result<()>;
}

/// One JSON document per line
pub struct JsonLinesExporter {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesExporter {
    /// Create (or truncate) the export file
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .await
            .map_err(|e| Error::Export(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A product as exported, with the legacy `Prime` and `SellerName` fields
pub fn export_record(product: &Product) -> Result<Value> {
    let mut record = serde_json::to_value(product)?;
    if let Value::Object(fields) = &mut record {
        fields.insert("Prime".to_string(), Value::Bool(product.is_prime));
        fields.insert(
            "SellerName".to_string(),
            product
                .seller
                .sold_by
                .clone()
                .map_or(Value::Null, Value::String),
        );
    }
    Ok(record)
}

#[async_trait]
impl Exporter for JsonLinesExporter {
    #[instrument(skip(self, products), fields(path = %self.path.display(), count = products.len()))]
    async fn export(&self, products: &[Product]) -> Result<()> {
        let mut lines = Vec::new();
        for product in products {
            serde_json::to_writer(&mut lines, &export_record(product)?)?;
            lines.push(b'\n');
        }

        let mut writer = self.writer.lock().await;
        writer.write_all(&lines).await?;
        debug!("exported products");
        Ok(())
    }

    async fn finish(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.flush().await?;
        Ok(())
    }
}
