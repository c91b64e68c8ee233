//! # Database Schema Module
//!
//! Creates the two tables of the catalog store and their indexes.
//!
//! ## Schema Design
//!
//! 1. `products` - one row per `(asin, domain)`, with the normalized record
//!    stored as a JSON document beside the columns used for lookups
//! 2. `keywords` - one row per `(text, domain, category)` with its crawl
//!    progress counters
//!
//! Timestamps are stored as milliseconds since the Unix epoch.

use crate::store::error::StoreError;
use libsql::{Connection, params};

/// Initialize the database schema
pub async fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            asin TEXT NOT NULL,
            domain TEXT NOT NULL,
            keyword TEXT NOT NULL,
            category TEXT NOT NULL,
            best_seller_rank INTEGER,
            document TEXT NOT NULL,
            scraped_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            scrape_count INTEGER NOT NULL DEFAULT 1,
            UNIQUE (asin, domain)
        )",
        params![],
    )
    .await
    .map_err(|e| StoreError::Schema(format!("Failed to create products table: {}", e)))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS keywords (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            domain TEXT NOT NULL,
            category TEXT NOT NULL,
            priority INTEGER NOT NULL,
            generated_by TEXT NOT NULL,
            is_scraped INTEGER NOT NULL DEFAULT 0,
            scraping_attempts INTEGER NOT NULL DEFAULT 0,
            success_count INTEGER NOT NULL DEFAULT 0,
            error_count INTEGER NOT NULL DEFAULT 0,
            products_found INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            last_attempt_at INTEGER,
            scraped_at INTEGER,
            UNIQUE (text, domain, category)
        )",
        params![],
    )
    .await
    .map_err(|e| StoreError::Schema(format!("Failed to create keywords table: {}", e)))?;

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_products_scraped_at ON products(scraped_at)",
        "CREATE INDEX IF NOT EXISTS idx_products_keyword ON products(keyword)",
        "CREATE INDEX IF NOT EXISTS idx_products_rank ON products(best_seller_rank)",
        "CREATE INDEX IF NOT EXISTS idx_keywords_pending ON keywords(is_scraped, domain, scraping_attempts)",
        "CREATE INDEX IF NOT EXISTS idx_keywords_priority ON keywords(priority DESC, created_at)",
    ];
    for sql in indexes {
        conn.execute(sql, params![])
            .await
            .map_err(|e| StoreError::Schema(format!("Failed to create index: {}", e)))?;
    }

    Ok(())
}
