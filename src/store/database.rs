//! libsql-backed store

use crate::catalog::{Keyword, KeywordKey, NewKeyword, Product, ProductKey};
use crate::store::error::StoreError;
use crate::store::schema;
use crate::store::{CountFilter, Store, UpsertMode};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use libsql::{Connection, Row, Value, params};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

const KEYWORD_COLUMNS: &str = "text, domain, category, priority, generated_by, is_scraped, \
     scraping_attempts, success_count, error_count, products_found, created_at, last_attempt_at, scraped_at";

const REPLACE_PRODUCT: &str = "INSERT INTO products
        (asin, domain, keyword, category, best_seller_rank, document, scraped_at, updated_at, scrape_count)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)
     ON CONFLICT(asin, domain) DO UPDATE SET
        keyword = excluded.keyword,
        category = excluded.category,
        best_seller_rank = excluded.best_seller_rank,
        document = excluded.document,
        scraped_at = excluded.scraped_at,
        updated_at = excluded.updated_at,
        scrape_count = products.scrape_count + 1";

const INSERT_PRODUCT: &str = "INSERT INTO products
        (asin, domain, keyword, category, best_seller_rank, document, scraped_at, updated_at, scrape_count)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)
     ON CONFLICT(asin, domain) DO NOTHING";

/// Store backed by a local libsql database
pub struct LibsqlStore {
    conn: Mutex<Connection>,
}

impl LibsqlStore {
    /// Wrap an open connection, creating the schema if needed
    #[instrument(skip(conn))]
    pub async fn new(conn: Connection) -> Result<Self, StoreError> {
        schema::initialize_schema(&conn).await?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open (or create) the database file at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(path.as_ref())
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn).await
    }

    fn row_to_keyword(row: &Row) -> Result<Keyword, StoreError> {
        Ok(Keyword {
            text: get_string(row, 0)?,
            domain: get_string(row, 1)?,
            category: get_string(row, 2)?,
            priority: get_int(row, 3)?.clamp(0, u8::MAX as i64) as u8,
            generated_by: get_string(row, 4)?,
            is_scraped: get_int(row, 5)? != 0,
            scraping_attempts: get_count(row, 6)?,
            success_count: get_count(row, 7)?,
            error_count: get_count(row, 8)?,
            products_found: get_count(row, 9)?,
            created_at: from_millis(get_int(row, 10)?)?,
            last_attempt_at: get_optional_int(row, 11)?.map(from_millis).transpose()?,
            scraped_at: get_optional_int(row, 12)?.map(from_millis).transpose()?,
        })
    }

    async fn query_keywords(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Keyword>, StoreError> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query keywords: {}", e)))?;

        let mut keywords = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            keywords.push(Self::row_to_keyword(&row)?);
        }
        Ok(keywords)
    }

    async fn count_query(&self, sql: &str, params: Vec<Value>) -> Result<u64, StoreError> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(|e| StoreError::Query(format!("Failed to count: {}", e)))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(get_int(&row, 0)?.max(0) as u64),
            Ok(None) => Ok(0),
            Err(e) => Err(StoreError::Data(format!("Failed to read count: {}", e))),
        }
    }
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StoreError::Data(format!("Invalid timestamp: {}", millis)))
}

fn get_string(row: &Row, idx: i32) -> Result<String, StoreError> {
    row.get::<String>(idx)
        .map_err(|e| StoreError::Data(format!("Failed to get column {}: {}", idx, e)))
}

fn get_int(row: &Row, idx: i32) -> Result<i64, StoreError> {
    row.get::<i64>(idx)
        .map_err(|e| StoreError::Data(format!("Failed to get column {}: {}", idx, e)))
}

fn get_count(row: &Row, idx: i32) -> Result<u32, StoreError> {
    Ok(get_int(row, idx)?.clamp(0, u32::MAX as i64) as u32)
}

fn get_optional_int(row: &Row, idx: i32) -> Result<Option<i64>, StoreError> {
    match row.get_value(idx) {
        Ok(Value::Null) => Ok(None),
        Ok(Value::Integer(n)) => Ok(Some(n)),
        Ok(other) => Err(StoreError::Data(format!(
            "Unexpected value in column {}: {:?}",
            idx, other
        ))),
        Err(e) => Err(StoreError::Data(format!("Failed to get column {}: {}", idx, e))),
    }
}

fn optional(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

fn key_params(key: &KeywordKey) -> [Value; 3] {
    [
        Value::Text(key.text.clone()),
        Value::Text(key.domain.clone()),
        Value::Text(key.category.clone()),
    ]
}

#[async_trait]
impl Store for LibsqlStore {
    #[instrument(skip(self, products), fields(count = products.len()))]
    async fn upsert_products(&self, products: &[Product], mode: UpsertMode) -> Result<usize, StoreError> {
        let sql = match mode {
            UpsertMode::Replace => REPLACE_PRODUCT,
            UpsertMode::InsertOnly => INSERT_PRODUCT,
        };

        let conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| StoreError::Transaction(format!("Failed to start transaction: {}", e)))?;

        let mut written = 0;
        for product in products {
            let document = serde_json::to_string(product)
                .map_err(|e| StoreError::Data(format!("Failed to serialize product {}: {}", product.asin, e)))?;
            let changed = tx
                .execute(
                    sql,
                    params![
                        product.asin.clone(),
                        product.domain.clone(),
                        product.keyword.clone(),
                        product.category.clone(),
                        optional(product.best_seller_rank.map(i64::from)),
                        document,
                        to_millis(product.scraped_at),
                        to_millis(product.updated_at),
                    ],
                )
                .await
                .map_err(|e| StoreError::Query(format!("Failed to upsert product {}: {}", product.asin, e)))?;
            written += changed as usize;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Transaction(format!("Failed to commit transaction: {}", e)))?;

        debug!(written, "products written");
        Ok(written)
    }

    async fn product(&self, key: &ProductKey) -> Result<Option<Product>, StoreError> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                "SELECT document, scrape_count FROM products WHERE asin = ? AND domain = ?",
                params![key.asin.clone(), key.domain.clone()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to get product: {}", e)))?;

        let row = match rows.next().await {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(e) => return Err(StoreError::Data(format!("Failed to get product: {}", e))),
        };

        let document = get_string(&row, 0)?;
        let mut product: Product = serde_json::from_str(&document)
            .map_err(|e| StoreError::Data(format!("Failed to decode product {}: {}", key, e)))?;
        product.scrape_count = get_count(&row, 1)?;
        Ok(Some(product))
    }

    async fn product_keys_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<ProductKey>, StoreError> {
        let since = since.map_or(i64::MIN, to_millis);
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                "SELECT asin, domain FROM products WHERE scraped_at >= ?",
                params![since],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to get product keys: {}", e)))?;

        let mut keys = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            keys.push(ProductKey::new(get_string(&row, 0)?, get_string(&row, 1)?));
        }
        Ok(keys)
    }

    #[instrument(skip(self, keywords), fields(count = keywords.len()))]
    async fn insert_keywords(&self, keywords: &[NewKeyword], now: DateTime<Utc>) -> Result<usize, StoreError> {
        let conn = self.conn.lock().await;
        let mut inserted = 0;
        for keyword in keywords {
            let changed = conn
                .execute(
                    "INSERT INTO keywords (text, domain, category, priority, generated_by, created_at)
                     VALUES (?, ?, ?, ?, ?, ?)
                     ON CONFLICT(text, domain, category) DO NOTHING",
                    params![
                        keyword.text.clone(),
                        keyword.domain.clone(),
                        keyword.category.clone(),
                        i64::from(keyword.priority),
                        keyword.generated_by.clone(),
                        to_millis(now),
                    ],
                )
                .await
                .map_err(|e| StoreError::Query(format!("Failed to insert keyword '{}': {}", keyword.text, e)))?;
            inserted += changed as usize;
        }
        Ok(inserted)
    }

    async fn keyword(&self, key: &KeywordKey) -> Result<Option<Keyword>, StoreError> {
        let sql = format!(
            "SELECT {} FROM keywords WHERE text = ? AND domain = ? AND category = ?",
            KEYWORD_COLUMNS
        );
        let mut keywords = self.query_keywords(&sql, key_params(key).to_vec()).await?;
        Ok(keywords.pop())
    }

    #[instrument(skip(self))]
    async fn find_unscraped(&self, domain: &str, limit: usize, attempt_cap: u32) -> Result<Vec<Keyword>, StoreError> {
        let sql = format!(
            "SELECT {} FROM keywords
             WHERE is_scraped = 0 AND domain = ? AND scraping_attempts < ?
             ORDER BY priority DESC, created_at ASC, id ASC
             LIMIT ?",
            KEYWORD_COLUMNS
        );
        self.query_keywords(
            &sql,
            vec![
                Value::Text(domain.to_string()),
                Value::Integer(i64::from(attempt_cap)),
                Value::Integer(limit as i64),
            ],
        )
        .await
    }

    async fn list_keywords(&self, domain: Option<&str>, limit: usize) -> Result<Vec<Keyword>, StoreError> {
        let sql = format!(
            "SELECT {} FROM keywords
             WHERE (?1 IS NULL OR domain = ?1)
             ORDER BY priority DESC, created_at ASC, id ASC
             LIMIT ?2",
            KEYWORD_COLUMNS
        );
        let domain = domain.map_or(Value::Null, |d| Value::Text(d.to_string()));
        self.query_keywords(&sql, vec![domain, Value::Integer(limit as i64)])
            .await
    }

    async fn scraped_keyword_keys(&self) -> Result<Vec<KeywordKey>, StoreError> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                "SELECT text, domain, category FROM keywords WHERE is_scraped = 1",
                params![],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to get scraped keywords: {}", e)))?;

        let mut keys = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            keys.push(KeywordKey::new(
                get_string(&row, 0)?,
                get_string(&row, 1)?,
                get_string(&row, 2)?,
            ));
        }
        Ok(keys)
    }

    async fn record_attempt(&self, key: &KeywordKey, failed: bool, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let [text, domain, category] = key_params(key);
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE keywords
                 SET scraping_attempts = scraping_attempts + 1,
                     error_count = error_count + ?,
                     last_attempt_at = ?
                 WHERE text = ? AND domain = ? AND category = ?",
                params![i64::from(failed), to_millis(at), text, domain, category],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to record attempt for {}: {}", key, e)))?;
        Ok(changed > 0)
    }

    async fn mark_complete(&self, key: &KeywordKey, products_found: u32, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let [text, domain, category] = key_params(key);
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE keywords
                 SET is_scraped = 1,
                     scraped_at = ?,
                     products_found = ?,
                     success_count = success_count + 1
                 WHERE text = ? AND domain = ? AND category = ?",
                params![to_millis(at), i64::from(products_found), text, domain, category],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to mark {} complete: {}", key, e)))?;
        Ok(changed > 0)
    }

    async fn count(&self, filter: CountFilter) -> Result<u64, StoreError> {
        match filter {
            CountFilter::Products => self.count_query("SELECT COUNT(*) FROM products", vec![]).await,
            CountFilter::ProductsSince(since) => {
                self.count_query(
                    "SELECT COUNT(*) FROM products WHERE scraped_at >= ?",
                    vec![Value::Integer(to_millis(since))],
                )
                .await
            }
            CountFilter::Keywords => self.count_query("SELECT COUNT(*) FROM keywords", vec![]).await,
            CountFilter::ScrapedKeywords => {
                self.count_query("SELECT COUNT(*) FROM keywords WHERE is_scraped = 1", vec![])
                    .await
            }
            CountFilter::PendingKeywords => {
                self.count_query("SELECT COUNT(*) FROM keywords WHERE is_scraped = 0", vec![])
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_keyword, sample_product};
    use chrono::Duration;
    use tempfile::tempdir;

    async fn setup_test_store() -> Result<(LibsqlStore, tempfile::TempDir), StoreError> {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir
            .path()
            .join("catalog.db")
            .to_string_lossy()
            .to_string();

        let store = LibsqlStore::open(&db_path).await?;
        Ok((store, temp_dir))
    }

    #[tokio::test]
    async fn test_replace_upsert_keeps_one_document() {
        let (store, _temp_dir) = setup_test_store().await.unwrap();
        let now = Utc::now();
        let first = sample_product("B000000001", now);
        let mut second = first.clone();
        second.price = Some(24.5);
        second.title = Some("Updated".to_string());

        store.upsert_products(&[first], UpsertMode::Replace).await.unwrap();
        store.upsert_products(&[second], UpsertMode::Replace).await.unwrap();

        assert_eq!(store.count(CountFilter::Products).await.unwrap(), 1);
        let stored = store
            .product(&ProductKey::new("B000000001", "us"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.price, Some(24.5));
        assert_eq!(stored.title.as_deref(), Some("Updated"));
        assert_eq!(stored.scrape_count, 2);
    }

    #[tokio::test]
    async fn test_insert_only_skips_existing() {
        let (store, _temp_dir) = setup_test_store().await.unwrap();
        let first = sample_product("B000000001", Utc::now());
        let mut second = first.clone();
        second.price = Some(24.5);

        assert_eq!(store.upsert_products(&[first], UpsertMode::InsertOnly).await.unwrap(), 1);
        assert_eq!(store.upsert_products(&[second], UpsertMode::InsertOnly).await.unwrap(), 0);

        let stored = store
            .product(&ProductKey::new("B000000001", "us"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.price, Some(9.99));
        assert_eq!(stored.scrape_count, 1);
    }

    #[tokio::test]
    async fn test_product_keys_since_window() {
        let (store, _temp_dir) = setup_test_store().await.unwrap();
        let now = Utc::now();
        store
            .upsert_products(
                &[
                    sample_product("B000000001", now),
                    sample_product("B000000002", now - Duration::days(45)),
                ],
                UpsertMode::Replace,
            )
            .await
            .unwrap();

        let recent = store
            .product_keys_since(Some(now - Duration::days(30)))
            .await
            .unwrap();
        assert_eq!(recent, vec![ProductKey::new("B000000001", "us")]);
        assert_eq!(store.product_keys_since(None).await.unwrap().len(), 2);
        assert_eq!(
            store.count(CountFilter::ProductsSince(now - Duration::days(1))).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_keyword_lifecycle() {
        let (store, _temp_dir) = setup_test_store().await.unwrap();
        let now = Utc::now();

        let inserted = store
            .insert_keywords(
                &[sample_keyword("usb cable", 6), sample_keyword("hdmi", 9), sample_keyword("usb cable", 2)],
                now,
            )
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let batch = store.find_unscraped("us", 10, 3).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].text, "hdmi");
        assert_eq!(batch[1].text, "usb cable");
        assert_eq!(batch[1].priority, 6);

        let key = batch[1].key();
        assert!(store.record_attempt(&key, false, now).await.unwrap());
        assert!(store.mark_complete(&key, 14, now).await.unwrap());
        assert!(store.mark_complete(&key, 14, now).await.unwrap());

        let keyword = store.keyword(&key).await.unwrap().unwrap();
        assert!(keyword.is_scraped);
        assert_eq!(keyword.scraping_attempts, 1);
        assert_eq!(keyword.error_count, 0);
        assert_eq!(keyword.success_count, 2);
        assert_eq!(keyword.products_found, 14);
        assert!(keyword.last_attempt_at.is_some());
        assert!(keyword.scraped_at.is_some());

        assert_eq!(store.scraped_keyword_keys().await.unwrap(), vec![key]);
        assert_eq!(store.count(CountFilter::PendingKeywords).await.unwrap(), 1);
        assert_eq!(store.count(CountFilter::ScrapedKeywords).await.unwrap(), 1);
        assert_eq!(store.list_keywords(None, 10).await.unwrap().len(), 2);
        assert!(store.list_keywords(Some("de"), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_three_failures_exhaust_keyword() {
        let (store, _temp_dir) = setup_test_store().await.unwrap();
        let now = Utc::now();
        store.insert_keywords(&[sample_keyword("flaky", 5)], now).await.unwrap();
        let key = sample_keyword("flaky", 5).key();

        for _ in 0..3 {
            store.record_attempt(&key, true, now).await.unwrap();
        }

        assert!(store.find_unscraped("us", 10, 3).await.unwrap().is_empty());
        let keyword = store.keyword(&key).await.unwrap().unwrap();
        assert_eq!(keyword.scraping_attempts, 3);
        assert_eq!(keyword.error_count, 3);
        assert!(!keyword.is_scraped);
    }

    #[tokio::test]
    async fn test_unknown_keyword_is_reported() {
        let (store, _temp_dir) = setup_test_store().await.unwrap();
        let key = KeywordKey::new("missing", "us", "None");
        assert!(!store.record_attempt(&key, true, Utc::now()).await.unwrap());
        assert!(!store.mark_complete(&key, 0, Utc::now()).await.unwrap());
    }
}
