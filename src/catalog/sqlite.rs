//! SQLite catalog store

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::debug;

use crate::catalog::CatalogStore;
use crate::catalog::product::Product;
use crate::error::Result;
use crate::search::embeddings::cosine_similarity;
use crate::search::hybrid::ScoreSet;
use crate::search::types::{SearchFilters, SearchRecommendation};

/// Schema version stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: u32 = 2;

const PRODUCT_COLUMNS: &str = "p.id, p.title, p.description, p.price, p.category_id, \
     p.category_name, p.university_id, p.vendor_id, p.vendor_name, p.image_url, \
     p.is_available, p.created_at";

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    price REAL NOT NULL,
    category_id TEXT,
    category_name TEXT,
    university_id TEXT,
    vendor_id TEXT,
    vendor_name TEXT,
    image_url TEXT,
    is_available INTEGER NOT NULL DEFAULT 1,
    created_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id);
CREATE INDEX IF NOT EXISTS idx_products_university ON products(university_id);

CREATE VIRTUAL TABLE IF NOT EXISTS products_fts USING fts5(
    id UNINDEXED,
    title,
    description,
    category_name,
    vendor_name,
    tokenize = 'unicode61 remove_diacritics 2'
);

CREATE TABLE IF NOT EXISTS product_embeddings (
    product_id TEXT PRIMARY KEY REFERENCES products(id) ON DELETE CASCADE,
    model TEXT NOT NULL,
    dims INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    content_hash TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Case-folded copies of `title` and `category_name` for type-ahead. SQLite's
/// `lower()` only folds ASCII, so these are filled from Rust.
const SCHEMA_V2: &str = "
ALTER TABLE products ADD COLUMN title_folded TEXT NOT NULL DEFAULT '';
ALTER TABLE products ADD COLUMN category_folded TEXT NOT NULL DEFAULT '';
";

/// Product catalog backed by a single SQLite connection.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Open (or create) the catalog at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Self::init(Connection::open(path)?)
    }

    /// Private in-memory catalog, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Current schema version.
    pub fn schema_version(&self) -> Result<u32> {
        let conn = self.conn.lock();
        Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    /// Insert or replace products and their full-text rows in one transaction.
    pub fn upsert_products(&self, products: &[Product]) -> Result<usize> {
        for product in products {
            product.validate()?;
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut upsert = tx.prepare(
                "INSERT INTO products (id, title, description, price, category_id, category_name,
                     university_id, vendor_id, vendor_name, image_url, is_available, created_at,
                     title_folded, category_folded)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT(id) DO UPDATE SET
                     title = excluded.title,
                     description = excluded.description,
                     price = excluded.price,
                     category_id = excluded.category_id,
                     category_name = excluded.category_name,
                     university_id = excluded.university_id,
                     vendor_id = excluded.vendor_id,
                     vendor_name = excluded.vendor_name,
                     image_url = excluded.image_url,
                     is_available = excluded.is_available,
                     created_at = excluded.created_at,
                     title_folded = excluded.title_folded,
                     category_folded = excluded.category_folded",
            )?;
            let mut delete_fts = tx.prepare("DELETE FROM products_fts WHERE id = ?1")?;
            let mut insert_fts = tx.prepare(
                "INSERT INTO products_fts (id, title, description, category_name, vendor_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            for product in products {
                upsert.execute(params![
                    product.id,
                    product.title,
                    product.description,
                    product.price,
                    product.category_id,
                    product.category_name,
                    product.university_id,
                    product.vendor_id,
                    product.vendor_name,
                    product.image_url,
                    product.is_available,
                    product.created_at,
                    fold(&product.title),
                    fold(product.category_name.as_deref().unwrap_or_default()),
                ])?;
                delete_fts.execute([&product.id])?;
                insert_fts.execute(params![
                    product.id,
                    product.title,
                    product.description,
                    product.category_name,
                    product.vendor_name,
                ])?;
            }
        }
        tx.commit()?;
        debug!(count = products.len(), "upserted products");
        Ok(products.len())
    }

    /// Store (or replace) the embedding for a product.
    pub fn store_embedding(
        &self,
        product_id: &str,
        model: &str,
        embedding: &[f32],
        content_hash: &str,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO product_embeddings (product_id, model, dims, embedding, content_hash, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(product_id) DO UPDATE SET
                 model = excluded.model,
                 dims = excluded.dims,
                 embedding = excluded.embedding,
                 content_hash = excluded.content_hash,
                 updated_at = excluded.updated_at",
            params![
                product_id,
                model,
                embedding.len() as i64,
                encode_vector(embedding),
                content_hash,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Available products whose embedding is missing, stale, or from another
    /// model. `force` returns every available product.
    pub fn products_needing_embeddings(&self, model: &str, force: bool) -> Result<Vec<Product>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS}, e.model, e.content_hash
             FROM products p
             LEFT JOIN product_embeddings e ON e.product_id = p.id
             WHERE p.is_available = 1
             ORDER BY p.id"
        ))?;
        let rows = stmt.query_map([], |row| {
            let product = product_from_row(row)?;
            let stored_model: Option<String> = row.get(12)?;
            let stored_hash: Option<String> = row.get(13)?;
            Ok((product, stored_model, stored_hash))
        })?;

        let mut stale = Vec::new();
        for row in rows {
            let (product, stored_model, stored_hash) = row?;
            let fresh = stored_model.as_deref() == Some(model)
                && stored_hash.as_deref() == Some(product.content_hash().as_str());
            if force || !fresh {
                stale.push(product);
            }
        }
        Ok(stale)
    }

    pub fn product(&self, id: &str) -> Result<Option<Product>> {
        let conn = self.conn.lock();
        let product = conn
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ?1"),
                [id],
                product_from_row,
            )
            .optional()?;
        Ok(product)
    }

    pub fn product_count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    pub fn embedding_count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM product_embeddings", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

impl CatalogStore for SqliteCatalog {
    fn full_text_scores(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<ScoreSet> {
        let Some(match_expr) = fts_match_expression(query) else {
            return Ok(ScoreSet::new());
        };

        let mut values = vec![Value::Text(match_expr)];
        let filter_sql = filter_clause(filters, &mut values);
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT p.id, bm25(products_fts, 0.0, 10.0, 2.0, 3.0, 1.0) AS rank
             FROM products_fts
             JOIN products p ON p.id = products_fts.id
             WHERE products_fts MATCH ? AND p.is_available = 1{filter_sql}
             ORDER BY rank, p.id
             LIMIT ?"
        ))?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut scores = ScoreSet::new();
        for row in rows {
            let (id, rank) = row?;
            // bm25() is lower-is-better.
            scores.insert(id, -rank);
        }
        Ok(scores)
    }

    fn semantic_scores(
        &self,
        embedding: &[f32],
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<ScoreSet> {
        let mut values = Vec::new();
        let filter_sql = filter_clause(filters, &mut values);
        values.push(Value::Integer(embedding.len() as i64));

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT e.product_id, e.embedding
             FROM product_embeddings e
             JOIN products p ON p.id = e.product_id
             WHERE p.is_available = 1{filter_sql} AND e.dims = ?"
        ))?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut scored: Vec<(String, f64)> = Vec::new();
        for row in rows {
            let (id, blob) = row?;
            let stored = decode_vector(&blob);
            scored.push((id, f64::from(cosine_similarity(embedding, &stored))));
        }
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(limit);
        Ok(scored.into_iter().collect())
    }

    fn products(&self, ids: &[String]) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p
             WHERE p.is_available = 1 AND p.id IN ({placeholders})"
        ))?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), product_from_row)?;
        let mut by_id: HashMap<String, Product> = HashMap::with_capacity(ids.len());
        for row in rows {
            let product = row?;
            by_id.insert(product.id.clone(), product);
        }
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    fn recommendation_candidates(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchRecommendation>> {
        let needle = escape_like(&fold(query.trim()));
        if needle.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, category_name, image_url, price,
                    CASE WHEN title_folded LIKE ?1 ESCAPE '\\' THEN 0 ELSE 1 END AS tier
             FROM products
             WHERE is_available = 1
               AND (title_folded LIKE ?2 ESCAPE '\\' OR category_folded LIKE ?2 ESCAPE '\\')
             ORDER BY tier, title_folded, id
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(
            params![
                format!("{needle}%"),
                format!("%{needle}%"),
                i64::try_from(limit).unwrap_or(i64::MAX),
            ],
            |row| {
                Ok(SearchRecommendation {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    category_name: row.get(2)?,
                    image_url: row.get(3)?,
                    price: row.get(4)?,
                })
            },
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        category_id: row.get(4)?,
        category_name: row.get(5)?,
        university_id: row.get(6)?,
        vendor_id: row.get(7)?,
        vendor_name: row.get(8)?,
        image_url: row.get(9)?,
        is_available: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// OR of quoted tokens; `None` when the query has no indexable token.
fn fts_match_expression(query: &str) -> Option<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
    {
        if !terms.contains(&token) {
            terms.push(token);
        }
    }
    if terms.is_empty() {
        return None;
    }
    Some(
        terms
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}

fn filter_clause(filters: &SearchFilters, values: &mut Vec<Value>) -> String {
    let mut sql = String::new();
    if let Some(category) = &filters.category_id {
        sql.push_str(" AND p.category_id = ?");
        values.push(Value::Text(category.clone()));
    }
    if let Some(university) = &filters.university_id {
        sql.push_str(" AND p.university_id = ?");
        values.push(Value::Text(university.clone()));
    }
    if let Some(min) = filters.min_price {
        sql.push_str(" AND p.price >= ?");
        values.push(Value::Real(min));
    }
    if let Some(max) = filters.max_price {
        sql.push_str(" AND p.price <= ?");
        values.push(Value::Real(max));
    }
    sql
}

fn run_migrations(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version >= SCHEMA_VERSION {
        return Ok(version);
    }
    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
    }
    if version < 2 {
        conn.execute_batch(SCHEMA_V2)?;
        backfill_folded(conn)?;
    }
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    debug!(from = version, to = SCHEMA_VERSION, "migrated catalog schema");
    Ok(SCHEMA_VERSION)
}

fn backfill_folded(conn: &Connection) -> Result<()> {
    let rows: Vec<(String, String, Option<String>)> = {
        let mut stmt = conn.prepare("SELECT id, title, category_name FROM products")?;
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<_>>()?
    };
    let mut update =
        conn.prepare("UPDATE products SET title_folded = ?2, category_folded = ?3 WHERE id = ?1")?;
    for (id, title, category) in &rows {
        update.execute(params![
            id,
            fold(title),
            fold(category.as_deref().unwrap_or_default())
        ])?;
    }
    Ok(())
}

/// Unicode lowercase, applied identically to stored text and queries.
fn fold(text: &str) -> String {
    text.to_lowercase()
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
