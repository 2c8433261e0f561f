use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    SqlitePool,
};

use crate::{
    errors::AppError,
    structs::{Product, Seller},
};

const SELLER_COLUMNS: &str = "id, username, password_hash, created_at";
const PRODUCT_COLUMNS: &str = "id, name, price, quantity, seller_id, created_at, updated_at";

/// Opens the pool and applies the embedded migrations.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .read_only(false)
        .busy_timeout(Duration::from_secs(5));

    let db_pool = SqlitePool::connect_with(opts).await?;

    sqlx::migrate!().run(&db_pool).await?;
    log::info!("Database migrated successfully");

    Ok(db_pool)
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

/// Persistence for sellers and their products. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub async fn insert_seller(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Seller, sqlx::Error> {
        let seller = sqlx::query_as::<_, Seller>(&format!(
            "INSERT INTO sellers (username, password_hash, created_at) VALUES (?, ?, ?) RETURNING {}",
            SELLER_COLUMNS
        ))
        .bind(username)
        .bind(password_hash)
        .bind(now())
        .fetch_one(&self.pool)
        .await?;
        log::info!("Seller created: id={} username={}", seller.id, seller.username);
        Ok(seller)
    }

    pub async fn find_seller_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Seller>, sqlx::Error> {
        sqlx::query_as::<_, Seller>(&format!(
            "SELECT {} FROM sellers WHERE username = ?",
            SELLER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_seller_by_id(&self, id: i64) -> Result<Option<Seller>, sqlx::Error> {
        sqlx::query_as::<_, Seller>(&format!(
            "SELECT {} FROM sellers WHERE id = ?",
            SELLER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn products_by_seller(&self, seller_id: i64) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE seller_id = ? ORDER BY id",
            PRODUCT_COLUMNS
        ))
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find_product(&self, id: i64) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = ?",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Inserts a product, or adds `quantity` to the seller's existing row with
    /// the same name and price, in one statement. Returns `None` when the
    /// merged quantity would overflow.
    pub async fn upsert_product(
        &self,
        seller_id: i64,
        name: &str,
        price: i64,
        quantity: i64,
    ) -> Result<Option<Product>, sqlx::Error> {
        let timestamp = now();
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (name, price, quantity, seller_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (seller_id, name, price) DO UPDATE SET \
                quantity = products.quantity + excluded.quantity, \
                updated_at = excluded.updated_at \
             WHERE products.quantity <= {} - excluded.quantity \
             RETURNING {}",
            i64::MAX,
            PRODUCT_COLUMNS
        ))
        .bind(name)
        .bind(price)
        .bind(quantity)
        .bind(seller_id)
        .bind(&timestamp)
        .bind(&timestamp)
        .fetch_optional(&self.pool)
        .await
    }

    /// Overwrites price and quantity. Scoped by owner so a row that changed
    /// hands or vanished is not touched; returns `None` in that case.
    pub async fn update_product(
        &self,
        id: i64,
        seller_id: i64,
        price: i64,
        quantity: i64,
    ) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET price = ?, quantity = ?, updated_at = ? \
             WHERE id = ? AND seller_id = ? RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(price)
        .bind(quantity)
        .bind(now())
        .bind(id)
        .bind(seller_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Returns whether a row was removed.
    pub async fn delete_product(&self, id: i64, seller_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM products WHERE id = ? AND seller_id = ?")
            .bind(id)
            .bind(seller_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
pub async fn test_repository() -> Repository {
    use sqlx::sqlite::SqlitePoolOptions;

    // a single long-lived connection keeps the in-memory database alive
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    sqlx::migrate!().run(&pool).await.expect("migrations apply");
    Repository::new(pool)
}

/// File-backed database behind a multi-connection pool, for tests that need
/// statements to run concurrently. Keep the `TempDir` alive for the test.
#[cfg(test)]
pub async fn test_file_repository() -> (tempfile::TempDir, Repository) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("storefront.db").display());
    let pool = connect(&url).await.expect("file database");
    (dir, Repository::new(pool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn duplicate_username_is_a_unique_violation() {
        let repo = test_repository().await;
        repo.insert_seller("alice", "hash-a").await.unwrap();
        let err = repo.insert_seller("alice", "hash-b").await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[actix_web::test]
    async fn usernames_are_case_sensitive() {
        let repo = test_repository().await;
        repo.insert_seller("alice", "hash-a").await.unwrap();
        repo.insert_seller("Alice", "hash-b").await.unwrap();
        assert!(repo.find_seller_by_username("ALICE").await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn upsert_merges_on_name_and_price() {
        let repo = test_repository().await;
        let seller = repo.insert_seller("alice", "hash").await.unwrap();

        let first = repo.upsert_product(seller.id, "Widget", 100, 5).await.unwrap().unwrap();
        let merged = repo.upsert_product(seller.id, "Widget", 100, 3).await.unwrap().unwrap();
        assert_eq!(first.id, merged.id);
        assert_eq!(merged.quantity, 8);

        let other = repo.upsert_product(seller.id, "Widget", 150, 1).await.unwrap().unwrap();
        assert_ne!(other.id, first.id);
    }

    #[actix_web::test]
    async fn upsert_refuses_to_overflow() {
        let repo = test_repository().await;
        let seller = repo.insert_seller("alice", "hash").await.unwrap();
        repo.upsert_product(seller.id, "Widget", 1, i64::MAX).await.unwrap().unwrap();
        let overflow = repo.upsert_product(seller.id, "Widget", 1, 1).await.unwrap();
        assert!(overflow.is_none());
        let stored = repo.products_by_seller(seller.id).await.unwrap();
        assert_eq!(stored[0].quantity, i64::MAX);
    }

    #[actix_web::test]
    async fn negative_values_violate_schema() {
        let repo = test_repository().await;
        let seller = repo.insert_seller("alice", "hash").await.unwrap();
        assert!(repo.upsert_product(seller.id, "Widget", -1, 1).await.is_err());
    }

    #[actix_web::test]
    async fn owner_scoped_writes_skip_foreign_rows() {
        let repo = test_repository().await;
        let alice = repo.insert_seller("alice", "hash").await.unwrap();
        let bob = repo.insert_seller("bob", "hash").await.unwrap();
        let product = repo.upsert_product(alice.id, "Widget", 100, 5).await.unwrap().unwrap();

        assert!(repo.update_product(product.id, bob.id, 1, 1).await.unwrap().is_none());
        assert!(!repo.delete_product(product.id, bob.id).await.unwrap());
        assert_eq!(repo.find_product(product.id).await.unwrap(), Some(product));
    }
}
