//! Product catalogue model.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::db::DbError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub description: String,
    pub image: String,
}

impl Product {
    /// All products in insertion order
    pub async fn list(db: &SqlitePool) -> Result<Vec<Product>, DbError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, price, description, image FROM products ORDER BY id",
        )
        .fetch_all(db)
        .await?;
        Ok(products)
    }

    pub async fn get_by_id(db: &SqlitePool, id: i64) -> Result<Product, DbError> {
        sqlx::query_as::<_, Product>(
            "SELECT id, name, price, description, image FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(DbError::NotFound("Product"))
    }

    /// Insert a product directly. There is no HTTP endpoint for this; the
    /// catalogue is managed from the command line.
    pub async fn create(
        db: &SqlitePool,
        name: &str,
        price: f64,
        description: &str,
        image: &str,
    ) -> Result<Product, DbError> {
        let id = sqlx::query(
            "INSERT INTO products (name, price, description, image) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(price)
        .bind(description)
        .bind(image)
        .execute(db)
        .await?
        .last_insert_rowid();

        Self::get_by_id(db, id).await
    }

    /// Return the ids from `ids` that have no matching product, ascending and
    /// without duplicates.
    pub async fn missing_ids(db: &SqlitePool, ids: &[i64]) -> Result<Vec<i64>, DbError> {
        let mut wanted: Vec<i64> = ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        if wanted.is_empty() {
            return Ok(wanted);
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id FROM products WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in &wanted {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let found: Vec<(i64,)> = query.build_query_as().fetch_all(db).await?;
        let found: Vec<i64> = found.into_iter().map(|(id,)| id).collect();

        Ok(wanted.into_iter().filter(|id| !found.contains(id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    #[tokio::test]
    async fn test_list_empty() {
        let db = init_memory().await.unwrap();
        assert!(Product::list(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_returns_insertion_order_with_exact_fields() {
        let db = init_memory().await.unwrap();
        let lamp = Product::create(&db, "Lamp", 24.99, "Desk lamp", "https://cdn.example.com/lamp.jpg")
            .await
            .unwrap();
        let chair = Product::create(&db, "Chair", 120.0, "Oak chair\nwith cushion", "https://cdn.example.com/chair.jpg")
            .await
            .unwrap();

        let products = Product::list(&db).await.unwrap();
        assert_eq!(products, vec![lamp.clone(), chair]);
        assert_eq!(products[0].name, "Lamp");
        assert_eq!(products[0].price, 24.99);
        assert_eq!(products[1].description, "Oak chair\nwith cushion");
        assert!(lamp.id < products[1].id);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = init_memory().await.unwrap();
        let err = Product::get_by_id(&db, 42).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound("Product")));
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let db = init_memory().await.unwrap();
        let a = Product::create(&db, "A", 1.0, "", "https://example.com/a.png").await.unwrap();
        let b = Product::create(&db, "B", 2.0, "", "https://example.com/b.png").await.unwrap();

        assert!(Product::missing_ids(&db, &[]).await.unwrap().is_empty());
        assert!(Product::missing_ids(&db, &[a.id, b.id, a.id]).await.unwrap().is_empty());
        assert_eq!(
            Product::missing_ids(&db, &[999, a.id, 500, 999]).await.unwrap(),
            vec![500, 999]
        );
    }
}
