//! Orders and the order/product association.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::db::DbError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    /// RFC 3339, assigned at insert
    pub created_at: String,
}

/// Order together with the ids of its products
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithProducts {
    #[serde(flatten)]
    pub order: Order,
    pub products: Vec<i64>,
}

/// Body of `POST /api/order/` once it has passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrderRequest {
    /// `None` when the client sent no id, which resolves to no user
    pub user_id: Option<i64>,
    pub products: Vec<i64>,
}

impl Order {
    /// Create an order owned by `user_id` and associate it with `product_ids`.
    ///
    /// Duplicate ids collapse into one association. Ids are not checked
    /// against the product table. The whole write happens in one transaction,
    /// so a failure leaves no partial order behind. The first statement is the
    /// order insert, so the transaction holds the write lock from the start and
    /// the `user_id` foreign key doubles as the existence check.
    pub async fn create(
        db: &SqlitePool,
        user_id: i64,
        product_ids: &[i64],
    ) -> Result<Order, DbError> {
        let mut tx = db.begin().await?;

        let created_at = chrono::Utc::now().to_rfc3339();
        let inserted = sqlx::query("INSERT INTO orders (user_id, created_at) VALUES (?, ?)")
            .bind(user_id)
            .bind(&created_at)
            .execute(&mut *tx)
            .await;
        let id = match inserted {
            Ok(done) => done.last_insert_rowid(),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                return Err(DbError::NotFound("User"));
            }
            Err(e) => return Err(e.into()),
        };

        for product_id in product_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO order_products (order_id, product_id) VALUES (?, ?)",
            )
            .bind(id)
            .bind(*product_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(Order {
            id,
            user_id,
            created_at,
        })
    }

    pub async fn get_by_id(db: &SqlitePool, id: i64) -> Result<Order, DbError> {
        sqlx::query_as::<_, Order>("SELECT id, user_id, created_at FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or(DbError::NotFound("Order"))
    }

    /// Product ids associated with an order, ascending
    pub async fn product_ids(db: &SqlitePool, order_id: i64) -> Result<Vec<i64>, DbError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT product_id FROM order_products WHERE order_id = ? ORDER BY product_id",
        )
        .bind(order_id)
        .fetch_all(db)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// All orders, optionally restricted to one user, oldest first
    pub async fn list(
        db: &SqlitePool,
        user_id: Option<i64>,
    ) -> Result<Vec<OrderWithProducts>, DbError> {
        let orders = match user_id {
            Some(user_id) => {
                sqlx::query_as::<_, Order>(
                    "SELECT id, user_id, created_at FROM orders WHERE user_id = ? ORDER BY id",
                )
                .bind(user_id)
                .fetch_all(db)
                .await?
            }
            None => {
                sqlx::query_as::<_, Order>("SELECT id, user_id, created_at FROM orders ORDER BY id")
                    .fetch_all(db)
                    .await?
            }
        };

        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            let products = Self::product_ids(db, order.id).await?;
            result.push(OrderWithProducts { order, products });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_memory, Product, User};

    async fn count(db: &SqlitePool, table: &str) -> i64 {
        let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(db)
            .await
            .unwrap();
        row.0
    }

    #[tokio::test]
    async fn test_create_for_unknown_user_creates_nothing() {
        let db = init_memory().await.unwrap();
        let err = Order::create(&db, 99, &[1, 2]).await.unwrap_err();

        assert!(matches!(err, DbError::NotFound("User")));
        assert_eq!(count(&db, "orders").await, 0);
        assert_eq!(count(&db, "order_products").await, 0);
    }

    #[tokio::test]
    async fn test_create_collapses_duplicate_products() {
        let db = init_memory().await.unwrap();
        let user = User::create(&db, "Alice", "a@x.com", "pw").await.unwrap();
        let a = Product::create(&db, "A", 1.0, "", "https://example.com/a.png").await.unwrap();
        let b = Product::create(&db, "B", 2.0, "", "https://example.com/b.png").await.unwrap();

        let order = Order::create(&db, user.id, &[b.id, a.id, b.id]).await.unwrap();

        assert_eq!(order.user_id, user.id);
        assert_eq!(Order::product_ids(&db, order.id).await.unwrap(), vec![a.id, b.id]);
        assert!(chrono::DateTime::parse_from_rfc3339(&order.created_at).is_ok());
        assert_eq!(Order::get_by_id(&db, order.id).await.unwrap(), order);
    }

    #[tokio::test]
    async fn test_unknown_product_ids_are_stored_as_given() {
        let db = init_memory().await.unwrap();
        let user = User::create(&db, "Alice", "a@x.com", "pw").await.unwrap();

        let order = Order::create(&db, user.id, &[404]).await.unwrap();
        assert_eq!(Order::product_ids(&db, order.id).await.unwrap(), vec![404]);
    }

    #[tokio::test]
    async fn test_sequential_orders_are_independent() {
        let db = init_memory().await.unwrap();
        let user = User::create(&db, "Alice", "a@x.com", "pw").await.unwrap();

        let first = Order::create(&db, user.id, &[1, 2]).await.unwrap();
        let second = Order::create(&db, user.id, &[3]).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(Order::product_ids(&db, first.id).await.unwrap(), vec![1, 2]);
        assert_eq!(Order::product_ids(&db, second.id).await.unwrap(), vec![3]);

        let listed = Order::list(&db, Some(user.id)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].order, first);
        assert_eq!(listed[1].products, vec![3]);
    }

    #[tokio::test]
    async fn test_list_filters_by_user() {
        let db = init_memory().await.unwrap();
        let alice = User::create(&db, "Alice", "a@x.com", "pw").await.unwrap();
        let bob = User::create(&db, "Bob", "b@x.com", "pw").await.unwrap();
        Order::create(&db, alice.id, &[]).await.unwrap();
        Order::create(&db, bob.id, &[1]).await.unwrap();

        assert_eq!(Order::list(&db, None).await.unwrap().len(), 2);
        let bobs = Order::list(&db, Some(bob.id)).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].order.user_id, bob.id);
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_to_orders() {
        let db = init_memory().await.unwrap();
        let user = User::create(&db, "Alice", "a@x.com", "pw").await.unwrap();
        Order::create(&db, user.id, &[1, 2]).await.unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user.id)
            .execute(&db)
            .await
            .unwrap();

        assert_eq!(count(&db, "orders").await, 0);
        assert_eq!(count(&db, "order_products").await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::Config::default();
        config.server.data_dir = dir.path().to_path_buf();
        let db = crate::db::init(&config).await.unwrap();
        let user_id = User::create(&db, "Alice", "a@x.com", "pw").await.unwrap().id;

        let mut handles = Vec::new();
        for _ in 0..50 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                Order::create(&db, user_id, &[1, 2, 3]).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(count(&db, "orders").await, 50);
        assert_eq!(count(&db, "order_products").await, 150);
        db.close().await;
    }

    #[test]
    fn test_serializes_flat() {
        let order = OrderWithProducts {
            order: Order {
                id: 3,
                user_id: 1,
                created_at: "2024-01-01T00:00:00+00:00".to_string(),
            },
            products: vec![1, 2],
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["user_id"], 1);
        assert_eq!(json["products"], serde_json::json!([1, 2]));
    }
}
