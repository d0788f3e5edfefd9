use axum::{extract::State, Json};
use std::sync::Arc;

use super::error::ApiError;
use crate::db::Product;
use crate::AppState;

/// List every product with all of its fields
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = Product::list(&state.db).await?;
    Ok(Json(products))
}
