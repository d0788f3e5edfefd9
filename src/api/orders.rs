use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;

use super::error::ApiError;
use super::validation::{parse_json_body, validate_order};
use super::MessageResponse;
use crate::db::{DbError, Order, Product, User};
use crate::AppState;

const USER_NOT_FOUND: &str = "User not found";

/// Place an order for a user. Any caller may order on behalf of any user id.
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let data = parse_json_body(&body)?;
    let request = validate_order(&data)?;

    let user_id = request
        .user_id
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;
    let user = User::get_by_id(&state.db, user_id)
        .await
        .map_err(not_found_as_user)?;

    if state.config.orders.validate_products {
        let missing = Product::missing_ids(&state.db, &request.products).await?;
        if let Some(id) = missing.first() {
            return Err(ApiError::validation_field(
                "products",
                format!("Invalid pk \"{}\" - object does not exist.", id),
            ));
        }
    }

    let order = Order::create(&state.db, user.id, &request.products)
        .await
        .map_err(not_found_as_user)?;

    tracing::info!(
        order_id = order.id,
        user_id = user.id,
        products = request.products.len(),
        "Order placed"
    );

    Ok(Json(MessageResponse::new("Order placed")))
}

fn not_found_as_user(err: DbError) -> ApiError {
    match err {
        DbError::NotFound(_) => ApiError::not_found(USER_NOT_FOUND),
        other => other.into(),
    }
}
