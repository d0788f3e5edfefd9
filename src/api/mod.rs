pub mod auth;
pub mod error;
mod orders;
mod products;
mod users;
pub mod validation;

use axum::{
    handler::Handler,
    http::Method,
    routing::{get, post, MethodRouter},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub const PRODUCTS_PATH: &str = "/api/products/";
pub const REGISTER_PATH: &str = "/api/register/";
pub const ORDER_PATH: &str = "/api/order/";

/// `{"message": "..."}` body returned by successful writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One entry of the routing table
pub struct Endpoint {
    pub method: Method,
    pub path: &'static str,
    pub description: &'static str,
    route: MethodRouter<Arc<AppState>>,
}

impl Endpoint {
    fn get<H, T>(path: &'static str, description: &'static str, handler: H) -> Self
    where
        H: Handler<T, Arc<AppState>>,
        T: 'static,
    {
        Self {
            method: Method::GET,
            path,
            description,
            route: get(handler),
        }
    }

    fn post<H, T>(path: &'static str, description: &'static str, handler: H) -> Self
    where
        H: Handler<T, Arc<AppState>>,
        T: 'static,
    {
        Self {
            method: Method::POST,
            path,
            description,
            route: post(handler),
        }
    }
}

/// The static routing table: every public (method, path) and its handler
pub fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::get(PRODUCTS_PATH, "List all products", products::list_products),
        Endpoint::post(REGISTER_PATH, "Register a user", users::register_user),
        Endpoint::post(ORDER_PATH, "Place an order for a user", orders::place_order),
    ]
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router: Router<Arc<AppState>> = Router::new().route("/health", get(health_check));

    for endpoint in endpoints() {
        router = router.route(endpoint.path, endpoint.route);
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_table() {
        let table: Vec<(Method, &str)> = endpoints()
            .into_iter()
            .map(|e| (e.method, e.path))
            .collect();

        assert_eq!(
            table,
            vec![
                (Method::GET, "/api/products/"),
                (Method::POST, "/api/register/"),
                (Method::POST, "/api/order/"),
            ]
        );
    }

    #[test]
    fn test_message_response_shape() {
        let json = serde_json::to_value(MessageResponse::new("Order placed")).unwrap();
        assert_eq!(json, serde_json::json!({"message": "Order placed"}));
    }
}
