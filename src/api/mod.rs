//! HTTP surface: one module per resource, assembled here.

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod consultations;
pub mod favorites;
pub mod orders;
pub mod products;

use crate::state::AppState;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl Pagination {
    /// Clamped page/per_page: page starts at 1, per_page capped at 100.
    pub fn clamp(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        (page, per_page)
    }

    pub fn limit_offset(&self) -> (i64, i64) {
        let (page, per_page) = self.clamp();
        (i64::from(per_page), i64::from((page - 1) * per_page))
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async {
                Json(serde_json::json!({"status": "healthy", "service": "beauty-store"}))
            }),
        )
        .merge(products::routes())
        .merge(cart::routes())
        .merge(checkout::routes())
        .merge(orders::routes())
        .merge(consultations::routes())
        .merge(favorites::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(p.clamp(), (1, 100));
        let (limit, offset) = p.limit_offset();
        assert_eq!((limit, offset), (100, 0));
    }

    #[test]
    fn pagination_defaults() {
        let p = Pagination {
            page: None,
            per_page: None,
        };
        assert_eq!(p.clamp(), (1, 20));
    }

    #[test]
    fn pagination_offset_math() {
        let p = Pagination {
            page: Some(3),
            per_page: Some(25),
        };
        assert_eq!(p.limit_offset(), (25, 50));
    }
}
