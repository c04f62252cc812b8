//! Admin endpoints. Every handler requires [`RequireAdmin`](crate::middleware::RequireAdmin).

pub mod catalog;
pub mod orders;
pub mod reviews;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(orders::router())
        .merge(reviews::router())
        .merge(catalog::router())
}
