//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness
//! GET  /health/ready            - Readiness (database ping)
//!
//! # Auth
//! POST /auth/register           - Create account (rate limited)
//! POST /auth/login              - Start session (rate limited)
//! POST /auth/logout             - End session
//! GET  /auth/me                 - Current user
//!
//! # Addresses (auth)
//! GET  /addresses               - List
//! POST /addresses               - Create
//! DELETE /addresses/{id}        - Delete
//!
//! # Catalog
//! GET  /products                - Filtered listing
//! GET  /products/bestsellers    - Top sellers (cached)
//! GET  /products/{id}           - Detail with variants and recent reviews
//! GET  /products/{id}/variants  - Variants with available stock
//! GET  /products/{id}/reviews   - Reviews, paginated
//! POST /products/{id}/view      - Record a view (auth)
//! GET  /categories              - Categories with product counts
//! GET  /brands                  - Brands
//! GET  /recommendations         - Personal recommendations (auth)
//!
//! # Cart (auth)
//! GET  /cart                    - Items and total
//! POST /cart/add                - Add or merge a variant
//! PUT  /cart/update             - Set quantity
//! DELETE /cart/remove/{id}      - Remove line
//! DELETE /cart/clear            - Empty cart
//! GET  /cart/count              - Units in cart
//! GET  /cart/total              - Cart value
//!
//! # Orders (auth)
//! POST /orders                  - Place order
//! GET  /orders                  - Own orders with items (?status=)
//! GET  /orders/{id}             - Order with items
//! GET  /orders/{id}/status      - Status poll
//! PUT  /orders/{id}/status      - Status change (admin, or owner cancel)
//! POST /orders/{id}/cancel      - Self-service cancel
//! POST /orders/{id}/products/{product_id}/review - Review a delivered product
//! PUT  /reviews/{id}            - Edit own review
//! DELETE /reviews/{id}          - Delete own review
//!
//! # Live updates
//! GET  /ws                      - Order status WebSocket
//!
//! # Admin
//! GET  /admin/orders            - Orders with stats (?page=&limit=&range=)
//! GET  /admin/orders/stats      - Counts and revenue
//! GET  /admin/orders/status/{s} - Orders in one status
//! GET  /admin/orders/{id}       - Full order detail
//! PUT  /admin/orders/{id}/status - Status change
//! GET  /admin/reviews           - Moderation queue
//! PUT  /admin/reviews/{id}/verify - Verify or unverify
//! DELETE /admin/reviews/{id}    - Delete review
//! POST /admin/products          - Create product with variants
//! PUT  /admin/products/{id}     - Edit product fields and variant prices
//! DELETE /admin/products/{id}   - Remove from catalog (soft delete)
//! GET  /admin/variants/{id}/stock   - Stock position
//! GET  /admin/variants/{id}/ledger  - Ledger rows
//! POST /admin/variants/{id}/restock - Append import row
//! ```

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod health;
pub mod orders;
pub mod products;
pub mod recommendations;
pub mod reviews;
pub mod ws;

use axum::Router;

use crate::state::AppState;

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(addresses::router())
        .merge(products::router())
        .merge(recommendations::router())
        .merge(cart::router())
        .merge(orders::router())
        .merge(reviews::router())
        .merge(ws::router())
        .merge(admin::router())
}
