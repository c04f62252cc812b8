//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Password registration and login
//! - `catalog` - Product reads and cached ranked lists
//! - `orders` - Order placement and the status state machine
//! - `reviews` - Review eligibility

pub mod auth;
pub mod catalog;
pub mod orders;
pub mod reviews;

pub use auth::{AuthError, AuthService};
pub use catalog::{CatalogCache, CatalogService};
pub use orders::{OrderError, OrderService};
pub use reviews::{ReviewError, ReviewService};
