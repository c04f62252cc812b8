//! Techmart Core - Shared domain types.
//!
//! This crate provides the types shared by every Techmart component:
//! - `storefront` - JSON API server for shoppers and administrators
//! - `cli` - Command-line tools for migrations, seeding and inventory upkeep
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. The order status state machine lives here so that the
//! server and the CLI agree on which transitions are legal.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, emails, and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
