//! CNB Core - Shared domain types and pure logic.
//!
//! This crate provides the types and decision logic used across the CNB
//! Carpets admin components:
//! - `admin` - Admin API service (catalog, users, notifier)
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. Everything here is testable without a
//! running database or any external service.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, roles, discounts
//! - [`auth`] - The single authorization decision function
//! - [`category`] - Three-level category tree with ordering operations
//! - [`forms`] - Immutable form-state structs and their submit validation
//! - [`listing`] - Search and sort helpers for list pages

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod category;
pub mod forms;
pub mod listing;
pub mod types;

pub use auth::{Action, AuthzError, authorize};
pub use category::{CategoryNode, CategoryTreeError, Level, MoveDirection, Sibling};
pub use forms::FormError;
pub use types::*;
