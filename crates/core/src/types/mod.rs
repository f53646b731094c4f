//! Core types for CNB.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod promotion;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use promotion::{DiscountError, DiscountType, is_live};
pub use role::{Role, RoleParseError};
