//! Integration tests for the CNB Carpets admin.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cnb-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `user_deletion` - Deletion endpoint checks against in-memory collaborators
//! - `role_notifications` - Change feed and notifier worker end to end
//! - `category_tree` - Ordering invariants across a whole category tree
//! - `catalog_documents` - Stored document shapes for products and categories
//!
//! None of these need a database, SMTP relay or identity provider; the
//! service seams are exercised through in-memory fakes.
