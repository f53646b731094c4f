//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                               - Liveness check
//! GET  /health/ready                         - Readiness check (database)
//!
//! # Auth (session cookie)
//! POST /api/auth/login                       - Sign in with email and password
//! POST /api/auth/logout                      - Sign out
//! GET  /api/auth/me                          - Current user
//!
//! # Dashboard
//! GET  /api/dashboard                        - Counts and recent records
//!
//! # Categories
//! GET    /api/categories                     - Category tree
//! POST   /api/categories                     - Create category / subcategory / sub-subcategory
//! GET    /api/categories/{id}                - One category
//! PATCH  /api/categories/{id}                - Rename category or nested node
//! POST   /api/categories/{id}/move           - Move category or nested node up/down
//! DELETE /api/categories/{id}                - Delete category, clear product references
//! DELETE /api/categories/{id}/nodes/{node}   - Delete nested node, clear product references
//!
//! # Products
//! GET    /api/products                       - List (?q=&sort=&dir=)
//! POST   /api/products                       - Create
//! GET    /api/products/{id}                  - Detail
//! PUT    /api/products/{id}                  - Update (images appended)
//! DELETE /api/products/{id}                  - Delete images, then product
//!
//! # Promotions
//! GET    /api/promotions                     - List
//! POST   /api/promotions                     - Create
//! GET    /api/promotions/{id}                - Detail
//! PUT    /api/promotions/{id}                - Update (images appended)
//! DELETE /api/promotions/{id}                - Delete images, then promotion
//!
//! # Images
//! POST   /api/images                         - Multipart upload, returns download URLs
//!
//! # Users
//! GET    /api/users                          - List (?q=&sort=&dir=)
//! PUT    /api/users/{uid}/role               - Assign role
//! DELETE /api/users/{uid}                    - Delete account and document
//!
//! # Functions (bearer ID token, no session)
//! POST   /api/functions/delete-user          - Delete an identity account
//! ```

pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod functions;
pub mod images;
pub mod products;
pub mod promotions;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// All API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(categories::router())
        .merge(products::router())
        .merge(promotions::router())
        .merge(images::router())
        .merge(users::router())
        .merge(functions::router())
}
