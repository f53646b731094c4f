//! User management routes.
//!
//! Role changes publish the before/after documents onto the change feed,
//! where the notifier picks up account activations.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cnb_core::listing::{ListQuery, UserSort, compare_text, search_and_sort};
use cnb_core::{Action, Role, UserUid};

use crate::{
    db::UserRepository,
    error::AppError,
    middleware::RequireUser,
    models::{CurrentUser, User},
    services::{DeleteOutcome, IdentityProvider, user_deletion::DELETED_MESSAGE},
    state::AppState,
};

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(index))
        .route("/api/users/{uid}", delete(destroy))
        .route("/api/users/{uid}/role", put(change_role))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChangeRequest {
    pub role: Role,
    /// Required when an admin removes their own admin role.
    #[serde(default)]
    pub confirm_self_demotion: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Search and sort a user list.
#[must_use]
pub fn filter_users(users: Vec<User>, query: &ListQuery<UserSort>) -> Vec<User> {
    let sort = query.sort;
    let dir = query.dir;
    search_and_sort(
        users,
        query.term(),
        |u| {
            let mut fields = vec![u.display_name(), u.email.as_str(), u.role.as_str()];
            fields.extend(u.company_name.as_deref());
            fields
        },
        |a, b| {
            let ordering = match sort {
                UserSort::Name => compare_text(a.display_name(), b.display_name()),
                UserSort::Email => compare_text(&a.email, &b.email),
                UserSort::Role => a.role.as_str().cmp(b.role.as_str()),
            };
            dir.apply(ordering)
        },
    )
}

/// Whether a role change is an admin dropping their own admin role.
#[must_use]
pub fn is_self_demotion(actor: &CurrentUser, target: &UserUid, new_role: Role) -> bool {
    actor.uid == *target && actor.role == Role::Admin && new_role != Role::Admin
}

/// List users.
///
/// GET /api/users?q=&sort=name|email|role&dir=asc|desc
#[instrument(skip(user, state))]
pub async fn index(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery<UserSort>>,
) -> Result<Json<Vec<User>>, AppError> {
    user.require(Action::ViewUsers)?;
    let users = UserRepository::new(state.pool()).list().await?;
    Ok(Json(filter_users(users, &query)))
}

/// Assign a role.
///
/// PUT /api/users/{uid}/role
#[instrument(skip(user, state))]
pub async fn change_role(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(uid): Path<UserUid>,
    Json(body): Json<RoleChangeRequest>,
) -> Result<Json<User>, AppError> {
    user.require(Action::ChangeRole)?;

    if is_self_demotion(&user, &uid, body.role) && !body.confirm_self_demotion {
        return Err(AppError::Conflict(
            "You are about to remove your own admin access; resend with confirmSelfDemotion"
                .to_string(),
        ));
    }

    let change = UserRepository::new(state.pool())
        .update_role(&uid, body.role)
        .await?;
    let after = change.after.clone();
    state.changes().publish(change).await;

    tracing::info!(target_uid = %uid, role = %after.role, uid = %user.uid, "Role assigned");
    Ok(Json(after))
}

/// Delete the account from the identity provider, then the user document.
///
/// Both steps tolerate an already-missing record, so retrying after a
/// partial failure finishes the job.
///
/// DELETE /api/users/{uid}
#[instrument(skip(user, state))]
pub async fn destroy(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(uid): Path<UserUid>,
) -> Result<Json<MessageResponse>, AppError> {
    user.require(Action::DeleteUser)?;

    let outcome = state.identity().delete_account(&uid).await?;
    let removed = UserRepository::new(state.pool()).delete(&uid).await?;

    tracing::info!(
        target_uid = %uid,
        uid = %user.uid,
        account_existed = outcome == DeleteOutcome::Deleted,
        document_existed = removed,
        "User deleted"
    );
    Ok(Json(MessageResponse {
        message: DELETED_MESSAGE,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cnb_core::listing::SortDirection;

    use super::*;

    fn user(uid: &str, name: &str, email: &str, role: Role) -> User {
        let mut u = User::pending(UserUid::new(uid), email, name);
        u.role = role;
        u
    }

    fn actor(role: Role) -> CurrentUser {
        CurrentUser {
            uid: UserUid::new("me"),
            email: "me@example.com".to_string(),
            name: "Me".to_string(),
            role,
        }
    }

    #[test]
    fn test_self_demotion_detection() {
        let me = UserUid::new("me");
        let other = UserUid::new("other");
        assert!(is_self_demotion(&actor(Role::Admin), &me, Role::Manager));
        assert!(!is_self_demotion(&actor(Role::Admin), &me, Role::Admin));
        assert!(!is_self_demotion(&actor(Role::Admin), &other, Role::Pending));
    }

    #[test]
    fn test_filter_users() {
        let users = vec![
            user("1", "Zed", "zed@shop.com", Role::Pending),
            user("2", "", "anon@example.com", Role::UserWithPrice),
            user("3", "amy", "amy@shop.com", Role::Admin),
        ];

        let query = ListQuery {
            q: Some("SHOP".to_string()),
            sort: UserSort::Name,
            dir: SortDirection::Asc,
        };
        let names: Vec<_> = filter_users(users.clone(), &query)
            .iter()
            .map(|u| u.uid.to_string())
            .collect();
        assert_eq!(names, ["3", "1"]);

        let query = ListQuery {
            q: Some("pending".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(filter_users(users, &query).len(), 1);
    }

    #[test]
    fn test_role_change_request_defaults() {
        let body: RoleChangeRequest = serde_json::from_str(r#"{"role":"User - No Price"}"#).unwrap();
        assert_eq!(body.role, Role::UserWithoutPrice);
        assert!(!body.confirm_self_demotion);
    }
}
