//! JSON REST API for the gym membership system.
//!
//! Exposes an axum [`Router`] backed by a [`Gym`] over any
//! [`gym_core::store::GymStore`]. Authentication, TLS, and transport concerns
//! are the caller's responsibility: every request must carry an
//! [`Actor`](gym_core::account::Actor) request extension identifying the
//! authenticated staff member.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", gym_api::api_router(gym.clone()).layer(auth_layer))
//! ```

pub mod accounts;
pub mod credentials;
pub mod error;
pub mod members;
pub mod notifications;
pub mod payments;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use gym_core::{Gym, store::GymStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `gym`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(gym: Arc<Gym<S>>) -> Router<()>
where
  S: GymStore + 'static,
{
  Router::new()
    // Members
    .route("/members", get(members::list::<S>).post(members::create::<S>))
    .route(
      "/members/{id}",
      get(members::get_one::<S>)
        .patch(members::update::<S>)
        .delete(members::delete_one::<S>),
    )
    .route("/members/{id}/status", post(members::change_status::<S>))
    // Payments
    .route(
      "/members/{id}/payments",
      get(payments::for_member::<S>).post(payments::apply::<S>),
    )
    .route("/payments", get(payments::recent::<S>))
    .route("/payments/{id}", delete(payments::delete_one::<S>))
    // Notifications
    .route("/notifications", get(notifications::unread::<S>))
    .route("/notifications/read-all", post(notifications::mark_all_read::<S>))
    .route("/notifications/{id}/read", post(notifications::mark_read::<S>))
    // Accounts
    .route("/accounts", get(accounts::list::<S>).post(accounts::create::<S>))
    .route(
      "/accounts/{id}",
      get(accounts::get_one::<S>)
        .patch(accounts::update::<S>)
        .delete(accounts::delete_one::<S>),
    )
    // Reconciliation
    .route("/reconcile", post(notifications::reconcile::<S>))
    .with_state(gym)
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    Extension,
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::{DateTime, Utc};
  use gym_core::{Gym, Settings, account::Actor, clock::FixedClock, rbac::Role};
  use gym_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;

  fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
  }

  async fn make_gym() -> Arc<Gym<SqliteStore>> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let clock = Arc::new(FixedClock::new(at("2025-01-01T00:00:00Z")));
    Arc::new(Gym::new(Arc::new(store), clock, Settings::default()))
  }

  fn actor(role: Role) -> Actor { Actor { account_id: Uuid::new_v4(), role } }

  async fn call(
    gym: &Arc<Gym<SqliteStore>>,
    as_actor: Actor,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    let resp = api_router(gym.clone())
      .layer(Extension(as_actor))
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn register(gym: &Arc<Gym<SqliteStore>>, clerk: Actor) -> String {
    let (status, member) = call(
      gym,
      clerk,
      "POST",
      "/members",
      Some(json!({ "given_name": "Dana", "family_name": "Reyes", "phone": "555-0101" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(member["status"], "pending");
    member["member_id"].as_str().unwrap().to_owned()
  }

  #[tokio::test]
  async fn register_and_pay() {
    let gym = make_gym().await;
    let clerk = actor(Role::Employee);
    let id = register(&gym, clerk).await;

    let (status, applied) = call(
      &gym,
      clerk,
      "POST",
      &format!("/members/{id}/payments"),
      Some(json!({ "amount_cents": 3000, "period_months": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(applied["member"]["status"], "active");
    assert_eq!(applied["member"]["membership_end"], "2025-02-01T00:00:00Z");
    assert_eq!(applied["payment"]["method"], "cash");

    let (status, history) =
      call(&gym, clerk, "GET", &format!("/members/{id}/payments"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);

    let (_, active) = call(&gym, clerk, "GET", "/members?status=active", None).await;
    assert_eq!(active.as_array().unwrap().len(), 1);
    let (_, frozen) = call(&gym, clerk, "GET", "/members?status=frozen", None).await;
    assert!(frozen.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn invalid_payment_is_400() {
    let gym = make_gym().await;
    let clerk = actor(Role::Employee);
    let id = register(&gym, clerk).await;

    let (status, body) = call(
      &gym,
      clerk,
      "POST",
      &format!("/members/{id}/payments"),
      Some(json!({ "amount_cents": -1, "period_months": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid payment"));
  }

  #[tokio::test]
  async fn unknown_member_is_404() {
    let gym = make_gym().await;
    let (status, _) = call(
      &gym,
      actor(Role::Admin),
      "GET",
      &format!("/members/{}", Uuid::new_v4()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn employee_cannot_delete_or_reconcile() {
    let gym = make_gym().await;
    let clerk = actor(Role::Employee);
    let id = register(&gym, clerk).await;

    let (status, _) = call(&gym, clerk, "DELETE", &format!("/members/{id}"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&gym, clerk, "POST", "/reconcile", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = actor(Role::Admin);
    let (status, report) = call(&gym, admin, "POST", "/reconcile", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["examined"], 1);
    let (status, _) = call(&gym, admin, "DELETE", &format!("/members/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
  }

  #[tokio::test]
  async fn status_changes() {
    let gym = make_gym().await;
    let clerk = actor(Role::Employee);
    let admin = actor(Role::Admin);
    let id = register(&gym, clerk).await;

    let uri = format!("/members/{id}/status");
    let (status, _) = call(&gym, admin, "POST", &uri, Some(json!({ "change": "freeze" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "pending members cannot be frozen");

    let (status, member) = call(&gym, admin, "POST", &uri, Some(json!({ "change": "cancel" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(member["status"], "cancelled");
  }

  #[tokio::test]
  async fn notifications_are_read_per_account() {
    let gym = make_gym().await;
    let clerk = actor(Role::Employee);
    let admin = actor(Role::Admin);
    register(&gym, clerk).await;

    let (_, unread) = call(&gym, admin, "GET", "/notifications", None).await;
    let unread = unread.as_array().unwrap().clone();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0]["kind"], "member_added");

    let id = unread[0]["notification_id"].as_str().unwrap();
    let (status, _) =
      call(&gym, admin, "POST", &format!("/notifications/{id}/read"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, after) = call(&gym, admin, "GET", "/notifications", None).await;
    assert!(after.as_array().unwrap().is_empty());

    let (_, marked) = call(&gym, clerk, "POST", "/notifications/read-all", None).await;
    assert_eq!(marked["marked"], 1);
  }

  #[tokio::test]
  async fn accounts_hide_credentials() {
    let gym = make_gym().await;
    let root = gym
      .bootstrap_super_admin("Owner".into(), "owner@gym.example".into(), "h".into())
      .await
      .unwrap()
      .actor();

    let (status, created) = call(
      &gym,
      root,
      "POST",
      "/accounts",
      Some(json!({
        "name": "Cy",
        "email": "cy@gym.example",
        "password": "s3cret",
        "role": "employee",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role"], "employee");
    assert!(created.get("credential_hash").is_none());

    let id = created["account_id"].as_str().unwrap();
    let stored = gym.account_for_login("cy@gym.example").await.unwrap().unwrap();
    assert!(crate::credentials::verify_password("s3cret", &stored.credential_hash));

    let clerk = stored.actor();
    let (status, _) = call(
      &gym,
      clerk,
      "PATCH",
      &format!("/accounts/{id}"),
      Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
      &gym,
      clerk,
      "PATCH",
      &format!("/accounts/{id}"),
      Some(json!({ "password": "n3w" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stored = gym.account_for_login("cy@gym.example").await.unwrap().unwrap();
    assert!(crate::credentials::verify_password("n3w", &stored.credential_hash));
  }

  #[tokio::test]
  async fn permission_is_checked_before_the_password() {
    let gym = make_gym().await;
    let root = gym
      .bootstrap_super_admin("Owner".into(), "owner@gym.example".into(), "h".into())
      .await
      .unwrap();
    let admin = actor(Role::Admin);

    // An empty password is a 400 once hashing runs; a 403 proves it never did.
    let (status, _) = call(
      &gym,
      admin,
      "POST",
      "/accounts",
      Some(json!({
        "name": "Dee",
        "email": "dee@gym.example",
        "password": "",
        "role": "super-admin",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
      &gym,
      admin,
      "PATCH",
      &format!("/accounts/{}", root.account_id),
      Some(json!({ "password": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let stored = gym.account_for_login("owner@gym.example").await.unwrap().unwrap();
    assert_eq!(stored.credential_hash, "h");
  }
}
