use std::{path::PathBuf, sync::Arc};

use axum::{
    body::{Body, Bytes},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use ledger_books_api::{
    authentication::JwtKeys,
    identities::{domain::users::NewUserData, services::UserService},
    repos::MemoryStore,
    server::{app, serve_uploads, AppState, Repositories},
    storage::{DynObjectStorage, LocalObjectStorage, MemoryObjectStorage},
};

const PUBLIC_URL: &str = "http://localhost:8000/uploads";

struct TestApp {
    router: Router,
    store: MemoryStore,
}

impl TestApp {
    fn new() -> Self {
        let (store, state) = Self::state(Arc::new(MemoryObjectStorage::default()));

        Self {
            router: app(state),
            store,
        }
    }

    /// An app storing photos in a directory that it also serves.
    fn with_local_storage(root: PathBuf) -> Self {
        let storage = LocalObjectStorage::new(root.clone(), PUBLIC_URL.to_owned());
        let (store, state) = Self::state(Arc::new(storage));

        Self {
            router: serve_uploads(app(state), PUBLIC_URL, root).unwrap(),
            store,
        }
    }

    fn state(storage: DynObjectStorage) -> (MemoryStore, AppState) {
        let store = MemoryStore::new();
        let state = AppState::new(
            Repositories::in_memory(store.clone()),
            storage,
            JwtKeys::from_secret(b"integration-secret", chrono::Duration::hours(1)),
        );

        (store, state)
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.send_raw(method, uri, token, body).await;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Bytes) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();

        (status, bytes)
    }

    async fn sign_up(&self, username: &str) -> String {
        let (status, _) = self
            .send(
                Method::POST,
                "/users",
                None,
                Some(json!({
                    "first_name": "Test",
                    "last_name": "User",
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "correct horse",
                })),
            )
            .await;
        assert_eq!(StatusCode::CREATED, status);

        self.log_in(username).await
    }

    async fn admin(&self) -> String {
        UserService::new(Arc::new(self.store.clone()))
            .create_admin(NewUserData {
                first_name: "Admin".to_owned(),
                last_name: "User".to_owned(),
                username: "admin".to_owned(),
                email: "admin@example.com".to_owned(),
                password: "correct horse".to_owned(),
            })
            .await
            .unwrap();

        self.log_in("admin").await
    }

    async fn log_in(&self, username: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/sessions",
                None,
                Some(json!({ "username": username, "password": "correct horse" })),
            )
            .await;
        assert_eq!(StatusCode::CREATED, status);

        body["token"].as_str().unwrap().to_owned()
    }

    async fn currency(&self, admin_token: &str) -> i64 {
        let (status, body) = self
            .send(
                Method::POST,
                "/currencies",
                Some(admin_token),
                Some(json!({ "name": "EUR" })),
            )
            .await;
        assert_eq!(StatusCode::CREATED, status);

        body["id"].as_i64().unwrap()
    }

    async fn debit_account(&self, token: &str, currency_id: i64, initial_balance: i64) -> i64 {
        let (status, body) = self
            .send(
                Method::POST,
                "/debit-accounts",
                Some(token),
                Some(json!({
                    "name": "Checking",
                    "bank": "Local Bank",
                    "initial_balance": initial_balance,
                    "currency_id": currency_id,
                })),
            )
            .await;
        assert_eq!(StatusCode::CREATED, status);

        body["id"].as_i64().unwrap()
    }

    async fn balance(&self, token: &str, account_id: i64) -> i64 {
        let (status, body) = self
            .send(
                Method::GET,
                &format!("/debit-accounts/{}", account_id),
                Some(token),
                None,
            )
            .await;
        assert_eq!(StatusCode::OK, status);

        body["balance"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn sessions_authenticate_requests() {
    let test_app = TestApp::new();

    let (status, _) = test_app.send(Method::GET, "/me", None, None).await;
    assert_eq!(StatusCode::UNAUTHORIZED, status);

    let token = test_app.sign_up("ada").await;
    let (status, body) = test_app.send(Method::GET, "/me", Some(&token), None).await;

    assert_eq!(StatusCode::OK, status);
    assert_eq!("ada", body["username"]);
    assert_eq!("user", body["role"]);

    let (status, _) = test_app
        .send(
            Method::POST,
            "/sessions",
            None,
            Some(json!({ "username": "ada", "password": "wrong password" })),
        )
        .await;
    assert_eq!(StatusCode::UNAUTHORIZED, status);
}

#[tokio::test]
async fn invalid_sign_up_reports_field_errors() {
    let test_app = TestApp::new();

    let (status, body) = test_app
        .send(
            Method::POST,
            "/users",
            None,
            Some(json!({
                "first_name": "Ada",
                "last_name": "Lovelace",
                "username": "ada",
                "email": "not-an-email",
                "password": "short",
            })),
        )
        .await;

    assert_eq!(StatusCode::BAD_REQUEST, status);
    assert!(body["errors"]["email"].is_array());
    assert!(body["errors"]["password"].is_array());
}

#[tokio::test]
async fn currency_mutations_require_admin() {
    let test_app = TestApp::new();
    let token = test_app.sign_up("ada").await;

    let (status, _) = test_app
        .send(
            Method::POST,
            "/currencies",
            Some(&token),
            Some(json!({ "name": "EUR" })),
        )
        .await;
    assert_eq!(StatusCode::FORBIDDEN, status);

    let admin = test_app.admin().await;
    let currency_id = test_app.currency(&admin).await;

    let (status, body) = test_app
        .send(Method::GET, "/currencies", Some(&token), None)
        .await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(currency_id, body[0]["id"].as_i64().unwrap());
}

#[tokio::test]
async fn transactions_move_the_balance() {
    let test_app = TestApp::new();
    let admin = test_app.admin().await;
    let currency_id = test_app.currency(&admin).await;
    let token = test_app.sign_up("ada").await;
    let account_id = test_app.debit_account(&token, currency_id, 1000).await;

    let withdrawal = json!({
        "account_id": account_id,
        "amount": -500,
        "operation_id": "5f0c9d5e-3b7a-4d1e-9a53-2f1f7e0f6a11",
    });

    let (status, created) = test_app
        .send(
            Method::POST,
            "/transactions",
            Some(&token),
            Some(withdrawal.clone()),
        )
        .await;
    assert_eq!(StatusCode::CREATED, status);
    assert_eq!(500, test_app.balance(&token, account_id).await);

    let (status, replayed) = test_app
        .send(Method::POST, "/transactions", Some(&token), Some(withdrawal))
        .await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(created["id"], replayed["id"]);
    assert_eq!(500, test_app.balance(&token, account_id).await);

    let (status, _) = test_app
        .send(
            Method::POST,
            "/transactions",
            Some(&token),
            Some(json!({ "account_id": account_id, "amount": -600 })),
        )
        .await;
    assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
    assert_eq!(500, test_app.balance(&token, account_id).await);

    let (status, body) = test_app
        .send(
            Method::POST,
            "/transactions",
            Some(&token),
            Some(json!({ "account_id": account_id, "amount": 0 })),
        )
        .await;
    assert_eq!(StatusCode::BAD_REQUEST, status);
    assert!(body["errors"]["amount"].is_array());
}

#[tokio::test]
async fn deleted_transactions_can_be_restored() {
    let test_app = TestApp::new();
    let admin = test_app.admin().await;
    let currency_id = test_app.currency(&admin).await;
    let token = test_app.sign_up("ada").await;
    let account_id = test_app.debit_account(&token, currency_id, 100).await;

    let (_, transaction) = test_app
        .send(
            Method::POST,
            "/transactions",
            Some(&token),
            Some(json!({ "account_id": account_id, "amount": -40, "memo": "Coffee" })),
        )
        .await;
    let uri = format!("/transactions/{}", transaction["id"]);

    let (status, _) = test_app.send(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(StatusCode::NO_CONTENT, status);
    assert_eq!(100, test_app.balance(&token, account_id).await);

    let (status, _) = test_app.send(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(StatusCode::NOT_FOUND, status);

    let (status, _) = test_app
        .send(Method::GET, "/transactions", Some(&token), None)
        .await;
    assert_eq!(StatusCode::OK, status);

    let (_, listing) = test_app
        .send(
            Method::GET,
            "/transactions?include_deleted=true",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(1, listing["items"].as_array().unwrap().len());

    let (status, restored) = test_app
        .send(Method::POST, &format!("{}/restore", uri), Some(&token), None)
        .await;
    assert_eq!(StatusCode::OK, status);
    assert!(restored["deleted_at"].is_null());
    assert_eq!(60, test_app.balance(&token, account_id).await);
}

#[tokio::test]
async fn accounts_of_other_users_are_not_found() {
    let test_app = TestApp::new();
    let admin = test_app.admin().await;
    let currency_id = test_app.currency(&admin).await;
    let owner = test_app.sign_up("ada").await;
    let intruder = test_app.sign_up("mallory").await;
    let account_id = test_app.debit_account(&owner, currency_id, 100).await;

    let (status, _) = test_app
        .send(
            Method::GET,
            &format!("/debit-accounts/{}", account_id),
            Some(&intruder),
            None,
        )
        .await;
    assert_eq!(StatusCode::NOT_FOUND, status);

    let (status, _) = test_app
        .send(
            Method::POST,
            "/transactions",
            Some(&intruder),
            Some(json!({ "account_id": account_id, "amount": -10 })),
        )
        .await;
    assert_eq!(StatusCode::NOT_FOUND, status);

    let (status, _) = test_app
        .send(
            Method::GET,
            &format!("/credit-accounts/{}", account_id),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(StatusCode::NOT_FOUND, status);
}

#[tokio::test]
async fn transactions_are_paginated() {
    let test_app = TestApp::new();
    let admin = test_app.admin().await;
    let currency_id = test_app.currency(&admin).await;
    let token = test_app.sign_up("ada").await;
    let account_id = test_app.debit_account(&token, currency_id, 0).await;

    for _ in 0..55 {
        let (status, _) = test_app
            .send(
                Method::POST,
                "/transactions",
                Some(&token),
                Some(json!({ "account_id": account_id, "amount": 1 })),
            )
            .await;
        assert_eq!(StatusCode::CREATED, status);
    }

    let (status, first_page) = test_app
        .send(Method::GET, "/transactions", Some(&token), None)
        .await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(50, first_page["items"].as_array().unwrap().len());

    let next = first_page["next"].as_str().unwrap();
    let (_, second_page) = test_app
        .send(
            Method::GET,
            &format!("/transactions?after={}", next),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(5, second_page["items"].as_array().unwrap().len());
    assert!(second_page["next"].is_null());

    let (status, _) = test_app
        .send(
            Method::GET,
            "/transactions?after=definitely-not-a-cursor",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(StatusCode::BAD_REQUEST, status);
}

#[tokio::test]
async fn categories_hold_sub_categories() {
    let test_app = TestApp::new();
    let token = test_app.sign_up("ada").await;

    let (status, category) = test_app
        .send(
            Method::POST,
            "/categories",
            Some(&token),
            Some(json!({ "name": "Food", "kind": "expense" })),
        )
        .await;
    assert_eq!(StatusCode::CREATED, status);

    let (status, _) = test_app
        .send(
            Method::POST,
            &format!("/categories/{}/sub-categories", category["id"]),
            Some(&token),
            Some(json!({ "name": "Groceries" })),
        )
        .await;
    assert_eq!(StatusCode::CREATED, status);

    let (_, incomes) = test_app
        .send(Method::GET, "/categories?kind=income", Some(&token), None)
        .await;
    assert!(incomes.as_array().unwrap().is_empty());

    let (_, expenses) = test_app
        .send(Method::GET, "/categories?kind=expense", Some(&token), None)
        .await;
    assert_eq!("Groceries", expenses[0]["sub_categories"][0]["name"]);
}

#[tokio::test]
async fn place_photos_are_served_from_their_uri() {
    let root = std::env::temp_dir().join(format!("ledger-books-{}", uuid::Uuid::new_v4()));
    let test_app = TestApp::with_local_storage(root.clone());
    let admin = test_app.admin().await;
    let png: Vec<u8> = vec![137, 80, 78, 71, 13, 10, 26, 10];

    let (status, place) = test_app
        .send(
            Method::POST,
            "/places",
            Some(&admin),
            Some(json!({
                "name": "Market",
                "latitude": 41.39,
                "longitude": 2.17,
                "photo": { "content_type": "image/png", "data": base64::encode(&png) },
            })),
        )
        .await;
    assert_eq!(StatusCode::CREATED, status);

    let photo_uri = place["photo_uri"].as_str().unwrap();
    let photo_path = photo_uri.strip_prefix("http://localhost:8000").unwrap();
    assert!(photo_path.starts_with("/uploads/"));

    let (status, served) = test_app
        .send_raw(Method::GET, photo_path, None, None)
        .await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(png, served.to_vec());

    let (status, _) = test_app
        .send(
            Method::DELETE,
            &format!("/places/{}", place["id"]),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(StatusCode::NO_CONTENT, status);

    let (status, _) = test_app
        .send_raw(Method::GET, photo_path, None, None)
        .await;
    assert_eq!(StatusCode::NOT_FOUND, status);

    tokio::fs::remove_dir_all(&root).await.unwrap();
}
