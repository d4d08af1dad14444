#![allow(missing_docs, unused_results)]

use std::sync::Arc;

use assert_matches::assert_matches;
use mea_auth::{
    AuthClient, AuthError, FileTokenStore, NewUser, SessionTokens, TokenProvider, TokenStore,
};
use url::Url;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn base(server: &MockServer) -> Url {
    Url::parse(&format!("{}/", server.uri())).unwrap()
}

fn client_with(server: &MockServer, store: Arc<dyn TokenStore>) -> AuthClient {
    AuthClient::new(reqwest::Client::new(), base(server), store)
}

#[tokio::test]
async fn login_posts_form_and_stores_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("username=ana"))
        .and(body_string_contains("password=s3cret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access_token": "jwt-1", "token_type": "bearer"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tokens = Arc::new(SessionTokens::new());
    let client = client_with(&server, tokens.clone());

    let token = client.login("ana", "s3cret").await.unwrap();
    assert_eq!(token.expose(), "jwt-1");
    assert_eq!(tokens.current_token().unwrap().expose(), "jwt-1");
}

#[tokio::test]
async fn login_rejection_is_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(serde_json::json!({"detail": "bad"})),
        )
        .mount(&server)
        .await;

    let tokens = Arc::new(SessionTokens::new());
    let client = client_with(&server, tokens.clone());

    let err = client.login("ana", "wrong").await.unwrap_err();
    assert_matches!(err, AuthError::InvalidCredentials);
    assert_eq!(err.user_message(), "Incorrect username or password");
    assert!(tokens.current_token().is_none());
}

#[tokio::test]
async fn login_persists_to_file_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access_token": "jwt-2", "token_type": "bearer"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileTokenStore::new(dir.path().join("auth.json")));
    let client = client_with(&server, store.clone());

    let _ = client.login("ana", "pw").await.unwrap();
    let reread = FileTokenStore::new(dir.path().join("auth.json"));
    assert_eq!(reread.current_token().unwrap().expose(), "jwt-2");

    client.logout().unwrap();
    assert!(store.current_token().is_none());
}

#[tokio::test]
async fn register_returns_user_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(serde_json::json!({
            "username": "ana",
            "email": "ana@example.com",
            "password": "pw"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": 7,
            "username": "ana",
            "email": "ana@example.com",
            "role_id": 2
        })))
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(SessionTokens::new()));
    let user = NewUser {
        username: "ana".into(),
        email: "ana@example.com".into(),
        password: "pw".into(),
    };
    let record = client.register(&user).await.unwrap();
    assert_eq!(record.id, 7);
    assert_eq!(record.role_id, Some(2));
}

#[tokio::test]
async fn register_failure_carries_detail_or_generic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_string_contains("taken"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"detail": "Username already registered"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_string_contains("broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(SessionTokens::new()));
    let user = |name: &str| NewUser {
        username: name.into(),
        email: "x@example.com".into(),
        password: "pw".into(),
    };

    let err = client.register(&user("taken")).await.unwrap_err();
    assert_matches!(
        err,
        AuthError::Registration { status: 400, ref message } if message == "Username already registered"
    );

    let err = client.register(&user("broken")).await.unwrap_err();
    assert_eq!(err.user_message(), "Failed to register user");
}
