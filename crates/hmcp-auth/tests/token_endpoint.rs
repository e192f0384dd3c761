//! HTTP-level tests for the token and revocation endpoints.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    middleware,
    routing::post,
};
use base64::Engine;
use hmcp_auth::{
    AuthConfig, AuthState, BearerAuth, OAuthClient, OAuthServer, StaticSecretProvider,
    TokenResponse, authorization_middleware, revoke_handler, token_handler,
};
use tower::ServiceExt;

fn auth_state() -> AuthState {
    let mut config = AuthConfig::default();
    config
        .route_scopes
        .insert("/messages".to_string(), vec!["hmcp:access".to_string()]);
    let server = OAuthServer::with_provider(
        config,
        &StaticSecretProvider::new("endpoint-test-secret"),
    )
    .unwrap();
    server
        .register_client(
            "clinic",
            "clinic-secret",
            Vec::new(),
            Some(vec![
                "hmcp:access".to_string(),
                "patient/hmcp:read".to_string(),
            ]),
        )
        .unwrap();
    AuthState::from_server(server).unwrap()
}

async fn whoami(BearerAuth(auth): BearerAuth) -> String {
    auth.client_id
}

fn app(state: AuthState) -> Router {
    Router::new()
        .route("/oauth/token", post(token_handler))
        .route("/messages", post(whoami))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authorization_middleware,
        ))
        .route("/oauth/revoke", post(revoke_handler))
        .with_state(state)
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn issues_token_from_form_body() {
    let response = app(auth_state())
        .oneshot(form_request(
            "/oauth/token",
            "grant_type=client_credentials&client_id=clinic&client_secret=clinic-secret&scope=hmcp:access",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    let json = json_body(response).await;
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["expires_in"], 3600);
    assert_eq!(json["scope"], "hmcp:access");
    assert!(json["access_token"].as_str().unwrap().split('.').count() == 3);
}

#[tokio::test]
async fn issues_token_from_json_body_with_basic_auth() {
    let basic = base64::engine::general_purpose::STANDARD.encode("clinic:clinic-secret");
    let request = Request::builder()
        .method("POST")
        .uri("/oauth/token")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Basic {basic}"))
        .body(Body::from(
            r#"{"grant_type":"client_credentials","scope":"patient/hmcp:read","patient_id":"p-42"}"#,
        ))
        .unwrap();

    let response = app(auth_state()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["patient"], "p-42");
    assert_eq!(json["scope"], "patient/hmcp:read");
}

#[tokio::test]
async fn rejects_wrong_secret() {
    let response = app(auth_state())
        .oneshot(form_request(
            "/oauth/token",
            "grant_type=client_credentials&client_id=clinic&client_secret=nope",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "invalid_client");
}

#[tokio::test]
async fn rejects_scope_outside_client_allowance() {
    let response = app(auth_state())
        .oneshot(form_request(
            "/oauth/token",
            "grant_type=client_credentials&client_id=clinic&client_secret=clinic-secret&scope=hmcp:write",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid_scope");
}

#[tokio::test]
async fn rejects_unsupported_scope() {
    let response = app(auth_state())
        .oneshot(form_request(
            "/oauth/token",
            "grant_type=client_credentials&client_id=clinic&client_secret=clinic-secret&scope=admin:all",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid_scope");
}

#[tokio::test]
async fn authorization_code_is_not_implemented() {
    let response = app(auth_state())
        .oneshot(form_request(
            "/oauth/token",
            "grant_type=authorization_code&client_id=clinic&client_secret=clinic-secret&code=abc",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(json_body(response).await["error"], "not_implemented");
}

#[tokio::test]
async fn unknown_grant_type_is_unsupported() {
    let response = app(auth_state())
        .oneshot(form_request(
            "/oauth/token",
            "grant_type=password&client_id=clinic&client_secret=clinic-secret",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn client_default_request_is_granted() {
    let config = AuthConfig::default();
    let client = OAuthClient::new("test-client", "test-secret", &config).unwrap();
    let server =
        OAuthServer::with_provider(config, &StaticSecretProvider::new("endpoint-test-secret"))
            .unwrap();
    let app = app(AuthState::from_server(server).unwrap());

    let token_request = client.create_token_request(None, None);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/oauth/token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&token_request).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let token: TokenResponse = serde_json::from_slice(&body).unwrap();
    client.set_token(token).unwrap();

    let mut request = Request::builder()
        .method("POST")
        .uri("/messages")
        .body(Body::empty())
        .unwrap();
    request.headers_mut().extend(client.auth_header().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn revoked_token_is_refused() {
    let state = auth_state();
    let server: Arc<OAuthServer> = Arc::clone(&state.server);
    let token = server
        .create_token("clinic", "hmcp:access", None)
        .unwrap()
        .access_token;
    let app = app(state);

    let bearer = || {
        Request::builder()
            .method("POST")
            .uri("/messages")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(bearer()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(form_request(
            "/oauth/revoke",
            &format!("token={token}&client_id=clinic&client_secret=clinic-secret"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(bearer()).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn revoke_leaves_other_clients_tokens_alone() {
    let state = auth_state();
    let server: Arc<OAuthServer> = Arc::clone(&state.server);
    server
        .register_client("lab", "lab-secret", Vec::new(), None)
        .unwrap();
    let token = server
        .create_token("clinic", "hmcp:access", None)
        .unwrap()
        .access_token;
    let app = app(state);

    let response = app
        .clone()
        .oneshot(form_request(
            "/oauth/revoke",
            &format!("token={token}&client_id=lab&client_secret=lab-secret"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/messages")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!server.verifier().is_revoked(&token));
}

#[tokio::test]
async fn revoke_requires_client_auth() {
    let response = app(auth_state())
        .oneshot(form_request("/oauth/revoke", "token=abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
