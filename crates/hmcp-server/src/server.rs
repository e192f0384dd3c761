use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    middleware,
    routing::{get, post},
};
use hmcp_auth::{
    AuthResult, AuthState, OAuthServer, authorization_middleware, revoke_handler, token_handler,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::agent::{AgentServer, SamplingHandler};
use crate::{config::AppConfig, handlers, middleware as app_middleware};

/// Environment variables holding one extra client registered at startup.
pub const CLIENT_ID_ENV: &str = "CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "CLIENT_SECRET";

#[derive(Clone, Debug)]
pub struct AppState {
    pub auth: AuthState,
    pub agent: Arc<AgentServer>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Builds the authorization server and registers the startup clients.
pub fn build_auth_state(cfg: &AppConfig) -> AuthResult<AuthState> {
    let server = OAuthServer::new(cfg.auth.clone())?;
    let registered = server.register_configured_clients()?;
    tracing::info!(clients = registered, "Registered configured clients");

    register_env_client(&server)?;
    Ok(AuthState::new(Arc::new(server)))
}

/// Registers `CLIENT_ID`/`CLIENT_SECRET` when both are set.
fn register_env_client(server: &OAuthServer) -> AuthResult<()> {
    let (Ok(client_id), Ok(secret)) = (
        std::env::var(CLIENT_ID_ENV),
        std::env::var(CLIENT_SECRET_ENV),
    ) else {
        return Ok(());
    };
    if client_id.is_empty() || secret.is_empty() {
        return Ok(());
    }

    server.register_client(&client_id, &secret, Vec::new(), None)?;
    tracing::info!(client_id = %client_id, "Registered client from environment");
    Ok(())
}

pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;

    // The token endpoint sits behind the middleware too; the decision engine
    // lets it through without a token.
    let protected = Router::new()
        .route(&cfg.auth.token_url, post(token_handler))
        .route("/messages", post(handlers::messages))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            authorization_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/oauth/revoke", post(revoke_handler))
        .merge(protected)
        // Layer order (outermost last): trace -> request id -> cors -> body limit
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = tracing::field::Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct HmcpServer {
    addr: SocketAddr,
    app: Router,
}

#[derive(Default)]
pub struct ServerBuilder {
    config: AppConfig,
    sampling: Option<Arc<dyn SamplingHandler>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn with_sampling_handler(mut self, handler: Arc<dyn SamplingHandler>) -> Self {
        self.sampling = Some(handler);
        self
    }

    pub fn build(self) -> AuthResult<HmcpServer> {
        let auth = build_auth_state(&self.config)?;
        let mut agent = AgentServer::new(&self.config.agent);
        if let Some(handler) = self.sampling {
            agent = agent.with_sampling_handler(handler);
        }

        let state = AppState {
            auth,
            agent: Arc::new(agent),
        };
        Ok(HmcpServer {
            addr: self.config.addr(),
            app: build_app(&self.config, state),
        })
    }
}

impl HmcpServer {
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
