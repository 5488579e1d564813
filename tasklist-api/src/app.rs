/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use tasklist_api::{app::{build_router, AppState}, config::Config};
/// use tasklist_shared::store::open_store;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let store = open_store(&config.database.url, config.database.max_connections).await?;
/// let app = build_router(AppState::new(store, config));
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiResult, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tasklist_shared::{
    auth::{
        authorization::require_admin_middleware,
        jwt,
        middleware::{jwt_auth_middleware, AuthError},
    },
    store::Store,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Document store
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,

    jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            jwt_secret: Arc::from(config.jwt.secret.as_str()),
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Issues a token for `user_id` with the configured lifetime
    pub fn issue_token(&self, user_id: Uuid) -> ApiResult<String> {
        Ok(jwt::issue_token(
            user_id,
            self.config.jwt.expires_in,
            &self.jwt_secret,
        )?)
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                          (public)
/// └── /api
///     ├── POST /register, POST /login      (public)
///     ├── GET  /tasks                      (public)
///     ├── GET  /profile                    (token)
///     ├── /persons, /profiles              (token)
///     ├── /projects, /projects/:id/tasks   (token)
///     ├── /tasks, /tasks/:id               (token)
///     └── /admin/tasks, /admin/consistency (token + admin role)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. CORS (tower-http CorsLayer)
/// 2. Logging (tower-http TraceLayer)
/// 3. Authentication and role checks (per route group)
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/tasks", get(routes::tasks::list_tasks));

    let protected_routes = Router::new()
        .route("/profile", get(routes::auth::profile))
        .route(
            "/persons",
            get(routes::persons::list_persons).post(routes::persons::create_person),
        )
        .route(
            "/persons/:id",
            put(routes::persons::update_person).delete(routes::persons::delete_person),
        )
        .route(
            "/profiles",
            get(routes::profiles::list_profiles).post(routes::profiles::create_profile),
        )
        .route(
            "/profiles/:id",
            put(routes::profiles::update_profile).delete(routes::profiles::delete_profile),
        )
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/:id",
            put(routes::projects::update_project).delete(routes::projects::delete_project),
        )
        .route(
            "/projects/:project_id/tasks",
            post(routes::projects::add_task),
        )
        .route(
            "/projects/:project_id/tasks/:task_id",
            put(routes::projects::set_task_status).delete(routes::projects::remove_task),
        )
        .route("/tasks", post(routes::tasks::create_task))
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/tasks", get(routes::tasks::list_tasks_admin))
        .route("/consistency", get(routes::tasks::consistency_report))
        .route_layer(middleware::from_fn(require_admin_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest("/admin", admin_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// JWT authentication layer
///
/// Resolves the bearer token to a user and injects `AuthContext` into
/// request extensions.
async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    jwt_auth_middleware(state.store.clone(), state.jwt_secret.clone(), req, next).await
}
