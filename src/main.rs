use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod dto;
mod error;
mod handlers;
mod models;
mod services;

use auth::google::GoogleClient;
use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub google: Arc<GoogleClient>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let google = GoogleClient::new(config.google.clone());
        Self {
            db,
            config: Arc::new(config),
            google: Arc::new(google),
        }
    }
}

fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = vec![config
        .frontend_url
        .parse::<HeaderValue>()
        .context("FRONTEND_URL is not a valid origin")?];
    for origin in &config.cors_extra_origins {
        match origin.parse::<HeaderValue>() {
            Ok(hv) => origins.push(hv),
            Err(_) => tracing::warn!(origin = %origin, "Ignoring invalid CORS origin"),
        }
    }

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true))
}

pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/api/auth/google", get(handlers::auth::google_login))
        .route(
            "/api/auth/google/callback",
            get(handlers::auth::google_callback),
        );

    let protected_routes = Router::new()
        .route("/api/me", get(handlers::auth::me))
        // Projects
        .route(
            "/api/projects",
            get(handlers::projects::list_projects).post(handlers::projects::create_project),
        )
        .route(
            "/api/projects/:id",
            delete(handlers::projects::delete_project),
        )
        // Time logs
        .route(
            "/api/timelogs",
            get(handlers::time_logs::list_for_day).post(handlers::time_logs::create_time_log),
        )
        .route(
            "/api/timelogs/:id",
            get(handlers::time_logs::list_for_project).delete(handlers::time_logs::delete_time_log),
        )
        // Goals
        .route(
            "/api/goals",
            get(handlers::goals::list_goals)
                .post(handlers::goals::create_goal)
                .patch(handlers::goals::update_goal),
        )
        .route("/api/goals/periods", get(handlers::goals::list_periods))
        .route("/api/goals/summary", get(handlers::goals::get_summary))
        .route("/api/goals/:id", delete(handlers::goals::delete_goal))
        // Dashboard
        .route("/api/dashboard/weekly", get(handlers::dashboard::get_weekly))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let cors = cors_layer(&state.config)?;

    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timesheeter_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env()?;

    // Database
    let db = db::create_pool(&config.database_url).await?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations applied");

    let addr = config.listen_addr();
    let state = AppState::new(db, config);
    if !state.google.is_configured() {
        tracing::warn!("GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET not set; sign-in is disabled");
    }

    let app = build_router(state)?;

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::config::test_config;
    use crate::models::user::User;

    // The pool never connects: every request below is answered before a query runs.
    fn app_with(config: Config) -> Router {
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        build_router(AppState::new(db, config)).unwrap()
    }

    fn bearer() -> String {
        let user = User {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            name: "Ada".into(),
            google_id: None,
            created_at: Utc::now(),
        };
        let token = auth::jwt::create_access_token(&user, &test_config()).unwrap();
        format!("Bearer {}", token)
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let resp = app_with(test_config())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["service"], "timesheeter-api");
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let resp = app_with(test_config())
            .oneshot(Request::get("/api/projects").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"]["code"], 401);
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_rejected() {
        let resp = app_with(test_config())
            .oneshot(
                Request::get("/api/dashboard/weekly")
                    .header("authorization", "Basic YWRhOnNlY3JldA==")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_from_other_secret_rejected() {
        let mut config = test_config();
        config.jwt_secret = "rotated-secret".into();
        let resp = app_with(config)
            .oneshot(
                Request::get("/api/goals")
                    .header("authorization", bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_day_listing_requires_date() {
        let resp = app_with(test_config())
            .oneshot(
                Request::get("/api/timelogs")
                    .header("authorization", bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_day_listing_past_last_date_is_bad_request() {
        let resp = app_with(test_config())
            .oneshot(
                Request::get("/api/timelogs?date=%2B262142-12-31")
                    .header("authorization", bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"]["message"], "Date out of range");
    }

    #[tokio::test]
    async fn test_dashboard_window_past_last_date_is_bad_request() {
        let resp = app_with(test_config())
            .oneshot(
                Request::get("/api/dashboard/weekly?weekStart=%2B262142-12-28")
                    .header("authorization", bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"]["code"], 400);
    }

    #[tokio::test]
    async fn test_non_positive_goal_target_rejected() {
        let body = serde_json::json!({
            "projectId": Uuid::new_v4(),
            "periodId": Uuid::new_v4(),
            "title": "Deep work",
            "targetHours": 0,
        });
        let resp = app_with(test_config())
            .oneshot(
                Request::post("/api/goals")
                    .header("authorization", bearer())
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_manual_log_without_duration_rejected() {
        let body = serde_json::json!({
            "projectId": Uuid::new_v4(),
            "isManualEntry": true,
        });
        let resp = app_with(test_config())
            .oneshot(
                Request::post("/api/timelogs")
                    .header("authorization", bearer())
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_google_login_redirects_with_state_cookie() {
        let resp = app_with(test_config())
            .oneshot(Request::get("/api/auth/google").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let location = resp.headers()["location"].to_str().unwrap();
        assert!(location.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));

        let cookie = resp.headers()["set-cookie"].to_str().unwrap();
        assert!(cookie.starts_with("oauth_state="));
        assert!(cookie.contains("HttpOnly"));
        // The default callback is plain http.
        assert!(!cookie.contains("Secure"));
    }

    #[tokio::test]
    async fn test_google_login_unconfigured() {
        let mut config = test_config();
        config.google.client_id.clear();
        let resp = app_with(config)
            .oneshot(Request::get("/api/auth/google").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_callback_without_state_cookie_fails() {
        let state = auth::google::issue_state(&test_config().jwt_secret).unwrap();
        let uri = format!("/api/auth/google/callback?code=abc&state={}", state);
        let resp = app_with(test_config())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains("Authentication failed"));
    }
}
