pub mod extract;
pub mod guard;
pub mod handlers;
pub mod state;

pub use state::AppState;

use crate::error::ApiError;
use crate::observability::metrics;
use axum::{
    extract::{MatchedPath, Request},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, patch, post, put},
    Router,
};
use handlers::{auth, follow, list, profile, search, watched};
use std::net::SocketAddr;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "anilog-server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Prometheus scrape endpoint
async fn metrics_endpoint() -> Response {
    match metrics::render() {
        Some(body) => ([(CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;
    metrics::http::request_completed(
        &method,
        &route,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Registration and sessions
        .route("/api/register", post(auth::register))
        .route("/api/register/check-username", get(auth::check_username))
        .route("/api/register/check-email", get(auth::check_email))
        .route("/api/login", post(auth::login))
        .route("/api/refresh", post(auth::refresh))
        .route("/api/logout", post(auth::logout))
        // Profiles
        .route(
            "/api/profile/:id",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/api/profile/safe/:id", get(profile::get_public_profile))
        // Shares the `:id` segment with the route above; holds a username here.
        .route(
            "/api/profile/safe/:id/by-username",
            get(profile::search_by_username),
        )
        .route(
            "/api/profile/safe/by-ids",
            put(profile::get_public_profiles).post(profile::get_public_profiles),
        )
        // Follows
        .route("/api/user/:userId/follow/:targetId", post(follow::follow))
        .route("/api/user/:userId/request/:targetId", post(follow::request))
        .route("/api/user/:userId/unfollow/:targetId", delete(follow::unfollow))
        .route(
            "/api/user/:userId/accept-request/:requesterId",
            post(follow::accept),
        )
        .route(
            "/api/user/:userId/decline-request/:requesterId",
            post(follow::deny),
        )
        .route("/api/user/:userId/followStatuses", get(follow::statuses))
        // Lists
        .route("/api/user/:userId/list/:listType", get(list::get_list))
        .route("/api/user/list/add", post(list::add))
        .route("/api/user/list/remove", delete(list::remove))
        .route(
            "/api/user/list/remove/:userId/:itemId",
            delete(list::remove_by_id),
        )
        // Watched items
        .route("/api/user/:userId/watched", get(watched::all))
        .route(
            "/api/user/:userId/watched/type/:mediaType",
            get(watched::by_type),
        )
        .route(
            "/api/user/:userId/watched/status/:status",
            get(watched::by_status),
        )
        .route(
            "/api/user/:userId/watched/type/:mediaType/status/:status",
            get(watched::by_type_and_status),
        )
        .route("/api/user/watched/add", post(watched::add))
        .route("/api/user/watched/:itemId", put(watched::update))
        .route(
            "/api/user/:userId/watched/:anilistId/progress",
            patch(watched::update_progress),
        )
        .route(
            "/api/user/:userId/watched/:anilistId",
            delete(watched::remove),
        )
        .route(
            "/api/user/:userId/watched/item/:itemId",
            delete(watched::remove_by_id),
        )
        // AniList search
        .route("/api/search", post(search::search))
        .route("/api/search/:id", get(search::by_id))
        .route("/api/search/trending/:mediaType", get(search::trending))
        .route("/api/search/popular/:mediaType", get(search::popular))
        .route("/api/search/new/:mediaType", get(search::new_releases))
        .route("/api/search/comingsoon/:mediaType", get(search::coming_soon))
}

/// Create the HTTP router with all routes
pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .merge(api_routes())
        .route_layer(middleware::from_fn(track_metrics))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Start the HTTP server on the given host and port
pub async fn start_server(
    state: AppState,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_server(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("AniLog API listening on {}", addr);
    println!("🚀 AniLog API running on http://localhost:{port}");
    println!("💚 Health check: http://localhost:{port}/health");
    println!("📈 Metrics:      http://localhost:{port}/metrics");

    axum::serve(listener, app).await?;

    Ok(())
}
