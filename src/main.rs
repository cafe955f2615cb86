//! LeitnerBox Backend
//!
//! A REST backend for Leitner-box spaced repetition study: scheduling,
//! review sessions, search and statistics over SQLite persistence.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod scheduling;
mod search;
mod session;
mod stats;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use session::ReviewSession;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
    /// Running review sessions, keyed by session ID.
    pub sessions: Arc<Mutex<HashMap<String, ReviewSession>>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting LeitnerBox Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (LEITNER_API_PSK). Authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Leitners
        .route("/leitners", get(api::list_leitners))
        .route("/leitners", post(api::create_leitner))
        .route("/leitners/{id}", get(api::get_leitner))
        .route("/leitners/{id}", put(api::update_leitner))
        .route("/leitners/{id}", delete(api::delete_leitner))
        // Levels
        .route("/leitners/{id}/levels", get(api::list_levels))
        .route("/leitners/{id}/levels", post(api::create_level))
        .route("/levels/{id}", put(api::update_level))
        // Questions
        .route("/leitners/{id}/questions", get(api::list_questions))
        .route("/leitners/{id}/questions", post(api::create_question))
        .route("/questions/{id}", get(api::get_question))
        .route("/questions/{id}", put(api::update_question))
        .route("/questions/{id}", delete(api::delete_question))
        .route("/questions/{id}/reset", post(api::reset_question))
        .route("/questions/{id}/move", post(api::move_question))
        .route("/questions/{id}/tags", get(api::list_question_tags))
        .route("/questions/{id}/tags", post(api::attach_tag))
        .route("/questions/{id}/tags/{tag_id}", delete(api::detach_tag))
        // Tags
        .route("/leitners/{id}/tags", get(api::list_tags))
        .route("/leitners/{id}/tags", post(api::create_tag))
        .route("/tags/{id}", put(api::update_tag))
        .route("/tags/{id}", delete(api::delete_tag))
        // Synonyms
        .route("/leitners/{id}/synonyms", get(api::list_synonym_groups))
        .route("/synonyms", post(api::link_synonyms))
        .route("/questions/{id}/synonyms", get(api::get_synonym_group))
        .route("/questions/{id}/synonyms", delete(api::unlink_synonyms))
        // Search
        .route("/leitners/{id}/search", get(api::search_questions))
        // Review sessions
        .route("/reviews", post(api::start_review))
        .route("/reviews/{id}", get(api::get_review))
        .route("/reviews/{id}", delete(api::abandon_review))
        .route("/reviews/{id}/reveal", post(api::reveal_answer))
        .route("/reviews/{id}/hide", post(api::hide_answer))
        .route("/reviews/{id}/pass", post(api::pass_question))
        .route("/reviews/{id}/fail", post(api::fail_question))
        .route("/reviews/{id}/question", delete(api::delete_current_question))
        // Statistics
        .route("/statistics", get(api::get_statistics))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
