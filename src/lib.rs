//! Car Service Backend
//!
//! REST backend for the airport car-service site: bookings with live status,
//! Square payments, SMS notifications, CMS content, QA comments, costs, feedback
//! and driver tracking, on SQLite with Tantivy booking search.
//!
//! The [`sync`] module is the client half of booking status updates, for Rust
//! consumers of the API.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod notify;
pub mod payments;
pub mod realtime;
pub mod search;
pub mod sync;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::Repository;
use notify::Notifier;
use payments::SquareClient;
use realtime::StatusHub;
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub hub: Arc<StatusHub>,
    pub config: Arc<Config>,
    /// Present only when Square is configured
    pub square: Option<Arc<SquareClient>>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, search: Arc<SearchIndex>, config: Config) -> Self {
        let square = config
            .square
            .as_ref()
            .map(|square| Arc::new(SquareClient::new(square)));
        let notifier = Notifier::new(config.twilio.as_ref());

        Self {
            repo,
            search,
            hub: Arc::new(StatusHub::new()),
            config: Arc::new(config),
            square,
            notifier,
        }
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes
    let public_routes = Router::new()
        // Bookings
        .route("/bookings", post(api::create_booking))
        .route("/bookings/{id}", get(api::get_booking))
        .route("/bookings/{id}/status", get(api::get_booking_status))
        .route("/bookings/{id}/cancel", post(api::cancel_booking))
        .route(
            "/bookings/{id}/driver-location",
            get(api::get_booking_driver_location),
        )
        .route("/bookings/{id}/ws", get(api::booking_status_ws))
        .route("/bookings/{id}/payment-link", post(api::create_payment_link))
        // Payments
        .route("/payments/webhook", post(api::payment_webhook))
        // CMS
        .route("/cms", get(api::get_cms))
        .route("/cms/field", get(api::get_cms_field))
        // Feedback
        .route(
            "/feedback",
            get(api::list_public_feedback).post(api::submit_feedback),
        )
        // Session
        .route(
            "/session",
            get(api::get_session).delete(api::delete_session),
        );

    // Dashboard reads: admin, editor, viewer
    let read_routes = Router::new()
        .route("/bookings", get(api::list_bookings))
        .route("/bookings/search", get(api::search_bookings))
        .route("/comments", get(api::list_comments))
        .route("/comments/{id}", get(api::get_comment))
        .route("/costs", get(api::list_costs))
        .route("/costs/summary", get(api::cost_summary))
        .route("/feedback", get(api::list_all_feedback))
        .route("/drivers/locations", get(api::list_driver_locations))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_read,
        ));

    // Content editing: admin, editor
    let edit_routes = Router::new()
        .route("/cms", put(api::replace_cms))
        .route("/cms/field", patch(api::update_cms_field))
        .route("/comments", post(api::create_comment))
        .route(
            "/comments/{id}",
            patch(api::update_comment).delete(api::delete_comment),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_edit,
        ));

    // Everything else: admin only
    let admin_routes = Router::new()
        .route("/bookings/{id}", patch(api::update_booking))
        .route("/bookings/{id}/status", put(api::update_booking_status))
        .route("/bookings/{id}/driver", put(api::assign_driver))
        .route("/bookings/{id}/refund", post(api::refund_booking))
        .route("/costs", post(api::create_cost))
        .route("/costs/{id}", delete(api::delete_cost))
        .route("/feedback/{id}/approval", put(api::set_feedback_approval))
        .route("/feedback/{id}", delete(api::delete_feedback))
        .route("/drivers/{id}/location", put(api::update_driver_location))
        .route("/users", get(api::list_users).post(api::create_user))
        .route("/users/{id}/role", put(api::update_user_role))
        .route("/sessions", post(api::create_session))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    let api_routes = public_routes.nest(
        "/admin",
        read_routes.merge(edit_routes).merge(admin_routes),
    );

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
