//! Route handlers for the dispatcher API.

pub mod admin;
pub mod callbacks;
pub mod executors;
pub mod health;
pub mod orders;
pub mod stats;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        .route("/api/stats", get(stats::stats_api))
        // Client and executor bots
        .route("/api/users", post(admin::register_user))
        .route("/api/users/:id", get(admin::get_user))
        .route("/api/orders", post(orders::create_order))
        .route("/api/orders/:id", get(orders::get_order))
        .route("/api/orders/:id/dispatch", post(orders::dispatch_order))
        .route("/api/orders/:id/accept", post(orders::accept_order))
        .route("/api/orders/:id/decline", post(orders::decline_order))
        .route("/api/orders/:id/cancel", post(orders::cancel_order))
        .route("/api/orders/:id/rate", post(orders::rate_order))
        .route("/api/orders/:id/status", post(orders::advance_status))
        .route("/api/orders/:id/changes/confirm", post(orders::confirm_changes))
        .route("/api/orders/:id/changes/decline", post(orders::decline_changes))
        .route("/api/callbacks", post(callbacks::handle_callback))
        .route("/api/executors/:id/orders", get(executors::new_orders))
        .route(
            "/api/executors/:id/schedule",
            get(executors::get_schedule)
                .put(executors::put_schedule)
                .delete(executors::delete_schedule),
        )
        // Admin bot
        .route("/api/admin/capabilities/:id", get(admin::capabilities))
        .route("/api/admin/orders/:id/unassign", post(admin::unassign))
        .route("/api/admin/orders/:id", put(admin::edit_order))
        .route("/api/admin/executors/:id/priority", put(admin::set_priority))
        .route("/api/admin/executors/:id/lift-penalty", post(admin::lift_penalty))
        .route(
            "/api/admin/commission",
            get(admin::get_commission).put(admin::set_commission),
        )
        .layer(TraceLayer::new_for_http())
}
