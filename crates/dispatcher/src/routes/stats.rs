//! Operational statistics.

use axum::extract::State;
use axum::Json;
use database::{OrderStatus, UserRole};
use serde::Serialize;

use crate::error::Result;
use crate::state::AppState;

/// Counts across users, orders and offers.
#[derive(Clone, Serialize)]
pub struct Stats {
    pub users: Vec<RoleCount>,
    pub orders: Vec<StatusCount>,
    pub active_offers: i64,
}

#[derive(Clone, Serialize)]
pub struct RoleCount {
    pub role: UserRole,
    pub count: i64,
}

#[derive(Clone, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// Get statistics as JSON.
pub async fn stats_api(State(state): State<AppState>) -> Result<Json<Stats>> {
    let pool = state.db.pool();

    let users = database::user::count_users_by_role(pool)
        .await?
        .into_iter()
        .map(|(role, count)| RoleCount { role, count })
        .collect();
    let orders = database::order::count_orders_by_status(pool)
        .await?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();
    let active_offers = database::offer::count_active_offers(pool).await?;

    Ok(Json(Stats {
        users,
        orders,
        active_offers,
    }))
}
