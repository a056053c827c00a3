//! Admin bot endpoints. Every call names the acting user; the engine checks
//! that user's capabilities.

use axum::extract::{Path, State};
use axum::Json;
use database::{Commission, Order, OrderTerms, User, UserRole};
use matching::Permission;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::AppState;

/// User registration from any of the bots.
#[derive(Deserialize)]
pub struct RegisterUser {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    pub role: UserRole,
    #[serde(default)]
    pub supervisor_id: Option<i64>,
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterUser>,
) -> Result<Json<User>> {
    let mut user = User::new(req.id, req.name, req.role);
    user.username = req.username;
    user.supervisor_id = req.supervisor_id;

    database::user::create_user(state.db.pool(), &user).await?;
    tracing::info!("Registered user {} as {:?}", user.id, user.role);
    Ok(Json(database::user::get_user(state.db.pool(), user.id).await?))
}

pub async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<User>> {
    Ok(Json(database::user::get_user(state.db.pool(), id).await?))
}

#[derive(Serialize)]
pub struct CapabilitiesView {
    pub actor_id: i64,
    pub permissions: Vec<Permission>,
}

/// What the admin bot should show to this user.
pub async fn capabilities(
    State(state): State<AppState>,
    Path(actor_id): Path<i64>,
) -> Result<Json<CapabilitiesView>> {
    let caps = state.engine.capabilities_for(actor_id).await?;
    let permissions = Permission::ALL
        .into_iter()
        .filter(|p| caps.allows(*p))
        .collect();
    Ok(Json(CapabilitiesView {
        actor_id,
        permissions,
    }))
}

#[derive(Deserialize)]
pub struct AdminRequest {
    pub actor_id: i64,
}

#[derive(Serialize)]
pub struct Unassigned {
    pub order: Order,
    pub previous_executor_id: i64,
}

/// Remove the assigned executor and put the order back into dispatch.
pub async fn unassign(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(req): Json<AdminRequest>,
) -> Result<Json<Unassigned>> {
    let (order, previous_executor_id) = state
        .engine
        .unassign_executor(req.actor_id, order_id)
        .await?;
    Ok(Json(Unassigned {
        order,
        previous_executor_id,
    }))
}

#[derive(Deserialize)]
pub struct EditRequest {
    pub actor_id: i64,
    #[serde(flatten)]
    pub terms: OrderTerms,
}

/// Change date, slot, address or price. Assigned executors must re-confirm.
pub async fn edit_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(req): Json<EditRequest>,
) -> Result<Json<Order>> {
    Ok(Json(
        state
            .engine
            .edit_order(req.actor_id, order_id, req.terms)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct PriorityRequest {
    pub actor_id: i64,
    pub priority: i64,
}

pub async fn set_priority(
    State(state): State<AppState>,
    Path(executor_id): Path<i64>,
    Json(req): Json<PriorityRequest>,
) -> Result<Json<User>> {
    Ok(Json(
        state
            .engine
            .set_priority(req.actor_id, executor_id, req.priority)
            .await?,
    ))
}

pub async fn lift_penalty(
    State(state): State<AppState>,
    Path(executor_id): Path<i64>,
    Json(req): Json<AdminRequest>,
) -> Result<Json<User>> {
    Ok(Json(
        state
            .engine
            .lift_penalty(req.actor_id, executor_id)
            .await?,
    ))
}

pub async fn get_commission(State(state): State<AppState>) -> Result<Json<Commission>> {
    Ok(Json(
        database::settings::get_commission(state.db.pool()).await?,
    ))
}

#[derive(Deserialize)]
pub struct CommissionRequest {
    pub actor_id: i64,
    #[serde(flatten)]
    pub commission: Commission,
}

pub async fn set_commission(
    State(state): State<AppState>,
    Json(req): Json<CommissionRequest>,
) -> Result<Json<Commission>> {
    state
        .engine
        .set_commission(req.actor_id, req.commission)
        .await?;
    Ok(Json(req.commission))
}
