//! Order endpoints used by the client bot and the executor bot.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use database::{NewOrder, Order, OrderStatus};
use matching::DispatchOutcome;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// A freshly placed order and what dispatch did with it.
#[derive(Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub dispatch: DispatchOutcome,
}

/// Place an order and offer it to the first candidate.
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<NewOrder>,
) -> Result<Json<PlacedOrder>> {
    let id = database::order::create_order(state.db.pool(), &req, Utc::now()).await?;
    let dispatch = state.engine.dispatch_new_order(id).await?;
    let order = database::order::get_order(state.db.pool(), id).await?;

    Ok(Json(PlacedOrder { order, dispatch }))
}

pub async fn get_order(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Order>> {
    Ok(Json(database::order::get_order(state.db.pool(), id).await?))
}

/// Re-run dispatch, e.g. after new executors joined.
pub async fn dispatch_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DispatchOutcome>> {
    Ok(Json(state.engine.dispatch_new_order(id).await?))
}

/// Request identifying the acting bot user.
#[derive(Deserialize)]
pub struct ActorRequest {
    pub user_id: i64,
}

pub async fn accept_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<Order>> {
    Ok(Json(state.engine.accept_offer(id, req.user_id).await?))
}

pub async fn decline_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<Order>> {
    state.engine.decline_offer(id, req.user_id).await?;
    Ok(Json(database::order::get_order(state.db.pool(), id).await?))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<Order>> {
    Ok(Json(state.engine.cancel_order(id, req.user_id).await?))
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub user_id: i64,
    pub rating: i64,
}

pub async fn rate_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<RateRequest>,
) -> Result<Json<Order>> {
    Ok(Json(state.engine.rate_order(id, req.user_id, req.rating).await?))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub user_id: i64,
    pub status: OrderStatus,
}

/// Executor progress report: on the way, in progress, completed.
pub async fn advance_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Order>> {
    if !matches!(
        req.status,
        OrderStatus::OnTheWay | OrderStatus::InProgress | OrderStatus::Completed
    ) {
        return Err(ApiError::BadRequest(format!(
            "Executors cannot set status {}",
            req.status
        )));
    }
    Ok(Json(
        state
            .engine
            .advance_status(id, req.user_id, req.status)
            .await?,
    ))
}

pub async fn confirm_changes(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<Order>> {
    Ok(Json(state.engine.confirm_changes(id, req.user_id).await?))
}

/// Refuse edited terms; the order goes back to dispatch.
pub async fn decline_changes(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<DispatchOutcome>> {
    Ok(Json(state.engine.decline_changes(id, req.user_id).await?))
}
