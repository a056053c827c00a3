//! Inline-button callbacks forwarded by the executor bot.
//!
//! The bot passes the raw `callback_data` string and the pressing user; the
//! callback is parsed here and routed to the matching engine.

use std::str::FromStr;

use axum::extract::State;
use axum::Json;
use database::OrderStatus;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// A parsed executor callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    AcceptOrder(i64),
    DeclineOrder(i64),
    AcceptChanges(i64),
    DeclineChanges(i64),
    OnTheWay(i64),
    InProgress(i64),
    Complete(i64),
}

impl Callback {
    pub fn order_id(&self) -> i64 {
        match *self {
            Callback::AcceptOrder(id)
            | Callback::DeclineOrder(id)
            | Callback::AcceptChanges(id)
            | Callback::DeclineChanges(id)
            | Callback::OnTheWay(id)
            | Callback::InProgress(id)
            | Callback::Complete(id) => id,
        }
    }
}

impl FromStr for Callback {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (action, id) = s
            .split_once(':')
            .ok_or_else(|| format!("Malformed callback: {s}"))?;
        let id: i64 = id
            .trim()
            .parse()
            .map_err(|_| format!("Invalid order id in callback: {s}"))?;

        match action {
            "executor_accept_order" => Ok(Callback::AcceptOrder(id)),
            "executor_decline_order" => Ok(Callback::DeclineOrder(id)),
            "executor_accept_changes" => Ok(Callback::AcceptChanges(id)),
            "executor_decline_changes" => Ok(Callback::DeclineChanges(id)),
            "executor_status_ontheway" => Ok(Callback::OnTheWay(id)),
            "executor_status_inprogress" => Ok(Callback::InProgress(id)),
            "executor_complete_order" => Ok(Callback::Complete(id)),
            _ => Err(format!("Unknown callback: {action}")),
        }
    }
}

/// Callback request from the bot.
#[derive(Deserialize)]
pub struct CallbackRequest {
    pub user_id: i64,
    pub data: String,
}

/// Callback response: the order as it stands after the action.
#[derive(Serialize)]
pub struct CallbackResponse {
    pub order_id: i64,
    pub status: OrderStatus,
}

/// Handle a button press.
pub async fn handle_callback(
    State(state): State<AppState>,
    Json(req): Json<CallbackRequest>,
) -> Result<Json<CallbackResponse>> {
    let callback: Callback = req.data.parse().map_err(ApiError::BadRequest)?;
    info!("Callback {:?} from user {}", callback, req.user_id);

    let engine = &state.engine;
    let executor_id = req.user_id;
    match callback {
        Callback::AcceptOrder(id) => {
            engine.accept_offer(id, executor_id).await?;
        }
        Callback::DeclineOrder(id) => engine.decline_offer(id, executor_id).await?,
        Callback::AcceptChanges(id) => {
            engine.confirm_changes(id, executor_id).await?;
        }
        Callback::DeclineChanges(id) => {
            engine.decline_changes(id, executor_id).await?;
        }
        Callback::OnTheWay(id) => {
            engine
                .advance_status(id, executor_id, OrderStatus::OnTheWay)
                .await?;
        }
        Callback::InProgress(id) => {
            engine
                .advance_status(id, executor_id, OrderStatus::InProgress)
                .await?;
        }
        Callback::Complete(id) => {
            engine
                .advance_status(id, executor_id, OrderStatus::Completed)
                .await?;
        }
    }

    let order_id = callback.order_id();
    let order = database::order::get_order(state.db.pool(), order_id).await?;
    Ok(Json(CallbackResponse {
        order_id,
        status: order.status,
    }))
}
