//! The matching engine: order dispatch, offer decisions and admin actions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use database::order::Reminder;
use database::validation::{validate_rating, validate_terms};
use database::{
    declined, offer, order, settings, user, Commission, Database, DatabaseError, OfferStatus,
    Order, OrderOffer, OrderStatus, OrderTerms, SqliteConnection, User, UserRole, UserStatus,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{MatchingError, Result};
use crate::offers;
use crate::payment::calculate_executor_payment;
use crate::penalty::{self, PenaltyOutcome};
use crate::permissions::{Capabilities, Permission};
use crate::reminders::due_reminders;
use crate::selector::next_candidate;
use crate::sender::{deliver_all, Notification, NotificationSender};
use crate::status::{ensure_transition, next_progress};
use crate::texts;

/// Result of trying to find an executor for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A new offer was sent.
    Offered {
        executor_id: i64,
        offer_id: i64,
        expires_at: DateTime<Utc>,
    },
    /// The order already has an active offer.
    AlreadyOffered { executor_id: i64 },
    /// No eligible executor is left; admins were alerted.
    Exhausted,
    /// Only `new` orders are offered.
    NotDispatchable { status: OrderStatus },
}

/// Counts from one sweep tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub released: usize,
    pub expired: usize,
    pub reminders: usize,
}

/// Coordinates executor matching for the marketplace.
///
/// Every public operation runs in one database transaction. Notifications
/// produced along the way are delivered after commit; delivery failures are
/// logged and never undo the state change.
pub struct MatchingEngine<S: NotificationSender> {
    db: Database,
    sender: S,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl<S: NotificationSender> MatchingEngine<S> {
    /// Create an engine on the system clock.
    pub fn new(db: Database, sender: S, config: EngineConfig) -> Self {
        Self::with_clock(db, sender, config, Arc::new(SystemClock))
    }

    /// Create an engine with a custom time source.
    pub fn with_clock(db: Database, sender: S, config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            sender,
            config,
            clock,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    async fn deliver(&self, outbox: Vec<Notification>) {
        if outbox.is_empty() {
            return;
        }
        let total = outbox.len();
        let failed = deliver_all(&self.sender, outbox).await;
        if failed > 0 {
            warn!("{} of {} notifications were not delivered", failed, total);
        }
    }

    fn alert_admins(&self, outbox: &mut Vec<Notification>, text: String) {
        for admin_id in &self.config.admin_ids {
            outbox.push(Notification::text(*admin_id, text.clone()));
        }
    }

    async fn capabilities(&self, conn: &mut SqliteConnection, actor_id: i64) -> Result<Capabilities> {
        let actor = match user::get_user(&mut *conn, actor_id).await {
            Ok(actor) => Some(actor),
            Err(DatabaseError::NotFound { .. }) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Capabilities::resolve(
            actor_id,
            actor.as_ref(),
            self.config.owner_id,
            &self.config.admin_ids,
        ))
    }

    /// Resolve the permission set of a user.
    pub async fn capabilities_for(&self, actor_id: i64) -> Result<Capabilities> {
        let mut conn = self.db.pool().acquire().await.map_err(DatabaseError::from)?;
        self.capabilities(&mut conn, actor_id).await
    }

    /// Offer a freshly created order to the best executor.
    pub async fn dispatch_new_order(&self, order_id: i64) -> Result<DispatchOutcome> {
        let now = self.clock.now();
        let mut outbox = Vec::new();

        let mut tx = self.db.begin().await?;
        let outcome = self.reassign(&mut tx, order_id, now, &mut outbox).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        self.deliver(outbox).await;
        Ok(outcome)
    }

    /// Find the next executor for a `new` order and send the offer.
    ///
    /// Does nothing while the order has an active offer.
    async fn reassign(
        &self,
        conn: &mut SqliteConnection,
        order_id: i64,
        now: DateTime<Utc>,
        outbox: &mut Vec<Notification>,
    ) -> Result<DispatchOutcome> {
        let current = order::get_order(&mut *conn, order_id).await?;
        if current.status != OrderStatus::New {
            debug!("Order {} is {}, not dispatching", order_id, current.status);
            return Ok(DispatchOutcome::NotDispatchable {
                status: current.status,
            });
        }

        if let Some(active) = offer::get_active_offer(&mut *conn, order_id).await? {
            debug!(
                "Order {} already offered to executor {}",
                order_id, active.executor_id
            );
            return Ok(DispatchOutcome::AlreadyOffered {
                executor_id: active.executor_id,
            });
        }

        let Some(executor) = next_candidate(conn, &current).await? else {
            warn!("No eligible executor left for order {}", order_id);
            self.alert_admins(outbox, texts::admin_no_candidate(&current));
            return Ok(DispatchOutcome::Exhausted);
        };

        let commission = settings::get_commission(&mut *conn).await?;
        match offers::create_offer(conn, &current, &executor, &commission, now, &self.config.timezone)
            .await
        {
            Ok(created) => {
                outbox.push(created.notification);
                Ok(DispatchOutcome::Offered {
                    executor_id: created.offer.executor_id,
                    offer_id: created.offer.id,
                    expires_at: created.offer.expires_at,
                })
            }
            Err(MatchingError::Database(DatabaseError::AlreadyExists { .. })) => {
                let holder = offer::get_active_offer(&mut *conn, order_id)
                    .await?
                    .map(|o| o.executor_id)
                    .unwrap_or(executor.id);
                Ok(DispatchOutcome::AlreadyOffered {
                    executor_id: holder,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Record a refusal, apply the penalty and move on to the next executor.
    async fn refuse_and_reassign(
        &self,
        conn: &mut SqliteConnection,
        order_id: i64,
        executor_id: i64,
        now: DateTime<Utc>,
        outbox: &mut Vec<Notification>,
    ) -> Result<DispatchOutcome> {
        let outcome =
            offers::refuse(conn, order_id, executor_id, &self.config.penalty, now).await?;

        match outcome {
            PenaltyOutcome::Counted {
                consecutive_declines,
            } => outbox.push(Notification::text(
                executor_id,
                texts::decline_warning(consecutive_declines, self.config.penalty.threshold),
            )),
            PenaltyOutcome::Blocked { until } => {
                let executor = user::get_user(&mut *conn, executor_id).await?;
                outbox.push(Notification::text(
                    executor_id,
                    texts::executor_blocked(until, &self.config.timezone),
                ));
                self.alert_admins(
                    outbox,
                    texts::admin_executor_blocked(&executor, until, &self.config.timezone),
                );
            }
        }

        self.reassign(conn, order_id, now, outbox).await
    }

    /// Accept an order, either from an offer or from the new-orders list.
    ///
    /// Accepting an order the executor already holds returns it unchanged.
    pub async fn accept_offer(&self, order_id: i64, executor_id: i64) -> Result<Order> {
        let now = self.clock.now();
        let mut outbox = Vec::new();
        let mut tx = self.db.begin().await?;

        let executor = penalty::on_access_check(&mut tx, executor_id, now).await?;
        if executor.role != UserRole::Executor {
            return Err(MatchingError::NotOffered {
                order_id,
                executor_id,
            });
        }
        if executor.status == UserStatus::Blocked {
            return Err(MatchingError::ExecutorBlocked {
                executor_id,
                until: executor.blocked_until,
            });
        }

        let current = order::get_order(&mut *tx, order_id).await?;
        if current.executor_tg_id == Some(executor_id) && current.status.is_assigned() {
            return Ok(current);
        }
        if current.status != OrderStatus::New {
            return Err(MatchingError::InvalidTransition {
                from: current.status,
                to: OrderStatus::Accepted,
            });
        }
        if declined::has_declined(&mut *tx, order_id, executor_id).await? {
            return Err(MatchingError::NotOffered {
                order_id,
                executor_id,
            });
        }

        let active = offer::get_active_offer(&mut *tx, order_id).await?;
        let commission = settings::get_commission(&mut *tx).await?;
        let accepted =
            offers::accept(&mut tx, &current, executor_id, active.as_ref(), &commission, now)
                .await?;

        outbox.push(Notification::text(
            executor_id,
            texts::assigned_to_executor(&accepted),
        ));
        outbox.push(Notification::text(
            accepted.client_tg_id,
            texts::assigned_to_client(&accepted, &executor),
        ));

        tx.commit().await.map_err(DatabaseError::from)?;
        self.deliver(outbox).await;
        Ok(accepted)
    }

    /// Decline an order and cascade to the next executor.
    ///
    /// Declining an offer that was already resolved is a no-op.
    pub async fn decline_offer(&self, order_id: i64, executor_id: i64) -> Result<()> {
        let now = self.clock.now();
        let mut outbox = Vec::new();
        let mut tx = self.db.begin().await?;

        let current = order::get_order(&mut *tx, order_id).await?;
        match offer::get_active_offer(&mut *tx, order_id).await? {
            Some(active) if active.executor_id == executor_id => {
                if !offers::close_offer(&mut tx, &active, OfferStatus::Declined, now).await? {
                    return Ok(());
                }
            }
            _ => {
                if current.status != OrderStatus::New {
                    return Err(MatchingError::NotOffered {
                        order_id,
                        executor_id,
                    });
                }
                if declined::has_declined(&mut *tx, order_id, executor_id).await? {
                    return Ok(());
                }
            }
        }

        info!("Executor {} declined order {}", executor_id, order_id);
        self.refuse_and_reassign(&mut tx, order_id, executor_id, now, &mut outbox)
            .await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        self.deliver(outbox).await;
        Ok(())
    }

    /// Expire every overdue offer and cascade. Returns how many were expired.
    ///
    /// Each offer is handled in its own transaction; one failure does not stop
    /// the rest.
    pub async fn expire_offers(&self) -> Result<usize> {
        let now = self.clock.now();
        let overdue = offer::list_expired_offers(self.db.pool(), now).await?;

        let mut expired = 0;
        for stale in overdue {
            match self.expire_one(&stale, now).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    "Failed to expire offer {} for order {}: {}",
                    stale.id, stale.order_id, e
                ),
            }
        }

        Ok(expired)
    }

    async fn expire_one(&self, stale: &OrderOffer, now: DateTime<Utc>) -> Result<bool> {
        let mut outbox = Vec::new();
        let mut tx = self.db.begin().await?;

        if !offers::close_offer(&mut tx, stale, OfferStatus::Expired, now).await? {
            return Ok(false);
        }
        info!(
            "Offer {} for order {} to executor {} expired",
            stale.id, stale.order_id, stale.executor_id
        );
        outbox.push(Notification::text(
            stale.executor_id,
            texts::offer_expired(stale.order_id),
        ));

        self.refuse_and_reassign(&mut tx, stale.order_id, stale.executor_id, now, &mut outbox)
            .await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        self.deliver(outbox).await;
        Ok(true)
    }

    /// Remove the assigned executor and look for a replacement.
    ///
    /// Returns the order after reassignment and the removed executor's id.
    pub async fn unassign_executor(&self, actor_id: i64, order_id: i64) -> Result<(Order, i64)> {
        let now = self.clock.now();
        let mut outbox = Vec::new();
        let mut tx = self.db.begin().await?;

        self.capabilities(&mut tx, actor_id)
            .await?
            .require(Permission::AssignOrders)?;

        let current = order::get_order(&mut *tx, order_id).await?;
        ensure_transition(current.status, OrderStatus::New)?;
        let previous = current.executor_tg_id.ok_or(MatchingError::InvalidTransition {
            from: current.status,
            to: OrderStatus::New,
        })?;

        if !order::release_executor(&mut *tx, order_id, current.status).await? {
            return Err(MatchingError::InvalidTransition {
                from: current.status,
                to: OrderStatus::New,
            });
        }
        declined::record_decline(&mut *tx, order_id, previous, now).await?;
        info!(
            "User {} unassigned executor {} from order {}",
            actor_id, previous, order_id
        );
        outbox.push(Notification::text(previous, texts::unassigned_executor(order_id)));

        self.reassign(&mut tx, order_id, now, &mut outbox).await?;
        let updated = order::get_order(&mut *tx, order_id).await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        self.deliver(outbox).await;
        Ok((updated, previous))
    }

    /// Change date, time, address or price of an order.
    ///
    /// Assigned orders move to `pending_confirmation` and the executor is
    /// asked to confirm the new terms.
    pub async fn edit_order(&self, actor_id: i64, order_id: i64, terms: OrderTerms) -> Result<Order> {
        validate_terms(&terms)?;
        let mut outbox = Vec::new();
        let mut tx = self.db.begin().await?;

        self.capabilities(&mut tx, actor_id)
            .await?
            .require(Permission::EditOrders)?;

        let current = order::get_order(&mut *tx, order_id).await?;
        let target = match current.status {
            OrderStatus::New => OrderStatus::New,
            OrderStatus::PendingConfirmation => OrderStatus::PendingConfirmation,
            status => {
                ensure_transition(status, OrderStatus::PendingConfirmation)?;
                OrderStatus::PendingConfirmation
            }
        };

        let payment = match current.executor_tg_id {
            Some(_) => {
                let commission = settings::get_commission(&mut *tx).await?;
                Some(calculate_executor_payment(terms.total_price, &commission))
            }
            None => None,
        };

        if !order::update_terms(&mut *tx, order_id, current.status, target, &terms, payment).await?
        {
            return Err(MatchingError::InvalidTransition {
                from: current.status,
                to: target,
            });
        }
        let updated = order::get_order(&mut *tx, order_id).await?;
        info!("User {} edited order {} ({})", actor_id, order_id, updated.status);

        if let Some(executor_id) = updated.executor_tg_id {
            outbox.push(
                Notification::text(executor_id, texts::changes_request(&updated))
                    .with_actions(texts::changes_actions(order_id)),
            );
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        self.deliver(outbox).await;
        Ok(updated)
    }

    fn require_assignee(order: &Order, executor_id: i64) -> Result<()> {
        if order.executor_tg_id == Some(executor_id) {
            Ok(())
        } else {
            Err(MatchingError::NotOffered {
                order_id: order.id,
                executor_id,
            })
        }
    }

    /// Executor keeps an edited order.
    pub async fn confirm_changes(&self, order_id: i64, executor_id: i64) -> Result<Order> {
        let mut outbox = Vec::new();
        let mut tx = self.db.begin().await?;

        let current = order::get_order(&mut *tx, order_id).await?;
        Self::require_assignee(&current, executor_id)?;
        if current.status != OrderStatus::PendingConfirmation
            || !order::transition_status(
                &mut *tx,
                order_id,
                OrderStatus::PendingConfirmation,
                OrderStatus::Accepted,
            )
            .await?
        {
            return Err(MatchingError::InvalidTransition {
                from: current.status,
                to: OrderStatus::Accepted,
            });
        }

        let updated = order::get_order(&mut *tx, order_id).await?;
        outbox.push(Notification::text(
            updated.client_tg_id,
            texts::status_changed(&updated),
        ));

        tx.commit().await.map_err(DatabaseError::from)?;
        self.deliver(outbox).await;
        Ok(updated)
    }

    /// Executor gives up an edited order. No penalty is applied.
    pub async fn decline_changes(&self, order_id: i64, executor_id: i64) -> Result<DispatchOutcome> {
        let now = self.clock.now();
        let mut outbox = Vec::new();
        let mut tx = self.db.begin().await?;

        let current = order::get_order(&mut *tx, order_id).await?;
        Self::require_assignee(&current, executor_id)?;
        if current.status != OrderStatus::PendingConfirmation
            || !order::release_executor(&mut *tx, order_id, OrderStatus::PendingConfirmation).await?
        {
            return Err(MatchingError::InvalidTransition {
                from: current.status,
                to: OrderStatus::New,
            });
        }

        declined::record_decline(&mut *tx, order_id, executor_id, now).await?;
        let executor = user::get_user(&mut *tx, executor_id).await?;
        info!("Executor {} refused changes to order {}", executor_id, order_id);
        self.alert_admins(&mut outbox, texts::changes_refused_admin(order_id, &executor));

        let outcome = self.reassign(&mut tx, order_id, now, &mut outbox).await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        self.deliver(outbox).await;
        Ok(outcome)
    }

    /// Assigned executor reports the next step of the cleaning.
    pub async fn advance_status(
        &self,
        order_id: i64,
        executor_id: i64,
        to: OrderStatus,
    ) -> Result<Order> {
        let mut outbox = Vec::new();
        let mut tx = self.db.begin().await?;

        let current = order::get_order(&mut *tx, order_id).await?;
        Self::require_assignee(&current, executor_id)?;
        if next_progress(current.status) != Some(to)
            || !order::transition_status(&mut *tx, order_id, current.status, to).await?
        {
            return Err(MatchingError::InvalidTransition {
                from: current.status,
                to,
            });
        }

        let updated = order::get_order(&mut *tx, order_id).await?;
        info!("Order {} is now {}", order_id, to);
        outbox.push(Notification::text(
            updated.client_tg_id,
            texts::status_changed(&updated),
        ));
        if to == OrderStatus::Completed {
            outbox.push(Notification::text(
                updated.client_tg_id,
                texts::rate_request(order_id),
            ));
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        self.deliver(outbox).await;
        Ok(updated)
    }

    /// Client cancels their order. An open offer is withdrawn without penalty.
    pub async fn cancel_order(&self, order_id: i64, client_id: i64) -> Result<Order> {
        let now = self.clock.now();
        let mut outbox = Vec::new();
        let mut tx = self.db.begin().await?;

        let current = order::get_order(&mut *tx, order_id).await?;
        if current.client_tg_id != client_id {
            return Err(MatchingError::NotOwner {
                order_id,
                user_id: client_id,
            });
        }
        ensure_transition(current.status, OrderStatus::Cancelled)?;

        if let Some(active) = offer::get_active_offer(&mut *tx, order_id).await? {
            if offers::close_offer(&mut tx, &active, OfferStatus::Expired, now).await? {
                outbox.push(Notification::text(
                    active.executor_id,
                    texts::offer_withdrawn(order_id),
                ));
            }
        }

        if !order::transition_status(&mut *tx, order_id, current.status, OrderStatus::Cancelled)
            .await?
        {
            return Err(MatchingError::InvalidTransition {
                from: current.status,
                to: OrderStatus::Cancelled,
            });
        }
        info!("Client {} cancelled order {}", client_id, order_id);

        if let Some(executor_id) = current.executor_tg_id {
            outbox.push(Notification::text(executor_id, texts::cancelled(order_id)));
        }
        self.alert_admins(&mut outbox, texts::cancelled(order_id));
        let updated = order::get_order(&mut *tx, order_id).await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        self.deliver(outbox).await;
        Ok(updated)
    }

    /// Client rates a completed order; the executor's rating is recomputed.
    ///
    /// Rating an already rated order leaves the first rating in place.
    pub async fn rate_order(&self, order_id: i64, client_id: i64, rating: i64) -> Result<Order> {
        validate_rating(rating)?;
        let mut tx = self.db.begin().await?;

        let current = order::get_order(&mut *tx, order_id).await?;
        if current.client_tg_id != client_id {
            return Err(MatchingError::NotOwner {
                order_id,
                user_id: client_id,
            });
        }
        if current.status != OrderStatus::Completed {
            return Err(MatchingError::InvalidTransition {
                from: current.status,
                to: OrderStatus::Completed,
            });
        }

        if order::set_rating(&mut *tx, order_id, rating).await? {
            if let Some(executor_id) = current.executor_tg_id {
                let (average, count) = order::executor_rating_stats(&mut *tx, executor_id).await?;
                user::update_rating_stats(&mut *tx, executor_id, average, count).await?;
                info!(
                    "Executor {} rated {} on order {}, average {:.2} over {}",
                    executor_id, rating, order_id, average, count
                );
            }
        }

        let updated = order::get_order(&mut *tx, order_id).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(updated)
    }

    /// Orders an executor may pick up. Lifts an expired block first.
    pub async fn new_orders_for(&self, executor_id: i64) -> Result<Vec<Order>> {
        let now = self.clock.now();
        let mut tx = self.db.begin().await?;

        let executor = penalty::on_access_check(&mut tx, executor_id, now).await?;
        if executor.role != UserRole::Executor {
            return Err(MatchingError::Forbidden {
                actor_id: executor_id,
                permission: Permission::ViewOrders,
            });
        }
        if executor.status == UserStatus::Blocked {
            tx.commit().await.map_err(DatabaseError::from)?;
            return Err(MatchingError::ExecutorBlocked {
                executor_id,
                until: executor.blocked_until,
            });
        }

        let orders = order::list_available_for_executor(&mut *tx, executor_id).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(orders)
    }

    /// Set an executor's matching priority.
    pub async fn set_priority(&self, actor_id: i64, executor_id: i64, priority: i64) -> Result<User> {
        let mut tx = self.db.begin().await?;
        self.capabilities(&mut tx, actor_id)
            .await?
            .require(Permission::ManageExecutors)?;

        user::set_priority(&mut *tx, executor_id, priority).await?;
        let updated = user::get_user(&mut *tx, executor_id).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        info!("User {} set priority of executor {} to {}", actor_id, executor_id, priority);
        Ok(updated)
    }

    /// Unblock an executor now and clear their decline counter.
    pub async fn lift_penalty(&self, actor_id: i64, executor_id: i64) -> Result<User> {
        let mut tx = self.db.begin().await?;
        self.capabilities(&mut tx, actor_id)
            .await?
            .require(Permission::ManageExecutors)?;

        user::clear_penalty(&mut *tx, executor_id).await?;
        let updated = user::get_user(&mut *tx, executor_id).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        info!("User {} lifted penalty of executor {}", actor_id, executor_id);
        Ok(updated)
    }

    /// Store a new commission rule. Applies to payouts computed from now on.
    pub async fn set_commission(&self, actor_id: i64, commission: Commission) -> Result<()> {
        let now = self.clock.now();
        let mut tx = self.db.begin().await?;
        self.capabilities(&mut tx, actor_id)
            .await?
            .require(Permission::ManageSettings)?;

        settings::set_commission(&mut tx, &commission, now).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        info!(
            "User {} set commission to {} {}",
            actor_id, commission.commission_value, commission.commission_type
        );
        Ok(())
    }

    /// Reactivate executors whose block has run out.
    pub async fn release_expired_blocks(&self) -> Result<Vec<i64>> {
        let released = user::release_expired_blocks(self.db.pool(), self.clock.now()).await?;
        if !released.is_empty() {
            info!("Released {} executors from expired blocks", released.len());
        }
        Ok(released)
    }

    /// Send reminders whose window contains the current time.
    ///
    /// Each order is handled in its own transaction and delivered right after
    /// its flags are committed; one failure does not stop the rest.
    pub async fn send_reminders(&self) -> Result<usize> {
        let now = self.clock.now();
        let candidates = order::list_reminder_candidates(self.db.pool()).await?;

        let mut sent = 0;
        for candidate in candidates {
            match self.remind_one(&candidate, now).await {
                Ok(count) => sent += count,
                Err(e) => warn!("Failed to send reminders for order {}: {}", candidate.id, e),
            }
        }

        Ok(sent)
    }

    async fn remind_one(&self, candidate: &Order, now: DateTime<Utc>) -> Result<usize> {
        let due = due_reminders(candidate, now, &self.config.timezone);
        if due.is_empty() {
            return Ok(0);
        }

        let mut outbox = Vec::new();
        let mut tx = self.db.begin().await?;
        for reminder in &due {
            match reminder {
                Reminder::DayBefore => outbox.push(Notification::text(
                    candidate.client_tg_id,
                    texts::reminder_day_before(candidate),
                )),
                Reminder::TwoHoursBefore if candidate.status == OrderStatus::Accepted => {
                    outbox.push(Notification::text(
                        candidate.client_tg_id,
                        texts::reminder_two_hours(candidate),
                    ))
                }
                Reminder::TwoHoursBefore => {
                    warn!("Order {} starts in 2 hours without an executor", candidate.id);
                    self.alert_admins(&mut outbox, texts::admin_still_unassigned(candidate));
                }
            }
            order::mark_reminder_sent(&mut *tx, candidate.id, *reminder).await?;
        }
        tx.commit().await.map_err(DatabaseError::from)?;

        self.deliver(outbox).await;
        Ok(due.len())
    }

    /// One maintenance pass: lift expired blocks, expire offers, send reminders.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let released = self.release_expired_blocks().await?.len();
        let expired = self.expire_offers().await?;
        let reminders = self.send_reminders().await?;

        Ok(SweepReport {
            released,
            expired,
            reminders,
        })
    }
}
