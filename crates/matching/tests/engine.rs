//! Integration tests for the matching engine.
//!
//! Every test runs against a fresh in-memory SQLite database with a manually
//! driven clock and a sender that records every notification.
//!
//! Run:
//!   cargo test -p matching --test engine

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc, Weekday};
use database::{
    declined, offer, order, schedule, user, Commission, CommissionType, Database, NewOrder,
    OfferStatus, OrderStatus, OrderTerms, User, UserRole, UserStatus,
};
use matching::{
    Clock, DispatchOutcome, EngineConfig, FixedClock, MatchingEngine, MatchingError, Notification,
    NotificationSender, NotifyError, RecordingSender,
};

const ADMIN: i64 = 900;
const SUPERVISOR: i64 = 950;
const CLIENT: i64 = 100;

/// Monday 2026-10-19 13:00 at UTC+5.
fn monday_afternoon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap()
}

struct Harness {
    db: Database,
    engine: MatchingEngine<Arc<RecordingSender>>,
    sender: Arc<RecordingSender>,
    clock: Arc<FixedClock>,
}

async fn harness_at(now: DateTime<Utc>) -> Harness {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();

    user::create_user(db.pool(), &User::new(CLIENT, "Client", UserRole::Client))
        .await
        .unwrap();
    user::create_user(db.pool(), &User::new(SUPERVISOR, "Lead", UserRole::Supervisor))
        .await
        .unwrap();

    let sender = Arc::new(RecordingSender::new());
    let clock = Arc::new(FixedClock::new(now));
    let engine = MatchingEngine::with_clock(
        db.clone(),
        sender.clone(),
        EngineConfig::new(vec![ADMIN]),
        clock.clone() as Arc<dyn Clock>,
    );

    Harness {
        db,
        engine,
        sender,
        clock,
    }
}

async fn harness() -> Harness {
    harness_at(monday_afternoon()).await
}

async fn add_executor(db: &Database, id: i64, priority: i64, rating: f64) {
    let mut executor = User::new(id, format!("exec-{id}"), UserRole::Executor);
    executor.priority = priority;
    executor.average_rating = rating;
    user::create_user(db.pool(), &executor).await.unwrap();
}

async fn place_order(db: &Database, date: &str, slot: &str, price: f64) -> i64 {
    let new_order = NewOrder {
        client_tg_id: CLIENT,
        selected_date: date.to_string(),
        selected_time: slot.to_string(),
        address_text: "Lenina 1, apt 5".to_string(),
        total_price: price,
    };
    order::create_order(db.pool(), &new_order, Utc::now()).await.unwrap()
}

/// Order next Monday morning, about a week ahead.
async fn place_monday_order(db: &Database) -> i64 {
    place_order(db, "2026-10-26", "9:00 - 12:00", 3000.0).await
}

fn offered_to(outcome: &DispatchOutcome) -> i64 {
    match outcome {
        DispatchOutcome::Offered { executor_id, .. } => *executor_id,
        other => panic!("expected an offer, got {other:?}"),
    }
}

async fn active_executor(db: &Database, order_id: i64) -> Option<i64> {
    offer::get_active_offer(db.pool(), order_id)
        .await
        .unwrap()
        .map(|o| o.executor_id)
}

// ============================================================================
// Candidate selection
// ============================================================================

mod selection {
    use super::*;

    #[tokio::test]
    async fn test_schedule_match_is_offered_before_higher_ranked_executor() {
        let h = harness().await;
        add_executor(&h.db, 1, 1, 4.0).await;
        add_executor(&h.db, 2, 10, 5.0).await;

        let mut conn = h.db.pool().acquire().await.unwrap();
        let slots = HashSet::from([(Weekday::Mon, "9:00 - 12:00".to_string())]);
        schedule::set_schedule(&mut conn, 1, &slots, monday_afternoon())
            .await
            .unwrap();
        drop(conn);

        let order_id = place_monday_order(&h.db).await;
        let outcome = h.engine.dispatch_new_order(order_id).await.unwrap();

        assert_eq!(offered_to(&outcome), 1);
        let offer_note = &h.sender.sent_to(1)[0];
        assert_eq!(offer_note.actions.len(), 2);
        assert_eq!(
            offer_note.actions[0].callback,
            format!("executor_accept_order:{order_id}")
        );
        assert!(h.sender.sent_to(2).is_empty());
    }

    #[tokio::test]
    async fn test_schedule_without_slot_excludes_executor() {
        let h = harness().await;
        add_executor(&h.db, 1, 50, 5.0).await;

        let mut conn = h.db.pool().acquire().await.unwrap();
        let slots = HashSet::from([(Weekday::Tue, "9:00 - 12:00".to_string())]);
        schedule::set_schedule(&mut conn, 1, &slots, monday_afternoon())
            .await
            .unwrap();
        drop(conn);

        let order_id = place_monday_order(&h.db).await;
        let outcome = h.engine.dispatch_new_order(order_id).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Exhausted);
    }

    #[tokio::test]
    async fn test_declined_executor_is_never_offered_again() {
        let h = harness().await;
        add_executor(&h.db, 1, 5, 5.0).await;
        add_executor(&h.db, 2, 1, 5.0).await;
        let order_id = place_monday_order(&h.db).await;

        let first = h.engine.dispatch_new_order(order_id).await.unwrap();
        assert_eq!(offered_to(&first), 1);

        h.engine.decline_offer(order_id, 1).await.unwrap();
        assert_eq!(active_executor(&h.db, order_id).await, Some(2));

        h.engine.decline_offer(order_id, 2).await.unwrap();
        assert_eq!(active_executor(&h.db, order_id).await, None);

        // Both have declined; nobody is left.
        let again = h.engine.dispatch_new_order(order_id).await.unwrap();
        assert_eq!(again, DispatchOutcome::Exhausted);

        let offers = offer::list_offers_for_order(h.db.pool(), order_id)
            .await
            .unwrap();
        let offered: Vec<i64> = offers.iter().map(|o| o.executor_id).collect();
        assert_eq!(offered, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_exhausted_order_stays_new_and_alerts_admin() {
        let h = harness().await;
        let order_id = place_monday_order(&h.db).await;

        let outcome = h.engine.dispatch_new_order(order_id).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Exhausted);

        let stored = order::get_order(h.db.pool(), order_id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::New);
        assert_eq!(stored.executor_tg_id, None);

        let alerts = h.sender.sent_to(ADMIN);
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].text.contains("Manual assignment needed"));
    }

    #[tokio::test]
    async fn test_blocked_executor_is_skipped() {
        let h = harness().await;
        add_executor(&h.db, 1, 10, 5.0).await;
        add_executor(&h.db, 2, 0, 0.0).await;
        user::block_user(h.db.pool(), 1, monday_afternoon() + Duration::hours(5))
            .await
            .unwrap();

        let order_id = place_monday_order(&h.db).await;
        let outcome = h.engine.dispatch_new_order(order_id).await.unwrap();
        assert_eq!(offered_to(&outcome), 2);
    }
}

// ============================================================================
// Offers and timeouts
// ============================================================================

mod offers {
    use super::*;

    #[tokio::test]
    async fn test_single_active_offer_per_order() {
        let h = harness().await;
        add_executor(&h.db, 1, 5, 5.0).await;
        add_executor(&h.db, 2, 1, 5.0).await;
        let order_id = place_monday_order(&h.db).await;

        let first = h.engine.dispatch_new_order(order_id).await.unwrap();
        let second = h.engine.dispatch_new_order(order_id).await.unwrap();

        assert_eq!(offered_to(&first), 1);
        assert_eq!(second, DispatchOutcome::AlreadyOffered { executor_id: 1 });
        assert_eq!(offer::count_active_offers(h.db.pool()).await.unwrap(), 1);
        assert!(h.sender.sent_to(2).is_empty());
    }

    #[tokio::test]
    async fn test_short_notice_order_gets_fifteen_minutes() {
        let h = harness().await;
        add_executor(&h.db, 1, 0, 0.0).await;
        // 15:00 local on the same day, two hours from now.
        let order_id = place_order(&h.db, "2026-10-19", "15:00 - 18:00", 2500.0).await;

        match h.engine.dispatch_new_order(order_id).await.unwrap() {
            DispatchOutcome::Offered { expires_at, .. } => {
                assert_eq!(expires_at, monday_afternoon() + Duration::minutes(15));
            }
            other => panic!("expected an offer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_tiers_follow_lead_time() {
        // 08:00 local
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 3, 0, 0).unwrap();
        let h = harness_at(now).await;
        add_executor(&h.db, 1, 0, 0.0).await;

        let cases = [
            // 18:00 local today, 10 hours ahead
            ("2026-10-19", "18:00 - 21:00", 15),
            // 09:00 local tomorrow, 25 hours ahead
            ("2026-10-20", "9:00 - 12:00", 30),
            // Saturday morning, 5 days and an hour ahead
            ("2026-10-24", "9:00 - 12:00", 60),
        ];

        for (date, slot, minutes) in cases {
            let order_id = place_order(&h.db, date, slot, 2000.0).await;
            match h.engine.dispatch_new_order(order_id).await.unwrap() {
                DispatchOutcome::Offered { expires_at, .. } => {
                    assert_eq!(expires_at, now + Duration::minutes(minutes), "{date} {slot}");
                }
                other => panic!("expected an offer, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_expired_offer_cascades_and_counts_as_decline() {
        let h = harness().await;
        add_executor(&h.db, 1, 5, 5.0).await;
        add_executor(&h.db, 2, 1, 5.0).await;
        let order_id = place_monday_order(&h.db).await;
        h.engine.dispatch_new_order(order_id).await.unwrap();

        // Not yet due
        h.clock.advance(Duration::minutes(59));
        assert_eq!(h.engine.expire_offers().await.unwrap(), 0);

        h.clock.advance(Duration::minutes(1));
        let report = h.engine.sweep().await.unwrap();
        assert_eq!(report.expired, 1);

        assert_eq!(active_executor(&h.db, order_id).await, Some(2));
        assert!(declined::has_declined(h.db.pool(), order_id, 1).await.unwrap());
        let late = user::get_user(h.db.pool(), 1).await.unwrap();
        assert_eq!(late.consecutive_declines, 1);

        let offers = offer::list_offers_for_order(h.db.pool(), order_id)
            .await
            .unwrap();
        assert_eq!(offers[0].status, OfferStatus::Expired);
        assert!(h.sender.sent_to(1).iter().any(|n| n.text.contains("expired")));

        // Late answers from the first executor change nothing.
        h.engine.decline_offer(order_id, 1).await.unwrap();
        let err = h.engine.accept_offer(order_id, 1).await.unwrap_err();
        assert!(err.is_already_handled());
        assert_eq!(
            user::get_user(h.db.pool(), 1).await.unwrap().consecutive_declines,
            1
        );
    }

    #[tokio::test]
    async fn test_accept_assigns_with_commission_and_resets_declines() {
        let h = harness().await;
        add_executor(&h.db, 1, 5, 5.0).await;
        add_executor(&h.db, 2, 1, 5.0).await;
        h.engine
            .set_commission(
                ADMIN,
                Commission {
                    commission_type: CommissionType::Percent,
                    commission_value: 20.0,
                },
            )
            .await
            .unwrap();

        // One earlier decline on another order
        let other = place_monday_order(&h.db).await;
        h.engine.dispatch_new_order(other).await.unwrap();
        h.engine.decline_offer(other, 1).await.unwrap();

        let order_id = place_monday_order(&h.db).await;
        assert_eq!(offered_to(&h.engine.dispatch_new_order(order_id).await.unwrap()), 1);

        let accepted = h.engine.accept_offer(order_id, 1).await.unwrap();
        assert_eq!(accepted.status, OrderStatus::Accepted);
        assert_eq!(accepted.executor_tg_id, Some(1));
        assert_eq!(accepted.executor_payment, Some(2400.0));
        assert_eq!(user::get_user(h.db.pool(), 1).await.unwrap().consecutive_declines, 0);
        assert!(!h.sender.sent_to(CLIENT).is_empty());

        // Accepting again is a no-op
        let again = h.engine.accept_offer(order_id, 1).await.unwrap();
        assert_eq!(again, accepted);

        let err = h.engine.accept_offer(order_id, 2).await.unwrap_err();
        assert!(matches!(err, MatchingError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_new_orders_list_hides_orders_offered_to_others() {
        let h = harness().await;
        add_executor(&h.db, 1, 0, 0.0).await;
        add_executor(&h.db, 2, 5, 0.0).await;

        let offered = place_monday_order(&h.db).await;
        let open = place_monday_order(&h.db).await;
        assert_eq!(offered_to(&h.engine.dispatch_new_order(offered).await.unwrap()), 2);

        let for_one: Vec<i64> = h.engine.new_orders_for(1).await.unwrap().iter().map(|o| o.id).collect();
        assert_eq!(for_one, vec![open]);
        let for_two: Vec<i64> = h.engine.new_orders_for(2).await.unwrap().iter().map(|o| o.id).collect();
        assert_eq!(for_two, vec![offered, open]);

        let err = h.engine.accept_offer(offered, 1).await.unwrap_err();
        assert!(matches!(err, MatchingError::NotOffered { .. }));

        let taken = h.engine.accept_offer(open, 1).await.unwrap();
        assert_eq!(taken.executor_tg_id, Some(1));

        let err = h.engine.new_orders_for(CLIENT).await.unwrap_err();
        assert!(matches!(err, MatchingError::Forbidden { .. }));
    }
}

// ============================================================================
// Penalties
// ============================================================================

mod penalties {
    use super::*;

    #[tokio::test]
    async fn test_counted_decline_warns_executor() {
        let h = harness().await;
        add_executor(&h.db, 1, 5, 0.0).await;
        add_executor(&h.db, 2, 1, 0.0).await;
        let order_id = place_monday_order(&h.db).await;
        assert_eq!(offered_to(&h.engine.dispatch_new_order(order_id).await.unwrap()), 1);
        h.sender.take();

        h.engine.decline_offer(order_id, 1).await.unwrap();

        let to_executor = h.sender.sent_to(1);
        assert_eq!(to_executor.len(), 1);
        assert!(to_executor[0].text.contains("Declines in a row: 1"));
        assert!(to_executor[0].text.contains("After 2 more"));
        assert_eq!(user::get_user(h.db.pool(), 1).await.unwrap().consecutive_declines, 1);
        assert!(h.sender.sent_to(ADMIN).is_empty());
        assert_eq!(active_executor(&h.db, order_id).await, Some(2));
    }

    #[tokio::test]
    async fn test_three_declines_block_for_twelve_hours() {
        let h = harness().await;
        add_executor(&h.db, 1, 0, 0.0).await;

        for _ in 0..3 {
            let order_id = place_monday_order(&h.db).await;
            assert_eq!(offered_to(&h.engine.dispatch_new_order(order_id).await.unwrap()), 1);
            h.engine.decline_offer(order_id, 1).await.unwrap();
        }

        let blocked = user::get_user(h.db.pool(), 1).await.unwrap();
        assert_eq!(blocked.status, UserStatus::Blocked);
        assert_eq!(blocked.blocked_until, Some(monday_afternoon() + Duration::hours(12)));
        assert_eq!(blocked.consecutive_declines, 0);

        assert!(h.sender.sent_to(1).iter().any(|n| n.text.contains("paused")));
        assert!(h.sender.sent_to(ADMIN).iter().any(|n| n.text.contains("blocked")));

        // Blocked executors get no offers and cannot open the list.
        let order_id = place_monday_order(&h.db).await;
        assert_eq!(
            h.engine.dispatch_new_order(order_id).await.unwrap(),
            DispatchOutcome::Exhausted
        );
        assert!(matches!(
            h.engine.new_orders_for(1).await,
            Err(MatchingError::ExecutorBlocked { executor_id: 1, .. })
        ));

        // Opening the list after the block lifts it.
        h.clock.advance(Duration::hours(12));
        let available = h.engine.new_orders_for(1).await.unwrap();
        assert_eq!(available.iter().map(|o| o.id).collect::<Vec<_>>(), vec![order_id]);
        assert_eq!(
            user::get_user(h.db.pool(), 1).await.unwrap().status,
            UserStatus::Active
        );
    }

    #[tokio::test]
    async fn test_sweep_releases_expired_blocks() {
        let h = harness().await;
        add_executor(&h.db, 1, 0, 0.0).await;
        user::block_user(h.db.pool(), 1, monday_afternoon() + Duration::hours(12))
            .await
            .unwrap();

        h.clock.advance(Duration::hours(11));
        assert_eq!(h.engine.sweep().await.unwrap().released, 0);

        h.clock.advance(Duration::hours(1));
        assert_eq!(h.engine.sweep().await.unwrap().released, 1);
        assert_eq!(
            user::get_user(h.db.pool(), 1).await.unwrap().status,
            UserStatus::Active
        );
    }

    #[tokio::test]
    async fn test_admin_can_lift_penalty_and_set_priority() {
        let h = harness().await;
        add_executor(&h.db, 1, 0, 0.0).await;
        user::block_user(h.db.pool(), 1, monday_afternoon() + Duration::hours(12))
            .await
            .unwrap();

        let err = h.engine.lift_penalty(SUPERVISOR, 1).await.unwrap_err();
        assert!(matches!(err, MatchingError::Forbidden { actor_id: SUPERVISOR, .. }));

        let lifted = h.engine.lift_penalty(ADMIN, 1).await.unwrap();
        assert_eq!(lifted.status, UserStatus::Active);
        assert_eq!(lifted.blocked_until, None);

        let raised = h.engine.set_priority(ADMIN, 1, 7).await.unwrap();
        assert_eq!(raised.priority, 7);

        let bad = Commission {
            commission_type: CommissionType::Percent,
            commission_value: 150.0,
        };
        assert!(matches!(
            h.engine.set_commission(ADMIN, bad).await,
            Err(MatchingError::Database(_)) | Err(MatchingError::Validation(_))
        ));
    }
}

// ============================================================================
// Admin reassignment and edits
// ============================================================================

mod reassignment {
    use super::*;

    async fn accepted_order(h: &Harness) -> i64 {
        add_executor(&h.db, 1, 5, 5.0).await;
        add_executor(&h.db, 2, 1, 5.0).await;
        let order_id = place_monday_order(&h.db).await;
        h.engine.dispatch_new_order(order_id).await.unwrap();
        h.engine.accept_offer(order_id, 1).await.unwrap();
        order_id
    }

    #[tokio::test]
    async fn test_unassign_returns_order_and_offers_next_executor() {
        let h = harness().await;
        let order_id = accepted_order(&h).await;

        let (updated, previous) = h.engine.unassign_executor(ADMIN, order_id).await.unwrap();

        assert_eq!(previous, 1);
        assert_eq!(updated.status, OrderStatus::New);
        assert_eq!(updated.executor_tg_id, None);
        assert_eq!(updated.executor_payment, None);
        assert!(declined::has_declined(h.db.pool(), order_id, 1).await.unwrap());
        assert_eq!(active_executor(&h.db, order_id).await, Some(2));
        assert!(h.sender.sent_to(1).iter().any(|n| n.text.contains("removed")));
    }

    #[tokio::test]
    async fn test_unassign_requires_permission() {
        let h = harness().await;
        let order_id = accepted_order(&h).await;

        let err = h.engine.unassign_executor(CLIENT, order_id).await.unwrap_err();
        assert!(matches!(err, MatchingError::Forbidden { .. }));

        // Supervisors may reassign.
        let (_, previous) = h.engine.unassign_executor(SUPERVISOR, order_id).await.unwrap();
        assert_eq!(previous, 1);

        // Nothing left to unassign.
        let err = h.engine.unassign_executor(ADMIN, order_id).await.unwrap_err();
        assert!(err.is_already_handled());
    }

    fn new_terms(price: f64) -> OrderTerms {
        OrderTerms {
            selected_date: "2026-10-27".to_string(),
            selected_time: "12:00 - 15:00".to_string(),
            address_text: "Respubliki 10".to_string(),
            total_price: price,
        }
    }

    #[tokio::test]
    async fn test_edit_requires_reconfirmation() {
        let h = harness().await;
        let order_id = accepted_order(&h).await;
        h.engine
            .set_commission(
                ADMIN,
                Commission {
                    commission_type: CommissionType::Fixed,
                    commission_value: 500.0,
                },
            )
            .await
            .unwrap();

        let edited = h.engine.edit_order(SUPERVISOR, order_id, new_terms(4000.0)).await.unwrap();
        assert_eq!(edited.status, OrderStatus::PendingConfirmation);
        assert_eq!(edited.executor_payment, Some(3500.0));
        assert_eq!(edited.selected_time, "12:00 - 15:00");

        let request = h.sender.sent_to(1).pop().unwrap();
        assert_eq!(
            request.actions[0].callback,
            format!("executor_accept_changes:{order_id}")
        );

        let confirmed = h.engine.confirm_changes(order_id, 1).await.unwrap();
        assert_eq!(confirmed.status, OrderStatus::Accepted);

        let err = h.engine.confirm_changes(order_id, 1).await.unwrap_err();
        assert!(matches!(err, MatchingError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_refusing_changes_reassigns_without_penalty() {
        let h = harness().await;
        let order_id = accepted_order(&h).await;
        h.engine.edit_order(ADMIN, order_id, new_terms(3500.0)).await.unwrap();

        let err = h.engine.decline_changes(order_id, 2).await.unwrap_err();
        assert!(matches!(err, MatchingError::NotOffered { .. }));

        let outcome = h.engine.decline_changes(order_id, 1).await.unwrap();
        assert_eq!(offered_to(&outcome), 2);

        let stored = order::get_order(h.db.pool(), order_id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::New);
        assert!(declined::has_declined(h.db.pool(), order_id, 1).await.unwrap());
        assert_eq!(user::get_user(h.db.pool(), 1).await.unwrap().consecutive_declines, 0);
        assert!(h.sender.sent_to(ADMIN).iter().any(|n| n.text.contains("refused")));
    }

    #[tokio::test]
    async fn test_edit_rejects_bad_slot() {
        let h = harness().await;
        let order_id = accepted_order(&h).await;
        let mut terms = new_terms(3000.0);
        terms.selected_time = "7:00 - 8:00".to_string();

        let err = h.engine.edit_order(ADMIN, order_id, terms).await.unwrap_err();
        assert!(matches!(err, MatchingError::Validation(_)));
    }
}

// ============================================================================
// Order progress, cancellation and rating
// ============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_progress_completion_and_rating() {
        let h = harness().await;
        add_executor(&h.db, 1, 0, 0.0).await;
        let order_id = place_monday_order(&h.db).await;
        h.engine.dispatch_new_order(order_id).await.unwrap();
        h.engine.accept_offer(order_id, 1).await.unwrap();

        let err = h
            .engine
            .advance_status(order_id, 1, OrderStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, MatchingError::InvalidTransition { .. }));

        for step in [OrderStatus::OnTheWay, OrderStatus::InProgress, OrderStatus::Completed] {
            let updated = h.engine.advance_status(order_id, 1, step).await.unwrap();
            assert_eq!(updated.status, step);
        }
        assert!(h.sender.sent_to(CLIENT).iter().any(|n| n.text.contains("rate")));

        let err = h.engine.rate_order(order_id, 555, 5).await.unwrap_err();
        assert!(matches!(err, MatchingError::NotOwner { .. }));
        assert!(matches!(
            h.engine.rate_order(order_id, CLIENT, 6).await,
            Err(MatchingError::Validation(_))
        ));

        let rated = h.engine.rate_order(order_id, CLIENT, 4).await.unwrap();
        assert_eq!(rated.rating, Some(4));
        // The first rating stands.
        let again = h.engine.rate_order(order_id, CLIENT, 1).await.unwrap();
        assert_eq!(again.rating, Some(4));

        let executor = user::get_user(h.db.pool(), 1).await.unwrap();
        assert_eq!(executor.average_rating, 4.0);
        assert_eq!(executor.review_count, 1);
    }

    #[tokio::test]
    async fn test_cancel_withdraws_offer_without_penalty() {
        let h = harness().await;
        add_executor(&h.db, 1, 0, 0.0).await;
        let order_id = place_monday_order(&h.db).await;
        h.engine.dispatch_new_order(order_id).await.unwrap();

        let err = h.engine.cancel_order(order_id, 555).await.unwrap_err();
        assert!(matches!(err, MatchingError::NotOwner { .. }));

        let cancelled = h.engine.cancel_order(order_id, CLIENT).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(active_executor(&h.db, order_id).await, None);
        assert_eq!(user::get_user(h.db.pool(), 1).await.unwrap().consecutive_declines, 0);
        assert!(h.sender.sent_to(1).iter().any(|n| n.text.contains("no longer available")));

        let err = h.engine.cancel_order(order_id, CLIENT).await.unwrap_err();
        assert!(matches!(err, MatchingError::InvalidTransition { .. }));

        // Cancelled orders are not offered.
        assert_eq!(
            h.engine.dispatch_new_order(order_id).await.unwrap(),
            DispatchOutcome::NotDispatchable {
                status: OrderStatus::Cancelled
            }
        );
    }
}

// ============================================================================
// Reminders
// ============================================================================

mod reminders {
    use super::*;

    #[tokio::test]
    async fn test_day_before_reminder_is_sent_once() {
        // 09:00 local on Monday
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 4, 0, 0).unwrap();
        let h = harness_at(now).await;
        add_executor(&h.db, 1, 0, 0.0).await;
        let order_id = place_order(&h.db, "2026-10-20", "9:00 - 12:00", 2000.0).await;
        h.engine.accept_offer(order_id, 1).await.unwrap();
        h.sender.take();

        assert_eq!(h.engine.sweep().await.unwrap().reminders, 1);
        let sent = h.sender.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, CLIENT);
        assert!(sent[0].text.contains("tomorrow"));

        h.clock.advance(Duration::seconds(30));
        assert_eq!(h.engine.sweep().await.unwrap().reminders, 0);

        let stored = order::get_order(h.db.pool(), order_id).await.unwrap();
        assert!(stored.reminder_24h_sent);
        assert!(!stored.reminder_2h_sent);
    }

    #[tokio::test]
    async fn test_every_due_reminder_is_delivered_in_one_tick() {
        // 09:00 local on Monday
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 4, 0, 0).unwrap();
        let h = harness_at(now).await;
        add_executor(&h.db, 1, 0, 0.0).await;
        let assigned = place_order(&h.db, "2026-10-20", "9:00 - 12:00", 2000.0).await;
        let waiting = place_order(&h.db, "2026-10-20", "9:00 - 12:00", 2500.0).await;
        h.engine.accept_offer(assigned, 1).await.unwrap();
        h.sender.take();

        assert_eq!(h.engine.send_reminders().await.unwrap(), 2);
        let to_client = h.sender.sent_to(CLIENT);
        assert_eq!(to_client.len(), 2);
        assert!(to_client.iter().all(|n| n.text.contains("tomorrow")));

        for order_id in [assigned, waiting] {
            let stored = order::get_order(h.db.pool(), order_id).await.unwrap();
            assert!(stored.reminder_24h_sent);
        }
    }

    #[tokio::test]
    async fn test_unassigned_order_two_hours_out_alerts_admins() {
        let h = harness().await;
        let order_id = place_order(&h.db, "2026-10-19", "15:00 - 18:00", 2000.0).await;

        assert_eq!(h.engine.send_reminders().await.unwrap(), 1);
        let alerts = h.sender.sent_to(ADMIN);
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].text.contains(&format!("#{order_id}")));
        assert!(h.sender.sent_to(CLIENT).is_empty());
    }
}

// ============================================================================
// Lock contention
// ============================================================================

mod contention {
    use super::*;

    #[tokio::test]
    async fn test_decline_blocked_by_concurrent_writer_is_already_handled() {
        let path = std::env::temp_dir().join(format!("matching_contention_{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let db = Database::connect(&format!("sqlite:{}?mode=rwc", path.display()))
            .await
            .unwrap();
        db.migrate().await.unwrap();

        add_executor(&db, 1, 5, 0.0).await;
        add_executor(&db, 2, 1, 0.0).await;
        let engine = MatchingEngine::with_clock(
            db.clone(),
            Arc::new(RecordingSender::new()),
            EngineConfig::new(vec![ADMIN]),
            Arc::new(FixedClock::new(monday_afternoon())) as Arc<dyn Clock>,
        );
        let order_id = place_monday_order(&db).await;
        assert_eq!(offered_to(&engine.dispatch_new_order(order_id).await.unwrap()), 1);

        // Another connection holds the write lock, as the sweep would.
        let mut sweep_tx = db.begin().await.unwrap();
        sqlx::query("UPDATE users SET priority = priority WHERE id = 2")
            .execute(&mut *sweep_tx)
            .await
            .unwrap();

        let err = engine.decline_offer(order_id, 1).await.unwrap_err();
        assert!(err.is_already_handled(), "unexpected error: {err}");

        sweep_tx.rollback().await.unwrap();
        assert_eq!(active_executor(&db, order_id).await, Some(1));

        engine.decline_offer(order_id, 1).await.unwrap();
        assert_eq!(active_executor(&db, order_id).await, Some(2));

        db.close().await;
        let _ = std::fs::remove_file(&path);
    }
}

// ============================================================================
// Delivery failures
// ============================================================================

struct FailingSender;

#[async_trait]
impl NotificationSender for FailingSender {
    async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected {
            status: 502,
            message: "gateway unavailable".to_string(),
        })
    }
}

#[tokio::test]
async fn test_failed_delivery_keeps_committed_state() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();
    add_executor(&db, 1, 0, 0.0).await;
    let order_id = place_monday_order(&db).await;

    let engine = MatchingEngine::new(db.clone(), FailingSender, EngineConfig::new(vec![ADMIN]));
    let outcome = engine.dispatch_new_order(order_id).await.unwrap();

    assert_eq!(offered_to(&outcome), 1);
    assert_eq!(active_executor(&db, order_id).await, Some(1));
}
