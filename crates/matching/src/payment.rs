//! Executor payout computation.

use database::{Commission, CommissionType};

/// Executor payout for an order: total minus commission, floored at zero and
/// rounded to two decimals.
pub fn calculate_executor_payment(total_price: f64, commission: &Commission) -> f64 {
    if !total_price.is_finite() || total_price <= 0.0 {
        return 0.0;
    }

    let fee = match commission.commission_type {
        CommissionType::Percent => total_price * commission.commission_value / 100.0,
        CommissionType::Fixed => commission.commission_value,
    };
    let fee = if fee.is_finite() { fee.max(0.0) } else { 0.0 };

    let payout = (total_price - fee).max(0.0);
    (payout * 100.0).round() / 100.0
}
