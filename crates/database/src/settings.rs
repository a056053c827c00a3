//! Global admin-configured settings.

use chrono::{DateTime, Utc};
use sqlx::{Connection, Executor, Sqlite, SqliteConnection};

use crate::models::{Commission, CommissionType};
use crate::validation::validate_commission;
use crate::Result;

const COMMISSION_TYPE_KEY: &str = "commission_type";
const COMMISSION_VALUE_KEY: &str = "commission_value";

/// Load the commission rule. Missing or unreadable values fall back to the default.
pub async fn get_commission<'e, E>(executor: E) -> Result<Commission>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT key, value
        FROM settings
        WHERE key IN (?, ?)
        "#,
    )
    .bind(COMMISSION_TYPE_KEY)
    .bind(COMMISSION_VALUE_KEY)
    .fetch_all(executor)
    .await?;

    let mut commission = Commission::default();
    for (key, value) in rows {
        match key.as_str() {
            COMMISSION_TYPE_KEY => match value.parse::<CommissionType>() {
                Ok(kind) => commission.commission_type = kind,
                Err(e) => tracing::warn!("Ignoring stored commission type: {}", e),
            },
            COMMISSION_VALUE_KEY => match value.parse::<f64>() {
                Ok(amount) => commission.commission_value = amount,
                Err(e) => tracing::warn!("Ignoring stored commission value '{}': {}", value, e),
            },
            _ => {}
        }
    }

    Ok(commission)
}

/// Store the commission rule.
pub async fn set_commission(
    conn: &mut SqliteConnection,
    commission: &Commission,
    now: DateTime<Utc>,
) -> Result<()> {
    validate_commission(commission)?;

    let mut tx = conn.begin().await?;
    for (key, value) in [
        (COMMISSION_TYPE_KEY, commission.commission_type.to_string()),
        (COMMISSION_VALUE_KEY, commission.commission_value.to_string()),
    ] {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    tracing::info!(
        "Commission set to {} {}",
        commission.commission_type,
        commission.commission_value
    );
    Ok(())
}
