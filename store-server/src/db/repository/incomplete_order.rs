//! Incomplete Order Repository

use super::{RepoError, RepoResult};
use shared::models::{IncompleteOrder, IncompleteOrderStatus};
use sqlx::{SqliteConnection, SqlitePool};

#[allow(clippy::too_many_arguments)]
pub async fn create(
    pool: &SqlitePool,
    customer_name: &str,
    customer_email: Option<&str>,
    customer_phone: Option<&str>,
    shipping_address: Option<&str>,
    items_json: &str,
    subtotal: f64,
    shipping_fee: f64,
    total: f64,
) -> RepoResult<IncompleteOrder> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO incomplete_orders (id, customer_name, customer_email, customer_phone, shipping_address, items_json, subtotal, shipping_fee, total, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'OPEN', ?10, ?10)",
    )
    .bind(id)
    .bind(customer_name)
    .bind(customer_email)
    .bind(customer_phone)
    .bind(shipping_address)
    .bind(items_json)
    .bind(subtotal)
    .bind(shipping_fee)
    .bind(total)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create incomplete order".into()))
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<IncompleteOrder>> {
    let row = sqlx::query_as::<_, IncompleteOrder>("SELECT * FROM incomplete_orders WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn list(
    pool: &SqlitePool,
    status: Option<IncompleteOrderStatus>,
) -> RepoResult<Vec<IncompleteOrder>> {
    let rows = match status {
        Some(s) => {
            sqlx::query_as::<_, IncompleteOrder>(
                "SELECT * FROM incomplete_orders WHERE status = ? ORDER BY created_at DESC",
            )
            .bind(s)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, IncompleteOrder>(
                "SELECT * FROM incomplete_orders ORDER BY created_at DESC",
            )
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}

/// Mark the record converted and link the resulting order.
///
/// Guarded by `status = 'OPEN'` — returns rows affected so the caller
/// can roll the surrounding transaction back when the record was
/// already converted or abandoned.
pub async fn mark_converted(
    conn: &mut SqliteConnection,
    id: i64,
    order_id: i64,
    now: i64,
) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE incomplete_orders SET status = 'CONVERTED', converted_order_id = ?1, updated_at = ?2 \
         WHERE id = ?3 AND status = 'OPEN'",
    )
    .bind(order_id)
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Mark an open record abandoned
pub async fn mark_abandoned(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let result = sqlx::query(
        "UPDATE incomplete_orders SET status = 'ABANDONED', updated_at = ?1 WHERE id = ?2 AND status = 'OPEN'",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
