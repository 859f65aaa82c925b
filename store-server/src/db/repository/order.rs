//! Order Repository
//!
//! Inserts and reads for orders, items and the two append-only history
//! tables. Status columns are only ever written through the guarded
//! updates (version check) — the ledger is the sole caller.

use super::RepoResult;
use shared::models::{Order, OrderItem, OrderItemDraft, StatusHistoryEntry};
use shared::order::{OrderStatus, PaymentStatus};
use sqlx::{SqliteConnection, SqlitePool};

/// Insert the order row. Totals are computed by the caller; status
/// columns start at their defaults (PENDING/PENDING).
#[allow(clippy::too_many_arguments)]
pub async fn insert_order(
    conn: &mut SqliteConnection,
    draft: &shared::models::OrderDraft,
    subtotal: f64,
    total: f64,
    now: i64,
) -> RepoResult<i64> {
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO orders (id, order_number, customer_name, customer_email, customer_phone, shipping_address, subtotal, shipping_fee, total, status, payment_status, payment_method, order_source, note, version, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'PENDING', 'PENDING', ?10, ?11, ?12, 0, ?13, ?13)",
    )
    .bind(id)
    .bind(&draft.order_number)
    .bind(&draft.customer_name)
    .bind(&draft.customer_email)
    .bind(&draft.customer_phone)
    .bind(&draft.shipping_address)
    .bind(subtotal)
    .bind(draft.shipping_fee)
    .bind(total)
    .bind(draft.payment_method)
    .bind(draft.order_source)
    .bind(&draft.note)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(id)
}

/// Insert the item snapshots for a new order
pub async fn insert_items(
    conn: &mut SqliteConnection,
    order_id: i64,
    items: &[OrderItemDraft],
    now: i64,
) -> RepoResult<()> {
    for item in items {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, name, unit_price, quantity, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(shared::util::snowflake_id())
        .bind(order_id)
        .bind(item.product_id)
        .bind(&item.name)
        .bind(item.unit_price)
        .bind(item.quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let row = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Read the order inside a caller-owned transaction (fresh read for the
/// optimistic-lock cycle)
pub async fn find_by_id_conn(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Order>> {
    let row = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn find_by_number(pool: &SqlitePool, number: &str) -> RepoResult<Option<Order>> {
    let row = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_number = ?")
        .bind(number)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_items(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderItem>> {
    let rows = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_items_conn(
    conn: &mut SqliteConnection,
    order_id: i64,
) -> RepoResult<Vec<OrderItem>> {
    let rows = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> RepoResult<Vec<Order>> {
    let rows =
        sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;
    Ok(rows)
}

/// Guarded fulfillment-status write. Returns rows affected: 0 means the
/// version moved under us (concurrent writer).
pub async fn update_status_guarded(
    conn: &mut SqliteConnection,
    order_id: i64,
    new_status: OrderStatus,
    expected_version: i64,
    now: i64,
) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE orders SET status = ?1, version = version + 1, updated_at = ?2 \
         WHERE id = ?3 AND version = ?4",
    )
    .bind(new_status)
    .bind(now)
    .bind(order_id)
    .bind(expected_version)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Guarded payment-status write, same contract as [`update_status_guarded`]
pub async fn update_payment_status_guarded(
    conn: &mut SqliteConnection,
    order_id: i64,
    new_status: PaymentStatus,
    expected_version: i64,
    now: i64,
) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE orders SET payment_status = ?1, version = version + 1, updated_at = ?2 \
         WHERE id = ?3 AND version = ?4",
    )
    .bind(new_status)
    .bind(now)
    .bind(order_id)
    .bind(expected_version)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Record the linkage nonce (and provider reference once known) written
/// at payment initiation
pub async fn set_payment_initiation(
    pool: &SqlitePool,
    order_id: i64,
    nonce: &str,
    payment_ref: Option<&str>,
    now: i64,
) -> RepoResult<()> {
    sqlx::query(
        "UPDATE orders SET payment_nonce = ?1, payment_ref = COALESCE(?2, payment_ref), updated_at = ?3 WHERE id = ?4",
    )
    .bind(nonce)
    .bind(payment_ref)
    .bind(now)
    .bind(order_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Record the provider transaction id after verification
pub async fn set_payment_ref(
    conn: &mut SqliteConnection,
    order_id: i64,
    payment_ref: &str,
    now: i64,
) -> RepoResult<()> {
    sqlx::query("UPDATE orders SET payment_ref = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(payment_ref)
        .bind(now)
        .bind(order_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Quantity correction for a single item (pre-shipment only, enforced by
/// the ledger)
pub async fn update_item_quantity(
    conn: &mut SqliteConnection,
    order_id: i64,
    item_id: i64,
    quantity: i64,
) -> RepoResult<u64> {
    let result =
        sqlx::query("UPDATE order_items SET quantity = ?1 WHERE id = ?2 AND order_id = ?3")
            .bind(quantity)
            .bind(item_id)
            .bind(order_id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected())
}

/// Guarded totals rewrite, used after an item correction
pub async fn update_totals_guarded(
    conn: &mut SqliteConnection,
    order_id: i64,
    subtotal: f64,
    total: f64,
    expected_version: i64,
    now: i64,
) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE orders SET subtotal = ?1, total = ?2, version = version + 1, updated_at = ?3 \
         WHERE id = ?4 AND version = ?5",
    )
    .bind(subtotal)
    .bind(total)
    .bind(now)
    .bind(order_id)
    .bind(expected_version)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

// ========== History ==========

#[allow(clippy::too_many_arguments)]
pub async fn insert_fulfillment_history(
    conn: &mut SqliteConnection,
    order_id: i64,
    old_value: Option<&str>,
    new_value: &str,
    operator_id: Option<i64>,
    operator_name: Option<&str>,
    note: Option<&str>,
    now: i64,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO order_status_history (id, order_id, old_value, new_value, operator_id, operator_name, note, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(shared::util::snowflake_id())
    .bind(order_id)
    .bind(old_value)
    .bind(new_value)
    .bind(operator_id)
    .bind(operator_name)
    .bind(note)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_payment_history(
    conn: &mut SqliteConnection,
    order_id: i64,
    old_value: Option<&str>,
    new_value: &str,
    operator_id: Option<i64>,
    operator_name: Option<&str>,
    note: Option<&str>,
    now: i64,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO payment_status_history (id, order_id, old_value, new_value, operator_id, operator_name, note, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(shared::util::snowflake_id())
    .bind(order_id)
    .bind(old_value)
    .bind(new_value)
    .bind(operator_id)
    .bind(operator_name)
    .bind(note)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fulfillment_history(
    pool: &SqlitePool,
    order_id: i64,
) -> RepoResult<Vec<StatusHistoryEntry>> {
    let rows = sqlx::query_as::<_, StatusHistoryEntry>(
        "SELECT * FROM order_status_history WHERE order_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn payment_history(
    pool: &SqlitePool,
    order_id: i64,
) -> RepoResult<Vec<StatusHistoryEntry>> {
    let rows = sqlx::query_as::<_, StatusHistoryEntry>(
        "SELECT * FROM payment_status_history WHERE order_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
