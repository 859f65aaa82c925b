//! Blocked Customer Repository

use super::{RepoError, RepoResult};
use shared::models::{BlockedCustomer, BlockedCustomerCreate, IdentitySet};
use sqlx::SqlitePool;

pub async fn create(
    pool: &SqlitePool,
    data: &BlockedCustomerCreate,
    created_by: Option<i64>,
) -> RepoResult<BlockedCustomer> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO blocked_customers (id, email, phone, device_id, ip_address, reason, message, expires_at, is_active, created_by, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?10, ?10)",
    )
    .bind(id)
    .bind(&data.email)
    .bind(&data.phone)
    .bind(&data.device_id)
    .bind(&data.ip_address)
    .bind(&data.reason)
    .bind(&data.message)
    .bind(data.expires_at)
    .bind(created_by)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create block".into()))
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<BlockedCustomer>> {
    let row = sqlx::query_as::<_, BlockedCustomer>("SELECT * FROM blocked_customers WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn list(pool: &SqlitePool) -> RepoResult<Vec<BlockedCustomer>> {
    let rows = sqlx::query_as::<_, BlockedCustomer>(
        "SELECT * FROM blocked_customers WHERE is_active = 1 ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Find the first active, non-expired block matching ANY populated
/// identity field of the query set. NULL block fields never match.
pub async fn find_match(
    pool: &SqlitePool,
    identity: &IdentitySet,
    now: i64,
) -> RepoResult<Option<BlockedCustomer>> {
    let row = sqlx::query_as::<_, BlockedCustomer>(
        "SELECT * FROM blocked_customers \
         WHERE is_active = 1 \
           AND (expires_at IS NULL OR expires_at > ?1) \
           AND ( (email IS NOT NULL AND email = ?2) \
              OR (phone IS NOT NULL AND phone = ?3) \
              OR (device_id IS NOT NULL AND device_id = ?4) \
              OR (ip_address IS NOT NULL AND ip_address = ?5) ) \
         LIMIT 1",
    )
    .bind(now)
    .bind(&identity.email)
    .bind(&identity.phone)
    .bind(&identity.device_id)
    .bind(&identity.ip_address)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Deactivate a block (unblock). Returns whether a row was flipped;
/// false means the entry was missing or already inactive.
pub async fn deactivate(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let result = sqlx::query(
        "UPDATE blocked_customers SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
