//! Customer blocking gate
//!
//! Checked once at order creation. A block matches when ANY populated
//! identity field on the block entry equals the corresponding incoming
//! field; expired entries never match.

use shared::models::{BlockVerdict, BlockedCustomer, BlockedCustomerCreate, IdentitySet};
use shared::util::now_millis;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::db::repository::{blocked_customer as repo, RepoError};

#[derive(Debug, Error)]
pub enum BlockingError {
    #[error("Block entry not found: {0}")]
    NotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct BlockingGate {
    pool: SqlitePool,
}

impl BlockingGate {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Match the incoming identity against active, unexpired blocks
    pub async fn check(&self, identity: &IdentitySet) -> Result<BlockVerdict, BlockingError> {
        let hit = repo::find_match(&self.pool, identity, now_millis()).await?;
        match hit {
            Some(entry) => {
                info!(block_id = entry.id, reason = %entry.reason, "Blocked customer matched");
                Ok(BlockVerdict {
                    blocked: true,
                    message: entry.message.clone(),
                })
            }
            None => Ok(BlockVerdict::clear()),
        }
    }

    pub async fn block(
        &self,
        create: BlockedCustomerCreate,
        created_by: Option<i64>,
    ) -> Result<BlockedCustomer, BlockingError> {
        if !create.has_identity() {
            return Err(BlockingError::Validation(
                "at least one identity field is required".into(),
            ));
        }
        if create.reason.trim().is_empty() {
            return Err(BlockingError::Validation("reason is required".into()));
        }
        let entry = repo::create(&self.pool, &create, created_by).await?;
        info!(block_id = entry.id, reason = %entry.reason, "Customer blocked");
        Ok(entry)
    }

    /// Deactivate a block. Idempotent: unblocking an already-inactive
    /// entry succeeds; only an unknown id is an error.
    pub async fn unblock(&self, id: i64) -> Result<(), BlockingError> {
        if repo::deactivate(&self.pool, id).await? {
            info!(block_id = id, "Customer unblocked");
            return Ok(());
        }
        match repo::find_by_id(&self.pool, id).await? {
            Some(_) => Ok(()),
            None => Err(BlockingError::NotFound(id)),
        }
    }

    pub async fn list(&self) -> Result<Vec<BlockedCustomer>, BlockingError> {
        Ok(repo::list(&self.pool).await?)
    }
}
