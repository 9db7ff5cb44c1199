//! PostgreSQL transactor.

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use catalog_domain::{TransactionError, Transactor, TxSession};

/// Opens units of work against a connection pool.
#[derive(Debug, Clone)]
pub struct PgTransactor {
    pool: PgPool,
}

impl PgTransactor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Transactor for PgTransactor {
    async fn begin(&self) -> Result<TxSession, TransactionError> {
        let tx = self.pool.begin().await?;
        Ok(TxSession::active(tx))
    }
}
