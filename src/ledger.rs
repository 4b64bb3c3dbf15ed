//! # Ledger — Sent-Mail Record on SQLite
//!
//! Durable record of which shows already got their reminder, so a show is
//! never mailed twice across runs. One table, keyed by show id:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS TicketHolderMailSent(ShowID INTEGER PRIMARY KEY)
//! ```
//!
//! Rows are inserted once, right after a mail is submitted, and never
//! updated or deleted. The pool holds a single connection: a run is the only
//! writer and touches the ledger strictly sequentially.

use crate::error::MailError;
use crate::show::ShowId;
use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS TicketHolderMailSent(ShowID INTEGER PRIMARY KEY)";
const INSERT: &str = "INSERT INTO TicketHolderMailSent (ShowID) VALUES (?1)";
const SELECT_ONE: &str = "SELECT ShowID FROM TicketHolderMailSent WHERE ShowID = ?1";
const SELECT_ALL: &str = "SELECT ShowID FROM TicketHolderMailSent ORDER BY ShowID";

/// SQLite extended result codes for UNIQUE and PRIMARY KEY constraint failures.
const DUPLICATE_KEY_CODES: [&str; 2] = ["2067", "1555"];

pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Open (creating if missing) the ledger database file.
    pub async fn open(path: &Path) -> Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .with_context(|| format!("opening ledger at {}", path.display()))?;
        Ok(Ledger { pool })
    }

    /// Create the table if it does not exist yet. Safe to call on every run.
    pub async fn ensure_schema(&self) -> Result<()> {
        debug!(sql = CREATE_TABLE, "ledger query");
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        info!("ledger tables up and running");
        Ok(())
    }

    /// Point lookup; an unknown id is simply `false`.
    pub async fn has_been_mailed(&self, id: ShowId) -> Result<bool> {
        debug!(sql = SELECT_ONE, show_id = %id, "ledger query");
        let row = sqlx::query_scalar::<_, i64>(SELECT_ONE)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Record that `id` was mailed.
    ///
    /// Fails with [`MailError::ConstraintViolation`] if it already was; the
    /// caller is expected to have checked [`has_been_mailed`](Self::has_been_mailed).
    pub async fn mark_mailed(&self, id: ShowId) -> Result<()> {
        debug!(sql = INSERT, show_id = %id, "ledger query");
        match sqlx::query(INSERT).bind(id.0).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                Err(MailError::ConstraintViolation { show_id: id.0 }.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every recorded id, ascending.
    pub async fn mailed_ids(&self) -> Result<Vec<ShowId>> {
        debug!(sql = SELECT_ALL, "ledger query");
        let ids = sqlx::query_scalar::<_, i64>(SELECT_ALL)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(ShowId).collect())
    }

    /// Close the pool, waiting for the connection to be released.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn is_duplicate_key(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation()
                || db_err
                    .code()
                    .is_some_and(|code| DUPLICATE_KEY_CODES.contains(&&*code))
        }
        _ => false,
    }
}
