//! Durable spending ledger backed by SQLite.
//!
//! Two tables live in the agent database:
//!
//! - `spending`: one append-only row per completed auto-payment
//! - `agent_state`: key/value pairs holding `total_spent` and `max_spend`
//!
//! A payment row and the `total_spent` update are written in one SQLite
//! transaction. On startup the counter is recomputed from the rows, so the
//! ledger is the record of truth.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

const TOTAL_SPENT_KEY: &str = "total_spent";
const MAX_SPEND_KEY: &str = "max_spend";

/// Errors from the ledger database.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// SQLite failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored amount is not a base-unit integer.
    #[error("corrupt amount {value:?} in {location}")]
    CorruptAmount {
        /// Table and key or row the value came from.
        location: String,
        /// The stored text.
        value: String,
    },

    /// The spend counter would overflow.
    #[error("spend counter overflow")]
    Overflow,

    /// A thread panicked while holding the connection.
    #[error("database lock poisoned")]
    Poisoned,
}

/// A row of the `spending` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingEntry {
    /// Row id, increasing with insertion order.
    pub id: i64,
    /// URL of the paid resource.
    pub url: String,
    /// Amount paid, base units as a decimal string.
    pub amount: String,
    /// Network the payment settled on (`family:chain`).
    pub network: String,
    /// Settlement digest. Empty when the server sent none.
    pub digest: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

/// A payment to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment<'a> {
    /// URL of the paid resource.
    pub url: &'a str,
    /// Amount paid in base units.
    pub amount: u128,
    /// Network the payment settled on.
    pub network: &'a str,
    /// Settlement digest, possibly empty.
    pub digest: &'a str,
}

/// Spend counters as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendCounters {
    /// Sum of every ledger row.
    pub total_spent: u128,
    /// Spend ceiling.
    pub max_spend: u128,
}

/// SQLite-backed spending ledger.
#[derive(Debug)]
pub struct Ledger {
    conn: Mutex<Connection>,
}

impl Ledger {
    /// Opens (or creates) the ledger at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    /// Opens a private in-memory ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, LedgerError> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS spending (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                url       TEXT NOT NULL,
                amount    TEXT NOT NULL,
                network   TEXT NOT NULL,
                digest    TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_spending_ts ON spending(timestamp);
            CREATE TABLE IF NOT EXISTS agent_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn.lock().map_err(|_| LedgerError::Poisoned)
    }

    /// Recomputes `total_spent` from the rows and loads `max_spend`.
    ///
    /// `default_max_spend` is used and persisted when no ceiling has been
    /// stored yet. The recomputed counter is written back.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] on database failure or a corrupt stored
    /// amount.
    pub fn reconcile(&self, default_max_spend: u128) -> Result<SpendCounters, LedgerError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut total_spent: u128 = 0;
        {
            let mut stmt = tx.prepare("SELECT id, amount FROM spending")?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
            for row in rows {
                let (id, amount) = row?;
                let amount = parse_amount(&amount, || format!("spending row {id}"))?;
                total_spent = total_spent.checked_add(amount).ok_or(LedgerError::Overflow)?;
            }
        }

        let stored = read_value(&tx, TOTAL_SPENT_KEY)?;
        if let Some(stored) = stored.filter(|s| *s != total_spent.to_string()) {
            tracing::warn!(stored = %stored, recomputed = %total_spent, "Spend counter reconciled from ledger");
        }

        let max_spend = match read_value(&tx, MAX_SPEND_KEY)? {
            Some(value) => parse_amount(&value, || format!("agent_state {MAX_SPEND_KEY}"))?,
            None => default_max_spend,
        };

        write_value(&tx, TOTAL_SPENT_KEY, total_spent)?;
        write_value(&tx, MAX_SPEND_KEY, max_spend)?;
        tx.commit()?;

        Ok(SpendCounters {
            total_spent,
            max_spend,
        })
    }

    /// Appends `payment` and adds its amount to `total_spent`, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the transaction fails. Nothing is written
    /// in that case.
    pub fn record_payment(&self, payment: &NewPayment<'_>) -> Result<SpendingEntry, LedgerError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let timestamp = chrono::Utc::now().timestamp_millis();
        let amount = payment.amount.to_string();

        tx.execute(
            "INSERT INTO spending (url, amount, network, digest, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![payment.url, amount, payment.network, payment.digest, timestamp],
        )?;
        let id = tx.last_insert_rowid();

        let total_spent = match read_value(&tx, TOTAL_SPENT_KEY)? {
            Some(value) => parse_amount(&value, || format!("agent_state {TOTAL_SPENT_KEY}"))?,
            None => 0,
        };
        let total_spent = total_spent
            .checked_add(payment.amount)
            .ok_or(LedgerError::Overflow)?;
        write_value(&tx, TOTAL_SPENT_KEY, total_spent)?;
        tx.commit()?;

        Ok(SpendingEntry {
            id,
            url: payment.url.to_owned(),
            amount,
            network: payment.network.to_owned(),
            digest: payment.digest.to_owned(),
            timestamp,
        })
    }

    /// Persists a new spend ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] on write failure.
    pub fn set_max_spend(&self, max_spend: u128) -> Result<(), LedgerError> {
        let conn = self.lock()?;
        write_value(&conn, MAX_SPEND_KEY, max_spend)
    }

    /// Returns a page of rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] on read failure.
    pub fn list(&self, limit: u32, offset: u32) -> Result<Vec<SpendingEntry>, LedgerError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, url, amount, network, digest, timestamp
            FROM spending
            ORDER BY timestamp DESC, id DESC
            LIMIT ?1 OFFSET ?2
            ",
        )?;
        let rows = stmt.query_map(params![limit, offset], |row| {
            Ok(SpendingEntry {
                id: row.get(0)?,
                url: row.get(1)?,
                amount: row.get(2)?,
                network: row.get(3)?,
                digest: row.get(4)?,
                timestamp: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Returns the number of rows.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] on read failure.
    pub fn count(&self) -> Result<u64, LedgerError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM spending", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

fn parse_amount(value: &str, location: impl FnOnce() -> String) -> Result<u128, LedgerError> {
    value.parse().map_err(|_| LedgerError::CorruptAmount {
        location: location(),
        value: value.to_owned(),
    })
}

fn read_value(conn: &Connection, key: &str) -> Result<Option<String>, LedgerError> {
    Ok(conn
        .query_row(
            "SELECT value FROM agent_state WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?)
}

fn write_value(conn: &Connection, key: &str, value: u128) -> Result<(), LedgerError> {
    conn.execute(
        "INSERT INTO agent_state (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value.to_string()],
    )?;
    Ok(())
}
