//! DuckDB-backed training ledger for Cyra runs.

use duckdb::{Connection, params};
use thiserror::Error;
use tracing::debug;

use cyra_core::{GenerationRecord, LedgerError, RewardConfig, TrainingLedger};

/// Storage error wrapper.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("duckdb error: {0}")]
    DuckDb(#[from] duckdb::Error),
    #[error("reward config encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown training age {0}")]
    UnknownAge(i64),
    #[error("generation {0} does not fit the ledger schema")]
    Generation(i64),
}

impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnknownAge(age) => Self::UnknownAge(age),
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Append-only run history: one row per age, its reward parameters, and per-generation bests.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open (or create) a ledger database at `path`.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let mut storage = Self { conn };
        storage.initialize_schema()?;
        Ok(storage)
    }

    /// Ledger that lives only as long as the process.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let mut storage = Self { conn };
        storage.initialize_schema()?;
        Ok(storage)
    }

    fn initialize_schema(&mut self) -> Result<(), StorageError> {
        self.conn.execute(
            "create table if not exists runs (
                age bigint primary key,
                rewards text
            )",
            [],
        )?;
        self.conn.execute(
            "create table if not exists reward_params (
                age bigint,
                name text,
                value double,
                primary key (age, name)
            )",
            [],
        )?;
        self.conn.execute(
            "create table if not exists generations (
                age bigint,
                generation bigint,
                best_reward double
            )",
            [],
        )?;
        Ok(())
    }

    /// Allocate the next age and store `rewards` with it, in one transaction.
    pub fn begin_run(&mut self, rewards: &RewardConfig) -> Result<i64, StorageError> {
        let encoded = serde_json::to_string(rewards)?;
        let tx = self.conn.transaction()?;
        let age: i64 = tx.query_row(
            "select coalesce(max(age), 0) + 1 from runs",
            [],
            |row| row.get(0),
        )?;
        tx.execute(
            "insert into runs (age, rewards) values (?, ?)",
            params![age, encoded],
        )?;
        {
            let mut stmt =
                tx.prepare("insert into reward_params (age, name, value) values (?, ?, ?)")?;
            for (name, value) in rewards.magnitudes() {
                stmt.execute(params![age, name, f64::from(value)])?;
            }
        }
        tx.commit()?;
        debug!(age, "training run registered");
        Ok(age)
    }

    fn age_exists(&self, age: i64) -> Result<bool, StorageError> {
        let count: i64 = self.conn.query_row(
            "select count(*) from runs where age = ?",
            params![age],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn record_generation(&mut self, record: &GenerationRecord) -> Result<(), StorageError> {
        if !self.age_exists(record.age)? {
            return Err(StorageError::UnknownAge(record.age));
        }
        self.conn.execute(
            "insert into generations (age, generation, best_reward) values (?, ?, ?)",
            params![
                record.age,
                i64::from(record.generation),
                f64::from(record.best_reward)
            ],
        )?;
        Ok(())
    }

    /// Every generation row for `age`, in generation order.
    pub fn history(&self, age: i64) -> Result<Vec<GenerationRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "select generation, best_reward
             from generations
             where age = ?
             order by generation asc",
        )?;
        let mut rows = stmt.query(params![age])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(Self::record_from(age, row.get(0)?, row.get(1)?)?);
        }
        Ok(records)
    }

    pub fn last_record(&self, age: i64) -> Result<Option<GenerationRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "select generation, best_reward
             from generations
             where age = ?
             order by generation desc
             limit 1",
        )?;
        let mut rows = stmt.query(params![age])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::record_from(age, row.get(0)?, row.get(1)?)?)),
            None => Ok(None),
        }
    }

    pub fn reward_config(&self, age: i64) -> Result<Option<RewardConfig>, StorageError> {
        let mut stmt = self.conn.prepare("select rewards from runs where age = ?")?;
        let mut rows = stmt.query(params![age])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let encoded: String = row.get(0)?;
        Ok(Some(serde_json::from_str(&encoded)?))
    }

    /// Reward magnitudes stored for `age`, ordered by name.
    pub fn reward_params(&self, age: i64) -> Result<Vec<(String, f64)>, StorageError> {
        let mut stmt = self.conn.prepare(
            "select name, value
             from reward_params
             where age = ?
             order by name asc",
        )?;
        let mut rows = stmt.query(params![age])?;
        let mut params = Vec::new();
        while let Some(row) = rows.next()? {
            params.push((row.get(0)?, row.get(1)?));
        }
        Ok(params)
    }

    fn record_from(age: i64, generation: i64, best_reward: f64) -> Result<GenerationRecord, StorageError> {
        let generation = u32::try_from(generation).map_err(|_| StorageError::Generation(generation))?;
        Ok(GenerationRecord {
            age,
            generation,
            best_reward: best_reward as f32,
        })
    }
}

impl TrainingLedger for Storage {
    fn begin_run(&mut self, rewards: &RewardConfig) -> Result<i64, LedgerError> {
        Ok(Storage::begin_run(self, rewards)?)
    }

    fn record_generation(&mut self, record: &GenerationRecord) -> Result<(), LedgerError> {
        Ok(Storage::record_generation(self, record)?)
    }

    fn last_record(&mut self, age: i64) -> Result<Option<GenerationRecord>, LedgerError> {
        Ok(Storage::last_record(self, age)?)
    }

    fn reward_config(&mut self, age: i64) -> Result<Option<RewardConfig>, LedgerError> {
        Ok(Storage::reward_config(self, age)?)
    }
}
