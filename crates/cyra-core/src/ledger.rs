//! Training metrics ledger: the seam between the trainer and durable run history.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::reward::RewardConfig;

/// Errors reported by ledger backends.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger backend error: {0}")]
    Backend(String),
    #[error("unknown training age {0}")]
    UnknownAge(i64),
}

/// One row of generation history for a training age.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GenerationRecord {
    pub age: i64,
    pub generation: u32,
    pub best_reward: f32,
}

/// Append-only store of training runs ("ages") and their generation history.
pub trait TrainingLedger: Send {
    /// Allocate the next age and persist the reward hyper-parameters it runs with.
    fn begin_run(&mut self, rewards: &RewardConfig) -> Result<i64, LedgerError>;

    fn record_generation(&mut self, record: &GenerationRecord) -> Result<(), LedgerError>;

    /// Latest generation recorded for `age`, if any.
    fn last_record(&mut self, age: i64) -> Result<Option<GenerationRecord>, LedgerError>;

    /// Reward hyper-parameters stored for `age`, if the age exists.
    fn reward_config(&mut self, age: i64) -> Result<Option<RewardConfig>, LedgerError>;
}

/// In-memory ledger for tests and runs without a database.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    runs: BTreeMap<i64, RewardConfig>,
    records: Vec<GenerationRecord>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> &[GenerationRecord] {
        &self.records
    }
}

impl TrainingLedger for MemoryLedger {
    fn begin_run(&mut self, rewards: &RewardConfig) -> Result<i64, LedgerError> {
        let age = self.runs.keys().next_back().map_or(1, |last| last + 1);
        self.runs.insert(age, rewards.clone());
        Ok(age)
    }

    fn record_generation(&mut self, record: &GenerationRecord) -> Result<(), LedgerError> {
        if !self.runs.contains_key(&record.age) {
            return Err(LedgerError::UnknownAge(record.age));
        }
        self.records.push(*record);
        Ok(())
    }

    fn last_record(&mut self, age: i64) -> Result<Option<GenerationRecord>, LedgerError> {
        Ok(self
            .records
            .iter()
            .rev()
            .find(|record| record.age == age)
            .copied())
    }

    fn reward_config(&mut self, age: i64) -> Result<Option<RewardConfig>, LedgerError> {
        Ok(self.runs.get(&age).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ages_increase_and_records_append() {
        let mut ledger = MemoryLedger::new();
        let first = ledger.begin_run(&RewardConfig::default()).expect("begin");
        let second = ledger.begin_run(&RewardConfig::default()).expect("begin");
        assert_eq!((first, second), (1, 2));

        for generation in 0..3 {
            ledger
                .record_generation(&GenerationRecord {
                    age: first,
                    generation,
                    best_reward: generation as f32,
                })
                .expect("record");
        }
        let last = ledger.last_record(first).expect("query").expect("row");
        assert_eq!(last.generation, 2);
        assert_eq!(ledger.records().len(), 3);
        assert!(ledger.records().iter().all(|record| record.age == first));
        assert!(ledger.last_record(second).expect("query").is_none());
        assert!(matches!(
            ledger.record_generation(&GenerationRecord {
                age: 99,
                generation: 0,
                best_reward: 0.0,
            }),
            Err(LedgerError::UnknownAge(99))
        ));
    }
}
