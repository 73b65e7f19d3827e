//! Signal journal: where candidates and their outcomes are recorded.
//!
//! The journal is append-oriented: a record is created when a setup is
//! detected, then patched with typed partial updates as it is approved and
//! closed. History is returned newest first.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;

use crate::domain::{CandidateStatus, LogId};

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("journal encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("unknown journal record {0}")]
    UnknownRecord(LogId),
    #[error("journal lock poisoned")]
    Poisoned,
}

/// Fields known when a setup is first detected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSignalRecord {
    pub timestamp: NaiveDateTime,
    pub signal_type: String,
    pub status: CandidateStatus,
    pub strike: Option<f64>,
    pub detection_price: f64,
    pub signal_premium: f64,
}

/// Partial update; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CandidateStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub id: LogId,
    pub timestamp: NaiveDateTime,
    pub signal_type: String,
    pub status: CandidateStatus,
    pub strike: Option<f64>,
    pub detection_price: f64,
    pub signal_premium: f64,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub target: Option<f64>,
    pub result: Option<String>,
}

impl SignalRecord {
    pub fn new(id: LogId, rec: NewSignalRecord) -> Self {
        Self {
            id,
            timestamp: rec.timestamp,
            signal_type: rec.signal_type,
            status: rec.status,
            strike: rec.strike,
            detection_price: rec.detection_price,
            signal_premium: rec.signal_premium,
            entry_price: None,
            exit_price: None,
            stop_loss: None,
            target: None,
            result: None,
        }
    }

    pub fn apply(&mut self, update: &RecordUpdate) {
        if let Some(s) = update.status {
            self.status = s;
        }
        if let Some(v) = update.entry_price {
            self.entry_price = Some(v);
        }
        if let Some(v) = update.exit_price {
            self.exit_price = Some(v);
        }
        if let Some(v) = update.stop_loss {
            self.stop_loss = Some(v);
        }
        if let Some(v) = update.target {
            self.target = Some(v);
        }
        if let Some(r) = &update.result {
            self.result = Some(r.clone());
        }
    }
}

/// Newest first; ties broken by id so later records come first.
pub fn sort_newest_first(records: &mut [SignalRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
}

pub trait SignalSink: Send + Sync {
    fn record(&self, record: NewSignalRecord) -> Result<LogId, JournalError>;

    fn update(&self, id: LogId, update: &RecordUpdate) -> Result<(), JournalError>;

    fn history(&self) -> Result<Vec<SignalRecord>, JournalError>;
}

/// In-process journal.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    records: Mutex<Vec<SignalRecord>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalSink for MemoryJournal {
    fn record(&self, record: NewSignalRecord) -> Result<LogId, JournalError> {
        let mut records = self.records.lock().map_err(|_| JournalError::Poisoned)?;
        let id = LogId(records.len() as u64 + 1);
        records.push(SignalRecord::new(id, record));
        Ok(id)
    }

    fn update(&self, id: LogId, update: &RecordUpdate) -> Result<(), JournalError> {
        let mut records = self.records.lock().map_err(|_| JournalError::Poisoned)?;
        let rec = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(JournalError::UnknownRecord(id))?;
        rec.apply(update);
        Ok(())
    }

    fn history(&self) -> Result<Vec<SignalRecord>, JournalError> {
        let mut out = self
            .records
            .lock()
            .map_err(|_| JournalError::Poisoned)?
            .clone();
        sort_newest_first(&mut out);
        Ok(out)
    }
}
