//! JSON-lines signal journal.
//!
//! Append-only event log: one `record` line when a setup is detected, one
//! `update` line per later change. History replays the events, so the file
//! is never rewritten and a torn last line loses at most one event.
//! Malformed lines are skipped on read.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use greekwatch_core::domain::LogId;
use greekwatch_core::journal::{
    sort_newest_first, JournalError, NewSignalRecord, RecordUpdate, SignalRecord, SignalSink,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JournalEvent {
    Record { id: LogId, record: NewSignalRecord },
    Update { id: LogId, update: RecordUpdate },
}

#[derive(Debug)]
pub struct JsonlJournal {
    path: PathBuf,
    /// Next id to hand out; the lock also serialises appends.
    next_id: Mutex<u64>,
}

impl JsonlJournal {
    /// Open (or lazily create) the journal at `path`, continuing its ids.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, JournalError> {
        let path = path.into();
        let last = read_events(&path)?
            .iter()
            .map(|e| match e {
                JournalEvent::Record { id, .. } | JournalEvent::Update { id, .. } => id.0,
            })
            .max()
            .unwrap_or(0);
        Ok(Self {
            path,
            next_id: Mutex::new(last + 1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, event: &JournalEvent) -> Result<(), JournalError> {
        let json = serde_json::to_string(event)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()?;
        Ok(())
    }
}

fn read_events(path: &Path) -> Result<Vec<JournalEvent>, JournalError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut events = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(event) = serde_json::from_str::<JournalEvent>(&line) {
            events.push(event);
        }
    }
    Ok(events)
}

impl SignalSink for JsonlJournal {
    fn record(&self, record: NewSignalRecord) -> Result<LogId, JournalError> {
        let mut next = self.next_id.lock().map_err(|_| JournalError::Poisoned)?;
        let id = LogId(*next);
        self.append(&JournalEvent::Record { id, record })?;
        *next += 1;
        Ok(id)
    }

    fn update(&self, id: LogId, update: &RecordUpdate) -> Result<(), JournalError> {
        let next = self.next_id.lock().map_err(|_| JournalError::Poisoned)?;
        if id.0 == 0 || id.0 >= *next {
            return Err(JournalError::UnknownRecord(id));
        }
        self.append(&JournalEvent::Update {
            id,
            update: update.clone(),
        })
    }

    fn history(&self) -> Result<Vec<SignalRecord>, JournalError> {
        let _guard = self.next_id.lock().map_err(|_| JournalError::Poisoned)?;
        let mut records: BTreeMap<LogId, SignalRecord> = BTreeMap::new();
        for event in read_events(&self.path)? {
            match event {
                JournalEvent::Record { id, record } => {
                    records.insert(id, SignalRecord::new(id, record));
                }
                JournalEvent::Update { id, update } => {
                    if let Some(rec) = records.get_mut(&id) {
                        rec.apply(&update);
                    }
                }
            }
        }
        let mut out: Vec<SignalRecord> = records.into_values().collect();
        sort_newest_first(&mut out);
        Ok(out)
    }
}
