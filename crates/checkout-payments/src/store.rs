//! Intent Status Cache
//!
//! Local, non-durable view of intent statuses observed through API reads and
//! webhooks. The processor stays the source of truth; this cache only
//! guarantees that a terminal status, once seen, is never regressed by a
//! late or out-of-order notification.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};
use crate::intent::IntentStatus;

/// Last observed status of one intent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRecord {
    pub intent_id: String,
    pub status: IntentStatus,
    pub updated_at: DateTime<Utc>,
}

/// What a `record` call did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusUpdate {
    /// First observation of this intent
    Inserted,
    /// Status moved to a new value
    Advanced { from: IntentStatus },
    /// Same status observed again
    Unchanged,
    /// Intent already terminal; the new status was dropped
    IgnoredTerminal { current: IntentStatus },
}

/// Intent status storage trait
pub trait IntentStore: Send + Sync {
    /// Record an observed status, applying the no-regression rule
    fn record(&self, intent_id: &str, status: IntentStatus) -> Result<StatusUpdate>;

    /// Get the last observed record
    fn get(&self, intent_id: &str) -> Result<Option<IntentRecord>>;
}

/// In-memory intent store, last-writer-wins per id until terminal
#[derive(Default)]
pub struct MemoryIntentStore {
    records: RwLock<HashMap<String, IntentRecord>>,
}

impl MemoryIntentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of intents tracked
    pub fn len(&self) -> usize {
        self.records.read().map_or(0, |r| r.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntentStore for MemoryIntentStore {
    fn record(&self, intent_id: &str, status: IntentStatus) -> Result<StatusUpdate> {
        let mut records = self
            .records
            .write()
            .map_err(|_| PaymentError::Storage("intent store lock poisoned".into()))?;

        let now = Utc::now();
        let existing = match records.entry(intent_id.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(IntentRecord {
                    intent_id: intent_id.to_string(),
                    status,
                    updated_at: now,
                });
                return Ok(StatusUpdate::Inserted);
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        if existing.status == status {
            return Ok(StatusUpdate::Unchanged);
        }
        if existing.status.is_terminal() {
            return Ok(StatusUpdate::IgnoredTerminal {
                current: existing.status,
            });
        }

        let from = existing.status;
        existing.status = status;
        existing.updated_at = now;
        Ok(StatusUpdate::Advanced { from })
    }

    fn get(&self, intent_id: &str) -> Result<Option<IntentRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| PaymentError::Storage("intent store lock poisoned".into()))?;
        Ok(records.get(intent_id).cloned())
    }
}
