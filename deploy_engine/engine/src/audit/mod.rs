
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use tracing::info;

/// Pipeline stage an audit record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventType {
    Decode,
    Derive,
    Sign,
    Submit,
    Finalize,
    Teardown,
    Error,
}

/// Record of one deployment pipeline event. Never carries key material.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub event_type: AuditEventType,
    pub tx_hash: Option<String>,
    pub message: String,
    pub timestamp: String, // RFC3339
}

/// In-memory audit tracker, one per pipeline invocation
#[derive(Debug)]
pub struct AuditTracker {
    records: Mutex<VecDeque<AuditRecord>>,
    max_entries: usize,
}

impl AuditTracker {
    pub fn new(max_entries: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(max_entries)),
            max_entries,
        }
    }

    /// Record a new event in the audit log
    pub fn log(&self, record: AuditRecord) {
        info!(
            target: "audit",
            event = record.event_type_label(),
            tx_hash = record.tx_hash.as_deref().unwrap_or("-"),
            "{}",
            record.message
        );
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if self.max_entries == 0 {
            return;
        }
        if records.len() == self.max_entries {
            records.pop_front(); // evict oldest
        }
        records.push_back(record);
    }

    /// Shorthand for a record stamped with the current time.
    pub fn event(&self, event_type: AuditEventType, tx_hash: Option<&str>, message: impl Into<String>) {
        self.log(AuditRecord {
            event_type,
            tx_hash: tx_hash.map(str::to_string),
            message: message.into(),
            timestamp: now_rfc3339(),
        });
    }

    /// Most recent first.
    pub fn recent(&self, count: usize) -> Vec<AuditRecord> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.iter().rev().take(count).cloned().collect()
    }

    /// All retained records, oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.iter().cloned().collect()
    }
}

impl Default for AuditTracker {
    fn default() -> Self {
        AuditTracker::new(64)
    }
}

impl AuditRecord {
    pub fn event_type_label(&self) -> &'static str {
        match self.event_type {
            AuditEventType::Decode => "DECODE",
            AuditEventType::Derive => "DERIVE",
            AuditEventType::Sign => "SIGN",
            AuditEventType::Submit => "SUBMIT",
            AuditEventType::Finalize => "FINALIZE",
            AuditEventType::Teardown => "TEARDOWN",
            AuditEventType::Error => "ERROR",
        }
    }
}

/// Helper to get current timestamp as RFC3339 string
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
