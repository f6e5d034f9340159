//! Durable event store and sync watermark, backed by redb.
//!
//! # Table design
//!
//! The `events` table uses a 17-byte composite key:
//! ```text
//! [ external_id: 8 bytes | event_time_ms: 8 bytes | status_code: u8 ]
//! ```
//!
//! Both i64 fields are stored big-endian with the sign bit flipped, so byte
//! order equals signed (application, time) order even for negative ids or
//! pre-epoch timestamps. A plain iteration yields every application's
//! events oldest-first with no post-sorting. The status-code byte is the deterministic tie-break for two
//! events sharing a timestamp. The key is also the deduplication identity:
//! inserting an already-seen `(application, time, status)` triple is a no-op,
//! and a retried event structurally reuses its existing record.
//!
//! The `watermark` table holds the single `last_synced_at` cursor.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use redb::{Database, ReadableTable, TableDefinition};

use crate::error::{Result, SyncError};
use crate::event::{ApplicationHistory, EventRecord};
use crate::types::{ApplicationStatus, EventState};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

/// Key: 17-byte composite (external_id ++ event_time_ms ++ status code)
/// Value: JSON-encoded EventRecord
const EVENTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("events");

/// Single-row cursor: "last_synced_at" -> ms since epoch
const WATERMARK: TableDefinition<&str, u64> = TableDefinition::new("watermark");

const WATERMARK_KEY: &str = "last_synced_at";

// ---------------------------------------------------------------------------
// Key helpers
// ---------------------------------------------------------------------------

/// Map an i64 to a u64 whose big-endian byte order equals signed order.
/// Keeps degenerate inputs (negative ids, pre-epoch times) distinct and
/// correctly ordered instead of clamping them onto one key.
fn order_preserving(v: i64) -> u64 {
    (v as u64) ^ (1 << 63)
}

fn event_key(external_id: i64, event_time: DateTime<Utc>, status: ApplicationStatus) -> [u8; 17] {
    let mut key = [0u8; 17];
    key[..8].copy_from_slice(&order_preserving(external_id).to_be_bytes());
    key[8..16].copy_from_slice(&order_preserving(event_time.timestamp_millis()).to_be_bytes());
    key[16] = status.code();
    key
}

fn record_key(record: &EventRecord) -> [u8; 17] {
    event_key(
        record.application_external_id,
        record.event_time,
        record.new_status,
    )
}

// ---------------------------------------------------------------------------
// EventDb
// ---------------------------------------------------------------------------

/// Persistent store for status-event records and the sync watermark.
///
/// Single-writer discipline: only one `handle_updates` run may be active at
/// a time. The watermark and the one-Failed-slot invariant are not safe
/// under concurrent writers.
pub struct EventDb {
    db: Database,
}

impl EventDb {
    /// Open or create the redb database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(|e| SyncError::EventStore(e.to_string()))?;
        // Ensure both tables exist before any reads
        let wt = db
            .begin_write()
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        wt.open_table(EVENTS)
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        wt.open_table(WATERMARK)
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        wt.commit()
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        Ok(Self { db })
    }

    /// Insert every event of every history as `Pending`, skipping events
    /// whose identity key already exists in any state. Returns the number
    /// of records actually inserted.
    pub fn upsert_new(&self, histories: &[ApplicationHistory]) -> Result<usize> {
        let wt = self
            .db
            .begin_write()
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        let mut inserted = 0usize;
        {
            let mut table = wt
                .open_table(EVENTS)
                .map_err(|e| SyncError::EventStore(e.to_string()))?;
            for history in histories {
                for event in &history.events {
                    let key = event_key(
                        history.application_external_id,
                        event.event_time,
                        event.new_status,
                    );
                    let exists = table
                        .get(key.as_slice())
                        .map_err(|e| SyncError::EventStore(e.to_string()))?
                        .is_some();
                    if exists {
                        continue;
                    }
                    let record = EventRecord::new(history.application_external_id, event);
                    let value = serde_json::to_vec(&record)?;
                    table
                        .insert(key.as_slice(), value.as_slice())
                        .map_err(|e| SyncError::EventStore(e.to_string()))?;
                    inserted += 1;
                }
            }
        }
        wt.commit()
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        Ok(inserted)
    }

    /// All `Pending` and `Failed` records, grouped per application and
    /// ascending by event time within each group (key order).
    pub fn pending_and_failed_grouped(&self) -> Result<BTreeMap<i64, Vec<EventRecord>>> {
        let mut groups: BTreeMap<i64, Vec<EventRecord>> = BTreeMap::new();
        for record in self.scan()? {
            if record.state != EventState::Processed {
                groups
                    .entry(record.application_external_id)
                    .or_default()
                    .push(record);
            }
        }
        Ok(groups)
    }

    /// All records currently in the `Failed` state (Phase B input).
    pub fn failed_records(&self) -> Result<Vec<EventRecord>> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|r| r.state == EventState::Failed)
            .collect())
    }

    /// Mark one record `Processed`, stamping `processed_at` and clearing
    /// any earlier error detail.
    pub fn mark_processed(&self, record: &EventRecord) -> Result<()> {
        let mut updated = record.clone();
        updated.state = EventState::Processed;
        updated.processed_at = Some(Utc::now());
        updated.error_detail = None;
        self.put(&updated)
    }

    /// Mark one record `Failed`, overwriting the error detail in place and
    /// bumping the retry count.
    ///
    /// Any *other* `Failed` record of the same application is demoted back
    /// to `Pending`: Phase B can re-derive an earlier event that then fails
    /// while a later event was already in the failed slot, and the
    /// application must never hold two.
    pub fn mark_failed(&self, record: &EventRecord, error_detail: &str) -> Result<()> {
        let key = record_key(record);
        let demote: Vec<EventRecord> = self
            .scan()?
            .into_iter()
            .filter(|r| {
                r.application_external_id == record.application_external_id
                    && r.state == EventState::Failed
                    && record_key(r) != key
            })
            .collect();
        for mut other in demote {
            other.state = EventState::Pending;
            other.error_detail = None;
            self.put(&other)?;
        }

        let mut updated = record.clone();
        updated.state = EventState::Failed;
        updated.error_detail = Some(error_detail.to_string());
        updated.retry_count = record.retry_count.saturating_add(1);
        self.put(&updated)
    }

    /// Delete `Processed` records whose event time precedes `now - days`.
    /// Returns the number of records deleted.
    pub fn purge_processed_older_than(&self, days: i64) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(days);
        let stale: Vec<[u8; 17]> = self
            .scan()?
            .into_iter()
            .filter(|r| r.state == EventState::Processed && r.event_time < cutoff)
            .map(|r| record_key(&r))
            .collect();

        let wt = self
            .db
            .begin_write()
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        {
            let mut table = wt
                .open_table(EVENTS)
                .map_err(|e| SyncError::EventStore(e.to_string()))?;
            for key in &stale {
                table
                    .remove(key.as_slice())
                    .map_err(|e| SyncError::EventStore(e.to_string()))?;
            }
        }
        wt.commit()
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        Ok(stale.len())
    }

    /// Newest records first, for the CLI events view.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<EventRecord>> {
        let mut records = self.scan()?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    // -----------------------------------------------------------------------
    // Watermark
    // -----------------------------------------------------------------------

    /// The lower bound for the next general poll. Epoch when never set.
    pub fn last_synced_at(&self) -> Result<DateTime<Utc>> {
        let rt = self
            .db
            .begin_read()
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        let table = rt
            .open_table(WATERMARK)
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        let ms = table
            .get(WATERMARK_KEY)
            .map_err(|e| SyncError::EventStore(e.to_string()))?
            .map(|v| v.value())
            .unwrap_or(0);
        DateTime::from_timestamp_millis(ms as i64)
            .ok_or_else(|| SyncError::EventStore(format!("invalid watermark: {ms}")))
    }

    pub fn set_last_synced_at(&self, ts: DateTime<Utc>) -> Result<()> {
        let wt = self
            .db
            .begin_write()
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        {
            let mut table = wt
                .open_table(WATERMARK)
                .map_err(|e| SyncError::EventStore(e.to_string()))?;
            table
                .insert(WATERMARK_KEY, ts.timestamp_millis().max(0) as u64)
                .map_err(|e| SyncError::EventStore(e.to_string()))?;
        }
        wt.commit()
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Full scan in key order: per application, ascending by event time.
    fn scan(&self) -> Result<Vec<EventRecord>> {
        let rt = self
            .db
            .begin_read()
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        let table = rt
            .open_table(EVENTS)
            .map_err(|e| SyncError::EventStore(e.to_string()))?;

        let mut records = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| SyncError::EventStore(e.to_string()))?
        {
            let (_, v) = entry.map_err(|e| SyncError::EventStore(e.to_string()))?;
            let record: EventRecord = serde_json::from_slice(v.value())?;
            records.push(record);
        }
        Ok(records)
    }

    /// Write a record under its identity key, replacing any existing value.
    fn put(&self, record: &EventRecord) -> Result<()> {
        let key = record_key(record);
        let value = serde_json::to_vec(record)?;
        let wt = self
            .db
            .begin_write()
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        {
            let mut table = wt
                .open_table(EVENTS)
                .map_err(|e| SyncError::EventStore(e.to_string()))?;
            table
                .insert(key.as_slice(), value.as_slice())
                .map_err(|e| SyncError::EventStore(e.to_string()))?;
        }
        wt.commit()
            .map_err(|e| SyncError::EventStore(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
