//! Two-phase reconciliation against the registry.
//!
//! Phase A polls every tracked application since the watermark, buffers the
//! events durably, and replays each application's chain oldest-first,
//! stopping a chain at its first failure while other chains continue.
//! Phase B takes every application left holding a failed event and
//! re-derives its history from the registry around the failure point — the
//! re-fetched sequence is authoritative, so a retry never depends on a
//! possibly incomplete local buffer.
//!
//! Registry delivery is at-least-once; the event store's identity key and
//! the decision-record guard make the local side effects at-most-once.

use chrono::{Duration, Utc};

use crate::amendment::AmendmentStore;
use crate::application::ApplicationStore;
use crate::decision::DecisionStore;
use crate::error::Result;
use crate::event::EventRecord;
use crate::notify::Notifier;
use crate::registry::RegistryClient;
use crate::store::EventDb;
use crate::supplement::SupplementStore;
use crate::transition::TransitionApplier;

// ---------------------------------------------------------------------------
// SyncOrchestrator
// ---------------------------------------------------------------------------

pub struct SyncOrchestrator<'a> {
    db: &'a EventDb,
    registry: &'a dyn RegistryClient,
    applications: &'a dyn ApplicationStore,
    applier: TransitionApplier<'a>,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        db: &'a EventDb,
        registry: &'a dyn RegistryClient,
        applications: &'a dyn ApplicationStore,
        supplements: &'a dyn SupplementStore,
        amendments: &'a dyn AmendmentStore,
        decisions: &'a dyn DecisionStore,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            db,
            registry,
            applications,
            applier: TransitionApplier {
                registry,
                applications,
                supplements,
                amendments,
                decisions,
                notifier,
            },
        }
    }

    /// One full reconciliation run: general sync, then targeted retries.
    ///
    /// Success or failure is observable only through the persisted event
    /// states and the logs; per-application failures never abort the run.
    pub fn handle_updates(&self) -> Result<()> {
        let past_failures = self.db.failed_records()?;
        tracing::info!(
            past_failures = past_failures.len(),
            "starting registry sync run"
        );
        self.sync_new_events()?;
        self.retry_failed()?;
        tracing::info!("registry sync run finished");
        Ok(())
    }

    /// Retention pass, independent of `handle_updates`.
    pub fn purge_processed_older_than(&self, days: i64) -> Result<usize> {
        let deleted = self.db.purge_processed_older_than(days)?;
        tracing::info!(days, deleted, "purged processed events past retention");
        Ok(deleted)
    }

    // -----------------------------------------------------------------------
    // Phase A — general sync
    // -----------------------------------------------------------------------

    fn sync_new_events(&self) -> Result<()> {
        let since = self.db.last_synced_at()?;
        let now = Utc::now();

        let ids = self.applications.tracked_external_ids()?;
        if ids.is_empty() {
            // The registry treats an empty id list as "all applications".
            tracing::info!("no tracked applications, skipping registry poll");
        } else {
            tracing::info!(applications = ids.len(), %since, "fetching status histories");
            let histories = self.registry.fetch_histories(&ids, since)?;
            let inserted = self.db.upsert_new(&histories)?;
            tracing::info!(
                histories = histories.len(),
                inserted,
                "buffered new status events as pending"
            );
        }

        self.process_all()?;

        // Advance unconditionally; failed applications are retried by Phase
        // B, not by re-walking the watermark range. The 1 ms back-off keeps
        // events stamped at the poll instant inside the next window.
        self.db
            .set_last_synced_at(now - Duration::milliseconds(1))?;
        Ok(())
    }

    fn process_all(&self) -> Result<()> {
        let groups = self.db.pending_and_failed_grouped()?;
        if groups.is_empty() {
            tracing::info!("no pending or failed events to process");
            return Ok(());
        }
        tracing::info!(applications = groups.len(), "processing event groups");
        for (external_id, events) in &groups {
            self.process_group(*external_id, events)?;
        }
        Ok(())
    }

    /// Replay one application's chain oldest-first. The first failure marks
    /// its event failed and stops the chain; later events stay pending so
    /// they are never applied out of causal order.
    fn process_group(&self, external_id: i64, events: &[EventRecord]) -> Result<()> {
        for record in events {
            match self.applier.apply(record) {
                Ok(()) => self.db.mark_processed(record)?,
                Err(err) => {
                    tracing::error!(
                        external_id,
                        error = %err,
                        event = %record.log_string(),
                        "transition failed, stopping this application's chain"
                    );
                    self.db.mark_failed(record, &err.to_string())?;
                    break;
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Phase B — failure-targeted retry
    // -----------------------------------------------------------------------

    fn retry_failed(&self) -> Result<()> {
        let failed = self.db.failed_records()?;
        if failed.is_empty() {
            tracing::info!("no failed events to retry");
            return Ok(());
        }

        for record in failed {
            let external_id = record.application_external_id;
            let since = record.event_time - Duration::seconds(1);
            tracing::info!(
                external_id,
                %since,
                event = %record.log_string(),
                "re-deriving authoritative history around failed event"
            );
            match self.registry.fetch_histories(&[external_id], since) {
                Ok(histories) => {
                    let inserted = self.db.upsert_new(&histories)?;
                    tracing::info!(external_id, inserted, "reconciled re-fetched events");
                }
                Err(err) => {
                    // Retrying from a possibly stale buffer would defeat the
                    // re-derivation; leave the slot for the next run.
                    tracing::warn!(external_id, error = %err, "history re-fetch failed, retrying next run");
                    continue;
                }
            }

            let groups = self.db.pending_and_failed_grouped()?;
            if let Some(events) = groups.get(&external_id) {
                self.process_group(external_id, events)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
