//! Applies one status event to one application, side effects included.
//!
//! The applier assumes every earlier event of the same application has
//! already succeeded; ordering is the orchestrator's responsibility. Side
//! effects run before the local status/identifier write, so a failed
//! external call leaves the previous successful state standing and the
//! event lands in the failed slot for a Phase B retry.

use crate::amendment::AmendmentStore;
use crate::application::{Application, ApplicationStore, Permission};
use crate::decision::DecisionStore;
use crate::error::Result;
use crate::event::EventRecord;
use crate::notify::{Notification, Notifier};
use crate::registry::RegistryClient;
use crate::supplement::{SupplementRequest, SupplementStore};
use crate::types::{ApplicationStatus, DecisionKind};

/// One handler per status family; selected by `handler_for`.
type Handler<'a> = fn(&TransitionApplier<'a>, &Application, &EventRecord) -> Result<()>;

// ---------------------------------------------------------------------------
// TransitionApplier
// ---------------------------------------------------------------------------

pub struct TransitionApplier<'a> {
    pub registry: &'a dyn RegistryClient,
    pub applications: &'a dyn ApplicationStore,
    pub supplements: &'a dyn SupplementStore,
    pub amendments: &'a dyn AmendmentStore,
    pub decisions: &'a dyn DecisionStore,
    pub notifier: &'a dyn Notifier,
}

impl<'a> TransitionApplier<'a> {
    /// Apply one not-yet-processed event record.
    ///
    /// An event for an external id with no local application is logged and
    /// completes without side effects, so it cannot wedge its group.
    pub fn apply(&self, record: &EventRecord) -> Result<()> {
        let Some(application) = self
            .applications
            .find_by_external_id(record.application_external_id)?
        else {
            tracing::error!(
                external_id = record.application_external_id,
                "registry reported an event for an application we don't have"
            );
            return Ok(());
        };

        tracing::info!(
            application_id = application.id,
            external_id = record.application_external_id,
            identifier = %record.application_identifier,
            new_status = %record.new_status,
            event_time = %record.event_time,
            "handling application event"
        );

        let handler = Self::handler_for(record.new_status);
        handler(self, &application, record)
    }

    /// Status -> handler strategy map. One entry per rule block.
    fn handler_for(status: ApplicationStatus) -> Handler<'a> {
        match status {
            ApplicationStatus::Replaced => Self::on_replaced,
            ApplicationStatus::Decision
            | ApplicationStatus::OperationalCondition
            | ApplicationStatus::Finished => Self::on_decision,
            ApplicationStatus::WaitingInformation => Self::on_waiting_information,
            ApplicationStatus::Handling => Self::on_handling,
            _ => Self::on_plain,
        }
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    /// REPLACED reports a superseded identifier. The concurrent reissue
    /// event carries the new status and identifier, so the local fields
    /// stay untouched; only the old decision records are flagged.
    fn on_replaced(&self, application: &Application, record: &EventRecord) -> Result<()> {
        tracing::info!(
            application_id = application.id,
            identifier = %record.application_identifier,
            "decision replaced, flagging old decision records"
        );
        self.decisions.mark_replaced(&record.application_identifier)
    }

    fn on_plain(&self, application: &Application, record: &EventRecord) -> Result<()> {
        self.write_registry_fields(application, record)
    }

    fn on_decision(&self, application: &Application, record: &EventRecord) -> Result<()> {
        let Some(kind) = DecisionKind::from_status(record.new_status) else {
            return self.on_plain(application, record);
        };

        if record.new_status == ApplicationStatus::Decision {
            self.merge_pending_amendment(application)?;
        }

        if self.decisions.exists(&record.application_identifier, kind)? {
            // Reverted-then-reissued decision we already acted on.
            tracing::info!(
                application_id = application.id,
                identifier = %record.application_identifier,
                kind = %kind,
                "decision record exists, skipping download and notification"
            );
        } else {
            let document = self
                .registry
                .fetch_decision_document(kind, record.application_external_id)?;
            let metadata = self
                .registry
                .fetch_application_metadata(record.application_external_id)?;
            self.decisions.save(
                application.id,
                &record.application_identifier,
                kind,
                &metadata,
                document,
            )?;
            self.notify_contacts(application, |email| Notification::DecisionReady {
                email,
                application_id: application.id,
                identifier: record.application_identifier.clone(),
                kind,
            })?;
        }

        self.write_registry_fields(application, record)
    }

    fn on_waiting_information(&self, application: &Application, record: &EventRecord) -> Result<()> {
        self.merge_pending_amendment(application)?;

        match self
            .registry
            .fetch_supplement_request(record.application_external_id)?
        {
            Some(detail) => {
                let fields = detail
                    .fields
                    .into_iter()
                    .map(|f| (f.field_key, f.request_description))
                    .collect();
                self.supplements.save(SupplementRequest {
                    application_id: application.id,
                    external_request_id: detail.request_id,
                    fields,
                })?;
                self.notify_contacts(application, |email| Notification::SupplementRequested {
                    email,
                    application_id: application.id,
                    application_name: application.name.clone(),
                    identifier: record.application_identifier.clone(),
                })?;
            }
            None => {
                // Registry retracted the request before we could read it.
                tracing::warn!(
                    application_id = application.id,
                    external_id = record.application_external_id,
                    "no supplement request in the registry, skipping persistence and notification"
                );
            }
        }

        self.write_registry_fields(application, record)
    }

    fn on_handling(&self, application: &Application, record: &EventRecord) -> Result<()> {
        if self.supplements.find_by_application(application.id)?.is_some() {
            if application.external_status == Some(ApplicationStatus::WaitingInformation) {
                self.supplements.delete_by_application(application.id)?;
                self.amendments.delete_by_application(application.id)?;
                self.notify_contacts(application, |email| Notification::SupplementCancelled {
                    email,
                    application_id: application.id,
                    identifier: record.application_identifier.clone(),
                })?;
            } else {
                // Refusing to advance would leave the local record
                // permanently diverged from the registry.
                tracing::error!(
                    application_id = application.id,
                    previous_status = ?application.external_status,
                    "HANDLING with an open supplement request but the previous \
                     status was not WAITING_INFORMATION; inconsistent registry history"
                );
            }
        }

        self.write_registry_fields(application, record)
    }

    // -----------------------------------------------------------------------
    // Shared steps
    // -----------------------------------------------------------------------

    fn merge_pending_amendment(&self, application: &Application) -> Result<()> {
        if let Some(amendment) = self.amendments.find_by_application(application.id)? {
            tracing::info!(
                application_id = application.id,
                "merging pending amendment into application"
            );
            self.amendments.merge_and_delete(&amendment)?;
        }
        Ok(())
    }

    fn notify_contacts<F>(&self, application: &Application, build: F) -> Result<()>
    where
        F: Fn(String) -> Notification,
    {
        let contacts = self
            .applications
            .contacts_with_permission(application.id, Permission::EditApplications)?;
        if contacts.is_empty() {
            tracing::error!(
                application_id = application.id,
                "no receivers with edit permission, not sending any notifications"
            );
            return Ok(());
        }
        tracing::info!(
            application_id = application.id,
            receivers = contacts.len(),
            "sending notifications"
        );
        for contact in contacts {
            self.notifier.notify(build(contact.email))?;
        }
        Ok(())
    }

    /// The status/identifier write is the last step of every handler.
    fn write_registry_fields(&self, application: &Application, record: &EventRecord) -> Result<()> {
        tracing::info!(
            application_id = application.id,
            identifier = %record.application_identifier,
            new_status = %record.new_status,
            "updating application registry fields"
        );
        self.applications.update_registry_fields(
            application.id,
            record.new_status,
            &record.application_identifier,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
