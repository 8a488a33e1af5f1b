use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::contact::{whatsapp_link, ContactDetails, ContactError};
use super::financing::{FinancingError, FinancingEstimate};
use super::repository::{
    BookingConfirmation, BookingError, BookingProvider, BookingRequest, ClinicNotification,
    LeadId, LeadRecord, LeadRepository, LeadSource, LeadStatus, NotificationProvider,
    RepositoryError,
};
use super::second_opinion::{validate_documents, SecondOpinionRequest, UploadError};
use super::wizard::{IntakeSession, WizardError};
use crate::diagnosis::{DiagnosisEngine, DiagnosticInput, DiagnosticResult};

static LEAD_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static TICKET_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_lead_id() -> LeadId {
    let id = LEAD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LeadId(format!("lead-{id:06}"))
}

fn next_ticket_id() -> LeadId {
    let id = TICKET_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LeadId(format!("so-{id:06}"))
}

/// Lead captured at the end of the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadSubmission {
    pub contact: ContactDetails,
    pub input: DiagnosticInput,
    #[serde(default)]
    pub financing_amount: Option<u64>,
    #[serde(default)]
    pub installments: Option<u32>,
    #[serde(default)]
    pub request_booking: bool,
    #[serde(default)]
    pub preferred_date: Option<NaiveDate>,
}

impl LeadSubmission {
    /// Build a submission from a finished wizard session.
    pub fn from_session(
        session: &IntakeSession,
        request_booking: bool,
    ) -> Result<Self, WizardError> {
        let contact = session
            .contact
            .clone()
            .ok_or(WizardError::MissingContact)?;
        let input = session.diagnostic_input()?;

        Ok(Self {
            contact,
            input,
            financing_amount: session.financing.map(|estimate| estimate.amount),
            installments: session.financing.map(|estimate| estimate.installments),
            request_booking,
            preferred_date: None,
        })
    }
}

/// Service composing the diagnosis engine, lead storage and provider ports.
pub struct IntakeService<R, B, N> {
    engine: Arc<DiagnosisEngine>,
    repository: Arc<R>,
    booking: Arc<B>,
    notifications: Arc<N>,
    clinic_whatsapp: String,
}

impl<R, B, N> IntakeService<R, B, N>
where
    R: LeadRepository + 'static,
    B: BookingProvider + 'static,
    N: NotificationProvider + 'static,
{
    pub fn new(
        engine: Arc<DiagnosisEngine>,
        repository: Arc<R>,
        booking: Arc<B>,
        notifications: Arc<N>,
        clinic_whatsapp: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            repository,
            booking,
            notifications,
            clinic_whatsapp: clinic_whatsapp.into(),
        }
    }

    pub fn engine(&self) -> &DiagnosisEngine {
        &self.engine
    }

    pub fn diagnose(&self, input: &DiagnosticInput) -> DiagnosticResult {
        self.engine.diagnose(input)
    }

    /// Score, price, optionally book, then persist the lead and notify the clinic.
    pub fn submit_lead(
        &self,
        submission: LeadSubmission,
    ) -> Result<LeadRecord, IntakeServiceError> {
        let contact = submission.contact.normalized()?;
        let result = self.engine.diagnose(&submission.input);
        let financing = FinancingEstimate::new(
            result.price_estimate,
            submission.financing_amount,
            submission.installments,
        )?;

        let lead_id = next_lead_id();
        let whatsapp_url = whatsapp_link(&self.clinic_whatsapp, Some(&contact.name), &result);

        let booking = if submission.request_booking {
            let request = BookingRequest {
                lead_id: lead_id.clone(),
                patient_name: contact.name.clone(),
                phone: contact.phone.clone(),
                program_id: result.program.id.clone(),
                urgency: result.urgency,
                preferred_date: submission.preferred_date,
            };
            Some(self.booking.request_slot(&request)?)
        } else {
            None
        };

        let record = LeadRecord {
            lead_id,
            source: LeadSource::Diagnosis,
            status: if booking.is_some() {
                LeadStatus::Booked
            } else {
                LeadStatus::Received
            },
            contact,
            received_at: Utc::now(),
            result: Some(result),
            financing: Some(financing),
            booking,
            whatsapp_url: Some(whatsapp_url),
            notes: None,
            documents: Vec::new(),
        };

        let reserved = record.booking.clone();
        let stored = match self.repository.insert(record) {
            Ok(stored) => stored,
            Err(err) => {
                if let Some(confirmation) = reserved {
                    self.release(&confirmation);
                }
                return Err(err.into());
            }
        };
        info!(
            lead_id = %stored.lead_id.0,
            route = stored.result.as_ref().map(|r| r.route_key.as_str()).unwrap_or_default(),
            booked = stored.booking.is_some(),
            "diagnosis lead captured"
        );

        let mut details = BTreeMap::new();
        if let Some(result) = &stored.result {
            details.insert("program".to_string(), result.program.name.clone());
            details.insert("urgency".to_string(), result.urgency.label().to_string());
            details.insert("price".to_string(), result.price_label());
        }
        details.insert("phone".to_string(), stored.contact.phone.clone());
        self.dispatch("diagnosis_lead", &stored.lead_id, details);

        Ok(stored)
    }

    /// Validate uploaded documents and queue the case for a dentist's review.
    pub fn submit_second_opinion(
        &self,
        request: SecondOpinionRequest,
    ) -> Result<LeadRecord, IntakeServiceError> {
        let contact = request.contact.normalized()?;
        let ticket_id = next_ticket_id();
        let documents = validate_documents(&ticket_id.0, &request.documents)?;
        let notes = request
            .notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());

        let record = LeadRecord {
            lead_id: ticket_id,
            source: LeadSource::SecondOpinion,
            status: LeadStatus::AwaitingReview,
            contact,
            received_at: Utc::now(),
            result: None,
            financing: None,
            booking: None,
            whatsapp_url: None,
            notes,
            documents,
        };

        let stored = self.repository.insert(record)?;
        info!(
            lead_id = %stored.lead_id.0,
            documents = stored.documents.len(),
            "second opinion request queued"
        );

        let mut details = BTreeMap::new();
        details.insert("documents".to_string(), stored.documents.len().to_string());
        details.insert("phone".to_string(), stored.contact.phone.clone());
        self.dispatch("second_opinion_request", &stored.lead_id, details);

        Ok(stored)
    }

    /// Newest first, for the clinic dashboard.
    pub fn recent_leads(&self, limit: usize) -> Result<Vec<LeadRecord>, IntakeServiceError> {
        Ok(self.repository.recent(limit)?)
    }

    pub fn get_lead(&self, lead_id: &LeadId) -> Result<LeadRecord, IntakeServiceError> {
        let record = self
            .repository
            .fetch(lead_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    fn release(&self, confirmation: &BookingConfirmation) {
        match self.booking.release_slot(confirmation) {
            Ok(()) => info!(
                reference = %confirmation.reference,
                "slot released after failed lead insert"
            ),
            Err(err) => warn!(
                reference = %confirmation.reference,
                error = %err,
                "slot could not be released"
            ),
        }
    }

    /// Notification failures never fail the lead; the clinic still sees it in storage.
    fn dispatch(&self, template: &str, lead_id: &LeadId, details: BTreeMap<String, String>) {
        let notification = ClinicNotification {
            template: template.to_string(),
            lead_id: lead_id.clone(),
            details,
        };
        if let Err(err) = self.notifications.notify(notification) {
            warn!(lead_id = %lead_id.0, %template, error = %err, "clinic notification failed");
        }
    }
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error(transparent)]
    Contact(#[from] ContactError),
    #[error(transparent)]
    Financing(#[from] FinancingError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Booking(#[from] BookingError),
}
