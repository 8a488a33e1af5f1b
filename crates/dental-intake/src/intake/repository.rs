use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::contact::ContactDetails;
use super::financing::FinancingEstimate;
use super::second_opinion::AcceptedDocument;
use crate::diagnosis::{DiagnosticResult, Urgency};

/// Identifier wrapper for captured leads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeadId(pub String);

/// Which flow produced the lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Diagnosis,
    SecondOpinion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Received,
    Booked,
    AwaitingReview,
}

impl LeadStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeadStatus::Received => "received",
            LeadStatus::Booked => "booked",
            LeadStatus::AwaitingReview => "awaiting_review",
        }
    }
}

/// Stored lead with everything the clinic needs to follow up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadRecord {
    pub lead_id: LeadId,
    pub source: LeadSource,
    pub status: LeadStatus,
    pub contact: ContactDetails,
    pub received_at: DateTime<Utc>,
    pub result: Option<DiagnosticResult>,
    pub financing: Option<FinancingEstimate>,
    pub booking: Option<BookingConfirmation>,
    pub whatsapp_url: Option<String>,
    pub notes: Option<String>,
    pub documents: Vec<AcceptedDocument>,
}

impl LeadRecord {
    pub fn status_view(&self) -> LeadStatusView {
        LeadStatusView {
            lead_id: self.lead_id.clone(),
            source: self.source,
            status: self.status.label(),
            program: self.result.as_ref().map(|result| result.program.name.clone()),
            confidence_pct: self.result.as_ref().map(DiagnosticResult::confidence_pct),
            price_label: self.result.as_ref().map(DiagnosticResult::price_label),
            financing_summary: self.financing.as_ref().map(FinancingEstimate::summary),
            appointment: self.booking.as_ref().map(|booking| booking.starts_at),
            document_count: self.documents.len(),
        }
    }
}

/// Public projection of a lead; contact details and the patient's name stay server side.
#[derive(Debug, Clone, Serialize)]
pub struct LeadStatusView {
    pub lead_id: LeadId,
    pub source: LeadSource,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_pct: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financing_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment: Option<NaiveDateTime>,
    pub document_count: usize,
}

/// Storage abstraction so the service can be exercised in isolation.
pub trait LeadRepository: Send + Sync {
    fn insert(&self, record: LeadRecord) -> Result<LeadRecord, RepositoryError>;
    fn fetch(&self, id: &LeadId) -> Result<Option<LeadRecord>, RepositoryError>;
    fn recent(&self, limit: usize) -> Result<Vec<LeadRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Port to the practice-management agenda.
pub trait BookingProvider: Send + Sync {
    fn request_slot(&self, request: &BookingRequest) -> Result<BookingConfirmation, BookingError>;
    /// Give a reserved slot back, e.g. when the lead that asked for it was never stored.
    fn release_slot(&self, confirmation: &BookingConfirmation) -> Result<(), BookingError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub lead_id: LeadId,
    pub patient_name: String,
    pub phone: String,
    pub program_id: String,
    pub urgency: Urgency,
    pub preferred_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub reference: String,
    pub starts_at: NaiveDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("no slots available before {0}")]
    NoAvailability(NaiveDate),
    #[error("booking provider unavailable: {0}")]
    Transport(String),
}

/// Port for outbound clinic notifications (WhatsApp, e-mail).
pub trait NotificationProvider: Send + Sync {
    fn notify(&self, notification: ClinicNotification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicNotification {
    pub template: String,
    pub lead_id: LeadId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
