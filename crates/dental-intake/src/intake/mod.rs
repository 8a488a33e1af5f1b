//! Patient intake: wizard session, financing, contact call-to-action, second-opinion
//! uploads and the service/router that ties them to storage and provider ports.

pub mod contact;
pub mod financing;
pub mod repository;
pub mod router;
pub mod second_opinion;
pub mod service;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use contact::{whatsapp_link, ContactDetails, ContactError};
pub use financing::{FinancingError, FinancingEstimate, INSTALLMENT_OPTIONS};
pub use repository::{
    BookingConfirmation, BookingError, BookingProvider, BookingRequest, ClinicNotification,
    LeadId, LeadRecord, LeadRepository, LeadSource, LeadStatus, LeadStatusView,
    NotificationError, NotificationProvider, RepositoryError,
};
pub use router::intake_router;
pub use second_opinion::{AcceptedDocument, SecondOpinionRequest, UploadDescriptor, UploadError};
pub use service::{IntakeService, IntakeServiceError, LeadSubmission};
pub use wizard::{IntakeSession, WizardError, WizardEvent, WizardStep};
