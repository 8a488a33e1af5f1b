use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::diagnosis::{Catalog, ConsultReason, DiagnosisEngine, DiagnosticInput, Urgency};
use crate::intake::repository::{
    BookingConfirmation, BookingError, BookingProvider, BookingRequest, ClinicNotification,
    LeadId, LeadRecord, LeadRepository, NotificationError, NotificationProvider,
    RepositoryError,
};
use crate::intake::{
    intake_router, ContactDetails, IntakeService, LeadSubmission, SecondOpinionRequest,
    UploadDescriptor,
};

pub(super) const CLINIC_NUMBER: &str = "+56 9 2222 3333";

pub(super) fn engine() -> Arc<DiagnosisEngine> {
    Arc::new(DiagnosisEngine::new(Arc::new(Catalog::standard())))
}

pub(super) fn contact() -> ContactDetails {
    ContactDetails {
        name: "Camila Rojas".to_string(),
        phone: "+56 9 8765 4321".to_string(),
        email: Some("camila@example.cl".to_string()),
    }
}

pub(super) fn prevention_input() -> DiagnosticInput {
    DiagnosticInput {
        reason: ConsultReason::Prevencion,
        symptom_ids: ["limpieza", "revision-general"]
            .iter()
            .map(|id| id.to_string())
            .collect(),
        urgency: Urgency::EsteMes,
        has_photo: false,
    }
}

pub(super) fn lead_submission() -> LeadSubmission {
    LeadSubmission {
        contact: contact(),
        input: prevention_input(),
        financing_amount: None,
        installments: Some(6),
        request_booking: false,
        preferred_date: None,
    }
}

pub(super) fn second_opinion_request() -> SecondOpinionRequest {
    SecondOpinionRequest {
        contact: contact(),
        notes: Some("  Me cotizaron 4 implantes, quiero otra opinión. ".to_string()),
        documents: vec![
            UploadDescriptor {
                file_name: "presupuesto.pdf".to_string(),
                size_bytes: 240_000,
                content_type: None,
            },
            UploadDescriptor {
                file_name: "panoramica.png".to_string(),
                size_bytes: 3_100_000,
                content_type: Some("image/png".to_string()),
            },
        ],
    }
}

pub(super) type TestService = IntakeService<MemoryRepository, MemoryBooking, MemoryNotifications>;

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryRepository>,
    Arc<MemoryNotifications>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = IntakeService::new(
        engine(),
        repository.clone(),
        Arc::new(MemoryBooking),
        notifications.clone(),
        CLINIC_NUMBER,
    );
    (service, repository, notifications)
}

pub(super) fn intake_router_with_service<R, B, N>(
    service: IntakeService<R, B, N>,
) -> axum::Router
where
    R: LeadRepository + 'static,
    B: BookingProvider + 'static,
    N: NotificationProvider + 'static,
{
    intake_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<LeadId, LeadRecord>>>,
}

impl LeadRepository for MemoryRepository {
    fn insert(&self, record: LeadRecord) -> Result<LeadRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.lead_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.lead_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<LeadRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<LeadRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<_> = guard.values().cloned().collect();
        records.sort_by(|a, b| {
            b.received_at
                .cmp(&a.received_at)
                .then_with(|| b.lead_id.cmp(&a.lead_id))
        });
        records.truncate(limit);
        Ok(records)
    }
}

pub(super) struct UnavailableRepository;

impl LeadRepository for UnavailableRepository {
    fn insert(&self, _record: LeadRecord) -> Result<LeadRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &LeadId) -> Result<Option<LeadRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<LeadRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Books every request at 10:00 on the preferred date (or 2025-11-03).
pub(super) struct MemoryBooking;

impl BookingProvider for MemoryBooking {
    fn request_slot(&self, request: &BookingRequest) -> Result<BookingConfirmation, BookingError> {
        let date = request
            .preferred_date
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(2025, 11, 3).expect("valid date"));
        Ok(BookingConfirmation {
            reference: format!("bk-{}", request.lead_id.0),
            starts_at: date.and_hms_opt(10, 0, 0).expect("valid time"),
        })
    }

    fn release_slot(&self, _confirmation: &BookingConfirmation) -> Result<(), BookingError> {
        Ok(())
    }
}

pub(super) struct FullAgenda;

impl BookingProvider for FullAgenda {
    fn request_slot(&self, _request: &BookingRequest) -> Result<BookingConfirmation, BookingError> {
        Err(BookingError::NoAvailability(
            NaiveDate::from_ymd_opt(2025, 12, 31).expect("valid date"),
        ))
    }

    fn release_slot(&self, _confirmation: &BookingConfirmation) -> Result<(), BookingError> {
        Ok(())
    }
}

/// Hourly slots from 09:00 on 2025-11-03 that stay taken until released.
#[derive(Default)]
pub(super) struct SingleDayAgenda {
    held: Mutex<BTreeSet<NaiveDateTime>>,
}

impl SingleDayAgenda {
    pub(super) fn held(&self) -> Vec<NaiveDateTime> {
        self.held
            .lock()
            .expect("agenda mutex poisoned")
            .iter()
            .copied()
            .collect()
    }
}

impl BookingProvider for SingleDayAgenda {
    fn request_slot(&self, request: &BookingRequest) -> Result<BookingConfirmation, BookingError> {
        let day = NaiveDate::from_ymd_opt(2025, 11, 3).expect("valid date");
        let mut held = self.held.lock().expect("agenda mutex poisoned");
        let starts_at = (9..18)
            .filter_map(|hour| day.and_hms_opt(hour, 0, 0))
            .find(|slot| !held.contains(slot))
            .ok_or(BookingError::NoAvailability(day))?;
        held.insert(starts_at);
        Ok(BookingConfirmation {
            reference: format!("bk-{}", request.lead_id.0),
            starts_at,
        })
    }

    fn release_slot(&self, confirmation: &BookingConfirmation) -> Result<(), BookingError> {
        self.held
            .lock()
            .expect("agenda mutex poisoned")
            .remove(&confirmation.starts_at);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    events: Arc<Mutex<Vec<ClinicNotification>>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<ClinicNotification> {
        self.events.lock().expect("notification mutex poisoned").clone()
    }
}

impl NotificationProvider for MemoryNotifications {
    fn notify(&self, notification: ClinicNotification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct BrokenNotifications;

impl NotificationProvider for BrokenNotifications {
    fn notify(&self, _notification: ClinicNotification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("whatsapp api timeout".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
