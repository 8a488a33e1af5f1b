use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Weekday};
use dental_intake::diagnosis::{Catalog, CatalogError, Urgency};
use dental_intake::intake::{
    BookingConfirmation, BookingError, BookingProvider, BookingRequest, ClinicNotification,
    LeadId, LeadRecord, LeadRepository, NotificationError, NotificationProvider,
    RepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Built-in catalog unless a directory with `symptoms.csv` and `programs.csv` is given.
pub(crate) fn load_catalog(dir: Option<&Path>) -> Result<Catalog, CatalogError> {
    match dir {
        Some(dir) => {
            let catalog = Catalog::from_dir(dir)?;
            info!(
                dir = %dir.display(),
                symptoms = catalog.symptoms().len(),
                "loaded catalog override"
            );
            Ok(catalog)
        }
        None => Ok(Catalog::standard()),
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLeadRepository {
    records: Arc<Mutex<HashMap<LeadId, LeadRecord>>>,
}

impl LeadRepository for InMemoryLeadRepository {
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

const SLOT_HOURS: [u32; 8] = [9, 10, 11, 12, 14, 15, 16, 17];
const BOOKING_HORIZON_DAYS: i64 = 60;

/// Weekday agenda with hourly evaluation slots, first come first served.
pub(crate) struct AgendaBookingProvider {
    fixed_today: Option<NaiveDate>,
    booked: Mutex<BTreeSet<NaiveDateTime>>,
}

impl AgendaBookingProvider {
    /// Agenda that follows the local calendar.
    pub(crate) fn new() -> Self {
        Self {
            fixed_today: None,
            booked: Mutex::new(BTreeSet::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn starting(today: NaiveDate) -> Self {
        Self {
            fixed_today: Some(today),
            booked: Mutex::new(BTreeSet::new()),
        }
    }

    fn today(&self) -> NaiveDate {
        self.fixed_today
            .unwrap_or_else(|| Local::now().date_naive())
    }

    /// Preferred dates from tomorrow on are honored; otherwise urgency sets the lead time.
    fn first_day(&self, urgency: Urgency, preferred: Option<NaiveDate>) -> NaiveDate {
        let today = self.today();
        let tomorrow = today + Duration::days(1);
        let lead_days = match urgency {
            Urgency::Urgente => 1,
            Urgency::EstaSemana => 2,
            Urgency::EsteMes => 7,
            Urgency::Explorando => 14,
        };
        preferred
            .filter(|date| *date >= tomorrow)
            .unwrap_or(today + Duration::days(lead_days))
    }
}

impl BookingProvider for AgendaBookingProvider {
    fn request_slot(&self, request: &BookingRequest) -> Result<BookingConfirmation, BookingError> {
        let first_day = self.first_day(request.urgency, request.preferred_date);
        let last_day = first_day + Duration::days(BOOKING_HORIZON_DAYS);
        let mut booked = self.booked.lock().expect("agenda mutex poisoned");

        let mut day = first_day;
        while day <= last_day {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                let free = SLOT_HOURS
                    .iter()
                    .filter_map(|hour| day.and_hms_opt(*hour, 0, 0))
                    .find(|slot| !booked.contains(slot));
                if let Some(starts_at) = free {
                    booked.insert(starts_at);
                    info!(
                        lead_id = %request.lead_id.0,
                        program = %request.program_id,
                        %starts_at,
                        "evaluation slot reserved"
                    );
                    return Ok(BookingConfirmation {
                        reference: format!("AG-{}", starts_at.format("%Y%m%d%H%M")),
                        starts_at,
                    });
                }
            }
            day += Duration::days(1);
        }

        Err(BookingError::NoAvailability(last_day))
    }

    fn release_slot(&self, confirmation: &BookingConfirmation) -> Result<(), BookingError> {
        let mut booked = self.booked.lock().expect("agenda mutex poisoned");
        if booked.remove(&confirmation.starts_at) {
            info!(starts_at = %confirmation.starts_at, "evaluation slot released");
        }
        Ok(())
    }
}

/// Keeps outbound clinic notifications in memory and traces each one.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationProvider {
    events: Arc<Mutex<Vec<ClinicNotification>>>,
}

impl NotificationProvider for InMemoryNotificationProvider {
    fn notify(&self, notification: ClinicNotification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            lead_id = %notification.lead_id.0,
            "clinic notification queued"
        );
        let mut guard = self.events.lock().expect("notification mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryNotificationProvider {
    #[cfg(test)]
    pub(crate) fn events(&self) -> Vec<ClinicNotification> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}
