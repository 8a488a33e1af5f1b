use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::financing::FinancingEstimate;
use super::repository::{
    BookingError, BookingProvider, LeadId, LeadRecord, LeadRepository, LeadStatusView,
    NotificationProvider, RepositoryError,
};
use super::second_opinion::SecondOpinionRequest;
use super::service::{IntakeService, IntakeServiceError, LeadSubmission};
use super::wizard::{IntakeSession, WizardError, WizardEvent};
use crate::diagnosis::{
    ConsultReason, DiagnosticInput, DiagnosticResult, ProgramOption, SymptomOption,
};

/// Router builder exposing the catalog, diagnosis, financing and lead endpoints.
pub fn intake_router<R, B, N>(service: Arc<IntakeService<R, B, N>>) -> Router
where
    R: LeadRepository + 'static,
    B: BookingProvider + 'static,
    N: NotificationProvider + 'static,
{
    Router::new()
        .route("/api/v1/catalog/programs", get(programs_handler::<R, B, N>))
        .route("/api/v1/catalog/symptoms", get(symptoms_handler::<R, B, N>))
        .route("/api/v1/diagnosis", post(diagnosis_handler::<R, B, N>))
        .route(
            "/api/v1/financing/estimate",
            post(financing_handler::<R, B, N>),
        )
        .route("/api/v1/wizard/events", post(wizard_handler::<R, B, N>))
        .route(
            "/api/v1/leads",
            get(recent_leads_handler::<R, B, N>).post(submit_lead_handler::<R, B, N>),
        )
        .route("/api/v1/leads/:lead_id", get(lead_status_handler::<R, B, N>))
        .route(
            "/api/v1/second-opinion",
            post(second_opinion_handler::<R, B, N>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SymptomQuery {
    #[serde(default)]
    reason: Option<ConsultReason>,
}

const DEFAULT_RECENT_LIMIT: usize = 20;
const MAX_RECENT_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecentQuery {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DiagnosisResponse {
    #[serde(flatten)]
    result: DiagnosticResult,
    confidence_pct: u8,
    price_label: String,
    financing: FinancingEstimate,
}

/// Returned only to whoever submitted the lead; the link greets the clinic by the patient's name.
#[derive(Debug, Serialize)]
pub(crate) struct LeadReceipt {
    #[serde(flatten)]
    view: LeadStatusView,
    #[serde(skip_serializing_if = "Option::is_none")]
    whatsapp_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FinancingRequest {
    program_id: String,
    #[serde(default)]
    amount: Option<u64>,
    #[serde(default)]
    installments: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WizardRequest {
    #[serde(default)]
    session: Option<IntakeSession>,
    event: WizardEvent,
}

pub(crate) async fn programs_handler<R, B, N>(
    State(service): State<Arc<IntakeService<R, B, N>>>,
) -> Json<Vec<ProgramOption>>
where
    R: LeadRepository + 'static,
    B: BookingProvider + 'static,
    N: NotificationProvider + 'static,
{
    Json(service.engine().catalog().programs().to_vec())
}

pub(crate) async fn symptoms_handler<R, B, N>(
    State(service): State<Arc<IntakeService<R, B, N>>>,
    query: Result<Query<SymptomQuery>, QueryRejection>,
) -> Response
where
    R: LeadRepository + 'static,
    B: BookingProvider + 'static,
    N: NotificationProvider + 'static,
{
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return query_error(rejection),
    };
    let catalog = service.engine().catalog();
    let symptoms: Vec<SymptomOption> = match query.reason {
        Some(reason) => catalog
            .symptoms_for_reason(reason)
            .into_iter()
            .cloned()
            .collect(),
        None => catalog.symptoms().to_vec(),
    };
    (StatusCode::OK, Json(symptoms)).into_response()
}

pub(crate) async fn diagnosis_handler<R, B, N>(
    State(service): State<Arc<IntakeService<R, B, N>>>,
    Json(input): Json<DiagnosticInput>,
) -> Json<DiagnosisResponse>
where
    R: LeadRepository + 'static,
    B: BookingProvider + 'static,
    N: NotificationProvider + 'static,
{
    let result = service.diagnose(&input);
    let financing = FinancingEstimate::seeded(result.price_estimate);
    Json(DiagnosisResponse {
        confidence_pct: result.confidence_pct(),
        price_label: result.price_label(),
        financing,
        result,
    })
}

pub(crate) async fn financing_handler<R, B, N>(
    State(service): State<Arc<IntakeService<R, B, N>>>,
    Json(request): Json<FinancingRequest>,
) -> Response
where
    R: LeadRepository + 'static,
    B: BookingProvider + 'static,
    N: NotificationProvider + 'static,
{
    let Some(range) = service.engine().price_range(&request.program_id) else {
        let payload = json!({
            "error": format!("unknown program '{}'", request.program_id),
        });
        return (StatusCode::NOT_FOUND, Json(payload)).into_response();
    };

    match FinancingEstimate::new(range, request.amount, request.installments) {
        Ok(estimate) => {
            let payload = json!({
                "estimate": estimate,
                "summary": estimate.summary(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(IntakeServiceError::Financing(err)),
    }
}

pub(crate) async fn wizard_handler<R, B, N>(
    State(service): State<Arc<IntakeService<R, B, N>>>,
    Json(request): Json<WizardRequest>,
) -> Response
where
    R: LeadRepository + 'static,
    B: BookingProvider + 'static,
    N: NotificationProvider + 'static,
{
    let session = request.session.unwrap_or_default();
    match session.apply(request.event, service.engine()) {
        Ok(next) => (StatusCode::OK, Json(next)).into_response(),
        Err(err) => error_response(IntakeServiceError::Wizard(err)),
    }
}

pub(crate) async fn submit_lead_handler<R, B, N>(
    State(service): State<Arc<IntakeService<R, B, N>>>,
    Json(submission): Json<LeadSubmission>,
) -> Response
where
    R: LeadRepository + 'static,
    B: BookingProvider + 'static,
    N: NotificationProvider + 'static,
{
    match service.submit_lead(submission) {
        Ok(record) => {
            let receipt = LeadReceipt {
                view: record.status_view(),
                whatsapp_url: record.whatsapp_url,
            };
            (StatusCode::ACCEPTED, Json(receipt)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn recent_leads_handler<R, B, N>(
    State(service): State<Arc<IntakeService<R, B, N>>>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> Response
where
    R: LeadRepository + 'static,
    B: BookingProvider + 'static,
    N: NotificationProvider + 'static,
{
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return query_error(rejection),
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);
    match service.recent_leads(limit) {
        Ok(records) => {
            let views: Vec<LeadStatusView> = records.iter().map(LeadRecord::status_view).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn lead_status_handler<R, B, N>(
    State(service): State<Arc<IntakeService<R, B, N>>>,
    Path(lead_id): Path<String>,
) -> Response
where
    R: LeadRepository + 'static,
    B: BookingProvider + 'static,
    N: NotificationProvider + 'static,
{
    match service.get_lead(&LeadId(lead_id)) {
        Ok(record) => (StatusCode::OK, Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn second_opinion_handler<R, B, N>(
    State(service): State<Arc<IntakeService<R, B, N>>>,
    Json(request): Json<SecondOpinionRequest>,
) -> Response
where
    R: LeadRepository + 'static,
    B: BookingProvider + 'static,
    N: NotificationProvider + 'static,
{
    match service.submit_second_opinion(request) {
        Ok(record) => (StatusCode::ACCEPTED, Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

/// Malformed query strings are validation errors like any other.
fn query_error(rejection: QueryRejection) -> Response {
    let payload = json!({ "error": rejection.body_text() });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
}

fn error_response(err: IntakeServiceError) -> Response {
    let status = match &err {
        IntakeServiceError::Contact(_)
        | IntakeServiceError::Financing(_)
        | IntakeServiceError::Upload(_) => StatusCode::UNPROCESSABLE_ENTITY,
        IntakeServiceError::Wizard(WizardError::WrongStep { .. }) => StatusCode::CONFLICT,
        IntakeServiceError::Wizard(_) => StatusCode::UNPROCESSABLE_ENTITY,
        IntakeServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        IntakeServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        IntakeServiceError::Booking(BookingError::NoAvailability(_)) => StatusCode::CONFLICT,
        IntakeServiceError::Booking(BookingError::Transport(_)) => StatusCode::BAD_GATEWAY,
        IntakeServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
