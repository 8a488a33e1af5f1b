use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::{
    build_service, engine, intake_router_with_service, lead_submission, read_json_body,
    FullAgenda, MemoryNotifications, MemoryRepository, UnavailableRepository, CLINIC_NUMBER,
    MemoryBooking,
};
use crate::intake::router::{self, RecentQuery, SymptomQuery};
use crate::intake::IntakeService;

fn json_request(uri: &str, payload: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn programs_endpoint_lists_catalog_in_order() {
    let (service, _, _) = build_service();
    let response = intake_router_with_service(service)
        .oneshot(
            Request::get("/api/v1/catalog/programs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json_body(response).await;
    let ids: Vec<_> = json
        .as_array()
        .expect("array payload")
        .iter()
        .map(|program| program["id"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        ids,
        vec!["zero-caries", "implant-one", "smile-design", "align-pro"]
    );
}

#[tokio::test]
async fn symptoms_endpoint_filters_by_reason() {
    let (service, _, _) = build_service();
    let response = intake_router_with_service(service)
        .oneshot(
            Request::get("/api/v1/catalog/symptoms?reason=ortodoncia")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json_body(response).await;
    let ids: Vec<_> = json
        .as_array()
        .expect("array payload")
        .iter()
        .map(|symptom| symptom["id"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(ids, vec!["dientes-chuecos", "mordida"]);
}

#[tokio::test]
async fn symptoms_handler_without_reason_returns_everything() {
    let (service, _, _) = build_service();
    let total = service.engine().catalog().symptoms().len();

    let response = router::symptoms_handler::<
        MemoryRepository,
        MemoryBooking,
        MemoryNotifications,
    >(State(Arc::new(service)), Ok(Query(SymptomQuery::default())))
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let symptoms = read_json_body(response).await;
    assert_eq!(symptoms.as_array().map(Vec::len), Some(total));
}

#[tokio::test]
async fn unknown_reason_in_query_is_unprocessable() {
    let (service, _, _) = build_service();
    let response = intake_router_with_service(service)
        .oneshot(
            Request::get("/api/v1/catalog/symptoms?reason=sonrisa")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = read_json_body(response).await;
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn non_numeric_limit_is_unprocessable() {
    let (service, _, _) = build_service();
    let response = intake_router_with_service(service)
        .oneshot(
            Request::get("/api/v1/leads?limit=many")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn diagnosis_endpoint_returns_result_with_labels() {
    let (service, _, _) = build_service();
    let payload = json!({
        "reason": "prevencion",
        "symptom_ids": ["limpieza", "revision-general"],
        "urgency": "este-mes"
    });

    let response = intake_router_with_service(service)
        .oneshot(json_request("/api/v1/diagnosis", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json_body(response).await;
    assert_eq!(json["route_key"], "prevencion:zero-caries");
    assert_eq!(json["program"]["name"], "Programa Zero Caries");
    assert_eq!(json["confidence_pct"], 95);
    assert_eq!(json["tags_count"], 3);
    assert_eq!(json["price_label"], "$150.000 - $450.000");
    assert_eq!(json["financing"]["amount"], 300_000);
    assert_eq!(json["financing"]["installments"], 12);
    assert_eq!(json["financing"]["monthly_payment"], 25_000);
    assert!(json["recommendations"]
        .as_array()
        .expect("recommendations array")
        .is_empty());
}

#[tokio::test]
async fn diagnosis_endpoint_rejects_unknown_urgency() {
    let (service, _, _) = build_service();
    let payload = json!({
        "reason": "dolor",
        "urgency": "ayer"
    });

    let response = intake_router_with_service(service)
        .oneshot(json_request("/api/v1/diagnosis", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn financing_estimate_returns_summary() {
    let (service, _, _) = build_service();
    let payload = json!({
        "program_id": "implant-one",
        "amount": 900_000,
        "installments": 18
    });

    let response = intake_router_with_service(service)
        .oneshot(json_request("/api/v1/financing/estimate", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json_body(response).await;
    assert_eq!(json["estimate"]["amount"], 900_000);
    assert_eq!(json["estimate"]["monthly_payment"], 50_000);
    assert_eq!(json["summary"], "18 cuotas de $50.000 (total $900.000)");
}

#[tokio::test]
async fn financing_estimate_maps_errors() {
    let (service, _, _) = build_service();
    let router = intake_router_with_service(service);

    let response = router
        .clone()
        .oneshot(json_request(
            "/api/v1/financing/estimate",
            json!({ "program_id": "blanqueamiento-express" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .oneshot(json_request(
            "/api/v1/financing/estimate",
            json!({ "program_id": "align-pro", "installments": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = read_json_body(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap_or_default()
        .contains("5 installments"));
}

#[tokio::test]
async fn wizard_endpoint_threads_session_state() {
    let (service, _, _) = build_service();
    let router = intake_router_with_service(service);

    let response = router
        .clone()
        .oneshot(json_request(
            "/api/v1/wizard/events",
            json!({ "event": { "type": "select_reason", "reason": "estetica" } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = read_json_body(response).await;
    assert_eq!(session["step"], "reason");
    assert_eq!(session["reason"], "estetica");

    let response = router
        .clone()
        .oneshot(json_request(
            "/api/v1/wizard/events",
            json!({ "session": session, "event": { "type": "advance" } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = read_json_body(response).await;
    assert_eq!(session["step"], "symptoms");

    let response = router
        .oneshot(json_request(
            "/api/v1/wizard/events",
            json!({ "session": session, "event": { "type": "choose_financing" } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn wizard_validation_errors_are_unprocessable() {
    let (service, _, _) = build_service();
    let response = intake_router_with_service(service)
        .oneshot(json_request(
            "/api/v1/wizard/events",
            json!({ "event": { "type": "advance" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = read_json_body(response).await;
    assert_eq!(json["error"], "choose a consultation reason first");
}

#[tokio::test]
async fn submit_and_fetch_lead_round_trip() {
    let (service, _, _) = build_service();
    let router = intake_router_with_service(service);

    let response = router
        .clone()
        .oneshot(json_request(
            "/api/v1/leads",
            serde_json::to_value(lead_submission()).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let created = read_json_body(response).await;
    assert_eq!(created["status"], "received");
    assert_eq!(created["source"], "diagnosis");
    assert_eq!(created["program"], "Programa Zero Caries");
    assert_eq!(created["financing_summary"], "6 cuotas de $50.000 (total $300.000)");
    assert!(created.get("contact").is_none());
    assert!(created.get("appointment").is_none());
    assert!(created["whatsapp_url"]
        .as_str()
        .unwrap_or_default()
        .starts_with("https://wa.me/56922223333?text="));

    let lead_id = created["lead_id"].as_str().expect("lead id").to_string();
    let response = router
        .oneshot(
            Request::get(format!("/api/v1/leads/{lead_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = read_json_body(response).await;
    assert_eq!(fetched["lead_id"], lead_id);
    assert!(fetched.get("whatsapp_url").is_none());
}

#[tokio::test]
async fn missing_lead_returns_not_found() {
    let (service, _, _) = build_service();
    let response = router::lead_status_handler::<MemoryRepository, MemoryBooking, MemoryNotifications>(
        State(Arc::new(service)),
        Path("lead-424242".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submit_lead_maps_port_failures() {
    let unavailable = IntakeService::new(
        engine(),
        Arc::new(UnavailableRepository),
        Arc::new(MemoryBooking),
        Arc::new(MemoryNotifications::default()),
        CLINIC_NUMBER,
    );
    let response = router::submit_lead_handler::<
        UnavailableRepository,
        MemoryBooking,
        MemoryNotifications,
    >(State(Arc::new(unavailable)), axum::Json(lead_submission()))
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let full = IntakeService::new(
        engine(),
        Arc::new(MemoryRepository::default()),
        Arc::new(FullAgenda),
        Arc::new(MemoryNotifications::default()),
        CLINIC_NUMBER,
    );
    let mut submission = lead_submission();
    submission.request_booking = true;
    let response = router::submit_lead_handler::<MemoryRepository, FullAgenda, MemoryNotifications>(
        State(Arc::new(full)),
        axum::Json(submission),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_phone_is_unprocessable() {
    let (service, _, _) = build_service();
    let mut submission = lead_submission();
    submission.contact.phone = "12-34".to_string();

    let response = intake_router_with_service(service)
        .oneshot(json_request(
            "/api/v1/leads",
            serde_json::to_value(submission).unwrap(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn second_opinion_is_accepted_with_document_count() {
    let (service, _, _) = build_service();
    let payload = json!({
        "contact": { "name": "Pedro Soto", "phone": "+56 2 2345 6789" },
        "notes": "Me indicaron extraer dos muelas.",
        "documents": [
            { "file_name": "radiografia.jpg", "size_bytes": 2_000_000 },
            { "file_name": "plan.pdf", "size_bytes": 150_000 },
            { "file_name": "cbct.dcm", "size_bytes": 12_000_000 }
        ]
    });

    let response = intake_router_with_service(service)
        .oneshot(json_request("/api/v1/second-opinion", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = read_json_body(response).await;
    assert_eq!(json["status"], "awaiting_review");
    assert_eq!(json["source"], "second_opinion");
    assert_eq!(json["document_count"], 3);
    assert!(json.get("program").is_none());
}

#[tokio::test]
async fn oversized_second_opinion_document_is_rejected() {
    let (service, _, _) = build_service();
    let payload = json!({
        "contact": { "name": "Pedro Soto", "phone": "+56 2 2345 6789" },
        "documents": [
            { "file_name": "cbct.dcm", "size_bytes": 16 * 1024 * 1024 }
        ]
    });

    let response = intake_router_with_service(service)
        .oneshot(json_request("/api/v1/second-opinion", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = read_json_body(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap_or_default()
        .contains("15 MiB"));
}

#[tokio::test]
async fn recent_leads_lists_newest_first_without_contact_details() {
    let (service, _, _) = build_service();
    let first = service.submit_lead(lead_submission()).expect("first lead");
    let second = service
        .submit_second_opinion(super::common::second_opinion_request())
        .expect("second opinion");

    let response = intake_router_with_service(service)
        .oneshot(
            Request::get("/api/v1/leads?limit=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json_body(response).await;
    let views = json.as_array().expect("array payload");
    assert_eq!(views.len(), 2);
    assert_eq!(views[0]["lead_id"], second.lead_id.0.as_str());
    assert_eq!(views[1]["lead_id"], first.lead_id.0.as_str());
    assert!(views.iter().all(|view| view.get("contact").is_none()));
    assert!(views.iter().all(|view| view.get("whatsapp_url").is_none()));
    let body = json.to_string();
    assert!(!body.contains("Camila"));
    assert!(!body.contains("Rojas"));
    assert!(!body.contains("56987654321"));
}

#[tokio::test]
async fn recent_leads_handler_surfaces_repository_outage() {
    let service = IntakeService::new(
        engine(),
        Arc::new(UnavailableRepository),
        Arc::new(MemoryBooking),
        Arc::new(MemoryNotifications::default()),
        CLINIC_NUMBER,
    );
    let response = router::recent_leads_handler::<
        UnavailableRepository,
        MemoryBooking,
        MemoryNotifications,
    >(State(Arc::new(service)), Ok(Query(RecentQuery::default())))
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
