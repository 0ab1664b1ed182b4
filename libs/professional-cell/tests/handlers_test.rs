use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
};
use chrono::{Duration, NaiveTime, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use professional_cell::professional_routes;
use shared_database::SchedulingStore;
use shared_models::{Appointment, AppointmentFilter, AppointmentStatus};
use shared_utils::test_utils::TestContext;

fn request(method: &str, uri: &str, bearer: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", bearer)
        .header("Content-Type", "application/json");
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_professional_with_working_days() {
    let ctx = TestContext::new().await;

    let response = professional_routes(ctx.state())
        .oneshot(request(
            "POST",
            "/",
            &ctx.bearer(),
            Some(json!({
                "name": "Dra. Ana Lima",
                "specialty": "Pediatria",
                "crm": "12345-SP",
                "workingDays": [
                    { "dayOfWeek": 3, "startTime": "14:00", "endTime": "18:00" },
                    { "dayOfWeek": 1, "startTime": "08:00", "endTime": "12:00" }
                ]
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["workingDays"][0]["dayOfWeek"], 1);
    assert_eq!(body["workingDays"][1]["startTime"], "14:00");
}

#[tokio::test]
async fn invalid_rule_is_a_validation_error() {
    let ctx = TestContext::new().await;

    let response = professional_routes(ctx.state())
        .oneshot(request(
            "POST",
            "/",
            &ctx.bearer(),
            Some(json!({
                "name": "Dr. Bruno",
                "workingDays": [{ "dayOfWeek": 9, "startTime": "08:00", "endTime": "12:00" }]
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_replaces_all_rules() {
    let ctx = TestContext::new().await;
    let professional = ctx.seed_professional("Dr. Carlos", &[1, 2, 3], "08:00", "12:00").await;

    let response = professional_routes(ctx.state())
        .oneshot(request(
            "PUT",
            &format!("/{}", professional.id),
            &ctx.bearer(),
            Some(json!({
                "name": "Dr. Carlos",
                "workingDays": [{ "dayOfWeek": 5, "startTime": "09:00", "endTime": "11:00" }]
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let stored = ctx.store.get_professional(ctx.clinic.id, professional.id).await.unwrap().unwrap();
    assert_eq!(stored.working_days.len(), 1);
    assert_eq!(stored.working_days[0].day_of_week, 5);
}

#[tokio::test]
async fn delete_removes_rules_but_keeps_appointments() {
    let ctx = TestContext::new().await;
    let professional = ctx.seed_professional("Dr. Davi", &[1], "08:00", "12:00").await;
    let patient = ctx.seed_patient("Maria", "1", None).await;
    let now = Utc::now();
    ctx.store
        .insert_appointment(Appointment {
            id: Uuid::new_v4(),
            clinic_id: ctx.clinic.id,
            patient_id: patient.id,
            profissional_id: professional.id,
            date: now.date_naive() + Duration::days(3),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            status: AppointmentStatus::Agendado,
            notes: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    let response = professional_routes(ctx.state())
        .oneshot(request("DELETE", &format!("/{}", professional.id), &ctx.bearer(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(ctx.store.get_professional(ctx.clinic.id, professional.id).await.unwrap().is_none());
    let history = ctx
        .store
        .list_appointments(ctx.clinic.id, &AppointmentFilter::default())
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].appointment.profissional_id, professional.id);

    let again = professional_routes(ctx.state())
        .oneshot(request("DELETE", &format!("/{}", professional.id), &ctx.bearer(), None))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_is_ordered_by_name_and_searchable() {
    let ctx = TestContext::new().await;
    ctx.seed_professional("Zélia", &[1], "08:00", "12:00").await;
    ctx.seed_professional("Ana", &[1], "08:00", "12:00").await;

    let response = professional_routes(ctx.state())
        .oneshot(request("GET", "/", &ctx.bearer(), None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body[0]["name"], "Ana");
    assert_eq!(body[1]["name"], "Zélia");

    let response = professional_routes(ctx.state())
        .oneshot(request("GET", "/?search=z%C3%A9l", &ctx.bearer(), None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
}
