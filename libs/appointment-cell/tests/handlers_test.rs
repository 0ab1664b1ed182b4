use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::appointment_routes;
use shared_database::SchedulingStore;
use shared_models::notification::NotificationError;
use shared_models::{Appointment, AppointmentDetails, AppointmentStatus, Patient, Professional};
use shared_utils::test_utils::{RecordingNotifier, TestContext, TestUser, JwtTestUtils};

// 2030-03-04 is a Monday.
const MONDAY: &str = "2030-03-04";
const TUESDAY: &str = "2030-03-05";

fn app(ctx: &TestContext) -> Router {
    appointment_routes(ctx.state())
}

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

async fn seed(ctx: &TestContext) -> (Patient, Professional) {
    let patient = ctx.seed_patient("Maria Silva", "12345678900", Some("11999998888")).await;
    let professional = ctx.seed_professional("Dra. Ana", &[1], "08:00", "10:00").await;
    (patient, professional)
}

async fn insert(ctx: &TestContext, patient: &Patient, professional: &Professional, date: NaiveDate, time: &str) -> AppointmentDetails {
    let now = Utc::now();
    ctx.store
        .insert_appointment(Appointment {
            id: Uuid::new_v4(),
            clinic_id: ctx.clinic.id,
            patient_id: patient.id,
            profissional_id: professional.id,
            date,
            time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            status: AppointmentStatus::Agendado,
            notes: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap()
}

fn booking(patient: &Patient, professional: &Professional, date: &str, time: &str) -> Value {
    json!({
        "patientId": patient.id,
        "profissionalId": professional.id,
        "date": date,
        "time": time,
        "notes": "Primeira consulta"
    })
}

// ==============================================================================
// AVAILABLE TIMES
// ==============================================================================

#[tokio::test]
async fn available_times_subtracts_booked_slots() {
    let ctx = TestContext::new().await;
    let (patient, professional) = seed(&ctx).await;
    let monday = NaiveDate::parse_from_str(MONDAY, "%Y-%m-%d").unwrap();
    insert(&ctx, &patient, &professional, monday, "08:30").await;

    let response = app(&ctx)
        .oneshot(request(
            "GET",
            &format!("/available-times?profissionalId={}&date={}", professional.id, MONDAY),
            &ctx.bearer(),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "availableTimes": ["08:00", "09:00", "09:30"] })
    );
}

#[tokio::test]
async fn available_times_is_empty_on_a_day_off() {
    let ctx = TestContext::new().await;
    let (_, professional) = seed(&ctx).await;

    let response = app(&ctx)
        .oneshot(request(
            "GET",
            &format!("/available-times?profissionalId={}&date={}", professional.id, TUESDAY),
            &ctx.bearer(),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(json_body(response).await["availableTimes"], json!([]));
}

#[tokio::test]
async fn cancelled_appointments_free_their_slot() {
    let ctx = TestContext::new().await;
    let (patient, professional) = seed(&ctx).await;
    let monday = NaiveDate::parse_from_str(MONDAY, "%Y-%m-%d").unwrap();
    let booked = insert(&ctx, &patient, &professional, monday, "09:00").await;
    ctx.store
        .transition_status(booked.appointment.id, AppointmentStatus::Agendado, AppointmentStatus::Cancelado)
        .await
        .unwrap();

    let response = app(&ctx)
        .oneshot(request(
            "GET",
            &format!("/available-times?profissionalId={}&date={}", professional.id, MONDAY),
            &ctx.bearer(),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(json_body(response).await["availableTimes"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn available_times_validates_its_query() {
    let ctx = TestContext::new().await;
    let (_, professional) = seed(&ctx).await;

    let missing = app(&ctx)
        .oneshot(request("GET", &format!("/available-times?profissionalId={}", professional.id), &ctx.bearer(), None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let bad_date = app(&ctx)
        .oneshot(request(
            "GET",
            &format!("/available-times?profissionalId={}&date=04-03-2030", professional.id),
            &ctx.bearer(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(bad_date.status(), StatusCode::BAD_REQUEST);

    let unknown = app(&ctx)
        .oneshot(request(
            "GET",
            &format!("/available-times?profissionalId={}&date={}", Uuid::new_v4(), MONDAY),
            &ctx.bearer(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[tokio::test]
async fn booked_slot_disappears_from_availability() {
    let ctx = TestContext::new().await;
    let (patient, professional) = seed(&ctx).await;

    let response = app(&ctx)
        .oneshot(request("POST", "/", &ctx.bearer(), Some(booking(&patient, &professional, MONDAY, "09:30"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "AGENDADO");
    assert_eq!(body["time"], "09:30");
    assert_eq!(body["patient"]["name"], "Maria Silva");
    assert_eq!(body["profissional"]["name"], "Dra. Ana");
    assert_eq!(body["notes"], "Primeira consulta");

    let response = app(&ctx)
        .oneshot(request(
            "GET",
            &format!("/available-times?profissionalId={}&date={}", professional.id, MONDAY),
            &ctx.bearer(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(
        json_body(response).await["availableTimes"],
        json!(["08:00", "08:30", "09:00"])
    );
}

#[tokio::test]
async fn second_booking_for_the_same_slot_conflicts() {
    let ctx = TestContext::new().await;
    let (patient, professional) = seed(&ctx).await;
    let other = ctx.seed_patient("João", "98765432100", None).await;

    let first = app(&ctx)
        .oneshot(request("POST", "/", &ctx.bearer(), Some(booking(&patient, &professional, MONDAY, "08:00"))))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app(&ctx)
        .oneshot(request("POST", "/", &ctx.bearer(), Some(booking(&other, &professional, MONDAY, "08:00"))))
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let body = json_body(second).await;
    assert_eq!(body["code"], "SLOT_CONFLICT");
    assert_eq!(body["error"], "Já existe um agendamento neste horário");
}

#[tokio::test]
async fn booking_validation_runs_in_order() {
    let ctx = TestContext::new().await;
    let (patient, professional) = seed(&ctx).await;

    let cases = vec![
        (
            json!({ "patientId": patient.id, "date": MONDAY, "time": "08:00" }),
            "Campos obrigatórios: paciente, profissional, data e horário",
        ),
        (
            json!({ "patientId": patient.id, "profissionalId": professional.id, "date": MONDAY, "time": "" }),
            "Campos obrigatórios: paciente, profissional, data e horário",
        ),
        (
            json!({ "patientId": patient.id, "profissionalId": professional.id, "date": "2030-02-30", "time": "08:00" }),
            "Data inválida: 2030-02-30",
        ),
        (
            json!({ "patientId": patient.id, "profissionalId": professional.id, "date": MONDAY, "time": "8h" }),
            "Horário inválido: 8h",
        ),
        (
            json!({ "patientId": Uuid::new_v4(), "profissionalId": Uuid::new_v4(), "date": MONDAY, "time": "08:00" }),
            "Paciente não encontrado ou não pertence à clínica",
        ),
        (
            json!({ "patientId": patient.id, "profissionalId": Uuid::new_v4(), "date": MONDAY, "time": "08:00" }),
            "Profissional não encontrado ou não pertence à clínica",
        ),
    ];

    for (body, expected) in cases {
        let response = app(&ctx)
            .oneshot(request("POST", "/", &ctx.bearer(), Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], expected);
    }

    assert!(ctx.store.booked_times(professional.id, NaiveDate::parse_from_str(MONDAY, "%Y-%m-%d").unwrap()).await.unwrap().is_empty());
}

#[tokio::test]
async fn booking_cannot_reference_another_clinic() {
    let ctx = TestContext::new().await;
    let (patient, professional) = seed(&ctx).await;

    let outsider = TestUser::staff("outra@clinica.com", Some(Uuid::new_v4()));
    let token = JwtTestUtils::create_test_token(&outsider, &ctx.config.supabase_jwt_secret, None);

    let response = app(&ctx)
        .oneshot(request(
            "POST",
            "/",
            &format!("Bearer {}", token),
            Some(booking(&patient, &professional, MONDAY, "08:00")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Paciente não encontrado ou não pertence à clínica");
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let ctx = TestContext::new().await;

    let response = app(&ctx)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_without_clinic_gets_bad_request() {
    let ctx = TestContext::new().await;
    let user = TestUser::staff("sem.clinica@example.com", None);
    let token = JwtTestUtils::create_test_token(&user, &ctx.config.supabase_jwt_secret, None);

    let response = app(&ctx)
        .oneshot(request("GET", "/", &format!("Bearer {}", token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ==============================================================================
// LISTING, LOOKUP, STATUS
// ==============================================================================

#[tokio::test]
async fn list_is_ordered_and_filtered() {
    let ctx = TestContext::new().await;
    let (patient, professional) = seed(&ctx).await;
    let monday = NaiveDate::parse_from_str(MONDAY, "%Y-%m-%d").unwrap();
    let later_monday = monday + Duration::days(7);
    insert(&ctx, &patient, &professional, later_monday, "08:00").await;
    insert(&ctx, &patient, &professional, monday, "09:30").await;
    let early = insert(&ctx, &patient, &professional, monday, "08:00").await;
    ctx.store
        .transition_status(early.appointment.id, AppointmentStatus::Agendado, AppointmentStatus::Confirmado)
        .await
        .unwrap();

    let all = json_body(app(&ctx).oneshot(request("GET", "/", &ctx.bearer(), None)).await.unwrap()).await;
    let times: Vec<(String, String)> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|a| (a["date"].as_str().unwrap().to_string(), a["time"].as_str().unwrap().to_string()))
        .collect();
    assert_eq!(
        times,
        vec![
            (MONDAY.to_string(), "08:00".to_string()),
            (MONDAY.to_string(), "09:30".to_string()),
            ("2030-03-11".to_string(), "08:00".to_string()),
        ]
    );

    let on_monday = json_body(
        app(&ctx)
            .oneshot(request("GET", &format!("/?date={}", MONDAY), &ctx.bearer(), None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(on_monday.as_array().unwrap().len(), 2);

    let confirmed = json_body(
        app(&ctx)
            .oneshot(request("GET", "/?status=CONFIRMADO", &ctx.bearer(), None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(confirmed.as_array().unwrap().len(), 1);
    assert_eq!(confirmed[0]["id"], json!(early.appointment.id));

    let invalid = app(&ctx)
        .oneshot(request("GET", "/?status=PERDIDO", &ctx.bearer(), None))
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lookup_is_scoped_to_the_clinic() {
    let ctx = TestContext::new().await;
    let (patient, professional) = seed(&ctx).await;
    let booked = insert(&ctx, &patient, &professional, NaiveDate::parse_from_str(MONDAY, "%Y-%m-%d").unwrap(), "08:00").await;

    let found = app(&ctx)
        .oneshot(request("GET", &format!("/{}", booked.appointment.id), &ctx.bearer(), None))
        .await
        .unwrap();
    assert_eq!(found.status(), StatusCode::OK);

    let outsider = TestUser::staff("outra@clinica.com", Some(Uuid::new_v4()));
    let token = JwtTestUtils::create_test_token(&outsider, &ctx.config.supabase_jwt_secret, None);
    let hidden = app(&ctx)
        .oneshot(request("GET", &format!("/{}", booked.appointment.id), &format!("Bearer {}", token), None))
        .await
        .unwrap();
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_changes_follow_the_lifecycle() {
    let ctx = TestContext::new().await;
    let (patient, professional) = seed(&ctx).await;
    let booked = insert(&ctx, &patient, &professional, NaiveDate::parse_from_str(MONDAY, "%Y-%m-%d").unwrap(), "08:00").await;
    let uri = format!("/{}/status", booked.appointment.id);

    for (status, expected) in [
        ("EM_ANDAMENTO", StatusCode::OK),
        ("FINALIZADO", StatusCode::OK),
        ("CANCELADO", StatusCode::BAD_REQUEST),
    ] {
        let response = app(&ctx)
            .oneshot(request("PATCH", &uri, &ctx.bearer(), Some(json!({ "status": status }))))
            .await
            .unwrap();
        assert_eq!(response.status(), expected, "moving to {}", status);
    }

    let stored = ctx.store.find_appointment(booked.appointment.id).await.unwrap().unwrap();
    assert_eq!(stored.appointment.status, AppointmentStatus::Finalizado);
}

// ==============================================================================
// REMINDERS
// ==============================================================================

#[tokio::test]
async fn reminder_is_sent_to_the_patient() {
    let ctx = TestContext::new().await;
    let (patient, professional) = seed(&ctx).await;
    let booked = insert(&ctx, &patient, &professional, NaiveDate::parse_from_str(MONDAY, "%Y-%m-%d").unwrap(), "09:00").await;

    let response = app(&ctx)
        .oneshot(request("POST", &format!("/{}/send-reminder", booked.appointment.id), &ctx.bearer(), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].phone, "11999998888");
    assert!(sent[0].message.contains("Lembrete de Consulta"));
    assert!(sent[0].message.contains("04/03/2030"));
    assert!(sent[0].message.contains(&ctx.clinic.name));
}

#[tokio::test]
async fn reminder_needs_a_phone_and_a_working_provider() {
    let ctx = TestContext::with_notifier(RecordingNotifier::failing(NotificationError::Timeout(2))).await;
    let (patient, professional) = seed(&ctx).await;
    let silent = ctx.seed_patient("Sem Telefone", "11122233344", None).await;
    let monday = NaiveDate::parse_from_str(MONDAY, "%Y-%m-%d").unwrap();

    let no_phone = insert(&ctx, &silent, &professional, monday, "08:00").await;
    let response = app(&ctx)
        .oneshot(request("POST", &format!("/{}/send-reminder", no_phone.appointment.id), &ctx.bearer(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(ctx.notifier.sent().is_empty());

    let with_phone = insert(&ctx, &patient, &professional, monday, "08:30").await;
    let response = app(&ctx)
        .oneshot(request("POST", &format!("/{}/send-reminder", with_phone.appointment.id), &ctx.bearer(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn confirmations_go_to_tomorrows_scheduled_patients() {
    let ctx = TestContext::new().await;
    let patient = ctx.seed_patient("Maria Silva", "12345678900", Some("11999998888")).await;
    let silent = ctx.seed_patient("Sem Telefone", "11122233344", None).await;
    let professional = ctx.seed_professional("Dra. Ana", &[0, 1, 2, 3, 4, 5, 6], "08:00", "12:00").await;

    let tomorrow = Utc::now().date_naive() + Duration::days(1);
    insert(&ctx, &patient, &professional, tomorrow, "08:00").await;
    insert(&ctx, &silent, &professional, tomorrow, "08:30").await;
    let confirmed = insert(&ctx, &patient, &professional, tomorrow, "09:00").await;
    ctx.store
        .transition_status(confirmed.appointment.id, AppointmentStatus::Agendado, AppointmentStatus::Confirmado)
        .await
        .unwrap();
    insert(&ctx, &patient, &professional, tomorrow + Duration::days(1), "08:00").await;

    let response = app(&ctx)
        .oneshot(request("POST", "/send-confirmations", &ctx.bearer(), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let summary = json_body(response).await;
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["sent"], 1);
    assert_eq!(summary["failed"], 0);
    assert_eq!(summary["skipped"], 1);
    assert_eq!(summary["results"][1]["status"], "skipped");

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].message.contains("CONFIRMAR"));
}
