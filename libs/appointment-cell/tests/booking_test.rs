use std::time::Duration;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use futures::future::join_all;

use appointment_cell::services::{AppointmentBookingService, SlotAllocatorService};
use appointment_cell::{AppointmentError, BookAppointmentRequest};
use shared_config::AppConfig;
use shared_utils::test_utils::{RecordingNotifier, TestConfig, TestContext};

const MONDAY: &str = "2030-03-04";

fn request(patient_id: uuid::Uuid, profissional_id: uuid::Uuid, time: &str) -> BookAppointmentRequest {
    BookAppointmentRequest {
        patient_id: Some(patient_id.to_string()),
        profissional_id: Some(profissional_id.to_string()),
        date: Some(MONDAY.to_string()),
        time: Some(time.to_string()),
        notes: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_for_one_slot_have_a_single_winner() {
    let ctx = TestContext::new().await;
    let professional = ctx.seed_professional("Dra. Ana", &[1], "08:00", "12:00").await;

    let mut patients = Vec::new();
    for i in 0..12 {
        patients.push(ctx.seed_patient(&format!("Paciente {}", i), &format!("000000000{:02}", i), None).await);
    }

    let attempts = patients.iter().map(|patient| {
        let state = ctx.state();
        let request = request(patient.id, professional.id, "10:00");
        let clinic_id = ctx.clinic.id;
        tokio::spawn(async move {
            AppointmentBookingService::new(&state)
                .book_appointment(clinic_id, request)
                .await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("booking task panicked"))
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert_matches!(result, Err(AppointmentError::SlotConflict));
    }

    let free = SlotAllocatorService::new(&ctx.state())
        .available_times(ctx.clinic.id, professional.id, NaiveDate::parse_from_str(MONDAY, "%Y-%m-%d").unwrap())
        .await
        .unwrap();
    assert_eq!(free.len(), 7);
    assert!(!free.contains(&chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap()));
}

#[tokio::test]
async fn different_slots_do_not_conflict() {
    let ctx = TestContext::new().await;
    let professional = ctx.seed_professional("Dra. Ana", &[1], "08:00", "12:00").await;
    let patient = ctx.seed_patient("Maria", "12345678900", None).await;
    let service = AppointmentBookingService::new(&ctx.state());

    service.book_appointment(ctx.clinic.id, request(patient.id, professional.id, "08:00")).await.unwrap();
    service.book_appointment(ctx.clinic.id, request(patient.id, professional.id, "08:30")).await.unwrap();

    assert_matches!(
        service.book_appointment(ctx.clinic.id, request(patient.id, professional.id, "08:00")).await,
        Err(AppointmentError::SlotConflict)
    );
}

#[tokio::test]
async fn a_time_with_seconds_holds_the_whole_slot() {
    let ctx = TestContext::new().await;
    let professional = ctx.seed_professional("Dra. Ana", &[1], "08:00", "12:00").await;
    let first = ctx.seed_patient("Maria", "12345678900", None).await;
    let second = ctx.seed_patient("João", "98765432100", None).await;
    let service = AppointmentBookingService::new(&ctx.state());

    let booked = service
        .book_appointment(ctx.clinic.id, request(first.id, professional.id, "10:00:30"))
        .await
        .unwrap();
    let ten = chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap();
    assert_eq!(booked.appointment.time, ten);

    let free = SlotAllocatorService::new(&ctx.state())
        .available_times(ctx.clinic.id, professional.id, NaiveDate::parse_from_str(MONDAY, "%Y-%m-%d").unwrap())
        .await
        .unwrap();
    assert!(!free.contains(&ten));

    assert_matches!(
        service.book_appointment(ctx.clinic.id, request(second.id, professional.id, "10:00")).await,
        Err(AppointmentError::SlotConflict)
    );
}

#[tokio::test]
async fn booking_notification_is_off_by_default() {
    let ctx = TestContext::new().await;
    let professional = ctx.seed_professional("Dra. Ana", &[1], "08:00", "12:00").await;
    let patient = ctx.seed_patient("Maria", "12345678900", Some("11999998888")).await;

    AppointmentBookingService::new(&ctx.state())
        .book_appointment(ctx.clinic.id, request(patient.id, professional.id, "09:00"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(ctx.notifier.sent().is_empty());
}

#[tokio::test]
async fn enabled_booking_notification_is_sent_in_the_background() {
    let config = AppConfig {
        notify_on_booking: true,
        ..TestConfig::default().to_app_config()
    };
    let ctx = TestContext::build(config, RecordingNotifier::new()).await;
    let professional = ctx.seed_professional("Dra. Ana", &[1], "08:00", "12:00").await;
    let patient = ctx.seed_patient("Maria", "12345678900", Some("11999998888")).await;

    AppointmentBookingService::new(&ctx.state())
        .book_appointment(ctx.clinic.id, request(patient.id, professional.id, "09:00"))
        .await
        .unwrap();

    for _ in 0..50 {
        if !ctx.notifier.sent().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].message.contains("Agendamento Confirmado"));
    assert!(sent[0].message.contains("09:00"));
}

#[tokio::test]
async fn failing_provider_does_not_fail_the_booking() {
    let config = AppConfig {
        notify_on_booking: true,
        ..TestConfig::default().to_app_config()
    };
    let notifier = RecordingNotifier::failing(shared_models::notification::NotificationError::NotConfigured);
    let ctx = TestContext::build(config, notifier).await;
    let professional = ctx.seed_professional("Dra. Ana", &[1], "08:00", "12:00").await;
    let patient = ctx.seed_patient("Maria", "12345678900", Some("11999998888")).await;

    let booked = AppointmentBookingService::new(&ctx.state())
        .book_appointment(ctx.clinic.id, request(patient.id, professional.id, "11:30"))
        .await;

    assert!(booked.is_ok());
}
