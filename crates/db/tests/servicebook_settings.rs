//! Servicebook attendance and stored preferences.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use clubhouse_core::attendance::AttendanceState;
use clubhouse_core::preferences::{MEMBERS_ALERT_THRESHOLD, SERVICE_START_TIME};
use clubhouse_db::models::member::CreateMember;
use clubhouse_db::models::service::{AttendanceEntry, CreateService};
use clubhouse_db::repositories::{AttendanceRepo, MemberRepo, PreferenceRepo, ServiceRepo};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn member(pool: &PgPool, name: &str) -> i64 {
    MemberRepo::create(
        pool,
        &CreateMember {
            name: name.into(),
            lastname: "Test".into(),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .id
}

async fn service(pool: &PgPool, days_ago: i64) -> i64 {
    let start = Utc.with_ymd_and_hms(2025, 5, 20, 18, 0, 0).unwrap() - Duration::days(days_ago);
    service_at(pool, start).await
}

async fn service_at(pool: &PgPool, start: DateTime<Utc>) -> i64 {
    ServiceRepo::create(
        pool,
        &CreateService {
            start_at: start,
            end_at: start + Duration::minutes(90),
            place: "Gerätehaus".into(),
            topic: format!("Übung {}", start.format("%d.%m. %H:%M")),
            description: None,
            events: None,
            operations_managers: vec![],
        },
    )
    .await
    .unwrap()
    .id
}

fn entry(member_id: i64, state: AttendanceState) -> AttendanceEntry {
    AttendanceEntry { member_id, state }
}

// ---------------------------------------------------------------------------
// Attendance
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_replace_attendance_drops_unlisted_members(pool: PgPool) {
    let a = member(&pool, "Anna").await;
    let b = member(&pool, "Ben").await;
    let service_id = service(&pool, 0).await;

    AttendanceRepo::replace_for_service(
        &pool,
        service_id,
        &[entry(a, AttendanceState::Present), entry(b, AttendanceState::Missing)],
    )
    .await
    .unwrap();
    let rows = AttendanceRepo::replace_for_service(
        &pool,
        service_id,
        &[entry(a, AttendanceState::Excused)],
    )
    .await
    .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].member_id, a);
    assert_eq!(rows[0].state, "E");

    let summary = AttendanceRepo::summaries(&pool, &[service_id]).await.unwrap();
    let counts = summary.get(&service_id).copied().unwrap_or_default();
    assert_eq!((counts.present, counts.excused, counts.missing), (0, 1, 0));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_recent_states_newest_first(pool: PgPool) {
    let a = member(&pool, "Anna").await;
    let older = service(&pool, 14).await;
    let newer = service(&pool, 7).await;

    AttendanceRepo::set_state(&pool, older, a, AttendanceState::Present).await.unwrap();
    AttendanceRepo::set_state(&pool, newer, a, AttendanceState::Missing).await.unwrap();

    let states = AttendanceRepo::recent_states(&pool, a, 10).await.unwrap();
    assert_eq!(states, vec![AttendanceState::Missing, AttendanceState::Present]);

    let counts = AttendanceRepo::member_counts(&pool, a).await.unwrap();
    assert_eq!(counts.present + counts.missing, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_set_state_upserts(pool: PgPool) {
    let a = member(&pool, "Anna").await;
    let service_id = service(&pool, 0).await;

    let first = AttendanceRepo::set_state(&pool, service_id, a, AttendanceState::Missing)
        .await
        .unwrap();
    let second = AttendanceRepo::set_state(&pool, service_id, a, AttendanceState::Excused)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.state, "E");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_counts_per_service_keeps_same_day_and_empty_services(pool: PgPool) {
    let a = member(&pool, "Anna").await;
    let b = member(&pool, "Ben").await;
    let morning = service_at(&pool, Utc.with_ymd_and_hms(2025, 5, 17, 9, 0, 0).unwrap()).await;
    let evening = service_at(&pool, Utc.with_ymd_and_hms(2025, 5, 17, 18, 0, 0).unwrap()).await;
    let empty = service_at(&pool, Utc.with_ymd_and_hms(2025, 5, 18, 18, 0, 0).unwrap()).await;

    AttendanceRepo::set_state(&pool, morning, a, AttendanceState::Present).await.unwrap();
    AttendanceRepo::set_state(&pool, morning, b, AttendanceState::Missing).await.unwrap();
    AttendanceRepo::set_state(&pool, evening, a, AttendanceState::Excused).await.unwrap();

    let rows = AttendanceRepo::counts_per_service(&pool, None, None).await.unwrap();
    let ids: Vec<i64> = rows.iter().map(|r| r.service_id).collect();
    assert_eq!(ids, vec![morning, evening, empty]);
    assert_eq!((rows[0].present, rows[0].excused, rows[0].missing), (1, 0, 1));
    assert_eq!((rows[1].present, rows[1].excused, rows[1].missing), (0, 1, 0));
    assert_eq!((rows[2].present, rows[2].excused, rows[2].missing), (0, 0, 0));

    let day = NaiveDate::from_ymd_opt(2025, 5, 17);
    let rows = AttendanceRepo::counts_per_service(&pool, day, day).await.unwrap();
    assert_eq!(rows.len(), 2);
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_preference_defaults_and_overrides(pool: PgPool) {
    assert_eq!(PreferenceRepo::get_i64(&pool, MEMBERS_ALERT_THRESHOLD).await.unwrap(), 3);

    PreferenceRepo::upsert(&pool, MEMBERS_ALERT_THRESHOLD, &json!(5), None)
        .await
        .unwrap();
    PreferenceRepo::upsert(&pool, MEMBERS_ALERT_THRESHOLD, &json!(6), None)
        .await
        .unwrap();
    assert_eq!(PreferenceRepo::get_i64(&pool, MEMBERS_ALERT_THRESHOLD).await.unwrap(), 6);

    assert!(PreferenceRepo::reset(&pool, MEMBERS_ALERT_THRESHOLD).await.unwrap());
    assert_eq!(PreferenceRepo::get_i64(&pool, MEMBERS_ALERT_THRESHOLD).await.unwrap(), 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_time_preference_default(pool: PgPool) {
    assert_eq!(
        PreferenceRepo::get_string(&pool, SERVICE_START_TIME).await.unwrap(),
        "18:00"
    );
}
