//! Servicebook over HTTP: services, attendance lists, alerts and statistics.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{body_json, get_auth, post_json_auth, put_json_auth};
use serde_json::{json, Value};
use sqlx::PgPool;

async fn create(app: &Router, uri: &str, body: Value, token: &str) -> Value {
    let response = post_json_auth(app, uri, body, token).await;
    assert_eq!(response.status(), StatusCode::CREATED, "POST {uri}");
    body_json(response).await["data"].clone()
}

async fn member(app: &Router, token: &str, name: &str) -> i64 {
    create(app, "/api/v1/members", json!({ "name": name, "lastname": "Test" }), token).await["id"]
        .as_i64()
        .unwrap()
}

async fn service(app: &Router, token: &str, day: &str) -> i64 {
    create(
        app,
        "/api/v1/servicebook/services",
        json!({
            "start": format!("{day}T18:00:00Z"),
            "end": format!("{day}T19:30:00Z"),
            "place": "Gerätehaus",
            "topic": "Knotenkunde"
        }),
        token,
    )
    .await["id"]
        .as_i64()
        .unwrap()
}

async fn replace(
    app: &Router,
    token: &str,
    service_id: i64,
    entries: Value,
) -> axum::response::Response {
    put_json_auth(
        app,
        &format!("/api/v1/servicebook/services/{service_id}/attendance"),
        json!({ "entries": entries }),
        token,
    )
    .await
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_service_must_not_end_before_start(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;

    let response = post_json_auth(
        &app,
        "/api/v1/servicebook/services",
        json!({ "start": "2025-03-01T18:00:00Z", "end": "2025-03-01T17:00:00Z", "topic": "Funk" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let id = service(&app, &token, "2025-03-01").await;
    let response = put_json_auth(
        &app,
        &format!("/api/v1/servicebook/services/{id}"),
        json!({ "end": "2025-03-01T12:00:00Z" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_defaults_follow_configured_times(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;

    let response = get_auth(&app, "/api/v1/servicebook/services/defaults?date=2025-05-02", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["start"], "2025-05-02T18:00:00Z");
    assert_eq!(json["data"]["end"], "2025-05-02T19:30:00Z");

    put_json_auth(
        &app,
        "/api/v1/settings/service",
        json!({ "service_start_time": "22:00", "service_end_time": "01:00" }),
        &token,
    )
    .await;
    let json = body_json(
        get_auth(&app, "/api/v1/servicebook/services/defaults?date=2025-05-02", &token).await,
    )
    .await;
    assert_eq!(json["data"]["start"], "2025-05-02T22:00:00Z");
    assert_eq!(json["data"]["end"], "2025-05-03T01:00:00Z");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_attendance_list_is_replaced(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;
    let tim = member(&app, &token, "Tim").await;
    let ela = member(&app, &token, "Ela").await;
    let id = service(&app, &token, "2025-04-04").await;

    let response = replace(
        &app,
        &token,
        id,
        json!([{ "member_id": tim, "state": "A" }, { "member_id": ela, "state": "E" }]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 2);

    let response = replace(&app, &token, id, json!([{ "member_id": tim, "state": "F" }])).await;
    let list = body_json(response).await["data"].as_array().unwrap().clone();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["member_id"], tim);
    assert_eq!(list[0]["state"], "F");

    let json = body_json(get_auth(&app, &format!("/api/v1/servicebook/services/{id}"), &token).await).await;
    assert_eq!(json["data"]["summary"], json!({ "A": 0, "E": 0, "F": 1 }));

    let response = replace(
        &app,
        &token,
        id,
        json!([{ "member_id": tim, "state": "A" }, { "member_id": tim, "state": "E" }]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = replace(&app, &token, id, json!([{ "member_id": ela, "state": "X" }])).await;
    assert!(response.status().is_client_error());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_alert_after_repeated_absences(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;
    let tim = member(&app, &token, "Tim").await;

    for (day, state) in [("2025-01-10", "A"), ("2025-01-17", "E"), ("2025-01-24", "F")] {
        let id = service(&app, &token, day).await;
        replace(&app, &token, id, json!([{ "member_id": tim, "state": state }])).await;
    }

    let uri = format!("/api/v1/servicebook/members/{tim}/alert");
    let json = body_json(get_auth(&app, &uri, &token).await).await;
    assert_eq!(json["data"]["alert"], false);
    assert_eq!(json["data"]["absences"], 2);

    let id = service(&app, &token, "2025-01-31").await;
    replace(&app, &token, id, json!([{ "member_id": tim, "state": "F" }])).await;
    let json = body_json(get_auth(&app, &uri, &token).await).await;
    assert_eq!(json["data"]["alert"], true);
    assert_eq!(json["data"]["threshold"], 3);

    // Only the most recent entries count.
    put_json_auth(
        &app,
        "/api/v1/settings/members",
        json!({ "alert_threshold_last_entries": 2 }),
        &token,
    )
    .await;
    let json = body_json(get_auth(&app, &uri, &token).await).await;
    assert_eq!(json["data"]["alert"], false);
    assert_eq!(json["data"]["inspected"], 2);

    let json = body_json(
        get_auth(&app, &format!("/api/v1/servicebook/members/{tim}"), &token).await,
    )
    .await;
    assert_eq!(json["data"]["counts"], json!({ "A": 1, "E": 1, "F": 2 }));
    assert_eq!(json["data"]["history"].as_array().unwrap().len(), 4);
    assert_eq!(json["data"]["history"][0]["state"], "F");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_members_read_only_their_own_attendance(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let admin = common::admin_token(&pool, &app).await;
    let user = common::create_user(&pool, "lisa", false).await;
    let own = create(
        &app,
        "/api/v1/members",
        json!({ "name": "Lisa", "lastname": "Berg", "user_id": user.id }),
        &admin,
    )
    .await["id"]
        .as_i64()
        .unwrap();
    let other = member(&app, &admin, "Paul").await;

    let token = common::login(&app, "lisa").await;
    let response = get_auth(&app, &format!("/api/v1/servicebook/members/{own}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = get_auth(&app, &format!("/api/v1/servicebook/members/{other}"), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_statistics(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;
    let tim = member(&app, &token, "Tim").await;
    let ela = member(&app, &token, "Ela").await;

    let first = service(&app, &token, "2025-02-07").await;
    replace(
        &app,
        &token,
        first,
        json!([{ "member_id": tim, "state": "A" }, { "member_id": ela, "state": "F" }]),
    )
    .await;
    let second = service(&app, &token, "2025-02-14").await;
    replace(
        &app,
        &token,
        second,
        json!([{ "member_id": tim, "state": "A" }, { "member_id": ela, "state": "A" }]),
    )
    .await;

    let json = body_json(get_auth(&app, "/api/v1/servicebook/statistics/top", &token).await).await;
    let top = json["data"].as_array().unwrap();
    assert_eq!(top[0]["member_id"], tim);
    assert_eq!(top[0]["count"], 2);

    let json = body_json(
        get_auth(&app, "/api/v1/servicebook/statistics/top?state=F", &token).await,
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["member_id"], ela);

    let json = body_json(
        get_auth(
            &app,
            "/api/v1/servicebook/statistics/series?from=2025-02-01&to=2025-02-28",
            &token,
        )
        .await,
    )
    .await;
    assert_eq!(json["data"]["dates"], json!(["2025-02-07", "2025-02-14"]));
    assert_eq!(json["data"]["A"], json!([1, 2]));
    assert_eq!(json["data"]["F"], json!([1, 0]));

    let response = get_auth(
        &app,
        "/api/v1/servicebook/statistics/series?from=2025-03-01&to=2025-02-01",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
