mod common;

use axum::http::Method;
use numbet::models::users::Role;
use rust_decimal::Decimal;
use serde_json::json;

use common::{number, spawn_app};

#[tokio::test]
async fn drawn_results_enter_history_and_holds_do_not() {
    let app = spawn_app();
    let admin = app.seed_user("Ada", "ada@example.com", Role::Admin, 0);
    let cookie = app.session(&admin);

    let hold = app
        .post_as(
            "/api/results",
            json!({ "gameName": "Morning", "displayTime": "10:00", "status": "hold" }),
            &cookie,
        )
        .await;
    assert_eq!(hold.status, 200);
    assert_eq!(hold.json()["ok"], true);

    let draw = app
        .post_as(
            "/api/results",
            json!({ "gameName": "morning", "number": "427", "displayTime": "10:00", "status": "draw" }),
            &cookie,
        )
        .await;
    assert_eq!(draw.json()["result"]["number"], "427");

    let board = app.get("/api/results/show").await.json();
    assert_eq!(board["ok"], true);
    assert_eq!(board["current"].as_array().unwrap().len(), 1);
    assert_eq!(board["current"][0]["status"], "draw");
    assert_eq!(board["history"].as_array().unwrap().len(), 1);
    assert_eq!(board["history"][0]["number"], "427");
}

#[tokio::test]
async fn publishing_requires_admin_and_a_number_for_draws() {
    let app = spawn_app();
    let admin = app.seed_user("Ada", "ada@example.com", Role::Admin, 0);

    let anonymous = app
        .post("/api/results", json!({ "gameName": "noon", "displayTime": "12:00", "status": "hold" }))
        .await;
    assert_eq!(anonymous.status, 401);

    let missing_number = app
        .post_as(
            "/api/results",
            json!({ "gameName": "noon", "displayTime": "12:00", "status": "draw" }),
            &app.session(&admin),
        )
        .await;
    assert_eq!(missing_number.status, 400);
    assert_eq!(missing_number.json()["ok"], false);
}

#[tokio::test]
async fn growth_reports_the_latest_rate() {
    let app = spawn_app();

    let empty = app.get("/api/growth").await.json();
    assert!(empty["data"].is_null());

    app.store.insert_growth(Decimal::new(15, 1), None).unwrap();
    app.store
        .insert_growth(Decimal::new(25, 1), Some("weekend".to_string()))
        .unwrap();

    let latest = app.get("/api/growth").await.json();
    assert_eq!(number(&latest["data"]["rate"]), 2.5);
    assert_eq!(latest["data"]["note"], "weekend");
}

#[tokio::test]
async fn notices_are_managed_by_admins() {
    let app = spawn_app();
    let admin = app.seed_user("Ada", "ada@example.com", Role::Admin, 0);
    let cookie = app.session(&admin);

    let empty = app
        .post_as("/api/notices", json!({ "message": "   " }), &cookie)
        .await;
    assert_eq!(empty.status, 400);

    let created = app
        .post_as("/api/notices", json!({ "message": "Draw at 10:00" }), &cookie)
        .await;
    assert_eq!(created.status, 201);
    let id = created.json()["data"]["id"].as_str().unwrap().to_string();

    let listed = app.get("/api/notices").await.json();
    assert_eq!(listed["data"][0]["message"], "Draw at 10:00");

    let uri = format!("/api/notices/{}", id);
    let deleted = app.request(Method::DELETE, &uri, None, Some(&cookie)).await;
    assert_eq!(deleted.status, 200);
    let again = app.request(Method::DELETE, &uri, None, Some(&cookie)).await;
    assert_eq!(again.status, 404);
}
