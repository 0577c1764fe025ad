mod common;

use axum::http::Method;
use numbet::models::users::Role;
use serde_json::json;

use common::{number, spawn_app};

#[tokio::test]
async fn create_conflicts_on_existing_name() {
    let app = spawn_app();
    let admin = app.seed_user("Ada", "ada@example.com", Role::Admin, 0);
    let cookie = app.session(&admin);

    let first = app
        .post_as("/api/multipliers", json!({ "name": "single", "value": 9 }), &cookie)
        .await;
    assert_eq!(first.status, 201);

    let second = app
        .post_as("/api/multipliers", json!({ "name": "single", "value": 12 }), &cookie)
        .await;
    assert_eq!(second.status, 409);

    let list = app.get("/api/multipliers").await.json();
    let multipliers = list["data"].as_array().unwrap();
    assert_eq!(multipliers.len(), 1);
    assert_eq!(number(&multipliers[0]["value"]), 9.0);
}

#[tokio::test]
async fn upsert_creates_then_overwrites() {
    let app = spawn_app();
    let admin = app.seed_user("Ada", "ada@example.com", Role::Admin, 0);
    let cookie = app.session(&admin);

    let created = app
        .request(
            Method::PATCH,
            "/api/multipliers/update",
            Some(json!({ "name": "double", "value": "90" })),
            Some(&cookie),
        )
        .await;
    assert_eq!(created.status, 200);
    let id = created.json()["data"]["id"].as_str().unwrap().to_string();

    let updated = app
        .request(
            Method::PATCH,
            "/api/multipliers/update",
            Some(json!({ "name": "double", "value": 95.5 })),
            Some(&cookie),
        )
        .await;
    assert_eq!(updated.status, 200);
    let body = updated.json();
    assert_eq!(body["data"]["id"], id);
    assert_eq!(number(&body["data"]["value"]), 95.5);
}

#[tokio::test]
async fn writes_require_an_admin_session() {
    let app = spawn_app();
    let user = app.seed_user("Ann", "ann@example.com", Role::User, 0);

    let anonymous = app
        .post("/api/multipliers", json!({ "name": "single", "value": 9 }))
        .await;
    assert_eq!(anonymous.status, 401);

    let forbidden = app
        .post_as(
            "/api/multipliers",
            json!({ "name": "single", "value": 9 }),
            &app.session(&user),
        )
        .await;
    assert_eq!(forbidden.status, 403);

    let forged = app
        .post_as(
            "/api/multipliers",
            json!({ "name": "single", "value": 9 }),
            "auth_token=not.a.token",
        )
        .await;
    assert_eq!(forged.status, 401);
}

#[tokio::test]
async fn invalid_values_are_rejected() {
    let app = spawn_app();
    let admin = app.seed_user("Ada", "ada@example.com", Role::Admin, 0);
    let cookie = app.session(&admin);

    for body in [
        json!({ "name": "quad", "value": 9 }),
        json!({ "name": "single", "value": -1 }),
        json!({ "name": "single", "value": "lots" }),
        json!({ "name": "single" }),
    ] {
        let reply = app.post_as("/api/multipliers", body, &cookie).await;
        assert_eq!(reply.status, 400);
        assert_eq!(reply.json()["success"], false);
    }
}

#[tokio::test]
async fn delete_removes_known_ids_only() {
    let app = spawn_app();
    let admin = app.seed_user("Ada", "ada@example.com", Role::Admin, 0);
    let cookie = app.session(&admin);
    app.seed_multipliers().await;

    let list = app.get("/api/multipliers").await.json();
    let id = list["data"][0]["id"].as_str().unwrap().to_string();

    let deleted = app
        .request(Method::DELETE, &format!("/api/multipliers/{}", id), None, Some(&cookie))
        .await;
    assert_eq!(deleted.status, 200);

    let again = app
        .request(Method::DELETE, &format!("/api/multipliers/{}", id), None, Some(&cookie))
        .await;
    assert_eq!(again.status, 404);

    let list = app.get("/api/multipliers").await.json();
    assert_eq!(list["data"].as_array().unwrap().len(), 2);
}
