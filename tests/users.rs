mod common;

use std::time::Duration;

use numbet::cache::{MemoryCache, QueryCache};
use numbet::models::users::{Role, User};
use serde_json::json;

use common::{number, settings, spawn_app, spawn_app_with};

#[tokio::test]
async fn repeated_queries_are_served_from_cache() {
    let app = spawn_app_with(
        QueryCache::Memory(MemoryCache::new(Duration::from_secs(60))),
        settings(),
    );
    app.seed_user("Ann", "ann@example.com", Role::User, 10);
    app.seed_user("Abe", "abe@example.com", Role::Agent, 0);

    let query = json!({ "search": "example", "category": "all", "page": 1, "limit": 10 });
    let first = app.post("/api/users/query", query.clone()).await;
    let second = app.post("/api/users/query", query).await;

    assert_eq!(first.status, 200);
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(app.store.user_query_count(), 1);

    let body = first.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 2);

    let agents = app
        .post("/api/users/query", json!({ "category": "agent" }))
        .await
        .json();
    assert_eq!(app.store.user_query_count(), 2);
    assert_eq!(agents["total"], 1);
    assert_eq!(agents["data"][0]["email"], "abe@example.com");
}

#[tokio::test]
async fn disabled_cache_always_queries() {
    let app = spawn_app();
    app.seed_user("Ann", "ann@example.com", Role::User, 0);

    for _ in 0..3 {
        let reply = app.post("/api/users/query", json!({})).await;
        assert_eq!(reply.status, 200);
    }

    assert_eq!(app.store.user_query_count(), 3);
}

#[tokio::test]
async fn unknown_category_is_rejected() {
    let app = spawn_app();

    let reply = app
        .post("/api/users/query", json!({ "category": "whales" }))
        .await;

    assert_eq!(reply.status, 400);
    assert_eq!(app.store.user_query_count(), 0);
}

#[tokio::test]
async fn wallet_reports_balance_and_multipliers() {
    let app = spawn_app();
    app.seed_user("Ann", "ann@example.com", Role::User, 250);
    app.seed_multipliers().await;

    let reply = app
        .post("/api/users/wallet", json!({ "email": "ann@example.com" }))
        .await;
    assert_eq!(reply.status, 200);

    let data = &reply.json()["data"];
    assert_eq!(number(&data["walletBalance"]), 250.0);
    assert_eq!(number(&data["wallet"]["main"]), 250.0);
    assert_eq!(number(&data["results"]["single"]), 9.0);
    assert_eq!(number(&data["results"]["triple"]), 900.0);

    let missing = app
        .post("/api/users/wallet", json!({ "email": "nobody@example.com" }))
        .await;
    assert_eq!(missing.status, 404);
}

#[tokio::test]
async fn profile_hides_password_and_reports_vip_level() {
    let app = spawn_app();
    app.seed_user("Ann", "ann@example.com", Role::User, 0);

    let reply = app
        .post("/api/users/profile", json!({ "email": "ANN@example.com" }))
        .await;
    assert_eq!(reply.status, 200);

    let data = &reply.json()["data"];
    assert_eq!(data["email"], "ann@example.com");
    assert_eq!(data["vipLevel"], 0);
    assert!(data.get("passwordHash").is_none());

    let invalid = app.post("/api/users/profile", json!({ "email": "  " })).await;
    assert_eq!(invalid.status, 400);
}

#[tokio::test]
async fn referrals_list_invited_users() {
    let app = spawn_app();
    let referrer = app.seed_user("Ref", "ref@example.com", Role::User, 0);
    app.seed_user("Solo", "solo@example.com", Role::User, 0);
    let mut invited = User::new("Kid", "kid@example.com", String::new(), Role::User, "KID00000".into());
    invited.referred_by = Some(referrer.id.clone());
    app.store.insert_user(invited).unwrap();

    let reply = app
        .post("/api/users/referrals", json!({ "email": "ref@example.com" }))
        .await;
    assert_eq!(reply.status, 200);

    let data = &reply.json()["data"];
    assert_eq!(data["referralCode"], referrer.referral_code);
    assert_eq!(data["total"], 1);
    assert_eq!(data["referrals"][0]["email"], "kid@example.com");
}

#[tokio::test]
async fn profile_updates_and_ledger_listing() {
    let app = spawn_app();
    let user = app.seed_user("Ann", "ann@example.com", Role::User, 100);
    app.seed_multipliers().await;
    let cookie = app.session(&user);

    let updated = app
        .post_as(
            "/api/users/update-profile",
            json!({ "email": "ann@example.com", "name": "Annie", "phone": "01700000000" }),
            &cookie,
        )
        .await;
    assert_eq!(updated.status, 200);
    let data = &updated.json()["data"];
    assert_eq!(data["name"], "Annie");
    assert_eq!(data["phone"], "01700000000");

    app.post(
        "/api/betting-post-api",
        json!({ "email": "ann@example.com", "number": "12", "amount": 25, "betType": "double" }),
    )
    .await;

    let ledger = app
        .post_as("/api/users/transactions", json!({ "email": "ann@example.com" }), &cookie)
        .await;
    assert_eq!(ledger.status, 200);
    let rows = ledger.json()["data"].as_array().unwrap().clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["type"], "bet_place");
    assert_eq!(number(&rows[0]["amount"]), -25.0);
}

#[tokio::test]
async fn account_routes_require_the_owner_session() {
    let app = spawn_app();
    app.seed_user("Ann", "ann@example.com", Role::User, 100);
    let other = app.seed_user("Bo", "bo@example.com", Role::User, 0);
    let cookie = app.session(&other);

    let profile = json!({ "email": "ann@example.com", "name": "Mallory" });
    let anonymous = app.post("/api/users/update-profile", profile.clone()).await;
    assert_eq!(anonymous.status, 401);
    let foreign = app.post_as("/api/users/update-profile", profile, &cookie).await;
    assert_eq!(foreign.status, 403);
    assert_eq!(app.store.user("ann@example.com").unwrap().name, "Ann");

    let ledger = json!({ "email": "ann@example.com" });
    let anonymous = app.post("/api/users/transactions", ledger.clone()).await;
    assert_eq!(anonymous.status, 401);
    let foreign = app.post_as("/api/users/transactions", ledger, &cookie).await;
    assert_eq!(foreign.status, 403);
}
