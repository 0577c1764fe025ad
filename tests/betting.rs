mod common;

use numbet::models::bets::BetStatus;
use numbet::models::transactions::TransactionType;
use numbet::models::multipliers::BetType;
use numbet::models::users::Role;
use numbet::repositories::multipliers::MultiplierRepository;
use rust_decimal::Decimal;
use serde_json::json;

use common::{number, spawn_app};

#[tokio::test]
async fn bet_debits_wallet_and_pairs_one_ledger_row() {
    let app = spawn_app();
    app.seed_multipliers().await;
    let user = app.seed_user("Ann", "ann@example.com", Role::User, 500);

    let reply = app
        .post(
            "/api/betting-post-api",
            json!({ "email": "ann@example.com", "number": "7", "amount": 100, "betType": "single" }),
        )
        .await;

    assert_eq!(reply.status, 201);
    let body = reply.json();
    assert_eq!(body["success"], true);
    assert_eq!(number(&body["data"]["newBalance"]), 400.0);
    assert_eq!(number(&body["data"]["prize"]), 900.0);
    assert_eq!(body["data"]["currency"], "BDT");

    let bets = app.store.bets_of(&user.id);
    assert_eq!(bets.len(), 1);
    assert_eq!(bets[0].status, BetStatus::Pending);
    assert_eq!(bets[0].prize, bets[0].amount * bets[0].multiplier);
    assert_eq!(body["data"]["betId"], bets[0].id.as_str());

    let transactions = app.store.transactions_of(&user.id);
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].kind, TransactionType::BetPlace);
    assert_eq!(transactions[0].amount, Decimal::from(-100));
    assert_eq!(transactions[0].reference_id.as_deref(), Some(bets[0].id.as_str()));
    assert_eq!(body["data"]["transactionId"], transactions[0].id.as_str());

    let stored = app.store.user("ann@example.com").unwrap();
    assert_eq!(stored.wallet.main, Decimal::from(400));
    assert_eq!(stored.total_bets, 1);
    assert_eq!(stored.transactions.len(), 1);
}

#[tokio::test]
async fn insufficient_funds_change_nothing() {
    let app = spawn_app();
    app.seed_multipliers().await;
    let user = app.seed_user("Bob", "bob@example.com", Role::User, 50);

    let reply = app
        .post(
            "/api/betting-post-api",
            json!({ "email": "bob@example.com", "number": 42, "amount": 60, "betType": "double" }),
        )
        .await;

    assert_eq!(reply.status, 400);
    assert_eq!(reply.json()["error"], "Insufficient balance");
    assert!(app.store.bets_of(&user.id).is_empty());
    assert!(app.store.transactions_of(&user.id).is_empty());
    assert_eq!(app.store.user("bob@example.com").unwrap().wallet.main, Decimal::from(50));
}

#[tokio::test]
async fn digit_count_must_match_bet_type() {
    let app = spawn_app();
    app.seed_multipliers().await;
    app.seed_user("Cat", "cat@example.com", Role::User, 10_000);

    let cases = [
        ("single", "0", 201),
        ("single", "9", 201),
        ("single", "10", 400),
        ("double", "00", 201),
        ("double", "99", 201),
        ("double", "9", 400),
        ("double", "100", 400),
        ("triple", "000", 201),
        ("triple", "999", 201),
        ("triple", "99", 400),
        ("triple", "1000", 400),
        ("quad", "1234", 400),
    ];

    for (bet_type, digits, expected) in cases {
        let reply = app
            .post(
                "/api/betting-post-api",
                json!({ "email": "cat@example.com", "number": digits, "amount": 1, "betType": bet_type }),
            )
            .await;
        assert_eq!(reply.status, expected, "{} {}", bet_type, digits);
    }
}

#[tokio::test]
async fn malformed_amounts_are_rejected() {
    let app = spawn_app();
    app.seed_multipliers().await;
    let user = app.seed_user("Dan", "dan@example.com", Role::User, 100);

    for amount in [json!(0), json!(-5), json!("abc"), json!(null)] {
        let reply = app
            .post(
                "/api/betting-post-api",
                json!({ "email": "dan@example.com", "number": "1", "amount": amount, "betType": "single" }),
            )
            .await;
        assert_eq!(reply.status, 400, "{}", amount);
    }
    assert!(app.store.bets_of(&user.id).is_empty());
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let app = spawn_app();
    app.seed_multipliers().await;

    let reply = app
        .post(
            "/api/betting-post-api",
            json!({ "email": "ghost@example.com", "number": "1", "amount": 5, "betType": "single" }),
        )
        .await;

    assert_eq!(reply.status, 404);
}

#[tokio::test]
async fn unknown_user_is_reported_before_multiplier_lookup() {
    let app = spawn_app();

    let reply = app
        .post(
            "/api/betting-post-api",
            json!({ "email": "ghost@example.com", "number": "1", "amount": 5, "betType": "single" }),
        )
        .await;

    assert_eq!(reply.status, 404);
}

#[tokio::test]
async fn huge_amounts_are_rejected_without_touching_the_wallet() {
    let app = spawn_app();
    app.seed_multipliers().await;
    let user = app.seed_user("Hal", "hal@example.com", Role::User, 100);

    for amount in [json!("10000000000000000000000000000"), json!(1e15), json!("1000000000000.01")] {
        let reply = app
            .post(
                "/api/betting-post-api",
                json!({ "email": "hal@example.com", "number": "3", "amount": amount, "betType": "single" }),
            )
            .await;

        assert_eq!(reply.status, 400);
        assert_eq!(reply.json()["success"], false);
    }

    assert!(app.store.bets_of(&user.id).is_empty());
    assert_eq!(app.store.user("hal@example.com").unwrap().wallet.main, Decimal::from(100));
}

#[tokio::test]
async fn prize_beyond_storage_range_is_rejected() {
    let app = spawn_app();
    app.store
        .upsert_multiplier(BetType::Triple, Decimal::from(99_999_999))
        .await
        .unwrap();
    let user = app.seed_user("Ivy", "ivy@example.com", Role::User, 1_000_000_000_000);

    let reply = app
        .post(
            "/api/betting-post-api",
            json!({ "email": "ivy@example.com", "number": "123", "amount": 1_000_000_000_000i64, "betType": "triple" }),
        )
        .await;

    assert_eq!(reply.status, 400);
    assert!(app.store.bets_of(&user.id).is_empty());
    assert_eq!(
        app.store.user("ivy@example.com").unwrap().wallet.main,
        Decimal::from(1_000_000_000_000i64)
    );
}

#[tokio::test]
async fn missing_multiplier_is_a_server_error() {
    let app = spawn_app();
    let user = app.seed_user("Eve", "eve@example.com", Role::User, 100);

    let reply = app
        .post(
            "/api/betting-post-api",
            json!({ "email": "eve@example.com", "number": "1", "amount": 5, "betType": "single" }),
        )
        .await;

    assert_eq!(reply.status, 500);
    assert!(app.store.bets_of(&user.id).is_empty());
    assert_eq!(app.store.user("eve@example.com").unwrap().wallet.main, Decimal::from(100));
}

#[tokio::test]
async fn retried_request_id_debits_once() {
    let app = spawn_app();
    app.seed_multipliers().await;
    let user = app.seed_user("Fay", "fay@example.com", Role::User, 100);
    let body = json!({
        "email": "fay@example.com",
        "number": "12",
        "amount": 25,
        "betType": "double",
        "requestId": "7f1c2d"
    });

    let first = app.post("/api/betting-post-api", body.clone()).await;
    let second = app.post("/api/betting-post-api", body).await;

    assert_eq!(first.status, 201);
    assert_eq!(second.status, 200);
    assert_eq!(first.json()["data"]["betId"], second.json()["data"]["betId"]);
    assert_eq!(second.json()["data"]["replayed"], true);
    assert_eq!(app.store.bets_of(&user.id).len(), 1);
    assert_eq!(app.store.user("fay@example.com").unwrap().wallet.main, Decimal::from(75));
}

#[tokio::test]
async fn concurrent_retries_share_one_bet() {
    let app = spawn_app();
    app.seed_multipliers().await;
    let user = app.seed_user("Jo", "jo@example.com", Role::User, 100);

    let bet = || {
        app.post(
            "/api/betting-post-api",
            json!({
                "email": "jo@example.com",
                "number": "4",
                "amount": 10,
                "betType": "single",
                "requestId": "retry-1"
            }),
        )
    };
    let (a, b, c, d) = tokio::join!(bet(), bet(), bet(), bet());
    let replies = [a, b, c, d];

    assert_eq!(replies.iter().filter(|r| r.status == 201).count(), 1);
    assert_eq!(replies.iter().filter(|r| r.status == 200).count(), 3);
    let ids: Vec<_> = replies.iter().map(|r| r.json()["data"]["betId"].clone()).collect();
    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(app.store.bets_of(&user.id).len(), 1);
    assert_eq!(app.store.user("jo@example.com").unwrap().wallet.main, Decimal::from(90));
}

#[tokio::test]
async fn concurrent_bets_never_overdraw() {
    let app = spawn_app();
    app.seed_multipliers().await;
    let user = app.seed_user("Gus", "gus@example.com", Role::User, 100);

    let bet = || {
        app.post(
            "/api/betting-post-api",
            json!({ "email": "gus@example.com", "number": "3", "amount": 30, "betType": "single" }),
        )
    };
    let (a, b, c, d, e) = tokio::join!(bet(), bet(), bet(), bet(), bet());
    let replies = [a, b, c, d, e];

    let placed = replies.iter().filter(|r| r.status == 201).count();
    let rejected = replies.iter().filter(|r| r.status == 400).count();
    assert_eq!(placed, 3);
    assert_eq!(rejected, 2);
    assert_eq!(app.store.user("gus@example.com").unwrap().wallet.main, Decimal::from(10));
    assert_eq!(app.store.transactions_of(&user.id).len(), 3);
}

#[tokio::test]
async fn history_lists_newest_first() {
    let app = spawn_app();
    app.seed_multipliers().await;
    app.seed_user("Hal", "hal@example.com", Role::User, 100);

    for digit in ["1", "2", "3"] {
        app.post(
            "/api/betting-post-api",
            json!({ "email": "hal@example.com", "number": digit, "amount": 1, "betType": "single" }),
        )
        .await;
    }

    let reply = app
        .post("/api/bets/history", json!({ "email": "hal@example.com", "limit": 2 }))
        .await;

    assert_eq!(reply.status, 200);
    let bets = reply.json()["data"].as_array().unwrap().clone();
    assert_eq!(bets.len(), 2);
    assert_eq!(bets[0]["number"], "3");
    assert_eq!(bets[1]["number"], "2");
}
