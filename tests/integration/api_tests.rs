//! API integration tests
//!
//! Require a running server backed by a migrated database and the same
//! `JWT_SECRET` as the server. Run with: cargo test -- --ignored

use chrono::{Duration, Local, Utc};
use reqwest::Client;
use serde_json::{json, Value};

use library_service::models::UserClaims;

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".to_string())
}

/// Helper to mint a token the server accepts
fn auth_token(user_id: i32, is_staff: bool) -> String {
    let now = Utc::now();
    UserClaims {
        sub: format!("user{}", user_id),
        user_id,
        is_staff,
        exp: (now + Duration::hours(1)).timestamp(),
        iat: now.timestamp(),
    }
    .create_token(&secret())
    .expect("Failed to create token")
}

async fn create_book(client: &Client, copies: i32) -> Value {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(auth_token(1, true))
        .json(&json!({
            "title": "Integration Test Book",
            "author": "Test Author",
            "cover": "soft",
            "copies": copies,
            "daily_fee": "0.50"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
#[ignore]
async fn test_single_copy_borrowing_lifecycle() {
    let client = Client::new();
    let reader = auth_token(501, false);
    let today = Local::now().date_naive();

    let book = create_book(&client, 1).await;
    let book_id = book["id"].as_i64().expect("No book ID");

    // First borrowing takes the only copy
    let response = client
        .post(format!("{}/borrowings", BASE_URL))
        .bearer_auth(&reader)
        .json(&json!({
            "book": book_id,
            "expected_return_date": today + Duration::days(7)
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let borrowing: Value = response.json().await.expect("Failed to parse response");
    let borrowing_id = borrowing["id"].as_i64().expect("No borrowing ID");
    assert_eq!(borrowing["is_active"], true);
    assert!(borrowing["actual_return_date"].is_null());
    assert_eq!(borrowing["book"]["copies"], 0);

    // Nothing left for a second borrower
    let response = client
        .post(format!("{}/borrowings", BASE_URL))
        .bearer_auth(auth_token(502, false))
        .json(&json!({
            "book": book_id,
            "expected_return_date": today + Duration::days(7)
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BookUnavailable");

    // Return puts the copy back
    let response = client
        .post(format!("{}/borrowings/{}/return", BASE_URL, borrowing_id))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    let returned: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(returned["is_active"], false);
    assert_eq!(returned["actual_return_date"], today.to_string());
    assert_eq!(returned["book"]["copies"], 1);

    // Second return is refused
    let response = client
        .post(format!("{}/borrowings/{}/return", BASE_URL, borrowing_id))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "AlreadyReturned");
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_of_last_copy() {
    const BORROWERS: i32 = 8;

    let client = Client::new();
    let book = create_book(&client, 1).await;
    let book_id = book["id"].as_i64().expect("No book ID");
    let due = Local::now().date_naive() + Duration::days(7);

    let mut handles = Vec::new();
    for user_id in 600..600 + BORROWERS {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let response = client
                .post(format!("{}/borrowings", BASE_URL))
                .bearer_auth(auth_token(user_id, false))
                .json(&json!({ "book": book_id, "expected_return_date": due }))
                .send()
                .await
                .expect("Failed to send request");
            let status = response.status().as_u16();
            let body: Value = response.json().await.expect("Failed to parse response");
            (status, body)
        }));
    }

    let mut created = 0;
    let mut unavailable = 0;
    for handle in handles {
        let (status, body) = handle.await.expect("Borrow task panicked");
        match status {
            201 => created += 1,
            400 if body["error"] == "BookUnavailable" => unavailable += 1,
            other => panic!("unexpected response {}: {}", other, body),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(unavailable, BORROWERS - 1);

    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(auth_token(600, false))
        .send()
        .await
        .expect("Failed to send request");
    let after: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(after["copies"], 0);

    let response = client
        .get(format!("{}/borrowings?is_active=true", BASE_URL))
        .bearer_auth(auth_token(1, true))
        .send()
        .await
        .expect("Failed to send request");
    let active: Value = response.json().await.expect("Failed to parse response");
    let open_for_book = active
        .as_array()
        .expect("array")
        .iter()
        .filter(|b| b["book"]["id"] == book_id)
        .count();
    assert_eq!(open_for_book, 1);
}

#[tokio::test]
#[ignore]
async fn test_past_return_date_rejected() {
    let client = Client::new();
    let book = create_book(&client, 2).await;
    let yesterday = Local::now().date_naive() - Duration::days(1);

    let response = client
        .post(format!("{}/borrowings", BASE_URL))
        .bearer_auth(auth_token(503, false))
        .json(&json!({
            "book": book["id"],
            "expected_return_date": yesterday
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "InvalidReturnDate");

    let response = client
        .get(format!("{}/books/{}", BASE_URL, book["id"]))
        .bearer_auth(auth_token(503, false))
        .send()
        .await
        .expect("Failed to send request");
    let unchanged: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(unchanged["copies"], 2);
}

#[tokio::test]
#[ignore]
async fn test_readers_only_list_their_own_borrowings() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrowings?user_id=1", BASE_URL))
        .bearer_auth(auth_token(504, false))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    for borrowing in body.as_array().expect("array") {
        assert_eq!(borrowing["user_id"], 504);
    }
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrowings", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}
