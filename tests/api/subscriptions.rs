use sqlx::postgres::PgRow;
use sqlx::Row;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestApp;

#[tokio::test]
async fn subscribe_returns_201_and_sends_a_welcome_email() {
    let app = TestApp::spawn_app().await;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_subscription(serde_json::json!({ "email": "reader@example.com" }))
        .await;

    assert_eq!(201, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!("Subscription successful!", body["message"]);

    let (email, is_active): (String, bool) =
        sqlx::query("SELECT email, is_active FROM subscribers")
            .map(|row: PgRow| (row.get("email"), row.get("is_active")))
            .fetch_one(&app.db_pool)
            .await
            .unwrap();

    assert_eq!("reader@example.com", email);
    assert!(is_active);
}

#[tokio::test]
async fn subscribing_twice_is_an_idempotent_success() {
    let app = TestApp::spawn_app().await;

    // One welcome email for the first subscribe, none for the repeat.
    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let first = app
        .post_subscription(serde_json::json!({ "email": "reader@example.com" }))
        .await;
    let second = app
        .post_subscription(serde_json::json!({ "email": "reader@example.com" }))
        .await;

    assert_eq!(201, first.status().as_u16());
    assert_eq!(200, second.status().as_u16());

    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!("You are already subscribed!", body["message"]);

    let count: i64 = sqlx::query("SELECT COUNT(*) AS total FROM subscribers")
        .map(|row: PgRow| row.get("total"))
        .fetch_one(&app.db_pool)
        .await
        .unwrap();

    assert_eq!(1, count);
}

#[tokio::test]
async fn subscribe_rejects_an_invalid_address() {
    let app = TestApp::spawn_app().await;

    for invalid_email in ["", "not-an-email", "missing-domain@"] {
        let response = app
            .post_subscription(serde_json::json!({ "email": invalid_email }))
            .await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "did not reject {:?}",
            invalid_email
        );
    }

    let count: i64 = sqlx::query("SELECT COUNT(*) AS total FROM subscribers")
        .map(|row: PgRow| row.get::<i64, _>("total"))
        .fetch_one(&app.db_pool)
        .await
        .unwrap();

    assert_eq!(0, count);
}

#[tokio::test]
async fn a_lost_welcome_email_does_not_undo_the_subscription() {
    let app = TestApp::spawn_app().await;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_subscription(serde_json::json!({ "email": "reader@example.com" }))
        .await;

    assert_eq!(201, response.status().as_u16());

    let count: i64 = sqlx::query("SELECT COUNT(*) AS total FROM subscribers")
        .map(|row: PgRow| row.get::<i64, _>("total"))
        .fetch_one(&app.db_pool)
        .await
        .unwrap();

    assert_eq!(1, count);
}
