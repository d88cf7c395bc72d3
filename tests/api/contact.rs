use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{mail_subject, TestApp};

#[tokio::test]
async fn a_valid_message_is_relayed_to_the_site_owner() {
    let app = TestApp::spawn_app().await;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_json(
            "/contact",
            &serde_json::json!({
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "message": "I enjoyed your last post."
            }),
        )
        .await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!("Your message has been sent successfully.", body["message"]);

    let request = &app.sent_mail().await[0];
    assert_eq!(
        "New Contact Form Submission from Ada Lovelace",
        mail_subject(request)
    );

    // Relayed to the configured owner address, not back to the sender.
    let mail: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(
        "owner@example.com",
        mail["personalizations"][0]["to"][0]["email"]
    );

    let text = mail["content"][0]["value"].as_str().unwrap();
    assert!(text.contains("ada@example.com"));
    assert!(text.contains("I enjoyed your last post."));
}

#[tokio::test]
async fn incomplete_or_blank_submissions_are_rejected() {
    let app = TestApp::spawn_app().await;

    let invalid_bodies = [
        serde_json::json!({ "name": "  ", "email": "ada@example.com", "message": "Hi" }),
        serde_json::json!({ "name": "Ada", "email": "not-an-email", "message": "Hi" }),
        serde_json::json!({ "name": "Ada", "email": "ada@example.com", "message": "   " }),
        serde_json::json!({ "name": "<script>", "email": "ada@example.com", "message": "Hi" }),
    ];

    for body in invalid_bodies {
        let response = app.post_json("/contact", &body).await;

        assert_eq!(400, response.status().as_u16(), "did not reject {}", body);
    }

    assert!(app.sent_mail().await.is_empty());
}

#[tokio::test]
async fn a_relay_failure_is_surfaced_as_500() {
    let app = TestApp::spawn_app().await;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_json(
            "/contact",
            &serde_json::json!({
                "name": "Ada",
                "email": "ada@example.com",
                "message": "Hello"
            }),
        )
        .await;

    assert_eq!(500, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!("Error sending message. Try again later.", body["message"]);
}
