use uuid::Uuid;

use crate::helpers::TestApp;

#[tokio::test]
async fn slug_is_generated_from_the_title_when_missing() {
    let app = TestApp::spawn_app().await;
    let category_id = app.create_post_category("Rust").await;

    let body = app
        .create_post(serde_json::json!({
            "title": "Hello, World! 42",
            "excerpt": "Greetings.",
            "category_id": category_id,
        }))
        .await;

    assert_eq!("hello-world-42", body["post"]["slug"]);
}

#[tokio::test]
async fn a_client_provided_slug_wins_over_generation() {
    let app = TestApp::spawn_app().await;
    let category_id = app.create_post_category("Rust").await;

    let body = app
        .create_post(serde_json::json!({
            "title": "Hello, World!",
            "slug": "custom-slug",
            "excerpt": "Greetings.",
            "category_id": category_id,
        }))
        .await;

    assert_eq!("custom-slug", body["post"]["slug"]);
}

#[tokio::test]
async fn a_malformed_slug_is_rejected() {
    let app = TestApp::spawn_app().await;
    let category_id = app.create_post_category("Rust").await;

    let response = app
        .post_json(
            "/admin/posts",
            &serde_json::json!({
                "title": "Hello",
                "slug": "Not A Slug",
                "excerpt": "Greetings.",
                "category_id": category_id,
            }),
        )
        .await;

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn duplicate_slugs_conflict() {
    let app = TestApp::spawn_app().await;
    let category_id = app.create_post_category("Rust").await;

    app.create_post(serde_json::json!({
        "title": "Hello",
        "excerpt": "First.",
        "category_id": category_id,
    }))
    .await;

    let response = app
        .post_json(
            "/admin/posts",
            &serde_json::json!({
                "title": "Hello",
                "excerpt": "Second, same generated slug.",
                "category_id": category_id,
            }),
        )
        .await;

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn an_unknown_category_is_rejected() {
    let app = TestApp::spawn_app().await;

    let response = app
        .post_json(
            "/admin/posts",
            &serde_json::json!({
                "title": "Hello",
                "excerpt": "Greetings.",
                "category_id": Uuid::new_v4(),
            }),
        )
        .await;

    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn updating_or_deleting_a_missing_post_is_404() {
    let app = TestApp::spawn_app().await;
    let category_id = app.create_post_category("Rust").await;

    let response = app
        .put_json(
            &format!("/admin/posts/{}", Uuid::new_v4()),
            &serde_json::json!({
                "title": "Hello",
                "excerpt": "Greetings.",
                "category_id": category_id,
            }),
        )
        .await;
    assert_eq!(404, response.status().as_u16());

    let response = app
        .delete(&format!("/admin/posts/{}", Uuid::new_v4()))
        .await;
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn a_deleted_post_is_gone() {
    let app = TestApp::spawn_app().await;
    let category_id = app.create_post_category("Rust").await;

    let body = app
        .create_post(serde_json::json!({
            "title": "Ephemeral",
            "excerpt": "Soon gone.",
            "category_id": category_id,
        }))
        .await;
    let id = body["post"]["id"].as_str().unwrap();

    let response = app.delete(&format!("/admin/posts/{}", id)).await;
    assert_eq!(204, response.status().as_u16());

    let response = app.delete(&format!("/admin/posts/{}", id)).await;
    assert_eq!(404, response.status().as_u16());

    assert_eq!(404, app.get("/blog/ephemeral").await.status().as_u16());
}

#[tokio::test]
async fn the_admin_listing_includes_drafts_and_the_notification_stamp() {
    let app = TestApp::spawn_app().await;
    let category_id = app.create_post_category("Rust").await;

    app.create_post(serde_json::json!({
        "title": "Draft",
        "excerpt": "Not yet.",
        "category_id": category_id,
        "is_published": false,
    }))
    .await;

    let response = app.get("/admin/posts").await;
    assert_eq!(200, response.status().as_u16());

    let posts: serde_json::Value = response.json().await.unwrap();
    let posts = posts.as_array().unwrap();

    assert_eq!(1, posts.len());
    assert_eq!("Draft", posts[0]["title"]);
    assert!(posts[0]["notification_sent_at"].is_null());
}

#[tokio::test]
async fn updating_a_post_does_not_clear_the_notification_stamp() {
    let app = TestApp::spawn_app().await;
    let category_id = app.create_post_category("Rust").await;
    app.insert_subscriber("reader@example.com", true).await;

    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .respond_with(wiremock::ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;

    let body = app
        .create_post(serde_json::json!({
            "title": "Stamped",
            "excerpt": "Notified once.",
            "category_id": category_id,
            "notify_subscribers": true,
        }))
        .await;
    let id = body["post"]["id"].as_str().unwrap();
    assert_eq!("sent", body["notification"]);

    // Unpublish the post; the stamp must survive the edit.
    let response = app
        .put_json(
            &format!("/admin/posts/{}", id),
            &serde_json::json!({
                "title": "Stamped",
                "excerpt": "Notified once.",
                "category_id": category_id,
                "is_published": false,
            }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());

    let updated: serde_json::Value = response.json().await.unwrap();
    assert!(!updated["post"]["notification_sent_at"].is_null());
}

#[tokio::test]
async fn duplicate_category_slugs_conflict() {
    let app = TestApp::spawn_app().await;

    app.create_post_category("Rust").await;

    let response = app
        .post_json(
            "/admin/post_categories",
            &serde_json::json!({ "name": "Rust" }),
        )
        .await;

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn a_subscriber_can_be_deactivated_and_reactivated() {
    let app = TestApp::spawn_app().await;
    app.insert_subscriber("reader@example.com", true).await;

    let subscribers: serde_json::Value =
        app.get("/admin/subscribers").await.json().await.unwrap();
    let id = subscribers[0]["id"].as_str().unwrap().to_string();
    assert_eq!(true, subscribers[0]["is_active"]);

    let response = app
        .put_json(
            &format!("/admin/subscribers/{}", id),
            &serde_json::json!({ "is_active": false }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());

    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(false, updated["is_active"]);

    let response = app
        .put_json(
            &format!("/admin/subscribers/{}", id),
            &serde_json::json!({ "is_active": true }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn updating_a_missing_subscriber_is_404() {
    let app = TestApp::spawn_app().await;

    let response = app
        .put_json(
            &format!("/admin/subscribers/{}", Uuid::new_v4()),
            &serde_json::json!({ "is_active": false }),
        )
        .await;

    assert_eq!(404, response.status().as_u16());
}
