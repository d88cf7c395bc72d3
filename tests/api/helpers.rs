use chrono::{DateTime, Utc};
use reqwest::Response;
use sqlx::postgres::PgRow;
use sqlx::{migrate, Connection, Executor, PgConnection, PgPool, Row};
use uuid::Uuid;
use wiremock::MockServer;

use personal_site::config::{get_configuration, DatabaseSettings, Settings};
use personal_site::domain::content::ContentKind;
use personal_site::email_client::EmailClient;
use personal_site::notifications::dispatcher::{self, DispatchError, DispatchOutcome};
use personal_site::notifications::trigger::DispatchMode;
use personal_site::notifications::worker::{self, ExecutionOutcome};
use personal_site::startup::{get_connection_db_pool, get_email_client, Application};

pub struct TestApp {
    pub config: Settings,
    pub address: String,
    pub db_pool: PgPool,
    pub email_server: MockServer,
    pub email_client: EmailClient,
}

impl TestApp {
    /// Inline dispatch by default: the save request runs the dispatcher
    /// itself, so tests can assert on mail right after the response.
    pub async fn spawn_app() -> TestApp {
        Self::spawn_app_with_mode(DispatchMode::Inline).await
    }

    pub async fn spawn_app_with_mode(mode: DispatchMode) -> TestApp {
        let mut config = get_configuration().expect("Missing configuration file.");
        let db_test_name = format!("db_{}", Uuid::new_v4().to_string().replace('-', "_"));
        let email_server = MockServer::start().await;

        // We are using port 0 as way to define a different port per each test. Port 0 is a special case that operating systems
        // take into account: when port is 0, the OS will search for the first available port
        config.set_app_port(0);
        config.set_email_client_base_url(email_server.uri());
        config.set_dispatch_mode(mode);

        let db_pool = configure_db(&mut config.database, db_test_name.clone()).await;
        let email_client = get_email_client(&config);

        let application = Application::build(config.clone())
            .await
            .expect("Failed to build application.");

        let address = format!("http://127.0.0.1:{}", application.get_port());

        tokio::spawn(application.run_until_stop());

        TestApp {
            address,
            config: config.clone(),
            db_pool,
            email_server,
            email_client,
        }
    }

    pub async fn get(&self, path: &str) -> Response {
        reqwest::Client::new()
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> Response {
        reqwest::Client::new()
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn put_json(&self, path: &str, body: &serde_json::Value) -> Response {
        reqwest::Client::new()
            .put(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn delete(&self, path: &str) -> Response {
        reqwest::Client::new()
            .delete(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_subscription(&self, body: serde_json::Value) -> Response {
        self.post_json("/subscriptions", &body).await
    }

    /// Creates a post category through the admin endpoint and returns its id.
    pub async fn create_post_category(&self, name: &str) -> Uuid {
        let response = self
            .post_json(
                "/admin/post_categories",
                &serde_json::json!({ "name": name }),
            )
            .await;
        assert_eq!(201, response.status().as_u16());

        let body: serde_json::Value = response.json().await.unwrap();

        body["id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn create_video_category(&self, name: &str) -> Uuid {
        let response = self
            .post_json(
                "/admin/video_categories",
                &serde_json::json!({ "name": name }),
            )
            .await;
        assert_eq!(201, response.status().as_u16());

        let body: serde_json::Value = response.json().await.unwrap();

        body["id"].as_str().unwrap().parse().unwrap()
    }

    /// Creates a post through the admin endpoint, asserting success, and
    /// returns the response body.
    pub async fn create_post(&self, body: serde_json::Value) -> serde_json::Value {
        let response = self.post_json("/admin/posts", &body).await;
        assert_eq!(201, response.status().as_u16());

        response.json().await.unwrap()
    }

    pub async fn create_video(&self, body: serde_json::Value) -> serde_json::Value {
        let response = self.post_json("/admin/videos", &body).await;
        assert_eq!(201, response.status().as_u16());

        response.json().await.unwrap()
    }

    /// Inserts a subscriber row directly, bypassing the subscribe endpoint so
    /// no welcome email muddies the mock server's request log.
    pub async fn insert_subscriber(&self, email: &str, is_active: bool) {
        sqlx::query(
            r#"
            INSERT INTO subscribers (id, email, is_active, subscribed_at)
            VALUES ($1, $2, $3, now())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(is_active)
        .execute(&self.db_pool)
        .await
        .expect("Failed to insert a subscriber.");
    }

    pub async fn notification_sent_at(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Option<DateTime<Utc>> {
        let query = format!(
            "SELECT notification_sent_at FROM {} WHERE id = $1",
            kind.table()
        );

        sqlx::query(&query)
            .bind(id)
            .map(|row: PgRow| row.get("notification_sent_at"))
            .fetch_one(&self.db_pool)
            .await
            .expect("Failed to read the notification stamp.")
    }

    /// `(item_kind, item_id, attempts)` for every queued notification job.
    pub async fn queued_jobs(&self) -> Vec<(String, Uuid, i32)> {
        sqlx::query("SELECT item_kind, item_id, attempts FROM notification_queue")
            .map(|row: PgRow| (row.get("item_kind"), row.get("item_id"), row.get("attempts")))
            .fetch_all(&self.db_pool)
            .await
            .expect("Failed to read the notification queue.")
    }

    /// Collapses every backoff delay so the next worker poll sees the jobs.
    pub async fn make_jobs_due(&self) {
        sqlx::query("UPDATE notification_queue SET next_attempt_at = now()")
            .execute(&self.db_pool)
            .await
            .expect("Failed to reschedule queued jobs.");
    }

    /// One worker iteration, exactly what the background loop runs.
    pub async fn run_pending_job(&self) -> ExecutionOutcome {
        worker::try_execute_task(
            &self.db_pool,
            &self.email_client,
            &self.config.get_app_base_url(),
            self.config.notification.max_attempts,
        )
        .await
        .expect("Failed to execute a queued notification job.")
    }

    /// Calls the dispatcher directly, the way the worker and the inline
    /// trigger do.
    pub async fn dispatch(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<DispatchOutcome, DispatchError> {
        dispatcher::dispatch(
            &self.db_pool,
            &self.email_client,
            &self.config.get_app_base_url(),
            kind,
            id,
        )
        .await
    }

    pub async fn sent_mail(&self) -> Vec<wiremock::Request> {
        self.email_server.received_requests().await.unwrap()
    }
}

/// The blind-copy recipient list of a captured `/mail/send` request.
pub fn bcc_addresses(request: &wiremock::Request) -> Vec<String> {
    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();

    body["personalizations"][0]["bcc"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|entry| entry["email"].as_str().unwrap().to_string())
                .collect()
        })
        .unwrap_or_default()
}

pub fn mail_subject(request: &wiremock::Request) -> String {
    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();

    body["subject"].as_str().unwrap().to_string()
}

async fn configure_db(db_config: &mut DatabaseSettings, db_test_name: String) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect_with(&db_config.get_db_options())
        .await
        .expect("Failed to connect to Postgres.");

    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, db_test_name))
        .await
        .expect("Failed to create database.");

    connection
        .close()
        .await
        .expect("Failed to close connection.");

    // Execute migrations
    db_config.set_name(db_test_name);

    let db_pool = get_connection_db_pool(db_config);

    migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run migrations.");

    db_pool
}
