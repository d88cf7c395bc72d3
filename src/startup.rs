use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::config::{DatabaseSettings, Settings};
use crate::domain::email_address::EmailAddress;
use crate::email_client::EmailClient;
use crate::notifications::trigger::DispatchMode;
use crate::routes::{
    create_post, create_post_category, create_video, create_video_category, delete_post,
    delete_video, get_post, get_video, handle_contact_message, handle_create_subscription,
    health_check, list_posts, list_posts_admin, list_subscribers, list_videos, list_videos_admin,
    update_post, update_subscriber, update_video,
};

/// Public origin of the site, used to build the canonical links included in
/// notification emails.
pub struct ApplicationBaseUrl(pub String);

/// Site-owner address that contact-form submissions are relayed to.
pub struct ContactRecipient(pub EmailAddress);

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, std::io::Error> {
        let db_pool = get_connection_db_pool(&config.database);
        let email_client = get_email_client(&config);
        let contact_recipient = ContactRecipient(
            config
                .get_contact_recipient()
                .expect("Contact recipient email is not valid"),
        );
        let dispatch_mode = config
            .get_dispatch_mode()
            .expect("Dispatch mode is not valid");

        let listener =
            TcpListener::bind(config.get_address()).expect("Failed to bind the address.");
        let port = listener.local_addr().unwrap().port();
        let server = run(
            listener,
            db_pool,
            email_client,
            config.get_app_base_url(),
            contact_recipient,
            dispatch_mode,
        )?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    db_pool: PgPool,
    email_client: EmailClient,
    base_url: String,
    contact_recipient: ContactRecipient,
    dispatch_mode: DispatchMode,
) -> Result<Server, std::io::Error> {
    let db_pool = web::Data::new(db_pool);
    let email_client = web::Data::new(email_client);
    let base_url = web::Data::new(ApplicationBaseUrl(base_url));
    let contact_recipient = web::Data::new(contact_recipient);
    let dispatch_mode = web::Data::new(dispatch_mode);

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/subscriptions", web::post().to(handle_create_subscription))
            .route("/contact", web::post().to(handle_contact_message))
            .route("/blog", web::get().to(list_posts))
            .route("/blog/{slug}", web::get().to(get_post))
            .route("/videos", web::get().to(list_videos))
            .route("/videos/{slug}", web::get().to(get_video))
            .route("/admin/posts", web::get().to(list_posts_admin))
            .route("/admin/posts", web::post().to(create_post))
            .route("/admin/posts/{id}", web::put().to(update_post))
            .route("/admin/posts/{id}", web::delete().to(delete_post))
            .route("/admin/videos", web::get().to(list_videos_admin))
            .route("/admin/videos", web::post().to(create_video))
            .route("/admin/videos/{id}", web::put().to(update_video))
            .route("/admin/videos/{id}", web::delete().to(delete_video))
            .route("/admin/post_categories", web::post().to(create_post_category))
            .route("/admin/video_categories", web::post().to(create_video_category))
            .route("/admin/subscribers", web::get().to(list_subscribers))
            .route("/admin/subscribers/{id}", web::put().to(update_subscriber))
            .app_data(db_pool.clone())
            .app_data(email_client.clone())
            .app_data(base_url.clone())
            .app_data(contact_recipient.clone())
            .app_data(dispatch_mode.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn get_connection_db_pool(config: &DatabaseSettings) -> Pool<Postgres> {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.get_db_options())
}

pub fn get_email_client(config: &Settings) -> EmailClient {
    let sender_email = config
        .get_email_client_sender()
        .expect("Sender email is not valid");
    let noreply_email = config
        .get_email_client_noreply()
        .expect("No-reply email is not valid");

    EmailClient::new(
        config.get_email_client_base_url(),
        sender_email,
        noreply_email,
        config.get_email_client_api(),
        None,
    )
}
