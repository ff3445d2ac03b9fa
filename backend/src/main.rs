use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::sync::Arc;

mod config;
mod db;
mod handlers;
mod integrations;
mod middleware;
mod models;
mod services;

use config::Config;
use integrations::{
    BillingProvider, CloudinaryHost, DisabledImageHost, ImageHost, LogMailer, Mailer, SendGridMailer, StripeClient,
};

fn build_mailer(config: &Config) -> Arc<dyn Mailer> {
    match config.sendgrid_api_key {
        Some(ref api_key) => Arc::new(SendGridMailer::new(api_key.clone(), config.email_from.clone())),
        None => {
            log::warn!("SENDGRID_API_KEY not set, invitation emails will only be logged");
            Arc::new(LogMailer)
        }
    }
}

fn build_image_host(config: &Config) -> Arc<dyn ImageHost> {
    match config.cloudinary_cloud_name {
        Some(ref cloud_name) => Arc::new(CloudinaryHost::new(
            cloud_name.clone(),
            config.cloudinary_upload_preset.clone(),
        )),
        None => {
            log::warn!("CLOUDINARY_CLOUD_NAME not set, photo uploads are disabled");
            Arc::new(DisabledImageHost)
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    log::info!("Starting server at {}:{}", config.host, config.port);

    // Create database pool
    let pool = db::connect(&config.database_url)
        .await
        .expect("Failed to create database pool");

    // Run migrations
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    log::info!("Database migrations completed");

    if config.stripe_webhook_secret.is_empty() {
        log::warn!("STRIPE_WEBHOOK_SECRET not set, billing webhooks will be rejected");
    }

    let billing: Arc<dyn BillingProvider> = Arc::new(StripeClient::new(
        config.stripe_secret_key.clone(),
        config.site_url.clone(),
    ));

    // Create rate limiter for login (5 attempts per 15 minutes)
    let login_rate_limiter = Arc::new(middleware::RateLimiter::new(5, 15 * 60));

    // Create app state
    let app_state = web::Data::new(models::AppState {
        db: pool,
        config: config.clone(),
        login_rate_limiter,
        mailer: build_mailer(&config),
        images: build_image_host(&config),
        billing,
    });

    // Start HTTP server
    HttpServer::new(move || {
        let allowed_origins = app_state.config.cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origin_str = origin.to_str().unwrap_or("");
                allowed_origins.iter().any(|allowed| origin_str == allowed)
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type"])
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .app_data(handlers::json_config())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
