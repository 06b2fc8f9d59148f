use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{http::header, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;

use choreforge::auth::{AccessAuthority, AuthMiddleware};
use choreforge::config::Config;
use choreforge::routes::{self, health};
use choreforge::store::{IdentityStore, PgIdentityStore, PgTaskStore, TaskStore};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(|e| {
        log::error!("invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;
    let settings = config.auth_settings();

    let pool = PgPoolOptions::new()
        .acquire_timeout(settings.store_timeout)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            log::error!("failed to connect to database: {}", e);
            io::Error::new(io::ErrorKind::ConnectionRefused, e)
        })?;

    let identities: Arc<dyn IdentityStore> = Arc::new(PgIdentityStore::new(pool.clone()));
    let tasks: Arc<dyn TaskStore> = Arc::new(PgTaskStore::new(pool));
    let authority = web::Data::new(AccessAuthority::new(identities, &settings));
    let tasks = web::Data::from(tasks);

    if !settings.resolve_subject {
        log::warn!("token subjects are not re-resolved; deleted accounts keep access until expiry");
    }

    let allowed_origin = config.cors_allowed_origin.clone();
    log::info!("Starting ChoreForge server at {}", config.server_url());

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&allowed_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(authority.clone())
            .app_data(tasks.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
