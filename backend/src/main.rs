mod auth;
mod classifier;
mod config;
mod dashboard;
mod db;
mod error;
mod routes;
mod storage;
mod upload;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use auth::jwt::SessionTokenService;
use auth::middleware::AdminAuthMiddleware;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use classifier::config::ClassifierConfig;
use classifier::model::FreshnessModel;
use config::{AppConfig, StorageBackend};
use db::dynamodb_repository::DynamoDbRepository;
use db::memory_repository::MemoryRepository;
use db::repository::FreshnessRepository;
use routes::configure_routes;
use std::io;
use std::sync::Arc;
use storage::image_store::ImageStore;
use upload::service::UploadService;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    log::error!("{}: {}", context, err);
    io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    if let Ok(current_dir) = std::env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let classifier_config = ClassifierConfig::load(&config.classifier_config_path)
        .map_err(|e| startup_error("Failed to read classifier config", e))?;
    let model = FreshnessModel::load(&classifier_config)
        .map_err(|e| startup_error("Model loading failed", e))?;

    let repository: Arc<dyn FreshnessRepository> = match config.storage_backend {
        StorageBackend::DynamoDb => {
            let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            let client = DynamoDbClient::new(&aws_config);
            log::info!("Using DynamoDB tables {:?}", config.tables);
            Arc::new(DynamoDbRepository::new(client, config.tables.clone()))
        }
        StorageBackend::Memory => {
            log::warn!("Using in-memory storage; records are lost on restart");
            Arc::new(MemoryRepository::new())
        }
    };

    auth::admins::seed_default_admin(
        repository.as_ref(),
        &config.default_admin_email,
        config.default_admin_password.as_deref(),
    )
    .await
    .map_err(|e| startup_error("Failed to seed default admin", e))?;

    let store = ImageStore::new(
        config.staging_dir.clone(),
        config.images_dir.clone(),
        config.max_upload_bytes,
    );
    store
        .ensure_dirs()
        .await
        .map_err(|e| startup_error("Failed to create image directories", e))?;
    let media_dir = store.images_dir().to_path_buf();

    let upload_service = web::Data::new(UploadService::new(
        Arc::new(model),
        repository.clone(),
        store,
    ));
    let repository = web::Data::from(repository);

    let token_service = SessionTokenService::new(&config.session_secret, config.session_ttl_hours);
    let auth_middleware = AdminAuthMiddleware::new(token_service.clone());
    let token_service = web::Data::new(token_service);

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(repository.clone())
            .app_data(upload_service.clone())
            .app_data(token_service.clone())
            .configure(|cfg| configure_routes(cfg, media_dir.clone(), auth_middleware.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
