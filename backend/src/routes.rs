use actix_files::Files;
use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;

use crate::auth;
use crate::auth::middleware::{AdminAuthMiddleware, AuthenticatedAdmin};
use crate::dashboard;
use crate::db::repository::{FreshnessRepository, Page};
use crate::error::ApiError;
use crate::upload::service::UploadService;

const DEVICE_ID_LIMIT: usize = 256;

pub fn configure_routes(
    cfg: &mut web::ServiceConfig,
    media_dir: PathBuf,
    auth_middleware: AdminAuthMiddleware,
) {
    cfg.service(web::resource("/api/images").route(web::post().to(upload_image)))
        .service(web::resource("/auth/login").route(web::post().to(auth::routes::login)))
        .service(web::resource("/auth/logout").route(web::post().to(auth::routes::logout)))
        .service(
            web::scope("/admin")
                .wrap(auth_middleware)
                .route("/me", web::get().to(auth::routes::me))
                .route("/dashboard", web::get().to(show_dashboard))
                .route("/devices", web::get().to(list_devices))
                .route("/images", web::get().to(list_images))
                .route("/feedbacks", web::get().to(list_feedbacks))
                .route("/analysis", web::get().to(show_analysis))
                .service(Files::new("/media", media_dir)),
        );
}

async fn upload_image(
    upload_service: web::Data<UploadService>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let max_bytes = upload_service.store().max_upload_bytes();
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut device_id: Option<String> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart payload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or("upload")
                    .to_string();
                let data = read_field(&mut field, max_bytes).await?;
                file = Some((file_name, data));
            }
            "device_id" => {
                let data = read_field(&mut field, DEVICE_ID_LIMIT).await?;
                let value = String::from_utf8(data)
                    .map_err(|_| ApiError::BadRequest("device_id must be UTF-8".to_string()))?;
                device_id = Some(value.trim().to_string());
            }
            other => {
                log::debug!("Ignoring multipart field '{}'", other);
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| ApiError::BadRequest(e.to_string()))?;
                }
            }
        }
    }

    let (file_name, data) =
        file.ok_or_else(|| ApiError::BadRequest("Missing image file".to_string()))?;
    let device_id = device_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing device_id".to_string()))?;

    let response = upload_service
        .handle_upload(&file_name, &data, &device_id)
        .await?;
    Ok(HttpResponse::Created().json(response))
}

async fn read_field(field: &mut Field, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk =
            chunk.map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        if data.len() + chunk.len() > limit {
            return Err(ApiError::PayloadTooLarge(format!(
                "Field exceeds the {} byte limit",
                limit
            )));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

async fn show_dashboard(
    admin: AuthenticatedAdmin,
    repo: web::Data<dyn FreshnessRepository>,
) -> Result<HttpResponse, ApiError> {
    log::debug!("Dashboard requested by {}", admin.0);
    let summary = dashboard::build_summary(repo.get_ref())
        .await
        .map_err(|e| ApiError::internal("Failed to load dashboard data", e))?;
    Ok(HttpResponse::Ok().json(summary))
}

#[derive(Debug, Deserialize)]
struct DevicesQuery {
    page: Option<usize>,
}

async fn list_devices(
    admin: AuthenticatedAdmin,
    repo: web::Data<dyn FreshnessRepository>,
    query: web::Query<DevicesQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::new(query.page.unwrap_or(1), Page::DEFAULT_PER_PAGE);
    log::debug!("Devices page {} requested by {}", page.page, admin.0);
    let devices = repo
        .list_devices(page)
        .await
        .map_err(|e| ApiError::internal("Failed to load devices", e))?;
    Ok(HttpResponse::Ok().json(json!({"devices": devices, "page": page.page})))
}

async fn list_images(
    admin: AuthenticatedAdmin,
    repo: web::Data<dyn FreshnessRepository>,
) -> Result<HttpResponse, ApiError> {
    log::debug!("Images requested by {}", admin.0);
    let images = repo
        .list_images()
        .await
        .map_err(|e| ApiError::internal("Failed to load images", e))?;
    Ok(HttpResponse::Ok().json(json!({"images": images})))
}

async fn list_feedbacks(
    admin: AuthenticatedAdmin,
    repo: web::Data<dyn FreshnessRepository>,
) -> Result<HttpResponse, ApiError> {
    log::debug!("Feedbacks requested by {}", admin.0);
    let feedbacks = repo
        .list_feedbacks()
        .await
        .map_err(|e| ApiError::internal("Failed to load feedbacks", e))?;
    Ok(HttpResponse::Ok().json(json!({"feedbacks": feedbacks})))
}

async fn show_analysis(
    admin: AuthenticatedAdmin,
    repo: web::Data<dyn FreshnessRepository>,
) -> Result<HttpResponse, ApiError> {
    log::debug!("Analysis requested by {}", admin.0);
    let results = repo
        .list_results()
        .await
        .map_err(|e| ApiError::internal("Failed to load analysis", e))?;
    Ok(HttpResponse::Ok().json(json!({"results": results})))
}
