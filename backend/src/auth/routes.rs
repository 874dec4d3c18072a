use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::{Either, HttpResponse, web};
use serde_json::json;

use super::admins;
use super::jwt::SessionTokenService;
use super::middleware::{AuthenticatedAdmin, SESSION_COOKIE};
use super::models::{AdminProfile, LoginRequest, LoginResponse};
use crate::db::repository::FreshnessRepository;
use crate::error::ApiError;

pub async fn login(
    credentials: Either<web::Json<LoginRequest>, web::Form<LoginRequest>>,
    repo: web::Data<dyn FreshnessRepository>,
    token_service: web::Data<SessionTokenService>,
) -> Result<HttpResponse, ApiError> {
    let credentials = match credentials {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };
    let email = credentials.email.trim();

    let admin = admins::authenticate(repo.get_ref(), email, &credentials.password)
        .await
        .map_err(|e| ApiError::internal("Failed to verify credentials", e))?;

    let Some(admin) = admin else {
        log::warn!("Failed admin login for {}", email);
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    };

    let profile = AdminProfile::from(admin);
    let token = token_service
        .generate_token(&profile)
        .map_err(|e| ApiError::internal("Failed to issue session", e))?;

    let cookie = Cookie::build(SESSION_COOKIE, token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(token_service.ttl().num_seconds()))
        .finish();

    log::info!("Admin {} logged in", profile.admin_id);
    Ok(HttpResponse::Ok().cookie(cookie).json(LoginResponse {
        token,
        admin: profile,
    }))
}

pub async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({"message": "Logged out"}))
}

pub async fn me(admin: AuthenticatedAdmin) -> HttpResponse {
    log::debug!("/admin/me called for admin {}", admin.0);
    HttpResponse::Ok().json(json!({"admin_id": admin.0}))
}
