use super::jwt::SessionTokenService;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use actix_web::{FromRequest, HttpRequest};
use futures::future::{Ready, err, ok};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub const SESSION_COOKIE: &str = "admin_session";

/// Guards a scope: every request must carry a valid admin session token,
/// either in the session cookie or as a Bearer token.
#[derive(Clone)]
pub struct AdminAuthMiddleware {
    token_service: Arc<SessionTokenService>,
}

impl AdminAuthMiddleware {
    pub fn new(token_service: SessionTokenService) -> Self {
        Self {
            token_service: Arc::new(token_service),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Transform = AdminAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminAuthMiddlewareService {
            service: Arc::new(service),
            token_service: self.token_service.clone(),
        })
    }
}

pub struct AdminAuthMiddlewareService<S> {
    service: Arc<S>,
    token_service: Arc<SessionTokenService>,
}

/// Request-scoped identity attached by the middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AdminId(String);

#[derive(Debug)]
enum AuthError {
    NoToken,
    InvalidHeaderFormat,
    NotBearerToken,
    VerificationFailed(String),
}

impl AuthError {
    fn log_message(&self, path: &str) -> String {
        match self {
            AuthError::NoToken => format!("No session cookie or Authorization header for path: {}", path),
            AuthError::InvalidHeaderFormat => format!("Invalid Authorization header format (non-UTF-8) for path: {}", path),
            AuthError::NotBearerToken => format!("Authorization header for path {} doesn't start with 'Bearer '", path),
            AuthError::VerificationFailed(e) => format!("Session token verification failed for path {}: {}", path, e),
        }
    }

    fn client_error_json(&self) -> serde_json::Value {
        let error_message = match self {
            AuthError::VerificationFailed(_) => "Session expired or invalid",
            _ => "Admin login required",
        };
        serde_json::json!({"error": error_message})
    }
}

fn request_token(req: &ServiceRequest) -> Result<String, AuthError> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        return Ok(cookie.value().to_string());
    }
    let auth_header = req.headers().get("Authorization").ok_or(AuthError::NoToken)?;
    let auth_str = auth_header.to_str().map_err(|_| AuthError::InvalidHeaderFormat)?;
    let token = auth_str.strip_prefix("Bearer ").ok_or(AuthError::NotBearerToken)?;
    Ok(token.to_string())
}

fn validate_request_token(
    req: &ServiceRequest,
    token_service: &SessionTokenService,
) -> Result<AdminId, AuthError> {
    let token = request_token(req)?;
    let claims = token_service
        .verify_token(&token)
        .map_err(|e| AuthError::VerificationFailed(e.to_string()))?;
    log::debug!("Session token verified for admin: {}", claims.sub);
    Ok(AdminId(claims.sub))
}

impl<S, B> Service<ServiceRequest> for AdminAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let token_service = self.token_service.clone();

        Box::pin(async move {
            let path_str = req.path().to_string();

            match validate_request_token(&req, &token_service) {
                Ok(admin_id) => {
                    req.extensions_mut().insert(admin_id);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(auth_error) => {
                    log::warn!("{}", auth_error.log_message(&path_str));

                    let (http_req, _payload) = req.into_parts();
                    let response = HttpResponse::Unauthorized()
                        .json(auth_error.client_error_json())
                        .map_into_right_body();
                    Ok(ServiceResponse::new(http_req, response))
                }
            }
        })
    }
}

/// The admin id of the current request; only available behind [`AdminAuthMiddleware`].
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin(pub String);

impl FromRequest for AuthenticatedAdmin {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<AdminId>() {
            Some(AdminId(admin_id)) => ok(AuthenticatedAdmin(admin_id.clone())),
            None => {
                log::warn!(
                    "AuthenticatedAdmin requested outside the admin middleware for path: {}",
                    req.path()
                );
                err(actix_web::error::ErrorUnauthorized("Admin login required"))
            }
        }
    }
}
