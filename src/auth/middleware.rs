use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use chrono::Utc;
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::AccessAuthority;
use crate::error::AppError;

/// Paths reachable without a session token.
const PUBLIC_PATHS: [&str; 4] = [
    "/health",
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/signup",
];

/// Requires a valid `Authorization: Bearer <token>` header on every non-public path and
/// stores the resulting [`Principal`](crate::auth::Principal) in the request extensions.
///
/// Expects a `web::Data<AccessAuthority>` in the app data.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path();
        if PUBLIC_PATHS.iter().any(|public| path.starts_with(public)) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_owned());
        let authority = req.app_data::<web::Data<AccessAuthority>>().cloned();
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let authority = authority.ok_or_else(|| {
                AppError::InternalServerError("Access authority is not configured".into())
            })?;
            let token = token.ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

            let principal = authority
                .authorize_request(&token, Utc::now())
                .await
                .map_err(|denied| {
                    log::debug!("rejected token for {}: {}", req.path(), denied);
                    AppError::from(denied)
                })?;

            log::debug!(
                "user {} authorized for {} until {}",
                principal.id,
                req.path(),
                principal.expires_at
            );
            req.extensions_mut().insert(principal);
            service.call(req).await
        })
    }
}
