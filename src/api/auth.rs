// Bearer-token guard for the /api/v1 scope

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;

use crate::api::models::ApiResponse;

// Probes stay reachable without a token.
const PUBLIC_PATHS: [&str; 2] = ["/", "/health"];

/// Rejects requests whose `Authorization: Bearer` token differs from `API_SECRET`.
pub struct Auth {
    secret: Rc<str>,
}

impl Auth {
    pub fn new(secret: String) -> Self {
        Self {
            secret: Rc::from(secret),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Auth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddleware {
            service,
            secret: Rc::clone(&self.secret),
        }))
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    secret: Rc<str>,
}

fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let allowed = PUBLIC_PATHS.contains(&req.path())
            || bearer_token(&req).is_some_and(|token| token == &*self.secret);

        if allowed {
            let fut = self.service.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            });
        }

        tracing::debug!(path = %req.path(), "rejected request without valid bearer token");
        Box::pin(async move {
            let response = HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error(
                    "Invalid or missing authentication token",
                ))
                .map_into_right_body();
            Ok(req.into_response(response))
        })
    }
}
