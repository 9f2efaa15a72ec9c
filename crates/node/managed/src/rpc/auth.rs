//! JWT authentication of the interop RPC endpoint.

use alloy_rpc_types_engine::JwtSecret;
use http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use jsonrpsee::server::{HttpBody, HttpRequest, HttpResponse};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::warn;

/// A tower layer rejecting requests whose `Authorization: Bearer <jwt>` header does not
/// validate against the shared secret.
#[derive(Debug, Clone)]
pub struct JwtAuthLayer {
    secret: JwtSecret,
}

impl JwtAuthLayer {
    /// Constructs a new [`JwtAuthLayer`].
    pub const fn new(secret: JwtSecret) -> Self {
        Self { secret }
    }
}

impl<S> Layer<S> for JwtAuthLayer {
    type Service = JwtAuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        JwtAuthMiddleware { inner, secret: self.secret.clone() }
    }
}

/// The middleware service installed by [`JwtAuthLayer`].
#[derive(Debug, Clone)]
pub struct JwtAuthMiddleware<S> {
    inner: S,
    secret: JwtSecret,
}

impl<S, ReqBody> Service<HttpRequest<ReqBody>> for JwtAuthMiddleware<S>
where
    S: Service<HttpRequest<ReqBody>, Response = HttpResponse> + Clone + Send + 'static,
    S::Error: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    S::Future: Send,
    ReqBody: Send + 'static,
{
    type Response = HttpResponse;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: HttpRequest<ReqBody>) -> Self::Future {
        match authorize(&self.secret, req.headers()) {
            Ok(()) => {
                let fut = self.inner.call(req);
                Box::pin(async move { fut.await })
            }
            Err(reason) => {
                warn!(target: "managed_mode::rpc", %reason, "Rejected unauthenticated request");
                Box::pin(async move { Ok(unauthorized(reason)) })
            }
        }
    }
}

fn authorize(secret: &JwtSecret, headers: &HeaderMap) -> Result<(), String> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| "missing authorization header".to_string())?;
    let value = header.to_str().map_err(|_| "malformed authorization header".to_string())?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| "authorization is not a bearer token".to_string())?;
    secret.validate(token).map_err(|err| err.to_string())
}

fn unauthorized(reason: String) -> HttpResponse {
    let mut response = HttpResponse::new(HttpBody::from(reason));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response
}
