//! The HTTP surface of the dispatcher.

use crate::{
    core::Store,
    dispatch::Dispatcher,
    k8s::Cluster,
};
use futures::future;
use http_body_util::BodyExt;
use hyper::{http, Request, Response};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// The header that identifies the tenant a request is made on behalf of.
pub const TENANT_ID_HEADER: &str = "Tenant-ID";

pub struct Api<C, S: ?Sized> {
    dispatcher: Arc<Dispatcher<C, S>>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read request body: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),
}

type Body = http_body_util::Full<bytes::Bytes>;

#[derive(Serialize)]
struct Message<'a> {
    message: &'a str,
}

/// A request the API serves.
#[derive(Debug, PartialEq, Eq)]
enum Route {
    Create,
    Delete {
        application_id: String,
        environment: String,
        microservice_id: String,
    },
}

// === impl Api ===

impl<C, S: ?Sized> Api<C, S> {
    pub fn new(dispatcher: Dispatcher<C, S>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

impl<C, S: ?Sized> Clone for Api<C, S> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<C, S, B> tower::Service<Request<B>> for Api<C, S>
where
    C: Cluster,
    S: Store + ?Sized + 'static,
    B: hyper::body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = Response<Body>;
    type Error = Error;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        trace!(method = %req.method(), path = %req.uri().path());
        let route = match Route::parse(req.method(), req.uri().path()) {
            Some(route) => route,
            None => {
                return Box::pin(future::ok(
                    Response::builder()
                        .status(http::StatusCode::NOT_FOUND)
                        .body(Body::default())
                        .expect("not found response must be valid"),
                ))
            }
        };

        let tenant_id = match req
            .headers()
            .get(TENANT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
        {
            Some(tenant_id) => tenant_id.to_string(),
            None => {
                return Box::pin(future::ready(message_response(
                    http::StatusCode::BAD_REQUEST,
                    &format!("missing {} header", TENANT_ID_HEADER),
                )))
            }
        };

        let dispatcher = self.dispatcher.clone();
        Box::pin(async move {
            let result = match route {
                Route::Create => {
                    let bytes = req
                        .into_body()
                        .collect()
                        .await
                        .map_err(|e| Error::Request(e.into()))?
                        .to_bytes();
                    dispatcher
                        .create(&tenant_id, &bytes)
                        .await
                        .map(|accepted| serde_json::to_vec(&accepted))
                }
                Route::Delete {
                    application_id,
                    environment,
                    microservice_id,
                } => dispatcher
                    .delete(&tenant_id, &application_id, &environment, &microservice_id)
                    .await
                    .map(|()| serde_json::to_vec(&Message { message: "deleted" })),
            };

            match result {
                Ok(json) => {
                    debug!(%tenant_id, "Request succeeded");
                    json_response(http::StatusCode::OK, json?)
                }
                Err(error) => {
                    let status = error.status_code();
                    if status.is_server_error() {
                        warn!(%tenant_id, %error, "Request failed");
                    } else {
                        info!(%tenant_id, %error, "Request rejected");
                    }
                    message_response(status, &error.to_string())
                }
            }
        })
    }
}

// === impl Route ===

impl Route {
    fn parse(method: &http::Method, path: &str) -> Option<Self> {
        let segments = path.trim_matches('/').split('/').collect::<Vec<_>>();
        match segments.as_slice() {
            ["microservice"] if method == http::Method::POST => Some(Self::Create),
            ["application", application_id, "environment", environment, "microservice", microservice_id]
                if method == http::Method::DELETE
                    && !application_id.is_empty()
                    && !environment.is_empty()
                    && !microservice_id.is_empty() =>
            {
                Some(Self::Delete {
                    application_id: application_id.to_string(),
                    environment: environment.to_string(),
                    microservice_id: microservice_id.to_string(),
                })
            }
            _ => None,
        }
    }
}

fn message_response(status: http::StatusCode, message: &str) -> Result<Response<Body>, Error> {
    let json = serde_json::to_vec(&Message { message })?;
    json_response(status, json)
}

fn json_response(status: http::StatusCode, json: Vec<u8>) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(json))
        .expect("json response must be valid"))
}

#[cfg(test)]
mod tests;
