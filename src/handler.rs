//! HTTP request handler for the matrix API
//!
//! Routes:
//! - `GET /api/models` - list of served models
//! - `GET /api/{model}/matrix/{name}?row=R&col=C` - a matrix or DQI grid,
//!   or a single row or column of it

use crate::error::{MatrixError, Result};
use crate::metrics::CacheMetrics;
use crate::model::{Model, ModelRegistry};
use crate::models::{MatrixName, SliceQuery};
use crate::request_metrics::RequestMetrics;
use crate::slice::{select_grid, select_matrix};
use bytes::Bytes;
use http::{header, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Request handler for the matrix API
pub struct MatrixHandler {
    registry: Arc<ModelRegistry>,
    metrics: Arc<CacheMetrics>,
    request_metrics: Option<RequestMetrics>,
}

#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Models,
    Matrix { model: &'a str, name: &'a str },
    NotFound,
}

fn route(path: &str) -> Route<'_> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        ["api", "models"] => Route::Models,
        ["api", model, "matrix", name] if !model.is_empty() && !name.is_empty() => Route::Matrix {
            model: *model,
            name: *name,
        },
        _ => Route::NotFound,
    }
}

impl MatrixHandler {
    /// Create a new handler
    pub fn new(registry: Arc<ModelRegistry>, metrics: Arc<CacheMetrics>) -> Self {
        Self {
            registry,
            metrics,
            request_metrics: None,
        }
    }

    /// Enable Prometheus request metrics
    pub fn with_request_metrics(mut self, metrics: RequestMetrics) -> Self {
        self.request_metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Handle one HTTP request
    ///
    /// Never fails: every error is mapped to a response with the matching
    /// status code.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>> {
        let started = Instant::now();
        let method = req.method().clone();
        let uri = req.uri().clone();
        debug!("{} {}", method, uri);

        let (kind, response) = match (&method, route(uri.path())) {
            (&Method::GET, Route::Models) => ("models", self.serve_models()),
            (&Method::GET, Route::Matrix { model, name }) => {
                let kind = match name.parse::<MatrixName>() {
                    Ok(MatrixName::Numeric(_)) => "matrix",
                    Ok(MatrixName::Dqi(_)) => "dqi",
                    Err(_) => "unknown",
                };
                let response = match self.serve_matrix(model, name, uri.query()).await {
                    Ok(body) => json_response(body),
                    Err(e) => self.error_response(model, name, &e),
                };
                (kind, response)
            }
            (_, Route::NotFound) => (
                "other",
                text_response(StatusCode::NOT_FOUND, "404 Not Found"),
            ),
            _ => (
                "other",
                text_response(StatusCode::METHOD_NOT_ALLOWED, "Only GET is allowed"),
            ),
        };

        let status = response.status();
        self.metrics.record_request();
        if status.is_client_error() {
            self.metrics.record_client_error();
        } else if status.is_server_error() {
            self.metrics.record_server_error();
        }
        if let Some(metrics) = &self.request_metrics {
            metrics.record_request(kind, status.as_u16(), started.elapsed().as_secs_f64());
        }

        info!(
            "{} {} -> {} in {:?}",
            method,
            uri,
            status.as_u16(),
            started.elapsed()
        );
        response
    }

    /// Load the requested matrix and serialize the selected slice
    ///
    /// Index parameters are validated before any model or cache access.
    async fn serve_matrix(&self, model: &str, name: &str, query: Option<&str>) -> Result<Bytes> {
        let selector = SliceQuery::from_query(query)?;
        let model = self.model(model)?;

        match name.parse::<MatrixName>()? {
            MatrixName::Numeric(key) => {
                let matrix = model.cache().matrix(key).await?;
                to_json(&select_matrix(&matrix, selector)?)
            }
            MatrixName::Dqi(key) => {
                let grid = model.cache().grid(key).await?;
                to_json(&select_grid(&grid, selector)?)
            }
        }
    }

    fn serve_models(&self) -> Response<Full<Bytes>> {
        let models: Vec<&Model> = self.registry.models().map(|m| m.as_ref()).collect();
        match to_json(&models) {
            Ok(body) => json_response(body),
            Err(e) => {
                error!("Failed to serialize model list: {}", e);
                text_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list models")
            }
        }
    }

    fn model(&self, id: &str) -> Result<Arc<Model>> {
        self.registry
            .get(id)
            .ok_or_else(|| MatrixError::UnknownModel(id.to_string()))
    }

    fn error_response(&self, model: &str, name: &str, err: &MatrixError) -> Response<Full<Bytes>> {
        let status =
            StatusCode::from_u16(err.to_http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if err.is_client_error() {
            debug!("Rejected request for {}/{}: {}", model, name, err);
            text_response(status, err.to_string())
        } else {
            error!("Failed to serve {}/{}: {}", model, name, err);
            text_response(status, format!("Failed to load matrix {}", name))
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| MatrixError::InternalError(format!("JSON encoding failed: {}", e)))
}

fn json_response(body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
