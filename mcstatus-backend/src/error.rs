use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use tower_governor::GovernorError;

use crate::routes::ENDPOINTS;

/// API error response structure
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
  pub error: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub available_endpoints: Option<Vec<&'static str>>,
}

impl ErrorResponse {
  pub fn new(error: impl Into<String>) -> Self {
    Self {
      error: error.into(),
      available_endpoints: None,
    }
  }

  pub fn with_endpoints(error: impl Into<String>) -> Self {
    Self {
      error: error.into(),
      available_endpoints: Some(ENDPOINTS.iter().map(|(path, _)| *path).collect()),
    }
  }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
  NotFound,
  Internal(String),
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    match self {
      AppError::NotFound => {
        let error_response = ErrorResponse::with_endpoints("Endpoint not found");
        (StatusCode::NOT_FOUND, Json(error_response)).into_response()
      }
      AppError::Internal(detail) => {
        // Log the detailed error server-side, never send it to the client
        tracing::error!(%detail, "Unhandled error in request handler");
        let error_response = ErrorResponse::new("Internal server error");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(error_response)).into_response()
      }
    }
  }
}

/// Turn a handler panic into the generic 500 response.
pub(crate) fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
  let detail = if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else if let Some(s) = panic.downcast_ref::<&str>() {
    s.to_string()
  } else {
    "unknown panic payload".to_string()
  };
  AppError::Internal(detail).into_response()
}

/// Render rate limiter rejections in the same JSON shape as other errors.
pub(crate) fn rate_limited_response(err: GovernorError) -> Response {
  match err {
    GovernorError::TooManyRequests { wait_time, headers } => {
      tracing::warn!(wait_secs = wait_time, "Rate limit exceeded");
      let error_response = ErrorResponse::new("Too many requests, try again later");
      let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(error_response)).into_response();
      if let Some(headers) = headers {
        response.headers_mut().extend(headers);
      }
      response
    }
    GovernorError::UnableToExtractKey => {
      AppError::Internal("rate limiter could not determine the client IP".to_string())
        .into_response()
    }
    GovernorError::Other { code, msg, headers } => {
      let error_response = ErrorResponse::new(msg.unwrap_or_else(|| "Request rejected".to_string()));
      let mut response = (code, Json(error_response)).into_response();
      if let Some(headers) = headers {
        response.headers_mut().extend(headers);
      }
      response
    }
  }
}
