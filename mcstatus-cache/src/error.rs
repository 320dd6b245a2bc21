use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
  #[error("status query timed out after {}ms", .0.as_millis())]
  Timeout(Duration),

  #[error("connection failed: {0}")]
  Connection(#[from] std::io::Error),

  #[error("invalid status response: {0}")]
  Protocol(String),
}

pub type Result<T> = std::result::Result<T, QueryError>;
