/// Validation of configuration values read at startup
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Upstream host cannot be empty")]
    HostEmpty,

    #[error("Upstream host too long (max 253 characters, got {0})")]
    HostTooLong(usize),

    #[error("Upstream host contains invalid characters")]
    HostInvalidChars,

    #[error("Port cannot be 0")]
    PortZero,

    #[error("Query timeout must be between 1 and {max}ms (got {actual})")]
    TimeoutOutOfRange { max: u64, actual: u64 },

    #[error("Rate limit must be between 1 and {max} requests per minute (got {actual})")]
    RateLimitOutOfRange { max: u64, actual: u64 },

    #[error("Rate limit burst cannot be 0")]
    BurstZero,

    #[error("Request timeout ({request_ms}ms) must be longer than the query timeout ({query_ms}ms)")]
    RequestTimeoutTooShort { request_ms: u64, query_ms: u64 },
}

/// Validates an upstream host name or IP literal
///
/// Rules:
/// - Cannot be empty
/// - Max 253 characters (DNS name limit)
/// - Only alphanumerics, '.', '-', '_' and ':' (for IPv6 literals)
pub fn validate_host(host: &str) -> Result<(), ValidationError> {
    if host.is_empty() {
        return Err(ValidationError::HostEmpty);
    }

    if host.len() > 253 {
        return Err(ValidationError::HostTooLong(host.len()));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':'))
    {
        return Err(ValidationError::HostInvalidChars);
    }

    Ok(())
}

pub fn validate_port(port: u16) -> Result<(), ValidationError> {
    if port == 0 {
        return Err(ValidationError::PortZero);
    }
    Ok(())
}

/// Validates the upstream query timeout in milliseconds
///
/// Rules:
/// - Must be non-zero (the timeout is mandatory)
/// - Max 60 seconds
pub fn validate_query_timeout(millis: u64) -> Result<(), ValidationError> {
    const MAX_TIMEOUT_MS: u64 = 60_000;

    if millis == 0 || millis > MAX_TIMEOUT_MS {
        return Err(ValidationError::TimeoutOutOfRange {
            max: MAX_TIMEOUT_MS,
            actual: millis,
        });
    }

    Ok(())
}

/// Validates the per-client rate limit
///
/// Rules:
/// - Between 1 and 6000 requests per minute
/// - Burst must be non-zero
pub fn validate_rate_limit(per_min: u64, burst: u32) -> Result<(), ValidationError> {
    const MAX_PER_MIN: u64 = 6_000;

    if per_min == 0 || per_min > MAX_PER_MIN {
        return Err(ValidationError::RateLimitOutOfRange {
            max: MAX_PER_MIN,
            actual: per_min,
        });
    }

    if burst == 0 {
        return Err(ValidationError::BurstZero);
    }

    Ok(())
}

/// The whole-request timeout has to outlast the upstream query, otherwise a slow
/// upstream surfaces as a 408 instead of an offline record.
pub fn validate_request_timeout(request_ms: u64, query_ms: u64) -> Result<(), ValidationError> {
    if request_ms <= query_ms {
        return Err(ValidationError::RequestTimeoutTooShort {
            request_ms,
            query_ms,
        });
    }
    Ok(())
}
