use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use chrono::{DateTime, SecondsFormat, Utc};
use std::net::SocketAddr;
use std::time::Instant;

pub fn now() -> DateTime<Utc> {
  Utc::now()
}

pub fn rfc3339(time: DateTime<Utc>) -> String {
  time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Seconds since `started`, with sub-second precision.
pub fn uptime_secs(started: Instant) -> f64 {
  started.elapsed().as_secs_f64()
}

/// Best-effort client address from proxy headers, for request logs.
pub fn client_ip(headers: &HeaderMap) -> Option<&str> {
  headers
    .get("x-forwarded-for")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(',').next())
    .map(str::trim)
    .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
}

/// Client address for request logs: proxy headers first, then the peer socket.
pub fn request_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
  match (client_ip(headers), peer) {
    (Some(ip), _) => ip.to_string(),
    (None, Some(addr)) => addr.ip().to_string(),
    (None, None) => "unknown".to_string(),
  }
}

pub fn user_agent(headers: &HeaderMap) -> Option<&str> {
  headers.get(USER_AGENT).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  #[test]
  fn test_client_ip_prefers_first_forwarded_hop() {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
    headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.1"));
    assert_eq!(client_ip(&headers), Some("203.0.113.7"));
  }

  #[test]
  fn test_client_ip_falls_back_to_real_ip() {
    let mut headers = HeaderMap::new();
    headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
    assert_eq!(client_ip(&headers), Some("198.51.100.2"));
    assert_eq!(client_ip(&HeaderMap::new()), None);
  }

  #[test]
  fn test_request_ip_uses_peer_without_proxy_headers() {
    let peer: SocketAddr = "192.0.2.44:51234".parse().unwrap();
    assert_eq!(request_ip(&HeaderMap::new(), Some(peer)), "192.0.2.44");
    assert_eq!(request_ip(&HeaderMap::new(), None), "unknown");

    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));
    assert_eq!(request_ip(&headers, Some(peer)), "203.0.113.7");
  }

  #[test]
  fn test_rfc3339_uses_utc_suffix() {
    let time = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    assert_eq!(rfc3339(time), "2023-11-14T22:13:20.000Z");
  }
}
