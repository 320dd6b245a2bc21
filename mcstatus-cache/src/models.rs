use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version label used when the upstream does not report one.
pub const UNKNOWN_VERSION: &str = "Unknown";

/// Raw result of an upstream status query. Every field is optional; the
/// upstream is free to omit any of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamStatus {
  /// Message of the day with formatting codes removed
  pub motd: Option<String>,
  /// Human readable version name (e.g. "Paper 1.21.1")
  pub version: Option<String>,
  /// Protocol number advertised by the server
  pub protocol: Option<i32>,
  pub players: Option<UpstreamPlayers>,
  /// Round-trip latency in milliseconds
  pub latency_ms: Option<u64>,
  /// Icon as a `data:` URL
  pub favicon: Option<String>,
  pub enforces_secure_chat: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamPlayers {
  pub online: u32,
  pub max: u32,
  /// Names from the player sample, when the server sends one
  pub sample: Option<Vec<String>>,
}

/// Player counts as served to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
  pub online: u32,
  pub max: u32,
  pub list: Vec<String>,
}

/// Fields that only exist on an online record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDetails {
  pub motd: String,
  pub players: Players,
  pub version: String,
  pub protocol: i32,
  pub ping: u64,
  pub favicon: Option<String>,
  pub enforces_secure_chat: bool,
}

/// Which optional upstream fields are forwarded to clients.
///
/// A field that is switched off is still serialized, holding its default, so
/// the response shape is the same whatever the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapingPolicy {
  pub include_favicon: bool,
  pub include_player_list: bool,
  /// Protocol number and secure chat flag
  pub include_debug: bool,
}

impl Default for ShapingPolicy {
  fn default() -> Self {
    Self {
      include_favicon: true,
      include_player_list: true,
      include_debug: true,
    }
  }
}

impl ServerDetails {
  /// Map an upstream result onto the served fields.
  ///
  /// | field                | default     |
  /// |----------------------|-------------|
  /// | `motd`               | `""`        |
  /// | `players.online/max` | `0`         |
  /// | `players.list`       | `[]`        |
  /// | `version`            | `"Unknown"` |
  /// | `protocol`           | `0`         |
  /// | `ping`               | `0`         |
  /// | `favicon`            | `null`      |
  /// | `enforcesSecureChat` | `false`     |
  pub fn from_upstream(upstream: UpstreamStatus, policy: &ShapingPolicy) -> Self {
    let players = upstream
      .players
      .map(|p| Players {
        online: p.online,
        max: p.max,
        list: if policy.include_player_list {
          p.sample.unwrap_or_default()
        } else {
          Vec::new()
        },
      })
      .unwrap_or_default();

    Self {
      motd: upstream.motd.unwrap_or_default(),
      players,
      version: upstream
        .version
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
      protocol: upstream.protocol.filter(|_| policy.include_debug).unwrap_or(0),
      ping: upstream.latency_ms.unwrap_or(0),
      favicon: upstream.favicon.filter(|_| policy.include_favicon),
      enforces_secure_chat: upstream
        .enforces_secure_chat
        .filter(|_| policy.include_debug)
        .unwrap_or(false),
    }
  }
}

/// A status snapshot as returned by `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
  pub online: bool,
  #[serde(flatten)]
  pub details: Option<ServerDetails>,
  /// `host:port` of the queried server
  pub address: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  pub last_updated: DateTime<Utc>,
}

impl StatusRecord {
  pub fn online(
    upstream: UpstreamStatus,
    address: impl Into<String>,
    policy: &ShapingPolicy,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      online: true,
      details: Some(ServerDetails::from_upstream(upstream, policy)),
      address: address.into(),
      error: None,
      last_updated: now,
    }
  }

  pub fn offline(address: impl Into<String>, error: impl Into<String>, now: DateTime<Utc>) -> Self {
    Self {
      online: false,
      details: None,
      address: address.into(),
      error: Some(error.into()),
      last_updated: now,
    }
  }
}
