//! Upstream status query.
//!
//! The wire protocol is handled by `craftping`; this module only opens the
//! connection, bounds it with a timeout and converts the response into an
//! [`UpstreamStatus`].

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};
use tracing::debug;

use crate::error::{QueryError, Result};
use crate::models::{UpstreamPlayers, UpstreamStatus};

/// Source of server status snapshots.
#[async_trait]
pub trait StatusQuery: Send + Sync {
    /// Query `host:port`, giving up after `timeout`.
    async fn query(&self, host: &str, port: u16, timeout: Duration) -> Result<UpstreamStatus>;
}

/// Queries a Minecraft Java Edition server with a server list ping.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinecraftQuery;

#[async_trait]
impl StatusQuery for MinecraftQuery {
    async fn query(&self, host: &str, port: u16, limit: Duration) -> Result<UpstreamStatus> {
        let exchange = async {
            let mut stream = TcpStream::connect((host, port)).await?;
            let started = Instant::now();
            let response = craftping::tokio::ping(&mut stream, host, port)
                .await
                .map_err(|e| QueryError::Protocol(e.to_string()))?;
            Ok::<_, QueryError>((response, started.elapsed()))
        };

        let (response, latency) = timeout(limit, exchange)
            .await
            .map_err(|_| QueryError::Timeout(limit))??;

        debug!(host, port, latency_ms = latency.as_millis() as u64, "status ping answered");

        Ok(UpstreamStatus {
            motd: response.description.as_ref().map(flatten_chat),
            version: Some(response.version),
            protocol: Some(response.protocol),
            players: Some(UpstreamPlayers {
                online: clamp_count(response.online_players),
                max: clamp_count(response.max_players),
                sample: response
                    .sample
                    .map(|players| players.into_iter().map(|p| p.name).collect()),
            }),
            latency_ms: Some(latency.as_millis() as u64),
            favicon: response.favicon.map(|icon| favicon_data_url(&icon)),
            enforces_secure_chat: response.enforces_secure_chat,
        })
    }
}

/// Concatenate the text of a description, dropping formatting.
///
/// Servers send either a bare string or a chat component whose `extra`
/// children may themselves be strings, components or arrays.
fn flatten_chat(chat: &Value) -> String {
    match chat {
        Value::String(text) => strip_legacy_codes(text),
        Value::Array(parts) => parts.iter().map(flatten_chat).collect(),
        Value::Object(component) => {
            let mut text = component
                .get("text")
                .map(flatten_chat)
                .unwrap_or_default();
            if let Some(Value::Array(extra)) = component.get("extra") {
                for part in extra {
                    text.push_str(&flatten_chat(part));
                }
            }
            text
        }
        _ => String::new(),
    }
}

/// Player counts above `u32::MAX` are reported as `u32::MAX`.
fn clamp_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Remove `§x` formatting codes that older servers embed in plain text.
fn strip_legacy_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

fn favicon_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
