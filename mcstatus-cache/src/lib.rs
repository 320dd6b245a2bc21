mod error;
mod models;
mod query;

pub use error::{QueryError, Result};
pub use models::{
  Players, ServerDetails, ShapingPolicy, StatusRecord, UNKNOWN_VERSION, UpstreamPlayers,
  UpstreamStatus,
};
pub use query::{MinecraftQuery, StatusQuery};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{Instant, timeout};
use tracing::{debug, error};

/// Static settings for a [`StatusCache`], fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct CacheSettings {
  pub host: String,
  pub port: u16,
  /// Upper bound on a single upstream query
  pub query_timeout: Duration,
  /// How long a fetched record is served before the next refresh
  pub ttl: Duration,
  pub policy: ShapingPolicy,
}

/// Outcome of the last fetch attempt.
struct CachedStatus {
  record: Arc<StatusRecord>,
  fetched_at: Instant,
}

/// Single-slot cache in front of the upstream status query.
///
/// The slot starts empty and is only ever replaced by a refresh. The lock is
/// released before the upstream call, so concurrent misses each query the
/// upstream and the last one to finish wins the slot.
pub struct StatusCache {
  query: Arc<dyn StatusQuery>,
  settings: CacheSettings,
  address: String,
  slot: RwLock<Option<CachedStatus>>,
}

impl StatusCache {
  pub fn new(query: Arc<dyn StatusQuery>, settings: CacheSettings) -> Self {
    let address = format!("{}:{}", settings.host, settings.port);
    Self {
      query,
      settings,
      address,
      slot: RwLock::new(None),
    }
  }

  /// `host:port` of the upstream server.
  pub fn address(&self) -> &str {
    &self.address
  }

  pub fn settings(&self) -> &CacheSettings {
    &self.settings
  }

  /// Current status, refreshed from upstream when the cached one is stale.
  ///
  /// Never fails: upstream errors are folded into an offline record, which is
  /// cached like any other result.
  pub async fn get_status(&self) -> Arc<StatusRecord> {
    if let Some(record) = self.fresh().await {
      return record;
    }
    self.refresh().await
  }

  /// Cached record regardless of age, without touching the upstream.
  pub async fn peek(&self) -> Option<Arc<StatusRecord>> {
    self
      .slot
      .read()
      .await
      .as_ref()
      .map(|cached| Arc::clone(&cached.record))
  }

  async fn fresh(&self) -> Option<Arc<StatusRecord>> {
    let slot = self.slot.read().await;
    slot
      .as_ref()
      .filter(|cached| cached.fetched_at.elapsed() < self.settings.ttl)
      .map(|cached| Arc::clone(&cached.record))
  }

  async fn refresh(&self) -> Arc<StatusRecord> {
    let CacheSettings {
      host,
      port,
      query_timeout,
      policy,
      ..
    } = &self.settings;

    let outcome = match timeout(*query_timeout, self.query.query(host, *port, *query_timeout)).await {
      Ok(result) => result,
      Err(_) => Err(QueryError::Timeout(*query_timeout)),
    };

    let now = chrono::Utc::now();
    let record = match outcome {
      Ok(upstream) => {
        debug!(address = %self.address, "status refreshed");
        StatusRecord::online(upstream, self.address.as_str(), policy, now)
      }
      Err(err) => {
        error!(address = %self.address, error = %err, "status query failed");
        StatusRecord::offline(self.address.as_str(), err.to_string(), now)
      }
    };

    let record = Arc::new(record);
    *self.slot.write().await = Some(CachedStatus {
      record: Arc::clone(&record),
      fetched_at: Instant::now(),
    });
    record
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use std::collections::VecDeque;
  use std::sync::Mutex;
  use std::sync::atomic::{AtomicUsize, Ordering};

  /// Upstream stand-in that replays scripted outcomes in order.
  struct ScriptedQuery {
    calls: AtomicUsize,
    outcomes: Mutex<VecDeque<Outcome>>,
  }

  enum Outcome {
    Up(UpstreamStatus),
    Refused,
    Hang,
  }

  impl ScriptedQuery {
    fn new(outcomes: Vec<Outcome>) -> Arc<Self> {
      Arc::new(Self {
        calls: AtomicUsize::new(0),
        outcomes: Mutex::new(outcomes.into()),
      })
    }

    fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  #[async_trait]
  impl StatusQuery for ScriptedQuery {
    async fn query(&self, _host: &str, _port: u16, _timeout: Duration) -> Result<UpstreamStatus> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      // Give concurrent callers a chance to observe the empty slot
      tokio::task::yield_now().await;
      let next = self.outcomes.lock().unwrap().pop_front();
      match next {
        Some(Outcome::Up(status)) => Ok(status),
        Some(Outcome::Refused) | None => Err(QueryError::Connection(std::io::Error::new(
          std::io::ErrorKind::ConnectionRefused,
          "connection refused",
        ))),
        Some(Outcome::Hang) => {
          std::future::pending::<()>().await;
          unreachable!()
        }
      }
    }
  }

  fn settings(ttl_ms: u64, timeout_ms: u64) -> CacheSettings {
    CacheSettings {
      host: "play.example.net".to_string(),
      port: 25565,
      query_timeout: Duration::from_millis(timeout_ms),
      ttl: Duration::from_millis(ttl_ms),
      policy: ShapingPolicy::default(),
    }
  }

  fn five_of_twenty() -> UpstreamStatus {
    UpstreamStatus {
      players: Some(UpstreamPlayers {
        online: 5,
        max: 20,
        sample: None,
      }),
      ..Default::default()
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_ttl_window_scenario() {
    let query = ScriptedQuery::new(vec![Outcome::Up(five_of_twenty()), Outcome::Up(five_of_twenty())]);
    let cache = StatusCache::new(query.clone(), settings(30_000, 5_000));
    assert!(cache.peek().await.is_none());

    let first = cache.get_status().await;
    assert!(first.online);
    let players = &first.details.as_ref().unwrap().players;
    assert_eq!((players.online, players.max), (5, 20));
    assert!(players.list.is_empty());
    assert_eq!(query.calls(), 1);

    tokio::time::advance(Duration::from_millis(10_000)).await;
    let second = cache.get_status().await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(query.calls(), 1);

    tokio::time::advance(Duration::from_millis(21_000)).await;
    let third = cache.get_status().await;
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(query.calls(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failure_becomes_offline_record() {
    let query = ScriptedQuery::new(vec![Outcome::Refused]);
    let cache = StatusCache::new(query.clone(), settings(30_000, 5_000));

    let record = cache.get_status().await;
    assert!(!record.online);
    assert_eq!(record.address, "play.example.net:25565");
    assert!(record.error.as_deref().unwrap().contains("connection refused"));
    assert!(record.details.is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn test_offline_record_is_cached_until_ttl() {
    let query = ScriptedQuery::new(vec![Outcome::Refused, Outcome::Up(five_of_twenty())]);
    let cache = StatusCache::new(query.clone(), settings(30_000, 5_000));

    let offline = cache.get_status().await;
    let again = cache.get_status().await;
    assert!(Arc::ptr_eq(&offline, &again));
    assert_eq!(query.calls(), 1);

    tokio::time::advance(Duration::from_millis(30_000)).await;
    let recovered = cache.get_status().await;
    assert!(recovered.online);
    assert_eq!(query.calls(), 2);
    assert!(cache.peek().await.unwrap().online);
  }

  #[tokio::test(start_paused = true)]
  async fn test_hanging_upstream_times_out() {
    let query = ScriptedQuery::new(vec![Outcome::Hang]);
    let cache = StatusCache::new(query.clone(), settings(30_000, 3_000));

    let record = cache.get_status().await;
    assert!(!record.online);
    assert_eq!(record.address, "play.example.net:25565");
    assert_eq!(record.error.as_deref(), Some("status query timed out after 3000ms"));
    assert_eq!(query.calls(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_no_retry_within_one_call() {
    let query = ScriptedQuery::new(vec![Outcome::Refused, Outcome::Up(five_of_twenty())]);
    let cache = StatusCache::new(query.clone(), settings(0, 5_000));

    assert!(!cache.get_status().await.online);
    assert_eq!(query.calls(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_zero_ttl_refreshes_every_call() {
    let query = ScriptedQuery::new(vec![Outcome::Up(five_of_twenty()), Outcome::Up(five_of_twenty())]);
    let cache = StatusCache::new(query.clone(), settings(0, 5_000));

    cache.get_status().await;
    cache.get_status().await;
    assert_eq!(query.calls(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_repeated_hits_serialize_identically() {
    let query = ScriptedQuery::new(vec![Outcome::Up(five_of_twenty())]);
    let cache = StatusCache::new(query.clone(), settings(30_000, 5_000));

    let a = serde_json::to_vec(&*cache.get_status().await).unwrap();
    let b = serde_json::to_vec(&*cache.get_status().await).unwrap();
    assert_eq!(a, b);
  }

  #[tokio::test(start_paused = true)]
  async fn test_concurrent_misses_each_query_upstream() {
    let query = ScriptedQuery::new(vec![Outcome::Up(five_of_twenty()), Outcome::Up(five_of_twenty())]);
    let cache = StatusCache::new(query.clone(), settings(30_000, 5_000));

    let (a, b) = tokio::join!(cache.get_status(), cache.get_status());
    assert!(a.online && b.online);
    assert_eq!(query.calls(), 2);
  }
}
