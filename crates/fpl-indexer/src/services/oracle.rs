//! Current-gameweek oracle.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::client::fpl::Event;
use crate::client::{ClientError, FplClient};

/// Reports which gameweek is current.
///
/// Gameweeks up to and including the returned value have data; later ones
/// do not. `0` means the season has not started.
#[async_trait]
pub trait BootstrapOracle: Send + Sync {
    async fn current_gameweek(&self) -> Result<u32, ClientError>;
}

/// Pick the current gameweek out of the season calendar.
///
/// Prefers the event flagged `is_current`, then the latest finished one.
/// A calendar with no events at all is not a valid season.
pub fn current_gameweek_from_events(events: &[Event]) -> Result<u32, ClientError> {
    if events.is_empty() {
        return Err(ClientError::InvalidResponse(
            "bootstrap-static returned no events".to_string(),
        ));
    }
    Ok(events
        .iter()
        .find(|e| e.is_current)
        .or_else(|| events.iter().filter(|e| e.finished).max_by_key(|e| e.id))
        .map(|e| e.id)
        .unwrap_or(0))
}

/// Last answer of an oracle, reused until it is `ttl` old.
pub struct GameweekCache {
    ttl: Duration,
    cached: Mutex<Option<(Instant, u32)>>,
}

impl GameweekCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Return the cached gameweek, or call `refresh` and cache its answer.
    ///
    /// Failed refreshes are not cached.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<u32, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<u32, ClientError>>,
    {
        let mut cached = self.cached.lock().await;
        if let Some((fetched_at, gameweek)) = *cached {
            if fetched_at.elapsed() < self.ttl {
                return Ok(gameweek);
            }
        }

        let gameweek = refresh().await?;
        *cached = Some((Instant::now(), gameweek));
        Ok(gameweek)
    }
}

/// Oracle backed by FPL `bootstrap-static`, cached for a fixed TTL.
pub struct FplBootstrapOracle {
    client: FplClient,
    cache: GameweekCache,
}

impl FplBootstrapOracle {
    pub fn new(client: FplClient, ttl: Duration) -> Self {
        Self {
            client,
            cache: GameweekCache::new(ttl),
        }
    }
}

#[async_trait]
impl BootstrapOracle for FplBootstrapOracle {
    async fn current_gameweek(&self) -> Result<u32, ClientError> {
        self.cache
            .get_or_refresh(|| async {
                let bootstrap = self.client.bootstrap_static().await?;
                let gameweek = current_gameweek_from_events(&bootstrap.events)?;
                debug!(gameweek, "Refreshed current gameweek");
                Ok::<_, ClientError>(gameweek)
            })
            .await
    }
}
