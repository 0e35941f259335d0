//! League membership lookup.

use std::collections::HashSet;
use std::future::Future;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::client::fpl::Standings;
use crate::client::{ClientError, FplClient};

/// Resolves a league into the ordered ids of its managers.
#[async_trait]
pub trait StandingsLookup: Send + Sync {
    async fn manager_ids(&self, league_id: i64) -> Result<Vec<i64>, ClientError>;
}

/// Walks the paginated FPL classic-league standings.
pub struct FplStandingsLookup {
    client: FplClient,
    max_pages: u32,
}

impl FplStandingsLookup {
    pub fn new(client: FplClient, max_pages: u32) -> Self {
        Self {
            client,
            max_pages: max_pages.max(1),
        }
    }
}

/// Walk standings pages from page 1 until `has_next` is false or
/// `max_pages` pages were read.
///
/// Ids keep their first-seen order; an entry seen again on a later page is
/// dropped.
pub async fn collect_manager_ids<F, Fut>(
    league_id: i64,
    max_pages: u32,
    mut fetch_page: F,
) -> Result<Vec<i64>, ClientError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Standings, ClientError>>,
{
    let mut seen = HashSet::new();
    let mut manager_ids = Vec::new();

    for page in 1..=max_pages.max(1) {
        let standings = fetch_page(page).await?;
        for entry in standings.results {
            // Standings can shift between page fetches; keep first sighting.
            if seen.insert(entry.entry) {
                manager_ids.push(entry.entry);
            }
        }

        if !standings.has_next {
            debug!(league_id, pages = page, managers = manager_ids.len(), "Resolved league managers");
            return Ok(manager_ids);
        }
    }

    warn!(
        league_id,
        max_pages,
        managers = manager_ids.len(),
        "League standings truncated at page limit"
    );
    Ok(manager_ids)
}

#[async_trait]
impl StandingsLookup for FplStandingsLookup {
    async fn manager_ids(&self, league_id: i64) -> Result<Vec<i64>, ClientError> {
        collect_manager_ids(league_id, self.max_pages, |page| async move {
            Ok::<_, ClientError>(self.client.league_standings(league_id, page).await?.standings)
        })
        .await
    }
}
