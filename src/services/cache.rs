//! Per-session schedule page cache with singleflight fetch semantics.

use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::debug;

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::BroadcasterId;

/// What one upstream page covers; the second half of the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchResource {
    /// One calendar day of a broadcaster-wide daily feed.
    Date(NaiveDate),
    /// One channel's listing over an explicit window.
    Window {
        feed: String,
        start: NaiveDateTime,
        minutes: i64,
    },
    /// A broadcaster-wide feed with no time dimension, e.g. a weekly grid.
    Feed(String),
}

/// Cache key identifying one upstream schedule page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub broadcaster: BroadcasterId,
    pub resource: FetchResource,
}

impl FetchKey {
    pub fn new(broadcaster: BroadcasterId, resource: FetchResource) -> Self {
        Self {
            broadcaster,
            resource,
        }
    }
}

/// In-memory page cache shared by every aggregation call in one session.
///
/// Each key owns a once-cell slot: concurrent callers asking for the same
/// page share a single in-flight fetch, and a failed fetch leaves the slot
/// empty so the next caller retries. A populated slot is never mutated, so
/// readers always see a consistent page.
pub struct ScheduleCache<P> {
    slots: Mutex<HashMap<FetchKey, Arc<OnceCell<Arc<P>>>>>,
}

impl<P> ScheduleCache<P> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Number of populated or in-flight keys.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the page for `key`, fetching it at most once.
    pub async fn get_or_fetch<F, Fut>(&self, key: &FetchKey, fetch: F) -> Result<Arc<P>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<P>>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap();
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let page = slot
            .get_or_try_init(|| async {
                debug!("fetching schedule page {:?}", key);
                fetch().await.map(Arc::new)
            })
            .await?;

        Ok(Arc::clone(page))
    }
}

impl<P> Default for ScheduleCache<P> {
    fn default() -> Self {
        Self::new()
    }
}
