//! Broadcaster adapters.
//!
//! Each broadcaster is a thin scraper over one undocumented web guide. All
//! of them implement the same capability surface: which channels they own,
//! how their feed is keyed and fetched, how a fetched page becomes guide
//! entries, and optionally how a playback URL is resolved on demand.
//!
//! The aggregation engine never knows feed formats; it dispatches through
//! [`Broadcaster`] using the tag carried in each channel's routing key.

pub mod abc;
pub mod cctv;
pub mod seven;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;

use crate::models::{BroadcasterId, Channel, EpgEntry, EpgWindow};
use crate::services::cache::FetchKey;
use crate::services::timezone::{RegionClock, TimeShift};

pub use abc::Abc;
pub use cctv::Cctv;
pub use seven::Seven;

/// How a broadcaster's schedule feed is keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// One broadcaster-wide page per calendar day. Shared across channels,
    /// so pages cache for the whole session.
    Daily,
    /// One page per (channel, window); refetched every call.
    ChannelWindow,
    /// One broadcaster-wide page covering any window; session-cacheable.
    Grid,
}

/// A parsed upstream schedule page, as stored in the cache.
#[derive(Debug, Clone)]
pub enum SchedulePage {
    Daily(abc::DailySchedule),
    Window(seven::WindowSchedule),
    Grid(cctv::WeeklyGrid),
}

/// Capability surface implemented once per broadcaster.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    fn id(&self) -> BroadcasterId;

    /// The channels this adapter contributes to the registry.
    fn channels(&self) -> Vec<Channel>;

    fn feed_kind(&self) -> FeedKind;

    /// The region whose wall clock the feed reports.
    fn region(&self) -> RegionClock;

    /// Fetch and parse one schedule page. No retries: a failure here is
    /// terminal for the whole aggregation call.
    async fn fetch_page(&self, http: &Client, key: &FetchKey) -> Result<SchedulePage>;

    /// Extract the guide entries for `channel` from a fetched page, already
    /// converted to viewer-local time and genre-classified. Entries come out
    /// in upstream order; the aggregator applies the window filter.
    fn page_entries(
        &self,
        page: &SchedulePage,
        key: &FetchKey,
        channel: &Channel,
        window: &EpgWindow,
        shift: &TimeShift,
    ) -> Result<Vec<EpgEntry>>;

    /// Resolve a playback URL for a channel that has no static stream URL.
    /// `None` means this adapter has no on-demand resolution.
    async fn stream_url(&self, _http: &Client, _channel: &Channel) -> Result<Option<String>> {
        Ok(None)
    }
}

/// The adapters compiled into this backend.
pub fn default_broadcasters() -> Vec<Arc<dyn Broadcaster>> {
    vec![Arc::new(Abc), Arc::new(Seven), Arc::new(Cctv)]
}
