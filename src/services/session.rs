//! The per-host-session aggregation engine.
//!
//! One [`PvrSession`] is constructed when the host loads the addon and
//! dropped when it unloads. It owns the HTTP client, the channel registry,
//! the broadcaster adapters and the schedule page cache; nothing is global.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_stream::try_stream;
use chrono::{Duration, Local, NaiveDateTime, NaiveTime, TimeZone};
use futures::Stream;
use reqwest::Client;
use tracing::{debug, error, info};

use crate::broadcasters::{default_broadcasters, Broadcaster, FeedKind, SchedulePage};
use crate::config::PvrConfig;
use crate::error::PvrError;
use crate::models::{AddonCapabilities, BroadcasterId, Channel, EpgEntry, EpgWindow};
use crate::services::cache::{FetchKey, FetchResource, ScheduleCache};
use crate::services::registry::ChannelRegistry;

/// One backend session.
pub struct PvrSession {
    http: Client,
    registry: ChannelRegistry,
    broadcasters: HashMap<BroadcasterId, Arc<dyn Broadcaster>>,
    cache: ScheduleCache<SchedulePage>,
}

impl PvrSession {
    /// Build a session over the compiled-in broadcaster adapters.
    pub fn new(config: PvrConfig) -> Result<Self, PvrError> {
        Self::with_broadcasters(config, default_broadcasters())
    }

    /// Build a session over an explicit adapter set.
    pub fn with_broadcasters(
        config: PvrConfig,
        adapters: Vec<Arc<dyn Broadcaster>>,
    ) -> Result<Self, PvrError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(StdDuration::from_secs(config.fetch_timeout_secs))
            .connect_timeout(StdDuration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|err| PvrError::InvalidParameters(format!("http client: {}", err)))?;

        let mut channels = Vec::new();
        let mut broadcasters = HashMap::with_capacity(adapters.len());
        for adapter in adapters {
            channels.extend(adapter.channels());
            broadcasters.insert(adapter.id(), adapter);
        }
        let registry = ChannelRegistry::new(channels)?;

        info!(
            "session ready: {} channels from {} broadcasters",
            registry.len(),
            broadcasters.len()
        );
        Ok(Self {
            http,
            registry,
            broadcasters,
            cache: ScheduleCache::new(),
        })
    }

    // ======================================================================
    // Host surface
    // ======================================================================

    pub fn capabilities(&self) -> AddonCapabilities {
        AddonCapabilities {
            supports_epg: true,
            supports_tv: true,
            supports_radio: false,
            supports_recordings: false,
            supports_recordings_undelete: false,
            supports_timers: false,
            supports_channel_groups: false,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        "overair pvr backend"
    }

    pub fn backend_version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn connection_string(&self) -> &'static str {
        "connected"
    }

    pub fn backend_hostname(&self) -> &'static str {
        ""
    }

    /// (total, used) bytes. This backend records nothing.
    pub fn drive_space(&self) -> (u64, u64) {
        (0, 0)
    }

    /// Channels filtered by the host's radio/TV flag.
    pub fn channels(&self, radio: bool) -> impl Iterator<Item = &Channel> {
        self.registry.by_kind(radio)
    }

    pub fn channel_count(&self) -> usize {
        self.registry.len()
    }

    /// Guide entries for one channel over `[window_start, window_end)` epoch
    /// seconds.
    ///
    /// Entries stream out as upstream pages arrive, so the host can start
    /// rendering before the window is complete; dropping the stream cancels
    /// any in-flight request. A clean end of stream means success; a final
    /// error carries the status for the whole call, and entries already
    /// yielded stand.
    pub fn channel_epg(
        &self,
        channel_uid: u32,
        window_start: i64,
        window_end: i64,
    ) -> impl Stream<Item = Result<EpgEntry, PvrError>> + Send + '_ {
        try_stream! {
            let channel = self
                .registry
                .get(channel_uid)
                .ok_or(PvrError::NotImplemented)?;
            let adapter = self
                .broadcasters
                .get(&channel.route.broadcaster)
                .ok_or(PvrError::NotImplemented)?;
            let window = resolve_window(window_start, window_end)?;

            if !window.is_empty() {
                // The viewer offset and the broadcaster's DST state are
                // captured once per call, not per entry.
                let shift = adapter.region().shift_now();
                let keys = plan_fetch_keys(adapter.as_ref(), channel, &window);
                debug!(
                    "channel {} ({}) window {}..{}: {} fetch key(s)",
                    channel_uid,
                    channel.route.broadcaster,
                    window.start,
                    window.end,
                    keys.len()
                );

                for key in keys {
                    let page = match adapter.feed_kind() {
                        // Broadcaster-wide pages are shared across channels
                        // and calls for the rest of the session.
                        FeedKind::Daily | FeedKind::Grid => {
                            self.cache
                                .get_or_fetch(&key, || adapter.fetch_page(&self.http, &key))
                                .await
                        }
                        // Window pages are channel-specific; fetch fresh.
                        FeedKind::ChannelWindow => {
                            adapter.fetch_page(&self.http, &key).await.map(Arc::new)
                        }
                    };
                    let page = page.map_err(|err| {
                        error!("schedule fetch failed for {:?}: {:#}", key, err);
                        PvrError::from_fetch(err)
                    })?;

                    let entries = adapter
                        .page_entries(&page, &key, channel, &window, &shift)
                        .map_err(|err| {
                            error!("schedule page {:?} unusable: {:#}", key, err);
                            PvrError::from_fetch(err)
                        })?;

                    for entry in entries {
                        if window.overlaps(entry.start, entry.end) {
                            yield entry;
                        }
                    }
                }
            }
        }
    }

    /// Playback URL for a channel: the static URL when configured, else the
    /// owning adapter's on-demand resolution.
    pub async fn live_stream_url(&self, channel_uid: u32) -> Result<String, PvrError> {
        let channel = self
            .registry
            .get(channel_uid)
            .ok_or(PvrError::NotImplemented)?;
        if !channel.stream_url.is_empty() {
            return Ok(channel.stream_url.clone());
        }

        let adapter = self
            .broadcasters
            .get(&channel.route.broadcaster)
            .ok_or(PvrError::NotImplemented)?;
        match adapter.stream_url(&self.http, channel).await {
            Ok(Some(url)) => Ok(url),
            Ok(None) => Err(PvrError::NotImplemented),
            Err(err) => {
                error!(
                    "stream resolution failed for channel {}: {:#}",
                    channel_uid, err
                );
                Err(PvrError::from_fetch(err))
            }
        }
    }
}

/// Translate the host's epoch-seconds window into viewer-local wall clock.
fn resolve_window(start: i64, end: i64) -> Result<EpgWindow, PvrError> {
    Ok(EpgWindow::new(local_naive(start)?, local_naive(end)?))
}

fn local_naive(epoch: i64) -> Result<NaiveDateTime, PvrError> {
    Local
        .timestamp_opt(epoch, 0)
        .single()
        .map(|dt| dt.naive_local())
        .ok_or_else(|| PvrError::InvalidParameters(format!("timestamp {} out of range", epoch)))
}

/// The upstream pages needed to cover one window, in increasing date order.
fn plan_fetch_keys(
    adapter: &dyn Broadcaster,
    channel: &Channel,
    window: &EpgWindow,
) -> Vec<FetchKey> {
    match adapter.feed_kind() {
        FeedKind::Daily => {
            let mut keys = Vec::new();
            let mut date = window.start.date();
            // Walk midnights up to the window end, so a window ending
            // mid-day still pulls that day's page.
            while date.and_time(NaiveTime::MIN) < window.end {
                keys.push(FetchKey::new(adapter.id(), FetchResource::Date(date)));
                date += Duration::days(1);
            }
            keys
        }
        FeedKind::ChannelWindow => vec![FetchKey::new(
            adapter.id(),
            FetchResource::Window {
                feed: channel.route.feed.clone(),
                start: window.start,
                minutes: window.duration_minutes(),
            },
        )],
        FeedKind::Grid => vec![FetchKey::new(
            adapter.id(),
            FetchResource::Feed(channel.route.feed.clone()),
        )],
    }
}
