//! Seven Network adapter.
//!
//! Seven's guide API is queried per service with an explicit window. Feed
//! times are UTC, and entries carry a stable upstream content id.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{Broadcaster, FeedKind, SchedulePage};
use crate::models::{BroadcasterId, Channel, EpgEntry, EpgWindow, RouteKey};
use crate::services::cache::{FetchKey, FetchResource};
use crate::services::genres::{GenreTable, OtherLabelStyle};
use crate::services::timezone::{parse_feed_datetime, RegionClock, TimeShift};

const FEED_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Seven content ids live above this offset so they cannot collide with the
/// ids synthesized for the daily-feed broadcasters.
const BROADCAST_ID_OFFSET: u32 = 500_000;

/// Genre vocabulary used by the Seven guide. Labels arrive shouting;
/// anything the table does not know is title-cased for display.
const GENRES: GenreTable = GenreTable::new(
    &[
        ("GAME SHOW", (0x30, 0x01)),
        ("OTHER NEWS/CURRENT AFFAIRS", (0x20, 0x00)),
        ("NEWS", (0x20, 0x00)),
        ("CURRENT AFFAIRS", (0x20, 0x00)),
        ("OTHER DRAMA SERIES", (0x10, 0x00)),
        ("DRAMA MOVIE", (0x10, 0x00)),
        ("OTHER MOVIE", (0x10, 0x00)),
        ("DRAMA SERIAL", (0x10, 0x00)),
        ("COMEDY MOVIE", (0x10, 0x04)),
        ("SITUATION COMEDY", (0x10, 0x04)),
        ("SKETCH COMEDY", (0x10, 0x04)),
        ("THRILLER MOVIE", (0x10, 0x01)),
        ("SITUATIONAL COMEDY", (0x10, 0x03)),
        ("ANIMALS", (0x90, 0x01)),
        ("RELIGIOUS PROGRAMS", (0x70, 0x03)),
        ("HEALTH", (0xA0, 0x04)),
        ("CHILDREN'S ANIMATED", (0x50, 0x00)),
        ("OTHER CHILDREN'S PROGRAM", (0x50, 0x00)),
        ("PRE-SCHOOL PROGRAM", (0x50, 0x01)),
        ("COOKING", (0xA0, 0x05)),
        ("OTHER DOCUMENTARY SERIES", (0x20, 0x03)),
        ("DOCUMENTARY ONE-OFF", (0x20, 0x03)),
        ("OTHER INFORMATION", (0x90, 0x00)),
        ("TRAVEL", (0xA0, 0x01)),
        ("OTHER PROGRAM", (0x00, 0x00)),
        ("SPORTS OTHER", (0x40, 0x00)),
        ("MUSIC PERFORMANCE", (0x60, 0x00)),
    ],
    OtherLabelStyle::TitleCase,
);

/// One channel's listings over the requested window.
#[derive(Debug, Clone, Deserialize)]
pub struct WindowSchedule {
    pub schedule: Vec<Programme>,
}

/// A raw programme as the feed reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct Programme {
    pub content_id: u32,
    #[serde(default)]
    pub epg_title: String,
    #[serde(default)]
    pub program_title: String,
    #[serde(default)]
    pub epg_synopsis: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub cast: String,
    #[serde(default)]
    pub year_released: i32,
    #[serde(default)]
    pub episode_title: String,
    #[serde(default)]
    pub program_genre: String,
    pub start_time: String,
    /// Minutes.
    pub duration: i64,
}

pub struct Seven;

impl Seven {
    fn window_url(feed: &str, start: NaiveDateTime, minutes: i64) -> String {
        let mut url = Url::parse("https://7live.com.au/tvapi/v1/services/schedule/")
            .expect("base url")
            .join(&format!("{}/list/", feed))
            .expect("feed slug");
        url.query_pairs_mut()
            // The feed wants a Z suffix even though the value is the
            // viewer's wall clock; that is the request shape it accepts.
            .append_pair(
                "starttime",
                &format!("{}.000Z", start.format(FEED_TIME_FORMAT)),
            )
            .append_pair("minutes", &minutes.to_string());
        url.into()
    }
}

#[async_trait]
impl Broadcaster for Seven {
    fn id(&self) -> BroadcasterId {
        BroadcasterId::Seven
    }

    fn channels(&self) -> Vec<Channel> {
        let hls = |path: &str| {
            format!(
                "https://sevenwestmedia01-i.akamaihd.net/hls/live/{}/master_high.m3u8",
                path
            )
        };
        vec![
            Channel {
                unique_id: 11,
                is_radio: false,
                channel_number: 71,
                sub_channel_number: 0,
                name: "Seven Adelaide".to_string(),
                stream_url: hls("224816/ADE1"),
                route: RouteKey::new(BroadcasterId::Seven, "7"),
            },
            Channel {
                unique_id: 12,
                is_radio: false,
                channel_number: 72,
                sub_channel_number: 0,
                name: "7TWO Adelaide".to_string(),
                stream_url: hls("224829/ADE2"),
                route: RouteKey::new(BroadcasterId::Seven, "8"),
            },
            Channel {
                unique_id: 13,
                is_radio: false,
                channel_number: 73,
                sub_channel_number: 0,
                name: "7mate Adelaide".to_string(),
                stream_url: hls("224842/ADE3"),
                route: RouteKey::new(BroadcasterId::Seven, "9"),
            },
            Channel {
                unique_id: 14,
                is_radio: false,
                channel_number: 76,
                sub_channel_number: 0,
                name: "7flix Adelaide".to_string(),
                stream_url: hls("224859/ADE6"),
                route: RouteKey::new(BroadcasterId::Seven, "42"),
            },
        ]
    }

    fn feed_kind(&self) -> FeedKind {
        FeedKind::ChannelWindow
    }

    /// The feed reports UTC; only the viewer offset applies.
    fn region(&self) -> RegionClock {
        RegionClock::fixed(0)
    }

    async fn fetch_page(&self, http: &Client, key: &FetchKey) -> Result<SchedulePage> {
        let FetchResource::Window {
            feed,
            start,
            minutes,
        } = &key.resource
        else {
            bail!("Seven pages are keyed by channel window, got {:?}", key.resource);
        };
        let url = Self::window_url(feed, *start, *minutes);
        debug!("fetching Seven window guide: {}", url);

        let response = http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?
            .error_for_status()
            .with_context(|| format!("GET {}", url))?;
        let text = response.text().await.context("reading Seven guide body")?;

        let parsed: WindowSchedule = serde_json::from_str(&text).map_err(|err| {
            debug!(
                "unparseable Seven guide body: {}",
                &text[..text.len().min(500)]
            );
            anyhow!("parsing Seven guide for service {}: {}", feed, err)
        })?;
        Ok(SchedulePage::Window(parsed))
    }

    fn page_entries(
        &self,
        page: &SchedulePage,
        _key: &FetchKey,
        channel: &Channel,
        _window: &EpgWindow,
        shift: &TimeShift,
    ) -> Result<Vec<EpgEntry>> {
        let SchedulePage::Window(listing) = page else {
            bail!("Seven adapter got a non-window page");
        };

        let mut entries = Vec::new();
        for programme in &listing.schedule {
            // Truncate the fractional-seconds tail the feed appends.
            let raw_start = programme
                .start_time
                .split_once('.')
                .map_or(programme.start_time.as_str(), |(head, _)| head);
            let start = shift.to_viewer(
                parse_feed_datetime(raw_start, FEED_TIME_FORMAT)
                    .with_context(|| format!("start_time {:?}", programme.start_time))?,
            );
            let end = start + Duration::minutes(programme.duration);

            let mut entry = EpgEntry::new(
                BROADCAST_ID_OFFSET + programme.content_id,
                channel.unique_id,
                programme.epg_title.clone(),
                start,
                end,
            );
            entry.plot = programme.synopsis.clone();
            entry.plot_outline = programme.epg_synopsis.clone();
            entry.original_title = programme.program_title.clone();
            entry.cast = programme.cast.clone();
            entry.year = programme.year_released;
            entry.episode_name = programme.episode_title.clone();
            entry.set_genre(GENRES.classify(
                [programme.program_genre.as_str()]
                    .into_iter()
                    .filter(|label| !label.is_empty()),
            ));
            entries.push(entry);
        }
        Ok(entries)
    }
}
