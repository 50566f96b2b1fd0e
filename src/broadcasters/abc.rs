//! ABC (Australian Broadcasting Corporation) adapter.
//!
//! ABC publishes one JSON document per calendar day covering every ABC
//! channel. Listing times are Sydney wall-clock, and dates in the page URL
//! are Sydney dates.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{Broadcaster, FeedKind, SchedulePage};
use crate::models::{BroadcasterId, Channel, EpgEntry, EpgWindow, RouteKey};
use crate::services::cache::{FetchKey, FetchResource};
use crate::services::genres::{GenreTable, OtherLabelStyle};
use crate::services::timezone::{
    parse_feed_datetime, DstRule, RegionClock, SeasonBoundary, TimeShift,
};

/// Sydney: UTC+10 standard, one hour of daylight saving from the first
/// Sunday of October 02:00 to the first Sunday of April 02:00.
const SYDNEY: RegionClock = RegionClock::with_dst(
    10,
    1,
    DstRule {
        begins: SeasonBoundary { month: 10, hour: 2 },
        ends: SeasonBoundary { month: 4, hour: 2 },
    },
);

const FEED_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Genre vocabulary used by the ABC guide.
const GENRES: GenreTable = GenreTable::new(
    &[
        ("Game Show", (0x30, 0x01)),
        ("Travel", (0xA0, 0x01)),
        ("Romance", (0x10, 0x06)),
        ("Music", (0x60, 0x00)),
        ("Factual", (0x90, 0x00)),
        ("Comedy", (0x10, 0x04)),
        ("Sci-fi", (0x10, 0x03)),
        ("Fantasy", (0x10, 0x03)),
        ("Talk Show", (0x30, 0x03)),
        ("Special Event", (0x40, 0x01)),
        ("Advantage", (0x10, 0x02)),
        ("News", (0x20, 0x00)),
        ("Current Affairs", (0x20, 0x00)),
        ("Drama", (0x10, 0x00)),
        ("Documentary", (0x20, 0x03)),
        ("Musical", (0x60, 0x04)),
        ("Arts and Culture", (0x70, 0x00)),
        ("Soap Opera", (0x10, 0x05)),
        ("Sport", (0x40, 0x00)),
        ("Children", (0x50, 0x00)),
    ],
    OtherLabelStyle::Verbatim,
);

/// One day of the broadcaster-wide guide.
#[derive(Debug, Clone, Deserialize)]
pub struct DailySchedule {
    pub schedule: Vec<ChannelDay>,
}

/// All listings for one channel on one day.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelDay {
    pub channel: String,
    #[serde(default)]
    pub listing: Vec<Listing>,
}

/// A raw guide entry as the feed reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub onair_title: String,
    #[serde(default = "unknown_number")]
    pub series_num: i32,
    #[serde(default = "unknown_number")]
    pub episode_num: i32,
    #[serde(default)]
    pub genres: Vec<String>,
}

fn unknown_number() -> i32 {
    -1
}

pub struct Abc;

impl Abc {
    /// Month and day are not zero-padded upstream.
    fn page_url(date: NaiveDate) -> String {
        format!(
            "http://epg.abctv.net.au/processed/Sydney_{}-{}-{}.json",
            date.year(),
            date.month(),
            date.day()
        )
    }
}

#[async_trait]
impl Broadcaster for Abc {
    fn id(&self) -> BroadcasterId {
        BroadcasterId::Abc
    }

    fn channels(&self) -> Vec<Channel> {
        vec![
            Channel {
                unique_id: 1,
                is_radio: false,
                channel_number: 21,
                sub_channel_number: 0,
                name: "ABC 1".to_string(),
                stream_url: String::new(),
                route: RouteKey::new(BroadcasterId::Abc, "ABC1"),
            },
            Channel {
                unique_id: 2,
                is_radio: false,
                channel_number: 22,
                sub_channel_number: 1,
                name: "ABC 2".to_string(),
                stream_url: String::new(),
                route: RouteKey::new(BroadcasterId::Abc, "ABC2"),
            },
            Channel {
                unique_id: 3,
                is_radio: false,
                channel_number: 22,
                sub_channel_number: 2,
                name: "ABC Kids".to_string(),
                stream_url: String::new(),
                route: RouteKey::new(BroadcasterId::Abc, "ABC4KIDS"),
            },
            Channel {
                unique_id: 4,
                is_radio: false,
                channel_number: 23,
                sub_channel_number: 0,
                name: "ABC ME".to_string(),
                stream_url: String::new(),
                route: RouteKey::new(BroadcasterId::Abc, "ABC3"),
            },
            Channel {
                unique_id: 5,
                is_radio: false,
                channel_number: 24,
                sub_channel_number: 0,
                name: "ABC News 24".to_string(),
                stream_url: "http://iphonestreaming.abc.net.au/news24/news24.m3u8".to_string(),
                route: RouteKey::new(BroadcasterId::Abc, "ABCN"),
            },
        ]
    }

    fn feed_kind(&self) -> FeedKind {
        FeedKind::Daily
    }

    fn region(&self) -> RegionClock {
        SYDNEY
    }

    async fn fetch_page(&self, http: &Client, key: &FetchKey) -> Result<SchedulePage> {
        let FetchResource::Date(date) = &key.resource else {
            bail!("ABC pages are keyed by date, got {:?}", key.resource);
        };
        let url = Self::page_url(*date);
        debug!("fetching ABC daily guide: {}", url);

        let response = http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?
            .error_for_status()
            .with_context(|| format!("GET {}", url))?;
        let text = response.text().await.context("reading ABC guide body")?;

        let parsed: DailySchedule = serde_json::from_str(&text).map_err(|err| {
            debug!("unparseable ABC guide body: {}", &text[..text.len().min(500)]);
            anyhow!("parsing ABC guide for {}: {}", date, err)
        })?;
        Ok(SchedulePage::Daily(parsed))
    }

    fn page_entries(
        &self,
        page: &SchedulePage,
        key: &FetchKey,
        channel: &Channel,
        _window: &EpgWindow,
        shift: &TimeShift,
    ) -> Result<Vec<EpgEntry>> {
        let SchedulePage::Daily(day) = page else {
            bail!("ABC adapter got a non-daily page");
        };
        let FetchResource::Date(date) = &key.resource else {
            bail!("ABC pages are keyed by date, got {:?}", key.resource);
        };

        let mut entries = Vec::new();
        for channel_day in &day.schedule {
            if channel_day.channel != channel.route.feed {
                continue;
            }
            for (index, listing) in channel_day.listing.iter().enumerate() {
                let start = shift.to_viewer(
                    parse_feed_datetime(&listing.start_time, FEED_TIME_FORMAT)
                        .with_context(|| format!("start_time {:?}", listing.start_time))?,
                );
                let end = shift.to_viewer(
                    parse_feed_datetime(&listing.end_time, FEED_TIME_FORMAT)
                        .with_context(|| format!("end_time {:?}", listing.end_time))?,
                );

                // The page is keyed by date and listings keep their in-page
                // position, so this id is stable across calls.
                let broadcast_id = date.num_days_from_ce() as u32 * 1000 + index as u32;

                let mut entry = EpgEntry::new(
                    broadcast_id,
                    channel.unique_id,
                    listing.title.clone(),
                    start,
                    end,
                );
                entry.plot = listing.description.clone();
                entry.original_title = listing.onair_title.clone();
                entry.series_number = listing.series_num;
                entry.episode_number = listing.episode_num;
                entry.set_genre(GENRES.classify(listing.genres.iter().map(String::as_str)));
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}
