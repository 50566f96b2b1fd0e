//! CCTV English adapter.
//!
//! The schedule is a JavaScript document describing one repeating week of
//! programming: each entry carries a weekday and a start time, and a slot
//! runs until the next slot begins. Guide windows are served by projecting
//! the weekly slots onto the viewer's calendar. The playback URL is not
//! static either; it is resolved on demand from the live-stream API.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{Broadcaster, FeedKind, SchedulePage};
use crate::models::{BroadcasterId, Channel, EpgEntry, EpgWindow, RouteKey};
use crate::services::cache::{FetchKey, FetchResource};
use crate::services::timezone::{RegionClock, TimeShift};

lazy_static! {
    static ref SCHEDULE_ENTRY: Regex =
        Regex::new(r#"new schedule_array\("(.*?)", "(.*?)", "(.*?)", "(.*?)"\)"#).unwrap();
}

const GRID_URL: &str =
    "http://p2.img.cctvpic.com/photoAlbum/templet/common/DEPA1394789726596678/new_jiemudan.js";
const LIVE_API_URL: &str = "http://vdn.live.cntv.cn/api2/live.do";

/// China Standard Time: UTC+8, no daylight saving.
const CHINA: RegionClock = RegionClock::fixed(8);

const SLOT_TIME_FORMAT: &str = "%H%M";

/// The grid carries no genre data; the whole channel is news programming.
const NEWS_GENRE_TYPE: i32 = 0x20;

/// One repeating weekly slot, in broadcaster-local wall clock.
#[derive(Debug, Clone)]
pub struct GridSlot {
    pub weekday: Weekday,
    pub time: NaiveTime,
    pub title: String,
}

/// The parsed weekly grid.
#[derive(Debug, Clone)]
pub struct WeeklyGrid {
    pub slots: Vec<GridSlot>,
}

impl WeeklyGrid {
    /// Parse the upstream JS document.
    pub fn parse(source: &str) -> Result<Self> {
        let mut slots = Vec::new();
        for captures in SCHEDULE_ENTRY.captures_iter(source) {
            let weekday_number: u32 = captures[1]
                .parse()
                .with_context(|| format!("grid weekday {:?}", &captures[1]))?;
            let weekday = weekday_from_iso(weekday_number)?;
            let time = NaiveTime::parse_from_str(&captures[2], SLOT_TIME_FORMAT)
                .with_context(|| format!("grid start time {:?}", &captures[2]))?;
            slots.push(GridSlot {
                weekday,
                time,
                title: captures[3].to_string(),
            });
        }
        if slots.is_empty() {
            bail!("no schedule entries in grid document");
        }
        Ok(Self { slots })
    }
}

fn weekday_from_iso(number: u32) -> Result<Weekday> {
    match number {
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        7 => Ok(Weekday::Sun),
        _ => bail!("grid weekday {} out of range", number),
    }
}

/// Days forward from `from` to reach `to`, within one week.
fn days_until(from: Weekday, to: Weekday) -> i64 {
    ((to.num_days_from_monday() + 7 - from.num_days_from_monday()) % 7) as i64
}

/// Response of the live-stream API.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveResponse {
    pub hls_url: HlsUrls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HlsUrls {
    pub hls1: String,
}

/// Build the playback URL the host expects: the HLS URL with its AUTH token
/// repeated as a cookie, using the player's `url|headers` convention.
fn playback_url(hls: &str) -> Result<String> {
    let parsed = Url::parse(hls).with_context(|| format!("hls url {:?}", hls))?;
    let auth = parsed
        .query_pairs()
        .find(|(name, _)| *name == "AUTH")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| anyhow!("hls url missing AUTH parameter"))?;

    let suffix = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("Cookie", &format!("AUTH={}", auth))
        .finish();
    Ok(format!("{}|{}", hls, suffix))
}

pub struct Cctv;

impl Cctv {
    /// Place a weekly slot on the viewer's calendar, anchored to the
    /// captured "now" in the broadcaster's region.
    fn slot_to_viewer(slot_weekday: Weekday, slot_time: NaiveTime, shift: &TimeShift) -> NaiveDateTime {
        let region_now = shift.region_now();
        let mut anchored = region_now.date().and_time(slot_time);
        anchored += Duration::days(days_until(anchored.weekday(), slot_weekday));
        shift.to_viewer(anchored)
    }

    /// First occurrence of the weekly slot at or after `after`.
    fn first_occurrence_after(slot: NaiveDateTime, after: NaiveDateTime) -> NaiveDateTime {
        let mut occurrence = after.date().and_time(slot.time());
        occurrence += Duration::days(days_until(occurrence.weekday(), slot.weekday()));
        if occurrence < after {
            occurrence += Duration::days(7);
        }
        occurrence
    }

    /// Last occurrence of the weekly slot at or before `before`.
    fn last_occurrence_before(slot: NaiveDateTime, before: NaiveDateTime) -> NaiveDateTime {
        let mut occurrence = before.date().and_time(slot.time());
        occurrence += Duration::days(days_until(occurrence.weekday(), slot.weekday()));
        if occurrence > before {
            occurrence -= Duration::days(7);
        }
        occurrence
    }
}

#[async_trait]
impl Broadcaster for Cctv {
    fn id(&self) -> BroadcasterId {
        BroadcasterId::Cctv
    }

    fn channels(&self) -> Vec<Channel> {
        vec![Channel {
            unique_id: 21,
            is_radio: false,
            channel_number: 90,
            sub_channel_number: 0,
            name: "CCTV English".to_string(),
            stream_url: String::new(),
            route: RouteKey::new(BroadcasterId::Cctv, "pa://cctv_p2p_hdcctv9"),
        }]
    }

    fn feed_kind(&self) -> FeedKind {
        FeedKind::Grid
    }

    fn region(&self) -> RegionClock {
        CHINA
    }

    async fn fetch_page(&self, http: &Client, key: &FetchKey) -> Result<SchedulePage> {
        let FetchResource::Feed(_) = &key.resource else {
            bail!("CCTV grid is keyed by feed, got {:?}", key.resource);
        };
        debug!("fetching CCTV weekly grid: {}", GRID_URL);

        let response = http
            .get(GRID_URL)
            .send()
            .await
            .with_context(|| format!("GET {}", GRID_URL))?
            .error_for_status()
            .with_context(|| format!("GET {}", GRID_URL))?;
        let text = response.text().await.context("reading CCTV grid body")?;

        Ok(SchedulePage::Grid(WeeklyGrid::parse(&text)?))
    }

    fn page_entries(
        &self,
        page: &SchedulePage,
        _key: &FetchKey,
        channel: &Channel,
        window: &EpgWindow,
        shift: &TimeShift,
    ) -> Result<Vec<EpgEntry>> {
        let SchedulePage::Grid(grid) = page else {
            bail!("CCTV adapter got a non-grid page");
        };

        let mut entries = Vec::new();
        let slot_count = grid.slots.len();
        for (index, slot) in grid.slots.iter().enumerate() {
            // A slot ends where the next one starts; the last wraps to the
            // first.
            let next = &grid.slots[(index + 1) % slot_count];
            let start_slot = Self::slot_to_viewer(slot.weekday, slot.time, shift);
            let end_slot = Self::slot_to_viewer(next.weekday, next.time, shift);

            // Project onto the query window: pick the end boundary first,
            // then the start occurrence that belongs to it.
            let end = Self::first_occurrence_after(end_slot, window.start);
            let start = Self::last_occurrence_before(start_slot, end);

            let mut entry = EpgEntry::new(
                index as u32 + 1,
                channel.unique_id,
                slot.title.clone(),
                start,
                end,
            );
            entry.genre_type = NEWS_GENRE_TYPE;
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn stream_url(&self, http: &Client, channel: &Channel) -> Result<Option<String>> {
        let mut url = Url::parse(LIVE_API_URL).expect("live api url");
        url.query_pairs_mut()
            .append_pair("channel", &channel.route.feed)
            .append_pair("client", "flash");
        debug!("resolving CCTV live stream: {}", url);

        let response = http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {}", url))?
            .error_for_status()
            .with_context(|| format!("GET {}", url))?;
        let live: LiveResponse = response
            .json()
            .await
            .context("parsing live-stream response")?;

        Ok(Some(playback_url(&live.hls_url.hls1)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // Monday 00:00, Monday 08:30 and Thursday 21:15, every week.
    const GRID_JS: &str = r#"
        var x = new Array();
        x.push(new schedule_array("1", "0000", "Midnight News", ""));
        x.push(new schedule_array("1", "0830", "Biz Asia", ""));
        x.push(new schedule_array("4", "2115", "Crossover", ""));
    "#;

    fn cctv_channel() -> Channel {
        Cctv.channels().into_iter().next().unwrap()
    }

    fn grid_key() -> FetchKey {
        FetchKey::new(
            BroadcasterId::Cctv,
            FetchResource::Feed("pa://cctv_p2p_hdcctv9".to_string()),
        )
    }

    /// Identity conversion anchored on a known Sunday.
    fn flat_shift() -> TimeShift {
        // 2024-03-10 is a Sunday.
        let now = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        RegionClock::fixed(0).shift_at(now, Duration::zero())
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn grid_parses_weekday_time_and_title() {
        let grid = WeeklyGrid::parse(GRID_JS).unwrap();
        assert_eq!(grid.slots.len(), 3);
        assert_eq!(grid.slots[0].weekday, Weekday::Mon);
        assert_eq!(
            grid.slots[1].time,
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
        assert_eq!(grid.slots[2].title, "Crossover");
        assert_eq!(grid.slots[2].weekday, Weekday::Thu);
    }

    #[test]
    fn empty_grid_is_an_error() {
        assert!(WeeklyGrid::parse("nothing useful here").is_err());
        assert!(WeeklyGrid::parse(r#"new schedule_array("9", "0000", "X", "")"#).is_err());
    }

    #[test]
    fn slots_project_into_the_query_window() {
        let page = SchedulePage::Grid(WeeklyGrid::parse(GRID_JS).unwrap());
        // Monday 2024-03-11 00:00 .. Tuesday 2024-03-12 00:00.
        let window = EpgWindow::new(at(2024, 3, 11, 0, 0), at(2024, 3, 12, 0, 0));

        let entries = Cctv
            .page_entries(&page, &grid_key(), &cctv_channel(), &window, &flat_shift())
            .unwrap();

        // Slot 1: Monday 00:00 until Monday 08:30.
        assert_eq!(entries[0].title, "Midnight News");
        assert_eq!(entries[0].start, at(2024, 3, 11, 0, 0));
        assert_eq!(entries[0].end, at(2024, 3, 11, 8, 30));

        // Slot 2: Monday 08:30 until Thursday 21:15.
        assert_eq!(entries[1].start, at(2024, 3, 11, 8, 30));
        assert_eq!(entries[1].end, at(2024, 3, 14, 21, 15));

        // Slot 3 wraps: its current run started the previous Thursday and
        // ends Monday 00:00, overlapping the window start.
        assert_eq!(entries[2].start, at(2024, 3, 7, 21, 15));
        assert_eq!(entries[2].end, at(2024, 3, 11, 0, 0));
    }

    #[test]
    fn entry_ids_are_grid_positions() {
        let page = SchedulePage::Grid(WeeklyGrid::parse(GRID_JS).unwrap());
        let window = EpgWindow::new(at(2024, 3, 11, 0, 0), at(2024, 3, 12, 0, 0));

        let entries = Cctv
            .page_entries(&page, &grid_key(), &cctv_channel(), &window, &flat_shift())
            .unwrap();

        let ids: Vec<u32> = entries.iter().map(|e| e.broadcast_id).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert!(entries.iter().all(|e| e.genre_type == NEWS_GENRE_TYPE));
    }

    #[test]
    fn region_offset_shifts_slots() {
        let page = SchedulePage::Grid(WeeklyGrid::parse(GRID_JS).unwrap());
        // Broadcaster at +8, viewer at +0: Monday 08:30 in the region is
        // Monday 00:30 for the viewer.
        let now = at(2024, 3, 10, 12, 0);
        let shift = RegionClock::fixed(8).shift_at(now, Duration::zero());
        let window = EpgWindow::new(at(2024, 3, 11, 0, 0), at(2024, 3, 12, 0, 0));

        let entries = Cctv
            .page_entries(&page, &grid_key(), &cctv_channel(), &window, &shift)
            .unwrap();

        assert_eq!(entries[1].start, at(2024, 3, 11, 0, 30));
    }

    #[test]
    fn weekly_occurrence_stepping() {
        // Slot: Monday 08:30 on some arbitrary week.
        let slot = at(2024, 3, 4, 8, 30);
        assert_eq!(
            Cctv::first_occurrence_after(slot, at(2024, 3, 10, 12, 0)),
            at(2024, 3, 11, 8, 30)
        );
        // An occurrence exactly at the boundary stays.
        assert_eq!(
            Cctv::first_occurrence_after(slot, at(2024, 3, 11, 8, 30)),
            at(2024, 3, 11, 8, 30)
        );
        assert_eq!(
            Cctv::last_occurrence_before(slot, at(2024, 3, 10, 12, 0)),
            at(2024, 3, 4, 8, 30)
        );
    }

    #[test]
    fn playback_url_carries_the_auth_cookie() {
        let url = playback_url("http://example.com/live.m3u8?AUTH=abc%2F123&x=1").unwrap();
        assert_eq!(
            url,
            "http://example.com/live.m3u8?AUTH=abc%2F123&x=1|Cookie=AUTH%3Dabc%2F123"
        );
    }

    #[test]
    fn playback_url_requires_auth() {
        assert!(playback_url("http://example.com/live.m3u8?x=1").is_err());
    }

    #[test]
    fn live_response_parses() {
        let live: LiveResponse = serde_json::from_str(
            r#"{"hls_url": {"hls1": "http://h.example/a.m3u8?AUTH=t", "hls2": "http://h.example/b.m3u8"}}"#,
        )
        .unwrap();
        assert_eq!(live.hls_url.hls1, "http://h.example/a.m3u8?AUTH=t");
    }
}
