/// Which broadcaster adapter owns a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcasterId {
    Abc,
    Seven,
    Cctv,
}

impl std::fmt::Display for BroadcasterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BroadcasterId::Abc => write!(f, "abc"),
            BroadcasterId::Seven => write!(f, "seven"),
            BroadcasterId::Cctv => write!(f, "cctv"),
        }
    }
}

/// Broadcaster-specific routing data carried by a channel.
///
/// Opaque to the host; only the owning adapter interprets `feed` (an EPG
/// channel code, an upstream service id, a feed slug...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteKey {
    pub broadcaster: BroadcasterId,
    pub feed: String,
}

impl RouteKey {
    pub fn new(broadcaster: BroadcasterId, feed: &str) -> Self {
        Self {
            broadcaster,
            feed: feed.to_string(),
        }
    }
}

/// A live channel as surfaced to the host.
///
/// Built once at session start from the adapters' static tables and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Host-visible id, stable for the session, unique across the registry.
    pub unique_id: u32,
    pub is_radio: bool,
    /// Display ordering only; not required to be unique.
    pub channel_number: u32,
    pub sub_channel_number: u32,
    pub name: String,
    /// Direct playback URL; empty means the URL is resolved on demand.
    pub stream_url: String,
    pub route: RouteKey,
}

/// Capability flags reported to the host when the addon loads.
#[derive(Debug, Clone, Copy)]
pub struct AddonCapabilities {
    pub supports_epg: bool,
    pub supports_tv: bool,
    pub supports_radio: bool,
    pub supports_recordings: bool,
    pub supports_recordings_undelete: bool,
    pub supports_timers: bool,
    pub supports_channel_groups: bool,
}
