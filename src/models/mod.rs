mod channel;
mod epg;

pub use channel::{AddonCapabilities, BroadcasterId, Channel, RouteKey};
pub use epg::{EpgEntry, EpgWindow, Genre, GENRE_USE_STRING};
