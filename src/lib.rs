//! Free-to-air broadcaster backends for a PVR host.
//!
//! # Overview
//!
//! Free-to-air broadcasters rarely publish usable schedule APIs; what they
//! do have are the undocumented web feeds behind their own guide pages.
//! This crate scrapes those feeds and aggregates them into the channel/EPG
//! model a PVR frontend expects:
//!
//! - **Broadcaster adapters** (`broadcasters`): one thin scraper per
//!   network, each declaring its channels, feed shape, region clock and
//!   genre vocabulary.
//! - **Aggregation engine** (`services::session`): resolves a channel to
//!   its adapter, plans the upstream pages a query window needs, fetches
//!   them through a singleflight cache, converts broadcaster wall-clock
//!   times to viewer-local time, classifies genres, and streams the
//!   filtered entries back.
//! - **Host boundary** (`error`): all failures translate into the host's
//!   fixed status codes; no error text crosses the boundary.
//!
//! # Usage
//!
//! ```rust,ignore
//! use futures::{pin_mut, StreamExt};
//! use overair::{PvrConfig, PvrSession};
//!
//! let session = PvrSession::new(PvrConfig::from_env())?;
//! let stream = session.channel_epg(channel_uid, window_start, window_end);
//! pin_mut!(stream);
//! while let Some(item) = stream.next().await {
//!     match item {
//!         Ok(entry) => host.transfer_epg_entry(&entry),
//!         Err(err) => return err.status(),
//!     }
//! }
//! PvrStatus::NoError
//! ```

pub mod broadcasters;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::PvrConfig;
pub use error::{AddonStatus, PvrError, PvrStatus};
pub use models::{AddonCapabilities, Channel, EpgEntry, EpgWindow, Genre};
pub use services::session::PvrSession;
