//! The immutable channel table built once at session start.

use std::collections::HashMap;

use crate::error::PvrError;
use crate::models::Channel;

/// Maps host-visible channel ids to channels and their routing data.
/// No mutation after construction.
pub struct ChannelRegistry {
    channels: Vec<Channel>,
    by_uid: HashMap<u32, usize>,
}

impl ChannelRegistry {
    /// Build the registry, rejecting duplicate host-visible ids: the host
    /// keys its channel state on them, so a collision would corrupt it.
    pub fn new(channels: Vec<Channel>) -> Result<Self, PvrError> {
        let mut by_uid = HashMap::with_capacity(channels.len());
        for (index, channel) in channels.iter().enumerate() {
            if by_uid.insert(channel.unique_id, index).is_some() {
                return Err(PvrError::InvalidParameters(format!(
                    "duplicate channel id {}",
                    channel.unique_id
                )));
            }
        }
        Ok(Self { channels, by_uid })
    }

    pub fn get(&self, unique_id: u32) -> Option<&Channel> {
        self.by_uid
            .get(&unique_id)
            .map(|&index| &self.channels[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    /// Channels filtered by the host's radio/TV flag.
    pub fn by_kind(&self, radio: bool) -> impl Iterator<Item = &Channel> {
        self.channels
            .iter()
            .filter(move |channel| channel.is_radio == radio)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BroadcasterId, RouteKey};

    fn channel(unique_id: u32, name: &str, radio: bool) -> Channel {
        Channel {
            unique_id,
            is_radio: radio,
            channel_number: unique_id,
            sub_channel_number: 0,
            name: name.to_string(),
            stream_url: String::new(),
            route: RouteKey::new(BroadcasterId::Abc, name),
        }
    }

    #[test]
    fn lookup_by_unique_id() {
        let registry = ChannelRegistry::new(vec![
            channel(1, "One", false),
            channel(2, "Two", false),
        ])
        .unwrap();

        assert_eq!(registry.get(2).unwrap().name, "Two");
        assert!(registry.get(99).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = ChannelRegistry::new(vec![
            channel(1, "One", false),
            channel(1, "Clone", false),
        ]);
        assert!(matches!(result, Err(PvrError::InvalidParameters(_))));
    }

    #[test]
    fn radio_flag_filters() {
        let registry = ChannelRegistry::new(vec![
            channel(1, "TV", false),
            channel(2, "Radio", true),
        ])
        .unwrap();

        let tv: Vec<_> = registry.by_kind(false).map(|c| c.name.as_str()).collect();
        assert_eq!(tv, ["TV"]);
        let radio: Vec<_> = registry.by_kind(true).map(|c| c.name.as_str()).collect();
        assert_eq!(radio, ["Radio"]);
    }
}
