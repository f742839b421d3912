//! Channel registry
//!
//! Ordered record of the channels the bot is configured to be in. Each entry
//! ties an IRC channel name to the group number the other side of the bridge
//! uses for the same conversation. Entries survive a disconnect (only their
//! `in_channel` flag is cleared) so they can be replayed after a reconnect;
//! leaving a channel removes its entry.
//!
//! The registry only holds state. Sending `JOIN`/`PART` is done by the
//! [`Session`](crate::Session) and [`ConnectionManager`](crate::ConnectionManager)
//! that own it.

use crate::utils::string::is_valid_channel_name;
use crate::{Error, Result};
use tracing::debug;

/// One channel the bot is configured to be in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMembership {
    /// Channel name, e.g. `#toxirc`
    pub name: String,
    /// Caller-assigned group number on the other side of the bridge
    pub group_num: u32,
    /// Whether a JOIN has been sent on the current connection and not yet undone
    pub in_channel: bool,
}

impl ChannelMembership {
    pub fn new(name: impl Into<String>, group_num: u32) -> Self {
        Self {
            name: name.into(),
            group_num,
            in_channel: false,
        }
    }
}

/// Ordered collection of channel memberships
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: Vec<ChannelMembership>,
    /// Upper bound on live entries, if any
    max_channels: Option<usize>,
}

impl ChannelRegistry {
    /// Create an unbounded registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding at most `max_channels` entries
    pub fn with_limit(max_channels: usize) -> Self {
        Self {
            channels: Vec::new(),
            max_channels: Some(max_channels),
        }
    }

    /// Register `name` under `group_num` and return its index.
    ///
    /// A name that is already registered keeps its position and takes the new
    /// group number. New names are appended, so replay order is join order.
    pub fn insert(&mut self, name: &str, group_num: u32) -> Result<usize> {
        if !is_valid_channel_name(name) {
            return Err(Error::Channel(format!("Invalid channel name: {}", name)));
        }

        if let Some(index) = self.index_of(name) {
            let entry = &mut self.channels[index];
            if entry.group_num != group_num {
                debug!(
                    "Channel {} moved from group {} to group {}",
                    name, entry.group_num, group_num
                );
                entry.group_num = group_num;
            }
            return Ok(index);
        }

        if let Some(max) = self.max_channels {
            if self.channels.len() >= max {
                return Err(Error::AllocationFailed(format!(
                    "channel limit of {} reached, cannot add {}",
                    max, name
                )));
            }
        }

        self.channels.try_reserve(1).map_err(|e| {
            Error::AllocationFailed(format!("could not grow registry for {}: {}", name, e))
        })?;

        debug!(
            "Registered channel {} for group {} (slot {})",
            name,
            group_num,
            self.channels.len()
        );
        self.channels.push(ChannelMembership::new(name, group_num));
        Ok(self.channels.len() - 1)
    }

    /// Remove and return the entry at `index`
    pub fn remove(&mut self, index: usize) -> Option<ChannelMembership> {
        if index < self.channels.len() {
            Some(self.channels.remove(index))
        } else {
            None
        }
    }

    pub fn get(&self, index: usize) -> Option<&ChannelMembership> {
        self.channels.get(index)
    }

    /// Set the `in_channel` flag of the entry at `index`
    pub fn set_in_channel(&mut self, index: usize, in_channel: bool) -> bool {
        match self.channels.get_mut(index) {
            Some(entry) => {
                entry.in_channel = in_channel;
                true
            }
            None => false,
        }
    }

    /// Clear `in_channel` on every entry without removing any
    pub fn mark_all_parted(&mut self) {
        for entry in &mut self.channels {
            entry.in_channel = false;
        }
    }

    /// Position of the entry named `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name == name)
    }

    /// Group number of the entry named `name`
    pub fn group_of(&self, name: &str) -> Option<u32> {
        self.channels
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.group_num)
    }

    /// Name of the first entry registered under `group_num`
    pub fn name_of(&self, group_num: u32) -> Option<&str> {
        self.channels
            .iter()
            .find(|c| c.group_num == group_num)
            .map(|c| c.name.as_str())
    }

    /// Whether `name` is registered and currently joined
    pub fn is_joined(&self, name: &str) -> bool {
        self.channels
            .iter()
            .any(|c| c.name == name && c.in_channel)
    }

    /// Index of the first currently joined entry
    pub fn first_joined(&self) -> Option<usize> {
        self.channels.iter().position(|c| c.in_channel)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelMembership> {
        self.channels.iter()
    }

    /// Channel names in registry order
    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.channels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = ChannelRegistry::new();
        let index = registry.insert("#toxirc", 0).unwrap();

        assert_eq!(index, 0);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.index_of("#toxirc"), Some(0));
        assert_eq!(registry.group_of("#toxirc"), Some(0));
        assert_eq!(registry.name_of(0), Some("#toxirc"));
        assert!(!registry.is_joined("#toxirc"));

        assert_eq!(registry.index_of("#missing"), None);
        assert_eq!(registry.group_of("#missing"), None);
        assert_eq!(registry.name_of(7), None);
    }

    #[test]
    fn test_out_of_order_groups_keep_insertion_order() {
        let mut registry = ChannelRegistry::new();
        registry.insert("#c", 9).unwrap();
        registry.insert("#a", 2).unwrap();
        registry.insert("#b", 5).unwrap();

        assert_eq!(registry.names(), vec!["#c", "#a", "#b"]);
        assert_eq!(registry.name_of(2), Some("#a"));
        assert_eq!(registry.name_of(9), Some("#c"));
        assert_eq!(registry.group_of("#b"), Some(5));
    }

    #[test]
    fn test_reinsert_updates_group_without_duplicating() {
        let mut registry = ChannelRegistry::new();
        registry.insert("#a", 0).unwrap();
        registry.insert("#b", 1).unwrap();

        assert_eq!(registry.insert("#a", 4).unwrap(), 0);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.group_of("#a"), Some(4));
        assert_eq!(registry.name_of(0), None);
    }

    #[test]
    fn test_duplicate_group_returns_first_match() {
        let mut registry = ChannelRegistry::new();
        registry.insert("#first", 3).unwrap();
        registry.insert("#second", 3).unwrap();

        assert_eq!(registry.name_of(3), Some("#first"));
    }

    #[test]
    fn test_remove_deletes_entry() {
        let mut registry = ChannelRegistry::new();
        registry.insert("#a", 0).unwrap();
        registry.insert("#b", 1).unwrap();

        let removed = registry.remove(0).unwrap();
        assert_eq!(removed.name, "#a");
        assert_eq!(registry.index_of("#a"), None);
        assert_eq!(registry.index_of("#b"), Some(0));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(5).is_none());
    }

    #[test]
    fn test_mark_all_parted_keeps_entries() {
        let mut registry = ChannelRegistry::new();
        registry.insert("#a", 0).unwrap();
        registry.insert("#b", 1).unwrap();
        registry.set_in_channel(0, true);
        registry.set_in_channel(1, true);
        assert!(registry.is_joined("#a"));
        assert_eq!(registry.first_joined(), Some(0));

        registry.mark_all_parted();

        assert!(!registry.is_joined("#a"));
        assert!(!registry.is_joined("#b"));
        assert_eq!(registry.first_joined(), None);
        assert_eq!(registry.group_of("#b"), Some(1));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_limit_reports_allocation_failure() {
        let mut registry = ChannelRegistry::with_limit(1);
        registry.insert("#a", 0).unwrap();

        assert!(matches!(
            registry.insert("#b", 1),
            Err(Error::AllocationFailed(_))
        ));
        // Re-registering an existing name does not need a new slot
        assert!(registry.insert("#a", 2).is_ok());
    }

    #[test]
    fn test_invalid_name_rejected() {
        let mut registry = ChannelRegistry::new();
        assert!(matches!(registry.insert("toxirc", 0), Err(Error::Channel(_))));
        assert!(registry.is_empty());
    }
}
