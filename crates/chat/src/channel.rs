use std::collections::BTreeSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chatline_links::ChannelDirectory;

/// Immutable set of joinable channel names, stored as `#lowercase`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSet {
    names: BTreeSet<String>,
}

impl ChannelSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .filter_map(|name| normalize_channel_name(name.as_ref()))
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        normalize_channel_name(name).is_some_and(|name| self.names.contains(&name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl ChannelDirectory for ChannelSet {
    fn exists(&self, name: &str) -> bool {
        self.contains(name)
    }
}

/// Live channel registry.
///
/// Writers swap in a whole new [`ChannelSet`]; readers take a snapshot and parse
/// against it, so a parse never observes a half-applied change.
#[derive(Debug, Default)]
pub struct ChannelManager {
    channels: ArcSwap<ChannelSet>,
}

impl ChannelManager {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            channels: ArcSwap::from_pointee(ChannelSet::new(names)),
        }
    }

    /// Returns `false` when the name is invalid or already present.
    pub fn add(&self, name: &str) -> bool {
        let Some(name) = normalize_channel_name(name) else {
            tracing::warn!(name, "ignoring invalid channel name");
            return false;
        };

        let mut added = false;
        self.channels.rcu(|current| {
            let mut next = ChannelSet::clone(current);
            added = next.names.insert(name.clone());
            next
        });
        if added {
            tracing::debug!(channel = %name, "channel added");
        }
        added
    }

    pub fn remove(&self, name: &str) -> bool {
        let Some(name) = normalize_channel_name(name) else {
            return false;
        };

        let mut removed = false;
        self.channels.rcu(|current| {
            let mut next = ChannelSet::clone(current);
            removed = next.names.remove(&name);
            next
        });
        if removed {
            tracing::debug!(channel = %name, "channel removed");
        }
        removed
    }

    pub fn snapshot(&self) -> Arc<ChannelSet> {
        self.channels.load_full()
    }

    pub fn is_joinable(&self, name: &str) -> bool {
        self.channels.load().contains(name)
    }
}

/// `#Name`, `name` and ` #name ` all become `#name`. Empty names and names with
/// inner whitespace are rejected.
fn normalize_channel_name(name: &str) -> Option<String> {
    let bare = name.trim().trim_start_matches('#');
    if bare.is_empty() || bare.chars().any(char::is_whitespace) {
        return None;
    }
    Some(format!("#{}", bare.to_lowercase()))
}
