use std::collections::{BTreeSet, HashSet};

/// Read-only view of the channels a mention may resolve to.
///
/// Callers pass a snapshot per parse so results stay reproducible even when the
/// live channel list changes in the meantime.
pub trait ChannelDirectory {
    /// `name` is the mention as written, including the leading `#`.
    fn exists(&self, name: &str) -> bool;
}

impl<T: ChannelDirectory + ?Sized> ChannelDirectory for &T {
    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }
}

impl ChannelDirectory for HashSet<String> {
    fn exists(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl ChannelDirectory for BTreeSet<String> {
    fn exists(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl ChannelDirectory for Vec<String> {
    fn exists(&self, name: &str) -> bool {
        self.iter().any(|channel| channel == name)
    }
}

impl ChannelDirectory for [&str] {
    fn exists(&self, name: &str) -> bool {
        self.iter().any(|channel| *channel == name)
    }
}

/// Directory that knows no channels; every mention stays plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoChannels;

impl ChannelDirectory for NoChannels {
    fn exists(&self, _name: &str) -> bool {
        false
    }
}
