use serde::{Deserialize, Serialize};

/// Syntax form a candidate was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxKind {
    /// `(display text)[target]`
    OldStyle,
    /// `[target display text]`
    NewStyle,
    /// `[display text](target)`
    Markdown,
    /// `[[topic]]`
    Wiki,
    BareUrl,
    ChannelMention,
    InternalProtocol,
    /// `mm:ss:fff (objects) ` as pasted from the editor.
    EditorTimestamp,
}

impl SyntaxKind {
    /// Tie-break rank for candidates starting at the same index; lower wins.
    ///
    /// Bracketed forms outrank bare ones. Among bracketed forms the order is
    /// wiki, markdown, new-style, old-style.
    pub const fn priority(self) -> u8 {
        match self {
            Self::Wiki => 0,
            Self::Markdown => 1,
            Self::NewStyle => 2,
            Self::OldStyle => 3,
            Self::InternalProtocol => 4,
            Self::BareUrl => 5,
            Self::EditorTimestamp => 6,
            Self::ChannelMention => 7,
        }
    }

    pub const fn is_bracketed(self) -> bool {
        matches!(
            self,
            Self::OldStyle | Self::NewStyle | Self::Markdown | Self::Wiki
        )
    }
}

/// Unresolved match from one matcher. May overlap candidates from other matchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    pub kind: SyntaxKind,
    /// URL, channel name, wiki topic, or timestamp depending on `kind`.
    pub target: String,
    pub display_text: String,
}

impl CandidateLink {
    pub fn new(
        start: usize,
        end: usize,
        kind: SyntaxKind,
        target: impl Into<String>,
        display_text: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end,
            kind,
            target: target.into(),
            display_text: display_text.into(),
        }
    }
}

/// What activating a link does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkAction {
    External,
    OpenWiki,
    OpenChannel,
    OpenBeatmap,
    OpenBeatmapSet,
    OpenEditorTimestamp,
    JoinMultiplayerMatch,
    OpenUserProfile,
    Spectate,
}

/// Resolved, actionable span of chat text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalLink {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    pub action: LinkAction,
    pub argument: String,
    pub display_text: String,
}

impl FinalLink {
    pub fn overlaps(&self, other: &FinalLink) -> bool {
        self.start < other.end && other.start < self.end
    }
}
