use crate::config::LinkConfig;
use crate::link::LinkAction;

/// Action and argument derived from a link target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub action: LinkAction,
    pub argument: String,
}

impl LinkTarget {
    pub fn new(action: LinkAction, argument: impl Into<String>) -> Self {
        Self {
            action,
            argument: argument.into(),
        }
    }

    pub fn external(url: &str) -> Self {
        Self::new(LinkAction::External, url)
    }
}

/// Maps a URL onto the in-app action it represents.
///
/// Targets that match no known pattern are `External` with the full URL as
/// argument, so classification never fails.
pub fn classify_target(url: &str, config: &LinkConfig) -> LinkTarget {
    let segments = url
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();
    let Some(first) = segments.first() else {
        return LinkTarget::external(url);
    };

    let scheme = first.trim_end_matches(':').to_ascii_lowercase();
    let classified = match scheme.as_str() {
        "http" | "https" => classify_website(&segments, url, config),
        scheme if scheme == config.protocol_scheme => classify_protocol(&segments),
        scheme if scheme == config.multiplayer_scheme => segments
            .get(1)
            .map(|room| LinkTarget::new(LinkAction::JoinMultiplayerMatch, *room)),
        _ => None,
    };

    classified.unwrap_or_else(|| LinkTarget::external(url))
}

fn classify_website(segments: &[&str], url: &str, config: &LinkConfig) -> Option<LinkTarget> {
    // Every routed page needs at least `scheme/host/section/argument`.
    if segments.len() < 4 || !config.is_website_host(segments[1]) {
        return None;
    }

    let main_argument = segments[3];
    match segments[2] {
        "b" | "beatmaps" => numeric(strip_suffixes(main_argument))
            .map(|id| LinkTarget::new(LinkAction::OpenBeatmap, id)),
        "s" | "beatmapsets" | "d" => {
            if main_argument == "discussions" {
                return Some(LinkTarget::external(url));
            }
            // beatmapsets/1154509#mania/2571927 points at a single difficulty.
            if let Some(id) = segments.get(4).and_then(|segment| numeric(segment)) {
                return Some(LinkTarget::new(LinkAction::OpenBeatmap, id));
            }
            numeric(strip_suffixes(main_argument))
                .map(|id| LinkTarget::new(LinkAction::OpenBeatmapSet, id))
        }
        "u" | "users" => {
            let user = strip_suffixes(main_argument);
            (!user.is_empty()).then(|| LinkTarget::new(LinkAction::OpenUserProfile, user))
        }
        "wiki" => Some(LinkTarget::new(LinkAction::OpenWiki, segments[3..].join("/"))),
        _ => None,
    }
}

fn classify_protocol(segments: &[&str]) -> Option<LinkTarget> {
    if segments.len() < 3 {
        return None;
    }

    let argument = segments[2];
    let action = match segments[1] {
        "chan" => LinkAction::OpenChannel,
        "edit" => {
            return Some(LinkTarget::new(
                LinkAction::OpenEditorTimestamp,
                segments[2..].join("/"),
            ));
        }
        "b" => LinkAction::OpenBeatmap,
        "s" | "dl" => LinkAction::OpenBeatmapSet,
        "u" => LinkAction::OpenUserProfile,
        "spectate" => LinkAction::Spectate,
        _ => return None,
    };

    Some(LinkTarget::new(action, argument))
}

fn strip_suffixes(segment: &str) -> &str {
    segment
        .split(['?', '#'])
        .next()
        .unwrap_or(segment)
}

fn numeric(segment: &str) -> Option<&str> {
    (!segment.is_empty() && segment.bytes().all(|byte| byte.is_ascii_digit())).then_some(segment)
}
