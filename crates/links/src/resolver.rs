use std::cmp::Reverse;

use crate::action::{LinkTarget, classify_target};
use crate::config::LinkConfig;
use crate::directory::ChannelDirectory;
use crate::link::{CandidateLink, FinalLink, LinkAction, SyntaxKind};
use crate::matchers::LinkMatch;
use crate::text::RawText;

/// Settles overlapping candidates into the final, non-overlapping link list.
///
/// Candidates are ordered by start, then by syntax priority, then longest first.
/// A left-to-right sweep keeps a candidate only when it starts at or after the
/// end of the last kept link; anything else is discarded outright. Channel
/// mentions are additionally looked up in `directory` and dropped when the
/// channel is unknown, without moving the sweep forward.
pub fn resolve<D>(
    text: &RawText,
    candidates: Vec<CandidateLink>,
    directory: &D,
    config: &LinkConfig,
) -> Vec<FinalLink>
where
    D: ChannelDirectory + ?Sized,
{
    sweep(
        text,
        candidates,
        |candidate| (candidate.start, candidate.end, candidate.kind),
        |candidate| candidate,
        directory,
        config,
    )
}

/// Same sweep over span-only matches. Strings are only built for the matches
/// that survive the overlap check.
pub(crate) fn resolve_matches<D>(
    text: &RawText,
    matches: Vec<LinkMatch>,
    directory: &D,
    config: &LinkConfig,
) -> Vec<FinalLink>
where
    D: ChannelDirectory + ?Sized,
{
    sweep(
        text,
        matches,
        |found| (found.start, found.end, found.kind),
        |found| found.into_candidate(text),
        directory,
        config,
    )
}

fn sweep<T, D>(
    text: &RawText,
    mut candidates: Vec<T>,
    span: impl Fn(&T) -> (usize, usize, SyntaxKind),
    materialize: impl Fn(T) -> CandidateLink,
    directory: &D,
    config: &LinkConfig,
) -> Vec<FinalLink>
where
    D: ChannelDirectory + ?Sized,
{
    candidates.sort_by_key(|candidate| {
        let (start, end, kind) = span(candidate);
        (start, kind.priority(), Reverse(end))
    });

    let mut links = Vec::new();
    let mut last_end = 0;

    for candidate in candidates {
        let (start, end, kind) = span(&candidate);
        if start < last_end || end <= start {
            tracing::debug!(
                kind = ?kind,
                span = text.slice(start, end),
                "dropping overlapping candidate"
            );
            continue;
        }

        let candidate = materialize(candidate);
        let Some(target) = link_target(&candidate, directory, config) else {
            tracing::debug!(channel = %candidate.target, "dropping mention of unknown channel");
            continue;
        };

        last_end = candidate.end;
        links.push(FinalLink {
            start: candidate.start,
            end: candidate.end,
            action: target.action,
            argument: target.argument,
            display_text: candidate.display_text,
        });
    }

    links
}

fn link_target<D>(
    candidate: &CandidateLink,
    directory: &D,
    config: &LinkConfig,
) -> Option<LinkTarget>
where
    D: ChannelDirectory + ?Sized,
{
    let target = match candidate.kind {
        SyntaxKind::OldStyle
        | SyntaxKind::NewStyle
        | SyntaxKind::Markdown
        | SyntaxKind::BareUrl
        | SyntaxKind::InternalProtocol => classify_target(&candidate.target, config),
        SyntaxKind::Wiki => LinkTarget::new(LinkAction::OpenWiki, candidate.target.as_str()),
        SyntaxKind::EditorTimestamp => {
            LinkTarget::new(LinkAction::OpenEditorTimestamp, candidate.target.as_str())
        }
        SyntaxKind::ChannelMention => {
            if !directory.exists(&candidate.target) {
                return None;
            }
            LinkTarget::new(LinkAction::OpenChannel, candidate.target.as_str())
        }
    };

    Some(target)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::directory::NoChannels;

    fn candidate(start: usize, end: usize, kind: SyntaxKind, target: &str) -> CandidateLink {
        CandidateLink::new(start, end, kind, target, target)
    }

    #[test]
    fn no_candidates_resolve_to_nothing() {
        let text = RawText::new("plain text");
        let links = resolve(&text, Vec::new(), &NoChannels, &LinkConfig::default());
        assert!(links.is_empty());
    }

    #[test]
    fn bracketed_form_wins_a_tie_at_the_same_start() {
        let text = RawText::new("[[Topic]](https://example.com)");
        let links = resolve(
            &text,
            vec![
                candidate(0, 30, SyntaxKind::Markdown, "https://example.com"),
                candidate(0, 9, SyntaxKind::Wiki, "Topic"),
            ],
            &NoChannels,
            &LinkConfig::default(),
        );

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].action, LinkAction::OpenWiki);
        assert_eq!((links[0].start, links[0].end), (0, 9));
    }

    #[test]
    fn enclosed_candidates_are_discarded_not_shifted() {
        let text = RawText::new("[osu forums](https://dev.ppy.sh/forum) https://dev.ppy.sh");
        let links = resolve(
            &text,
            vec![
                candidate(13, 37, SyntaxKind::BareUrl, "https://dev.ppy.sh/forum"),
                candidate(39, 57, SyntaxKind::BareUrl, "https://dev.ppy.sh"),
                candidate(0, 38, SyntaxKind::Markdown, "https://dev.ppy.sh/forum"),
            ],
            &NoChannels,
            &LinkConfig::default(),
        );

        let spans = links
            .iter()
            .map(|link| (link.start, link.end))
            .collect::<Vec<_>>();
        assert_eq!(spans, vec![(0, 38), (39, 57)]);
    }

    #[test]
    fn unknown_channel_does_not_block_later_candidates() {
        let text = RawText::new("#nope #yes");
        let directory = HashSet::from(["#yes".to_string()]);
        let links = resolve(
            &text,
            vec![
                candidate(0, 5, SyntaxKind::ChannelMention, "#nope"),
                candidate(6, 10, SyntaxKind::ChannelMention, "#yes"),
            ],
            &directory,
            &LinkConfig::default(),
        );

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].argument, "#yes");
        assert_eq!(links[0].action, LinkAction::OpenChannel);
    }

    #[test]
    fn unmapped_bracketed_target_defaults_to_external() {
        let text = RawText::new("(x)[gopher://hole]");
        let links = resolve(
            &text,
            vec![candidate(0, 18, SyntaxKind::OldStyle, "gopher://hole")],
            &NoChannels,
            &LinkConfig::default(),
        );

        assert_eq!(links[0].action, LinkAction::External);
        assert_eq!(links[0].argument, "gopher://hole");
    }
}
