//! One matcher per link syntax.
//!
//! Every matcher walks the whole text on its own and reports whatever it finds,
//! even when the span overlaps another matcher's candidate. Malformed or
//! unterminated constructs are skipped and the walk resumes after the leading
//! token. Overlaps are settled later by the resolver.
//!
//! Matchers only record character ranges. Target and display strings are built
//! for the matches the resolver keeps, so nested brackets cost no more than the
//! text is long.

use std::ops::Range;

use regex::Regex;
use snafu::{ResultExt, ensure};

use crate::config::LinkConfig;
use crate::error::{CompilePatternSnafu, InvalidSchemeSnafu, LinkResult};
use crate::link::{CandidateLink, SyntaxKind};
use crate::scanner::{Scanner, unescape};
use crate::text::RawText;

// scheme://domain[:port][/path][?query][#fragment], case-insensitive.
const URL_PATTERN: &str = concat!(
    r"(?i)(?P<scheme>[a-z][a-z0-9+-]*)://",
    r"(?:(?:[a-z0-9]\.|[a-z0-9][a-z0-9-]*[a-z0-9]\.)*[a-z0-9-]*[a-z0-9](?::[0-9]+)?)",
    r"(?:(?:/+(?:[a-z0-9$_.+!*',;:()@&~=-]|%[0-9a-f]{2})*)*",
    r"(?:\?(?:[a-z0-9$_+!*',;:()@&=/~-]|%[0-9a-f]{2})*)?)?",
    r"(?:#(?:[a-z0-9$_+!*',;:()@&=/~-]|%[0-9a-f]{2})*)?",
);

// 00:12:345 (1,2) - comment
const EDITOR_TIMESTAMP_PATTERN: &str = r"[0-9]{2}:[0-9]{2}:[0-9]{2,3} [^-]*";

/// Where a match's display text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Display {
    /// Same as the target.
    Target,
    Span(Range<usize>),
    /// Trimmed after unescaping.
    Trimmed(Range<usize>),
    /// `Wiki: <topic>`
    Wiki,
}

/// Span-only result of one matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkMatch {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    pub kind: SyntaxKind,
    target: Range<usize>,
    display: Display,
}

impl LinkMatch {
    fn new(
        start: usize,
        end: usize,
        kind: SyntaxKind,
        target: Range<usize>,
        display: Display,
    ) -> Self {
        Self {
            start,
            end,
            kind,
            target,
            display,
        }
    }

    /// Builds the target and display strings from `text`.
    pub fn into_candidate(self, text: &RawText) -> CandidateLink {
        let chars = text.chars();
        let target = match self.kind {
            SyntaxKind::OldStyle | SyntaxKind::NewStyle | SyntaxKind::Markdown => {
                unescape(&chars[self.target])
            }
            SyntaxKind::Wiki => text.slice(self.target.start, self.target.end).trim().into(),
            _ => text.slice(self.target.start, self.target.end).into(),
        };
        let display_text = match self.display {
            Display::Target => target.clone(),
            Display::Span(range) => unescape(&chars[range]),
            Display::Trimmed(range) => unescape(&chars[range]).trim().to_string(),
            Display::Wiki => format!("Wiki: {target}"),
        };

        CandidateLink::new(self.start, self.end, self.kind, target, display_text)
    }
}

pub(crate) struct Matchers {
    url: Regex,
    editor_timestamp: Regex,
    external_schemes: Vec<String>,
    internal_schemes: Vec<String>,
}

impl Matchers {
    pub fn new(config: &LinkConfig) -> LinkResult<Self> {
        for scheme in &config.external_schemes {
            check_scheme("external_schemes", scheme)?;
        }
        check_scheme("protocol_scheme", &config.protocol_scheme)?;
        check_scheme("multiplayer_scheme", &config.multiplayer_scheme)?;

        let url = Regex::new(URL_PATTERN).context(CompilePatternSnafu {
            stage: "compile-url-pattern",
            pattern: "url",
        })?;
        let editor_timestamp =
            Regex::new(EDITOR_TIMESTAMP_PATTERN).context(CompilePatternSnafu {
                stage: "compile-editor-timestamp-pattern",
                pattern: "editor timestamp",
            })?;

        Ok(Self {
            url,
            editor_timestamp,
            external_schemes: config
                .external_schemes
                .iter()
                .map(|scheme| scheme.to_ascii_lowercase())
                .collect(),
            internal_schemes: config
                .internal_schemes()
                .iter()
                .map(|scheme| scheme.to_ascii_lowercase())
                .collect(),
        })
    }

    /// Runs every matcher over `text`, in no particular priority.
    pub fn collect(&self, text: &RawText) -> Vec<LinkMatch> {
        let scanner = Scanner::new(text);
        let mut matches = Vec::new();

        old_style(&scanner, &mut matches);
        new_style(&scanner, &mut matches);
        markdown(&scanner, &mut matches);
        wiki(&scanner, &mut matches);
        self.urls(text, &mut matches);
        self.editor_timestamps(text, &mut matches);
        channel_mentions(text, &mut matches);

        clip_editor_timestamps(text, &mut matches);
        matches
    }

    /// Bare URLs and bare application-protocol links share one URL grammar and
    /// differ only in which schemes they accept.
    fn urls(&self, text: &RawText, matches: &mut Vec<LinkMatch>) {
        for captures in self.url.captures_iter(text.as_str()) {
            let (Some(found), Some(scheme)) = (captures.get(0), captures.name("scheme")) else {
                continue;
            };

            let scheme = scheme.as_str().to_ascii_lowercase();
            let kind = if self.internal_schemes.contains(&scheme) {
                SyntaxKind::InternalProtocol
            } else if self.external_schemes.contains(&scheme) {
                SyntaxKind::BareUrl
            } else {
                continue;
            };

            let start = text.char_index(found.start());
            let end = text.char_index(found.end());
            matches.push(LinkMatch::new(start, end, kind, start..end, Display::Target));
        }
    }

    fn editor_timestamps(&self, text: &RawText, matches: &mut Vec<LinkMatch>) {
        for found in self.editor_timestamp.find_iter(text.as_str()) {
            let trimmed = found.as_str().trim_end();
            let start = text.char_index(found.start());
            let end = text.char_index(found.start() + trimmed.len());
            matches.push(LinkMatch::new(
                start,
                end,
                SyntaxKind::EditorTimestamp,
                start..end,
                Display::Target,
            ));
        }
    }
}

/// `(display text)[target]`
fn old_style(scanner: &Scanner<'_>, matches: &mut Vec<LinkMatch>) {
    let chars = scanner.text().chars();

    for start in openers(chars, '(') {
        let Some(display_end) = scanner.closing(start) else {
            continue;
        };
        let target_open = display_end + 1;
        if chars.get(target_open) != Some(&'[') {
            continue;
        }
        let Some(target_end) = scanner.closing(target_open) else {
            continue;
        };

        let target_start = target_open + 1;
        if !is_link_target(scanner, target_start, target_end) {
            continue;
        }

        matches.push(LinkMatch::new(
            start,
            target_end + 1,
            SyntaxKind::OldStyle,
            target_start..target_end,
            display_or_target(scanner, start + 1, display_end),
        ));
    }
}

/// `[target display text]`
fn new_style(scanner: &Scanner<'_>, matches: &mut Vec<LinkMatch>) {
    let chars = scanner.text().chars();

    for start in openers(chars, '[') {
        let Some(end) = scanner.closing(start) else {
            continue;
        };
        let target_start = start + 1;
        let space = scanner.next_whitespace(target_start);
        if space >= end
            || !is_link_target(scanner, target_start, space)
            || scanner.is_blank(space + 1, end)
        {
            continue;
        }

        matches.push(LinkMatch::new(
            start,
            end + 1,
            SyntaxKind::NewStyle,
            target_start..space,
            Display::Trimmed(space + 1..end),
        ));
    }
}

/// `[display text](target "optional title")`
fn markdown(scanner: &Scanner<'_>, matches: &mut Vec<LinkMatch>) {
    let chars = scanner.text().chars();

    for start in openers(chars, '[') {
        let Some(display_end) = scanner.closing(start) else {
            continue;
        };
        let target_open = display_end + 1;
        if chars.get(target_open) != Some(&'(') {
            continue;
        }
        let Some(target_end) = scanner.closing(target_open) else {
            continue;
        };

        let target_start = target_open + 1;
        let token_end = scanner.next_whitespace(target_start).min(target_end);
        if !is_link_target(scanner, target_start, token_end)
            || !has_optional_title(scanner, token_end, target_end)
        {
            continue;
        }

        matches.push(LinkMatch::new(
            start,
            target_end + 1,
            SyntaxKind::Markdown,
            target_start..token_end,
            display_or_target(scanner, start + 1, display_end),
        ));
    }
}

/// `[[topic]]`
fn wiki(scanner: &Scanner<'_>, matches: &mut Vec<LinkMatch>) {
    let chars = scanner.text().chars();

    for start in openers(chars, '[') {
        if chars.get(start + 1) != Some(&'[') {
            continue;
        }
        let (Some(outer_end), Some(inner_end)) =
            (scanner.closing(start), scanner.closing(start + 1))
        else {
            continue;
        };
        let topic_start = start + 2;
        if inner_end + 1 != outer_end
            || scanner.has_square_bracket(topic_start, inner_end)
            || scanner.is_blank(topic_start, inner_end)
        {
            continue;
        }

        matches.push(LinkMatch::new(
            start,
            outer_end + 1,
            SyntaxKind::Wiki,
            topic_start..inner_end,
            Display::Wiki,
        ));
    }
}

/// `#name`, reported whether or not the channel exists.
fn channel_mentions(text: &RawText, matches: &mut Vec<LinkMatch>) {
    let chars = text.chars();
    let mut index = 0;

    while index < chars.len() {
        let preceded_by_word = index > 0 && is_channel_char(chars[index - 1]);
        let starts_name = chars.get(index + 1).is_some_and(|ch| ch.is_alphabetic());
        if chars[index] != '#' || preceded_by_word || !starts_name {
            index += 1;
            continue;
        }

        let mut end = index + 2;
        while end < chars.len() && is_channel_char(chars[end]) {
            end += 1;
        }

        matches.push(LinkMatch::new(
            index,
            end,
            SyntaxKind::ChannelMention,
            index..end,
            Display::Target,
        ));
        index = end;
    }
}

/// A timestamp's free-form tail stops where a bracketed link or URL begins.
fn clip_editor_timestamps(text: &RawText, matches: &mut [LinkMatch]) {
    let mut link_starts = matches
        .iter()
        .filter(|found| {
            found.kind.is_bracketed()
                || matches!(found.kind, SyntaxKind::BareUrl | SyntaxKind::InternalProtocol)
        })
        .map(|found| found.start)
        .collect::<Vec<_>>();
    link_starts.sort_unstable();

    let chars = text.chars();
    for found in matches
        .iter_mut()
        .filter(|found| found.kind == SyntaxKind::EditorTimestamp)
    {
        let next = link_starts.partition_point(|&start| start <= found.start);
        let Some(&link_start) = link_starts.get(next) else {
            continue;
        };
        if link_start >= found.end {
            continue;
        }

        let mut end = link_start;
        while end > found.start && chars[end - 1].is_whitespace() {
            end -= 1;
        }
        found.end = end;
        found.target = found.start..end;
    }
}

fn openers(chars: &[char], open: char) -> impl Iterator<Item = usize> + '_ {
    chars
        .iter()
        .enumerate()
        .filter_map(move |(index, ch)| (*ch == open).then_some(index))
}

fn is_channel_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '-'
}

/// Bracketed forms only accept `scheme://rest` targets without whitespace.
///
/// Only the scheme prefix is walked. It always follows an opening delimiter and
/// stops at the next one, so the walks over all openers never overlap.
fn is_link_target(scanner: &Scanner<'_>, start: usize, end: usize) -> bool {
    let chars = scanner.text().chars();
    if start >= end || !chars.get(start).is_some_and(char::is_ascii_alphabetic) {
        return false;
    }

    let mut cursor = start + 1;
    while cursor < end && is_scheme_char(chars[cursor]) {
        cursor += 1;
    }
    let rest = cursor + 3;
    rest < end && chars[cursor..rest] == [':', '/', '/'] && !scanner.has_whitespace(start, end)
}

fn is_scheme_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '+' || ch == '-'
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|ch| ch.is_ascii_alphabetic()) && chars.all(is_scheme_char)
}

fn check_scheme(field: &'static str, scheme: &str) -> LinkResult<()> {
    ensure!(
        is_valid_scheme(scheme),
        InvalidSchemeSnafu {
            stage: "validate-link-config",
            field,
            scheme: scheme.to_string(),
        }
    );
    Ok(())
}

/// Whatever follows a markdown target is either nothing or a `"quoted title"`.
fn has_optional_title(scanner: &Scanner<'_>, from: usize, end: usize) -> bool {
    let first = scanner.next_non_whitespace(from);
    if first >= end {
        return true;
    }

    let chars = scanner.text().chars();
    let mut last = end - 1;
    while chars[last].is_whitespace() {
        last -= 1;
    }
    last > first && chars[first] == '"' && chars[last] == '"'
}

fn display_or_target(scanner: &Scanner<'_>, start: usize, end: usize) -> Display {
    if scanner.is_blank(start, end) {
        Display::Target
    } else {
        Display::Span(start..end)
    }
}
