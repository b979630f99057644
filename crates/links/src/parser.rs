use std::sync::LazyLock;

use crate::config::LinkConfig;
use crate::directory::ChannelDirectory;
use crate::error::LinkResult;
use crate::link::{CandidateLink, FinalLink};
use crate::matchers::Matchers;
use crate::resolver::resolve_matches;
use crate::text::RawText;

static DEFAULT_PARSER: LazyLock<LinkResult<LinkParser>> =
    LazyLock::new(|| LinkParser::new(LinkConfig::default()));

/// Compiled matchers plus the configuration used to classify targets.
///
/// Parsing is pure: the same text and directory snapshot always produce the
/// same links, and malformed syntax simply stays plain text.
pub struct LinkParser {
    config: LinkConfig,
    matchers: Matchers,
}

impl LinkParser {
    pub fn new(config: LinkConfig) -> LinkResult<Self> {
        let config = config.normalized();
        let matchers = Matchers::new(&config)?;
        Ok(Self { config, matchers })
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Every candidate from every matcher, before overlap resolution.
    pub fn candidates(&self, text: &RawText) -> Vec<CandidateLink> {
        self.matchers
            .collect(text)
            .into_iter()
            .map(|found| found.into_candidate(text))
            .collect()
    }

    pub fn parse<D>(&self, text: &str, directory: &D) -> Vec<FinalLink>
    where
        D: ChannelDirectory + ?Sized,
    {
        self.parse_raw(&RawText::new(text), directory)
    }

    pub fn parse_raw<D>(&self, text: &RawText, directory: &D) -> Vec<FinalLink>
    where
        D: ChannelDirectory + ?Sized,
    {
        if text.is_empty() {
            return Vec::new();
        }
        resolve_matches(text, self.matchers.collect(text), directory, &self.config)
    }
}

/// Parses with the default configuration.
pub fn parse<D>(text: &str, directory: &D) -> Vec<FinalLink>
where
    D: ChannelDirectory + ?Sized,
{
    match &*DEFAULT_PARSER {
        Ok(parser) => parser.parse(text, directory),
        Err(error) => {
            tracing::error!("default link parser is unavailable: {error}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::link::LinkAction;

    fn directory() -> HashSet<String> {
        HashSet::from(["#english".to_string(), "#japanese".to_string()])
    }

    fn actions(text: &str) -> Vec<LinkAction> {
        parse(text, &directory())
            .into_iter()
            .map(|link| link.action)
            .collect()
    }

    #[test]
    fn mixed_forms_keep_left_to_right_order() {
        assert_eq!(
            actions(
                "Let's (try)[https://dev.ppy.sh/home] [https://dev.ppy.sh/b/252238 multiple links] https://dev.ppy.sh/home"
            ),
            vec![
                LinkAction::External,
                LinkAction::OpenBeatmap,
                LinkAction::External
            ]
        );
    }

    #[test]
    fn markdown_swallows_enclosed_bare_url() {
        let links = parse(
            "[osu forums](https://dev.ppy.sh/forum) (new link format 2)",
            &directory(),
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].display_text, "osu forums");
        assert_eq!(links[0].argument, "https://dev.ppy.sh/forum");
    }

    #[test]
    fn channel_validity_depends_on_snapshot() {
        let text = "Join my #english or #nonexistent #hashtag channels.";
        let links = parse(text, &directory());
        assert_eq!(links.len(), 1);
        assert_eq!((links[0].start, links[0].end), (8, 16));
        assert_eq!(links[0].action, LinkAction::OpenChannel);

        assert!(parse(text, &HashSet::<String>::new()).is_empty());
    }

    #[test]
    fn empty_text_has_no_links() {
        assert!(parse("", &directory()).is_empty());
    }

    #[test]
    fn configured_hosts_change_classification() {
        let parser = LinkParser::new(LinkConfig {
            website_hosts: vec!["example.org".to_string()],
            ..LinkConfig::default()
        });
        let Ok(parser) = parser else {
            panic!("parser should build from a valid config");
        };

        let links = parser.parse(
            "https://example.org/b/1 https://dev.ppy.sh/b/1",
            &directory(),
        );
        let actions = links.iter().map(|link| link.action).collect::<Vec<_>>();
        assert_eq!(actions, vec![LinkAction::OpenBeatmap, LinkAction::External]);
    }
}
