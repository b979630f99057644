use serde::Serialize;

use crate::link::FinalLink;
use crate::text::RawText;

/// One renderable piece of a chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextRun {
    Plain { text: String },
    /// `link` indexes into the link list the runs were projected from.
    Link { text: String, link: usize },
}

impl TextRun {
    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Link { text, .. } => text,
        }
    }
}

/// Splits `text` into plain and link runs, showing each link's display text.
///
/// Links are expected sorted and non-overlapping; a link that starts before the
/// previous one ended is left out rather than rendered twice.
pub fn project(text: &RawText, links: &[FinalLink]) -> Vec<TextRun> {
    let mut runs = Vec::with_capacity(links.len() * 2 + 1);
    let mut cursor = 0;

    for (index, link) in links.iter().enumerate() {
        if link.start < cursor || link.end > text.len() {
            continue;
        }
        if link.start > cursor {
            runs.push(TextRun::Plain {
                text: text.slice(cursor, link.start).to_string(),
            });
        }
        runs.push(TextRun::Link {
            text: link.display_text.clone(),
            link: index,
        });
        cursor = link.end;
    }

    if cursor < text.len() {
        runs.push(TextRun::Plain {
            text: text.slice(cursor, text.len()).to_string(),
        });
    }

    runs
}
