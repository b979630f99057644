#![deny(unsafe_code)]

//! Link extraction for chat text.
//!
//! Raw text goes through one matcher per syntax (bracketed old-style, new-style,
//! markdown and wiki links, bare URLs, application-protocol links, editor
//! timestamps, channel mentions). The resolver turns the overlapping candidates
//! into a sorted, non-overlapping list of [`FinalLink`]s, validating channel
//! mentions against a [`ChannelDirectory`] snapshot.

mod action;
mod config;
mod directory;
mod error;
mod link;
mod matchers;
mod parser;
mod projection;
mod resolver;
mod scanner;
mod text;

pub use action::{LinkTarget, classify_target};
pub use config::{
    DEFAULT_EXTERNAL_SCHEMES, DEFAULT_MULTIPLAYER_SCHEME, DEFAULT_PROTOCOL_SCHEME,
    DEFAULT_WEBSITE_HOSTS, LinkConfig,
};
pub use directory::{ChannelDirectory, NoChannels};
pub use error::{LinkError, LinkResult};
pub use link::{CandidateLink, FinalLink, LinkAction, SyntaxKind};
pub use parser::{LinkParser, parse};
pub use projection::{TextRun, project};
pub use resolver::resolve;
pub use scanner::{ESCAPABLE, ESCAPE, Scanner, find_closing, unescape};
pub use text::RawText;
