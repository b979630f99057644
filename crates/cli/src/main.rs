mod settings;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chatline_chat::{
    ChannelManager, ChatError, ChatTimeline, MessageDraft, MessageId, Sender, TokioScheduler,
};
use chatline_links::{FinalLink, LinkError, LinkParser, RawText, TextRun, project};
use serde::Serialize;
use snafu::{OptionExt, ResultExt, Snafu};
use tracing_subscriber::EnvFilter;

use crate::settings::{Settings, SettingsError, SettingsStore};

#[derive(Debug, Clone)]
struct RunnerArgs {
    command: Command,
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
enum Command {
    Parse { text: String },
    Echo,
    ConfigInit,
}

#[derive(Debug, Snafu)]
enum RunnerError {
    #[snafu(display("missing command, expected one of: parse, echo, config-init"))]
    MissingCommand { stage: &'static str },
    #[snafu(display("missing value for argument '{arg}'"))]
    MissingArgumentValue {
        stage: &'static str,
        arg: &'static str,
    },
    #[snafu(display("unknown command '{raw}'"))]
    UnknownCommand { stage: &'static str, raw: String },
    #[snafu(display("unknown argument '{raw}'"))]
    UnknownArgument { stage: &'static str, raw: String },
    #[snafu(display("nothing to parse, pass the chat text after 'parse'"))]
    MissingText { stage: &'static str },
    #[snafu(display("failed to build link parser: {source}"))]
    BuildParser {
        stage: &'static str,
        source: LinkError,
    },
    #[snafu(display("chat timeline failed on `{stage}`: {source}"))]
    Timeline {
        stage: &'static str,
        source: ChatError,
    },
    #[snafu(display("failed to save settings: {source}"))]
    SaveSettings {
        stage: &'static str,
        source: SettingsError,
    },
    #[snafu(display("failed to encode output on `{stage}`: {source}"))]
    EncodeOutput {
        stage: &'static str,
        source: serde_json::Error,
    },
}

type RunnerResult<T> = Result<T, RunnerError>;

#[derive(Debug, Serialize)]
struct ParseReport<'a> {
    text: &'a str,
    links: &'a [FinalLink],
    runs: Vec<TextRun>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    if let Err(error) = run().await {
        eprintln!("chatline: {error}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> RunnerResult<()> {
    let args = parse_args(env::args().skip(1))?;
    let store = match args.config_path {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::load(),
    };
    let settings = store.settings();

    match args.command {
        Command::Parse { text } => run_parse(&settings, &text),
        Command::Echo => run_echo(&settings).await,
        Command::ConfigInit => {
            store
                .update(Settings::clone(&settings))
                .context(SaveSettingsSnafu {
                    stage: "config-init",
                })?;
            println!("{}", store.config_path().display());
            Ok(())
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> RunnerResult<RunnerArgs> {
    let mut config_path = None;
    let mut pending = args.into_iter();

    let command = loop {
        let argument = pending.next().context(MissingCommandSnafu {
            stage: "parse-args-command",
        })?;

        match argument.as_str() {
            "--config" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-config-value",
                    arg: "--config",
                })?;
                config_path = Some(PathBuf::from(value));
            }
            "parse" => {
                // Everything after `parse` is chat text, flags included.
                let text = pending.by_ref().collect::<Vec<_>>().join(" ");
                if text.is_empty() {
                    return MissingTextSnafu {
                        stage: "parse-args-text",
                    }
                    .fail();
                }
                break Command::Parse { text };
            }
            "echo" => break Command::Echo,
            "config-init" => break Command::ConfigInit,
            _ if argument.starts_with("--") => {
                return UnknownArgumentSnafu {
                    stage: "parse-args",
                    raw: argument,
                }
                .fail();
            }
            _ => {
                return UnknownCommandSnafu {
                    stage: "parse-args-command",
                    raw: argument,
                }
                .fail();
            }
        }
    };

    if let Some(extra) = pending.next() {
        return UnknownArgumentSnafu {
            stage: "parse-args-trailing",
            raw: extra,
        }
        .fail();
    }

    Ok(RunnerArgs {
        command,
        config_path,
    })
}

fn run_parse(settings: &Settings, text: &str) -> RunnerResult<()> {
    let parser = LinkParser::new(settings.links.clone()).context(BuildParserSnafu {
        stage: "parse-build-parser",
    })?;
    let channels = ChannelManager::new(&settings.channels);
    let snapshot = channels.snapshot();

    let raw = RawText::new(text);
    let links = parser.parse_raw(&raw, snapshot.as_ref());
    let report = ParseReport {
        text,
        runs: project(&raw, &links),
        links: &links,
    };

    let output = serde_json::to_string_pretty(&report).context(EncodeOutputSnafu {
        stage: "parse-encode-report",
    })?;
    println!("{output}");
    Ok(())
}

type EchoLine = (&'static str, Option<&'static str>, u64);

/// Chat lines for the echo demo with their confirmed text, when it differs, and
/// their confirmation delay in milliseconds.
fn echo_script(base: u64) -> [EchoLine; 4] {
    [
        ("sent!", Some("received!"), base),
        ("https://dev.ppy.sh/home", None, base.saturating_mul(2)),
        ("[https://dev.ppy.sh/forum let's try multiple words too!]", None, base),
        (
            "(long loading times! clickable while loading?)[https://dev.ppy.sh/home]",
            None,
            base.saturating_mul(20),
        ),
    ]
}

/// Posts four local echoes and confirms each after a staggered delay, the first
/// one with different final content.
async fn run_echo(settings: &Settings) -> RunnerResult<()> {
    let script = echo_script(settings.echo_delay_ms);

    let channels = Arc::new(ChannelManager::new(&settings.channels));
    let scheduler = Arc::new(TokioScheduler::current().context(TimelineSnafu {
        stage: "echo-scheduler",
    })?);
    let mut timeline = ChatTimeline::with_config(settings.links.clone(), channels, scheduler)
        .context(TimelineSnafu {
            stage: "echo-build-timeline",
        })?;

    let sender = Sender::new(1, "Somebody");
    for (index, (text, confirmed_text, delay_ms)) in script.into_iter().enumerate() {
        let now = chrono::Utc::now();
        let echo = timeline
            .post_local_echo(MessageDraft::new(sender.clone(), text, now))
            .context(TimelineSnafu {
                stage: "echo-post-local-echo",
            })?;
        let confirmed = MessageDraft::new(sender.clone(), confirmed_text.unwrap_or(text), now);
        timeline
            .schedule_confirmation(
                echo,
                Duration::from_millis(delay_ms),
                MessageId::new(index as u64 + 1),
                confirmed,
            )
            .context(TimelineSnafu {
                stage: "echo-schedule-confirmation",
            })?;
        tracing::info!(echo = ?echo, delay_ms, "sent local echo");
    }

    while timeline.pending_confirmations() > 0 {
        let Some(command) = timeline.next_command().await else {
            break;
        };
        timeline.apply(command);
    }

    for message in timeline.messages() {
        let links = message
            .links()
            .iter()
            .map(|link| format!("{:?}({})", link.action, link.argument))
            .collect::<Vec<_>>();
        println!(
            "#{} {}: {} [{}]",
            message.id().0,
            message.sender().username,
            message.content(),
            links.join(", ")
        );
    }

    debug_assert!(timeline.messages().is_sorted());
    timeline.teardown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> RunnerResult<RunnerArgs> {
        parse_args(raw.iter().map(|value| value.to_string()))
    }

    #[test]
    fn parse_joins_remaining_words() {
        let parsed = args(&["--config", "/tmp/c.json", "parse", "Join", "#english"]).unwrap();
        assert_eq!(parsed.config_path, Some(PathBuf::from("/tmp/c.json")));
        assert!(matches!(parsed.command, Command::Parse { text } if text == "Join #english"));
    }

    #[test]
    fn echo_delays_saturate_instead_of_overflowing() {
        let delays = echo_script(250).map(|(_, _, delay_ms)| delay_ms);
        assert_eq!(delays, [250, 500, 250, 5000]);

        let delays = echo_script(u64::MAX).map(|(_, _, delay_ms)| delay_ms);
        assert!(delays.iter().all(|delay_ms| *delay_ms == u64::MAX));
    }

    #[test]
    fn missing_and_unknown_commands_are_errors() {
        assert!(matches!(args(&[]), Err(RunnerError::MissingCommand { .. })));
        assert!(matches!(
            args(&["frobnicate"]),
            Err(RunnerError::UnknownCommand { .. })
        ));
        assert!(matches!(
            args(&["--verbose", "echo"]),
            Err(RunnerError::UnknownArgument { .. })
        ));
        assert!(matches!(args(&["parse"]), Err(RunnerError::MissingText { .. })));
        assert!(matches!(
            args(&["echo", "extra"]),
            Err(RunnerError::UnknownArgument { .. })
        ));
    }
}
