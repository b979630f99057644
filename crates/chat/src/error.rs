use chatline_links::LinkError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ChatError {
    #[snafu(display("failed to build link parser on `{stage}`, {source}"))]
    BuildParser {
        stage: &'static str,
        source: LinkError,
    },
    #[snafu(display("no tokio runtime is running on `{stage}`, {source}"))]
    NoRuntime {
        stage: &'static str,
        source: tokio::runtime::TryCurrentError,
    },
    #[snafu(display("chat command queue is closed on `{stage}`"))]
    QueueClosed { stage: &'static str },
    #[snafu(display("chat timeline was torn down before `{stage}`"))]
    TornDown { stage: &'static str },
}

pub type ChatResult<T> = Result<T, ChatError>;
