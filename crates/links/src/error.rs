use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LinkError {
    #[snafu(display("link scheme '{scheme}' configured in {field} is not a valid URL scheme"))]
    InvalidScheme {
        stage: &'static str,
        field: &'static str,
        scheme: String,
    },
    #[snafu(display("failed to compile {pattern} pattern on `{stage}`: {source}"))]
    CompilePattern {
        stage: &'static str,
        pattern: &'static str,
        source: regex::Error,
    },
}

pub type LinkResult<T> = Result<T, LinkError>;
