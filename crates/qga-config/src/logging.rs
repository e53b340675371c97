use std::fmt;
use std::convert::Infallible;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::defaults::DEFAULT_LOG_SINK;

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Destination for log records.
///
/// The keyword `stderr` selects standard error; anything else is treated as
/// a file path that the agent appends to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "sink", rename_all = "snake_case")]
pub enum LogSink {
    /// Standard error of the agent process.
    #[default]
    Stderr,
    /// Append-only log file.
    File {
        /// Location of the log file.
        path: Utf8PathBuf,
    },
}

impl LogSink {
    /// Returns the file path when logging to a file.
    #[must_use]
    pub fn file_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Stderr => None,
            Self::File { path } => Some(path.as_path()),
        }
    }
}

impl fmt::Display for LogSink {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stderr => formatter.write_str(DEFAULT_LOG_SINK),
            Self::File { path } => write!(formatter, "{path}"),
        }
    }
}

impl FromStr for LogSink {
    type Err = Infallible;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(DEFAULT_LOG_SINK) {
            Ok(Self::Stderr)
        } else {
            Ok(Self::File {
                path: Utf8PathBuf::from(trimmed),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::keyword("stderr", LogSink::Stderr)]
    #[case::shouting("STDERR", LogSink::Stderr)]
    #[case::empty("", LogSink::Stderr)]
    #[case::file("/var/log/qemu-ga.log", LogSink::File { path: "/var/log/qemu-ga.log".into() })]
    fn parses_log_sink(#[case] input: &str, #[case] expected: LogSink) {
        let Ok(sink) = input.parse::<LogSink>();
        assert_eq!(sink, expected);
    }

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("COMPACT".parse::<LogFormat>().ok(), Some(LogFormat::Compact));
        assert_eq!(LogFormat::Json.to_string(), "json");
    }
}
