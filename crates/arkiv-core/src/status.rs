//! Graded outcome codes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Outcome of an operation or of one of its events.
///
/// Variants are ordered by severity, so `max` yields the worst outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusCode {
    /// The operation has begun and has no verdict yet.
    Started,
    /// Completed successfully.
    Ok,
    /// Completed with a non-blocking anomaly.
    Warning,
    /// Completed with a business failure.
    Ko,
    /// Aborted by an operational failure.
    Fatal,
}

impl StatusCode {
    /// All codes, from least to most severe.
    pub const ALL: [Self; 5] = [
        Self::Started,
        Self::Ok,
        Self::Warning,
        Self::Ko,
        Self::Fatal,
    ];

    /// Canonical upper-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Ko => "KO",
            Self::Fatal => "FATAL",
        }
    }

    /// Equivalent HTTP status for callers that speak HTTP.
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            Self::Started => 202,
            Self::Ok => 200,
            Self::Warning => 206,
            Self::Ko => 400,
            Self::Fatal => 500,
        }
    }

    /// The more severe of two outcomes.
    #[must_use]
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }

    /// Whether the outcome is `KO` or `FATAL`.
    #[must_use]
    pub fn is_failure(self) -> bool {
        self >= Self::Ko
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownName {
                kind: "status code",
                value: s.to_string(),
            })
    }
}
