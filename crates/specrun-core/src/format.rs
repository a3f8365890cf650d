//! Wire-encoding validators
//!
//! Date-time encodings (RFC3339, RFC7231 HTTP-date, unix timestamp) and the
//! collection formats used to pack several values into one query parameter.
//! Pure functions, no I/O.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `2022-08-26T18:38:00.000Z`, `2022-08-26T18:38:00+02:00`
static RFC3339: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[Tt]\d{2}:\d{2}:\d{2}(\.\d+)?([Zz]|[+-]\d{2}:\d{2})$")
        .expect("static regex")
});

/// `Fri, 26 Aug 2022 14:38:00 GMT` (IMF-fixdate, fixed width)
static RFC7231: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(Mon|Tue|Wed|Thu|Fri|Sat|Sun), \d{2} (Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec) \d{4} \d{2}:\d{2}:\d{2} GMT$",
    )
    .expect("static regex")
});

static UNIX_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("static regex"));

/// Layout after the `Wkd, ` prefix; the weekday is checked separately.
const RFC7231_LAYOUT: &str = "%d %b %Y %H:%M:%S GMT";

/// Named date-time wire encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DateFormat {
    Rfc3339,
    Rfc7231,
    UnixTimestamp,
}

impl DateFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rfc3339 => "rfc3339",
            Self::Rfc7231 => "rfc7231",
            Self::UnixTimestamp => "unix-timestamp",
        }
    }
}

impl std::fmt::Display for DateFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value does not conform to its declared wire encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{value}\" is not a valid {format} value: {reason}")]
pub struct FormatError {
    pub value: String,
    pub format: DateFormat,
    pub reason: String,
}

impl FormatError {
    fn new(value: &str, format: DateFormat, reason: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            format,
            reason: reason.into(),
        }
    }
}

/// Check that `raw` is a well-formed value of `format`.
///
/// # Errors
///
/// Returns [`FormatError`] describing the first deviation found.
pub fn validate_value_format(raw: &str, format: DateFormat) -> Result<(), FormatError> {
    parse_instant(raw, format).map(|_| ())
}

/// Parse `raw` as `format` and return the UTC instant it denotes.
///
/// Two textually different encodings of the same instant
/// (`...00.000Z` and `...00Z`) yield equal instants.
///
/// # Errors
///
/// Returns [`FormatError`] if `raw` is not a valid `format` value.
pub fn parse_instant(raw: &str, format: DateFormat) -> Result<DateTime<Utc>, FormatError> {
    match format {
        DateFormat::Rfc3339 => parse_rfc3339(raw),
        DateFormat::Rfc7231 => parse_rfc7231(raw),
        DateFormat::UnixTimestamp => parse_unix_timestamp(raw),
    }
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, FormatError> {
    if !RFC3339.is_match(raw) {
        return Err(FormatError::new(
            raw,
            DateFormat::Rfc3339,
            "expected YYYY-MM-DDTHH:MM:SS[.fff] followed by Z or an explicit offset",
        ));
    }
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| FormatError::new(raw, DateFormat::Rfc3339, e.to_string()))?;

    // Re-render and re-parse: the value must denote one unambiguous instant.
    let rendered = parsed.to_rfc3339_opts(SecondsFormat::AutoSi, true);
    let reparsed = DateTime::parse_from_rfc3339(&rendered)
        .map_err(|e| FormatError::new(raw, DateFormat::Rfc3339, e.to_string()))?;
    if reparsed != parsed {
        return Err(FormatError::new(
            raw,
            DateFormat::Rfc3339,
            format!("does not round-trip (re-parsed as {rendered})"),
        ));
    }
    Ok(parsed.with_timezone(&Utc))
}

fn parse_rfc7231(raw: &str) -> Result<DateTime<Utc>, FormatError> {
    if !RFC7231.is_match(raw) {
        return Err(FormatError::new(
            raw,
            DateFormat::Rfc7231,
            "expected `Wkd, DD Mon YYYY HH:MM:SS GMT`",
        ));
    }
    let naive = NaiveDateTime::parse_from_str(&raw[5..], RFC7231_LAYOUT)
        .map_err(|e| FormatError::new(raw, DateFormat::Rfc7231, e.to_string()))?;

    let weekday = naive.format("%a").to_string();
    if !raw.starts_with(&weekday) {
        return Err(FormatError::new(
            raw,
            DateFormat::Rfc7231,
            format!("weekday does not match date (expected {weekday})"),
        ));
    }
    Ok(naive.and_utc())
}

fn parse_unix_timestamp(raw: &str) -> Result<DateTime<Utc>, FormatError> {
    if !UNIX_TIMESTAMP.is_match(raw) {
        return Err(FormatError::new(
            raw,
            DateFormat::UnixTimestamp,
            "expected an integer number of seconds",
        ));
    }
    let secs: i64 = raw
        .parse()
        .map_err(|e: std::num::ParseIntError| {
            FormatError::new(raw, DateFormat::UnixTimestamp, e.to_string())
        })?;
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| FormatError::new(raw, DateFormat::UnixTimestamp, "out of range"))
}

/// Wire convention for encoding several values into one query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CollectionFormat {
    /// `a,b,c`
    Csv,
    /// `a b c`
    Ssv,
    /// `a\tb\tc`
    Tsv,
    /// `a|b|c`
    Pipes,
    /// `k=a&k=b&k=c`
    Multi,
}

impl CollectionFormat {
    /// Separator inside a single parameter value (`None` for `multi`).
    #[must_use]
    pub const fn delimiter(self) -> Option<char> {
        match self {
            Self::Csv => Some(','),
            Self::Ssv => Some(' '),
            Self::Tsv => Some('\t'),
            Self::Pipes => Some('|'),
            Self::Multi => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Ssv => "ssv",
            Self::Tsv => "tsv",
            Self::Pipes => "pipes",
            Self::Multi => "multi",
        }
    }
}

impl std::fmt::Display for CollectionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode every occurrence of one query parameter into its value sequence.
///
/// `occurrences` are the raw values in the order they appear in the query
/// string. No trimming is applied; source order is preserved.
#[must_use]
pub fn decode_collection<S: AsRef<str>>(occurrences: &[S], format: CollectionFormat) -> Vec<String> {
    match format.delimiter() {
        None => occurrences.iter().map(|s| s.as_ref().to_string()).collect(),
        Some(sep) => occurrences
            .iter()
            .flat_map(|s| s.as_ref().split(sep).map(str::to_string))
            .collect(),
    }
}

/// Encode a value sequence into the raw query value(s) for one parameter.
///
/// An empty sequence produces no occurrence at all.
#[must_use]
pub fn encode_collection<S: AsRef<str>>(values: &[S], format: CollectionFormat) -> Vec<String> {
    if values.is_empty() {
        return Vec::new();
    }
    match format.delimiter() {
        None => values.iter().map(|s| s.as_ref().to_string()).collect(),
        Some(sep) => {
            let joined = values
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(&sep.to_string());
            vec![joined]
        }
    }
}
