//! The report-key addressing scheme: `(reportCode, statistic, ds1?, ds2?)`,
//! and its canonical, percent-encoded text form used both as a table column
//! and on the wire.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::model::normalize_optional;

/// Leaves `-`, `_`, `.`, `~` unescaped; everything else (including `:`) is
/// percent-encoded, which is what lets [`ReportKey`]'s own colon-joined
/// text form split unambiguously.
const ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn urlenc(value: &str) -> String {
    utf8_percent_encode(value, ENCODE_SET).to_string()
}

fn urldec(value: &str) -> Result<String, ReportKeyParseError> {
    percent_decode_str(value)
        .decode_utf8()
        .map(|cow| cow.into_owned())
        .map_err(|_| ReportKeyParseError::InvalidEncoding(value.to_owned()))
}

/// Which aggregate report a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReportCode {
    /// Data-source summary.
    Dss,
    /// Cross-source summary.
    Css,
    /// Entity-size breakdown.
    Esb,
    /// Entity-relation breakdown.
    Erb,
}

impl ReportCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dss => "DSS",
            Self::Css => "CSS",
            Self::Esb => "ESB",
            Self::Erb => "ERB",
        }
    }

    fn parse(text: &str) -> Result<Self, ReportKeyParseError> {
        match text {
            "DSS" => Ok(Self::Dss),
            "CSS" => Ok(Self::Css),
            "ESB" => Ok(Self::Esb),
            "ERB" => Ok(Self::Erb),
            other => Err(ReportKeyParseError::UnknownCode(other.to_owned())),
        }
    }
}

/// The base statistic tag, before any `(principle, matchKey)` qualification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BaseStatistic {
    EntityCount,
    RecordCount,
    UnmatchedCount,
    MatchedCount,
    AmbiguousMatchCount,
    PossibleMatchCount,
    PossibleRelationCount,
    DisclosedRelationCount,
}

impl BaseStatistic {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EntityCount => "ENTITY_COUNT",
            Self::RecordCount => "RECORD_COUNT",
            Self::UnmatchedCount => "UNMATCHED_COUNT",
            Self::MatchedCount => "MATCHED_COUNT",
            Self::AmbiguousMatchCount => "AMBIGUOUS_MATCH_COUNT",
            Self::PossibleMatchCount => "POSSIBLE_MATCH_COUNT",
            Self::PossibleRelationCount => "POSSIBLE_RELATION_COUNT",
            Self::DisclosedRelationCount => "DISCLOSED_RELATION_COUNT",
        }
    }

    fn parse(text: &str) -> Result<Self, ReportKeyParseError> {
        match text {
            "ENTITY_COUNT" => Ok(Self::EntityCount),
            "RECORD_COUNT" => Ok(Self::RecordCount),
            "UNMATCHED_COUNT" => Ok(Self::UnmatchedCount),
            "MATCHED_COUNT" => Ok(Self::MatchedCount),
            "AMBIGUOUS_MATCH_COUNT" => Ok(Self::AmbiguousMatchCount),
            "POSSIBLE_MATCH_COUNT" => Ok(Self::PossibleMatchCount),
            "POSSIBLE_RELATION_COUNT" => Ok(Self::PossibleRelationCount),
            "DISCLOSED_RELATION_COUNT" => Ok(Self::DisclosedRelationCount),
            other => Err(ReportKeyParseError::UnknownStatistic(other.to_owned())),
        }
    }
}

/// A base statistic, optionally qualified by `(principle, matchKey)`.
///
/// Text form: `STAT[:principle[:matchKey]]`, with blank qualifiers
/// normalized to absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStatistic {
    pub base: BaseStatistic,
    pub principle: Option<String>,
    pub match_key: Option<String>,
}

impl ReportStatistic {
    #[must_use]
    pub fn new(base: BaseStatistic, principle: Option<&str>, match_key: Option<&str>) -> Self {
        Self {
            base,
            principle: normalize_optional(principle),
            match_key: normalize_optional(match_key),
        }
    }

    #[must_use]
    pub fn format(&self) -> String {
        match (&self.principle, &self.match_key) {
            (None, None) => self.base.as_str().to_owned(),
            (Some(principle), None) => format!("{}:{principle}", self.base.as_str()),
            (None, Some(match_key)) => format!("{}::{match_key}", self.base.as_str()),
            (Some(principle), Some(match_key)) => {
                format!("{}:{principle}:{match_key}", self.base.as_str())
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self, ReportKeyParseError> {
        let mut parts = text.splitn(3, ':');
        let base = BaseStatistic::parse(
            parts
                .next()
                .ok_or_else(|| ReportKeyParseError::Malformed(text.to_owned()))?,
        )?;
        let principle = parts.next().and_then(|p| normalize_optional(Some(p)));
        let match_key = parts.next().and_then(|p| normalize_optional(Some(p)));
        Ok(Self {
            base,
            principle,
            match_key,
        })
    }
}

/// Addresses a single aggregate counter row.
///
/// Invariant: `data_source_2.is_some() implies data_source_1.is_some()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportKey {
    pub code: ReportCode,
    pub statistic: ReportStatistic,
    pub data_source_1: Option<String>,
    pub data_source_2: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportKeyParseError {
    #[error("report key is malformed: {0:?}")]
    Malformed(String),
    #[error("unknown report code: {0:?}")]
    UnknownCode(String),
    #[error("unknown report statistic: {0:?}")]
    UnknownStatistic(String),
    #[error("invalid percent-encoding in report key token: {0:?}")]
    InvalidEncoding(String),
    #[error("data_source_2 set without data_source_1")]
    DanglingSecondSource,
}

impl ReportKey {
    /// # Errors
    /// Returns [`ReportKeyParseError::DanglingSecondSource`] if
    /// `data_source_2` is set while `data_source_1` is not.
    pub fn new(
        code: ReportCode,
        statistic: ReportStatistic,
        data_source_1: Option<String>,
        data_source_2: Option<String>,
    ) -> Result<Self, ReportKeyParseError> {
        if data_source_1.is_none() && data_source_2.is_some() {
            return Err(ReportKeyParseError::DanglingSecondSource);
        }
        Ok(Self {
            code,
            statistic,
            data_source_1,
            data_source_2,
        })
    }

    /// `code:urlenc(statistic)[:urlenc(ds1)[:urlenc(ds2)]]`
    #[must_use]
    pub fn format(&self) -> String {
        let mut out = format!("{}:{}", self.code.as_str(), urlenc(&self.statistic.format()));
        if let Some(ds1) = &self.data_source_1 {
            out.push(':');
            out.push_str(&urlenc(ds1));
        }
        if let Some(ds2) = &self.data_source_2 {
            out.push(':');
            out.push_str(&urlenc(ds2));
        }
        out
    }

    /// Total inverse of [`Self::format`]. Accepts 2-4 colon-separated
    /// tokens.
    pub fn parse(text: &str) -> Result<Self, ReportKeyParseError> {
        let tokens: Vec<&str> = text.split(':').collect();
        if !(2..=4).contains(&tokens.len()) {
            return Err(ReportKeyParseError::Malformed(text.to_owned()));
        }
        let code = ReportCode::parse(tokens[0])?;
        let statistic = ReportStatistic::parse(&urldec(tokens[1])?)?;
        let data_source_1 = tokens.get(2).map(|t| urldec(t)).transpose()?;
        let data_source_2 = tokens.get(3).map(|t| urldec(t)).transpose()?;
        Self::new(code, statistic, data_source_1, data_source_2)
    }
}

/// A signed delta to a single `ReportKey`'s counters, produced by the diff
/// engine and consumed by the journal fold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportUpdate {
    pub report_key: ReportKey,
    pub entity_id: i64,
    pub related_id: Option<i64>,
    pub entity_delta: i64,
    pub record_delta: i64,
    pub relation_delta: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_key_round_trips_unqualified() {
        let key = ReportKey::new(
            ReportCode::Dss,
            ReportStatistic::new(BaseStatistic::EntityCount, None, None),
            Some("FOO".to_owned()),
            None,
        )
        .unwrap();
        let text = key.format();
        assert_eq!(ReportKey::parse(&text).unwrap(), key);
    }

    #[test]
    fn report_key_round_trips_fully_qualified() {
        let key = ReportKey::new(
            ReportCode::Css,
            ReportStatistic::new(
                BaseStatistic::PossibleRelationCount,
                Some("SF1"),
                Some("PHONE"),
            ),
            Some("FOO".to_owned()),
            Some("BAR".to_owned()),
        )
        .unwrap();
        let text = key.format();
        assert_eq!(text, "CSS:POSSIBLE_RELATION_COUNT%3ASF1%3APHONE:FOO:BAR");
        assert_eq!(ReportKey::parse(&text).unwrap(), key);
    }

    #[test]
    fn report_key_rejects_dangling_second_source() {
        let err = ReportKey::new(
            ReportCode::Dss,
            ReportStatistic::new(BaseStatistic::EntityCount, None, None),
            None,
            Some("BAR".to_owned()),
        )
        .unwrap_err();
        assert_eq!(err, ReportKeyParseError::DanglingSecondSource);
    }

    #[test]
    fn report_key_parse_rejects_bad_token_count() {
        assert!(ReportKey::parse("DSS").is_err());
        assert!(ReportKey::parse("DSS:A:B:C:D").is_err());
    }

    #[test]
    fn blank_qualifiers_normalize_to_absent() {
        let stat = ReportStatistic::parse("ENTITY_COUNT::").unwrap();
        assert_eq!(stat.principle, None);
        assert_eq!(stat.match_key, None);
        assert_eq!(stat.format(), "ENTITY_COUNT");
    }
}
