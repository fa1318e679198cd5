use std::fmt;

use thiserror::Error;

/// Which domain field of a [`RuleRecord`](super::RuleRecord) was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Source,
    Destination,
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordField::Source => f.write_str("sourceDomain"),
            RecordField::Destination => f.write_str("destinationDomain"),
        }
    }
}

/// A record that could not be compiled. The record is skipped; its siblings
/// still compile.
///
/// Parsing as an absolute URL is necessary but not sufficient. A source must
/// also have a scheme/host/port origin, so `mailto:`, `data:` and `file:`
/// sources fail with [`OpaqueOrigin`](Self::OpaqueOrigin) rather than
/// compiling to a `null/*` filter. A destination must have a host, so a
/// `data:` destination fails with [`MissingHost`](Self::MissingHost).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRuleError {
    #[error("rule {record_id}: {field} '{value}' is not an absolute URL: {reason}")]
    InvalidUrl {
        record_id: i64,
        field: RecordField,
        value: String,
        reason: url::ParseError,
    },

    #[error("rule {record_id}: sourceDomain '{value}' has no host-based origin")]
    OpaqueOrigin { record_id: i64, value: String },

    #[error("rule {record_id}: destinationDomain '{value}' has no host")]
    MissingHost { record_id: i64, value: String },
}

impl MalformedRuleError {
    /// Id of the offending record.
    #[must_use]
    pub fn record_id(&self) -> i64 {
        match self {
            MalformedRuleError::InvalidUrl { record_id, .. }
            | MalformedRuleError::OpaqueOrigin { record_id, .. }
            | MalformedRuleError::MissingHost { record_id, .. } => *record_id,
        }
    }

    #[must_use]
    pub fn field(&self) -> RecordField {
        match self {
            MalformedRuleError::InvalidUrl { field, .. } => *field,
            MalformedRuleError::OpaqueOrigin { .. } => RecordField::Source,
            MalformedRuleError::MissingHost { .. } => RecordField::Destination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_message() {
        let err = MalformedRuleError::InvalidUrl {
            record_id: 42,
            field: RecordField::Source,
            value: "garbage".into(),
            reason: url::ParseError::RelativeUrlWithoutBase,
        };
        assert_eq!(
            err.to_string(),
            "rule 42: sourceDomain 'garbage' is not an absolute URL: relative URL without a base"
        );
        assert_eq!(err.record_id(), 42);
        assert_eq!(err.field(), RecordField::Source);
    }

    #[test]
    fn opaque_origin_message() {
        let err = MalformedRuleError::OpaqueOrigin {
            record_id: 3,
            value: "mailto:someone@example.com".into(),
        };
        assert_eq!(
            err.to_string(),
            "rule 3: sourceDomain 'mailto:someone@example.com' has no host-based origin"
        );
        assert_eq!(err.field(), RecordField::Source);
    }

    #[test]
    fn missing_host_message() {
        let err = MalformedRuleError::MissingHost {
            record_id: 9,
            value: "data:text/plain,hi".into(),
        };
        assert_eq!(
            err.to_string(),
            "rule 9: destinationDomain 'data:text/plain,hi' has no host"
        );
        assert_eq!(err.field(), RecordField::Destination);
    }
}
