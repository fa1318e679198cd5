use tracing::{debug, warn};
use url::Url;

use crate::{Compilation, CompiledRule, MalformedRuleError, RecordField, RuleRecord, UrlTransform};

/// Compile user rule records into declarative redirect rules.
///
/// Disabled records are ignored. A record whose source or destination does not
/// parse as an absolute URL is skipped and reported in
/// [`Compilation::skipped()`]; the remaining records still compile. Emitted
/// rules are numbered from 1 in input order and skipped records do not consume
/// an id.
///
/// # Example
///
/// ```
/// use domain_redirect::{compile, RuleRecord};
///
/// let records = vec![RuleRecord::new(
///     1,
///     "https://old.example.com",
///     "https://new.example.org:8443/path",
/// )];
/// let compiled = compile(&records);
/// let rule = &compiled.rules()[0];
/// assert_eq!(rule.id, 1);
/// assert_eq!(rule.url_filter(), "https://old.example.com/*");
/// assert_eq!(rule.transform().port, "8443");
/// ```
pub fn compile(records: &[RuleRecord]) -> Compilation {
    let mut rules = Vec::new();
    let mut skipped = Vec::new();
    let mut next_id: u32 = 1;

    for record in records.iter().filter(|r| r.enabled) {
        match compile_record(record, next_id) {
            Ok(rule) => {
                rules.push(rule);
                next_id += 1;
            }
            Err(err) => {
                warn!(
                    record_id = record.id,
                    field = %err.field(),
                    error = %err,
                    "skipping malformed redirect rule"
                );
                skipped.push(err);
            }
        }
    }

    let compilation = Compilation::new(rules, skipped);
    for (filter, ids) in compilation.duplicate_filters() {
        warn!(
            url_filter = filter,
            rule_ids = ?ids,
            "several enabled rules share one source origin; the last one wins"
        );
    }
    debug!(
        rules = compilation.rules().len(),
        skipped = compilation.skipped().len(),
        "compiled redirect rules"
    );
    compilation
}

fn compile_record(record: &RuleRecord, id: u32) -> Result<CompiledRule, MalformedRuleError> {
    let source = parse_absolute(record.id, RecordField::Source, &record.source_domain)?;
    let destination = parse_absolute(
        record.id,
        RecordField::Destination,
        &record.destination_domain,
    )?;

    let origin = source.origin();
    if !origin.is_tuple() {
        return Err(MalformedRuleError::OpaqueOrigin {
            record_id: record.id,
            value: record.source_domain.clone(),
        });
    }

    let host = match destination.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => {
            return Err(MalformedRuleError::MissingHost {
                record_id: record.id,
                value: record.destination_domain.clone(),
            })
        }
    };

    let transform = UrlTransform {
        scheme: destination.scheme().to_owned(),
        host: host.to_owned(),
        // `Url::port` is `None` for both an absent and a scheme-default port.
        port: destination.port().map(|p| p.to_string()).unwrap_or_default(),
    };

    Ok(CompiledRule::redirect(
        id,
        format!("{}/*", origin.ascii_serialization()),
        transform,
    ))
}

fn parse_absolute(record_id: i64, field: RecordField, value: &str) -> Result<Url, MalformedRuleError> {
    Url::parse(value).map_err(|reason| MalformedRuleError::InvalidUrl {
        record_id,
        field,
        value: value.to_owned(),
        reason,
    })
}
