//! Source-specific normalizers plus a single dispatch entry point. Every normalizer
//! turns one raw JSON record into a [`NormalizedItem`] and never panics on malformed
//! input — missing/unexpected shapes simply yield `None` (or, for eTenders, an empty
//! `Vec`) so the caller can count and skip rather than abort the whole batch.

mod eskom;
mod etenders;
mod hashable;
mod sanral;
mod transnet;

use chrono::FixedOffset;
use serde_json::Value;
use tender_core::types::{NormalizedItem, Source};

pub use hashable::hash_tender;

/// Normalizes one raw record for the given source. `raw` is a single tender/record
/// object except for [`Source::Etenders`], which instead expects the `{data:[...]}`
/// envelope and returns every item inside it (see [`items_for_source`]).
pub fn normalize(source: Source, raw: &Value, offset: &FixedOffset) -> Vec<NormalizedItem> {
    match source {
        Source::Eskom => eskom::normalize_one(raw, offset).into_iter().collect(),
        Source::Sanral => sanral::normalize_one(raw, offset).into_iter().collect(),
        Source::Transnet => transnet::normalize_one(raw, offset).into_iter().collect(),
        Source::Etenders => etenders::items_from_envelope(raw)
            .iter()
            .filter_map(|item| etenders::normalize_one(item, offset))
            .collect(),
    }
}

/// Splits a raw object-store payload into the individual raw records a source
/// presents to its normalizer: a top-level JSON array for the scraped sources, or
/// the `data` field of the eTenders envelope. Neither shape yields an error; an
/// unrecognized shape just produces an empty list.
pub fn items_for_source(source: Source, payload: &Value) -> Vec<Value> {
    match source {
        Source::Etenders => etenders::items_from_envelope(payload),
        _ => payload.as_array().cloned().unwrap_or_default(),
    }
}

/// Normalizes every raw record in a source's payload, in one pass.
pub fn normalize_batch(source: Source, payload: &Value, offset: &FixedOffset) -> Vec<NormalizedItem> {
    match source {
        Source::Etenders => normalize(source, payload, offset),
        _ => items_for_source(source, payload)
            .iter()
            .filter_map(|item| normalize(source, item, offset).into_iter().next())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tender_parsers::parse_offset;

    #[test]
    fn dispatch_eskom_array_payload() {
        let payload = serde_json::json!([
            {"TenderID": "T-1", "scopeDetails": "scope"},
            {"scopeDetails": "missing id, skipped"}
        ]);
        let items = normalize_batch(Source::Eskom, &payload, &parse_offset("+02:00"));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].tender.external_id, "T-1");
    }

    #[test]
    fn dispatch_etenders_envelope_payload() {
        let payload = serde_json::json!({"data": []});
        let items = normalize_batch(Source::Etenders, &payload, &parse_offset("+02:00"));
        assert!(items.is_empty());
    }
}
