use serde::Serialize;
use tender_core::hash::hex_sha256_of_json;
use tender_core::types::NewTender;

/// The stable subset of a tender's fields hashed for idempotency/change detection
/// (§4.2: "the subset is per source but must include identity, title, description,
/// location, key timestamps... and source-specific differentiators"). Field order
/// here is fixed and must never change, or historical hashes stop comparing equal.
#[derive(Serialize)]
struct Hashable<'a> {
    external_id: &'a str,
    title: &'a str,
    description: Option<&'a str>,
    location: Option<&'a str>,
    category: Option<&'a str>,
    buyer: Option<&'a str>,
    published_at: Option<String>,
    briefing_at: Option<String>,
    closing_at: Option<String>,
    tender_start_at: Option<String>,
    value_amount: Option<String>,
    status: Option<&'a str>,
    procurement_method: Option<&'a str>,
}

/// Computes `tenders.hash` for a [`NewTender`] over the fixed field subset above.
/// Timestamps are hashed as ISO-8601 of the UTC instant (or absent) so the hash is
/// stable regardless of how the source expressed its local time.
pub fn hash_tender(tender: &NewTender) -> String {
    let hashable = Hashable {
        external_id: &tender.external_id,
        title: &tender.title,
        description: tender.description.as_deref(),
        location: tender.location.as_deref(),
        category: tender.category.as_deref(),
        buyer: tender.buyer.as_deref(),
        published_at: tender.published_at.map(|dt| dt.to_rfc3339()),
        briefing_at: tender.briefing_at.map(|dt| dt.to_rfc3339()),
        closing_at: tender.closing_at.map(|dt| dt.to_rfc3339()),
        tender_start_at: tender.tender_start_at.map(|dt| dt.to_rfc3339()),
        value_amount: tender.value_amount.as_ref().map(|v| v.to_string()),
        status: tender.status.as_deref(),
        procurement_method: tender.procurement_method.as_deref(),
    };
    hex_sha256_of_json(&hashable)
}
