use crate::hashable::hash_tender;
use chrono::FixedOffset;
use serde::Deserialize;
use serde_json::Value;
use tender_core::types::{NewDocument, NewTender, NormalizedItem};
use tender_parsers::{parse_eskom_date, squash_whitespace};

/// Raw shape of one Eskom tender record: flat fields, a single optional download
/// link, no contacts.
#[derive(Debug, Deserialize)]
struct EskomRaw {
    #[serde(rename = "TenderID")]
    tender_id: Option<String>,
    #[serde(rename = "enquiryNumber")]
    enquiry_number: Option<String>,
    #[serde(rename = "scopeDetails")]
    scope_details: Option<String>,
    dt: Option<String>,
    published: Option<String>,
    closing: Option<String>,
    #[serde(rename = "readMore")]
    read_more: Option<String>,
    #[serde(rename = "downloadLink")]
    download_link: Option<String>,
    #[serde(rename = "tenderBoxAddress")]
    tender_box_address: Option<String>,
    #[serde(rename = "targetAudience")]
    target_audience: Option<String>,
    #[serde(rename = "contractType")]
    contract_type: Option<String>,
    #[serde(rename = "projectType")]
    project_type: Option<String>,
    #[serde(rename = "queriesTo")]
    queries_to: Option<String>,
}

/// Normalizes a single raw Eskom record. Returns `None` when `TenderID` is absent,
/// per the "require a stable external_id" contract.
pub fn normalize_one(raw: &Value, offset: &FixedOffset) -> Option<NormalizedItem> {
    let raw: EskomRaw = serde_json::from_value(raw.clone()).ok()?;
    let external_id = raw.tender_id?;

    let description = raw.scope_details.as_deref().and_then(squash_whitespace);
    let published_at = raw.published.as_deref().and_then(|s| parse_eskom_date(s, offset));
    let closing_at = raw.closing.as_deref().and_then(|s| parse_eskom_date(s, offset));
    let location = raw.tender_box_address.as_deref().and_then(squash_whitespace);

    let mut tender = NewTender {
        external_id: external_id.clone(),
        source_tender_id: raw.enquiry_number,
        title: description.clone().unwrap_or_default(),
        description,
        category: raw.dt.as_deref().and_then(squash_whitespace),
        location,
        published_at,
        closing_at,
        url: raw.read_more,
        tender_box_address: raw.tender_box_address,
        target_audience: raw.target_audience,
        contract_type: raw.contract_type,
        project_type: raw.project_type,
        queries_to: raw.queries_to,
        ..Default::default()
    };

    tender.hash = hash_tender(&tender);

    let documents = raw
        .download_link
        .map(|url| NewDocument {
            url: Some(url),
            ..Default::default()
        })
        .into_iter()
        .collect();

    Some(NormalizedItem {
        tender,
        documents,
        contacts: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tender_parsers::parse_offset;

    #[test]
    fn eskom_happy_path() {
        let raw = serde_json::json!({
            "TenderID": "T-1",
            "enquiryNumber": "E1",
            "scopeDetails": "  scope   text  ",
            "published": "2025-Oct-01 09:00:00",
            "closing": "2025-Nov-15 12:00:00",
            "readMore": "https://example.com/tender/X",
            "downloadLink": "https://example.com/DownloadAll?id=X",
        });

        let item = normalize_one(&raw, &parse_offset("+02:00")).unwrap();

        assert_eq!(item.tender.external_id, "T-1");
        assert_eq!(item.tender.description.as_deref(), Some("scope text"));
        assert_eq!(
            item.tender.published_at.unwrap().to_rfc3339(),
            "2025-10-01T07:00:00+00:00"
        );
        assert_eq!(
            item.tender.closing_at.unwrap().to_rfc3339(),
            "2025-11-15T10:00:00+00:00"
        );
        assert_eq!(item.documents.len(), 1);
        assert_eq!(
            item.documents[0].url.as_deref(),
            Some("https://example.com/DownloadAll?id=X")
        );
        assert!(item.contacts.is_empty());
    }

    #[test]
    fn eskom_skips_without_external_id() {
        let raw = serde_json::json!({"scopeDetails": "no id here"});
        assert!(normalize_one(&raw, &parse_offset("+02:00")).is_none());
    }
}
