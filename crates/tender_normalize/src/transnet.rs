use crate::hashable::hash_tender;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use serde_json::Value;
use tender_core::types::{NewContact, NewDocument, NewTender, NormalizedItem};
use tender_parsers::{parse_transnet_date, squash_whitespace};

#[derive(Debug, Deserialize)]
struct TransnetRaw {
    #[serde(rename = "tenderNumber")]
    tender_number: Option<String>,
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "tenderCategory")]
    tender_category: Option<String>,
    #[serde(rename = "locationOfService")]
    location_of_service: Option<String>,
    institution: Option<String>,
    #[serde(rename = "contactPerson")]
    contact_person: Option<String>,
    #[serde(rename = "contactEmail")]
    contact_email: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
    #[serde(rename = "closingDate")]
    closing_date: Option<String>,
    details: Option<TransnetDetails>,
}

#[derive(Debug, Deserialize, Default)]
struct TransnetDetails {
    category: Option<String>,
    location: Option<String>,
    buyer: Option<String>,
    description: Option<String>,
    documents: Option<Vec<TransnetDocument>>,
}

#[derive(Debug, Deserialize)]
struct TransnetDocument {
    url: Option<String>,
    name: Option<String>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}

/// Normalizes a single raw Transnet record, preferring the richer `details.*`
/// sub-object over the flat top-level fields wherever both are present.
pub fn normalize_one(raw: &Value, offset: &FixedOffset) -> Option<NormalizedItem> {
    let raw: TransnetRaw = serde_json::from_value(raw.clone()).ok()?;
    let external_id = raw.tender_number?;

    let details = raw.details.unwrap_or_default();

    let category = details
        .category
        .or(raw.tender_category)
        .as_deref()
        .and_then(squash_whitespace);
    let location = details
        .location
        .or(raw.location_of_service)
        .as_deref()
        .and_then(squash_whitespace);
    let buyer = details
        .buyer
        .or(raw.institution)
        .as_deref()
        .and_then(squash_whitespace);
    let description = details
        .description
        .or(raw.description)
        .as_deref()
        .and_then(squash_whitespace);

    let published_at = parse_date(&raw.published_date, offset);
    let closing_at = parse_date(&raw.closing_date, offset);

    let mut tender = NewTender {
        external_id: external_id.clone(),
        title: raw.title.as_deref().and_then(squash_whitespace).unwrap_or_default(),
        description,
        category,
        location,
        buyer,
        published_at,
        closing_at,
        ..Default::default()
    };

    tender.hash = hash_tender(&tender);

    let documents: Vec<NewDocument> = details
        .documents
        .unwrap_or_default()
        .into_iter()
        .map(|d| NewDocument {
            url: d.url,
            name: d.name,
            mime_type: d.mime_type,
            published_at: None,
        })
        .collect();

    let contacts = if raw.contact_person.is_some() || raw.contact_email.is_some() {
        vec![NewContact {
            name: raw.contact_person,
            email: raw.contact_email,
            phone: None,
        }]
    } else {
        Vec::new()
    };

    Some(NormalizedItem {
        tender,
        documents,
        contacts,
    })
}

fn parse_date(s: &Option<String>, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    s.as_deref().and_then(|s| parse_transnet_date(s, offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tender_parsers::parse_offset;

    #[test]
    fn transnet_am_pm_closing_date() {
        let raw = serde_json::json!({
            "tenderNumber": "TN-1",
            "title": "Rail signalling upgrade",
            "tenderCategory": "Works",
            "locationOfService": "Gauteng",
            "institution": "Transnet Freight Rail",
            "contactPerson": "J Smith",
            "contactEmail": "j.smith@transnet.example",
            "closingDate": "12/12/2025 4:00:00 PM",
        });

        let item = normalize_one(&raw, &parse_offset("+02:00")).unwrap();

        assert_eq!(
            item.tender.closing_at.unwrap().to_rfc3339(),
            "2025-12-12T14:00:00+00:00"
        );
        assert_eq!(item.tender.buyer.as_deref(), Some("Transnet Freight Rail"));
        assert_eq!(item.contacts.len(), 1);
        assert_eq!(item.contacts[0].email.as_deref(), Some("j.smith@transnet.example"));
    }

    #[test]
    fn transnet_prefers_details_over_flat_fields() {
        let raw = serde_json::json!({
            "tenderNumber": "TN-2",
            "title": "Port crane maintenance",
            "tenderCategory": "Goods",
            "institution": "Transnet Port Terminals",
            "details": {
                "category": "Marine Engineering",
                "buyer": "Transnet National Ports Authority",
                "documents": [{"url": "https://example.com/spec.pdf", "name": "Specification"}]
            }
        });

        let item = normalize_one(&raw, &parse_offset("+02:00")).unwrap();

        assert_eq!(item.tender.category.as_deref(), Some("Marine Engineering"));
        assert_eq!(
            item.tender.buyer.as_deref(),
            Some("Transnet National Ports Authority")
        );
        assert_eq!(item.documents.len(), 1);
        assert_eq!(item.documents[0].name.as_deref(), Some("Specification"));
    }
}
