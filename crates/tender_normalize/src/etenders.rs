use crate::hashable::hash_tender;
use chrono::FixedOffset;
use serde::Deserialize;
use serde_json::Value;
use tender_core::types::{NewContact, NewDocument, NewTender, NormalizedItem};
use tender_parsers::{parse_iso, squash_whitespace};

#[derive(Debug, Deserialize)]
struct EtendersEnvelope {
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct EtendersRaw {
    #[serde(rename = "tender_No")]
    tender_no: Option<String>,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    buyer: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
    #[serde(rename = "closingDate")]
    closing_date: Option<String>,
    #[serde(rename = "supportDocument", default)]
    support_document: Vec<SupportDocument>,
    #[serde(rename = "contactPerson")]
    contact_person: Option<String>,
    email: Option<String>,
    telephone: Option<String>,
    fax: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SupportDocument {
    Url(String),
    Named { url: String, name: Option<String> },
}

/// Unwraps the `{data:[...]}` envelope eTenders delivers, returning the raw items to
/// normalize individually. A non-object or missing `data` yields an empty list, per
/// "non-object/non-array yields an empty item list (skip)".
pub fn items_from_envelope(raw: &Value) -> Vec<Value> {
    serde_json::from_value::<EtendersEnvelope>(raw.clone())
        .map(|e| e.data)
        .unwrap_or_default()
}

/// Normalizes a single raw eTenders (OCDS) record. Returns `None` when `tender_No` is
/// absent.
pub fn normalize_one(raw: &Value, offset: &FixedOffset) -> Option<NormalizedItem> {
    let raw: EtendersRaw = serde_json::from_value(raw.clone()).ok()?;
    let external_id = raw.tender_no?;

    let published_at = raw.published_date.as_deref().and_then(|s| parse_iso(s, offset));
    let closing_at = raw.closing_date.as_deref().and_then(|s| parse_iso(s, offset));

    let mut tender = NewTender {
        external_id: external_id.clone(),
        title: raw.title.as_deref().and_then(squash_whitespace).unwrap_or_default(),
        description: raw.description.as_deref().and_then(squash_whitespace),
        category: raw.category.as_deref().and_then(squash_whitespace),
        buyer: raw.buyer.as_deref().and_then(squash_whitespace),
        published_at,
        closing_at,
        ..Default::default()
    };

    tender.hash = hash_tender(&tender);

    let documents: Vec<NewDocument> = raw
        .support_document
        .into_iter()
        .map(|doc| {
            let (url, name) = match doc {
                SupportDocument::Url(url) => (url, None),
                SupportDocument::Named { url, name } => (url, name),
            };
            let mime_type = if url.to_lowercase().ends_with(".pdf") {
                Some("application/pdf".to_string())
            } else {
                None
            };
            NewDocument {
                url: Some(url),
                name,
                mime_type,
                published_at: None,
            }
        })
        .collect();

    let has_contact = raw.contact_person.is_some()
        || raw.email.is_some()
        || raw.telephone.is_some()
        || raw.fax.is_some();
    let contacts = if has_contact {
        vec![NewContact {
            name: raw.contact_person,
            email: raw.email,
            phone: raw.telephone.or(raw.fax),
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

#[cfg(test)]
mod tests {
    use super::*;
    use tender_parsers::parse_offset;

    #[test]
    fn etenders_empty_page_yields_no_items() {
        let raw = serde_json::json!({"data": []});
        assert!(items_from_envelope(&raw).is_empty());
    }

    #[test]
    fn etenders_happy_path() {
        let raw = serde_json::json!({
            "tender_No": "ET-1",
            "title": "Supply of laptops",
            "publishedDate": "2025-09-01T08:00:00Z",
            "closingDate": "2025-10-01T12:00:00Z",
            "supportDocument": ["https://example.com/spec.pdf"],
            "contactPerson": "A Person",
            "email": "a@example.com",
            "telephone": "012 345 6789"
        });

        let item = normalize_one(&raw, &parse_offset("+02:00")).unwrap();
        assert_eq!(item.tender.external_id, "ET-1");
        assert_eq!(item.documents.len(), 1);
        assert_eq!(item.documents[0].mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(item.contacts[0].phone.as_deref(), Some("012 345 6789"));
    }
}
