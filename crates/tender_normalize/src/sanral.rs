use crate::hashable::hash_tender;
use chrono::FixedOffset;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tender_core::types::{NewContact, NewDocument, NewTender, NormalizedItem};
use tender_parsers::{
    clean_htmlish, combine_date_time, extract_emails, extract_textual_date,
    extract_textual_date_time, extract_time_range, extract_urls, guess_venue_from_line,
    squash_whitespace,
};

#[derive(Debug, Deserialize)]
struct SanralRaw {
    #[serde(rename = "referenceNumber")]
    reference_number: Option<String>,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    buyer: Option<String>,
    location: Option<String>,
    #[serde(rename = "queriesTo")]
    queries_to: Option<String>,
    details: Option<SanralDetails>,
}

#[derive(Debug, Deserialize, Default)]
struct SanralDetails {
    #[serde(rename = "rawText")]
    raw_text: Option<String>,
    paragraphs: Option<Vec<String>>,
}

static SA_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"0\d{1,2}[ -]?\d{3}[ -]?\d{4}").unwrap());
static DOCUMENT_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(pdf|zip|docx?|xlsx?)(\?\S*)?$|drive\.google\.com|dropbox\.com|onedrive\.live\.com").unwrap()
});
static CLOSING_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)CLOSING\s*(DATE|TIME)").unwrap());
static BRIEFING_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)BRIEFING").unwrap());
static ISSUE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)ISSUE\s*DATE").unwrap());
static COMPLETION_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)COMPLETION AND DELIVERY").unwrap());
static ADDRESS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)at the offices of|delivered to|address|offices of").unwrap()
});

/// Normalizes a single raw SANRAL record, running the prose parser over its free-text
/// lines to derive dates, venue, submission address, contacts, and documents.
pub fn normalize_one(raw: &Value, offset: &FixedOffset) -> Option<NormalizedItem> {
    let raw: SanralRaw = serde_json::from_value(raw.clone()).ok()?;
    let external_id = raw.reference_number?;

    let details = raw.details.unwrap_or_default();
    let lines: Vec<String> = if let Some(paragraphs) = &details.paragraphs {
        paragraphs.iter().map(|p| clean_htmlish(p)).collect()
    } else {
        details
            .raw_text
            .as_deref()
            .unwrap_or("")
            .lines()
            .map(clean_htmlish)
            .collect()
    };
    let raw_text = lines.join("\n");

    let mut closing_at = None;
    let mut briefing_at = None;
    let mut briefing_venue = None;
    let mut briefing_details: Option<String> = None;
    let mut issue_at = None;

    for line in &lines {
        if CLOSING_LINE.is_match(line) && closing_at.is_none() {
            closing_at = derive_instant(line, offset, RangeEdge::End);
        }
        if BRIEFING_LINE.is_match(line) && briefing_at.is_none() {
            briefing_at = derive_instant(line, offset, RangeEdge::Start);
            briefing_venue = Some(
                guess_venue_from_line(line)
                    .unwrap_or_else(|| line.trim().to_string()),
            );
            if let Some(range) = extract_time_range(line) {
                briefing_details = Some(format!(
                    "Briefing window ends at {}",
                    range.end.format("%H:%M")
                ));
            }
        }
        if ISSUE_LINE.is_match(line) && issue_at.is_none() {
            issue_at = extract_textual_date_time(line, offset);
        }
    }

    let submission_address = extract_submission_address(&lines);

    let mut emails = extract_emails(&raw_text);
    if let Some(queries_to) = &raw.queries_to {
        for email in extract_emails(queries_to) {
            if !emails.iter().any(|e| e.eq_ignore_ascii_case(&email)) {
                emails.push(email);
            }
        }
    }
    let phone = SA_PHONE.find(&raw_text).map(|m| m.as_str().to_string());
    let contacts: Vec<NewContact> = emails
        .into_iter()
        .map(|email| NewContact {
            name: None,
            email: Some(email),
            phone: phone.clone(),
        })
        .collect();

    let documents: Vec<NewDocument> = extract_urls(&raw_text)
        .into_iter()
        .filter(|url| DOCUMENT_URL.is_match(url))
        .map(|url| NewDocument {
            url: Some(url),
            ..Default::default()
        })
        .collect();

    let short_description = raw.description.as_deref().and_then(squash_whitespace);
    let description = if is_truncated(short_description.as_deref()) {
        squash_whitespace(&raw_text).or(short_description)
    } else {
        short_description
    };

    let mut tender = NewTender {
        external_id: external_id.clone(),
        title: raw.title.as_deref().and_then(squash_whitespace).unwrap_or_default(),
        description,
        category: raw.category.as_deref().and_then(squash_whitespace),
        buyer: raw.buyer.as_deref().and_then(squash_whitespace),
        location: raw.location.as_deref().and_then(squash_whitespace),
        published_at: issue_at,
        briefing_at,
        closing_at,
        briefing_venue,
        briefing_details,
        tender_box_address: submission_address,
        queries_to: raw.queries_to,
        ..Default::default()
    };

    tender.hash = hash_tender(&tender);

    Some(NormalizedItem {
        tender,
        documents,
        contacts,
    })
}

#[derive(Clone, Copy)]
enum RangeEdge {
    Start,
    End,
}

fn derive_instant(
    line: &str,
    offset: &FixedOffset,
    edge: RangeEdge,
) -> Option<chrono::DateTime<chrono::Utc>> {
    if let Some(range) = extract_time_range(line) {
        let date = extract_textual_date(line)?;
        let time = match edge {
            RangeEdge::Start => range.start,
            RangeEdge::End => range.end,
        };
        combine_date_time(date, time, offset)
    } else {
        extract_textual_date_time(line, offset)
    }
}

/// Starting from the "completion and delivery" line, the first of the next 10 lines
/// matching the address regex, plus up to 5 following lines, joined by `", "`.
fn extract_submission_address(lines: &[String]) -> Option<String> {
    let start = lines.iter().position(|l| COMPLETION_LINE.is_match(l))?;
    let window_end = (start + 11).min(lines.len());
    let address_line = (start + 1..window_end).find(|&i| ADDRESS_LINE.is_match(&lines[i]))?;

    let take_end = (address_line + 6).min(lines.len());
    let joined = lines[address_line..take_end]
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    squash_whitespace(&joined)
}

/// A short description is "truncated" when it ends with an ellipsis, contains a
/// dangling `&n` entity fragment, or is shorter than 80 characters.
fn is_truncated(short: Option<&str>) -> bool {
    match short {
        None => true,
        Some(s) => s.ends_with('\u{2026}') || s.contains("&n") || s.len() < 80,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tender_parsers::parse_offset;

    #[test]
    fn sanral_prose_extraction() {
        let raw = serde_json::json!({
            "referenceNumber": "SANRAL-001",
            "title": "Routine road maintenance",
            "description": "short",
            "queriesTo": "",
            "details": {
                "rawText": "CLOSING DATE: 20 August 2025 12:00\nBRIEFING SESSION: 14 August 2025 13:00-14:00 at Boardroom B, 12 Main Road\nQueries: jane@example.co.za, 011 555 1234"
            }
        });

        let item = normalize_one(&raw, &parse_offset("+02:00")).unwrap();

        assert_eq!(
            item.tender.closing_at.unwrap().to_rfc3339(),
            "2025-08-20T10:00:00+00:00"
        );
        assert_eq!(
            item.tender.briefing_at.unwrap().to_rfc3339(),
            "2025-08-14T11:00:00+00:00"
        );
        assert!(item
            .tender
            .briefing_venue
            .as_deref()
            .unwrap()
            .contains("Boardroom B"));
        assert!(item
            .tender
            .briefing_details
            .as_deref()
            .unwrap()
            .contains("Briefing window ends at 14:00"));

        assert_eq!(item.contacts.len(), 1);
        assert_eq!(item.contacts[0].email.as_deref(), Some("jane@example.co.za"));
        assert_eq!(item.contacts[0].phone.as_deref(), Some("011 555 1234"));
    }

    #[test]
    fn sanral_skips_without_external_id() {
        let raw = serde_json::json!({"title": "no reference"});
        assert!(normalize_one(&raw, &parse_offset("+02:00")).is_none());
    }
}
