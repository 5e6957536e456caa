use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}").unwrap()
});
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s<>\x22']+").unwrap());
static VENUE_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)boardroom|building|house|hall|room|centre|center|street|road|offices? of").unwrap()
});
static AT_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|\s)at ([\S].{4,})").unwrap());

/// Collapses runs of whitespace to a single space and trims the ends. An
/// all-whitespace (or empty) input becomes `None` per the "empty string -> null" rule.
pub fn squash_whitespace(s: &str) -> Option<String> {
    let squashed = WHITESPACE.replace_all(s, " ").trim().to_string();
    if squashed.is_empty() {
        None
    } else {
        Some(squashed)
    }
}

/// Decodes the handful of HTML entities and non-breaking spaces that survive into
/// scraped prose (`&nbsp; &amp; &lt; &gt;` and the literal NBSP character).
pub fn clean_htmlish(s: &str) -> String {
    s.replace('\u{a0}', " ")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

/// De-duplicated, order-preserving set of email addresses found in `s`. Matches
/// case-insensitively so uppercased addresses are still found.
pub fn extract_emails(s: &str) -> Vec<String> {
    dedup_preserve_order(EMAIL.find_iter(s).map(|m| m.as_str().to_string()))
}

/// De-duplicated, order-preserving set of `http(s)://` URLs found in `s`.
pub fn extract_urls(s: &str) -> Vec<String> {
    dedup_preserve_order(URL.find_iter(s).map(|m| m.as_str().to_string()))
}

fn dedup_preserve_order(iter: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in iter {
        let key = item.to_lowercase();
        if seen.insert(key) {
            out.push(item);
        }
    }
    out
}

/// Guesses a briefing venue from one line of prose: the line verbatim if it mentions
/// a recognizable venue noun, otherwise whatever follows a lowercase `"at "` prefix
/// of length >= 5, otherwise `None`.
pub fn guess_venue_from_line(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if VENUE_HINT.is_match(trimmed) {
        return Some(trimmed.to_string());
    }
    AT_PREFIX
        .captures(trimmed)
        .map(|caps| caps[1].trim().to_string())
        .filter(|candidate| candidate.len() >= 5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squash_collapses_and_trims() {
        assert_eq!(
            squash_whitespace("  scope   text  "),
            Some("scope text".to_string())
        );
    }

    #[test]
    fn squash_empty_becomes_none() {
        assert_eq!(squash_whitespace("   \n\t "), None);
    }

    #[test]
    fn clean_htmlish_decodes_entities() {
        assert_eq!(clean_htmlish("Terms &amp; Conditions&nbsp;apply"), "Terms & Conditions apply");
    }

    #[test]
    fn emails_dedup_case_insensitively() {
        let found = extract_emails("Contact jane@example.co.za or JANE@EXAMPLE.CO.ZA");
        assert_eq!(found, vec!["jane@example.co.za".to_string()]);
    }

    #[test]
    fn urls_are_extracted() {
        let found = extract_urls("See https://example.com/a and https://example.com/b.pdf");
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn venue_line_with_keyword() {
        let venue = guess_venue_from_line("Briefing at Boardroom B, 12 Main Road");
        assert!(venue.unwrap().contains("Boardroom B"));
    }

    #[test]
    fn venue_line_from_at_prefix() {
        let venue = guess_venue_from_line("Session happens at Ground Floor Annex");
        assert_eq!(venue, Some("Ground Floor Annex".to_string()));
    }

    #[test]
    fn venue_line_none_when_no_hint() {
        assert_eq!(guess_venue_from_line("no venue information here"), None);
    }
}
