//! Failing-resource reference extraction.
//!
//! Scans diagnostic text for identifiers of resources implicated in a
//! failure, so the executor can target them for replacement or state
//! surgery.

use regex::Regex;

/// Line markers indicating a resource is implicated in a failure.
const FAILURE_MARKERS: &[&str] = &["not found", "does not exist", "notfound", "deleting failed"];

/// Extract failing-resource references from diagnostic text.
///
/// Matching lines are scanned for structured, colon-delimited `urn:` tokens;
/// if none appear anywhere, a looser pattern pairs a bare resource name with
/// an adjacent `**deleting failed**` marker. Results keep first-seen order,
/// deduplicated.
pub fn extract_failing_resources(text: &str) -> Vec<String> {
    let urn_token = Regex::new(r"urn:\S+").expect("static pattern");
    let mut refs: Vec<String> = Vec::new();

    for line in text.lines() {
        let lower = line.to_lowercase();
        if !FAILURE_MARKERS.iter().any(|marker| lower.contains(marker)) {
            continue;
        }
        for token in urn_token.find_iter(line) {
            let trimmed = token.as_str().trim_end_matches([':', ',', '.']);
            // Only hierarchical references qualify; a bare "urn:" fragment
            // inside prose does not.
            if trimmed.contains("::") && !refs.iter().any(|r| r == trimmed) {
                refs.push(trimmed.to_string());
            }
        }
    }

    if refs.is_empty() {
        let loose = Regex::new(r"([A-Za-z0-9_-]+)\s+\*\*deleting failed\*\*")
            .expect("static pattern");
        for line in text.lines() {
            for captures in loose.captures_iter(line) {
                let name = captures[1].to_string();
                if !refs.contains(&name) {
                    refs.push(name);
                }
            }
        }
    }

    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_structured_reference() {
        let text = "error: resource urn:prov:proj::env::kind::my-bucket not found";
        let refs = extract_failing_resources(text);

        assert_eq!(refs, vec!["urn:prov:proj::env::kind::my-bucket"]);
    }

    #[test]
    fn test_trims_trailing_punctuation() {
        let text = "deleting failed for urn:prov:proj::env::kind::db:, giving up";
        let refs = extract_failing_resources(text);

        assert_eq!(refs, vec!["urn:prov:proj::env::kind::db"]);
    }

    #[test]
    fn test_ignores_lines_without_markers() {
        let text = "created urn:prov:proj::env::kind::ok successfully";
        assert!(extract_failing_resources(text).is_empty());
    }

    #[test]
    fn test_first_seen_order_and_dedup() {
        let text = "urn:prov:p::e::k::b does not exist\n\
                    urn:prov:p::e::k::a notFound while reading\n\
                    urn:prov:p::e::k::b does not exist";
        let refs = extract_failing_resources(text);

        assert_eq!(refs, vec!["urn:prov:p::e::k::b", "urn:prov:p::e::k::a"]);
    }

    #[test]
    fn test_loose_fallback_on_deleting_failed() {
        let text = "  my-bucket **deleting failed** resource removed out-of-band";
        let refs = extract_failing_resources(text);

        assert_eq!(refs, vec!["my-bucket"]);
    }

    #[test]
    fn test_structured_wins_over_loose() {
        let text = "urn:prov:p::e::k::b not found\nother-res **deleting failed**";
        let refs = extract_failing_resources(text);

        // Loose fallback only engages when no structured token exists at all.
        assert_eq!(refs, vec!["urn:prov:p::e::k::b"]);
    }

    #[test]
    fn test_case_insensitive_markers() {
        let text = "Resource urn:p:x::y::z::w NotFound";
        assert_eq!(extract_failing_resources(text).len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(extract_failing_resources("").is_empty());
    }
}
