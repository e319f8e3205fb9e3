//! Session fact extraction: small key/value notes about the user pulled out
//! of what they type ("my name is Ada" → `name = Ada`).
//!
//! Facts only live in memory for one session and are never written to a log.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Fact key → value, ordered by key so rendering is stable.
pub type Facts = BTreeMap<String, String>;

/// A pluggable fact extraction strategy.
pub trait FactExtractor: Send + Sync {
    /// Facts found in one piece of user text. Empty when nothing matched.
    fn extract(&self, text: &str) -> Facts;
}

// --- Compiled regexes ---

static NAME_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\bmy\s+name\s+is\s+([a-zA-Z][a-zA-Z\-']*)").unwrap(),
        Regex::new(r"(?i)\bcall\s+me\s+([a-zA-Z][a-zA-Z\-']*)").unwrap(),
    ]
});

static LOCATION_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i:\bI\s+live\s+in)\s+([A-Z][\w\-']*(?:\s+[A-Z][\w\-']*)*)").unwrap(),
        Regex::new(r"(?i:\bI(?:'m|\s+am)\s+from)\s+([A-Z][\w\-']*(?:\s+[A-Z][\w\-']*)*)").unwrap(),
    ]
});

/// Regex-based extractor for `name` and `location`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexFactExtractor;

impl RegexFactExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FactExtractor for RegexFactExtractor {
    fn extract(&self, text: &str) -> Facts {
        let mut facts = Facts::new();
        if let Some(name) = first_capture(&NAME_RES, text) {
            debug!(name = %name, "Captured user name");
            facts.insert("name".into(), name);
        }
        if let Some(place) = first_capture(&LOCATION_RES, text) {
            debug!(location = %place, "Captured user location");
            facts.insert("location".into(), place);
        }
        facts
    }
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .filter_map(|re| re.captures(text))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().trim_end_matches(['.', ',', '!', '?']).to_string())
        .find(|v| !v.is_empty())
}

/// Text of the auxiliary system turn describing the known facts.
pub fn render_facts(facts: &Facts) -> Option<String> {
    if facts.is_empty() {
        return None;
    }
    let lines: Vec<String> = facts
        .iter()
        .map(|(key, value)| format!("{}: {}", label(key), value))
        .collect();
    Some(format!(
        "Known session facts about the user (use when relevant):\n- {}",
        lines.join("\n- ")
    ))
}

fn label(key: &str) -> &str {
    match key {
        "name" => "User name",
        "location" => "Location",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Facts {
        RegexFactExtractor.extract(text)
    }

    #[test]
    fn captures_name_keeping_case() {
        let facts = extract("Hello, MY NAME IS Ada-Lovelace and I like math");
        assert_eq!(facts.get("name").map(String::as_str), Some("Ada-Lovelace"));
    }

    #[test]
    fn captures_call_me() {
        assert_eq!(extract("please call me Bob.")["name"], "Bob");
    }

    #[test]
    fn captures_location() {
        assert_eq!(extract("I live in New York these days")["location"], "New York");
        assert_eq!(extract("i'm from Lagos")["location"], "Lagos");
    }

    #[test]
    fn nothing_to_extract() {
        assert!(extract("what is the weather like?").is_empty());
        assert!(extract("my name is 42").is_empty());
    }

    #[test]
    fn renders_facts_turn() {
        let mut facts = Facts::new();
        assert_eq!(render_facts(&facts), None);

        facts.insert("name".into(), "Ada".into());
        assert_eq!(
            render_facts(&facts).unwrap(),
            "Known session facts about the user (use when relevant):\n- User name: Ada"
        );

        facts.insert("location".into(), "Paris".into());
        assert_eq!(
            render_facts(&facts).unwrap(),
            "Known session facts about the user (use when relevant):\n- Location: Paris\n- User name: Ada"
        );
    }
}
