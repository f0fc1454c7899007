//! Keyword tables driving naming, labelling and validation
//!
//! Every table is ordered: rules are evaluated top to bottom and the first
//! match wins, so precedence is part of the data. The defaults target
//! financial-services forms; other domains load their own tables from JSON.

use crate::FormError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One ordered `(keywords, result)` rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keywords: Vec<String>,
    pub result: String,
    /// Require every keyword instead of any one
    #[serde(default)]
    pub match_all: bool,
}

impl KeywordRule {
    pub fn any(keywords: &[&str], result: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            result: result.to_string(),
            match_all: false,
        }
    }

    pub fn all(keywords: &[&str], result: &str) -> Self {
        Self {
            match_all: true,
            ..Self::any(keywords, result)
        }
    }

    /// Substring match against already-lowercased text
    pub fn matches(&self, haystack: &str) -> bool {
        if self.match_all {
            self.keywords.iter().all(|k| haystack.contains(k.as_str()))
        } else {
            self.keywords.iter().any(|k| haystack.contains(k.as_str()))
        }
    }
}

/// First matching rule's result
pub fn first_match<'a>(rules: &'a [KeywordRule], text: &str) -> Option<&'a str> {
    let lowered = text.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| rule.result.as_str())
}

/// All heuristic tables used by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingVocabulary {
    /// Block names recognised as an existing name prefix
    pub blocks: Vec<String>,
    /// Block inference from context and label text
    pub block_rules: Vec<KeywordRule>,
    pub default_block: String,
    /// Element inference from label text
    pub element_rules: Vec<KeywordRule>,
    pub modifier_rules: Vec<KeywordRule>,
    pub reserved_names: Vec<String>,
    /// Tokens that make a name "generic" under strict validation
    pub generic_tokens: Vec<String>,
    /// Tokens that lower naming confidence
    pub placeholder_tokens: Vec<String>,
    /// Display labels for radio groups, keyed by group stem
    pub group_labels: BTreeMap<String, String>,
}

impl Default for NamingVocabulary {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let mut group_labels = BTreeMap::new();
        group_labels.insert("dividend".to_string(), "Future Dividend Application".to_string());
        group_labels.insert("address-change".to_string(), "Address Change Options".to_string());

        Self {
            // "benficiary" matches the spelling used in existing form catalogues
            blocks: strings(&[
                "personal-information",
                "contingent-benficiary",
                "sign-here",
                "payment-information",
                "employer-information",
            ]),
            block_rules: vec![
                KeywordRule::any(&["personal", "name", "address", "ssn"], "personal-information"),
                KeywordRule::any(&["beneficiary", "contingent"], "contingent-benficiary"),
                KeywordRule::any(&["signature", "sign", "date"], "sign-here"),
                KeywordRule::any(&["payment", "amount", "method"], "payment-information"),
                KeywordRule::any(&["employer", "company"], "employer-information"),
            ],
            default_block: "general-information".to_string(),
            element_rules: vec![
                KeywordRule::all(&["first", "name"], "first-name"),
                KeywordRule::all(&["last", "name"], "last-name"),
                KeywordRule::any(&["name"], "name"),
                KeywordRule::any(&["address"], "address"),
                KeywordRule::any(&["city"], "city"),
                KeywordRule::any(&["state"], "state"),
                KeywordRule::any(&["zip"], "zip"),
                KeywordRule::any(&["phone"], "phone"),
                KeywordRule::any(&["email"], "email"),
                KeywordRule::any(&["ssn", "social"], "ssn"),
                KeywordRule::any(&["signature"], "signature"),
                KeywordRule::any(&["date"], "date"),
            ],
            modifier_rules: vec![
                KeywordRule::any(&["monthly"], "monthly"),
                KeywordRule::any(&["quarterly"], "quarterly"),
                KeywordRule::any(&["annually", "annual"], "annually"),
                KeywordRule::any(&["primary"], "primary"),
                KeywordRule::any(&["secondary"], "secondary"),
                KeywordRule::any(&["joint"], "joint"),
            ],
            reserved_names: strings(&[
                "id", "name", "value", "type", "class", "style", "onclick", "onchange", "onload",
                "submit", "reset", "button", "input",
            ]),
            generic_tokens: strings(&["field", "input", "control", "element"]),
            placeholder_tokens: strings(&["field", "unknown"]),
            group_labels,
        }
    }
}

impl NamingVocabulary {
    /// Parse a vocabulary from JSON; missing tables fall back to the defaults
    pub fn from_json_str(json: &str) -> Result<Self, FormError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, FormError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FormError::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn is_known_block(&self, candidate: &str) -> bool {
        self.blocks.iter().any(|b| b == candidate)
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.reserved_names.iter().any(|r| *r == lowered)
    }

    pub fn infer_block(&self, text: &str) -> &str {
        first_match(&self.block_rules, text).unwrap_or(&self.default_block)
    }

    pub fn infer_element(&self, text: &str) -> Option<&str> {
        first_match(&self.element_rules, text)
    }

    pub fn infer_modifier(&self, text: &str) -> Option<&str> {
        first_match(&self.modifier_rules, text)
    }

    pub fn contains_generic_token(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.generic_tokens.iter().any(|t| lowered.contains(t.as_str()))
    }

    pub fn contains_placeholder_token(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.placeholder_tokens.iter().any(|t| lowered.contains(t.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order_decides_precedence() {
        let vocab = NamingVocabulary::default();
        // "name" appears in both personal and first-name rules; order picks
        assert_eq!(vocab.infer_element("First Name"), Some("first-name"));
        assert_eq!(vocab.infer_element("Owner Name"), Some("name"));
        assert_eq!(vocab.infer_element("Social Security"), Some("ssn"));
        assert_eq!(vocab.infer_element("Amount"), None);
    }

    #[test]
    fn test_infer_block_defaults() {
        let vocab = NamingVocabulary::default();
        assert_eq!(vocab.infer_block("Contingent Beneficiary"), "contingent-benficiary");
        assert_eq!(vocab.infer_block("Sign here"), "sign-here");
        assert_eq!(vocab.infer_block("Miscellaneous"), "general-information");
    }

    #[test]
    fn test_modifiers() {
        let vocab = NamingVocabulary::default();
        assert_eq!(vocab.infer_modifier("paid ANNUAL premium"), Some("annually"));
        assert_eq!(vocab.infer_modifier("monthly or quarterly"), Some("monthly"));
        assert_eq!(vocab.infer_modifier("owner"), None);
    }

    #[test]
    fn test_reserved_names_case_insensitive() {
        let vocab = NamingVocabulary::default();
        assert!(vocab.is_reserved("Submit"));
        assert!(!vocab.is_reserved("submit_button"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let vocab = NamingVocabulary::from_json_str(
            r#"{"blocks": ["claims"], "default_block": "misc"}"#,
        )
        .unwrap();
        assert!(vocab.is_known_block("claims"));
        assert!(!vocab.is_known_block("sign-here"));
        assert_eq!(vocab.infer_block("nothing here"), "misc");
        assert_eq!(vocab.reserved_names.len(), 13);
    }

    #[test]
    fn test_invalid_json_is_serialization_error() {
        let err = NamingVocabulary::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, FormError::Serialization(_)));
    }
}
