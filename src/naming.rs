//! BEM name generation
//!
//! Names are composed as `block_element[__modifier][--group]`:
//!
//! - **block**: a known block already prefixing the name, else inferred from
//!   section header, surrounding text and label
//! - **element**: the second `_` segment of the name, else inferred from the
//!   label, else the slugified name
//! - **modifier**: optional, from name, label and surrounding text
//!
//! The confidence score is a fixed heuristic, not a probability.

use crate::field::{type_distribution, Field, FieldId, FieldType, GROUP_SUFFIX};
use crate::vocabulary::NamingVocabulary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How names are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// Block, element and modifier from name, label and page context
    #[default]
    ContextAware,
    /// Reformat the existing name only
    PatternBased,
}

impl NamingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamingStrategy::ContextAware => "context_aware",
            NamingStrategy::PatternBased => "pattern_based",
        }
    }
}

impl std::str::FromStr for NamingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "context_aware" => Ok(NamingStrategy::ContextAware),
            "pattern_based" => Ok(NamingStrategy::PatternBased),
            other => Err(format!("unknown naming strategy: {}", other)),
        }
    }
}

/// Name generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingOptions {
    pub strategy: NamingStrategy,
    /// Names at or above this confidence count as ready for review
    pub confidence_threshold: f64,
    /// Recorded in generation metadata
    pub use_training_data: bool,
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self {
            strategy: NamingStrategy::ContextAware,
            confidence_threshold: 0.7,
            use_training_data: true,
        }
    }
}

/// Suggested name for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedName {
    pub field_id: FieldId,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub suggested_name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<FieldId>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub bem_category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub total_fields: usize,
    pub generated_count: usize,
    pub high_confidence_count: usize,
    pub confidence_threshold: f64,
    pub naming_strategy: NamingStrategy,
    pub used_training_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub ready_for_review: usize,
    pub needs_manual_review: usize,
    pub field_type_distribution: BTreeMap<String, usize>,
}

/// Lowercase `[a-z][a-z0-9-]*` slug, empty when nothing usable remains
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_start_matches(|c: char| !c.is_ascii_lowercase())
        .trim_end_matches('-')
        .to_string()
}

/// Heuristic confidence in `[0.1, 1.0]`
pub fn calculate_confidence(
    name: &str,
    field_type: FieldType,
    label: &str,
    vocab: &NamingVocabulary,
) -> f64 {
    let mut confidence: f64 = 0.5;

    if name.contains('_') && !name.starts_with('_') {
        confidence += 0.2;
    }
    if field_type == FieldType::RadioGroup && name.ends_with(GROUP_SUFFIX) {
        confidence += 0.2;
    }
    if label.chars().count() > 2 {
        confidence += 0.1;
    }
    if vocab.contains_placeholder_token(name) {
        confidence -= 0.3;
    }

    confidence.clamp(0.1, 1.0)
}

fn reasoning(name: &str, field_type: FieldType, strategy: NamingStrategy) -> String {
    let strategy = strategy.as_str();
    if field_type == FieldType::RadioGroup {
        return format!("Applied RadioGroup pattern with --group suffix using {} strategy", strategy);
    }
    let mut parts = name.split('_');
    if let (Some(block), Some(element)) = (parts.next(), parts.next()) {
        return format!(
            "Applied BEM pattern: block='{}', element='{}' using {} strategy",
            block, element, strategy
        );
    }
    format!("Applied {} strategy for {}", strategy, field_type)
}

/// Up to three fallback spellings
fn alternatives(name: &str, field_type: FieldType) -> Vec<String> {
    let mut alts = Vec::new();
    if name.contains('_') {
        alts.push(name.replace('_', "-"));
        let mut parts = name.split('_');
        if let (Some(block), Some(element)) = (parts.next(), parts.next()) {
            let short: String = block.chars().take(3).collect();
            alts.push(format!("{}_{}", short, element));
        }
    }
    alts.push(format!("custom-{}", field_type.as_str().to_lowercase()));
    alts.truncate(3);
    alts
}

/// Produces [`GeneratedName`]s from annotated fields
pub struct NameGenerator<'a> {
    vocab: &'a NamingVocabulary,
    strategy: NamingStrategy,
}

impl<'a> NameGenerator<'a> {
    pub fn new(vocab: &'a NamingVocabulary, strategy: NamingStrategy) -> Self {
        Self { vocab, strategy }
    }

    pub fn generate_name(&self, field: &Field) -> GeneratedName {
        let suggested = match self.strategy {
            NamingStrategy::ContextAware => self.context_aware_name(field),
            NamingStrategy::PatternBased => pattern_based_name(field),
        };
        let confidence = calculate_confidence(&suggested, field.field_type, &field.label, self.vocab);

        GeneratedName {
            field_id: field.id,
            original_name: field.name.clone(),
            reasoning: reasoning(&suggested, field.field_type, self.strategy),
            alternatives: alternatives(&suggested, field.field_type),
            suggested_name: suggested,
            field_type: field.field_type,
            label: field.label.clone(),
            confidence,
            parent_id: field.parent_id,
            parent_name: field.parent_name.clone(),
            bem_category: field.bem_category.clone(),
        }
    }

    fn context_aware_name(&self, field: &Field) -> String {
        let stem = field.stem();
        let block = self.block(stem, field);
        let element = self.element(stem, &field.label);
        let modifier = self.vocab.infer_modifier(&format!(
            "{} {} {}",
            stem, field.label, field.context.surrounding
        ));

        let mut name = format!("{}_{}", block, element);
        if let Some(modifier) = modifier {
            name.push_str("__");
            name.push_str(modifier);
        }
        if field.is_group() {
            name.push_str(GROUP_SUFFIX);
        }
        name
    }

    fn block(&self, stem: &str, field: &Field) -> String {
        if let Some((prefix, _)) = stem.split_once('_') {
            if self.vocab.is_known_block(prefix) {
                return prefix.to_string();
            }
        }
        let evidence = format!(
            "{} {} {}",
            field.context.section_header, field.context.surrounding, field.label
        );
        self.vocab.infer_block(&evidence).to_string()
    }

    fn element(&self, stem: &str, label: &str) -> String {
        if let Some(segment) = stem.split('_').nth(1) {
            let slug = slugify(segment);
            if !slug.is_empty() {
                return slug;
            }
        }
        if let Some(element) = self.vocab.infer_element(label) {
            return element.to_string();
        }
        let slug = slugify(stem);
        if slug.is_empty() {
            "field".to_string()
        } else {
            slug
        }
    }
}

/// Existing name lowercased with `_` and spaces turned into hyphens
fn pattern_based_name(field: &Field) -> String {
    let stem = field.stem();
    if stem.is_empty() {
        return format!("field-{}", field.field_type.as_str().to_lowercase());
    }
    let mut name = stem.to_lowercase().replace(['_', ' '], "-");
    if field.is_group() {
        name.push_str(GROUP_SUFFIX);
    }
    name
}

/// Generate a name for every field and record it on the field
pub fn generate_names(
    fields: &mut [Field],
    options: &NamingOptions,
    vocab: &NamingVocabulary,
) -> Vec<GeneratedName> {
    let generator = NameGenerator::new(vocab, options.strategy);
    let names: Vec<GeneratedName> = fields
        .iter_mut()
        .map(|field| {
            let generated = generator.generate_name(field);
            field.suggested_name = Some(generated.suggested_name.clone());
            field.confidence = Some(generated.confidence);
            field.reasoning = Some(generated.reasoning.clone());
            generated
        })
        .collect();

    log::info!(
        "Generated {} names using {} strategy",
        names.len(),
        options.strategy.as_str()
    );
    names
}

/// Counts reported alongside generated names
pub fn summarize_generation(
    names: &[GeneratedName],
    total_fields: usize,
    options: &NamingOptions,
) -> (GenerationMetadata, GenerationSummary) {
    let high_confidence_count = names
        .iter()
        .filter(|n| n.confidence >= options.confidence_threshold)
        .count();

    let metadata = GenerationMetadata {
        total_fields,
        generated_count: names.len(),
        high_confidence_count,
        confidence_threshold: options.confidence_threshold,
        naming_strategy: options.strategy,
        used_training_data: options.use_training_data,
    };
    let summary = GenerationSummary {
        ready_for_review: high_confidence_count,
        needs_manual_review: names.len() - high_confidence_count,
        field_type_distribution: type_distribution(names.iter().map(|n| n.field_type)),
    };
    (metadata, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(id: FieldId, name: &str, field_type: FieldType, label: &str) -> Field {
        let mut field = Field::new(id, name, field_type);
        field.label = label.to_string();
        field
    }

    fn context_aware(field: &Field) -> GeneratedName {
        let vocab = NamingVocabulary::default();
        NameGenerator::new(&vocab, NamingStrategy::ContextAware).generate_name(field)
    }

    #[test]
    fn test_known_block_prefix_is_kept() {
        let name = context_aware(&labeled(1, "personal-information_first", FieldType::TextField, "First"));
        assert_eq!(name.suggested_name, "personal-information_first");
        assert_eq!(
            name.reasoning,
            "Applied BEM pattern: block='personal-information', element='first' using context_aware strategy"
        );
    }

    #[test]
    fn test_block_and_element_from_context() {
        let mut field = labeled(1, "Text1", FieldType::TextField, "First Name");
        field.context.surrounding = "Owner information".into();
        let name = context_aware(&field);
        assert_eq!(name.suggested_name, "personal-information_first-name");
        assert!((name.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_radio_group_gets_suffix() {
        let field = labeled(5, "dividend--group", FieldType::RadioGroup, "Future Dividend Application");
        let name = context_aware(&field);
        assert_eq!(name.suggested_name, "general-information_dividend--group");
        assert!((name.confidence - 1.0).abs() < 1e-9);
        assert_eq!(
            name.reasoning,
            "Applied RadioGroup pattern with --group suffix using context_aware strategy"
        );
    }

    #[test]
    fn test_modifier_precedes_group_suffix() {
        let mut field = labeled(5, "frequency--group", FieldType::RadioGroup, "Frequency");
        field.context.surrounding = "Paid annually or monthly".into();
        let name = context_aware(&field);
        assert_eq!(name.suggested_name, "general-information_frequency__monthly--group");
    }

    #[test]
    fn test_nested_name_uses_second_segment() {
        let field = labeled(4, "address-change_owner__name", FieldType::TextField, "Name");
        let name = context_aware(&field);
        assert_eq!(name.suggested_name, "personal-information_owner");
        assert_eq!(name.parent_id, None);
    }

    #[test]
    fn test_non_group_never_gets_suffix() {
        let field = labeled(1, "stop_direct", FieldType::RadioButton, "Direct");
        let name = context_aware(&field);
        assert!(!name.suggested_name.ends_with(GROUP_SUFFIX));
    }

    #[test]
    fn test_pattern_based() {
        let vocab = NamingVocabulary::default();
        let generator = NameGenerator::new(&vocab, NamingStrategy::PatternBased);

        let plain = generator.generate_name(&labeled(1, "Owner_Full Name", FieldType::TextField, ""));
        assert_eq!(plain.suggested_name, "owner-full-name");
        assert_eq!(plain.reasoning, "Applied pattern_based strategy for TextField");

        let empty = generator.generate_name(&labeled(2, "", FieldType::CheckBox, ""));
        assert_eq!(empty.suggested_name, "field-checkbox");

        let group = generator.generate_name(&labeled(3, "stop--group", FieldType::RadioGroup, ""));
        assert_eq!(group.suggested_name, "stop--group");
    }

    #[test]
    fn test_confidence_formula() {
        let vocab = NamingVocabulary::default();
        let c = |name: &str, t: FieldType, label: &str| calculate_confidence(name, t, label, &vocab);

        assert!((c("a_b", FieldType::TextField, "Label") - 0.8).abs() < 1e-9);
        assert!((c("ab", FieldType::TextField, "") - 0.5).abs() < 1e-9);
        assert!((c("general-information_field", FieldType::TextField, "") - 0.4).abs() < 1e-9);
        assert!((c("unknown-field", FieldType::TextField, "ab") - 0.2).abs() < 1e-9);
        assert!((c("_x", FieldType::TextField, "") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_always_in_bounds() {
        let vocab = NamingVocabulary::default();
        let names = ["", "field", "a_b--group", "unknown_field--group", "x_y__z", "_"];
        let types = [FieldType::TextField, FieldType::RadioGroup, FieldType::Signature];
        for name in names {
            for t in types {
                for label in ["", "ab", "A longer label"] {
                    let c = calculate_confidence(name, t, label, &vocab);
                    assert!((0.1..=1.0).contains(&c), "{} {:?} {} -> {}", name, t, label, c);
                }
            }
        }
    }

    #[test]
    fn test_alternatives() {
        assert_eq!(
            alternatives("personal-information_first-name", FieldType::TextField),
            vec!["personal-information-first-name", "per_first-name", "custom-textfield"]
        );
        assert_eq!(alternatives("owner", FieldType::CheckBox), vec!["custom-checkbox"]);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Owner Name"), "owner-name");
        assert_eq!(slugify("a..b"), "a-b");
        assert_eq!(slugify("12abc"), "abc");
        assert_eq!(slugify("--"), "");
        assert_eq!(slugify("City/State:"), "city-state");
    }

    #[test]
    fn test_generate_names_annotates_fields() {
        let vocab = NamingVocabulary::default();
        let mut fields = vec![
            labeled(1, "sign-here_signature", FieldType::Signature, "Signature"),
            labeled(2, "x", FieldType::CheckBox, ""),
        ];
        let names = generate_names(&mut fields, &NamingOptions::default(), &vocab);

        assert_eq!(names.len(), 2);
        assert_eq!(fields[0].suggested_name.as_deref(), Some("sign-here_signature"));
        assert!(fields.iter().all(|f| f.confidence.is_some() && f.reasoning.is_some()));

        let (meta, summary) = summarize_generation(&names, fields.len(), &NamingOptions::default());
        assert_eq!(meta.generated_count, 2);
        assert_eq!(summary.ready_for_review + summary.needs_manual_review, 2);
        assert_eq!(summary.field_type_distribution.get("Signature"), Some(&1));
    }
}
