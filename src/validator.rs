//! Name validation
//!
//! Checks generated names against the BEM grammar, the catalogue (duplicates,
//! parent links) and a few conventions. Problems are returned as data; a name
//! is valid iff it collected no errors. Validation is a pure function of its
//! input: the duplicate tracker lives only for one call.

use crate::field::{FieldId, FieldType, GROUP_SUFFIX};
use crate::naming::GeneratedName;
use crate::vocabulary::NamingVocabulary;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

static BEM_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9-]*(_[a-z][a-z0-9-]*)?(__[a-z][a-z0-9-]*)?(--group)?$").unwrap()
});

static INVALID_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_-]").unwrap());

const MAX_NAME_LEN: usize = 100;
const MIN_NAME_LEN: usize = 3;
const STRICT_CONFIDENCE: f64 = 0.8;

/// Which checks run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    pub check_duplicates: bool,
    pub check_bem_compliance: bool,
    pub check_reserved_names: bool,
    pub strict_mode: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            check_duplicates: true,
            check_bem_compliance: true,
            check_reserved_names: true,
            strict_mode: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
    Info,
}

/// Machine-readable issue tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    EmptyName,
    InvalidBemSyntax,
    InvalidCharacters,
    MissingRadiogroupSuffix,
    UnnecessaryGroupSuffix,
    MissingBlockElementSeparator,
    NameTooLong,
    NameTooShort,
    DuplicateName,
    ReservedName,
    LowConfidence,
    GenericName,
    ShortAbbreviations,
    TypeNameMismatch,
    DateFieldTypeMismatch,
    DanglingParent,
    UnresolvedParent,
    OrphanedBlock,
    RadiogroupWithoutButtons,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub message: String,
    pub suggestion: String,
}

impl Issue {
    fn new(kind: IssueKind, message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

/// Catalogue-wide finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalIssue {
    pub severity: Severity,
    #[serde(flatten)]
    pub issue: Issue,
}

/// Diagnostics for one generated name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    pub field_id: FieldId,
    pub suggested_name: String,
    #[serde(default)]
    pub original_name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub confidence: f64,
    pub is_valid: bool,
    #[serde(default)]
    pub errors: Vec<Issue>,
    #[serde(default)]
    pub warnings: Vec<Issue>,
    #[serde(default)]
    pub suggestions: Vec<Issue>,
}

impl FieldValidation {
    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.errors
            .iter()
            .chain(&self.warnings)
            .chain(&self.suggestions)
            .any(|i| i.kind == kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub valid_names: usize,
    pub warnings: usize,
    pub errors: usize,
    pub suggestions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetadata {
    pub total_names: usize,
    pub validation_rules: ValidationOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub validation_metadata: ValidationMetadata,
    pub validation_summary: ValidationSummary,
    pub field_validations: Vec<FieldValidation>,
    pub global_issues: Vec<GlobalIssue>,
    pub recommendations: Vec<String>,
}

impl ValidationReport {
    pub fn is_all_valid(&self) -> bool {
        self.field_validations.iter().all(|v| v.is_valid)
    }
}

pub struct NameValidator<'a> {
    vocab: &'a NamingVocabulary,
    options: &'a ValidationOptions,
}

impl<'a> NameValidator<'a> {
    pub fn new(vocab: &'a NamingVocabulary, options: &'a ValidationOptions) -> Self {
        Self { vocab, options }
    }

    /// Validate a catalogue of generated names
    ///
    /// Entries are processed in ascending `field_id` order (stable), so for a
    /// duplicated name the lowest id is accepted and later ids are flagged.
    pub fn validate(&self, names: &[GeneratedName]) -> ValidationReport {
        let mut ordered: Vec<&GeneratedName> = names.iter().collect();
        ordered.sort_by_key(|n| n.field_id);

        let types: HashMap<FieldId, FieldType> =
            names.iter().map(|n| (n.field_id, n.field_type)).collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut summary = ValidationSummary::default();
        let mut field_validations = Vec::with_capacity(names.len());

        for entry in ordered {
            let validation = self.validate_entry(entry, &seen, &types);

            if validation.is_valid {
                summary.valid_names += 1;
            }
            summary.errors += validation.errors.len();
            summary.warnings += validation.warnings.len();
            summary.suggestions += validation.suggestions.len();

            if !entry.suggested_name.is_empty() {
                seen.insert(entry.suggested_name.as_str());
            }
            field_validations.push(validation);
        }

        let global_issues = global_issues(names);
        let recommendations = recommendations(&summary, names.len(), global_issues.len());

        log::info!(
            "Validated {} names: {} valid, {} errors, {} warnings",
            names.len(),
            summary.valid_names,
            summary.errors,
            summary.warnings
        );

        ValidationReport {
            validation_metadata: ValidationMetadata {
                total_names: names.len(),
                validation_rules: self.options.clone(),
            },
            validation_summary: summary,
            field_validations,
            global_issues,
            recommendations,
        }
    }

    fn validate_entry(
        &self,
        entry: &GeneratedName,
        seen: &HashSet<&str>,
        types: &HashMap<FieldId, FieldType>,
    ) -> FieldValidation {
        let name = entry.suggested_name.as_str();
        let type_lower = entry.field_type.as_str().to_lowercase();

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut suggestions = Vec::new();

        if name.trim().is_empty() {
            errors.push(Issue::new(
                IssueKind::EmptyName,
                "Field name cannot be empty",
                format!("Use pattern: {}-field", type_lower),
            ));
        }

        if self.options.check_bem_compliance && !name.is_empty() {
            check_bem(name, entry.field_type, &mut errors, &mut warnings);
        }

        if self.options.check_duplicates && seen.contains(name) {
            errors.push(Issue::new(
                IssueKind::DuplicateName,
                format!("Duplicate name '{}' found", name),
                format!("{}_alt", name),
            ));
        }

        if self.options.check_reserved_names && self.vocab.is_reserved(name) {
            warnings.push(Issue::new(
                IssueKind::ReservedName,
                format!("'{}' is a reserved name", name),
                format!("custom_{}", name),
            ));
        }

        if self.options.strict_mode {
            self.check_strict(name, entry.confidence, &mut warnings, &mut suggestions);
        }

        check_type_consistency(name, entry.field_type, &mut warnings);
        check_parent(entry, types, &mut errors, &mut warnings);

        FieldValidation {
            field_id: entry.field_id,
            suggested_name: entry.suggested_name.clone(),
            original_name: entry.original_name.clone(),
            field_type: entry.field_type,
            confidence: entry.confidence,
            is_valid: errors.is_empty(),
            errors,
            warnings,
            suggestions,
        }
    }

    fn check_strict(
        &self,
        name: &str,
        confidence: f64,
        warnings: &mut Vec<Issue>,
        suggestions: &mut Vec<Issue>,
    ) {
        if confidence < STRICT_CONFIDENCE {
            warnings.push(Issue::new(
                IssueKind::LowConfidence,
                format!("Low confidence ({:.2}) for generated name", confidence),
                "Consider manual review",
            ));
        }

        if self.vocab.contains_generic_token(name) {
            warnings.push(Issue::new(
                IssueKind::GenericName,
                "Name appears to be generic",
                "Use more specific descriptive name",
            ));
        }

        // Empty segments come from the "__" separator and are not abbreviations
        if name.split('_').any(|part| !part.is_empty() && part.len() <= 2) {
            suggestions.push(Issue::new(
                IssueKind::ShortAbbreviations,
                "Consider spelling out abbreviations for clarity",
                "Use full words where possible",
            ));
        }
    }
}

fn check_bem(name: &str, field_type: FieldType, errors: &mut Vec<Issue>, warnings: &mut Vec<Issue>) {
    if !BEM_PATTERN.is_match(name) {
        errors.push(Issue::new(
            IssueKind::InvalidBemSyntax,
            format!("'{}' does not follow BEM convention", name),
            "Use format: block_element or block_element__modifier",
        ));
        if INVALID_CHARS.is_match(name) {
            errors.push(Issue::new(
                IssueKind::InvalidCharacters,
                "Name contains invalid characters",
                "Use only lowercase letters, numbers, hyphens, and underscores",
            ));
        }
        return;
    }

    if field_type == FieldType::RadioGroup {
        if !name.ends_with(GROUP_SUFFIX) {
            errors.push(Issue::new(
                IssueKind::MissingRadiogroupSuffix,
                "RadioGroup fields must end with --group",
                format!("{}{}", name, GROUP_SUFFIX),
            ));
        }
    } else if name.ends_with(GROUP_SUFFIX) {
        warnings.push(Issue::new(
            IssueKind::UnnecessaryGroupSuffix,
            "Only RadioGroup fields should have --group suffix",
            name.replace(GROUP_SUFFIX, ""),
        ));
    }

    if !name.contains('_') && !name.ends_with(GROUP_SUFFIX) {
        warnings.push(Issue::new(
            IssueKind::MissingBlockElementSeparator,
            "BEM names should have block_element structure",
            format!("general_{}", name),
        ));
    }

    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        let truncated: String = name.chars().take(MAX_NAME_LEN - 3).collect();
        warnings.push(Issue::new(
            IssueKind::NameTooLong,
            format!("Name is {} characters (limit: {})", len, MAX_NAME_LEN),
            format!("{}...", truncated),
        ));
    } else if len < MIN_NAME_LEN {
        warnings.push(Issue::new(
            IssueKind::NameTooShort,
            "Name is very short and may not be descriptive",
            format!("descriptive_{}", name),
        ));
    }
}

fn check_type_consistency(name: &str, field_type: FieldType, warnings: &mut Vec<Issue>) {
    let lowered = name.to_lowercase();

    if field_type == FieldType::Signature && !lowered.contains("signature") {
        warnings.push(Issue::new(
            IssueKind::TypeNameMismatch,
            "Signature field should contain 'signature' in name",
            format!("{}_signature", name),
        ));
    }

    if lowered.contains("date") && !matches!(field_type, FieldType::TextField | FieldType::Signature) {
        warnings.push(Issue::new(
            IssueKind::DateFieldTypeMismatch,
            "Date fields are typically TextField or Signature types",
            "Verify field type is correct",
        ));
    }
}

/// Radio buttons must point at a radio group; other parents must exist
fn check_parent(
    entry: &GeneratedName,
    types: &HashMap<FieldId, FieldType>,
    errors: &mut Vec<Issue>,
    warnings: &mut Vec<Issue>,
) {
    match entry.parent_id {
        Some(parent_id) => {
            let target = types.get(&parent_id);
            let ok = match entry.field_type {
                FieldType::RadioButton => target == Some(&FieldType::RadioGroup),
                _ => target.is_some(),
            };
            if !ok {
                errors.push(Issue::new(
                    IssueKind::DanglingParent,
                    format!("Parent field {} does not exist or is not a valid parent", parent_id),
                    "Re-run hierarchy building or clear the parent reference",
                ));
            }
        }
        None => {
            if let Some(parent_name) = entry.parent_name.as_deref() {
                warnings.push(Issue::new(
                    IssueKind::UnresolvedParent,
                    format!("Parent '{}' was not found in the catalogue", parent_name),
                    "Verify the field belongs to a group",
                ));
            }
        }
    }
}

fn global_issues(names: &[GeneratedName]) -> Vec<GlobalIssue> {
    let mut issues = Vec::new();

    let mut blocks: Vec<(&str, usize)> = Vec::new();
    for name in names {
        let Some((block, _)) = name.suggested_name.split_once('_') else {
            continue;
        };
        match blocks.iter_mut().find(|(b, _)| *b == block) {
            Some((_, count)) => *count += 1,
            None => blocks.push((block, 1)),
        }
    }
    for (block, _) in blocks.iter().filter(|(_, count)| *count == 1) {
        issues.push(GlobalIssue {
            severity: Severity::Info,
            issue: Issue::new(
                IssueKind::OrphanedBlock,
                format!("Block '{}' has only one field", block),
                "Consider grouping related fields or using different block",
            ),
        });
    }

    let has_groups = names.iter().any(|n| n.field_type == FieldType::RadioGroup);
    let has_buttons = names.iter().any(|n| n.field_type == FieldType::RadioButton);
    if has_groups && !has_buttons {
        issues.push(GlobalIssue {
            severity: Severity::Warning,
            issue: Issue::new(
                IssueKind::RadiogroupWithoutButtons,
                "Found RadioGroups but no RadioButtons",
                "Verify RadioButton extraction and naming",
            ),
        });
    }

    issues
}

fn recommendations(summary: &ValidationSummary, total: usize, global_count: usize) -> Vec<String> {
    let mut recs = Vec::new();

    let valid_pct = if total > 0 {
        summary.valid_names as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    if valid_pct >= 90.0 {
        recs.push("Excellent: Most field names are valid and ready for use".to_string());
    } else if valid_pct >= 70.0 {
        recs.push("Good: Some field names need minor adjustments".to_string());
    } else {
        recs.push("Needs Work: Many field names require review and correction".to_string());
    }

    if summary.errors > 0 {
        recs.push(format!("Fix {} critical errors before proceeding", summary.errors));
    }
    if summary.warnings > 5 {
        recs.push("Consider addressing warnings for better naming consistency".to_string());
    }
    if global_count > 0 {
        recs.push("Review global issues for overall naming strategy".to_string());
    }

    recs
}

/// Validate with the given options and vocabulary
pub fn validate_names(
    names: &[GeneratedName],
    options: &ValidationOptions,
    vocab: &NamingVocabulary,
) -> ValidationReport {
    NameValidator::new(vocab, options).validate(names)
}
