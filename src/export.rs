//! Mapping export
//!
//! Turns a validation report into the old-name to new-name mapping consumed by
//! the PDF rewriter, either as a structured JSON document or as a flat table
//! with the same records in the same order. Also writes the fixed-column field
//! catalogue CSV.

use crate::csv::{parse_records, write_record};
use crate::field::{Field, FieldId, FieldType};
use crate::validator::{FieldValidation, Issue};
use crate::FormError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const FORMAT_VERSION: &str = "1.0";
pub const TOOL_NAME: &str = "pdf-form-namer";

/// Headers of the flat mapping table
pub const MAPPING_COLUMNS: [&str; 7] = [
    "field_id",
    "original_name",
    "new_name",
    "field_type",
    "validation_status",
    "confidence_score",
    "requires_review",
];

/// Column order of the field catalogue CSV
pub const CATALOGUE_COLUMNS: [&str; 27] = [
    "ID",
    "Created at",
    "Updated at",
    "Label",
    "Description",
    "Form ID",
    "Order",
    "Api name",
    "UUID",
    "Type",
    "Parent ID",
    "Delete Parent ID",
    "Acrofieldlabel",
    "Section ID",
    "Excluded",
    "Partial label",
    "Custom",
    "Show group label",
    "Height",
    "Page",
    "Width",
    "X",
    "Y",
    "Unified field ID",
    "Delete",
    "Hidden",
    "Toggle description",
];

/// First section id handed out in a catalogue
pub const FIRST_SECTION_ID: u32 = 8261;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(FormError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub include_metadata: bool,
    pub include_backup_plan: bool,
    /// 0 exports everything; above 0 only valid names at or above this mapping confidence
    pub validation_threshold: f64,
    /// Fixed timestamp for reproducible output, current time when `None`
    pub timestamp: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            include_metadata: true,
            include_backup_plan: true,
            validation_threshold: 0.0,
            timestamp: None,
        }
    }
}

impl ExportOptions {
    fn timestamp(&self) -> String {
        self.timestamp.clone().unwrap_or_else(now_timestamp)
    }
}

pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Approved,
    NeedsReview,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Approved => "approved",
            ValidationStatus::NeedsReview => "needs_review",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssues {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub suggestions: Vec<Issue>,
}

/// One rename instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub field_id: FieldId,
    pub original_name: String,
    pub new_name: String,
    pub field_type: FieldType,
    pub validation_status: ValidationStatus,
    pub confidence: f64,
    pub requires_manual_review: bool,
    #[serde(default)]
    pub validation_issues: ValidationIssues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfMetadata {
    pub extraction_timestamp: String,
    pub field_count: usize,
    pub modification_tool: String,
    pub modification_version: String,
}

/// How the rewriter should protect the original file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationPlan {
    pub backup_required: bool,
    pub backup_suffix: String,
    pub modification_type: String,
    pub estimated_changes: usize,
    pub rollback_supported: bool,
    pub verification_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub total_fields: usize,
    pub exported_fields: usize,
    pub filtered_fields: usize,
    pub ready_for_modification: usize,
    pub requires_review: usize,
    pub backup_recommended: bool,
}

/// The exported mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingDocument {
    pub format_version: String,
    pub field_mappings: Vec<FieldMapping>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pdf_metadata: Option<PdfMetadata>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub modification_plan: Option<ModificationPlan>,
    pub export_summary: ExportSummary,
}

/// Flat rendering of a [`MappingDocument`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl MappingTable {
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        write_record(&mut out, &self.headers);
        for row in &self.rows {
            write_record(&mut out, row);
        }
        out
    }

    pub fn from_csv(text: &str) -> Result<Self, FormError> {
        let mut records = parse_records(text).into_iter();
        let headers = records
            .next()
            .ok_or_else(|| FormError::InvalidInput("CSV has no header row".into()))?;
        if headers != MAPPING_COLUMNS {
            return Err(FormError::InvalidInput(format!(
                "unexpected mapping columns: {}",
                headers.join(",")
            )));
        }
        Ok(Self {
            headers,
            rows: records.collect(),
        })
    }

    /// `(original_name, new_name)` per row
    pub fn name_pairs(&self) -> Vec<(String, String)> {
        self.rows
            .iter()
            .filter(|row| row.len() >= 3)
            .map(|row| (row[1].clone(), row[2].clone()))
            .collect()
    }
}

impl MappingDocument {
    pub fn to_table(&self) -> MappingTable {
        let rows = self
            .field_mappings
            .iter()
            .map(|m| {
                vec![
                    m.field_id.to_string(),
                    m.original_name.clone(),
                    m.new_name.clone(),
                    m.field_type.to_string(),
                    m.validation_status.as_str().to_string(),
                    m.confidence.to_string(),
                    m.requires_manual_review.to_string(),
                ]
            })
            .collect();

        MappingTable {
            headers: MAPPING_COLUMNS.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    /// Serialize in the requested format
    pub fn render(&self, format: ExportFormat) -> Result<String, FormError> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Csv => Ok(self.to_table().to_csv()),
        }
    }

    pub fn name_pairs(&self) -> Vec<(String, String)> {
        self.field_mappings
            .iter()
            .map(|m| (m.original_name.clone(), m.new_name.clone()))
            .collect()
    }
}

/// Mapping confidence from validation outcome, in `[0, 1]`
pub fn mapping_confidence(validation: &FieldValidation) -> f64 {
    let mut confidence = 0.8;
    confidence -= validation.errors.len() as f64 * 0.3;
    confidence -= validation.warnings.len() as f64 * 0.1;
    if validation.is_valid {
        confidence += 0.1;
    }
    confidence.clamp(0.0, 1.0)
}

fn field_mapping(validation: &FieldValidation) -> FieldMapping {
    let original_name = if validation.original_name.is_empty() {
        format!("original_{}", validation.field_id)
    } else {
        validation.original_name.clone()
    };

    FieldMapping {
        field_id: validation.field_id,
        original_name,
        new_name: validation.suggested_name.clone(),
        field_type: validation.field_type,
        validation_status: if validation.is_valid {
            ValidationStatus::Approved
        } else {
            ValidationStatus::NeedsReview
        },
        confidence: mapping_confidence(validation),
        requires_manual_review: !validation.is_valid,
        validation_issues: ValidationIssues {
            errors: validation.errors.clone(),
            warnings: validation.warnings.clone(),
            suggestions: validation.suggestions.clone(),
        },
    }
}

/// Build the mapping document from per-field validation results
pub fn export_mapping(validations: &[FieldValidation], options: &ExportOptions) -> MappingDocument {
    let threshold = options.validation_threshold;
    let exported: Vec<&FieldValidation> = validations
        .iter()
        .filter(|v| threshold <= 0.0 || (v.is_valid && mapping_confidence(v) >= threshold))
        .collect();

    let field_mappings: Vec<FieldMapping> = exported.iter().map(|v| field_mapping(v)).collect();
    let ready = field_mappings.iter().filter(|m| !m.requires_manual_review).count();

    let pdf_metadata = options.include_metadata.then(|| PdfMetadata {
        extraction_timestamp: options.timestamp(),
        field_count: field_mappings.len(),
        modification_tool: TOOL_NAME.to_string(),
        modification_version: env!("CARGO_PKG_VERSION").to_string(),
    });

    let modification_plan = options.include_backup_plan.then(|| ModificationPlan {
        backup_required: true,
        backup_suffix: "_backup".to_string(),
        modification_type: "acrofield_rename".to_string(),
        estimated_changes: field_mappings.len(),
        rollback_supported: true,
        verification_required: true,
    });

    let total = validations.len();
    let export_summary = ExportSummary {
        total_fields: total,
        exported_fields: field_mappings.len(),
        filtered_fields: total - field_mappings.len(),
        ready_for_modification: ready,
        requires_review: field_mappings.len() - ready,
        backup_recommended: options.include_backup_plan,
    };

    log::info!(
        "Exported {} of {} mappings ({} filtered)",
        export_summary.exported_fields,
        total,
        export_summary.filtered_fields
    );

    MappingDocument {
        format_version: FORMAT_VERSION.to_string(),
        field_mappings,
        pdf_metadata,
        modification_plan,
        export_summary,
    }
}

/// Settings for the field catalogue CSV
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogueOptions {
    pub form_id: Option<String>,
    /// Value of `Created at` / `Updated at`, current time when `None`
    pub timestamp: Option<String>,
}

/// Section id per `bem_category`, numbered in first-seen order
pub fn section_ids(fields: &[Field]) -> Vec<(String, u32)> {
    let mut ids: Vec<(String, u32)> = Vec::new();
    for field in fields {
        if !ids.iter().any(|(category, _)| *category == field.bem_category) {
            let next = FIRST_SECTION_ID + ids.len() as u32;
            ids.push((field.bem_category.clone(), next));
        }
    }
    ids
}

fn format_number(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Field catalogue in the fixed 27-column layout
pub fn catalogue_csv(fields: &[Field], options: &CatalogueOptions) -> String {
    let timestamp = options.timestamp.clone().unwrap_or_else(now_timestamp);
    let form_id = options.form_id.clone().unwrap_or_default();
    let sections = section_ids(fields);

    let mut out = String::new();
    write_record(&mut out, &CATALOGUE_COLUMNS);

    for (order, field) in fields.iter().enumerate() {
        let section_id = sections
            .iter()
            .find(|(category, _)| *category == field.bem_category)
            .map(|(_, id)| id.to_string())
            .unwrap_or_default();

        let row = [
            field.id.to_string(),
            timestamp.clone(),
            timestamp.clone(),
            field.label.clone(),
            String::new(),
            form_id.clone(),
            (order + 1).to_string(),
            field.suggested_name.clone().unwrap_or_else(|| field.name.clone()),
            field.uuid.clone(),
            field.field_type.to_string(),
            field.parent_id.map(|id| id.to_string()).unwrap_or_default(),
            String::new(),
            field.name.clone(),
            section_id,
            "false".to_string(),
            String::new(),
            "false".to_string(),
            field.is_group().to_string(),
            format_number(field.height),
            field.page.to_string(),
            format_number(field.width),
            format_number(field.x),
            format_number(field.y),
            String::new(),
            "false".to_string(),
            "false".to_string(),
            "false".to_string(),
        ];
        write_record(&mut out, &row);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::GeneratedName;
    use crate::validator::{validate_names, ValidationOptions, ValidationReport};
    use crate::vocabulary::NamingVocabulary;

    fn name(id: FieldId, original: &str, suggested: &str, field_type: FieldType) -> GeneratedName {
        GeneratedName {
            field_id: id,
            original_name: original.to_string(),
            suggested_name: suggested.to_string(),
            field_type,
            label: String::new(),
            confidence: 0.8,
            reasoning: String::new(),
            alternatives: Vec::new(),
            parent_id: None,
            parent_name: None,
            bem_category: String::new(),
        }
    }

    fn report() -> ValidationReport {
        validate_names(
            &[
                name(1, "Text1", "personal-information_name", FieldType::TextField),
                name(2, "Text2", "personal-information_name", FieldType::TextField),
                name(3, "Check, Box", "payment-information_method", FieldType::CheckBox),
            ],
            &ValidationOptions::default(),
            &NamingVocabulary::default(),
        )
    }

    fn fixed_options() -> ExportOptions {
        ExportOptions {
            timestamp: Some("2024-01-01T00:00:00Z".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_exports_everything() {
        let doc = export_mapping(&report().field_validations, &fixed_options());
        assert_eq!(doc.field_mappings.len(), 3);
        assert_eq!(doc.field_mappings[1].validation_status, ValidationStatus::NeedsReview);
        assert!(doc.field_mappings[1].requires_manual_review);
        assert_eq!(doc.export_summary.ready_for_modification, 2);
        assert_eq!(doc.export_summary.requires_review, 1);
        assert_eq!(doc.modification_plan.as_ref().unwrap().estimated_changes, 3);
        assert_eq!(doc.pdf_metadata.as_ref().unwrap().extraction_timestamp, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_threshold_filters_invalid() {
        let options = ExportOptions {
            validation_threshold: 0.5,
            include_metadata: false,
            include_backup_plan: false,
            ..fixed_options()
        };
        let doc = export_mapping(&report().field_validations, &options);
        assert_eq!(doc.field_mappings.len(), 2);
        assert_eq!(doc.export_summary.filtered_fields, 1);
        assert!(doc.pdf_metadata.is_none());
        assert!(doc.modification_plan.is_none());

        let json = doc.render(ExportFormat::Json).unwrap();
        assert!(!json.contains("pdf_metadata"));
    }

    #[test]
    fn test_mapping_confidence() {
        let report = report();
        let v = &report.field_validations;
        assert!((mapping_confidence(&v[0]) - 0.9).abs() < 1e-9);
        // One duplicate error: 0.8 - 0.3
        assert!((mapping_confidence(&v[1]) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_json_and_csv_describe_same_records() {
        let doc = export_mapping(&report().field_validations, &fixed_options());

        let json = doc.render(ExportFormat::Json).unwrap();
        let parsed: MappingDocument = serde_json::from_str(&json).unwrap();

        let csv = doc.render(ExportFormat::Csv).unwrap();
        let table = MappingTable::from_csv(&csv).unwrap();

        assert_eq!(parsed.field_mappings.len(), table.rows.len());
        assert_eq!(parsed.name_pairs(), table.name_pairs());
        assert_eq!(table.name_pairs()[2].0, "Check, Box");
    }

    #[test]
    fn test_unsupported_format() {
        assert!(matches!("xml".parse::<ExportFormat>(), Err(FormError::UnsupportedFormat(_))));
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
    }

    #[test]
    fn test_catalogue_csv_layout() {
        let mut a = Field::new(1, "owner_name", FieldType::TextField).with_rect(1, [100.0, 700.0, 300.0, 720.5]);
        a.bem_category = "personal-information".into();
        a.label = "Name".into();
        a.suggested_name = Some("personal-information_name".into());
        let mut b = Field::new(2, "dividend--group", FieldType::RadioGroup);
        b.bem_category = "general-information".into();
        let mut c = Field::new(3, "owner_ssn", FieldType::TextField);
        c.bem_category = "personal-information".into();
        c.parent_id = Some(2);

        let csv = catalogue_csv(
            &[a, b, c],
            &CatalogueOptions {
                form_id: Some("42".into()),
                timestamp: Some("2024-01-01T00:00:00Z".into()),
            },
        );
        let records = parse_records(&csv);

        assert_eq!(records[0], CATALOGUE_COLUMNS);
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.len() == 27));
        assert!(csv.ends_with("\r\n"));

        let first = &records[1];
        assert_eq!(first[0], "1");
        assert_eq!(first[5], "42");
        assert_eq!(first[6], "1");
        assert_eq!(first[7], "personal-information_name");
        assert_eq!(first[12], "owner_name");
        assert_eq!(first[13], "8261");
        assert_eq!(first[18], "20.50");
        assert_eq!(first[20], "200");

        assert_eq!(records[2][13], "8262");
        assert_eq!(records[2][17], "true");
        assert_eq!(records[2][7], "dividend--group");
        assert_eq!(records[3][13], "8261");
        assert_eq!(records[3][10], "2");
    }
}
