//! Host-facing operations with JSON request/response envelopes
//!
//! Each operation takes the previous stage's response as input and never
//! fails with `Err`: problems come back as `success: false` with an
//! `error` message and an `error_type` tag.

use crate::context::ContextOptions;
use crate::export::{export_mapping as build_mapping, ExportFormat, ExportOptions, MappingDocument};
use crate::field::Field;
use crate::naming::{
    generate_names as build_names, summarize_generation, GeneratedName, GenerationMetadata,
    GenerationSummary, NamingOptions, NamingStrategy,
};
use crate::reader::PdfForm;
use crate::validator::{
    validate_names as check_names, FieldValidation, GlobalIssue, ValidationMetadata,
    ValidationOptions, ValidationSummary,
};
use crate::vocabulary::NamingVocabulary;
use crate::{extract_catalogue, ErrorType, FormError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

pub const TOOL_NAMES: [&str; 4] = [
    "extract_fields",
    "generate_names",
    "validate_names",
    "export_mapping",
];

fn default_true() -> bool {
    true
}

fn default_radius() -> f32 {
    50.0
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_output_format() -> String {
    "json".to_string()
}

/// Outcome fields shared by every response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolStatus {
    /// Absent means the payload never reported success
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,
}

impl ToolStatus {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
            error_type: None,
        }
    }

    fn failed(err: &FormError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            error_type: Some(err.error_type()),
        }
    }

    /// Reject prior-stage output that itself reports a failure
    fn require_success(&self, what: &str) -> Result<(), FormError> {
        if self.success {
            Ok(())
        } else {
            Err(FormError::InvalidInput(format!(
                "{} reports failure: {}",
                what,
                self.error.as_deref().unwrap_or("unknown error")
            )))
        }
    }
}

// ============================================================================
// extract_fields
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractFieldsParams {
    pub pdf_path: String,
    #[serde(default = "default_radius")]
    pub context_radius: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub total_fields: usize,
    pub field_types: BTreeMap<String, usize>,
    pub has_radio_groups: bool,
    pub has_coordinates: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractFieldsResponse {
    #[serde(flatten)]
    pub status: ToolStatus,
    #[serde(default)]
    pub field_count: usize,
    #[serde(default)]
    pub pages_processed: u32,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_summary: Option<ExtractionSummary>,
}

pub fn extract_fields(params: &ExtractFieldsParams, vocab: &NamingVocabulary) -> ExtractFieldsResponse {
    let options = ContextOptions {
        radius: params.context_radius,
        ..ContextOptions::default()
    };

    let catalogue = match PdfForm::load(&params.pdf_path)
        .and_then(|form| extract_catalogue(&form, &options, vocab))
    {
        Ok(catalogue) => catalogue,
        Err(e) => {
            log::warn!("extract_fields failed for {}: {}", params.pdf_path, e);
            return ExtractFieldsResponse {
                status: ToolStatus::failed(&e),
                ..Default::default()
            };
        }
    };

    let summary = ExtractionSummary {
        total_fields: catalogue.fields.len(),
        field_types: catalogue.type_distribution(),
        has_radio_groups: catalogue.radio_groups().next().is_some(),
        has_coordinates: catalogue.fields.iter().any(|f| f.has_coordinates),
    };

    ExtractFieldsResponse {
        status: ToolStatus::ok(),
        field_count: catalogue.fields.len(),
        pages_processed: catalogue.page_count,
        fields: catalogue.fields,
        extraction_summary: Some(summary),
    }
}

// ============================================================================
// generate_names
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateNamesParams {
    pub field_data: ExtractFieldsResponse,
    #[serde(default = "default_true")]
    pub use_training_data: bool,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default)]
    pub strategy: NamingStrategy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateNamesResponse {
    #[serde(flatten)]
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_metadata: Option<GenerationMetadata>,
    #[serde(default)]
    pub generated_names: Vec<GeneratedName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_summary: Option<GenerationSummary>,
}

pub fn generate_names(params: &GenerateNamesParams, vocab: &NamingVocabulary) -> GenerateNamesResponse {
    if let Err(e) = params.field_data.status.require_success("field_data") {
        return GenerateNamesResponse {
            status: ToolStatus::failed(&e),
            ..Default::default()
        };
    }

    let options = NamingOptions {
        strategy: params.strategy,
        confidence_threshold: params.confidence_threshold,
        use_training_data: params.use_training_data,
    };

    let mut fields = params.field_data.fields.clone();
    let names = build_names(&mut fields, &options, vocab);
    let (metadata, summary) = summarize_generation(&names, fields.len(), &options);

    GenerateNamesResponse {
        status: ToolStatus::ok(),
        generation_metadata: Some(metadata),
        generated_names: names,
        generation_summary: Some(summary),
    }
}

// ============================================================================
// validate_names
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateNamesParams {
    pub name_data: GenerateNamesResponse,
    #[serde(default = "default_true")]
    pub check_duplicates: bool,
    #[serde(default = "default_true")]
    pub check_bem_compliance: bool,
    #[serde(default = "default_true")]
    pub check_reserved_names: bool,
    #[serde(default)]
    pub strict_mode: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateNamesResponse {
    #[serde(flatten)]
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_metadata: Option<ValidationMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_summary: Option<ValidationSummary>,
    #[serde(default)]
    pub field_validations: Vec<FieldValidation>,
    #[serde(default)]
    pub global_issues: Vec<GlobalIssue>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

pub fn validate_names(params: &ValidateNamesParams, vocab: &NamingVocabulary) -> ValidateNamesResponse {
    if let Err(e) = params.name_data.status.require_success("name_data") {
        return ValidateNamesResponse {
            status: ToolStatus::failed(&e),
            ..Default::default()
        };
    }

    let options = ValidationOptions {
        check_duplicates: params.check_duplicates,
        check_bem_compliance: params.check_bem_compliance,
        check_reserved_names: params.check_reserved_names,
        strict_mode: params.strict_mode,
    };
    let report = check_names(&params.name_data.generated_names, &options, vocab);

    ValidateNamesResponse {
        status: ToolStatus::ok(),
        validation_metadata: Some(report.validation_metadata),
        validation_summary: Some(report.validation_summary),
        field_validations: report.field_validations,
        global_issues: report.global_issues,
        recommendations: report.recommendations,
    }
}

// ============================================================================
// export_mapping
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMappingParams {
    pub validated_names: ValidateNamesResponse,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default = "default_true")]
    pub include_metadata: bool,
    #[serde(default = "default_true")]
    pub include_backup_plan: bool,
    #[serde(default)]
    pub validation_threshold: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportMappingResponse {
    #[serde(flatten)]
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<ExportFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_data: Option<MappingDocument>,
    /// The mapping serialized in `output_format`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered: Option<String>,
}

pub fn export_mapping(params: &ExportMappingParams) -> ExportMappingResponse {
    let result = params
        .validated_names
        .status
        .require_success("validated_names")
        .and_then(|_| ExportFormat::from_str(&params.output_format))
        .and_then(|format| {
            let options = ExportOptions {
                format,
                include_metadata: params.include_metadata,
                include_backup_plan: params.include_backup_plan,
                validation_threshold: params.validation_threshold,
                timestamp: None,
            };
            let document = build_mapping(&params.validated_names.field_validations, &options);
            let rendered = document.render(format)?;
            Ok((format, document, rendered))
        });

    match result {
        Ok((format, document, rendered)) => ExportMappingResponse {
            status: ToolStatus::ok(),
            output_format: Some(format),
            mapping_data: Some(document),
            rendered: Some(rendered),
        },
        Err(e) => ExportMappingResponse {
            status: ToolStatus::failed(&e),
            ..Default::default()
        },
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Invoke a tool by name with the default vocabulary
pub fn dispatch(name: &str, params: Value) -> Value {
    dispatch_with(name, params, &NamingVocabulary::default())
}

/// Invoke a tool by name; unknown names and malformed params become failure envelopes
pub fn dispatch_with(name: &str, params: Value, vocab: &NamingVocabulary) -> Value {
    log::debug!("Dispatching tool {}", name);
    match name {
        "extract_fields" => call(params, |p: ExtractFieldsParams| extract_fields(&p, vocab)),
        "generate_names" => call(params, |p: GenerateNamesParams| generate_names(&p, vocab)),
        "validate_names" => call(params, |p: ValidateNamesParams| validate_names(&p, vocab)),
        "export_mapping" => call(params, |p: ExportMappingParams| export_mapping(&p)),
        other => failure_value(&FormError::InvalidInput(format!("unknown tool: {}", other))),
    }
}

fn call<P, R, F>(params: Value, run: F) -> Value
where
    P: DeserializeOwned,
    R: Serialize,
    F: FnOnce(P) -> R,
{
    let params: P = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => {
            return failure_value(&FormError::InvalidInput(format!("malformed parameters: {}", e)))
        }
    };
    serde_json::to_value(run(params)).unwrap_or_else(|e| failure_value(&FormError::Serialization(e)))
}

fn failure_value(err: &FormError) -> Value {
    serde_json::json!({
        "success": false,
        "error": err.to_string(),
        "error_type": err.error_type(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use serde_json::json;

    fn field(id: u32, name: &str, field_type: FieldType, label: &str) -> Field {
        let mut f = Field::new(id, name, field_type).with_rect(1, [100.0, 600.0, 200.0, 620.0]);
        f.label = label.to_string();
        f
    }

    fn extracted() -> ExtractFieldsResponse {
        let fields = vec![
            field(1, "owner-information_name", FieldType::TextField, "Owner Name"),
            field(2, "owner-information_phone", FieldType::TextField, "Phone"),
        ];
        ExtractFieldsResponse {
            status: ToolStatus::ok(),
            field_count: fields.len(),
            pages_processed: 1,
            fields,
            extraction_summary: None,
        }
    }

    #[test]
    fn test_missing_pdf_is_file_not_found() {
        let response = dispatch("extract_fields", json!({ "pdf_path": "/nonexistent/form.pdf" }));
        assert_eq!(response["success"], false);
        assert_eq!(response["error_type"], "FileNotFoundError");
    }

    #[test]
    fn test_unknown_tool() {
        let response = dispatch("rename_everything", json!({}));
        assert_eq!(response["success"], false);
        assert_eq!(response["error_type"], "InvalidInputError");
    }

    #[test]
    fn test_malformed_params() {
        let response = dispatch("generate_names", json!({ "confidence_threshold": 0.5 }));
        assert_eq!(response["success"], false);
        assert_eq!(response["error_type"], "InvalidInputError");
    }

    #[test]
    fn test_failed_input_is_rejected() {
        let mut field_data = extracted();
        field_data.status = ToolStatus::failed(&FormError::Encrypted);
        let params = GenerateNamesParams {
            field_data,
            use_training_data: true,
            confidence_threshold: 0.7,
            strategy: NamingStrategy::ContextAware,
        };
        let response = generate_names(&params, &NamingVocabulary::default());
        assert!(!response.status.success);
        assert_eq!(response.status.error_type, Some(ErrorType::InvalidInputError));
        assert!(response.generated_names.is_empty());
    }

    #[test]
    fn test_input_without_success_is_rejected() {
        let mut field_data = serde_json::to_value(extracted()).unwrap();
        field_data.as_object_mut().unwrap().remove("success");

        let response = dispatch("generate_names", json!({ "field_data": field_data }));
        assert_eq!(response["success"], false);
        assert_eq!(response["error_type"], "InvalidInputError");
        assert!(response["error"].as_str().unwrap().contains("field_data"));

        let response = dispatch("validate_names", json!({ "name_data": { "generated_names": [] } }));
        assert_eq!(response["success"], false);
        assert_eq!(response["error_type"], "InvalidInputError");
    }

    #[test]
    fn test_chain_through_dispatch() {
        let generated = dispatch(
            "generate_names",
            json!({ "field_data": serde_json::to_value(extracted()).unwrap() }),
        );
        assert_eq!(generated["success"], true);
        assert_eq!(generated["generated_names"].as_array().unwrap().len(), 2);

        let validated = dispatch("validate_names", json!({ "name_data": generated }));
        assert_eq!(validated["success"], true);
        assert_eq!(validated["field_validations"].as_array().unwrap().len(), 2);

        let exported = dispatch(
            "export_mapping",
            json!({ "validated_names": validated, "output_format": "csv" }),
        );
        assert_eq!(exported["success"], true);
        assert_eq!(exported["output_format"], "csv");
        let rendered = exported["rendered"].as_str().unwrap();
        assert_eq!(rendered.lines().count(), 3);
    }

    #[test]
    fn test_unsupported_format() {
        let params = ExportMappingParams {
            validated_names: ValidateNamesResponse {
                status: ToolStatus::ok(),
                ..Default::default()
            },
            output_format: "xml".to_string(),
            include_metadata: true,
            include_backup_plan: true,
            validation_threshold: 0.0,
        };
        let response = export_mapping(&params);
        assert!(!response.status.success);
        assert_eq!(
            response.status.error_type,
            Some(ErrorType::UnsupportedFormatError)
        );
    }
}
