//! PDF form field cataloguing and BEM-style naming using lopdf
//!
//! This crate provides:
//! - AcroForm widget reading with inherited field attributes
//! - Field classification from `/FT` and `/Ff` bit flags
//! - Radio group reconstruction, including synthesized group containers
//! - Naming context from text printed around each field
//! - BEM name generation, validation and old-to-new mapping export
//!
//! Stages run in order over one in-memory [`FieldCatalogue`]:
//! reader, classifier, hierarchy, context, naming, validator, export.

pub mod classifier;
pub mod context;
pub mod csv;
pub mod export;
pub mod field;
pub mod hierarchy;
pub mod naming;
pub mod reader;
pub mod text;
pub mod tools;
pub mod validator;
pub mod vocabulary;

pub use classifier::{classify, decode_flags};
pub use context::{extract_context, ContextOptions};
pub use export::{
    catalogue_csv, export_mapping, CatalogueOptions, ExportFormat, ExportOptions, MappingDocument,
    MappingTable,
};
pub use field::{ContextBlock, Field, FieldCatalogue, FieldId, FieldType};
pub use hierarchy::build_hierarchy;
pub use naming::{generate_names, GeneratedName, NamingOptions, NamingStrategy};
pub use reader::{FormSource, PdfForm, RawAnnotation, RawWidget};
pub use text::Rect;
pub use validator::{validate_names, ValidationOptions, ValidationReport};
pub use vocabulary::NamingVocabulary;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options for every stage of the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub context: ContextOptions,
    pub naming: NamingOptions,
    pub validation: ValidationOptions,
    pub export: ExportOptions,
}

/// Everything produced for one form
#[derive(Debug, Clone)]
pub struct FormProcessResult {
    /// Fields with labels, context and suggested names
    pub catalogue: FieldCatalogue,
    pub generated: Vec<GeneratedName>,
    pub validation: ValidationReport,
    pub mapping: MappingDocument,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Read, classify, group and annotate every field of a form
pub fn extract_catalogue<S: FormSource + ?Sized>(
    source: &S,
    options: &ContextOptions,
    vocab: &NamingVocabulary,
) -> Result<FieldCatalogue, FormError> {
    let widgets = source.read_form_fields()?;
    log::info!("Classifying {} widgets", widgets.len());

    let fields = classifier::classify_all(&widgets);
    let mut fields = hierarchy::build_hierarchy(fields);
    context::enrich_fields(&mut fields, source, options, vocab);

    Ok(FieldCatalogue {
        fields,
        page_count: source.page_count(),
    })
}

/// Run every stage over an already opened form
pub fn run_pipeline<S: FormSource + ?Sized>(
    source: &S,
    options: &PipelineOptions,
    vocab: &NamingVocabulary,
) -> Result<FormProcessResult, FormError> {
    let start = std::time::Instant::now();

    let mut catalogue = extract_catalogue(source, &options.context, vocab)?;
    let generated = generate_names(&mut catalogue.fields, &options.naming, vocab);
    let validation = validate_names(&generated, &options.validation, vocab);
    let mapping = export_mapping(&validation.field_validations, &options.export);

    Ok(FormProcessResult {
        catalogue,
        generated,
        validation,
        mapping,
        processing_time_ms: start.elapsed().as_millis() as u64,
    })
}

/// Process a PDF form file
pub fn process_form<P: AsRef<Path>>(
    path: P,
    options: &PipelineOptions,
    vocab: &NamingVocabulary,
) -> Result<FormProcessResult, FormError> {
    let form = PdfForm::load(path)?;
    run_pipeline(&form, options, vocab)
}

/// Process a PDF form from a memory buffer
pub fn process_form_mem(
    buffer: &[u8],
    options: &PipelineOptions,
    vocab: &NamingVocabulary,
) -> Result<FormProcessResult, FormError> {
    let form = PdfForm::load_mem(buffer)?;
    run_pipeline(&form, options, vocab)
}

/// Process many forms in parallel; one failure does not stop the others
pub fn process_forms_batch<P: AsRef<Path> + Sync>(
    paths: &[P],
    options: &PipelineOptions,
    vocab: &NamingVocabulary,
) -> Vec<(PathBuf, Result<FormProcessResult, FormError>)> {
    paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            let result = process_form(path, options, vocab);
            if let Err(e) = &result {
                log::warn!("Failed to process {}: {}", path.display(), e);
            }
            (path.to_path_buf(), result)
        })
        .collect()
}

/// Error categories reported to hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorType {
    FileNotFoundError,
    InvalidInputError,
    PdfReadError,
    ExtractionError,
    UnsupportedFormatError,
    SerializationError,
}

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("PDF is encrypted")]
    Encrypted,
    #[error("Failed to extract field '{name}': {reason}")]
    Extraction { name: String, reason: String },
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FormError {
    pub fn error_type(&self) -> ErrorType {
        match self {
            FormError::FileNotFound(_) => ErrorType::FileNotFoundError,
            FormError::InvalidInput(_) => ErrorType::InvalidInputError,
            FormError::Io(_) | FormError::Parse(_) | FormError::Encrypted => ErrorType::PdfReadError,
            FormError::Extraction { .. } => ErrorType::ExtractionError,
            FormError::UnsupportedFormat(_) => ErrorType::UnsupportedFormatError,
            FormError::Serialization(_) => ErrorType::SerializationError,
        }
    }
}

impl From<lopdf::Error> for FormError {
    fn from(e: lopdf::Error) -> Self {
        FormError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        assert_eq!(
            FormError::FileNotFound(PathBuf::from("x.pdf")).error_type(),
            ErrorType::FileNotFoundError
        );
        assert_eq!(FormError::Encrypted.error_type(), ErrorType::PdfReadError);
        assert_eq!(
            FormError::UnsupportedFormat("xml".into()).error_type(),
            ErrorType::UnsupportedFormatError
        );
        let json = serde_json::to_value(ErrorType::InvalidInputError).unwrap();
        assert_eq!(json, "InvalidInputError");
    }

    #[test]
    fn test_process_form_missing_file() {
        let result = process_form(
            "/nonexistent/form.pdf",
            &PipelineOptions::default(),
            &NamingVocabulary::default(),
        );
        assert!(matches!(result, Err(FormError::FileNotFound(_))));
    }
}
