//! CLI tool for cataloguing and renaming PDF form fields

use clap::{Args, Parser, Subcommand};
use pdf_form_namer::{
    catalogue_csv, extract_catalogue, process_form, process_forms_batch, CatalogueOptions,
    ContextOptions, ExportFormat, FormError, FormProcessResult, NamingStrategy, NamingVocabulary,
    PdfForm, PipelineOptions,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "form-namer")]
#[command(author, version, about = "Catalogue PDF form fields and suggest BEM names", long_about = None)]
struct Cli {
    /// Log per-field detail
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// JSON file replacing the built-in naming vocabulary
    #[arg(long, global = true)]
    vocabulary: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the field catalogue of a PDF
    Extract {
        pdf: PathBuf,

        /// Write the catalogue JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the 27-column catalogue CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Form ID written to the catalogue CSV
        #[arg(long)]
        form_id: Option<String>,

        /// Distance around each field searched for context text
        #[arg(long, default_value_t = 50.0)]
        radius: f32,
    },

    /// Run the full pipeline and write the name mapping
    Run {
        pdf: PathBuf,

        /// Write the mapping here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Run the pipeline over many PDFs in parallel
    Batch {
        #[arg(required = true)]
        pdfs: Vec<PathBuf>,

        /// Directory receiving one mapping file per PDF
        #[arg(short, long)]
        out_dir: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Print page count and field type distribution
    Info { pdf: PathBuf },
}

#[derive(Args)]
struct PipelineArgs {
    /// Output format: json or csv
    #[arg(short, long, default_value = "json")]
    format: ExportFormat,

    /// Naming strategy: context_aware or pattern_based
    #[arg(long, default_value = "context_aware")]
    strategy: NamingStrategy,

    /// Confidence at which a name counts as ready for review
    #[arg(long, default_value_t = 0.7)]
    confidence_threshold: f64,

    /// Only export valid names at or above this mapping confidence
    #[arg(long, default_value_t = 0.0)]
    validation_threshold: f64,

    /// Also flag short abbreviations
    #[arg(long)]
    strict: bool,
}

impl PipelineArgs {
    fn options(&self) -> PipelineOptions {
        let mut options = PipelineOptions::default();
        options.naming.strategy = self.strategy;
        options.naming.confidence_threshold = self.confidence_threshold;
        options.validation.strict_mode = self.strict;
        options.export.format = self.format;
        options.export.validation_threshold = self.validation_threshold;
        options
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else if quiet {
        builder.filter_level(log::LevelFilter::Error);
    }
    builder.init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let vocab = match &cli.vocabulary {
        Some(path) => NamingVocabulary::from_json_file(path)?,
        None => NamingVocabulary::default(),
    };

    match cli.command {
        Commands::Extract {
            pdf,
            output,
            csv,
            form_id,
            radius,
        } => {
            let form = PdfForm::load(&pdf)?;
            let options = ContextOptions {
                radius,
                ..ContextOptions::default()
            };
            let catalogue = extract_catalogue(&form, &options, &vocab)?;
            write_output(output.as_deref(), &serde_json::to_string_pretty(&catalogue)?)?;

            if let Some(csv_path) = csv {
                let options = CatalogueOptions {
                    form_id,
                    timestamp: None,
                };
                fs::write(&csv_path, catalogue_csv(&catalogue.fields, &options))?;
                log::info!("Catalogue CSV written to {}", csv_path.display());
            }
        }
        Commands::Run {
            pdf,
            output,
            pipeline,
        } => {
            let options = pipeline.options();
            let result = process_form(&pdf, &options, &vocab)?;
            log::info!(
                "{} fields, {} valid names, {}ms",
                result.catalogue.fields.len(),
                result.validation.validation_summary.valid_names,
                result.processing_time_ms
            );
            write_output(output.as_deref(), &result.mapping.render(options.export.format)?)?;
        }
        Commands::Batch {
            pdfs,
            out_dir,
            pipeline,
        } => {
            let options = pipeline.options();
            fs::create_dir_all(&out_dir)?;

            let mut used = HashSet::new();
            let entries: Vec<Value> = process_forms_batch(&pdfs, &options, &vocab)
                .into_iter()
                .map(|(path, result)| {
                    batch_entry(&path, result, &out_dir, options.export.format, &mut used)
                })
                .collect();
            let failed = entries.iter().filter(|e| e["success"] == false).count();

            let summary = json!({
                "total": pdfs.len(),
                "succeeded": pdfs.len() - failed,
                "failed": failed,
                "results": entries,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Info { pdf } => {
            let form = PdfForm::load(&pdf)?;
            let catalogue = extract_catalogue(&form, &ContextOptions::default(), &vocab)?;

            println!("PDF Form Information");
            println!("====================");
            println!("File: {}", pdf.display());
            println!("Pages: {}", catalogue.page_count);
            println!("Fields: {}", catalogue.fields.len());
            println!("Radio groups: {}", catalogue.radio_groups().count());
            println!();
            println!("Field types:");
            for (field_type, count) in catalogue.type_distribution() {
                println!("  {:<12} {}", field_type, count);
            }
        }
    }

    Ok(())
}

/// Write one batch result and describe it for the summary
///
/// Failures are recorded in the entry so the rest of the batch still runs.
fn batch_entry(
    pdf: &Path,
    result: Result<FormProcessResult, FormError>,
    out_dir: &Path,
    format: ExportFormat,
    used: &mut HashSet<PathBuf>,
) -> Value {
    let result = match result {
        Ok(result) => result,
        Err(e) => return failure_entry(pdf, &e),
    };

    let target = mapping_path(out_dir, pdf, format, used);
    let written = result
        .mapping
        .render(format)
        .and_then(|content| fs::write(&target, content).map_err(FormError::from));
    if let Err(e) = written {
        log::warn!("Could not write mapping for {}: {}", pdf.display(), e);
        return failure_entry(pdf, &e);
    }

    json!({
        "pdf": pdf.display().to_string(),
        "success": true,
        "output": target.display().to_string(),
        "field_count": result.catalogue.fields.len(),
        "valid_names": result.validation.validation_summary.valid_names,
        "processing_time_ms": result.processing_time_ms,
    })
}

fn failure_entry(pdf: &Path, e: &FormError) -> Value {
    json!({
        "pdf": pdf.display().to_string(),
        "success": false,
        "error": e.to_string(),
        "error_type": e.error_type(),
    })
}

/// `{stem}_mapping.{ext}`, numbered when another PDF in the batch shares the stem
fn mapping_path(
    out_dir: &Path,
    pdf: &Path,
    format: ExportFormat,
    used: &mut HashSet<PathBuf>,
) -> PathBuf {
    let stem = pdf
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "form".to_string());

    let mut target = out_dir.join(format!("{}_mapping.{}", stem, format.as_str()));
    let mut n = 2;
    while !used.insert(target.clone()) {
        target = out_dir.join(format!("{}-{}_mapping.{}", stem, n, format.as_str()));
        n += 1;
    }
    target
}

fn write_output(path: Option<&Path>, content: &str) -> std::io::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, content)?;
            log::info!("Output written to {}", path.display());
            Ok(())
        }
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}
