use clap::Parser;
use log::{info, warn};
use mdforge::{PdfMetadata, PipelineError, PostProcessor};
use std::path::PathBuf;
use std::process::ExitCode;

/// Post-process a rendered PDF: inject metadata and turn form markers into
/// fillable fields.
#[derive(Parser, Debug)]
#[command(name = "mdforge-pdf", version)]
struct Cli {
    /// Rendered PDF to read
    input: PathBuf,

    /// Where to write the processed PDF
    output: PathBuf,

    /// JSON post-processing configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Create AcroForm fields from marker links
    #[arg(long)]
    fillable: bool,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    author: Option<String>,

    #[arg(long)]
    subject: Option<String>,

    /// Comma-separated keywords
    #[arg(long, value_delimiter = ',')]
    keywords: Vec<String>,
}

impl Cli {
    fn metadata_overrides(&self) -> Option<PdfMetadata> {
        if self.title.is_none() && self.author.is_none() && self.subject.is_none() && self.keywords.is_empty() {
            return None;
        }
        Some(PdfMetadata {
            title: self.title.clone(),
            author: self.author.clone(),
            subject: self.subject.clone(),
            keywords: self.keywords.clone(),
            ..Default::default()
        })
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let mut builder = PostProcessor::builder();
    if let Some(config) = &cli.config {
        builder = builder.with_config_file(config)?;
    }
    if cli.fillable {
        builder = builder.fillable(true);
    }
    if let Some(metadata) = cli.metadata_overrides() {
        builder = builder.with_metadata(metadata);
    }
    #[cfg(feature = "system-fonts")]
    {
        builder = builder.with_system_fonts();
    }

    let processor = builder.build()?;
    let processed = processor.process_file(&cli.input, &cli.output)?;

    if let Some(report) = &processed.report {
        for skipped in report.skipped() {
            warn!("Field '{}' was not created", skipped.name());
        }
        info!(
            "{} form fields created from {} markers",
            report.created_count(),
            report.markers_found
        );
    }
    info!("Wrote {}", cli.output.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
