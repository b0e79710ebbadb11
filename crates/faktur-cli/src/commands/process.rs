//! Process command - extract and convert a single invoice file.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use faktur_core::upload::load_upload;
use faktur_core::{InvoiceRecord, InvoiceStore};

use super::output::{render_one, InvoiceView, OutputFormat};
use super::{build_pipeline, display_name, load_config, open_store};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Company name used to tell outgoing from incoming invoices
    #[arg(long)]
    company: Option<String>,

    /// Save the result as a draft in the invoice store
    #[arg(long)]
    save: bool,

    /// Owner ID for the saved draft (default: from config)
    #[arg(long)]
    owner: Option<String>,

    /// Print fields that still need review to stderr
    #[arg(long)]
    validate: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));

    pb.set_message("Loading upload...");
    let request = load_upload(&args.input, &config.upload).await?;

    let mut pipeline = build_pipeline(&config)?;
    if let Some(company) = &args.company {
        pipeline = pipeline.with_company_name(company.as_str());
    }

    pb.set_message("Extracting invoice fields...");
    let result = pipeline.run(&request).await;
    pb.finish_and_clear();
    let output = result?;

    if args.validate {
        let issues = output.fields.validate();
        if !output.flags.is_empty() || !issues.is_empty() {
            eprintln!("{}", style("Needs review:").yellow());
            for flag in &output.flags {
                eprintln!("  - {}", flag);
            }
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
        }
    }

    let file_name = display_name(&args.input);
    let rendered = if args.save {
        let store = open_store(&config).await?;
        let owner = args.owner.clone().unwrap_or_else(|| config.store.owner.clone());
        let record = store
            .create(InvoiceRecord::draft(owner, file_name.as_str(), output))
            .await?;
        eprintln!("{} Saved draft {}", style("✓").green(), record.id);
        render_one(&InvoiceView::stored(&record), args.format)?
    } else {
        render_one(&InvoiceView::unsaved(&file_name, &output), args.format)?
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &rendered)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", rendered);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
