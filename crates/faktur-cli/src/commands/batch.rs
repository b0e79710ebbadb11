//! Batch processing command for multiple invoice files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use futures_util::stream::{self, StreamExt};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use faktur_core::upload::{load_upload, IMAGE_EXTENSIONS};
use faktur_core::{InvoicePipeline, InvoiceRecord, InvoiceStore, PipelineOutput};

use super::output::{render_many, render_one, InvoiceView, OutputFormat};
use super::{build_pipeline, display_name, load_config, open_store};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of uploads processed concurrently
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Save every processed invoice as a draft
    #[arg(long)]
    save: bool,

    /// Owner ID for saved drafts (default: from config)
    #[arg(long)]
    owner: Option<String>,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    output: Option<PipelineOutput>,
    error: Option<String>,
    processing_time_ms: u64,
}

fn is_supported(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    ext == "pdf" || IMAGE_EXTENSIONS.contains(&ext.as_str())
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_supported(p))
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let pipeline = build_pipeline(&config)?;
    let store = if args.save {
        Some(open_store(&config).await?)
    } else {
        None
    };
    let owner = args.owner.clone().unwrap_or_else(|| config.store.owner.clone());

    let mut pending = stream::iter(files)
        .map(|path| process_single_file(path, &pipeline, &config))
        .buffer_unordered(args.jobs.max(1));

    let mut results = Vec::new();
    while let Some(result) = pending.next().await {
        if let Some(message) = &result.error {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", result.path.display(), message);
            } else {
                overall_pb.abandon();
                error!("Failed to process {}: {}", result.path.display(), message);
                anyhow::bail!("Processing failed for {}: {}", result.path.display(), message);
            }
        }
        overall_pb.inc(1);
        results.push(result);
    }
    drop(pending);
    overall_pb.finish_with_message("Complete");

    results.sort_by(|a, b| a.path.cmp(&b.path));

    let mut finished = Vec::new();
    for result in &results {
        let Some(output) = &result.output else {
            continue;
        };
        let file_name = display_name(&result.path);
        let record = match &store {
            Some(store) => {
                let record = store
                    .create(InvoiceRecord::draft(owner.as_str(), file_name.as_str(), output.clone()))
                    .await?;
                debug!("Saved {} as draft {}", file_name, record.id);
                Some(record)
            }
            None => None,
        };
        finished.push((result.path.as_path(), output, file_name, record));
    }

    let views: Vec<_> = finished
        .iter()
        .map(|(path, output, file_name, record)| {
            let view = match record {
                Some(record) => InvoiceView::stored(record),
                None => InvoiceView::unsaved(file_name, output),
            };
            (*path, view)
        })
        .collect();

    if let Some(rendered) = emit(&views, args.output_dir.as_deref(), args.format)? {
        println!("{}", rendered);
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let successful = results.iter().filter(|r| r.output.is_some()).count();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    let review = results
        .iter()
        .filter_map(|r| r.output.as_ref())
        .filter(|o| o.needs_review())
        .count();

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful ({} need review), {} failed",
        style(successful).green(),
        style(review).yellow(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for result in &failed {
            eprintln!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

async fn process_single_file(
    path: PathBuf,
    pipeline: &InvoicePipeline,
    config: &faktur_core::models::config::FakturConfig,
) -> ProcessResult {
    let file_start = Instant::now();

    let outcome = match load_upload(&path, &config.upload).await {
        Ok(request) => pipeline.run(&request).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    let processing_time_ms = file_start.elapsed().as_millis() as u64;
    match outcome {
        Ok(output) => ProcessResult {
            path,
            output: Some(output),
            error: None,
            processing_time_ms,
        },
        Err(error) => ProcessResult {
            path,
            output: None,
            error: Some(error),
            processing_time_ms,
        },
    }
}

/// Write one file per invoice into `output_dir`, or render them all together
/// for stdout when there is no directory.
fn emit(
    views: &[(&Path, InvoiceView<'_>)],
    output_dir: Option<&Path>,
    format: OutputFormat,
) -> anyhow::Result<Option<String>> {
    let Some(output_dir) = output_dir else {
        if views.is_empty() {
            return Ok(None);
        }
        let all: Vec<_> = views.iter().map(|(_, view)| view.clone()).collect();
        return Ok(Some(render_many(&all, format)?));
    };

    for (path, view) in views {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "invoice".to_string());
        let output_path = output_dir.join(format!("{}.{}", stem, format.extension()));
        fs::write(&output_path, render_one(view, format)?)?;
        debug!("Wrote output to {}", output_path.display());
    }
    Ok(None)
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "invoice_number",
        "invoice_date",
        "seller_name",
        "invoice_type",
        "total_amount",
        "currency",
        "final_total_amount",
        "flags",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = display_name(&result.path);
        let time = result.processing_time_ms.to_string();

        if let Some(output) = &result.output {
            let f = &output.fields;
            let status = if output.needs_review() { "review" } else { "success" };
            wtr.write_record([
                filename.as_str(),
                status,
                f.invoice_number.as_deref().unwrap_or(""),
                f.invoice_date.as_deref().unwrap_or(""),
                f.seller_name.as_deref().unwrap_or(""),
                f.invoice_type.as_str(),
                f.total_amount.as_deref().unwrap_or(""),
                f.currency_code.as_str(),
                f.final_total_amount.as_deref().unwrap_or(""),
                &output.flags.len().to_string(),
                &time,
                "",
            ])?;
        } else {
            wtr.write_record([
                filename.as_str(),
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                &time,
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
