//! Invoices command - review, correct and finalize stored records.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;
use uuid::Uuid;

use faktur_core::{InvoiceStore, RecordStatus};

use super::output::{render_many, render_one, InvoiceView, OutputFormat};
use super::{build_pipeline, load_config, open_store};

/// Arguments for the invoices command.
#[derive(Args)]
pub struct InvoicesArgs {
    /// Owner ID (default: from config)
    #[arg(long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: InvoicesCommand,
}

#[derive(Subcommand)]
enum InvoicesCommand {
    /// List stored invoices, newest first
    List(ListArgs),

    /// Show one invoice
    Show {
        id: Uuid,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Correct fields of a draft
    Edit {
        id: Uuid,

        /// Field assignment such as `totalAmount=1.250,00`; an empty value clears the field
        #[arg(long = "set", value_name = "KEY=VALUE", required = true, value_parser = parse_assignment)]
        assignments: Vec<(String, Option<String>)>,
    },

    /// Mark a draft final
    Finalize { id: Uuid },

    /// Delete an invoice
    Delete { id: Uuid },

    /// Delete every draft
    Cleanup,
}

#[derive(Args)]
struct ListArgs {
    /// Only list drafts
    #[arg(long)]
    drafts: bool,

    /// Only list invoices whose number or party names contain this text
    #[arg(short, long)]
    search: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn parse_assignment(raw: &str) -> Result<(String, Option<String>), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in {raw:?}"));
    }
    let value = Some(value).filter(|v| !v.trim().is_empty());
    Ok((key.to_string(), value.map(str::to_string)))
}

pub async fn run(args: InvoicesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config).await?;
    let owner = args.owner.unwrap_or_else(|| config.store.owner.clone());

    match args.command {
        InvoicesCommand::List(list) => {
            let mut records = match &list.search {
                Some(query) => store.search(&owner, query).await?,
                None => store.find_by_owner(&owner).await?,
            };
            if list.drafts {
                records.retain(|r| r.status == RecordStatus::Draft);
            }

            if records.is_empty() && matches!(list.format, OutputFormat::Text) {
                eprintln!("{} No invoices found", style("ℹ").blue());
                return Ok(());
            }

            let views: Vec<_> = records.iter().map(InvoiceView::stored).collect();
            let rendered = render_many(&views, list.format)?;
            match &list.output {
                Some(path) => {
                    fs::write(path, rendered)?;
                    eprintln!(
                        "{} Wrote {} invoices to {}",
                        style("✓").green(),
                        records.len(),
                        path.display()
                    );
                }
                None => println!("{}", rendered),
            }
        }

        InvoicesCommand::Show { id, format } => {
            let record = store.get(&owner, id).await?;
            println!("{}", render_one(&InvoiceView::stored(&record), format)?);
        }

        InvoicesCommand::Edit { id, assignments } => {
            let record = store.get(&owner, id).await?;
            if record.is_final() {
                anyhow::bail!("Invoice {} is finalized and can no longer be edited", id);
            }

            let pipeline = build_pipeline(&config)?;
            let mut fields = record.fields;
            let mut flags = record.flags;
            pipeline.edit(&mut fields, &mut flags, &assignments).await?;

            let updated = store.update(&owner, id, fields, flags).await?;
            eprintln!("{} Updated {}", style("✓").green(), id);
            println!("{}", render_one(&InvoiceView::stored(&updated), OutputFormat::Text)?);
        }

        InvoicesCommand::Finalize { id } => {
            let record = store.get(&owner, id).await?;
            let issues = record.fields.validate();
            if !issues.is_empty() || !record.flags.is_empty() {
                eprintln!("{}", style("Finalizing with open review items:").yellow());
                for flag in &record.flags {
                    eprintln!("  - {}", flag);
                }
                for issue in &issues {
                    eprintln!("  - {}", issue);
                }
            }
            store.finalize(&owner, id).await?;
            eprintln!("{} Finalized {}", style("✓").green(), id);
        }

        InvoicesCommand::Delete { id } => {
            store.delete(&owner, id).await?;
            eprintln!("{} Deleted {}", style("✓").green(), id);
        }

        InvoicesCommand::Cleanup => {
            let removed = store.delete_drafts(&owner).await?;
            eprintln!("{} Removed {} drafts", style("✓").green(), removed);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("totalAmount=1.250,00"),
            Ok(("totalAmount".to_string(), Some("1.250,00".to_string())))
        );
        assert_eq!(
            parse_assignment("dueDate="),
            Ok(("dueDate".to_string(), None))
        );
        assert_eq!(
            parse_assignment("sellerName=A=B"),
            Ok(("sellerName".to_string(), Some("A=B".to_string())))
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }
}
