//! Rendering invoices as JSON, CSV or text.

use serde::Serialize;
use uuid::Uuid;

use faktur_core::models::invoice::{NormalizedInvoiceFields, ReviewFlag};
use faktur_core::{InvoiceRecord, PipelineOutput, RecordStatus};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// One invoice as shown to the user, stored or not.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub file_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
    pub flags: &'a [ReviewFlag],
    #[serde(flatten)]
    pub fields: &'a NormalizedInvoiceFields,
}

impl<'a> InvoiceView<'a> {
    pub fn unsaved(file_name: &'a str, output: &'a PipelineOutput) -> Self {
        Self {
            id: None,
            file_name,
            status: None,
            flags: &output.flags,
            fields: &output.fields,
        }
    }

    pub fn stored(record: &'a InvoiceRecord) -> Self {
        Self {
            id: Some(record.id),
            file_name: &record.file_name,
            status: Some(record.status),
            flags: &record.flags,
            fields: &record.fields,
        }
    }
}

pub fn render_one(view: &InvoiceView<'_>, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(view)?),
        OutputFormat::Csv => format_csv(std::slice::from_ref(view)),
        OutputFormat::Text => Ok(format_text(view)),
    }
}

pub fn render_many(views: &[InvoiceView<'_>], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(views)?),
        OutputFormat::Csv => format_csv(views),
        OutputFormat::Text => Ok(views
            .iter()
            .map(format_text)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

const CSV_HEADER: [&str; 15] = [
    "id",
    "file_name",
    "status",
    "invoice_number",
    "invoice_date",
    "due_date",
    "invoice_type",
    "seller_name",
    "buyer_name",
    "tax_details",
    "total_amount",
    "currency_code",
    "final_total_amount",
    "original_currency_code",
    "flags",
];

fn csv_row(view: &InvoiceView<'_>) -> [String; 15] {
    let f = view.fields;
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    let flags: Vec<&str> = view.flags.iter().map(flag_kind).collect();

    [
        view.id.map(|id| id.to_string()).unwrap_or_default(),
        view.file_name.to_string(),
        view.status.map(status_name).unwrap_or_default().to_string(),
        text(&f.invoice_number),
        text(&f.invoice_date),
        text(&f.due_date),
        f.invoice_type.as_str().to_string(),
        text(&f.seller_name),
        text(&f.buyer_name),
        text(&f.tax_details),
        text(&f.total_amount),
        f.currency_code.to_string(),
        text(&f.final_total_amount),
        f.original_currency_code
            .as_ref()
            .map(|c| c.to_string())
            .unwrap_or_default(),
        flags.join(";"),
    ]
}

fn format_csv(views: &[InvoiceView<'_>]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;
    for view in views {
        wtr.write_record(csv_row(view))?;
    }
    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn format_text(view: &InvoiceView<'_>) -> String {
    let f = view.fields;
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    let mut output = String::new();

    output.push_str(&format!(
        "Invoice: {} ({})\n",
        or_dash(&f.invoice_number),
        f.invoice_type.as_str()
    ));
    if let Some(id) = view.id {
        output.push_str(&format!("ID: {} [{}]\n", id, view.status.map(status_name).unwrap_or("-")));
    }
    output.push_str(&format!("File: {}\n", view.file_name));
    output.push_str(&format!(
        "Date: {}  Due: {}\n\n",
        or_dash(&f.invoice_date),
        or_dash(&f.due_date)
    ));

    for (label, name, address, tax_id) in [
        ("Seller", &f.seller_name, &f.seller_address, &f.seller_tax_id),
        ("Buyer", &f.buyer_name, &f.buyer_address, &f.buyer_tax_id),
    ] {
        output.push_str(&format!("{}:\n  {}\n", label, or_dash(name)));
        if let Some(address) = address {
            output.push_str(&format!("  {}\n", address));
        }
        if let Some(tax_id) = tax_id {
            output.push_str(&format!("  Tax ID: {}\n", tax_id));
        }
    }

    output.push_str("\nSummary:\n");
    output.push_str(&format!("  Tax:   {}\n", or_dash(&f.tax_details)));
    output.push_str(&format!("  Total: {} {}\n", or_dash(&f.total_amount), f.currency_code));
    match &f.original_currency_code {
        Some(original) => output.push_str(&format!(
            "  Local: {} (converted from {})\n",
            or_dash(&f.final_total_amount),
            original
        )),
        None => output.push_str(&format!("  Local: {}\n", or_dash(&f.final_total_amount))),
    }

    let issues = f.validate();
    if !view.flags.is_empty() || !issues.is_empty() {
        output.push_str("\nNeeds review:\n");
        for flag in view.flags {
            output.push_str(&format!("  - {}\n", flag));
        }
        for issue in issues {
            output.push_str(&format!("  - {}\n", issue));
        }
    }

    output
}

fn flag_kind(flag: &ReviewFlag) -> &'static str {
    match flag {
        ReviewFlag::ParseFailure => "parseFailure",
        ReviewFlag::InvalidAmount { .. } => "invalidAmount",
        ReviewFlag::RateUnavailable { .. } => "rateUnavailable",
        ReviewFlag::CurrencyDefaulted { .. } => "currencyDefaulted",
    }
}

fn status_name(status: RecordStatus) -> &'static str {
    match status {
        RecordStatus::Draft => "draft",
        RecordStatus::Final => "final",
    }
}
