//! The invoice pipeline: extraction, parsing, normalization, classification
//! and conversion for one upload.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::currency::{ConversionOutcome, CurrencyConverter, RateProvider};
use crate::error::{EditError, GatewayError, PipelineError};
use crate::gateway::{ExtractionGateway, ExtractionRequest};
use crate::invoice::{classify, parse_response, stored_total, strip_code_fences, FieldNormalizer};
use crate::models::config::FakturConfig;
use crate::models::invoice::{NormalizedInvoiceFields, ReviewFlag};

/// Stages of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Extracting,
    Parsing,
    Normalizing,
    Converting,
    Done,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Extracting => "extracting",
            PipelineStage::Parsing => "parsing",
            PipelineStage::Normalizing => "normalizing",
            PipelineStage::Converting => "converting",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A finished record with the reasons it may need review.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub fields: NormalizedInvoiceFields,
    pub flags: Vec<ReviewFlag>,
    /// Gateway reply as received, before fence stripping.
    pub raw_text: String,
}

impl PipelineOutput {
    /// Whether a reviewer has anything to look at.
    pub fn needs_review(&self) -> bool {
        !self.flags.is_empty() || !self.fields.validate().is_empty()
    }
}

/// Sequences the pipeline stages for each upload.
///
/// Holds no per-run state; one instance serves concurrent runs.
pub struct InvoicePipeline {
    gateway: Arc<dyn ExtractionGateway>,
    converter: CurrencyConverter,
    normalizer: FieldNormalizer,
    company_name: String,
    gateway_timeout: Duration,
}

impl InvoicePipeline {
    pub fn new(
        gateway: Arc<dyn ExtractionGateway>,
        rates: Arc<dyn RateProvider>,
        config: &FakturConfig,
    ) -> Self {
        let local = config.pipeline.local_currency.clone();
        Self {
            gateway,
            converter: CurrencyConverter::new(
                rates,
                local.clone(),
                Duration::from_secs(config.rates.timeout_secs),
            ),
            normalizer: FieldNormalizer::new(local),
            company_name: config.pipeline.company_name.clone(),
            gateway_timeout: Duration::from_secs(config.gateway.timeout_secs),
        }
    }

    /// Override the company name used for classification.
    pub fn with_company_name(mut self, company_name: impl Into<String>) -> Self {
        self.company_name = company_name.into();
        self
    }

    pub fn normalizer(&self) -> &FieldNormalizer {
        &self.normalizer
    }

    /// Run one upload through every stage.
    ///
    /// Only a gateway failure is an error; every other problem yields a
    /// record with review flags.
    pub async fn run(&self, request: &ExtractionRequest) -> Result<PipelineOutput, PipelineError> {
        let span = info_span!("pipeline", upload = %request.name);
        async {
            info!("Processing upload");
            enter(PipelineStage::Extracting);

            let raw_text = match self.extract(request).await {
                Ok(text) => text,
                Err(e) => {
                    enter(PipelineStage::Failed);
                    warn!(error = %e, "Extraction failed");
                    return Err(PipelineError::ExtractionFailure(e));
                }
            };

            let output = self.finish(raw_text).await;
            info!(flags = output.flags.len(), "Upload processed");
            Ok(output)
        }
        .instrument(span)
        .await
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<String, GatewayError> {
        if request.text.is_none() && request.image.is_none() {
            return Err(GatewayError::EmptyRequest);
        }

        let prompt = request.prompt();
        tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.invoke(&prompt, request.image.as_ref()),
        )
        .await
        .unwrap_or(Err(GatewayError::Timeout(self.gateway_timeout.as_secs())))
    }

    /// Everything after a successful gateway call. Never fails.
    pub async fn finish(&self, raw_text: String) -> PipelineOutput {
        enter(PipelineStage::Parsing);
        let parsed = parse_response(&strip_code_fences(&raw_text));
        let mut flags = Vec::new();
        if parsed.parse_failure {
            warn!("Extractor output is not a JSON object; record needs manual entry");
            flags.push(ReviewFlag::ParseFailure);
        }

        enter(PipelineStage::Normalizing);
        let normalized = self.normalizer.normalize(&parsed.fields);
        for flag in &normalized.flags {
            if let ReviewFlag::InvalidAmount { raw } = flag {
                warn!(raw = %raw, "Total amount could not be parsed");
            }
        }
        flags.extend(normalized.flags);

        let mut fields = normalized.fields;
        fields.invoice_type = classify(fields.seller_name.as_deref(), &self.company_name);

        if let Some(total) = normalized.total {
            enter(PipelineStage::Converting);
            if let Some(flag) = self.apply_conversion(&mut fields, total).await {
                flags.push(flag);
            }
        }

        enter(PipelineStage::Done);
        PipelineOutput {
            fields,
            flags,
            raw_text,
        }
    }

    /// Apply manual corrections to a record.
    ///
    /// Edits are applied in order and all-or-nothing. When the total or
    /// currency changes (and the local total was not set by hand) the local
    /// total is recomputed. A new seller name is classified again unless the
    /// same edit sets `invoiceType`. Flags the edits resolve are dropped.
    pub async fn edit(
        &self,
        fields: &mut NormalizedInvoiceFields,
        flags: &mut Vec<ReviewFlag>,
        edits: &[(String, Option<String>)],
    ) -> Result<(), EditError> {
        let mut edited = fields.clone();
        for (key, value) in edits {
            self.normalizer.apply_edit(&mut edited, key, value.as_deref())?;
        }

        let touched = |name: &str| edits.iter().any(|(key, _)| key == name);
        let amount_changed = touched("totalAmount") || touched("currencyCode");

        if touched("sellerName") && !touched("invoiceType") {
            edited.invoice_type = classify(edited.seller_name.as_deref(), &self.company_name);
        }

        if touched("currencyCode") {
            flags.retain(|f| !matches!(f, ReviewFlag::CurrencyDefaulted { .. }));
        }
        if amount_changed || touched("finalTotalAmount") {
            flags.retain(|f| {
                !matches!(f, ReviewFlag::InvalidAmount { .. } | ReviewFlag::RateUnavailable { .. })
            });
        }
        if amount_changed && !touched("finalTotalAmount") {
            enter(PipelineStage::Converting);
            if let Some(flag) = self.reconvert(&mut edited).await {
                flags.push(flag);
            }
        }

        *fields = edited;
        Ok(())
    }

    /// Recompute `finalTotalAmount` after the total or currency was edited.
    pub async fn reconvert(&self, fields: &mut NormalizedInvoiceFields) -> Option<ReviewFlag> {
        match stored_total(fields, self.converter.local_currency()) {
            Some(total) => self.apply_conversion(fields, total).await,
            None => {
                fields.final_total_amount = None;
                fields.original_currency_code = None;
                None
            }
        }
    }

    async fn apply_conversion(
        &self,
        fields: &mut NormalizedInvoiceFields,
        total: rust_decimal::Decimal,
    ) -> Option<ReviewFlag> {
        let conversion = self.converter.convert(total, &fields.currency_code).await;
        fields.final_total_amount = Some(conversion.display_value());

        match conversion.outcome {
            ConversionOutcome::SameCurrency => {
                fields.original_currency_code = None;
                None
            }
            ConversionOutcome::Converted { .. } => {
                fields.original_currency_code = Some(fields.currency_code.clone());
                None
            }
            ConversionOutcome::Fallback { reason } => {
                fields.original_currency_code = None;
                Some(ReviewFlag::RateUnavailable {
                    currency: fields.currency_code.to_string(),
                    reason: reason.to_string(),
                })
            }
        }
    }
}

fn enter(stage: PipelineStage) {
    debug!(%stage, "Pipeline stage");
}
