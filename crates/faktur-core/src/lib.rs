//! Core library for invoice field extraction and local-currency conversion.
//!
//! This crate provides:
//! - Upload loading (PDF text layer or downscaled scan images)
//! - The extraction gateway seam and an OpenAI-compatible HTTP adapter
//! - Normalization of extractor output into a canonical invoice record
//! - Exchange-rate lookup and conversion of totals to the local currency
//! - An owner-scoped invoice store for drafts and finalized records

pub mod currency;
pub mod error;
pub mod gateway;
pub mod invoice;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod store;
pub mod upload;

pub use currency::{Conversion, ConversionOutcome, CurrencyConverter, RateProvider};
pub use error::{FakturError, PipelineError, Result};
pub use gateway::{ExtractionGateway, ExtractionRequest, InvoiceImage};
pub use invoice::{FieldNormalizer, NormalizedExtraction};
pub use models::invoice::{CurrencyCode, InvoiceType, NormalizedInvoiceFields, ReviewFlag};
pub use pdf::{PdfContent, PdfExtractor, PdfProcessor};
pub use pipeline::{InvoicePipeline, PipelineOutput, PipelineStage};
pub use store::{InvoiceRecord, InvoiceStore, JsonFileStore, MemoryStore, RecordStatus};

#[cfg(feature = "http")]
pub use currency::FrankfurterRates;
#[cfg(feature = "http")]
pub use gateway::OpenRouterGateway;
