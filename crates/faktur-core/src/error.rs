//! Error types for the faktur-core library.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for the faktur library.
#[derive(Error, Debug)]
pub enum FakturError {
    /// The pipeline could not produce a record.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Extraction gateway error.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Exchange-rate lookup error.
    #[error("rate lookup error: {0}")]
    RateLookup(#[from] RateLookupError),

    /// Amount parsing error.
    #[error(transparent)]
    Amount(#[from] AmountError),

    /// Invoice store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Rejected manual edit.
    #[error("edit rejected: {0}")]
    Edit(#[from] EditError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Upload loading error.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Terminal pipeline failures. Everything else degrades to a flagged record.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The extraction gateway call failed or timed out.
    #[error("invoice extraction failed, please retry the upload: {0}")]
    ExtractionFailure(#[from] GatewayError),
}

/// Errors returned by the extraction gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No API key was configured for a remote endpoint.
    #[error("no API key configured for the extraction endpoint")]
    MissingApiKey,

    /// Neither prompt text nor an image was supplied.
    #[error("empty extraction request")]
    EmptyRequest,

    /// The endpoint answered with a non-success status.
    #[error("endpoint responded with {status}: {body}")]
    Http { status: u16, body: String },

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The call did not complete within the configured timeout.
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// The response did not carry text at the documented path.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Errors returned by an exchange-rate provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLookupError {
    /// The provider does not know this currency pair.
    #[error("no rate for {from}->{to}")]
    UnknownPair { from: String, to: String },

    /// The provider answered with a non-success status.
    #[error("rate service responded with {0}")]
    Http(u16),

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The lookup did not complete within the configured timeout.
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// The response body could not be read as a rate.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Multiplying by the rate overflowed the decimal range.
    #[error("converted amount out of range")]
    Overflow,
}

/// Errors related to monetary amount parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The string cannot be read as an amount.
    #[error("invalid amount {raw:?}: {reason}")]
    InvalidAmount { raw: String, reason: &'static str },
}

/// Errors related to the invoice store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record with this ID belongs to the owner.
    #[error("invoice {0} not found")]
    NotFound(Uuid),

    /// The record is finalized and can no longer change.
    #[error("invoice {0} is finalized")]
    Finalized(Uuid),

    /// Store file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store file contents are not valid.
    #[error("corrupt store: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors related to manual edits of a normalized record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// The key is not an editable field.
    #[error("unknown or read-only field: {0}")]
    UnknownField(String),

    /// The value does not normalize to a valid field value.
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: String, value: String },
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors related to loading an upload from disk.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The file extension is not a supported invoice format.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Nothing usable could be pulled out of the file.
    #[error("no usable content in {0}")]
    NoContent(String),
}

/// Result type for the faktur library.
pub type Result<T> = std::result::Result<T, FakturError>;
