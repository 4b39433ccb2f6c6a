//! Lead sheet ingestion for the SaleMate marketplace.
//!
//! - Parsing: [`parse_csv`] / [`parse_leads`] turn sheet text into validated
//!   [`LeadRecord`]s, either by header name or by fixed column position.
//! - Uploading: [`BatchUploader`] sends records to a [`LeadStore`] in batches,
//!   with progress, cancellation and per-batch failure tolerance.
//! - Templates: [`generate_template`] writes a sheet the parser reads back.
//! - Files: [`read_lead_file`] handles gzip/zstd and legacy charsets;
//!   [`inspect_lead_source`] previews a sheet without parsing it for upload.
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod codec;
pub mod config;
mod inspect;
mod io;
pub mod lead;
pub mod mapper;
pub mod parser;
pub mod row;
pub mod store;
pub mod template;
pub mod upload;

pub use crate::config::{IngestConfig, StoreConfig, UploadSettings};
pub use crate::inspect::{inspect_lead_source, SourceSummary};
pub use crate::io::{build_source_reader, charset_for_label, read_lead_file, reader_from_path, SourceMeta};
pub use crate::lead::{LeadRecord, Platform, Stage};
pub use crate::mapper::{ColumnLayout, LeadField};
pub use crate::parser::{parse_csv, parse_leads, ParseError, ParseMode, ParseOutcome, SkipReason, SkippedRow};
pub use crate::store::{
    refresh_after_upload, refresh_projects, HttpLeadStore, LeadBatch, LeadStore, Project,
    ProjectSnapshot, ProjectStats, StoreError, UploadReceipt,
};
pub use crate::template::{generate_template, template_file_name, template_records, write_template};
pub use crate::upload::{
    BatchFailure, BatchUploader, UploadConfig, UploadError, UploadProgress, UploadSummary,
};

pub use tokio_util::sync::CancellationToken;

use thiserror::Error;

/// Errors from reading or inspecting a lead file.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Missing required header: {0}")]
    MissingHeader(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv_async::Error),
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;
