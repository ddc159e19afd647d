//! Error types for the arxnews library.
//!
//! This module provides a comprehensive error type covering the failure modes
//! of the harvesting pipeline:
//! - Network and feed-protocol errors
//! - Database operations
//! - Input validation
//! - Resource access
//!
//! Note that *per-entry* parse failures inside a feed are not errors at all:
//! the normalizer skips malformed entries and the batch continues. Only
//! transport failures and malformed top-level responses surface here.

use thiserror::Error;

/// Errors that can occur when working with the arxnews library.
///
/// Most variants wrap an underlying error transparently; [`ArxnewsError::Api`]
/// carries the upstream status or message so callers can diagnose a failed
/// harvest without digging through logs.
#[derive(Error, Debug)]
pub enum ArxnewsError {
  /// A network request failed.
  ///
  /// This can occur when:
  /// - The network is unavailable
  /// - The server is unreachable or returns a non-success status
  /// - The request times out
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// A feed endpoint returned a response we could not work with.
  ///
  /// This covers malformed top-level XML and protocol-level errors reported
  /// by the OAI endpoint (other than the benign `noRecordsMatch`). The string
  /// carries the upstream code or parse message for diagnosis.
  #[error("API error: {0}")]
  Api(String),

  /// A paper workflow state string didn't match any known state.
  ///
  /// The string parameter contains the invalid value for debugging.
  #[error("Invalid paper state, see `arxnews::paper::PaperState`")]
  InvalidState(String),

  /// A SQLite operation failed.
  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),

  /// An async SQLite operation failed.
  #[error(transparent)]
  AsyncSqlite(#[from] tokio_rusqlite::Error),

  /// JSON encoding or decoding of a stored field failed.
  ///
  /// The `extra` bag and tag list are stored as JSON text columns; this
  /// wraps failures converting between them and their Rust shapes.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// A file system operation failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// A numeric conversion failed, typically in database operations.
  #[error(transparent)]
  ColumnOverflow(#[from] std::num::TryFromIntError),
}
