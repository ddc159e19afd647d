//! Error types for the arxnewsd CLI application.
//!
//! A single enum wraps the failure modes a command can hit: user
//! interaction, the underlying arxnews library, the file system, and glob
//! matching during database cleanup. All variants are transparent so the
//! original error message reaches the user unchanged.

use thiserror::Error;

/// Errors that can occur during CLI operations.
#[derive(Error, Debug)]
pub enum ArxnewsdError {
  /// Errors from user interaction dialogs
  #[error(transparent)]
  Dialoguer(#[from] dialoguer::Error),

  /// Errors from the underlying arxnews library
  #[error(transparent)]
  Arxnews(#[from] arxnews::errors::ArxnewsError),

  /// File system and IO operation errors
  #[error(transparent)]
  IO(#[from] std::io::Error),

  /// Glob pattern matching errors
  #[error(transparent)]
  Glob(#[from] glob::PatternError),
}
